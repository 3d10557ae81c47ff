use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use inspect_protocol::Envelope;
use serde_json::Value;
use tracing::trace;

use super::MessageBus;
use super::subscription::{HandlerMap, Subscription, next_subscription_id};

type Handler<P> = (String, Rc<dyn Fn(&P)>);

/// In-process bus.
///
/// Inbound messages are injected with [`publish`](Self::publish) (or
/// [`deliver`](Self::deliver) for JSON envelopes). Outbound messages posted
/// through [`MessageBus::post`] are kept in an outbox.
pub struct LocalBus<P = Value> {
	handlers: HandlerMap<Handler<P>>,
	outbox: RefCell<Vec<(String, P)>>,
}

impl<P> Default for LocalBus<P> {
	fn default() -> Self {
		Self {
			handlers: Rc::default(),
			outbox: RefCell::new(Vec::new()),
		}
	}
}

impl<P: Clone + 'static> LocalBus<P> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Runs every handler subscribed to `channel`, in subscription order.
	///
	/// Returns the number of handlers run. Handlers may subscribe or
	/// unsubscribe while the message is delivered.
	pub fn publish(&self, channel: &str, payload: P) -> usize {
		let handlers: Vec<Rc<dyn Fn(&P)>> = self
			.handlers
			.borrow()
			.values()
			.filter(|(name, _)| name == channel)
			.map(|(_, handler)| Rc::clone(handler))
			.collect();

		trace!(channel, handlers = handlers.len(), "publish");
		for handler in &handlers {
			handler(&payload);
		}
		handlers.len()
	}

	/// Handlers currently subscribed to `channel`.
	pub fn subscriber_count(&self, channel: &str) -> usize {
		self.handlers.borrow().values().filter(|(name, _)| name == channel).count()
	}

	/// Messages posted so far, oldest first.
	pub fn posted(&self) -> Vec<(String, P)> {
		self.outbox.borrow().clone()
	}

	/// Drains the outbox.
	pub fn take_posted(&self) -> Vec<(String, P)> {
		std::mem::take(&mut *self.outbox.borrow_mut())
	}
}

impl LocalBus<Value> {
	/// Publishes a framed JSON message.
	pub fn deliver(&self, envelope: &Envelope) -> usize {
		self.publish(&envelope.channel, envelope.data.clone())
	}
}

impl<P: Clone + 'static> MessageBus for LocalBus<P> {
	type Payload = P;

	fn on_message(&self, channel: &str, handler: Rc<dyn Fn(&P)>) -> Subscription {
		let id = next_subscription_id();
		self.handlers.borrow_mut().insert(id, (channel.to_string(), handler));
		Subscription::from_handler_map(id, &self.handlers)
	}

	fn post(&self, channel: &str, payload: P) {
		trace!(channel, "post");
		self.outbox.borrow_mut().push((channel.to_string(), payload));
	}
}

impl<P> fmt::Debug for LocalBus<P> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LocalBus")
			.field("handlers", &self.handlers.borrow().len())
			.field("outbox", &self.outbox.borrow().len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;

	use serde_json::json;

	use super::*;

	#[test]
	fn publish_reaches_only_matching_channel() {
		let bus = LocalBus::<Value>::new();
		let hits = Rc::new(Cell::new(0));
		let counter = Rc::clone(&hits);
		let _sub = bus.on_message("A", Rc::new(move |_: &Value| counter.set(counter.get() + 1)));

		assert_eq!(bus.publish("A", Value::Null), 1);
		assert_eq!(bus.publish("B", Value::Null), 0);
		assert_eq!(hits.get(), 1);
	}

	#[test]
	fn dropped_subscription_stops_delivery() {
		let bus = LocalBus::<Value>::new();
		let sub = bus.on_message("A", Rc::new(|_: &Value| {}));
		assert_eq!(bus.subscriber_count("A"), 1);

		drop(sub);
		assert_eq!(bus.subscriber_count("A"), 0);
		assert_eq!(bus.publish("A", Value::Null), 0);
	}

	#[test]
	fn posts_land_in_outbox() {
		let bus = LocalBus::<Value>::new();
		bus.post("SELECT_NODE", json!({ "cssPath": "button" }));

		assert_eq!(bus.posted().len(), 1);
		assert_eq!(bus.take_posted()[0].0, "SELECT_NODE");
		assert!(bus.posted().is_empty());
	}
}
