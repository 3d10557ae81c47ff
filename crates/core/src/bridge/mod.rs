//! Command bridge adapter.
//!
//! Maps named messages of an external pub/sub channel onto a session's
//! commands, and (optionally) posts settled selections back.
//!
//! ```ignore
//! let bus = Rc::new(LocalBus::<Value>::new());
//! let inspector = Inspector::new(
//!     InspectorConfig::new(dom, overlay, scheduler)
//!         .on_select_node(forward_selections(bus.clone(), describe)),
//! );
//! let _connection = connect_json(&*bus, &inspector);
//! ```

mod local;
mod subscription;

pub use local::LocalBus;
pub use subscription::{HandlerMap, Subscription, SubscriptionId, next_subscription_id};

use std::rc::Rc;

use inspect_protocol::{Command, HighlightRequest, SelectionMeta, channel};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::dom::Dom;
use crate::error::Diagnostic;
use crate::session::Inspector;

/// Named-message transport.
///
/// Implementations decide what a payload is: `serde_json::Value` for native
/// hosts, a `JsValue` in the browser.
pub trait MessageBus {
	type Payload: 'static;

	/// Registers `handler` for messages on `channel`. Dropping the returned
	/// subscription unregisters it.
	fn on_message(&self, channel: &str, handler: Rc<dyn Fn(&Self::Payload)>) -> Subscription;

	/// Sends a message on `channel`.
	fn post(&self, channel: &str, payload: Self::Payload);
}

/// Subscriptions tying a session to a bus. Dropping it disconnects.
#[derive(Debug)]
pub struct BridgeConnection {
	subscriptions: Vec<Subscription>,
}

impl BridgeConnection {
	/// Channels this connection listens on.
	pub fn len(&self) -> usize {
		self.subscriptions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.subscriptions.is_empty()
	}

	/// Explicitly disconnects. Equivalent to dropping.
	pub fn disconnect(self) {
		drop(self);
	}
}

/// Subscribes `inspector` to the five inbound channels of `bus`.
///
/// `decode` turns a raw payload into a command. When it fails the message is
/// not dropped: it degrades to the channel's fallback (an empty highlight
/// request, which hides the overlay) and a [`Diagnostic::MalformedPayload`]
/// is reported. Handlers hold the session weakly; once it is gone, messages
/// are ignored.
pub fn connect<B, D, F>(bus: &B, inspector: &Inspector<D>, decode: F) -> BridgeConnection
where
	B: MessageBus + ?Sized,
	D: Dom,
	F: Fn(&str, &B::Payload) -> inspect_protocol::Result<Command<D::Element>> + 'static,
{
	let decode = Rc::new(decode);

	let subscriptions = channel::INBOUND
		.into_iter()
		.map(|name| {
			let session = inspector.downgrade();
			let decode = Rc::clone(&decode);
			bus.on_message(
				name,
				Rc::new(move |payload: &B::Payload| {
					let Some(inspector) = session.upgrade() else {
						trace!(channel = name, "session gone, message ignored");
						return;
					};

					let command = match decode(name, payload) {
						Ok(command) => command,
						Err(err) => {
							warn!(channel = name, error = %err, "malformed bridge payload");
							inspector.report(Diagnostic::MalformedPayload {
								channel: name.to_string(),
								reason: err.to_string(),
							});
							fallback(name)
						}
					};
					inspector.dispatch(command);
				}),
			)
		})
		.collect();

	debug!("bridge connected");
	BridgeConnection { subscriptions }
}

/// [`connect`] for JSON buses, decoding with [`Command::decode`].
pub fn connect_json<B, D>(bus: &B, inspector: &Inspector<D>) -> BridgeConnection
where
	B: MessageBus<Payload = Value> + ?Sized,
	D: Dom,
	D::Element: DeserializeOwned,
{
	connect(bus, inspector, |name: &str, payload: &Value| Command::decode(name, payload.clone()))
}

fn fallback<E>(name: &str) -> Command<E> {
	Command::bare(name).unwrap_or_else(|| Command::HighlightElements(HighlightRequest::default()))
}

/// Builds an `on_select_node` callback that posts settled selections to
/// `bus`: `SELECT_NODE` for click-origin ones, `HOVER_NODE` for hover-origin
/// ones.
///
/// `describe` produces the payload. Returning `None` skips the selection.
pub fn forward_selections<B, E, F>(bus: Rc<B>, describe: F) -> impl Fn(&E, &SelectionMeta) + 'static
where
	B: MessageBus + ?Sized + 'static,
	F: Fn(&E, &SelectionMeta) -> Option<B::Payload> + 'static,
{
	move |element: &E, meta: &SelectionMeta| match describe(element, meta) {
		Some(payload) => {
			let name = meta.origin.channel();
			debug!(channel = name, "forwarding selection");
			bus.post(name, payload);
		}
		None => trace!(origin = %meta.origin, "selection not described, not forwarded"),
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;
	use crate::config::InspectorConfig;
	use crate::memory::{MemoryDom, NodeId};
	use crate::overlay::{OverlayCall, RecordingOverlay};
	use crate::scheduler::ManualScheduler;
	use crate::session::Mode;

	fn session() -> (Inspector<MemoryDom>, Rc<RecordingOverlay<NodeId>>) {
		let dom = Rc::new(MemoryDom::new("https://app.test"));
		let overlay = Rc::new(RecordingOverlay::new());
		let config = InspectorConfig::new(dom, overlay.clone(), Rc::new(ManualScheduler::new()));
		(Inspector::new(config), overlay)
	}

	#[test]
	fn connection_subscribes_every_inbound_channel() {
		let bus = LocalBus::<Value>::new();
		let (inspector, _) = session();
		let connection = connect_json(&bus, &inspector);

		assert_eq!(connection.len(), channel::INBOUND.len());
		for name in channel::INBOUND {
			assert_eq!(bus.subscriber_count(name), 1);
		}

		connection.disconnect();
		for name in channel::INBOUND {
			assert_eq!(bus.subscriber_count(name), 0);
		}
	}

	#[test]
	fn messages_drive_the_session() {
		let bus = LocalBus::<Value>::new();
		let (inspector, overlay) = session();
		let _connection = connect_json(&bus, &inspector);

		bus.publish(channel::START_INSPECTING, Value::Null);
		assert_eq!(inspector.mode(), Mode::Inspecting);

		bus.publish(channel::SHUTDOWN, Value::Null);
		assert_eq!(inspector.mode(), Mode::Idle);
		assert_eq!(overlay.last_call(), Some(OverlayCall::Hide));
	}

	#[test]
	fn malformed_highlight_degrades_to_hide() {
		let bus = LocalBus::<Value>::new();
		let (inspector, overlay) = session();
		let body = inspector.dom().body();
		inspector.highlight(HighlightRequest::new([inspect_protocol::NodeRef::Element(body)]));
		let _connection = connect_json(&bus, &inspector);

		bus.publish(channel::HIGHLIGHT_ELEMENTS, json!({ "nodes": 42 }));
		assert_eq!(overlay.last_call(), Some(OverlayCall::Hide));
	}

	#[test]
	fn forwarded_selections_use_origin_channel() {
		let bus = Rc::new(LocalBus::<Value>::new());
		let forward = forward_selections(Rc::clone(&bus), |element: &NodeId, meta: &SelectionMeta| {
			(element.0 != 0).then(|| json!({ "node": element.0, "origin": meta.origin }))
		});

		forward(&NodeId(3), &SelectionMeta::click());
		forward(&NodeId(4), &SelectionMeta::hover());
		forward(&NodeId(0), &SelectionMeta::click());

		let posted = bus.posted();
		assert_eq!(posted.len(), 2);
		assert_eq!(posted[0].0, "SELECT_NODE");
		assert_eq!(posted[1].0, "HOVER_NODE");
		assert_eq!(posted[1].1["origin"], "hover");
	}
}
