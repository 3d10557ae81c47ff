//! RAII subscription handles for [`MessageBus`](super::MessageBus) handlers.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

/// Unique identifier for bus handlers.
pub type SubscriptionId = u64;

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Returns a new process-unique subscription id.
pub fn next_subscription_id() -> SubscriptionId {
	NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed)
}

/// Handler storage keyed by subscription id, in registration order.
pub type HandlerMap<H> = Rc<RefCell<IndexMap<SubscriptionId, H>>>;

/// Unregisters a bus handler on drop.
///
/// A subscription created with [`from_handler_map`](Self::from_handler_map)
/// only holds a weak reference, so outliving the bus is harmless.
pub struct Subscription {
	id: SubscriptionId,
	dropper: Option<Rc<dyn Fn(SubscriptionId)>>,
}

impl Subscription {
	pub fn new(id: SubscriptionId, dropper: Rc<dyn Fn(SubscriptionId)>) -> Self {
		Self {
			id,
			dropper: Some(dropper),
		}
	}

	/// Subscription whose drop removes `id` from `handlers`, if still alive.
	pub fn from_handler_map<H: 'static>(id: SubscriptionId, handlers: &HandlerMap<H>) -> Self {
		let weak: Weak<RefCell<IndexMap<SubscriptionId, H>>> = Rc::downgrade(handlers);
		Self::new(
			id,
			Rc::new(move |id| {
				if let Some(map) = weak.upgrade() {
					map.borrow_mut().shift_remove(&id);
				}
			}),
		)
	}

	pub fn id(&self) -> SubscriptionId {
		self.id
	}

	/// Explicitly unsubscribes. Equivalent to dropping.
	pub fn unsubscribe(mut self) {
		self.release();
	}

	fn release(&mut self) {
		if let Some(dropper) = self.dropper.take() {
			dropper(self.id);
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.release();
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.id)
			.field("active", &self.dropper.is_some())
			.finish()
	}
}
