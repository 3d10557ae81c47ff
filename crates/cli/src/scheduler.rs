//! Wall-clock scheduler for `replay --realtime`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use inspect::{Scheduler, TimerId};
use tokio::task::AbortHandle;
use tokio::time::Instant;

/// [`Scheduler`] backed by tokio timers.
///
/// Tasks are spawned with [`tokio::task::spawn_local`], so the scheduler must
/// be used from inside a [`tokio::task::LocalSet`].
pub struct TokioScheduler {
	origin: Instant,
	next_id: Cell<u64>,
	timers: Rc<RefCell<HashMap<TimerId, AbortHandle>>>,
}

impl TokioScheduler {
	pub fn new() -> Self {
		Self {
			origin: Instant::now(),
			next_id: Cell::new(0),
			timers: Rc::default(),
		}
	}

	/// Timers armed and not yet run or cleared.
	pub fn pending(&self) -> usize {
		self.timers.borrow().len()
	}
}

impl Default for TokioScheduler {
	fn default() -> Self {
		Self::new()
	}
}

impl Scheduler for TokioScheduler {
	fn now(&self) -> Duration {
		self.origin.elapsed()
	}

	fn set_timeout(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerId {
		let id = TimerId(self.next_id.get() + 1);
		self.next_id.set(id.0);

		let timers = Rc::clone(&self.timers);
		let handle = tokio::task::spawn_local(async move {
			tokio::time::sleep(delay).await;
			timers.borrow_mut().remove(&id);
			task();
		});
		self.timers.borrow_mut().insert(id, handle.abort_handle());
		id
	}

	fn clear_timeout(&self, id: TimerId) {
		if let Some(handle) = self.timers.borrow_mut().remove(&id) {
			handle.abort();
		}
	}
}

impl Drop for TokioScheduler {
	fn drop(&mut self) {
		for (_, handle) in self.timers.borrow_mut().drain() {
			handle.abort();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn runs_and_clears_timers() {
		let local = tokio::task::LocalSet::new();
		local
			.run_until(async {
				let scheduler = TokioScheduler::new();
				let log = Rc::new(RefCell::new(Vec::new()));

				let fired = Rc::clone(&log);
				scheduler.set_timeout(Duration::from_millis(5), Box::new(move || fired.borrow_mut().push("fired")));
				let cleared = Rc::clone(&log);
				let id =
					scheduler.set_timeout(Duration::from_millis(5), Box::new(move || cleared.borrow_mut().push("cleared")));
				scheduler.clear_timeout(id);
				assert_eq!(scheduler.pending(), 1);

				tokio::time::sleep(Duration::from_millis(30)).await;
				assert_eq!(*log.borrow(), ["fired"]);
				assert_eq!(scheduler.pending(), 0);
				assert!(scheduler.now() >= Duration::from_millis(5));
			})
			.await;
	}
}
