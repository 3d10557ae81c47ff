//! Host scheduling primitive.
//!
//! The engine never sleeps or spawns. Its two suspension points (deferred
//! mount and the debouncer's trailing edge) go through a [`Scheduler`], which
//! a browser backs with `setTimeout` and tests back with [`ManualScheduler`].

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Handle of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Single-threaded timer source.
pub trait Scheduler {
	/// Monotonic time since an arbitrary origin.
	fn now(&self) -> Duration;

	/// Runs `task` once, `delay` from now.
	fn set_timeout(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerId;

	/// Cancels a task. Unknown or already-run ids are ignored.
	fn clear_timeout(&self, id: TimerId);
}

type Task = Box<dyn FnOnce()>;

#[derive(Default)]
struct Timeline {
	now: Duration,
	next_id: u64,
	tasks: BTreeMap<(Duration, TimerId), Task>,
}

/// Virtual clock that only moves when told to.
///
/// Tasks run in deadline order, ties in scheduling order. A task may schedule
/// further tasks; those run in the same [`advance`](Self::advance) call if
/// they fall due within it.
#[derive(Default)]
pub struct ManualScheduler {
	timeline: RefCell<Timeline>,
}

impl ManualScheduler {
	pub fn new() -> Self {
		Self::default()
	}

	/// Moves the clock forward by `by`, running every task that falls due.
	///
	/// Returns the number of tasks run.
	pub fn advance(&self, by: Duration) -> usize {
		let target = self.timeline.borrow().now + by;
		let mut ran = 0;

		loop {
			let task = {
				let mut timeline = self.timeline.borrow_mut();
				let due = match timeline.tasks.keys().next() {
					Some(&key) if key.0 <= target => key,
					_ => break,
				};
				timeline.now = timeline.now.max(due.0);
				timeline.tasks.remove(&due)
			};
			if let Some(task) = task {
				task();
				ran += 1;
			}
		}

		self.timeline.borrow_mut().now = target;
		ran
	}

	/// Shorthand for `advance(Duration::from_millis(ms))`.
	pub fn advance_ms(&self, ms: u64) -> usize {
		self.advance(Duration::from_millis(ms))
	}

	/// Number of tasks waiting to run.
	pub fn pending(&self) -> usize {
		self.timeline.borrow().tasks.len()
	}
}

impl Scheduler for ManualScheduler {
	fn now(&self) -> Duration {
		self.timeline.borrow().now
	}

	fn set_timeout(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerId {
		let mut timeline = self.timeline.borrow_mut();
		timeline.next_id += 1;
		let id = TimerId(timeline.next_id);
		let due = timeline.now + delay;
		timeline.tasks.insert((due, id), task);
		id
	}

	fn clear_timeout(&self, id: TimerId) {
		self.timeline.borrow_mut().tasks.retain(|&(_, task_id), _| task_id != id);
	}
}

impl fmt::Debug for ManualScheduler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let timeline = self.timeline.borrow();
		f.debug_struct("ManualScheduler")
			.field("now", &timeline.now)
			.field("pending", &timeline.tasks.len())
			.finish()
	}
}
