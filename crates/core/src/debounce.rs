//! Selection debouncing.
//!
//! A pointer crossing a page fires a burst of `pointerover` events on its way
//! to the element the user actually wants. Only the settled target of each
//! window reaches the host:
//!
//! - trailing edge only: the first candidate arms a timer one window ahead,
//!   later candidates replace it, the timer delivers whatever is pending
//! - memoized: a settled candidate equal to the last delivered one is dropped,
//!   until a full quiet window passes between candidates

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use inspect_protocol::{SelectionMeta, SelectionOrigin};
use tracing::trace;

use crate::scheduler::{Scheduler, TimerId};

/// Window used when the host does not configure one.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(200);

/// Host callback receiving settled selections.
pub type SelectCallback<E> = Rc<dyn Fn(&E, &SelectionMeta)>;

/// A candidate element together with how it was picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<E> {
	pub element: E,
	pub meta: SelectionMeta,
}

impl<E> Selection<E> {
	pub fn new(element: E, origin: SelectionOrigin) -> Self {
		Self {
			element,
			meta: SelectionMeta { origin },
		}
	}
}

/// Clock-free core of the debouncer.
///
/// The caller owns time: [`push`](Self::push) says when a timer must be
/// armed, and the caller calls [`fire`](Self::fire) when it expires.
#[derive(Debug)]
pub struct Throttle<T> {
	window: Duration,
	pending: Option<T>,
	deadline: Option<Duration>,
	last_push: Option<Duration>,
	last_delivered: Option<T>,
}

impl<T: Clone + PartialEq> Throttle<T> {
	pub fn new(window: Duration) -> Self {
		Self {
			window,
			pending: None,
			deadline: None,
			last_push: None,
			last_delivered: None,
		}
	}

	/// Records a candidate observed at `now`.
	///
	/// Returns the deadline of a newly opened window, or `None` when a window
	/// is already open.
	pub fn push(&mut self, now: Duration, value: T) -> Option<Duration> {
		if let Some(last) = self.last_push {
			if now.saturating_sub(last) >= self.window {
				self.last_delivered = None;
			}
		}
		self.last_push = Some(now);
		self.pending = Some(value);

		if self.deadline.is_some() {
			return None;
		}
		let deadline = now + self.window;
		self.deadline = Some(deadline);
		Some(deadline)
	}

	/// Closes the open window, returning the candidate to deliver, if any.
	pub fn fire(&mut self) -> Option<T> {
		self.deadline = None;
		let value = self.pending.take()?;
		if self.last_delivered.as_ref() == Some(&value) {
			return None;
		}
		self.last_delivered = Some(value.clone());
		Some(value)
	}

	/// Drops the pending candidate and closes the window.
	pub fn cancel(&mut self) {
		self.pending = None;
		self.deadline = None;
	}

	pub fn deadline(&self) -> Option<Duration> {
		self.deadline
	}

	pub fn window(&self) -> Duration {
		self.window
	}
}

/// [`Throttle`] wired to a [`Scheduler`] and a host callback.
pub struct SelectionDebouncer<E> {
	scheduler: Rc<dyn Scheduler>,
	callback: SelectCallback<E>,
	throttle: RefCell<Throttle<Selection<E>>>,
	timer: Cell<Option<TimerId>>,
}

impl<E: Clone + PartialEq + fmt::Debug + 'static> SelectionDebouncer<E> {
	pub fn new(window: Duration, scheduler: Rc<dyn Scheduler>, callback: SelectCallback<E>) -> Rc<Self> {
		Rc::new(Self {
			scheduler,
			callback,
			throttle: RefCell::new(Throttle::new(window)),
			timer: Cell::new(None),
		})
	}

	/// Offers a candidate. Delivery, if any, happens on the scheduler.
	pub fn select(self: &Rc<Self>, element: E, origin: SelectionOrigin) {
		let now = self.scheduler.now();
		let opened = self.throttle.borrow_mut().push(now, Selection::new(element, origin));

		if let Some(deadline) = opened {
			let this: Weak<Self> = Rc::downgrade(self);
			let id = self.scheduler.set_timeout(
				deadline.saturating_sub(now),
				Box::new(move || {
					if let Some(this) = this.upgrade() {
						this.flush();
					}
				}),
			);
			self.timer.set(Some(id));
		}
	}

	/// Whether a window is open.
	pub fn is_pending(&self) -> bool {
		self.timer.get().is_some()
	}

	/// Cancels the armed timer and forgets the pending candidate.
	pub fn cancel(&self) {
		if let Some(id) = self.timer.take() {
			self.scheduler.clear_timeout(id);
		}
		self.throttle.borrow_mut().cancel();
	}

	fn flush(&self) {
		self.timer.set(None);
		let settled = self.throttle.borrow_mut().fire();

		match settled {
			Some(selection) => {
				trace!(element = ?selection.element, origin = %selection.meta.origin, "selection settled");
				(self.callback)(&selection.element, &selection.meta);
			}
			None => trace!("selection unchanged, not delivered"),
		}
	}
}

impl<E> Drop for SelectionDebouncer<E> {
	fn drop(&mut self) {
		if let Some(id) = self.timer.take() {
			self.scheduler.clear_timeout(id);
		}
	}
}

impl<E> fmt::Debug for SelectionDebouncer<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SelectionDebouncer")
			.field("window", &self.throttle.borrow().window)
			.field("armed", &self.timer.get().is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::scheduler::ManualScheduler;

	fn ms(n: u64) -> Duration {
		Duration::from_millis(n)
	}

	type Delivered = Rc<RefCell<Vec<(&'static str, SelectionOrigin)>>>;

	fn debouncer(scheduler: &Rc<ManualScheduler>) -> (Rc<SelectionDebouncer<&'static str>>, Delivered) {
		let delivered: Delivered = Rc::default();
		let sink = Rc::clone(&delivered);
		let callback: SelectCallback<&'static str> =
			Rc::new(move |element: &&'static str, meta: &SelectionMeta| sink.borrow_mut().push((*element, meta.origin)));
		let scheduler: Rc<dyn Scheduler> = scheduler.clone();
		(SelectionDebouncer::new(DEFAULT_WINDOW, scheduler, callback), delivered)
	}

	#[test]
	fn throttle_delivers_last_candidate_of_window() {
		let mut throttle = Throttle::new(ms(200));
		assert_eq!(throttle.push(ms(0), "a"), Some(ms(200)));
		assert_eq!(throttle.push(ms(20), "a"), None);
		assert_eq!(throttle.push(ms(40), "b"), None);
		assert_eq!(throttle.fire(), Some("b"));
		assert_eq!(throttle.fire(), None);
		assert_eq!(throttle.deadline(), None);
	}

	#[test]
	fn throttle_memo_holds_while_pointer_keeps_moving() {
		let mut throttle = Throttle::new(ms(200));
		throttle.push(ms(0), "b");
		throttle.push(ms(150), "a");
		assert_eq!(throttle.fire(), Some("a"));

		// back over "a" within the same burst
		throttle.push(ms(250), "b");
		throttle.push(ms(340), "a");
		assert_eq!(throttle.fire(), None);
	}

	#[test]
	fn throttle_memo_expires_after_quiet_window() {
		let mut throttle = Throttle::new(ms(200));
		throttle.push(ms(0), "a");
		assert_eq!(throttle.fire(), Some("a"));

		throttle.push(ms(250), "a");
		assert_eq!(throttle.fire(), Some("a"));
	}

	#[test]
	fn burst_of_candidates_yields_one_delivery() {
		let scheduler = Rc::new(ManualScheduler::new());
		let (debouncer, delivered) = debouncer(&scheduler);

		debouncer.select("a", SelectionOrigin::Hover);
		scheduler.advance_ms(20);
		debouncer.select("a", SelectionOrigin::Hover);
		scheduler.advance_ms(20);
		debouncer.select("b", SelectionOrigin::Hover);

		scheduler.advance_ms(159);
		assert!(delivered.borrow().is_empty(), "no delivery before the window closes");

		scheduler.advance_ms(1);
		assert_eq!(*delivered.borrow(), [("b", SelectionOrigin::Hover)]);
		assert!(!debouncer.is_pending());
	}

	#[test]
	fn repeat_after_window_is_delivered_again() {
		let scheduler = Rc::new(ManualScheduler::new());
		let (debouncer, delivered) = debouncer(&scheduler);

		debouncer.select("a", SelectionOrigin::Hover);
		scheduler.advance_ms(250);
		debouncer.select("a", SelectionOrigin::Hover);
		scheduler.advance_ms(250);

		assert_eq!(delivered.borrow().len(), 2);
	}

	#[test]
	fn at_most_one_delivery_per_window() {
		let scheduler = Rc::new(ManualScheduler::new());
		let (debouncer, delivered) = debouncer(&scheduler);

		for (i, name) in ["a", "b", "c", "d", "e", "f"].into_iter().enumerate() {
			debouncer.select(name, SelectionOrigin::Hover);
			scheduler.advance_ms(if i == 0 { 0 } else { 100 });
		}
		scheduler.advance_ms(200);

		// windows close at 200, 400 and 600, each delivering its last candidate
		let names: Vec<_> = delivered.borrow().iter().map(|(n, _)| *n).collect();
		assert_eq!(names, ["c", "e", "f"]);
	}

	#[test]
	fn click_after_hover_on_same_element_is_delivered() {
		let scheduler = Rc::new(ManualScheduler::new());
		let (debouncer, delivered) = debouncer(&scheduler);

		debouncer.select("a", SelectionOrigin::Hover);
		scheduler.advance_ms(200);
		debouncer.select("a", SelectionOrigin::Click);
		scheduler.advance_ms(200);

		assert_eq!(
			*delivered.borrow(),
			[("a", SelectionOrigin::Hover), ("a", SelectionOrigin::Click)]
		);
	}

	#[test]
	fn dropping_debouncer_clears_timer() {
		let scheduler = Rc::new(ManualScheduler::new());
		let (debouncer, delivered) = debouncer(&scheduler);

		debouncer.select("a", SelectionOrigin::Hover);
		assert_eq!(scheduler.pending(), 1);
		drop(debouncer);

		assert_eq!(scheduler.pending(), 0);
		scheduler.advance_ms(500);
		assert!(delivered.borrow().is_empty());
	}

	#[test]
	fn cancel_forgets_pending_candidate() {
		let scheduler = Rc::new(ManualScheduler::new());
		let (debouncer, delivered) = debouncer(&scheduler);

		debouncer.select("a", SelectionOrigin::Click);
		debouncer.cancel();
		scheduler.advance_ms(500);

		assert!(delivered.borrow().is_empty());
		assert!(!debouncer.is_pending());
	}
}
