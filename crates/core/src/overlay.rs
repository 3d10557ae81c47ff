//! Overlay collaborator.
//!
//! Drawing the highlight is somebody else's job; the inspector only decides
//! when to show it, for which elements, and when to hide it.

use std::cell::RefCell;
use std::fmt;

/// Renders highlight boxes over elements.
pub trait Overlay<E> {
	/// Outlines `elements`, replacing whatever was shown before.
	fn show(&self, elements: &[E], hide_after_timeout: bool);

	fn hide(&self);
}

/// One call made to a [`RecordingOverlay`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayCall<E> {
	Show { elements: Vec<E>, hide_after_timeout: bool },
	Hide,
}

/// Overlay that draws nothing and remembers every call.
pub struct RecordingOverlay<E> {
	calls: RefCell<Vec<OverlayCall<E>>>,
}

impl<E> Default for RecordingOverlay<E> {
	fn default() -> Self {
		Self {
			calls: RefCell::new(Vec::new()),
		}
	}
}

impl<E: Clone> RecordingOverlay<E> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Every call so far, oldest first.
	pub fn calls(&self) -> Vec<OverlayCall<E>> {
		self.calls.borrow().clone()
	}

	pub fn last_call(&self) -> Option<OverlayCall<E>> {
		self.calls.borrow().last().cloned()
	}

	/// Elements currently outlined, `None` when hidden or never shown.
	pub fn visible(&self) -> Option<Vec<E>> {
		match self.calls.borrow().last() {
			Some(OverlayCall::Show { elements, .. }) => Some(elements.clone()),
			_ => None,
		}
	}
}

impl<E: Clone> Overlay<E> for RecordingOverlay<E> {
	fn show(&self, elements: &[E], hide_after_timeout: bool) {
		self.calls.borrow_mut().push(OverlayCall::Show {
			elements: elements.to_vec(),
			hide_after_timeout,
		});
	}

	fn hide(&self) {
		self.calls.borrow_mut().push(OverlayCall::Hide);
	}
}

impl<E> fmt::Debug for RecordingOverlay<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RecordingOverlay")
			.field("calls", &self.calls.borrow().len())
			.finish()
	}
}
