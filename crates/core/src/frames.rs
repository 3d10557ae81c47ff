//! Child frames the inspector has extended its listeners into.
//!
//! Frames are discovered lazily, when the pointer passes over an iframe. Any
//! of them may become unreachable at any moment (a cross-origin navigation is
//! enough), so membership here only means "listeners were added once"; it says
//! nothing about whether the frame can still be touched.

use std::fmt;

use tracing::debug;

use crate::capture;
use crate::dom::{Dom, Listener};
use crate::error::{FrameError, FrameResult};

/// An iframe element and the content view listeners were added to.
pub struct FrameHandle<D: Dom> {
	pub frame: D::Element,
	pub view: D::View,
}

impl<D: Dom> Clone for FrameHandle<D> {
	fn clone(&self) -> Self {
		Self {
			frame: self.frame.clone(),
			view: self.view.clone(),
		}
	}
}

impl<D: Dom> fmt::Debug for FrameHandle<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FrameHandle")
			.field("frame", &self.frame)
			.field("view", &self.view)
			.finish()
	}
}

/// Per-session set of listened-to frames, keyed by iframe element.
pub struct FrameRegistry<D: Dom> {
	frames: Vec<FrameHandle<D>>,
}

impl<D: Dom> Default for FrameRegistry<D> {
	fn default() -> Self {
		Self { frames: Vec::new() }
	}
}

impl<D: Dom> FrameRegistry<D> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn contains(&self, frame: &D::Element) -> bool {
		self.frames.iter().any(|handle| &handle.frame == frame)
	}

	pub fn len(&self) -> usize {
		self.frames.len()
	}

	pub fn is_empty(&self) -> bool {
		self.frames.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &FrameHandle<D>> {
		self.frames.iter()
	}

	/// Extends `listener` into `frame`'s content view.
	///
	/// Returns `Ok(false)` if the frame is already tracked. On error nothing
	/// is recorded, so a later hover retries.
	pub fn track(&mut self, dom: &D, frame: &D::Element, listener: &Listener<D::Event>) -> FrameResult<bool> {
		if self.contains(frame) {
			return Ok(false);
		}
		let handle = Self::attach(dom, frame, listener)?;
		Ok(self.insert(handle))
	}

	/// Adds `listener` to `frame`'s content view without recording it.
	///
	/// Callers that keep the registry behind a `RefCell` use this with no
	/// borrow held, then [`insert`](Self::insert) the handle.
	pub fn attach(dom: &D, frame: &D::Element, listener: &Listener<D::Event>) -> FrameResult<FrameHandle<D>> {
		let view = dom.content_view(frame)?;
		capture::attach(dom, &view, listener)?;

		debug!(?frame, ?view, "listening to frame");
		Ok(FrameHandle {
			frame: frame.clone(),
			view,
		})
	}

	/// Records an attached frame. Returns `false` if it was already there.
	pub fn insert(&mut self, handle: FrameHandle<D>) -> bool {
		if self.contains(&handle.frame) {
			return false;
		}
		self.frames.push(handle);
		true
	}

	/// Detaches `listener` from every tracked frame and empties the set.
	///
	/// A failing frame does not stop the others from being released. Failures
	/// are returned to the caller, paired with their iframe element.
	pub fn release_all(&mut self, dom: &D, listener: &Listener<D::Event>) -> Vec<(D::Element, FrameError)> {
		let mut failures = Vec::new();

		for handle in self.frames.drain(..) {
			if let Err(err) = capture::detach(dom, &handle.view, listener) {
				debug!(frame = ?handle.frame, error = %err, "frame unreachable on release");
				failures.push((handle.frame, err));
			}
		}

		failures
	}
}

impl<D: Dom> fmt::Debug for FrameRegistry<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.frames.iter()).finish()
	}
}
