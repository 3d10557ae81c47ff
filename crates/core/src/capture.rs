//! Event capture layer.
//!
//! The inspector listens to a fixed set of pointer and mouse events, always in
//! the capture phase so it sees them before any page handler can stop them.
//! [`attach`] and [`detach`] move that whole set on or off one view.

use tracing::trace;

use crate::dom::{Dom, EventKind, Listener};
use crate::error::FrameResult;

/// Events registered on every inspected view.
pub const LISTENED_EVENTS: [EventKind; 7] = [
	EventKind::Click,
	EventKind::MouseDown,
	EventKind::MouseOver,
	EventKind::MouseUp,
	EventKind::PointerDown,
	EventKind::PointerOver,
	EventKind::PointerUp,
];

/// What the inspector does with a captured event (besides blocking it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
	/// Commit the selection and leave inspect mode.
	Commit,
	/// Nothing beyond keeping it from the page.
	Suppress,
	/// Offer the target as a click-origin selection.
	Select,
	/// Follow the pointer: overlay, frame tracking, hover-origin selection.
	Hover,
}

pub fn reaction(kind: EventKind) -> Reaction {
	match kind {
		EventKind::Click => Reaction::Commit,
		EventKind::PointerDown => Reaction::Select,
		EventKind::PointerOver => Reaction::Hover,
		EventKind::MouseDown | EventKind::MouseOver | EventKind::MouseUp | EventKind::PointerUp => {
			Reaction::Suppress
		}
	}
}

/// Registers `listener` for every event in [`LISTENED_EVENTS`] on `view`.
///
/// Returns `Ok(false)` without touching anything when the view has no
/// listener API. If the host rejects one registration, the ones already made
/// are rolled back before the error is returned.
pub fn attach<D: Dom>(dom: &D, view: &D::View, listener: &Listener<D::Event>) -> FrameResult<bool> {
	if !dom.has_listener_api(view) {
		trace!(?view, "view has no listener API, not attaching");
		return Ok(false);
	}

	for (added, kind) in LISTENED_EVENTS.into_iter().enumerate() {
		if let Err(err) = dom.add_listener(view, kind, listener) {
			for &undo in &LISTENED_EVENTS[..added] {
				let _ = dom.remove_listener(view, undo, listener);
			}
			return Err(err);
		}
	}

	Ok(true)
}

/// Removes `listener` for every event in [`LISTENED_EVENTS`] from `view`.
///
/// Every kind is attempted even after a failure; the first failure is
/// returned.
pub fn detach<D: Dom>(dom: &D, view: &D::View, listener: &Listener<D::Event>) -> FrameResult<bool> {
	if !dom.has_listener_api(view) {
		return Ok(false);
	}

	let mut first_err = None;
	for kind in LISTENED_EVENTS {
		if let Err(err) = dom.remove_listener(view, kind, listener) {
			first_err.get_or_insert(err);
		}
	}

	match first_err {
		Some(err) => Err(err),
		None => Ok(true),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::FrameError;
	use crate::memory::{MemoryDom, MemoryEvent};

	fn listener() -> Listener<MemoryEvent> {
		Listener::new(|_| {})
	}

	#[test]
	fn attach_registers_full_set_once() {
		let dom = MemoryDom::new("https://app.test");
		let view = dom.document();
		let listener = listener();

		assert_eq!(attach(&dom, &view, &listener), Ok(true));
		assert_eq!(attach(&dom, &view, &listener), Ok(true));
		assert_eq!(dom.listener_count(view), LISTENED_EVENTS.len());

		assert_eq!(detach(&dom, &view, &listener), Ok(true));
		assert_eq!(dom.listener_count(view), 0);
	}

	#[test]
	fn views_without_listener_api_are_skipped() {
		let dom = MemoryDom::new("https://app.test");
		let view = dom.document();
		dom.strip_listener_api(view);

		assert_eq!(attach(&dom, &view, &listener()), Ok(false));
		assert_eq!(detach(&dom, &view, &listener()), Ok(false));
		assert_eq!(dom.listener_count(view), 0);
	}

	#[test]
	fn cross_origin_view_rejects_attach() {
		let dom = MemoryDom::new("https://app.test");
		let (_, content) = dom.append_frame(dom.body(), "https://ads.example");

		let err = attach(&dom, &content, &listener()).unwrap_err();
		assert!(matches!(err, FrameError::CrossOrigin { .. }));
		assert_eq!(dom.listener_count(content), 0);
	}

	#[test]
	fn reactions_follow_event_kind() {
		assert_eq!(reaction(EventKind::Click), Reaction::Commit);
		assert_eq!(reaction(EventKind::PointerDown), Reaction::Select);
		assert_eq!(reaction(EventKind::PointerOver), Reaction::Hover);
		for kind in [
			EventKind::MouseDown,
			EventKind::MouseOver,
			EventKind::MouseUp,
			EventKind::PointerUp,
		] {
			assert_eq!(reaction(kind), Reaction::Suppress);
		}
	}
}
