//! Capability traits the engine needs from a document host.
//!
//! A host is anything that can hand out element and view handles and register
//! capture-phase listeners on views: a browser through `web-sys`, the
//! in-memory [`MemoryDom`](crate::memory::MemoryDom), or a renderer with no DOM
//! at all (where [`Dom::has_listener_api`] simply answers `false`).

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::FrameResult;

/// DOM events the inspector listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
	Click,
	MouseDown,
	MouseOver,
	MouseUp,
	PointerDown,
	PointerOver,
	PointerUp,
}

impl EventKind {
	/// DOM event type string.
	pub fn as_str(self) -> &'static str {
		match self {
			EventKind::Click => "click",
			EventKind::MouseDown => "mousedown",
			EventKind::MouseOver => "mouseover",
			EventKind::MouseUp => "mouseup",
			EventKind::PointerDown => "pointerdown",
			EventKind::PointerOver => "pointerover",
			EventKind::PointerUp => "pointerup",
		}
	}

	/// Parses a DOM event type string. Unknown types yield `None`.
	pub fn parse(name: &str) -> Option<Self> {
		Some(match name {
			"click" => EventKind::Click,
			"mousedown" => EventKind::MouseDown,
			"mouseover" => EventKind::MouseOver,
			"mouseup" => EventKind::MouseUp,
			"pointerdown" => EventKind::PointerDown,
			"pointerover" => EventKind::PointerOver,
			"pointerup" => EventKind::PointerUp,
			_ => return None,
		})
	}
}

impl fmt::Display for EventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// An event delivered to a listener.
pub trait DomEvent {
	type Element;

	/// Event type, `None` for types the inspector does not know.
	fn kind(&self) -> Option<EventKind>;

	/// Element the event was dispatched to.
	fn target(&self) -> Option<Self::Element>;

	fn prevent_default(&self);

	fn stop_propagation(&self);
}

/// Document host the inspector runs against.
///
/// Every listener registered through this trait is a capture-phase listener.
/// Adding the same listener twice for the same view and kind must be a no-op,
/// as must removing one that is not registered.
pub trait Dom: 'static {
	/// Element handle. Equality is identity.
	type Element: Clone + PartialEq + fmt::Debug + 'static;
	/// Window-like listener target (a window, a document, or an element).
	type View: Clone + PartialEq + fmt::Debug + 'static;
	type Event: DomEvent<Element = Self::Element> + 'static;

	/// View used when the host does not configure one (the global window).
	fn default_view(&self) -> Option<Self::View>;

	/// Whether `view` can take listeners at all.
	fn has_listener_api(&self, view: &Self::View) -> bool;

	/// Registers `listener` for `kind` on `view` in the capture phase.
	fn add_listener(
		&self,
		view: &Self::View,
		kind: EventKind,
		listener: &Listener<Self::Event>,
	) -> FrameResult<()>;

	/// Removes a listener previously added with [`add_listener`](Self::add_listener).
	fn remove_listener(
		&self,
		view: &Self::View,
		kind: EventKind,
		listener: &Listener<Self::Event>,
	) -> FrameResult<()>;

	/// Whether `element` is an iframe.
	fn is_frame(&self, element: &Self::Element) -> bool;

	/// Content window of an iframe.
	///
	/// Fails when the frame is cross-origin or has no content.
	fn content_view(&self, frame: &Self::Element) -> FrameResult<Self::View>;

	/// Whether `element` is an element node (as opposed to text, comments, ...).
	fn is_element_node(&self, element: &Self::Element) -> bool;

	/// First element of the host document matching `selector`.
	///
	/// Invalid selectors match nothing.
	fn query_selector(&self, selector: &str) -> Option<Self::Element>;
}

/// Unique identifier for listeners.
pub type ListenerId = u64;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

fn next_listener_id() -> ListenerId {
	NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed)
}

/// Shared event handler with a stable identity.
///
/// Clones share the identity, so a listener added to several views can be
/// removed from each of them later.
pub struct Listener<E: ?Sized> {
	id: ListenerId,
	handler: Rc<dyn Fn(&E)>,
}

impl<E: ?Sized> Listener<E> {
	pub fn new(handler: impl Fn(&E) + 'static) -> Self {
		Self {
			id: next_listener_id(),
			handler: Rc::new(handler),
		}
	}

	pub fn id(&self) -> ListenerId {
		self.id
	}

	/// Invokes the handler.
	pub fn call(&self, event: &E) {
		(self.handler)(event);
	}
}

impl<E: ?Sized> Clone for Listener<E> {
	fn clone(&self) -> Self {
		Self {
			id: self.id,
			handler: Rc::clone(&self.handler),
		}
	}
}

impl<E: ?Sized> PartialEq for Listener<E> {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl<E: ?Sized> fmt::Debug for Listener<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Listener").field("id", &self.id).finish()
	}
}
