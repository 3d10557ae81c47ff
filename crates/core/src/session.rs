//! Inspector sessions.
//!
//! An [`Inspector`] is a cheap, clonable handle to one session. The session
//! owns the capture listener, the frame registry and the debouncer; nothing is
//! shared between sessions.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use inspect_protocol::{Command, HighlightRequest, NodeRef, SelectionOrigin, StartOptions};
use tracing::{debug, trace};

use crate::capture::{self, Reaction};
use crate::config::{DiagnosticHook, InspectorConfig};
use crate::debounce::SelectionDebouncer;
use crate::dom::{Dom, DomEvent, Listener};
use crate::error::{Diagnostic, FrameStage};
use crate::frames::FrameRegistry;
use crate::overlay::Overlay;
use crate::scheduler::{Scheduler, TimerId};

/// Whether a session is capturing pointer input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
	#[default]
	Idle,
	Inspecting,
}

impl Mode {
	pub fn as_str(self) -> &'static str {
		match self {
			Mode::Idle => "idle",
			Mode::Inspecting => "inspecting",
		}
	}
}

impl fmt::Display for Mode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

struct State<D: Dom> {
	mode: Mode,
	options: StartOptions,
	frames: FrameRegistry<D>,
}

struct Shared<D: Dom> {
	dom: Rc<D>,
	view: Option<D::View>,
	overlay: Rc<dyn Overlay<D::Element>>,
	debouncer: Option<Rc<SelectionDebouncer<D::Element>>>,
	on_diagnostic: Option<DiagnosticHook>,
	listener: Listener<D::Event>,
	state: RefCell<State<D>>,
}

/// Handle to an inspector session.
pub struct Inspector<D: Dom> {
	shared: Rc<Shared<D>>,
}

/// Non-owning handle, see [`Inspector::downgrade`].
pub struct WeakInspector<D: Dom> {
	shared: Weak<Shared<D>>,
}

impl<D: Dom> Inspector<D> {
	/// Creates an idle session.
	pub fn new(config: InspectorConfig<D>) -> Self {
		let InspectorConfig {
			dom,
			view,
			overlay,
			scheduler,
			on_select_node,
			debounce_window,
			on_diagnostic,
		} = config;

		let debouncer = on_select_node.map(|callback| SelectionDebouncer::new(debounce_window, scheduler, callback));

		let shared = Rc::new_cyclic(|weak: &Weak<Shared<D>>| {
			let weak = weak.clone();
			let listener = Listener::new(move |event: &D::Event| {
				if let Some(shared) = weak.upgrade() {
					shared.handle_event(event);
				}
			});

			Shared {
				dom,
				view,
				overlay,
				debouncer,
				on_diagnostic,
				listener,
				state: RefCell::new(State {
					mode: Mode::Idle,
					options: StartOptions::default(),
					frames: FrameRegistry::new(),
				}),
			}
		});

		Self { shared }
	}

	/// Builds the session one scheduler tick from now and hands it to
	/// `on_ready`.
	///
	/// Hosts that mount before the page has settled use this instead of
	/// [`new`](Self::new). The returned timer can be cleared to abort.
	pub fn deferred(config: InspectorConfig<D>, on_ready: impl FnOnce(Inspector<D>) + 'static) -> TimerId {
		let scheduler: Rc<dyn Scheduler> = Rc::clone(&config.scheduler);
		scheduler.set_timeout(
			Duration::ZERO,
			Box::new(move || {
				trace!("deferred mount");
				on_ready(Inspector::new(config));
			}),
		)
	}

	/// Enters inspect mode with default options.
	pub fn start(&self) {
		self.shared.start(StartOptions::default());
	}

	pub fn start_with(&self, options: StartOptions) {
		self.shared.start(options);
	}

	/// Leaves inspect mode: hides the overlay and releases every listener.
	pub fn stop(&self) {
		self.shared.stop();
	}

	/// Hides the overlay.
	pub fn clear(&self) {
		self.shared.overlay.hide();
	}

	/// Outlines the requested nodes. Ignored while inspecting.
	pub fn highlight(&self, request: HighlightRequest<D::Element>) {
		self.shared.highlight(request);
	}

	/// Applies a bridge command.
	pub fn dispatch(&self, command: Command<D::Element>) {
		trace!(channel = command.channel(), "dispatch");
		match command {
			Command::ClearHighlights => self.clear(),
			Command::HighlightElements(request) => self.highlight(request),
			Command::Shutdown | Command::StopInspecting => self.stop(),
			Command::StartInspecting => self.start(),
		}
	}

	pub fn mode(&self) -> Mode {
		self.shared.state.borrow().mode
	}

	pub fn is_inspecting(&self) -> bool {
		self.mode() == Mode::Inspecting
	}

	/// Options of the current (or last) inspecting period.
	pub fn options(&self) -> StartOptions {
		self.shared.state.borrow().options
	}

	/// Iframes whose content views currently carry the capture listener.
	pub fn listened_frames(&self) -> Vec<D::Element> {
		self.shared
			.state
			.borrow()
			.frames
			.iter()
			.map(|handle| handle.frame.clone())
			.collect()
	}

	/// Root view listeners are attached to, if any.
	pub fn view(&self) -> Option<&D::View> {
		self.shared.view.as_ref()
	}

	pub fn dom(&self) -> &Rc<D> {
		&self.shared.dom
	}

	/// Whether a selection is waiting for its window to close.
	pub fn has_pending_selection(&self) -> bool {
		self.shared.debouncer.as_ref().is_some_and(|d| d.is_pending())
	}

	pub(crate) fn report(&self, diagnostic: Diagnostic) {
		self.shared.report(diagnostic);
	}

	pub fn downgrade(&self) -> WeakInspector<D> {
		WeakInspector {
			shared: Rc::downgrade(&self.shared),
		}
	}
}

impl<D: Dom> Shared<D> {
	fn start(&self, options: StartOptions) {
		{
			let mut state = self.state.borrow_mut();
			if state.mode == Mode::Inspecting {
				trace!("already inspecting");
				return;
			}
			state.mode = Mode::Inspecting;
			state.options = options;
		}

		match &self.view {
			Some(view) => match capture::attach(&*self.dom, view, &self.listener) {
				Ok(true) => {}
				Ok(false) => debug!("root view has no listener API"),
				Err(err) => self.report(Diagnostic::RootUnreachable(err)),
			},
			None => debug!("no root view"),
		}
		debug!(stop_on_click = options.stop_on_click, block_events = options.block_events, "inspecting");
	}

	fn stop(&self) {
		let (was, mut frames) = {
			let mut state = self.state.borrow_mut();
			let was = std::mem::replace(&mut state.mode, Mode::Idle);
			(was, std::mem::take(&mut state.frames))
		};

		self.overlay.hide();
		if let Some(view) = &self.view {
			if let Err(err) = capture::detach(&*self.dom, view, &self.listener) {
				self.report(Diagnostic::RootUnreachable(err));
			}
		}
		for (_, error) in frames.release_all(&*self.dom, &self.listener) {
			self.report(Diagnostic::FrameUnreachable {
				stage: FrameStage::Detach,
				error,
			});
		}

		if was == Mode::Inspecting {
			debug!("stopped inspecting");
		}
	}

	fn highlight(&self, request: HighlightRequest<D::Element>) {
		if self.state.borrow().mode == Mode::Inspecting {
			trace!("highlight ignored while inspecting");
			return;
		}

		let elements: Vec<D::Element> = request
			.nodes
			.into_iter()
			.filter_map(|node| match node {
				NodeRef::Selector(selector) => self.dom.query_selector(&selector),
				NodeRef::Element(element) => Some(element),
			})
			.filter(|element| self.dom.is_element_node(element))
			.collect();

		if elements.is_empty() {
			self.overlay.hide();
		} else {
			self.overlay.show(&elements, request.hide_after_timeout);
		}
	}

	fn handle_event(&self, event: &D::Event) {
		let Some(kind) = event.kind() else {
			return;
		};
		let options = {
			let state = self.state.borrow();
			if state.mode == Mode::Idle {
				trace!(%kind, "event while idle, ignored");
				return;
			}
			state.options
		};

		if options.block_events {
			event.prevent_default();
			event.stop_propagation();
		}

		match capture::reaction(kind) {
			Reaction::Suppress => {}
			Reaction::Commit => {
				if options.stop_on_click {
					self.stop();
				}
			}
			Reaction::Select => {
				if let Some(target) = event.target() {
					self.offer(target, SelectionOrigin::Click);
				}
			}
			Reaction::Hover => {
				if let Some(target) = event.target() {
					self.hover(target);
				}
			}
		}
	}

	fn hover(&self, target: D::Element) {
		if self.dom.is_frame(&target) {
			self.track_frame(&target);
		}
		self.overlay.show(std::slice::from_ref(&target), false);
		self.offer(target, SelectionOrigin::Hover);
	}

	fn track_frame(&self, frame: &D::Element) {
		if self.state.borrow().frames.contains(frame) {
			return;
		}

		let handle = match FrameRegistry::attach(&*self.dom, frame, &self.listener) {
			Ok(handle) => handle,
			Err(error) => {
				self.report(Diagnostic::FrameUnreachable {
					stage: FrameStage::Attach,
					error,
				});
				return;
			}
		};

		let stale = {
			let mut state = self.state.borrow_mut();
			if state.mode == Mode::Inspecting {
				state.frames.insert(handle);
				None
			} else {
				Some(handle)
			}
		};
		// Stopped while the listener was being added.
		if let Some(handle) = stale {
			if let Err(error) = capture::detach(&*self.dom, &handle.view, &self.listener) {
				self.report(Diagnostic::FrameUnreachable {
					stage: FrameStage::Detach,
					error,
				});
			}
		}
	}

	fn offer(&self, target: D::Element, origin: SelectionOrigin) {
		if let Some(debouncer) = &self.debouncer {
			debouncer.select(target, origin);
		}
	}

	fn report(&self, diagnostic: Diagnostic) {
		debug!(%diagnostic, "swallowed");
		if let Some(hook) = &self.on_diagnostic {
			hook(&diagnostic);
		}
	}
}

impl<D: Dom> Drop for Shared<D> {
	fn drop(&mut self) {
		let (mode, mut frames) = {
			let state = self.state.get_mut();
			(state.mode, std::mem::take(&mut state.frames))
		};
		if mode != Mode::Inspecting {
			return;
		}
		if let Some(view) = &self.view {
			if let Err(err) = capture::detach(&*self.dom, view, &self.listener) {
				self.report(Diagnostic::RootUnreachable(err));
			}
		}
		for (_, error) in frames.release_all(&*self.dom, &self.listener) {
			self.report(Diagnostic::FrameUnreachable {
				stage: FrameStage::Detach,
				error,
			});
		}
		trace!("session dropped while inspecting, listeners released");
	}
}

impl<D: Dom> Clone for Inspector<D> {
	fn clone(&self) -> Self {
		Self {
			shared: Rc::clone(&self.shared),
		}
	}
}

impl<D: Dom> fmt::Debug for Inspector<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.shared.state.borrow();
		f.debug_struct("Inspector")
			.field("mode", &state.mode)
			.field("view", &self.shared.view)
			.field("frames", &state.frames)
			.finish_non_exhaustive()
	}
}

impl<D: Dom> WeakInspector<D> {
	pub fn upgrade(&self) -> Option<Inspector<D>> {
		self.shared.upgrade().map(|shared| Inspector { shared })
	}
}

impl<D: Dom> Clone for WeakInspector<D> {
	fn clone(&self) -> Self {
		Self {
			shared: Weak::clone(&self.shared),
		}
	}
}

impl<D: Dom> fmt::Debug for WeakInspector<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WeakInspector")
			.field("alive", &(self.shared.strong_count() > 0))
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::Cell;

	use crate::capture::LISTENED_EVENTS;
	use crate::dom::EventKind;
	use crate::error::FrameResult;
	use crate::memory::{MemoryDom, MemoryEvent, NodeId};
	use crate::overlay::{OverlayCall, RecordingOverlay};
	use crate::scheduler::ManualScheduler;

	fn session() -> (Inspector<MemoryDom>, Rc<RecordingOverlay<crate::memory::NodeId>>) {
		let dom = Rc::new(MemoryDom::new("https://app.test"));
		let overlay = Rc::new(RecordingOverlay::new());
		let config = InspectorConfig::new(dom, overlay.clone(), Rc::new(ManualScheduler::new()));
		(Inspector::new(config), overlay)
	}

	#[test]
	fn start_is_idempotent() {
		let (inspector, _) = session();
		inspector.start();
		inspector.start();

		let dom = inspector.dom();
		assert_eq!(dom.listener_count(dom.document()), LISTENED_EVENTS.len());

		inspector.stop();
		assert_eq!(dom.total_listeners(), 0);
		assert_eq!(inspector.mode(), Mode::Idle);
	}

	#[test]
	fn stop_while_idle_still_hides() {
		let (inspector, overlay) = session();
		inspector.stop();
		assert_eq!(overlay.calls(), [OverlayCall::Hide]);
		assert_eq!(inspector.mode(), Mode::Idle);
	}

	#[test]
	fn dropping_inspecting_session_releases_listeners() {
		let (inspector, _) = session();
		let dom = Rc::clone(inspector.dom());
		inspector.start();
		assert!(dom.total_listeners() > 0);

		drop(inspector);
		assert_eq!(dom.total_listeners(), 0);
	}

	#[test]
	fn weak_handle_does_not_keep_session_alive() {
		let (inspector, _) = session();
		let weak = inspector.downgrade();
		assert!(weak.upgrade().is_some());

		drop(inspector);
		assert!(weak.upgrade().is_none());
	}

	#[test]
	fn idle_session_leaves_events_alone() {
		let (inspector, _) = session();
		let dom = inspector.dom();
		let button = dom.append_element(dom.body(), "button");

		let outcome = dom.dispatch(EventKind::Click, button);
		assert!(!outcome.default_prevented);
		assert_eq!(outcome.listeners_run, 0);
	}

	/// Reads session state from inside `add_listener`.
	struct Reentrant {
		inner: MemoryDom,
		session: RefCell<Option<WeakInspector<Reentrant>>>,
		reads: Cell<usize>,
	}

	impl Dom for Reentrant {
		type Element = NodeId;
		type View = NodeId;
		type Event = MemoryEvent;

		fn default_view(&self) -> Option<NodeId> {
			self.inner.default_view()
		}

		fn has_listener_api(&self, view: &NodeId) -> bool {
			self.inner.has_listener_api(view)
		}

		fn add_listener(&self, view: &NodeId, kind: EventKind, listener: &Listener<MemoryEvent>) -> FrameResult<()> {
			if let Some(inspector) = self.session.borrow().as_ref().and_then(WeakInspector::upgrade) {
				inspector.listened_frames();
				self.reads.set(self.reads.get() + 1);
			}
			self.inner.add_listener(view, kind, listener)
		}

		fn remove_listener(&self, view: &NodeId, kind: EventKind, listener: &Listener<MemoryEvent>) -> FrameResult<()> {
			self.inner.remove_listener(view, kind, listener)
		}

		fn is_frame(&self, element: &NodeId) -> bool {
			self.inner.is_frame(element)
		}

		fn content_view(&self, frame: &NodeId) -> FrameResult<NodeId> {
			self.inner.content_view(frame)
		}

		fn is_element_node(&self, element: &NodeId) -> bool {
			self.inner.is_element_node(element)
		}

		fn query_selector(&self, selector: &str) -> Option<NodeId> {
			self.inner.query_selector(selector)
		}
	}

	#[test]
	fn frame_listeners_are_added_with_state_unborrowed() {
		let inner = MemoryDom::new("https://app.test");
		let (frame, content) = inner.append_frame(inner.body(), "https://app.test");
		let dom = Rc::new(Reentrant {
			inner,
			session: RefCell::default(),
			reads: Cell::new(0),
		});
		let config = InspectorConfig::new(dom.clone(), Rc::new(RecordingOverlay::new()), Rc::new(ManualScheduler::new()));
		let inspector = Inspector::new(config);
		inspector.start();
		*dom.session.borrow_mut() = Some(inspector.downgrade());

		dom.inner.dispatch(EventKind::PointerOver, frame);

		assert_eq!(dom.reads.get(), LISTENED_EVENTS.len());
		assert_eq!(inspector.listened_frames(), [frame]);
		assert_eq!(dom.inner.listener_count(content), LISTENED_EVENTS.len());

		inspector.stop();
		assert_eq!(dom.inner.total_listeners(), 0);
	}
}
