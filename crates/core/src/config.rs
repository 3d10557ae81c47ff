//! Session configuration.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use inspect_protocol::SelectionMeta;

use crate::debounce::{DEFAULT_WINDOW, SelectCallback};
use crate::dom::Dom;
use crate::error::Diagnostic;
use crate::overlay::Overlay;
use crate::scheduler::Scheduler;

/// Receives swallowed failures.
pub type DiagnosticHook = Rc<dyn Fn(&Diagnostic)>;

/// Everything an [`Inspector`](crate::Inspector) is built from.
///
/// # Example
///
/// ```ignore
/// let config = InspectorConfig::new(dom, overlay, scheduler)
///     .on_select_node(|element, meta| println!("{element:?} ({})", meta.origin))
///     .debounce_window(Duration::from_millis(100));
/// let inspector = Inspector::new(config);
/// ```
pub struct InspectorConfig<D: Dom> {
	pub(crate) dom: Rc<D>,
	pub(crate) view: Option<D::View>,
	pub(crate) overlay: Rc<dyn Overlay<D::Element>>,
	pub(crate) scheduler: Rc<dyn Scheduler>,
	pub(crate) on_select_node: Option<SelectCallback<D::Element>>,
	pub(crate) debounce_window: Duration,
	pub(crate) on_diagnostic: Option<DiagnosticHook>,
}

impl<D: Dom> InspectorConfig<D> {
	/// Starts a configuration with the root view set to
	/// [`Dom::default_view`], no selection callback, and a 200 ms window.
	pub fn new(dom: Rc<D>, overlay: Rc<dyn Overlay<D::Element>>, scheduler: Rc<dyn Scheduler>) -> Self {
		let view = dom.default_view();
		Self {
			dom,
			view,
			overlay,
			scheduler,
			on_select_node: None,
			debounce_window: DEFAULT_WINDOW,
			on_diagnostic: None,
		}
	}

	/// Overrides the root view. `None` makes every listener operation a no-op.
	pub fn view(mut self, view: Option<D::View>) -> Self {
		self.view = view;
		self
	}

	/// Callback for settled selections.
	pub fn on_select_node(mut self, callback: impl Fn(&D::Element, &SelectionMeta) + 'static) -> Self {
		self.on_select_node = Some(Rc::new(callback));
		self
	}

	pub fn debounce_window(mut self, window: Duration) -> Self {
		self.debounce_window = window;
		self
	}

	/// Hook for failures the session swallows. Silent when unset.
	pub fn on_diagnostic(mut self, hook: impl Fn(&Diagnostic) + 'static) -> Self {
		self.on_diagnostic = Some(Rc::new(hook));
		self
	}

	pub fn root_view(&self) -> Option<&D::View> {
		self.view.as_ref()
	}

	pub fn window(&self) -> Duration {
		self.debounce_window
	}
}

impl<D: Dom> fmt::Debug for InspectorConfig<D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("InspectorConfig")
			.field("view", &self.view)
			.field("debounce_window", &self.debounce_window)
			.field("on_select_node", &self.on_select_node.is_some())
			.field("on_diagnostic", &self.on_diagnostic.is_some())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::memory::MemoryDom;
	use crate::overlay::RecordingOverlay;
	use crate::scheduler::ManualScheduler;

	fn config() -> InspectorConfig<MemoryDom> {
		InspectorConfig::new(
			Rc::new(MemoryDom::new("https://app.test")),
			Rc::new(RecordingOverlay::new()),
			Rc::new(ManualScheduler::new()),
		)
	}

	#[test]
	fn view_defaults_to_host_default() {
		let config = config();
		assert_eq!(config.root_view(), Some(&config.dom.document()));
		assert_eq!(config.window(), DEFAULT_WINDOW);
		assert!(config.on_select_node.is_none());
	}

	#[test]
	fn builder_overrides_apply() {
		let config = config()
			.view(None)
			.debounce_window(Duration::from_millis(50))
			.on_select_node(|_, _| {})
			.on_diagnostic(|_| {});

		assert_eq!(config.root_view(), None);
		assert_eq!(config.window(), Duration::from_millis(50));
		assert!(config.on_select_node.is_some());
		assert!(config.on_diagnostic.is_some());
	}
}
