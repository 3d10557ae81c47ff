#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use inspect::memory::{MemoryDom, NodeId};
use inspect::{Diagnostic, Inspector, InspectorConfig, ManualScheduler, RecordingOverlay, SelectionOrigin};

pub const ORIGIN: &str = "https://app.test";
pub const FOREIGN: &str = "https://ads.example";

pub type Selections = Rc<RefCell<Vec<(NodeId, SelectionOrigin)>>>;

/// A session over a [`MemoryDom`] with every collaborator recorded.
pub struct Harness {
	pub dom: Rc<MemoryDom>,
	pub overlay: Rc<RecordingOverlay<NodeId>>,
	pub scheduler: Rc<ManualScheduler>,
	pub selections: Selections,
	pub diagnostics: Rc<RefCell<Vec<Diagnostic>>>,
	pub inspector: Inspector<MemoryDom>,
}

impl Harness {
	pub fn new(dom: MemoryDom) -> Self {
		Self::with(dom, |config| config)
	}

	pub fn with(
		dom: MemoryDom,
		configure: impl FnOnce(InspectorConfig<MemoryDom>) -> InspectorConfig<MemoryDom>,
	) -> Self {
		let dom = Rc::new(dom);
		let overlay = Rc::new(RecordingOverlay::new());
		let scheduler = Rc::new(ManualScheduler::new());
		let selections: Selections = Rc::default();
		let diagnostics: Rc<RefCell<Vec<Diagnostic>>> = Rc::default();

		let sink = Rc::clone(&selections);
		let diag_sink = Rc::clone(&diagnostics);
		let config = InspectorConfig::new(dom.clone(), overlay.clone(), scheduler.clone())
			.on_select_node(move |element, meta| sink.borrow_mut().push((*element, meta.origin)))
			.on_diagnostic(move |diagnostic| diag_sink.borrow_mut().push(diagnostic.clone()));

		Self {
			inspector: Inspector::new(configure(config)),
			dom,
			overlay,
			scheduler,
			selections,
			diagnostics,
		}
	}

	pub fn selections(&self) -> Vec<(NodeId, SelectionOrigin)> {
		self.selections.borrow().clone()
	}

	pub fn diagnostics(&self) -> Vec<Diagnostic> {
		self.diagnostics.borrow().clone()
	}
}

/// Top document with one same-origin iframe holding a button.
///
/// Returns the document, the iframe and the button inside it.
pub fn page_with_frame(frame_origin: &str) -> (MemoryDom, NodeId, NodeId) {
	let dom = MemoryDom::new(ORIGIN);
	let (frame, content) = dom.append_frame(dom.body(), frame_origin);
	let body = dom.body_of(content).expect("content document has a body");
	let button = dom.append_element(body, "button");
	dom.append_text(button, "Pay");
	(dom, frame, button)
}
