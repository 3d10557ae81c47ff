//! In-memory document host.
//!
//! [`MemoryDom`] is an arena tree of documents, elements and text nodes that
//! implements [`Dom`]. It models exactly what the inspector depends on:
//!
//! - documents carry an origin; listener calls and content access on a
//!   document whose origin differs from the top document's fail with
//!   [`FrameError::CrossOrigin`]
//! - iframes own a nested document (see [`MemoryDom::append_frame`]) which can
//!   later be navigated to another origin
//! - [`MemoryDom::dispatch`] runs capture listeners from the document down to
//!   the target, then bubble listeners back up, honouring `stopPropagation`;
//!   events never cross a frame boundary
//!
//! Node ids are plain indices and serialize as numbers, so they can travel in
//! JSON highlight payloads.

mod fixture;
mod selector;

pub use fixture::{Fixture, FixtureElement, FixtureNode};

use std::cell::{Cell, RefCell};
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dom::{Dom, DomEvent, EventKind, Listener, ListenerId};
use crate::error::{FrameError, FrameResult};
use selector::{SelectorList, SelectorTarget};

/// Handle of a node in a [`MemoryDom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

#[derive(Debug)]
enum NodeData {
	Document {
		origin: String,
	},
	Element {
		tag: String,
		attrs: Vec<(String, String)>,
		content: Option<NodeId>,
	},
	Text(String),
}

#[derive(Debug)]
struct Node {
	data: NodeData,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
	listener_api: bool,
}

type ListenerKey = (NodeId, EventKind, bool, ListenerId);

#[derive(Default)]
struct Tree {
	nodes: Vec<Node>,
	listeners: IndexMap<ListenerKey, Listener<MemoryEvent>>,
}

impl Tree {
	fn push(&mut self, parent: Option<NodeId>, data: NodeData) -> NodeId {
		let id = NodeId(self.nodes.len());
		self.nodes.push(Node {
			data,
			parent,
			children: Vec::new(),
			listener_api: true,
		});
		if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p.0)) {
			parent.children.push(id);
		}
		id
	}

	fn node(&self, id: NodeId) -> Option<&Node> {
		self.nodes.get(id.0)
	}

	fn new_document(&mut self, origin: &str) -> (NodeId, NodeId) {
		let doc = self.push(
			None,
			NodeData::Document {
				origin: origin.to_string(),
			},
		);
		let html = self.push(Some(doc), element_data("html"));
		self.push(Some(html), element_data("head"));
		let body = self.push(Some(html), element_data("body"));
		(doc, body)
	}

	fn owner_document(&self, mut id: NodeId) -> Option<NodeId> {
		loop {
			let node = self.node(id)?;
			if matches!(node.data, NodeData::Document { .. }) {
				return Some(id);
			}
			id = node.parent?;
		}
	}

	fn origin(&self, id: NodeId) -> Option<&str> {
		match &self.node(self.owner_document(id)?)?.data {
			NodeData::Document { origin } => Some(origin.as_str()),
			_ => None,
		}
	}

	fn descendants(&self, root: NodeId) -> Vec<NodeId> {
		let mut out = Vec::new();
		let mut stack: Vec<NodeId> = self.node(root).map(|n| n.children.iter().rev().copied().collect()).unwrap_or_default();
		while let Some(id) = stack.pop() {
			out.push(id);
			if let Some(node) = self.node(id) {
				stack.extend(node.children.iter().rev().copied());
			}
		}
		out
	}
}

impl SelectorTarget for Tree {
	fn tag(&self, node: NodeId) -> Option<&str> {
		match &self.node(node)?.data {
			NodeData::Element { tag, .. } => Some(tag.as_str()),
			_ => None,
		}
	}

	fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
		match &self.node(node)?.data {
			NodeData::Element { attrs, .. } => attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str()),
			_ => None,
		}
	}

	fn parent_element(&self, node: NodeId) -> Option<NodeId> {
		let parent = self.node(node)?.parent?;
		self.tag(parent).map(|_| parent)
	}
}

fn element_data(tag: &str) -> NodeData {
	NodeData::Element {
		tag: tag.to_ascii_lowercase(),
		attrs: Vec::new(),
		content: None,
	}
}

/// Event object handed to [`MemoryDom`] listeners.
#[derive(Debug)]
pub struct MemoryEvent {
	kind: EventKind,
	target: NodeId,
	default_prevented: Cell<bool>,
	propagation_stopped: Cell<bool>,
}

impl MemoryEvent {
	pub fn new(kind: EventKind, target: NodeId) -> Self {
		Self {
			kind,
			target,
			default_prevented: Cell::new(false),
			propagation_stopped: Cell::new(false),
		}
	}

	pub fn default_prevented(&self) -> bool {
		self.default_prevented.get()
	}

	pub fn propagation_stopped(&self) -> bool {
		self.propagation_stopped.get()
	}
}

impl DomEvent for MemoryEvent {
	type Element = NodeId;

	fn kind(&self) -> Option<EventKind> {
		Some(self.kind)
	}

	fn target(&self) -> Option<NodeId> {
		Some(self.target)
	}

	fn prevent_default(&self) {
		self.default_prevented.set(true);
	}

	fn stop_propagation(&self) {
		self.propagation_stopped.set(true);
	}
}

/// What happened to a dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
	pub default_prevented: bool,
	pub propagation_stopped: bool,
	/// Listeners that ran, in both phases.
	pub listeners_run: usize,
}

/// Arena-backed document with nested frames.
pub struct MemoryDom {
	tree: RefCell<Tree>,
	document: NodeId,
	body: NodeId,
	origin: String,
}

impl MemoryDom {
	/// Creates an empty `html > (head, body)` document served from `origin`.
	pub fn new(origin: &str) -> Self {
		let mut tree = Tree::default();
		let (document, body) = tree.new_document(origin);
		Self {
			tree: RefCell::new(tree),
			document,
			body,
			origin: origin.to_string(),
		}
	}

	/// Top-level document node (the default view).
	pub fn document(&self) -> NodeId {
		self.document
	}

	/// `<body>` of the top-level document.
	pub fn body(&self) -> NodeId {
		self.body
	}

	pub fn origin(&self) -> &str {
		&self.origin
	}

	/// `<body>` of any document in this tree.
	pub fn body_of(&self, document: NodeId) -> Option<NodeId> {
		let tree = self.tree.borrow();
		tree.descendants(document).into_iter().find(|&id| tree.tag(id) == Some("body"))
	}

	/// Appends a child element and returns it.
	pub fn append_element(&self, parent: NodeId, tag: &str) -> NodeId {
		self.tree.borrow_mut().push(Some(parent), element_data(tag))
	}

	pub fn append_text(&self, parent: NodeId, text: &str) -> NodeId {
		self.tree.borrow_mut().push(Some(parent), NodeData::Text(text.to_string()))
	}

	/// Appends an `<iframe>` whose content document is served from `origin`.
	///
	/// Returns the iframe element and its content document.
	pub fn append_frame(&self, parent: NodeId, origin: &str) -> (NodeId, NodeId) {
		let mut tree = self.tree.borrow_mut();
		let frame = tree.push(Some(parent), element_data("iframe"));
		let (document, _) = tree.new_document(origin);
		if let NodeData::Element { content, .. } = &mut tree.nodes[frame.0].data {
			*content = Some(document);
		}
		(frame, document)
	}

	/// Points an iframe's content document at another origin.
	pub fn navigate_frame(&self, frame: NodeId, origin: &str) {
		let mut tree = self.tree.borrow_mut();
		let content = match tree.node(frame).map(|n| &n.data) {
			Some(NodeData::Element { content: Some(doc), .. }) => *doc,
			_ => return,
		};
		if let NodeData::Document { origin: current } = &mut tree.nodes[content.0].data {
			*current = origin.to_string();
		}
	}

	/// Sets (or replaces) an attribute.
	pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
		let mut tree = self.tree.borrow_mut();
		let Some(NodeData::Element { attrs, .. }) = tree.nodes.get_mut(node.0).map(|n| &mut n.data) else {
			return;
		};
		let name = name.to_ascii_lowercase();
		match attrs.iter_mut().find(|(k, _)| *k == name) {
			Some((_, v)) => *v = value.to_string(),
			None => attrs.push((name, value.to_string())),
		}
	}

	pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
		self.tree.borrow().attr(node, &name.to_ascii_lowercase()).map(str::to_string)
	}

	/// Lowercase tag name of an element.
	pub fn tag_name(&self, node: NodeId) -> Option<String> {
		self.tree.borrow().tag(node).map(str::to_string)
	}

	pub fn parent(&self, node: NodeId) -> Option<NodeId> {
		self.tree.borrow().node(node)?.parent
	}

	/// Concatenated text of a node and its descendants.
	pub fn text_content(&self, node: NodeId) -> String {
		let tree = self.tree.borrow();
		let mut nodes = vec![node];
		nodes.extend(tree.descendants(node));
		nodes
			.into_iter()
			.filter_map(|id| match &tree.node(id)?.data {
				NodeData::Text(text) => Some(text.as_str()),
				_ => None,
			})
			.collect()
	}

	/// Makes `node` behave like a target without `addEventListener`.
	pub fn strip_listener_api(&self, node: NodeId) {
		if let Some(node) = self.tree.borrow_mut().nodes.get_mut(node.0) {
			node.listener_api = false;
		}
	}

	/// Listeners registered on `node`, both phases.
	pub fn listener_count(&self, node: NodeId) -> usize {
		self.tree.borrow().listeners.keys().filter(|key| key.0 == node).count()
	}

	/// Listeners registered anywhere in the tree.
	pub fn total_listeners(&self) -> usize {
		self.tree.borrow().listeners.len()
	}

	/// Registers a bubble-phase listener, the way page scripts usually do.
	pub fn add_page_listener(&self, node: NodeId, kind: EventKind, handler: impl Fn(&MemoryEvent) + 'static) -> Listener<MemoryEvent> {
		let listener = Listener::new(handler);
		self.tree
			.borrow_mut()
			.listeners
			.insert((node, kind, false, listener.id()), listener.clone());
		listener
	}

	/// First element under `scope` matching `selector` (document order).
	pub fn query_selector_in(&self, scope: NodeId, selector: &str) -> Option<NodeId> {
		let list = SelectorList::parse(selector)?;
		let tree = self.tree.borrow();
		tree.descendants(scope).into_iter().find(|&id| list.matches(&*tree, id))
	}

	/// Every element under `scope` matching `selector` (document order).
	pub fn query_selector_all_in(&self, scope: NodeId, selector: &str) -> Vec<NodeId> {
		let Some(list) = SelectorList::parse(selector) else {
			return Vec::new();
		};
		let tree = self.tree.borrow();
		tree.descendants(scope).into_iter().filter(|&id| list.matches(&*tree, id)).collect()
	}

	/// Selector path from the document down to `node`.
	///
	/// Stops early at an ancestor with an `id`; disambiguates same-tag
	/// siblings with `:nth-of-type`.
	pub fn css_path(&self, node: NodeId) -> String {
		let tree = self.tree.borrow();
		let mut segments = Vec::new();
		let mut current = Some(node);

		while let Some(id) = current {
			let Some(tag) = tree.tag(id) else {
				break;
			};
			if let Some(element_id) = tree.attr(id, "id") {
				segments.push(format!("{tag}#{element_id}"));
				break;
			}

			let mut segment = tag.to_string();
			if let Some(parent) = tree.node(id).and_then(|n| n.parent) {
				let same_tag: Vec<NodeId> = tree.nodes[parent.0]
					.children
					.iter()
					.copied()
					.filter(|&sibling| tree.tag(sibling) == Some(tag))
					.collect();
				if same_tag.len() > 1 {
					let index = same_tag.iter().position(|&s| s == id).map_or(1, |i| i + 1);
					segment.push_str(&format!(":nth-of-type({index})"));
				}
			}
			segments.push(segment);
			current = tree.parent_element(id);
		}

		segments.reverse();
		segments.join(" > ")
	}

	/// Dispatches `kind` at `target`: capture phase from the document down,
	/// then bubble phase back up.
	///
	/// Listeners removed while the event is in flight are not called.
	pub fn dispatch(&self, kind: EventKind, target: NodeId) -> DispatchOutcome {
		let event = MemoryEvent::new(kind, target);
		let path = self.event_path(target);
		let mut listeners_run = 0;

		for &node in &path {
			listeners_run += self.run_listeners(node, true, &event);
			if event.propagation_stopped() {
				break;
			}
		}
		if !event.propagation_stopped() {
			for &node in path.iter().rev() {
				listeners_run += self.run_listeners(node, false, &event);
				if event.propagation_stopped() {
					break;
				}
			}
		}

		DispatchOutcome {
			default_prevented: event.default_prevented(),
			propagation_stopped: event.propagation_stopped(),
			listeners_run,
		}
	}

	/// Document-first list of `target` and its ancestors within one document.
	fn event_path(&self, target: NodeId) -> Vec<NodeId> {
		let tree = self.tree.borrow();
		let mut path = Vec::new();
		let mut current = Some(target);
		while let Some(id) = current {
			let Some(node) = tree.node(id) else {
				break;
			};
			path.push(id);
			current = node.parent;
		}
		path.reverse();
		path
	}

	fn run_listeners(&self, node: NodeId, capture: bool, event: &MemoryEvent) -> usize {
		let snapshot: Vec<(ListenerKey, Listener<MemoryEvent>)> = self
			.tree
			.borrow()
			.listeners
			.iter()
			.filter(|(key, _)| key.0 == node && key.1 == event.kind && key.2 == capture)
			.map(|(key, listener)| (*key, listener.clone()))
			.collect();

		let mut ran = 0;
		for (key, listener) in snapshot {
			if !self.tree.borrow().listeners.contains_key(&key) {
				continue;
			}
			listener.call(event);
			ran += 1;
		}
		ran
	}

	fn check_reachable(&self, node: NodeId) -> FrameResult<()> {
		let tree = self.tree.borrow();
		match tree.origin(node) {
			Some(origin) if origin == self.origin => Ok(()),
			Some(origin) => Err(FrameError::CrossOrigin {
				origin: origin.to_string(),
			}),
			None => Err(FrameError::NoContent),
		}
	}
}

impl Dom for MemoryDom {
	type Element = NodeId;
	type View = NodeId;
	type Event = MemoryEvent;

	fn default_view(&self) -> Option<NodeId> {
		Some(self.document)
	}

	fn has_listener_api(&self, view: &NodeId) -> bool {
		self.tree.borrow().node(*view).is_some_and(|n| n.listener_api)
	}

	fn add_listener(&self, view: &NodeId, kind: EventKind, listener: &Listener<MemoryEvent>) -> FrameResult<()> {
		self.check_reachable(*view)?;
		self.tree
			.borrow_mut()
			.listeners
			.entry((*view, kind, true, listener.id()))
			.or_insert_with(|| listener.clone());
		Ok(())
	}

	fn remove_listener(&self, view: &NodeId, kind: EventKind, listener: &Listener<MemoryEvent>) -> FrameResult<()> {
		self.check_reachable(*view)?;
		self.tree
			.borrow_mut()
			.listeners
			.shift_remove(&(*view, kind, true, listener.id()));
		Ok(())
	}

	fn is_frame(&self, element: &NodeId) -> bool {
		self.tree.borrow().tag(*element) == Some("iframe")
	}

	fn content_view(&self, frame: &NodeId) -> FrameResult<NodeId> {
		let content = match self.tree.borrow().node(*frame).map(|n| &n.data) {
			Some(NodeData::Element { content: Some(doc), .. }) => *doc,
			_ => return Err(FrameError::NoContent),
		};
		self.check_reachable(content)?;
		Ok(content)
	}

	fn is_element_node(&self, element: &NodeId) -> bool {
		self.tree.borrow().tag(*element).is_some()
	}

	fn query_selector(&self, selector: &str) -> Option<NodeId> {
		self.query_selector_in(self.document, selector)
	}
}

impl fmt::Debug for MemoryDom {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let tree = self.tree.borrow();
		f.debug_struct("MemoryDom")
			.field("origin", &self.origin)
			.field("nodes", &tree.nodes.len())
			.field("listeners", &tree.listeners.len())
			.finish()
	}
}
