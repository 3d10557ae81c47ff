//! Declarative document trees.
//!
//! ```json
//! {
//!   "origin": "https://app.test",
//!   "children": [
//!     { "tag": "h1", "children": ["Checkout"] },
//!     { "tag": "iframe", "attrs": { "id": "pay" },
//!       "frame": { "origin": "https://app.test", "children": [{ "tag": "button" }] } }
//!   ]
//! }
//! ```
//!
//! Top-level children go into `<body>`. An element with a `frame` becomes an
//! iframe whose content document is built from that nested fixture.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{MemoryDom, NodeData, NodeId};

/// A document: origin plus the children of its `<body>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
	pub origin: String,
	#[serde(default)]
	pub children: Vec<FixtureNode>,
}

/// Text (a bare string) or an element (an object).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FixtureNode {
	Text(String),
	Element(FixtureElement),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureElement {
	pub tag: String,
	#[serde(default)]
	pub attrs: IndexMap<String, String>,
	#[serde(default)]
	pub children: Vec<FixtureNode>,
	/// Content document, for iframes.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub frame: Option<Fixture>,
	/// Simulates a target without `addEventListener`.
	#[serde(default)]
	pub no_listener_api: bool,
}

impl MemoryDom {
	/// Builds a document from a fixture.
	pub fn from_fixture(fixture: &Fixture) -> Self {
		let dom = Self::new(&fixture.origin);
		dom.build_children(dom.body(), &fixture.children);
		dom
	}

	fn build_children(&self, parent: NodeId, children: &[FixtureNode]) {
		for child in children {
			match child {
				FixtureNode::Text(text) => {
					self.append_text(parent, text);
				}
				FixtureNode::Element(element) => self.build_element(parent, element),
			}
		}
	}

	fn build_element(&self, parent: NodeId, element: &FixtureElement) {
		let node = match &element.frame {
			Some(content) => {
				let (frame, document) = self.append_frame(parent, &content.origin);
				if let Some(body) = self.body_of(document) {
					self.build_children(body, &content.children);
				}
				frame
			}
			None => self.append_element(parent, &element.tag),
		};

		for (name, value) in &element.attrs {
			self.set_attribute(node, name, value);
		}
		if element.no_listener_api {
			self.strip_listener_api(node);
		}
		self.build_children(node, &element.children);
	}

	/// Resolves a selector path across frame boundaries.
	///
	/// Every selector but the last must match an iframe; the next one is
	/// resolved inside that iframe's content document. Cross-origin content is
	/// still resolved, since this is the harness's view of the tree and not
	/// the page's.
	pub fn resolve_path<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeId> {
		let mut scope = self.document();
		let mut found = None;

		for (i, selector) in path.iter().enumerate() {
			let node = self.query_selector_in(scope, selector.as_ref())?;
			found = Some(node);
			if i + 1 < path.len() {
				scope = self.frame_document(node)?;
			}
		}

		found
	}

	/// Content document of an iframe, regardless of origin.
	pub fn frame_document(&self, frame: NodeId) -> Option<NodeId> {
		match self.tree.borrow().node(frame).map(|n| &n.data) {
			Some(NodeData::Element { content, .. }) => *content,
			_ => None,
		}
	}
}
