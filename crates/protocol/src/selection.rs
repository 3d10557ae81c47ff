use serde::{Deserialize, Serialize};

use crate::channel;

/// How a selection was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionOrigin {
	/// Pointer moved over the element.
	Hover,
	/// Pointer pressed on the element.
	Click,
}

impl SelectionOrigin {
	/// Outbound channel a host posts this kind of selection on.
	pub fn channel(self) -> &'static str {
		match self {
			SelectionOrigin::Hover => channel::HOVER_NODE,
			SelectionOrigin::Click => channel::SELECT_NODE,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			SelectionOrigin::Hover => "hover",
			SelectionOrigin::Click => "click",
		}
	}
}

impl std::fmt::Display for SelectionOrigin {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Metadata delivered alongside a selected element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionMeta {
	pub origin: SelectionOrigin,
}

impl SelectionMeta {
	pub fn hover() -> Self {
		Self {
			origin: SelectionOrigin::Hover,
		}
	}

	pub fn click() -> Self {
		Self {
			origin: SelectionOrigin::Click,
		}
	}
}
