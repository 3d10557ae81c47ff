//! Scenario files.
//!
//! A scenario is a document fixture plus the steps to run against it:
//!
//! ```json
//! {
//!   "document": { "origin": "https://app.test", "children": [ ... ] },
//!   "windowMs": 200,
//!   "steps": [
//!     { "step": "call", "call": "start" },
//!     { "step": "event", "kind": "pointerover", "target": "#pay" },
//!     { "step": "event", "kind": "pointerover", "frame": "#pay", "target": "button" },
//!     { "step": "wait", "ms": 250 },
//!     { "step": "command", "type": "STOP_INSPECTING" },
//!     { "step": "navigate", "frame": "#pay", "origin": "https://elsewhere.example" }
//!   ]
//! }
//! ```

use std::path::Path;

use inspect::StartOptions;
use inspect::memory::Fixture;
use inspect_protocol::Envelope;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
	pub document: Fixture,
	/// Debounce window, defaults to the engine's.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub window_ms: Option<u64>,
	#[serde(default)]
	pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum Step {
	/// A bridge message, delivered through the session's bus connection.
	Command(Envelope),
	/// A direct call on the session handle.
	Call {
		call: Call,
		/// Only used by `start`.
		#[serde(default, skip_serializing_if = "Option::is_none")]
		options: Option<StartOptions>,
	},
	/// A DOM event dispatched at an element.
	Event {
		/// DOM event type (`pointerover`, `click`, ...).
		kind: String,
		target: String,
		/// Iframes to descend through before resolving `target`.
		#[serde(default, skip_serializing_if = "SelectorPath::is_empty")]
		frame: SelectorPath,
	},
	/// Lets time pass.
	Wait { ms: u64 },
	/// Points an iframe at another origin.
	Navigate { frame: SelectorPath, origin: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Call {
	Start,
	Stop,
	Clear,
}

impl Call {
	pub fn as_str(self) -> &'static str {
		match self {
			Call::Start => "start",
			Call::Stop => "stop",
			Call::Clear => "clear",
		}
	}
}

/// One selector or a chain of them, each resolved inside the previous one's
/// frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectorPath {
	One(String),
	Many(Vec<String>),
}

impl Default for SelectorPath {
	fn default() -> Self {
		SelectorPath::Many(Vec::new())
	}
}

impl SelectorPath {
	pub fn segments(&self) -> Vec<&str> {
		match self {
			SelectorPath::One(selector) => vec![selector.as_str()],
			SelectorPath::Many(selectors) => selectors.iter().map(String::as_str).collect(),
		}
	}

	pub fn is_empty(&self) -> bool {
		match self {
			SelectorPath::One(_) => false,
			SelectorPath::Many(selectors) => selectors.is_empty(),
		}
	}
}

impl std::fmt::Display for SelectorPath {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.segments().join(" >>> "))
	}
}

impl Scenario {
	pub fn from_json(json: &str) -> serde_json::Result<Self> {
		serde_json::from_str(json)
	}

	/// Reads and parses a scenario file.
	pub fn load(path: &Path) -> Result<Self> {
		let json = std::fs::read_to_string(path).map_err(|source| CliError::ReadScenario {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_json(&json).map_err(|source| CliError::ParseScenario {
			path: path.to_path_buf(),
			source,
		})
	}
}
