use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{ProtocolError, Result, channel};

/// One entry of a highlight request.
///
/// Strings are document-scoped selectors resolved by the session; anything
/// else is taken as an element handle the sender already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeRef<H> {
	/// Selector resolved with the document's `querySelector`.
	Selector(String),
	/// Already-resolved element handle.
	Element(H),
}

impl<H> NodeRef<H> {
	/// Shorthand for [`NodeRef::Selector`].
	pub fn selector(selector: impl Into<String>) -> Self {
		Self::Selector(selector.into())
	}
}

/// Payload of `HIGHLIGHT_ELEMENTS`.
///
/// Both fields default, so `{}` decodes to an empty request (which hides the
/// overlay).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "H: DeserializeOwned"))]
pub struct HighlightRequest<H> {
	/// Nodes to outline. Entries that are `null` or do not decode as a
	/// [`NodeRef`] are dropped.
	#[serde(default = "Vec::new", deserialize_with = "lenient_nodes")]
	pub nodes: Vec<NodeRef<H>>,
	/// Whether the overlay should hide itself after its own timeout.
	#[serde(default)]
	pub hide_after_timeout: bool,
}

fn lenient_nodes<'de, D, H>(deserializer: D) -> std::result::Result<Vec<NodeRef<H>>, D::Error>
where
	D: Deserializer<'de>,
	H: DeserializeOwned,
{
	let entries = Vec::<Value>::deserialize(deserializer)?;
	Ok(entries
		.into_iter()
		.filter(|entry| !entry.is_null())
		.filter_map(|entry| serde_json::from_value(entry).ok())
		.collect())
}

impl<H> Default for HighlightRequest<H> {
	fn default() -> Self {
		Self {
			nodes: Vec::new(),
			hide_after_timeout: false,
		}
	}
}

impl<H> HighlightRequest<H> {
	/// Creates a request for the given nodes with `hide_after_timeout` off.
	pub fn new(nodes: impl IntoIterator<Item = NodeRef<H>>) -> Self {
		Self {
			nodes: nodes.into_iter().collect(),
			hide_after_timeout: false,
		}
	}

	/// Sets the overlay timeout flag.
	pub fn hide_after_timeout(mut self, hide: bool) -> Self {
		self.hide_after_timeout = hide;
		self
	}
}

/// Options for entering inspect mode by direct call.
///
/// The bridge's `START_INSPECTING` ignores its payload, so commands coming
/// through the bridge always use [`StartOptions::default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartOptions {
	/// A click commits the selection and leaves inspect mode.
	pub stop_on_click: bool,
	/// Captured events are default-prevented and stopped before the page sees them.
	pub block_events: bool,
}

impl Default for StartOptions {
	fn default() -> Self {
		Self {
			stop_on_click: true,
			block_events: true,
		}
	}
}

/// Inbound command for an inspector session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<H> {
	/// Hide the overlay.
	ClearHighlights,
	/// Outline the given nodes (ignored while inspecting).
	HighlightElements(HighlightRequest<H>),
	/// Leave inspect mode and clear the overlay.
	Shutdown,
	/// Enter inspect mode.
	StartInspecting,
	/// Leave inspect mode.
	StopInspecting,
}

impl<H> Command<H> {
	/// Channel this command travels on.
	pub fn channel(&self) -> &'static str {
		match self {
			Command::ClearHighlights => channel::CLEAR_HIGHLIGHTS,
			Command::HighlightElements(_) => channel::HIGHLIGHT_ELEMENTS,
			Command::Shutdown => channel::SHUTDOWN,
			Command::StartInspecting => channel::START_INSPECTING,
			Command::StopInspecting => channel::STOP_INSPECTING,
		}
	}

	/// Builds the command for a payload-less channel.
	///
	/// Returns `None` for `HIGHLIGHT_ELEMENTS` (which needs a payload) and for
	/// unknown channels.
	pub fn bare(channel: &str) -> Option<Self> {
		match channel {
			channel::CLEAR_HIGHLIGHTS => Some(Command::ClearHighlights),
			channel::SHUTDOWN => Some(Command::Shutdown),
			channel::START_INSPECTING => Some(Command::StartInspecting),
			channel::STOP_INSPECTING => Some(Command::StopInspecting),
			_ => None,
		}
	}
}

impl<H: DeserializeOwned> Command<H> {
	/// Decodes a JSON payload received on `channel`.
	///
	/// Payloads of the four bare channels are ignored. A missing (`null`)
	/// highlight payload decodes to an empty request.
	///
	/// # Errors
	///
	/// [`ProtocolError::UnknownChannel`] for channels outside
	/// [`channel::INBOUND`], [`ProtocolError::Payload`] when a highlight payload
	/// does not have the expected shape.
	pub fn decode(channel: &str, payload: Value) -> Result<Self> {
		if channel == channel::HIGHLIGHT_ELEMENTS {
			if payload.is_null() {
				return Ok(Command::HighlightElements(HighlightRequest::default()));
			}
			let request = serde_json::from_value(payload).map_err(|source| ProtocolError::Payload {
				channel: channel::HIGHLIGHT_ELEMENTS,
				source,
			})?;
			return Ok(Command::HighlightElements(request));
		}

		Self::bare(channel).ok_or_else(|| ProtocolError::UnknownChannel(channel.to_string()))
	}
}

/// Bridge framing: `{ "type": <channel>, "data": <payload> }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
	/// Channel name.
	#[serde(rename = "type")]
	pub channel: String,
	/// Channel payload, `null` when absent.
	#[serde(default)]
	pub data: Value,
}

impl Envelope {
	/// Wraps a payload for `channel`.
	pub fn new(channel: impl Into<String>, data: Value) -> Self {
		Self {
			channel: channel.into(),
			data,
		}
	}

	/// Frames a command, serializing its payload.
	///
	/// # Errors
	///
	/// Fails only if an element handle cannot be serialized.
	pub fn from_command<H: Serialize>(command: &Command<H>) -> serde_json::Result<Self> {
		let data = match command {
			Command::HighlightElements(request) => serde_json::to_value(request)?,
			_ => Value::Null,
		};
		Ok(Self::new(command.channel(), data))
	}
}
