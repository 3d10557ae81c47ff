//! Wire vocabulary for the inspect highlighter.
//!
//! A host drives an inspector session over a generic pub/sub bridge. This crate
//! names the channels that bridge carries and the payloads it moves:
//!
//! - [`Command`] - the five inbound commands a session accepts
//! - [`HighlightRequest`] / [`NodeRef`] - payload of `HIGHLIGHT_ELEMENTS`
//! - [`SelectionOrigin`] / [`SelectionMeta`] - metadata passed with every selection
//! - [`Envelope`] - `{ "type": ..., "data": ... }` framing used by the bridge
//!
//! The crate has no opinion on how element handles are represented; every
//! payload that can carry one is generic over the handle type.

mod command;
mod selection;

pub use command::{Command, Envelope, HighlightRequest, NodeRef, StartOptions};
pub use selection::{SelectionMeta, SelectionOrigin};

use thiserror::Error;

/// Bridge channel names.
pub mod channel {
	/// Hide the overlay.
	pub const CLEAR_HIGHLIGHTS: &str = "CLEAR_HIGHLIGHTS";
	/// Show the overlay for a list of nodes.
	pub const HIGHLIGHT_ELEMENTS: &str = "HIGHLIGHT_ELEMENTS";
	/// Tear the inspector down (same effect as `STOP_INSPECTING`).
	pub const SHUTDOWN: &str = "SHUTDOWN";
	/// Enter inspect mode.
	pub const START_INSPECTING: &str = "START_INSPECTING";
	/// Leave inspect mode.
	pub const STOP_INSPECTING: &str = "STOP_INSPECTING";

	/// Posted by the host when a click-origin selection settles.
	pub const SELECT_NODE: &str = "SELECT_NODE";
	/// Posted by the host when a hover-origin selection settles.
	pub const HOVER_NODE: &str = "HOVER_NODE";

	/// Every channel a session subscribes to.
	pub const INBOUND: [&str; 5] = [
		CLEAR_HIGHLIGHTS,
		HIGHLIGHT_ELEMENTS,
		SHUTDOWN,
		START_INSPECTING,
		STOP_INSPECTING,
	];
}

/// Result type alias for protocol decoding.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while decoding bridge traffic.
#[derive(Debug, Error)]
pub enum ProtocolError {
	/// Message arrived on a channel the session does not handle.
	#[error("unknown channel: {0}")]
	UnknownChannel(String),

	/// Payload did not match the channel's shape.
	#[error("malformed {channel} payload: {source}")]
	Payload {
		channel: &'static str,
		#[source]
		source: serde_json::Error,
	},

	/// Payload could not be converted by a non-JSON transport.
	#[error("malformed {channel} payload: {reason}")]
	Invalid { channel: &'static str, reason: String },
}
