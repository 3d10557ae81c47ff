//! Error and diagnostic types.
//!
//! The engine has no fatal error class: every failure below is caught where it
//! happens and degrades to "do nothing visible". [`Diagnostic`] values are the
//! only way a host can observe them.

use thiserror::Error;

/// Result of touching a frame's content or its listener API.
pub type FrameResult<T> = std::result::Result<T, FrameError>;

/// A frame (or the root view) could not be reached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
	/// Access blocked by the same-origin policy.
	#[error("frame is cross-origin ({origin})")]
	CrossOrigin { origin: String },

	/// The iframe has no content document (not loaded yet, or removed).
	#[error("frame has no content window")]
	NoContent,

	/// The platform threw while registering or removing a listener.
	#[error("listener API rejected the call: {0}")]
	Rejected(String),
}

/// Where a frame failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStage {
	/// Extending listeners into a newly hovered frame.
	Attach,
	/// Releasing a tracked frame on stop.
	Detach,
}

/// A swallowed failure, reported to the optional diagnostic hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
	/// A child frame could not be attached to or detached from.
	FrameUnreachable { stage: FrameStage, error: FrameError },
	/// The root view rejected a listener operation.
	RootUnreachable(FrameError),
	/// A bridge payload could not be decoded and was replaced by its fallback.
	MalformedPayload { channel: String, reason: String },
}

impl std::fmt::Display for Diagnostic {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Diagnostic::FrameUnreachable { stage, error } => {
				let stage = match stage {
					FrameStage::Attach => "attach",
					FrameStage::Detach => "detach",
				};
				write!(f, "frame {stage} failed: {error}")
			}
			Diagnostic::RootUnreachable(error) => write!(f, "root view unreachable: {error}"),
			Diagnostic::MalformedPayload { channel, reason } => {
				write!(f, "malformed {channel} payload: {reason}")
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn diagnostic_display_names_stage() {
		let diag = Diagnostic::FrameUnreachable {
			stage: FrameStage::Detach,
			error: FrameError::CrossOrigin {
				origin: "https://ads.example".into(),
			},
		};
		assert_eq!(
			diag.to_string(),
			"frame detach failed: frame is cross-origin (https://ads.example)"
		);
	}
}
