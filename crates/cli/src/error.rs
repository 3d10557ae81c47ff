use std::path::PathBuf;

use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error("cannot read scenario {}", path.display())]
	ReadScenario {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("invalid scenario {}: {source}", path.display())]
	ParseScenario {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("step {step}: no element matches {selector}")]
	UnresolvedTarget { step: usize, selector: String },

	#[error("step {step}: {selector} is not an iframe")]
	NotAFrame { step: usize, selector: String },

	#[error("step {step}: unknown event type {kind:?}")]
	UnknownEvent { step: usize, kind: String },

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl CliError {
	pub fn code(&self) -> ErrorCode {
		match self {
			CliError::ReadScenario { .. } | CliError::Io(_) => ErrorCode::IoError,
			CliError::ParseScenario { .. } | CliError::UnknownEvent { .. } | CliError::Json(_) => {
				ErrorCode::InvalidScenario
			}
			CliError::UnresolvedTarget { .. } | CliError::NotAFrame { .. } => ErrorCode::SelectorNotFound,
		}
	}

	/// Converts to the structured error printed in result envelopes.
	pub fn to_command_error(&self) -> CommandError {
		CommandError {
			code: self.code(),
			message: self.to_string(),
		}
	}
}
