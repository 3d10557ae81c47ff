use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "inspect")]
#[command(about = "Replay pointer scenarios through the inspect highlighter engine")]
#[command(version)]
#[command(styles = styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: text (default), json, or ndjson
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Replay a scenario file and print the session's decisions
	Replay {
		/// Scenario JSON file
		#[arg(value_name = "SCENARIO")]
		scenario: PathBuf,

		/// Run on the wall clock instead of a virtual one
		#[arg(long)]
		realtime: bool,

		/// Debounce window in milliseconds (overrides the scenario's)
		#[arg(long, value_name = "MS")]
		window_ms: Option<u64>,
	},

	/// List the bridge channels a session listens and posts on
	Channels,
}

impl Commands {
	/// Name used in result envelopes.
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Replay { .. } => "replay",
			Commands::Channels => "channels",
		}
	}
}

/// Help colors in cargo's palette.
fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Green.on_default().bold())
		.usage(AnsiColor::Green.on_default().bold())
		.literal(AnsiColor::Cyan.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn cli_definition_is_valid() {
		Cli::command().debug_assert();
	}

	#[test]
	fn parses_replay_flags() {
		let cli = Cli::try_parse_from(["inspect", "-vv", "-f", "ndjson", "replay", "s.json", "--window-ms", "50"]).unwrap();

		assert_eq!(cli.verbose, 2);
		assert_eq!(cli.format, OutputFormat::Ndjson);
		match cli.command {
			Commands::Replay {
				scenario,
				realtime,
				window_ms,
			} => {
				assert_eq!(scenario, PathBuf::from("s.json"));
				assert!(!realtime);
				assert_eq!(window_ms, Some(50));
			}
			other => panic!("unexpected command: {other:?}"),
		}
	}

	#[test]
	fn format_defaults_to_text() {
		let cli = Cli::try_parse_from(["inspect", "channels"]).unwrap();
		assert_eq!(cli.format, OutputFormat::Text);
	}
}
