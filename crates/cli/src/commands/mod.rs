mod channels;
mod replay;

pub use channels::ChannelsData;

use crate::cli::{Cli, Commands};
use crate::error::Result;
use crate::output::OutputFormat;

pub async fn dispatch(cli: Cli, format: OutputFormat) -> Result<()> {
	match cli.command {
		Commands::Replay {
			scenario,
			realtime,
			window_ms,
		} => replay::execute(&scenario, realtime, window_ms, format).await,
		Commands::Channels => {
			channels::execute(format);
			Ok(())
		}
	}
}
