use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use tokio::task::LocalSet;
use tracing::info;

use crate::error::Result;
use crate::output::{self, OutputFormat, ResultBuilder};
use crate::replay::{ReplayOptions, replay};
use crate::scenario::Scenario;

pub async fn execute(path: &Path, realtime: bool, window_ms: Option<u64>, format: OutputFormat) -> Result<()> {
	let builder = ResultBuilder::new("replay");
	let scenario = Scenario::load(path)?;
	let options = ReplayOptions {
		realtime,
		window: window_ms.map(Duration::from_millis),
	};
	info!(path = %path.display(), steps = scenario.steps.len(), realtime, "loaded scenario");

	// Session timers are spawned locally.
	let report = LocalSet::new().run_until(replay(&scenario, &options)).await?;

	if format == OutputFormat::Ndjson {
		let mut stdout = io::stdout().lock();
		for entry in &report.trace {
			output::write_line(&mut stdout, entry)?;
		}
		stdout.flush()?;
	}

	output::print_result(&builder.data(report).build(), format);
	Ok(())
}
