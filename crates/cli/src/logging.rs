use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Filter directive for a `-v` count.
///
/// 0 keeps stderr clean for piped output, 1 shows replay progress, 2+ shows
/// engine transitions and swallowed frame failures.
pub fn default_filter(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "error",
		1 => "info,inspect=info",
		_ => "debug",
	}
}

/// Installs the stderr subscriber. `RUST_LOG` wins over the verbosity count.
///
/// A second call is a no-op.
pub fn init_logging(verbosity: u8) {
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

	let _ = tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr.with_max_level(tracing::Level::TRACE))
		.with_target(verbosity > 1)
		.compact()
		.try_init();
}
