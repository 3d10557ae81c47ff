use clap::Parser;
use inspect_cli::cli::Cli;
use inspect_cli::commands;
use inspect_cli::error::CliError;
use inspect_cli::logging;
use inspect_cli::output::{self, OutputFormat, ResultBuilder};

#[tokio::main(flavor = "current_thread")]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let format = cli.format;
	let command = cli.command.name();

	if let Err(err) = commands::dispatch(cli, format).await {
		handle_error(command, err, format);
		std::process::exit(1);
	}
}

fn handle_error(command: &str, err: CliError, format: OutputFormat) {
	let cmd_error = err.to_command_error();

	// Humans read stderr.
	output::print_error_stderr(&cmd_error);

	// Agents read the envelope.
	if format != OutputFormat::Text {
		let result: output::CommandResult<serde_json::Value> = ResultBuilder::new(command)
			.error(cmd_error.code, &cmd_error.message)
			.build();
		output::print_result(&result, format);
	}
}
