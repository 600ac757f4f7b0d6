use super::build::{execute, print_report};
use crate::config::BatchConfig;
use anyhow::{Context, Result};
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// YAML file with a `builds` list, see the README for the keys
	#[arg(required = true)]
	filename: PathBuf,
}

/// Builds run strictly one after another, so builds sharing an index never race on it.
#[tokio::main]
pub async fn run(arguments: &Subcommand) -> Result<()> {
	let batch = BatchConfig::from_path(&arguments.filename)?;
	let count = batch.builds.len();

	for (index, config) in batch.builds.into_iter().enumerate() {
		eprintln!("build {}/{count}: {:?}", index + 1, config.input);
		let input = config.input.clone();
		let report = execute(config)
			.await
			.with_context(|| format!("build {} of {count} ({input:?}) failed", index + 1))?;
		print_report(&report);
	}

	eprintln!("finished {count} builds");
	Ok(())
}
