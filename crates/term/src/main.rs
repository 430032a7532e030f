mod cli;
mod commands;
mod config;
mod logging;
mod render;
mod shell_loop;

use clap::Parser;
use cli::{Cli, Command};
use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	logging::init(cli.verbose);
	let config = Config::load(cli.config.as_deref())?;

	match cli.command {
		Command::Highlight {
			file,
			language,
			plain,
			diagnostics,
		} => commands::highlight(&config, &file, language.as_deref(), plain, diagnostics),
		Command::Tokens { file, language } => commands::tokens(&file, language.as_deref()),
		Command::Shell { script, kernel } => shell_loop::run(&config, script, kernel).await,
	}
}
