//! CLI schema for the kiln binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "kiln")]
#[command(about = "Python highlighting and an interactive kernel shell")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Configuration file (defaults to $XDG_CONFIG_HOME/kiln/config.toml)
	#[arg(long, short = 'c', value_name = "PATH", global = true)]
	pub config: Option<PathBuf>,

	/// Verbose logging (overridden by KILN_LOG)
	#[arg(long, short = 'v', global = true)]
	pub verbose: bool,

	/// Subcommand to execute.
	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
	/// Print a file with syntax highlighting and whitespace diagnostics
	Highlight {
		/// File to highlight.
		file: PathBuf,
		/// Language name (python, cython); guessed from the extension if omitted
		#[arg(long, short = 'l')]
		language: Option<String>,
		/// Never emit color codes
		#[arg(long)]
		plain: bool,
		/// List whitespace diagnostics after the text
		#[arg(long)]
		diagnostics: bool,
	},
	/// Dump the tokens of every line as JSON lines
	Tokens {
		/// File to tokenize.
		file: PathBuf,
		/// Language name (python, cython); guessed from the extension if omitted
		#[arg(long, short = 'l')]
		language: Option<String>,
	},
	/// Start a line-mode shell attached to a kernel process
	Shell {
		/// Script to run as __main__ once the kernel is up
		script: Option<String>,
		/// Kernel command, overriding the configuration
		#[arg(long, value_name = "PROGRAM")]
		kernel: Option<String>,
	},
}
