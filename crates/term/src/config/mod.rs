//! User configuration.
//!
//! Read from `$XDG_CONFIG_HOME/kiln/config.toml` unless a path is given on
//! the command line. A missing default file means defaults; a missing
//! explicit file is an error.
//!
//! ```toml
//! [indent]
//! use-spaces = true
//! width = 4
//!
//! [shell]
//! poll-interval-ms = 20
//! max-blocks = 10000
//! highlight-budget = 256
//!
//! [kernel]
//! command = "python3"
//! bundled = true
//! gui = "none"
//! startup-script = "$PYTHONSTARTUP"
//!
//! [styles.keyword]
//! fg = "#00007f"
//! bold = true
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use kiln_kernel::startup::PYTHONSTARTUP_PLACEHOLDER;
use kiln_kernel::{GuiToolkit, KernelSpec, StartupInfo};
use kiln_shell::SessionConfig;
use kiln_shell::buffer::DEFAULT_MAX_LINES;
use kiln_shell::introspect::DEFAULT_CACHE_TTL;
use kiln_syntax::decorator::DEFAULT_EDIT_BUDGET;
use kiln_syntax::{IndentPolicy, StyleOverride, StyleTable};
use serde::Deserialize;
use tracing::debug;

/// Everything the config file can set.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	/// Indentation policy for highlighting and the shell.
	pub indent: IndentPolicy,
	/// Shell behavior.
	pub shell: ShellConfig,
	/// How to start the kernel.
	pub kernel: KernelConfig,
	/// Style overrides keyed by style name.
	pub styles: BTreeMap<String, StyleOverride>,
}

/// `[shell]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct ShellConfig {
	/// Timer tick driving the session.
	pub poll_interval_ms: u64,
	/// Output line cap.
	pub max_blocks: usize,
	/// Lines re-highlighted per tick.
	pub highlight_budget: usize,
	/// Introspection request timeout.
	pub request_timeout_ms: u64,
	/// Offer keywords when completing bare names.
	pub complete_keywords: bool,
}

impl Default for ShellConfig {
	fn default() -> Self {
		Self {
			poll_interval_ms: 20,
			max_blocks: DEFAULT_MAX_LINES,
			highlight_budget: DEFAULT_EDIT_BUDGET,
			request_timeout_ms: 3000,
			complete_keywords: false,
		}
	}
}

/// `[kernel]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct KernelConfig {
	/// Program to run.
	pub command: String,
	/// Run the bundled kernel script under `command`. `args` then follow
	/// the script as its own arguments.
	pub bundled: bool,
	/// Arguments.
	pub args: Vec<String>,
	/// Working directory of the process.
	pub cwd: Option<PathBuf>,
	/// Extra environment variables.
	pub env: BTreeMap<String, String>,
	/// GUI event loop to integrate.
	pub gui: GuiToolkit,
	/// Script run before the first prompt.
	pub startup_script: Option<String>,
	/// Directory prepended to the module search path.
	pub project_path: Option<String>,
	/// Initial working directory of the interpreter.
	pub start_dir: Option<String>,
}

impl Default for KernelConfig {
	fn default() -> Self {
		Self {
			command: "python3".into(),
			bundled: true,
			args: Vec::new(),
			cwd: None,
			env: BTreeMap::new(),
			gui: GuiToolkit::None,
			startup_script: Some(PYTHONSTARTUP_PLACEHOLDER.into()),
			project_path: None,
			start_dir: None,
		}
	}
}

impl Config {
	/// Default location of the config file.
	pub fn default_path() -> Option<PathBuf> {
		dirs::config_dir().map(|dir| dir.join("kiln").join("config.toml"))
	}

	/// Loads `path`, or the default file if `path` is `None`.
	pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
		let (path, required) = match path {
			Some(path) => (path.to_path_buf(), true),
			None => match Self::default_path() {
				Some(path) => (path, false),
				None => return Ok(Self::default()),
			},
		};
		if !required && !path.exists() {
			debug!(path = %path.display(), "no config file, using defaults");
			return Ok(Self::default());
		}
		let text =
			std::fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
		Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
	}

	/// Parses config text and validates the style section.
	pub fn parse(text: &str) -> anyhow::Result<Self> {
		let config: Self = toml::from_str(text)?;
		config.style_table()?;
		Ok(config)
	}

	/// Default styles with the overrides applied.
	pub fn style_table(&self) -> Result<StyleTable, kiln_syntax::StyleError> {
		let mut table = StyleTable::defaults();
		table.apply_overrides(&self.styles)?;
		Ok(table)
	}

	/// Session tunables.
	pub fn session(&self) -> SessionConfig {
		SessionConfig {
			max_lines: self.shell.max_blocks,
			highlight_budget: self.shell.highlight_budget,
			request_timeout: Duration::from_millis(self.shell.request_timeout_ms),
			cache_ttl: DEFAULT_CACHE_TTL,
			complete_keywords: self.shell.complete_keywords,
			indent: self.indent,
		}
	}

	/// Timer tick of the shell loop.
	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.shell.poll_interval_ms.max(1))
	}

	/// Process description of the kernel.
	pub fn kernel_spec(&self) -> KernelSpec {
		let kernel = &self.kernel;
		let mut spec = if kernel.bundled {
			KernelSpec::bundled(kernel.command.as_str())
		} else {
			KernelSpec {
				command: kernel.command.clone(),
				..KernelSpec::default()
			}
		};
		spec.args.extend(kernel.args.iter().cloned());
		spec.cwd = kernel.cwd.clone();
		spec.env = kernel.env.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
		spec
	}

	/// Startup handshake, with the startup-script placeholder resolved
	/// through `env`.
	pub fn startup_info(&self, script: Option<String>, env: impl Fn(&str) -> Option<String>) -> StartupInfo {
		let mut info = StartupInfo {
			gui: self.kernel.gui,
			script_file: script,
			startup_script: self.kernel.startup_script.clone(),
			project_path: self.kernel.project_path.clone(),
			start_dir: self.kernel.start_dir.clone(),
		};
		info.resolve_placeholders(env);
		info
	}
}
