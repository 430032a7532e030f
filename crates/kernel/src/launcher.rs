use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::process::{Child, Command};
use tracing::info;

use crate::{Error, Result};

/// How to start a kernel process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KernelSpec {
	/// Program to run.
	pub command: String,
	/// Arguments.
	pub args: Vec<String>,
	/// Working directory.
	pub cwd: Option<PathBuf>,
	/// Extra environment variables.
	pub env: Vec<(String, String)>,
}

/// Interpreter side of the protocol, run as `python -u -c KERNEL_SCRIPT`.
pub const KERNEL_SCRIPT: &str = include_str!("kernel.py");

impl KernelSpec {
	/// Runs the bundled kernel script under `interpreter`.
	pub fn bundled(interpreter: impl Into<String>) -> Self {
		Self {
			command: interpreter.into(),
			args: vec!["-u".into(), "-c".into(), KERNEL_SCRIPT.into()],
			..Self::default()
		}
	}
}

/// The two pipe ends of a started kernel.
pub struct KernelIo {
	/// Frames from the kernel.
	pub reader: Box<dyn AsyncBufRead + Send + Unpin>,
	/// Frames to the kernel.
	pub writer: Box<dyn AsyncWrite + Send + Unpin>,
	/// The process, when the kernel is a child of this one.
	pub child: Option<Child>,
}

impl KernelIo {
	/// Wraps an arbitrary byte stream pair, e.g. an in-memory pipe.
	pub fn new(
		reader: impl tokio::io::AsyncRead + Send + Unpin + 'static,
		writer: impl AsyncWrite + Send + Unpin + 'static,
	) -> Self {
		Self {
			reader: Box::new(BufReader::new(reader)),
			writer: Box::new(writer),
			child: None,
		}
	}
}

impl std::fmt::Debug for KernelIo {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("KernelIo")
			.field("pid", &self.child.as_ref().and_then(Child::id))
			.finish_non_exhaustive()
	}
}

/// Starts kernels. Tests substitute an in-memory implementation.
#[async_trait]
pub trait KernelLauncher: Send + Sync {
	/// Starts a kernel described by `spec`.
	async fn launch(&self, spec: &KernelSpec) -> Result<KernelIo>;
}

/// Launches the kernel as a child process talking over stdin/stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

#[async_trait]
impl KernelLauncher for ProcessLauncher {
	async fn launch(&self, spec: &KernelSpec) -> Result<KernelIo> {
		let mut cmd = Command::new(&spec.command);
		cmd.args(&spec.args)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::inherit())
			.kill_on_drop(true);
		// Terminal Ctrl-C must not reach the kernel; interrupts go over the
		// control channel.
		#[cfg(unix)]
		cmd.process_group(0);
		if let Some(cwd) = &spec.cwd {
			cmd.current_dir(cwd);
		}
		for (key, value) in &spec.env {
			cmd.env(key, value);
		}

		let spawn_err = |reason: String| Error::Spawn {
			command: spec.command.clone(),
			reason,
		};
		let mut child = cmd.spawn().map_err(|e| spawn_err(e.to_string()))?;
		let stdin = child
			.stdin
			.take()
			.ok_or_else(|| spawn_err("failed to capture stdin".into()))?;
		let stdout = child
			.stdout
			.take()
			.ok_or_else(|| spawn_err("failed to capture stdout".into()))?;

		info!(command = %spec.command, pid = ?child.id(), "started kernel process");
		Ok(KernelIo {
			reader: Box::new(BufReader::new(stdout)),
			writer: Box::new(stdin),
			child: Some(child),
		})
	}
}
