//! Line-mode interactive shell.
//!
//! Standard input supplies whole command lines; the terminal's own line
//! editing stands in for the shell buffer's key handling. Output is
//! mirrored from the buffer by diffing its output text against what has
//! already been printed.

use std::io::{self, Write};
use std::time::Instant;

use anyhow::Context;
use crossterm::cursor::{MoveLeft, MoveToColumn};
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use kiln_kernel::ProcessLauncher;
use kiln_primitives::{Key, KeyCode};
use kiln_shell::{Lifecycle, ShellEvent, ShellSession};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::Config;

/// Runs the shell until the kernel exits.
pub async fn run(config: &Config, script: Option<String>, kernel: Option<String>) -> anyhow::Result<()> {
	let mut spec = config.kernel_spec();
	if let Some(command) = kernel {
		spec.command = command;
	}
	let startup = config.startup_info(script, |var| std::env::var(var).ok());
	let mut session = ShellSession::launch(&ProcessLauncher, &spec, &startup, config.session())
		.await
		.with_context(|| format!("failed to start kernel {:?}", spec.command))?;
	info!(command = %spec.command, pid = ?session.kernel_pid(), "kernel launched");

	let mut stdin = BufReader::new(tokio::io::stdin()).lines();
	let mut stdin_open = true;
	let mut ticker = tokio::time::interval(config.poll_interval());
	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
	let mut screen = Screen::default();
	let mut interrupts = interrupts()?;

	loop {
		let wake = tokio::select! {
			_ = ticker.tick() => Wake::Tick,
			() = session.readable() => Wake::Tick,
			line = stdin.next_line(), if stdin_open => Wake::Line(line?),
			Some(()) = interrupts.recv() => Wake::Interrupt,
		};

		match wake {
			Wake::Tick => {}
			Wake::Line(Some(line)) => match submit(&mut session, &line) {
				Ok(true) => screen.submitted(&session.buffer().output_text(), &line),
				Ok(false) => {}
				Err(err) => warn!(%err, "input rejected"),
			},
			Wake::Line(None) => {
				debug!("stdin closed, terminating kernel");
				stdin_open = false;
				session.terminate()?;
			}
			Wake::Interrupt => {
				if let Err(err) = session.interrupt() {
					warn!(%err, "interrupt failed");
				}
			}
		}

		session.tick(Instant::now())?;
		let mut done = false;
		for event in session.take_events() {
			match event {
				ShellEvent::Started { version } => info!(%version, "interpreter ready"),
				ShellEvent::StateChanged(state) => debug!(%state, "interpreter state"),
				ShellEvent::DebugChanged(debug) => {
					if let Some((file, line)) = debug.current_location() {
						info!(file, line, "debugger stopped");
					}
				}
				ShellEvent::Open { target, directory } => info!(path = %target, directory, "open requested"),
				ShellEvent::Focus { file, line } => info!(%file, line, "focus requested"),
				ShellEvent::Terminated { reason } => {
					info!(%reason, "kernel terminated");
					done = true;
				}
			}
		}

		let buffer = session.buffer();
		let prompt = if done { String::new() } else { buffer.prompt() };
		screen.refresh(&mut io::stdout().lock(), &buffer.output_text(), &prompt)?;
		if done {
			return Ok(());
		}
	}
}

/// Types `line` into the shell and presses Enter. Returns `false` when
/// the kernel is already gone and the line was dropped.
fn submit(session: &mut ShellSession, line: &str) -> kiln_shell::Result<bool> {
	if session.lifecycle() == Lifecycle::Terminated {
		debug!(line, "kernel gone, input dropped");
		return Ok(false);
	}
	session.buffer_mut().paste(line)?;
	session.handle_key(Key::new(KeyCode::Enter))?;
	Ok(true)
}

/// Ctrl-C presses for the life of the shell. The handler is installed
/// once so a press between two loop iterations is not lost.
fn interrupts() -> io::Result<mpsc::UnboundedReceiver<()>> {
	let (tx, rx) = mpsc::unbounded_channel();
	#[cfg(unix)]
	{
		use tokio::signal::unix::{SignalKind, signal};
		let mut sig = signal(SignalKind::interrupt())?;
		tokio::spawn(async move {
			while sig.recv().await.is_some() {
				if tx.send(()).is_err() {
					break;
				}
			}
		});
	}
	#[cfg(not(unix))]
	tokio::spawn(async move {
		while tokio::signal::ctrl_c().await.is_ok() {
			if tx.send(()).is_err() {
				break;
			}
		}
	});
	Ok(rx)
}

enum Wake {
	Tick,
	Line(Option<String>),
	Interrupt,
}

/// What is already on the terminal.
#[derive(Debug, Default)]
struct Screen {
	/// Output text printed so far, as it read in the buffer.
	shown: String,
	/// Prompt printed after the output, if any.
	prompt: Option<String>,
}

impl Screen {
	/// The user typed `line` and the terminal echoed it after the prompt,
	/// which the buffer has just moved into the output.
	fn submitted(&mut self, output: &str, line: &str) {
		self.shown = format!("{output}{line}\n");
		self.prompt = None;
	}

	fn refresh(&mut self, out: &mut impl Write, output: &str, prompt: &str) -> io::Result<()> {
		let delta = unseen(&self.shown, output);
		let prompt_changed = self.prompt.as_deref() != Some(prompt);
		if delta.is_empty() && !prompt_changed {
			return Ok(());
		}

		if let Some(old) = self.prompt.take() {
			let column = self.shown.rsplit('\n').next().map_or(0, |tail| tail.chars().count());
			queue!(out, MoveToColumn(column as u16), Clear(ClearType::UntilNewLine))?;
			debug!(prompt = %old, "cleared prompt");
		}
		if delta.erase > 0 {
			queue!(out, MoveLeft(delta.erase as u16), Clear(ClearType::UntilNewLine))?;
		}
		queue!(out, Print(delta.text))?;
		self.shown = output.to_owned();

		if !prompt.is_empty() {
			queue!(out, Print(prompt))?;
			self.prompt = Some(prompt.to_owned());
		}
		out.flush()
	}
}

/// Change from the printed output `shown` to the buffer's current output.
#[derive(Debug, PartialEq, Eq)]
struct Delta<'a> {
	/// Characters at the end of the last printed line to erase first.
	erase: usize,
	/// Text to print afterwards.
	text: &'a str,
}

impl Delta<'_> {
	fn is_empty(&self) -> bool {
		self.erase == 0 && self.text.is_empty()
	}
}

/// Works out what to print so the terminal matches `output`.
///
/// The buffer drops whole lines from its front when it grows past its
/// line cap, so a tail of `shown` starting at a line boundary may be all
/// that is left of it. Backspaces in kernel output rewrite the end of the
/// last line.
fn unseen<'a>(shown: &str, output: &'a str) -> Delta<'a> {
	if let Some(text) = output.strip_prefix(shown) {
		return Delta { erase: 0, text };
	}
	for (idx, _) in shown.match_indices('\n') {
		let tail = &shown[idx + 1..];
		if tail.is_empty() {
			break;
		}
		if let Some(text) = output.strip_prefix(tail) {
			return Delta { erase: 0, text };
		}
	}

	let common = shown
		.char_indices()
		.zip(output.chars())
		.find(|((_, a), b)| a != b)
		.map_or(shown.len().min(output.len()), |((idx, _), _)| idx);
	let rewritten = &shown[common..];
	if rewritten.contains('\n') {
		return Delta {
			erase: 0,
			text: &output[common..],
		};
	}
	Delta {
		erase: rewritten.chars().count(),
		text: &output[common..],
	}
}
