//! One interactive shell attached to one kernel.
//!
//! A [`ShellSession`] is created when a shell opens and owns everything the
//! shell needs: the highlighted buffer, the channel set, the request
//! correlator and the reply cache. The front end drives it from a timer:
//! each [`ShellSession::tick`] drains the kernel, updates the buffer, sends
//! the next queued introspection request and gives the GUI event pump a turn.
//! Notable transitions are queued as [`ShellEvent`]s for the front end.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use kiln_kernel::correlator::{DEFAULT_TIMEOUT, ERROR_SENTINEL};
use kiln_kernel::{
	ChannelSet, CodeBlock, CodeOrigin, ControlCommand, Correlator, DebugState, Drained, InterpreterState, KernelIo,
	KernelLauncher, KernelSpec, RequestHandle, RequestId, RequesterId, StartupInfo, StartupReply,
};
use kiln_primitives::{Key, TextBuffer};
use kiln_syntax::decorator::DEFAULT_EDIT_BUDGET;
use kiln_syntax::{HighlightedBuffer, IndentPolicy, LanguageSpec};
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value as JsonValue;
use tracing::{debug, info, trace};

use crate::buffer::{DEFAULT_MAX_LINES, KeyOutcome, ShellBuffer};
use crate::introspect::{self, AutoComplete, CallTip, DEFAULT_CACHE_TTL, IntrospectCache, Query};
use crate::magic::{self, MagicContext, MagicOutcome};
use crate::pump::{EventPump, NoPump};
use crate::{Result, ShellError};

/// Requester id of the shell's own view.
pub const SHELL_VIEW: RequesterId = RequesterId(0);

/// The shell's text: a highlighted buffer behind the prompt boundary.
pub type ShellText = ShellBuffer<HighlightedBuffer<TextBuffer>>;

/// Tunables for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
	/// Line cap of the buffer.
	pub max_lines: usize,
	/// Lines re-highlighted per tick.
	pub highlight_budget: usize,
	/// How long an introspection request may wait for its reply.
	pub request_timeout: Duration,
	/// How long introspection replies are reused.
	pub cache_ttl: Duration,
	/// Offer language keywords when completing a bare name.
	pub complete_keywords: bool,
	/// Indentation policy of the command line.
	pub indent: IndentPolicy,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			max_lines: DEFAULT_MAX_LINES,
			highlight_budget: DEFAULT_EDIT_BUDGET,
			request_timeout: DEFAULT_TIMEOUT,
			cache_ttl: DEFAULT_CACHE_TTL,
			complete_keywords: false,
			indent: IndentPolicy::default(),
		}
	}
}

/// Where a session is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
	/// Connected to a kernel.
	Running,
	/// The kernel is gone; the buffer is read-only.
	Terminated,
}

/// Something the front end may want to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
	/// The startup handshake completed.
	Started {
		/// Interpreter version.
		version: String,
	},
	/// The heartbeat reported a new interpreter state.
	StateChanged(InterpreterState),
	/// The debugger moved.
	DebugChanged(DebugState),
	/// `open` / `opendir` was typed.
	Open {
		/// What to open.
		target: String,
		/// Open a whole directory.
		directory: bool,
	},
	/// `db focus` was typed.
	Focus {
		/// File of the debugger frame.
		file: String,
		/// One-based line.
		line: u64,
	},
	/// The connection ended.
	Terminated {
		/// Why.
		reason: String,
	},
}

/// An interactive shell bound to a kernel connection.
pub struct ShellSession {
	buffer: ShellText,
	channels: Option<ChannelSet>,
	correlator: Correlator,
	cache: IntrospectCache,
	queries: FxHashMap<RequestId, (Query, String)>,
	active_views: FxHashSet<RequesterId>,
	state: InterpreterState,
	debug: Option<DebugState>,
	startup: Option<StartupReply>,
	last_prompt: String,
	lifecycle: Lifecycle,
	events: VecDeque<ShellEvent>,
	pump: Box<dyn EventPump>,
	config: SessionConfig,
}

impl ShellSession {
	/// Starts a session over an established kernel connection and sends the
	/// startup handshake. Must be called inside a tokio runtime.
	pub fn connect(io: KernelIo, startup: &StartupInfo, config: SessionConfig) -> Result<Self> {
		let region = HighlightedBuffer::new(TextBuffer::default(), Arc::new(LanguageSpec::python()), config.indent)
			.with_edit_budget(config.highlight_budget);
		let buffer = ShellBuffer::new(region).with_max_lines(config.max_lines);
		let channels = ChannelSet::connect(io);
		channels.send_startup(startup)?;
		debug!(gui = %startup.gui, "sent startup handshake");

		let mut active_views = FxHashSet::default();
		active_views.insert(SHELL_VIEW);
		Ok(Self {
			buffer,
			channels: Some(channels),
			correlator: Correlator::new(config.request_timeout),
			cache: IntrospectCache::new(config.cache_ttl),
			queries: FxHashMap::default(),
			active_views,
			state: InterpreterState::Unknown,
			debug: None,
			startup: None,
			last_prompt: String::new(),
			lifecycle: Lifecycle::Running,
			events: VecDeque::new(),
			pump: Box::new(NoPump),
			config,
		})
	}

	/// Launches a kernel and connects to it.
	pub async fn launch(
		launcher: &dyn KernelLauncher,
		spec: &KernelSpec,
		startup: &StartupInfo,
		config: SessionConfig,
	) -> Result<Self> {
		let io = launcher.launch(spec).await?;
		Self::connect(io, startup, config)
	}

	/// Installs the GUI event pump run once per tick.
	pub fn with_pump(mut self, pump: Box<dyn EventPump>) -> Self {
		self.pump = pump;
		self
	}

	/// One poll step. Returns true if anything changed.
	pub fn tick(&mut self, now: Instant) -> Result<bool> {
		let Some(channels) = self.channels.as_mut() else {
			return Ok(false);
		};
		let drained = channels.drain();
		let mut changed = !drained.is_empty();
		let Drained {
			output,
			prompt,
			state,
			debug,
			replies,
			startup,
			closed,
		} = drained;

		for (channel, text) in &output {
			trace!(%channel, len = text.len(), "kernel output");
			self.buffer.write(text)?;
		}
		if let Some(prompt) = prompt {
			self.buffer.set_prompt(&prompt)?;
			self.last_prompt = prompt;
		}
		if let Some(state) = state
			&& state != self.state
		{
			debug!(from = %self.state, to = %state, "interpreter state changed");
			self.state = state.clone();
			self.events.push_back(ShellEvent::StateChanged(state));
		}
		if let Some(debug) = debug
			&& self.debug.as_ref() != Some(&debug)
		{
			self.debug = Some(debug.clone());
			self.events.push_back(ShellEvent::DebugChanged(debug));
		}
		if let Some(reply) = startup {
			let version = reply.version_string();
			info!(%version, gui = %reply.info.gui, "kernel started");
			self.events.push_back(ShellEvent::Started { version });
			self.startup = Some(reply);
		}
		for (id, value) in replies {
			self.on_reply(id, value, now);
		}

		if let Some(id) = self.correlator.expire(now) {
			self.queries.remove(&id);
			changed = true;
		}
		self.cache.purge(now);
		self.flush_requests(now)?;
		self.pump.process_events();
		changed |= self.buffer.region_mut().pump(self.config.highlight_budget) > 0;

		if let Some(reason) = closed {
			self.disconnect(&reason)?;
			changed = true;
		}
		Ok(changed)
	}

	/// Waits until the kernel has sent something. Never returns once the
	/// session has terminated.
	pub async fn readable(&mut self) {
		match self.channels.as_mut() {
			Some(channels) => channels.readable().await,
			None => std::future::pending().await,
		}
	}

	/// Feeds a key press to the buffer, executing the command on Enter.
	pub fn handle_key(&mut self, key: Key) -> Result<KeyOutcome> {
		let outcome = self.buffer.handle_key(key)?;
		if let KeyOutcome::Submit(command) = &outcome {
			self.execute_command(command)?;
		}
		Ok(outcome)
	}

	/// Executes a command accepted from the command line.
	pub fn execute_command(&mut self, command: &str) -> Result<()> {
		let cx = MagicContext {
			debug: self.debug.as_ref(),
		};
		match magic::rewrite(command, cx) {
			MagicOutcome::Execute(source) => {
				self.channels()?.send_stdin(format!("{source}\n"))?;
			}
			MagicOutcome::Control(control) => {
				self.channels()?.send_control(&control)?;
				self.echo_local(command)?;
			}
			MagicOutcome::Open { target, directory } => {
				self.echo_local(command)?;
				self.events.push_back(ShellEvent::Open { target, directory });
			}
			MagicOutcome::Focus { file, line } => {
				self.echo_local(command)?;
				self.events.push_back(ShellEvent::Focus { file, line });
			}
		}
		Ok(())
	}

	/// Runs a file, a selection or a cell in the kernel.
	pub fn execute_code(&mut self, text: &str, fname: &str, origin: CodeOrigin) -> Result<()> {
		let block = CodeBlock::prepare(text, fname, origin);
		self.channels()?.send_code(&block)?;
		self.buffer.write(&block.notice())?;
		debug!(fname = %block.fname, lineno = block.lineno, "sent code block");
		Ok(())
	}

	/// Interrupts running code.
	pub fn interrupt(&mut self) -> Result<()> {
		self.send_control(&ControlCommand::Interrupt)
	}

	/// Restarts the kernel, optionally running `script` afterwards.
	pub fn restart(&mut self, script: Option<String>) -> Result<()> {
		self.cache.clear();
		self.send_control(&ControlCommand::Restart(script))
	}

	/// Asks the kernel to exit. The session terminates once the
	/// connection closes.
	pub fn terminate(&mut self) -> Result<()> {
		self.send_control(&ControlCommand::Terminate)
	}

	/// Starts a completion for the text before the cursor.
	///
	/// Bare names are completed against the global scope plus the builtins
	/// reported at startup; dotted names against the object's attributes.
	pub fn complete(&mut self, before_cursor: &str, requester: RequesterId, now: Instant) -> Result<AutoComplete> {
		let (subject, needle) = introspect::completion_target(before_cursor);
		let extra = if subject.is_empty() { self.global_names() } else { Vec::new() };
		if let Some(value) = self.cache.get(Query::Attributes, subject, now) {
			trace!(subject, "completion answered from cache");
			return Ok(AutoComplete::ready(subject, needle, extra, value.clone()));
		}
		let handle = self.post(Query::Attributes, subject, requester, now)?;
		Ok(AutoComplete::waiting(subject, needle, extra, handle))
	}

	/// Starts a call tip for the call enclosing the cursor, if any.
	pub fn call_tip(&mut self, before_cursor: &str, requester: RequesterId, now: Instant) -> Result<Option<CallTip>> {
		let Some(callee) = introspect::call_tip_target(before_cursor) else {
			return Ok(None);
		};
		if let Some(value) = self.cache.get(Query::Signature, callee, now) {
			return Ok(Some(CallTip::ready(callee, value.clone())));
		}
		let handle = self.post(Query::Signature, callee, requester, now)?;
		Ok(Some(CallTip::waiting(callee, handle)))
	}

	/// Evaluates `expr` in the kernel. Results are never cached.
	pub fn eval(&mut self, expr: &str, requester: RequesterId, now: Instant) -> Result<RequestHandle> {
		self.post(Query::Eval, expr, requester, now)
	}

	/// Discards pending requests of a view, e.g. when its popup closes.
	pub fn cancel_requester(&mut self, requester: RequesterId) {
		self.correlator.cancel_requester(requester);
		self.forget_dropped();
	}

	/// Sets which views count as active. Replies for other views are
	/// discarded.
	pub fn set_active_views(&mut self, views: impl IntoIterator<Item = RequesterId>) {
		self.active_views = views.into_iter().collect();
	}

	/// Tears the connection down: the buffer freezes with a notice and
	/// pending requests resolve as closed. Idempotent.
	pub fn disconnect(&mut self, reason: &str) -> Result<()> {
		if self.lifecycle == Lifecycle::Terminated {
			return Ok(());
		}
		if let Some(mut channels) = self.channels.take() {
			channels.close();
		}
		self.correlator.fail_all();
		self.queries.clear();
		self.lifecycle = Lifecycle::Terminated;

		let banner = format!("{:=<80}", "===== Shell terminated. ");
		self.buffer.terminate(&format!("\n\n{reason}\n\n{banner}\n"))?;
		info!(%reason, "shell session terminated");

		if self.state != InterpreterState::Dead {
			self.state = InterpreterState::Dead;
			self.events.push_back(ShellEvent::StateChanged(InterpreterState::Dead));
		}
		self.events.push_back(ShellEvent::Terminated {
			reason: reason.to_owned(),
		});
		Ok(())
	}

	/// Cacheable introspection requests still awaiting a reply.
	pub fn tracked_queries(&self) -> usize {
		self.queries.len()
	}

	/// True when a terminated session should be closed: it has lost focus.
	pub fn should_close(&self, has_focus: bool) -> bool {
		self.lifecycle == Lifecycle::Terminated && !has_focus
	}

	/// Takes the queued events.
	pub fn take_events(&mut self) -> Vec<ShellEvent> {
		self.events.drain(..).collect()
	}

	/// The shell text.
	pub fn buffer(&self) -> &ShellText {
		&self.buffer
	}

	/// The shell text, for cursor movement and clipboard operations.
	pub fn buffer_mut(&mut self) -> &mut ShellText {
		&mut self.buffer
	}

	/// Last reported interpreter state.
	pub fn state(&self) -> &InterpreterState {
		&self.state
	}

	/// Last reported debugger position.
	pub fn debug_state(&self) -> Option<&DebugState> {
		self.debug.as_ref()
	}

	/// The kernel's startup reply, once received.
	pub fn startup(&self) -> Option<&StartupReply> {
		self.startup.as_ref()
	}

	/// Running or terminated.
	pub fn lifecycle(&self) -> Lifecycle {
		self.lifecycle
	}

	/// Introspection requests not yet resolved.
	pub fn pending_requests(&self) -> usize {
		self.correlator.pending()
	}

	/// Kernel process id, when the kernel is a child process.
	pub fn kernel_pid(&mut self) -> Option<u32> {
		self.channels.as_mut()?.child_mut()?.id()
	}

	fn channels(&self) -> Result<&ChannelSet> {
		self.channels.as_ref().ok_or(ShellError::Terminated)
	}

	fn send_control(&mut self, command: &ControlCommand) -> Result<()> {
		debug!(%command, "control");
		self.channels()?.send_control(command)?;
		Ok(())
	}

	/// Shows a command the kernel will not echo, followed by a fresh prompt.
	fn echo_local(&mut self, command: &str) -> Result<()> {
		self.buffer.write(&format!("{command}\n"))?;
		self.buffer.set_prompt(&self.last_prompt)?;
		Ok(())
	}

	fn global_names(&self) -> Vec<String> {
		let Some(startup) = &self.startup else {
			return Vec::new();
		};
		let mut names = startup.builtins.clone();
		if self.config.complete_keywords {
			names.extend(startup.keywords.iter().cloned());
		}
		names
	}

	fn post(&mut self, query: Query, subject: &str, requester: RequesterId, now: Instant) -> Result<RequestHandle> {
		self.channels()?;
		let handle = self.correlator.post(query.request(subject), requester);
		if query != Query::Eval {
			self.queries.insert(handle.id(), (query, subject.to_owned()));
		}
		self.flush_requests(now)?;
		Ok(handle)
	}

	fn flush_requests(&mut self, now: Instant) -> Result<()> {
		let Some(channels) = &self.channels else {
			return Ok(());
		};
		let next = self.correlator.poll_outbound(now);
		if let Some((id, text)) = next {
			trace!(?id, request = %text, "sending introspection request");
			channels.send_introspect(id, text)?;
		}
		self.forget_dropped();
		Ok(())
	}

	fn forget_dropped(&mut self) {
		for id in self.correlator.take_dropped() {
			self.queries.remove(&id);
		}
	}

	fn on_reply(&mut self, id: RequestId, value: JsonValue, now: Instant) {
		if self.correlator.in_flight() != Some(id) {
			debug!(?id, "late introspection reply");
			return;
		}
		if let Some((query, subject)) = self.queries.remove(&id)
			&& value.as_str() != Some(ERROR_SENTINEL)
		{
			self.cache.insert(query, subject, value.clone(), now);
		}
		let active = &self.active_views;
		self.correlator.resolve(id, value, |requester| active.contains(&requester));
	}
}

impl std::fmt::Debug for ShellSession {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ShellSession")
			.field("lifecycle", &self.lifecycle)
			.field("state", &self.state)
			.field("channels", &self.channels)
			.field("correlator", &self.correlator)
			.field("toolkit", &self.pump.toolkit())
			.finish_non_exhaustive()
	}
}
