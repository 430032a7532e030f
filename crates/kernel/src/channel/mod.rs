use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::code::{CodeBlock, correct_line_offsets};
use crate::control::ControlCommand;
use crate::correlator::RequestId;
use crate::launcher::KernelIo;
use crate::startup::{StartupInfo, StartupReply};
use crate::status::{DebugState, InterpreterState};
use crate::wire::{Channel, Frame};
use crate::{Error, Result};

mod io;

/// Payload of an `introspect` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrospectRequest {
	/// Correlation id echoed in the reply.
	pub id: RequestId,
	/// Request text, e.g. `SIGNATURE os.path.join`.
	pub request: String,
}

/// Payload of an `introspect-reply` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrospectReply {
	/// Id of the request being answered.
	pub id: RequestId,
	/// Answer, or the `"<error>"` sentinel.
	#[serde(default)]
	pub result: JsonValue,
}

enum Inbound {
	Frame(u64, Frame),
	Closed(String),
}

/// Everything received since the previous drain.
#[derive(Debug, Default, PartialEq)]
pub struct Drained {
	/// Text per output channel, concatenated, oldest channel first.
	pub output: Vec<(Channel, String)>,
	/// Latest prompt.
	pub prompt: Option<String>,
	/// Latest heartbeat.
	pub state: Option<InterpreterState>,
	/// Latest debugger status.
	pub debug: Option<DebugState>,
	/// Introspection replies in arrival order.
	pub replies: Vec<(RequestId, JsonValue)>,
	/// The startup reply, if it arrived.
	pub startup: Option<StartupReply>,
	/// Reason the connection closed, reported once.
	pub closed: Option<String>,
}

impl Drained {
	/// True if nothing arrived.
	pub fn is_empty(&self) -> bool {
		*self == Drained::default()
	}

	/// All output text in display order.
	pub fn output_text(&self) -> String {
		self.output.iter().map(|(_, text)| text.as_str()).collect()
	}
}

/// The set of named channels over one kernel connection.
///
/// Frames are read and written by a background task; the owner drains
/// received frames with [`ChannelSet::drain`] from its own loop. Dropping the
/// set stops the task and, for a child process, kills the kernel.
pub struct ChannelSet {
	outbound: mpsc::UnboundedSender<Frame>,
	inbound: mpsc::UnboundedReceiver<Inbound>,
	stash: VecDeque<Inbound>,
	cancel: CancellationToken,
	child: Option<Child>,
	closed: Option<String>,
	close_reported: bool,
}

impl ChannelSet {
	/// Starts the IO task for `io`. Must be called inside a tokio runtime.
	pub fn connect(io: KernelIo) -> Self {
		let KernelIo { reader, writer, child } = io;
		let (outbound, outbound_rx) = mpsc::unbounded_channel();
		let (inbound_tx, inbound) = mpsc::unbounded_channel();
		let cancel = CancellationToken::new();
		tokio::spawn(io::run_kernel_io(
			reader,
			writer,
			outbound_rx,
			inbound_tx,
			cancel.clone(),
		));
		debug!(pid = ?child.as_ref().and_then(Child::id), "connected to kernel");
		Self {
			outbound,
			inbound,
			stash: VecDeque::new(),
			cancel,
			child,
			closed: None,
			close_reported: false,
		}
	}

	/// Queues a frame for writing.
	pub fn send(&self, frame: Frame) -> Result<()> {
		if self.closed.is_some() {
			return Err(Error::Closed);
		}
		self.outbound.send(frame).map_err(|_| Error::Closed)
	}

	/// Sends an interactive input line.
	pub fn send_stdin(&self, text: impl Into<String>) -> Result<()> {
		self.send(Frame::text(Channel::Stdin, text))
	}

	/// Sends a control command.
	pub fn send_control(&self, command: &ControlCommand) -> Result<()> {
		self.send(Frame::text(Channel::Control, command.to_string()))
	}

	/// Sends a code block.
	pub fn send_code(&self, block: &CodeBlock) -> Result<()> {
		self.send(Frame::json(Channel::Code, block)?)
	}

	/// Sends an introspection request.
	pub fn send_introspect(&self, id: RequestId, request: impl Into<String>) -> Result<()> {
		let payload = IntrospectRequest {
			id,
			request: request.into(),
		};
		self.send(Frame::json(Channel::Introspect, &payload)?)
	}

	/// Sends the startup handshake.
	pub fn send_startup(&self, info: &StartupInfo) -> Result<()> {
		self.send(Frame::json(Channel::Startup, info)?)
	}

	/// Waits until at least one frame (or the close notice) is available
	/// to [`ChannelSet::drain`]. Returns immediately once closed.
	pub async fn readable(&mut self) {
		if !self.stash.is_empty() || self.closed.is_some() {
			return;
		}
		match self.inbound.recv().await {
			Some(msg) => self.stash.push_back(msg),
			None => self.mark_closed("kernel connection task ended".into()),
		}
	}

	/// Takes everything received so far without blocking.
	pub fn drain(&mut self) -> Drained {
		let mut drained = Drained::default();
		loop {
			let msg = match self.stash.pop_front() {
				Some(msg) => msg,
				None => match self.inbound.try_recv() {
					Ok(msg) => msg,
					Err(TryRecvError::Empty) => break,
					Err(TryRecvError::Disconnected) => {
						if self.closed.is_none() {
							self.mark_closed("kernel connection task ended".into());
						}
						break;
					}
				},
			};
			match msg {
				Inbound::Frame(seq, frame) => route(seq, frame, &mut drained),
				Inbound::Closed(reason) => self.mark_closed(reason),
			}
		}

		for (channel, text) in &mut drained.output {
			if *channel == Channel::Stderr
				&& let std::borrow::Cow::Owned(fixed) = correct_line_offsets(text)
			{
				*text = fixed;
			}
		}
		if let Some(reason) = &self.closed
			&& !self.close_reported
		{
			self.close_reported = true;
			drained.closed = Some(reason.clone());
		}
		drained
	}

	/// True once the connection is gone.
	pub fn is_closed(&self) -> bool {
		self.closed.is_some()
	}

	/// Stops the IO task. Frames already received remain drainable.
	pub fn close(&mut self) {
		self.cancel.cancel();
	}

	/// The kernel process, if this set owns one.
	pub fn child_mut(&mut self) -> Option<&mut Child> {
		self.child.as_mut()
	}

	fn mark_closed(&mut self, reason: String) {
		if self.closed.is_none() {
			debug!(%reason, "kernel connection closed");
			self.closed = Some(reason);
		}
	}
}

impl Drop for ChannelSet {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}

impl std::fmt::Debug for ChannelSet {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ChannelSet")
			.field("pid", &self.child.as_ref().and_then(Child::id))
			.field("closed", &self.closed)
			.finish_non_exhaustive()
	}
}

/// Files one received frame into `drained`. Frames arrive in sequence
/// order, so output channels are listed by their oldest pending frame.
fn route(seq: u64, frame: Frame, drained: &mut Drained) {
	let channel = frame.channel;
	if channel.is_output() {
		let text = match frame.payload {
			JsonValue::String(text) => text,
			JsonValue::Null => return,
			other => other.to_string(),
		};
		match drained.output.iter_mut().find(|(c, _)| *c == channel) {
			Some((_, buf)) => buf.push_str(&text),
			None => drained.output.push((channel, text)),
		}
		return;
	}

	match channel {
		Channel::Prompt => {
			drained.prompt = Some(frame.as_text().unwrap_or_default().to_owned());
		}
		Channel::HeartbeatStatus => {
			drained.state = Some(InterpreterState::parse(frame.as_text().unwrap_or_default()));
		}
		Channel::DebugStatus => match frame.decode::<DebugState>() {
			Ok(state) => drained.debug = Some(state),
			Err(e) => warn!(seq, error = %e, "malformed debug status"),
		},
		Channel::IntrospectReply => match frame.decode::<IntrospectReply>() {
			Ok(reply) => drained.replies.push((reply.id, reply.result)),
			Err(e) => warn!(seq, error = %e, "malformed introspection reply"),
		},
		Channel::Startup => match frame.decode::<StartupReply>() {
			Ok(reply) => drained.startup = Some(reply),
			Err(e) => warn!(seq, error = %e, "malformed startup reply"),
		},
		other => warn!(seq, channel = %other, "unexpected frame from kernel"),
	}
}
