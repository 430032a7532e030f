use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Error, Result};

/// Named channel a frame travels on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
	/// Interactive input lines, front end to kernel.
	Stdin,
	/// Standard output of user code.
	Stdout,
	/// Standard error of user code.
	Stderr,
	/// Input echoed back by the kernel, including run notices.
	StdinEcho,
	/// Output written by C extensions directly to the process streams.
	CStdoutStderr,
	/// Messages from the kernel broker, e.g. restart notices.
	BrokerStream,
	/// The current prompt.
	Prompt,
	/// Interpreter state: `Ready`, `Busy`, `More`, `Debug`, ...
	HeartbeatStatus,
	/// Debugger frames and index.
	DebugStatus,
	/// Control tokens, front end to kernel.
	Control,
	/// Large code blocks, front end to kernel.
	Code,
	/// Introspection requests, front end to kernel.
	Introspect,
	/// Introspection replies.
	IntrospectReply,
	/// Startup handshake, both directions.
	Startup,
}

impl Channel {
	/// Channels whose text is appended to the shell buffer.
	pub const fn is_output(self) -> bool {
		matches!(
			self,
			Channel::Stdout | Channel::Stderr | Channel::StdinEcho | Channel::CStdoutStderr | Channel::BrokerStream
		)
	}
}

impl fmt::Display for Channel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match serde_json::to_value(self) {
			Ok(JsonValue::String(name)) => f.write_str(&name),
			_ => write!(f, "{self:?}"),
		}
	}
}

/// One message on one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
	/// Channel name.
	pub channel: Channel,
	/// Channel-specific payload; text channels carry a string.
	pub payload: JsonValue,
}

impl Frame {
	/// A text frame.
	pub fn text(channel: Channel, text: impl Into<String>) -> Self {
		Self {
			channel,
			payload: JsonValue::String(text.into()),
		}
	}

	/// A frame carrying any serializable payload.
	pub fn json<T: Serialize>(channel: Channel, payload: &T) -> Result<Self> {
		Ok(Self {
			channel,
			payload: serde_json::to_value(payload)?,
		})
	}

	/// Payload as text, if it is a string.
	pub fn as_text(&self) -> Option<&str> {
		self.payload.as_str()
	}

	/// Decodes the payload.
	pub fn decode<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
		T::deserialize(&self.payload).map_err(Error::from)
	}
}

/// Reads the next frame.
///
/// Returns `Ok(None)` at end of stream. Partial lines stay in `buf`, so a
/// cancelled call can be retried without losing data. Blank lines are
/// skipped.
pub async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>) -> Result<Option<Frame>>
where
	R: AsyncBufRead + Unpin + ?Sized,
{
	loop {
		let read = reader.read_until(b'\n', buf).await?;
		if read == 0 && buf.is_empty() {
			return Ok(None);
		}
		let line = std::mem::take(buf);
		let line = line.trim_ascii();
		if line.is_empty() {
			continue;
		}
		return serde_json::from_slice(line).map(Some).map_err(Error::from);
	}
}

/// Writes one frame followed by a newline and flushes.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<()>
where
	W: AsyncWrite + Unpin + ?Sized,
{
	let mut bytes = serde_json::to_vec(frame)?;
	bytes.push(b'\n');
	writer.write_all(&bytes).await?;
	writer.flush().await?;
	Ok(())
}
