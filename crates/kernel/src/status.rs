use std::fmt;

use serde::{Deserialize, Serialize};

/// Interpreter state reported on the heartbeat channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InterpreterState {
	/// No report received yet.
	#[default]
	Unknown,
	/// Waiting for a new statement.
	Ready,
	/// Waiting for the continuation of a statement.
	More,
	/// Executing code.
	Busy,
	/// Stopped in the debugger.
	Debug,
	/// The kernel process is gone.
	Dead,
	/// Any other state the kernel reports.
	Other(String),
}

impl InterpreterState {
	/// Parses a heartbeat payload.
	pub fn parse(text: &str) -> Self {
		match text.trim() {
			"Ready" => InterpreterState::Ready,
			"More" => InterpreterState::More,
			"Busy" => InterpreterState::Busy,
			"Debug" => InterpreterState::Debug,
			"Dead" => InterpreterState::Dead,
			"" => InterpreterState::Unknown,
			other => InterpreterState::Other(other.to_owned()),
		}
	}

	/// True when the interpreter accepts input without queueing it.
	pub fn is_idle(&self) -> bool {
		matches!(
			self,
			InterpreterState::Ready | InterpreterState::More | InterpreterState::Debug
		)
	}
}

impl fmt::Display for InterpreterState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			InterpreterState::Unknown => "",
			InterpreterState::Ready => "Ready",
			InterpreterState::More => "More",
			InterpreterState::Busy => "Busy",
			InterpreterState::Debug => "Debug",
			InterpreterState::Dead => "Dead",
			InterpreterState::Other(s) => s,
		})
	}
}

/// Debugger position reported on the debug-status channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugState {
	/// Index of the focused frame.
	pub index: usize,
	/// Frame descriptions, `File "f", line n, in name`.
	pub frames: Vec<String>,
}

impl DebugState {
	/// Description of the focused frame.
	pub fn current(&self) -> Option<&str> {
		self.frames.get(self.index).map(String::as_str)
	}

	/// File and line of the focused frame.
	pub fn current_location(&self) -> Option<(&str, u64)> {
		let frame = self.current()?;
		let rest = frame.strip_prefix("File \"")?;
		let (file, rest) = rest.split_once('"')?;
		let line = rest.strip_prefix(", line ")?;
		let digits = line.split(|c: char| !c.is_ascii_digit()).next()?;
		Some((file, digits.parse().ok()?))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn heartbeat_states() {
		assert_eq!(InterpreterState::parse("Busy"), InterpreterState::Busy);
		assert_eq!(InterpreterState::parse(" Ready\n"), InterpreterState::Ready);
		assert_eq!(
			InterpreterState::parse("Very busy"),
			InterpreterState::Other("Very busy".into())
		);
		assert!(InterpreterState::More.is_idle());
		assert!(!InterpreterState::Busy.is_idle());
	}

	#[test]
	fn focused_frame() {
		let state = DebugState {
			index: 1,
			frames: vec![
				"File \"a.py\", line 3, in <module>".into(),
				"File \"/x/b.py\", line 41, in f".into(),
			],
		};
		assert_eq!(state.current_location(), Some(("/x/b.py", 41)));
		assert_eq!(DebugState::default().current_location(), None);
	}
}
