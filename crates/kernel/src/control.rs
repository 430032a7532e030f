use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Debugger navigation sent as `DEBUG <sub>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugCommand {
	/// Enter post-mortem debugging.
	Start,
	/// Leave the debugger.
	Stop,
	/// Move one frame up.
	Up,
	/// Move one frame down.
	Down,
	/// Jump to frame `n`.
	Index(usize),
	/// Print the stack.
	Where,
}

/// A control-channel message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
	/// `INT`: raise KeyboardInterrupt in the running code.
	Interrupt,
	/// `TERM`: terminate the kernel.
	Terminate,
	/// `RESTART[ <script>]`: restart, optionally running a script afterwards.
	Restart(Option<String>),
	/// `DEBUG ...`: debugger navigation.
	Debug(DebugCommand),
}

impl fmt::Display for DebugCommand {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DebugCommand::Start => f.write_str("START"),
			DebugCommand::Stop => f.write_str("STOP"),
			DebugCommand::Up => f.write_str("UP"),
			DebugCommand::Down => f.write_str("DOWN"),
			DebugCommand::Index(n) => write!(f, "INDEX {n}"),
			DebugCommand::Where => f.write_str("WHERE"),
		}
	}
}

impl fmt::Display for ControlCommand {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ControlCommand::Interrupt => f.write_str("INT"),
			ControlCommand::Terminate => f.write_str("TERM"),
			ControlCommand::Restart(None) => f.write_str("RESTART"),
			ControlCommand::Restart(Some(script)) => write!(f, "RESTART {script}"),
			ControlCommand::Debug(cmd) => write!(f, "DEBUG {cmd}"),
		}
	}
}

impl FromStr for ControlCommand {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let unknown = || Error::UnknownControl(s.to_owned());
		let (head, rest) = match s.trim().split_once(' ') {
			Some((head, rest)) => (head, rest.trim()),
			None => (s.trim(), ""),
		};
		match head {
			"INT" if rest.is_empty() => Ok(ControlCommand::Interrupt),
			"TERM" if rest.is_empty() => Ok(ControlCommand::Terminate),
			"RESTART" if rest.is_empty() => Ok(ControlCommand::Restart(None)),
			"RESTART" => Ok(ControlCommand::Restart(Some(rest.to_owned()))),
			"DEBUG" => {
				let (sub, arg) = rest.split_once(' ').unwrap_or((rest, ""));
				let cmd = match (sub, arg.trim()) {
					("START", "") => DebugCommand::Start,
					("STOP", "") => DebugCommand::Stop,
					("UP", "") => DebugCommand::Up,
					("DOWN", "") => DebugCommand::Down,
					("WHERE", "") => DebugCommand::Where,
					("INDEX", n) => DebugCommand::Index(n.parse().map_err(|_| unknown())?),
					_ => return Err(unknown()),
				};
				Ok(ControlCommand::Debug(cmd))
			}
			_ => Err(unknown()),
		}
	}
}
