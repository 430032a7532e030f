//! Communication with an out-of-process interpreter kernel.
//!
//! The kernel runs as a separate process and talks to the front end over a
//! set of named channels multiplexed onto its stdin/stdout as newline
//! delimited JSON frames. [`ChannelSet`] owns the connection and is drained
//! cooperatively from the front end's timer tick; [`Correlator`] pairs
//! introspection requests with their replies, one at a time.

/// Multiplexed channel set over one kernel connection.
pub mod channel;
/// Large code blocks and traceback line correction.
pub mod code;
/// Control-channel commands.
pub mod control;
/// Request/response correlation for introspection.
pub mod correlator;
mod error;
/// Kernel process launching.
pub mod launcher;
/// Startup handshake.
pub mod startup;
/// Interpreter and debugger status.
pub mod status;
/// Frame encoding.
pub mod wire;

pub use channel::{ChannelSet, Drained};
pub use code::{CodeBlock, CodeOrigin, correct_line_offsets};
pub use control::{ControlCommand, DebugCommand};
pub use correlator::{Correlator, Outcome, Reply, RequestHandle, RequestId, RequesterId};
pub use error::{Error, Result};
pub use launcher::{KERNEL_SCRIPT, KernelIo, KernelLauncher, KernelSpec, ProcessLauncher};
pub use startup::{GuiToolkit, StartupInfo, StartupReply};
pub use status::{DebugState, InterpreterState};
pub use wire::{Channel, Frame};
