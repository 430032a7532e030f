//! The interactive shell: a prompt-bounded buffer bound to a kernel.
//!
//! [`ShellBuffer`] enforces the boundary between output and the command
//! line over any [`kiln_primitives::TextRegion`]; wrapped around a
//! highlighted buffer it forms the shell's text. [`ShellSession`] connects
//! that text to a kernel, rewrites magic commands and runs autocomplete and
//! call-tip lookups.

/// Output region and command line.
pub mod buffer;
mod error;
/// Command history.
pub mod history;
/// Autocomplete and call tips.
pub mod introspect;
/// Magic command rewriting.
pub mod magic;
/// GUI event-loop integration.
pub mod pump;
/// The shell session.
pub mod session;

pub use buffer::{KeyOutcome, ShellBuffer, fold_backspaces};
pub use error::{Result, ShellError};
pub use history::{History, HistoryNav, NavDirection};
pub use introspect::{AutoComplete, CallTip, IntrospectCache, Lookup, Query};
pub use magic::{MagicContext, MagicOutcome};
pub use pump::{EventPump, NoPump};
pub use session::{Lifecycle, SHELL_VIEW, SessionConfig, ShellEvent, ShellSession, ShellText};
