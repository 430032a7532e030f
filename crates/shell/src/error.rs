use kiln_primitives::EditError;
use thiserror::Error;

/// Errors raised by the shell buffer and session.
#[derive(Debug, Error)]
pub enum ShellError {
	/// A buffer edit was rejected.
	#[error(transparent)]
	Edit(#[from] EditError),
	/// The kernel connection failed.
	#[error(transparent)]
	Kernel(#[from] kiln_kernel::Error),
	/// The session has terminated and accepts no more input.
	#[error("shell session has terminated")]
	Terminated,
}

/// Result type for shell operations.
pub type Result<T> = std::result::Result<T, ShellError>;
