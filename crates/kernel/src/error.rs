use std::io;

use thiserror::Error;

/// Errors from the kernel connection.
#[derive(Debug, Error)]
pub enum Error {
	/// The kernel process could not be started.
	#[error("failed to start kernel '{command}': {reason}")]
	Spawn {
		/// Program that was launched.
		command: String,
		/// Failure description.
		reason: String,
	},
	/// A frame could not be encoded or decoded.
	#[error("invalid frame: {0}")]
	Json(#[from] serde_json::Error),
	/// Input/output errors on the kernel pipes.
	#[error("{0}")]
	Io(#[from] io::Error),
	/// A control token that does not parse.
	#[error("unknown control command '{0}'")]
	UnknownControl(String),
	/// A frame that decodes but carries the wrong payload shape.
	#[error("protocol error: {0}")]
	Protocol(String),
	/// The channel set has been torn down.
	#[error("kernel connection closed")]
	Closed,
}

/// Result alias for kernel operations.
pub type Result<T> = std::result::Result<T, Error>;
