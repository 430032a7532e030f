//! Error types for text region edits.

use thiserror::Error;

use crate::range::{CharIdx, CharLen};

/// Errors produced when an edit cannot be applied to a region.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
	/// The edit range ends past the end of the region.
	#[error("edit range {start}..{end} out of bounds (length {len})")]
	OutOfBounds {
		/// Start of the rejected range.
		start: CharIdx,
		/// End of the rejected range.
		end: CharIdx,
		/// Length of the region in characters.
		len: CharLen,
	},

	/// The edit range is reversed.
	#[error("edit range {start}..{end} is reversed")]
	Reversed {
		/// Start of the rejected range.
		start: CharIdx,
		/// End of the rejected range.
		end: CharIdx,
	},

	/// The edit touches a read-only part of the region.
	#[error("position {0} is read-only")]
	ReadOnly(CharIdx),
}

/// Result type for region edits.
pub type Result<T> = std::result::Result<T, EditError>;
