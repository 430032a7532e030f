//! Editable text regions.
//!
//! [`TextRegion`] is the narrow interface the rest of the stack edits text
//! through. Every edit reports a [`RegionEdit`] so that decorators can keep
//! their own per-line or per-position state in step with the text.

use std::ops::Range as StdRange;

use ropey::{Rope, RopeSlice};

use crate::error::{EditError, Result};
use crate::range::{CharIdx, CharLen};
use crate::rope::line_text;

/// Lines touched by an edit.
///
/// Old lines `first_line..first_line + removed_lines` were replaced by new
/// lines `first_line..first_line + inserted_lines`. Both counts are at least
/// one, because the line containing the edit start always changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineDelta {
	/// First line whose text changed.
	pub first_line: usize,
	/// Number of lines the edit replaced.
	pub removed_lines: usize,
	/// Number of lines that replaced them.
	pub inserted_lines: usize,
}

/// Description of a single applied edit, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionEdit {
	/// Start of the replaced range.
	pub start: CharIdx,
	/// Number of characters removed at `start`.
	pub removed: CharLen,
	/// Number of characters inserted at `start`.
	pub inserted: CharLen,
	/// Affected lines.
	pub lines: LineDelta,
}

impl RegionEdit {
	/// End of the removed range in pre-edit coordinates.
	pub fn removed_end(&self) -> CharIdx {
		self.start + self.removed
	}

	/// End of the inserted text in post-edit coordinates.
	pub fn inserted_end(&self) -> CharIdx {
		self.start + self.inserted
	}
}

/// Minimal editable text abstraction.
pub trait TextRegion {
	/// Read-only view of the whole text.
	fn text(&self) -> RopeSlice<'_>;

	/// Replaces `range` with `replacement`.
	fn replace(&mut self, range: StdRange<CharIdx>, replacement: &str) -> Result<RegionEdit>;

	/// Number of characters in the region.
	fn len_chars(&self) -> CharLen {
		self.text().len_chars()
	}

	/// Number of lines, counting the empty line after a trailing newline.
	fn len_lines(&self) -> usize {
		self.text().len_lines()
	}

	/// Text of line `idx` without its terminator.
	fn line(&self, idx: usize) -> String {
		line_text(self.text(), idx)
	}

	/// Copies `range` out as a string.
	fn slice_to_string(&self, range: StdRange<CharIdx>) -> String {
		let len = self.len_chars();
		let range = range.start.min(len)..range.end.min(len);
		self.text().slice(range).into()
	}

	/// Inserts `text` at `at`.
	fn insert(&mut self, at: CharIdx, text: &str) -> Result<RegionEdit> {
		self.replace(at..at, text)
	}

	/// Removes `range`.
	fn remove(&mut self, range: StdRange<CharIdx>) -> Result<RegionEdit> {
		self.replace(range, "")
	}
}

/// Rope-backed [`TextRegion`].
#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
	rope: Rope,
}

impl TextBuffer {
	/// Creates a buffer holding `text`.
	pub fn new(text: &str) -> Self {
		Self { rope: Rope::from(text) }
	}

	/// Returns the underlying rope.
	pub fn rope(&self) -> &Rope {
		&self.rope
	}
}

impl From<&str> for TextBuffer {
	fn from(text: &str) -> Self {
		Self::new(text)
	}
}

impl TextRegion for TextBuffer {
	fn text(&self) -> RopeSlice<'_> {
		self.rope.slice(..)
	}

	fn replace(&mut self, range: StdRange<CharIdx>, replacement: &str) -> Result<RegionEdit> {
		let len = self.rope.len_chars();
		if range.start > range.end {
			return Err(EditError::Reversed {
				start: range.start,
				end: range.end,
			});
		}
		if range.end > len {
			return Err(EditError::OutOfBounds {
				start: range.start,
				end: range.end,
				len,
			});
		}

		let first_line = self.rope.char_to_line(range.start);
		let old_last_line = self.rope.char_to_line(range.end);

		if range.start < range.end {
			self.rope.remove(range.clone());
		}
		let inserted = replacement.chars().count();
		if inserted > 0 {
			self.rope.insert(range.start, replacement);
		}
		let new_last_line = self.rope.char_to_line(range.start + inserted);

		Ok(RegionEdit {
			start: range.start,
			removed: range.end - range.start,
			inserted,
			lines: LineDelta {
				first_line,
				removed_lines: old_last_line - first_line + 1,
				inserted_lines: new_last_line - first_line + 1,
			},
		})
	}
}
