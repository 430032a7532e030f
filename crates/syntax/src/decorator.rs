use std::ops::Range;
use std::sync::Arc;

use kiln_primitives::{CharIdx, RegionEdit, Result, TextRegion};
use ropey::RopeSlice;

use crate::highlighter::Highlighter;
use crate::indent::IndentPolicy;
use crate::language::LineParser;

/// Lines highlighted synchronously per edit; the rest waits for [`HighlightedBuffer::pump`].
pub const DEFAULT_EDIT_BUDGET: usize = 256;

/// A [`TextRegion`] that keeps a [`Highlighter`] in step with its edits.
#[derive(Debug)]
pub struct HighlightedBuffer<R> {
	inner: R,
	highlighter: Highlighter,
	edit_budget: usize,
}

impl<R: TextRegion> HighlightedBuffer<R> {
	/// Wraps `inner` and highlights its first [`DEFAULT_EDIT_BUDGET`] lines.
	pub fn new(inner: R, parser: Arc<dyn LineParser>, policy: IndentPolicy) -> Self {
		let highlighter = Highlighter::new(parser, policy, inner.len_lines());
		let mut buffer = Self {
			inner,
			highlighter,
			edit_budget: DEFAULT_EDIT_BUDGET,
		};
		buffer.pump(DEFAULT_EDIT_BUDGET);
		buffer
	}

	/// Sets how many lines each edit highlights before returning.
	pub fn with_edit_budget(mut self, budget: usize) -> Self {
		self.edit_budget = budget;
		self
	}

	/// The highlighter.
	pub fn highlighter(&self) -> &Highlighter {
		&self.highlighter
	}

	/// The highlighter, for changing parser or policy.
	pub fn highlighter_mut(&mut self) -> &mut Highlighter {
		&mut self.highlighter
	}

	/// Continues pending highlighting for up to `budget` lines.
	pub fn pump(&mut self, budget: usize) -> usize {
		self.highlighter.pump(self.inner.text(), budget)
	}

	/// Finishes all pending highlighting.
	pub fn pump_all(&mut self) {
		self.pump(usize::MAX);
	}

	/// The wrapped region.
	pub fn inner(&self) -> &R {
		&self.inner
	}

	/// Unwraps the region.
	pub fn into_inner(self) -> R {
		self.inner
	}
}

impl<R: TextRegion> TextRegion for HighlightedBuffer<R> {
	fn text(&self) -> RopeSlice<'_> {
		self.inner.text()
	}

	fn replace(&mut self, range: Range<CharIdx>, replacement: &str) -> Result<RegionEdit> {
		let edit = self.inner.replace(range, replacement)?;
		self.highlighter.on_edit(&edit.lines);
		self.pump(self.edit_budget);
		Ok(edit)
	}
}

#[cfg(test)]
mod tests {
	use kiln_primitives::TextBuffer;

	use super::*;
	use crate::language::LanguageSpec;
	use crate::token::{LexState, TokenKind};

	#[test]
	fn edits_flow_through_to_highlighter() {
		let mut buf = HighlightedBuffer::new(
			TextBuffer::new("x = 1\ny = 2"),
			Arc::new(LanguageSpec::python()),
			IndentPolicy::default(),
		);
		assert_eq!(buf.highlighter().pending(), 0);

		buf.insert(4, "'''").unwrap();
		assert_eq!(buf.text().to_string(), "x = '''1\ny = 2");
		assert_eq!(buf.highlighter().line(1).unwrap().end_state, LexState::TripleSingle);
		assert_eq!(buf.highlighter().line(1).unwrap().tokens[0].kind, TokenKind::String);
	}

	#[test]
	fn small_budget_leaves_work_for_pump() {
		let mut buf = HighlightedBuffer::new(
			TextBuffer::new(&"a\n".repeat(8)),
			Arc::new(LanguageSpec::python()),
			IndentPolicy::default(),
		)
		.with_edit_budget(1);
		buf.insert(0, "\"\"\"").unwrap();
		assert!(buf.highlighter().pending() > 0);
		buf.pump_all();
		assert_eq!(buf.highlighter().pending(), 0);
		assert_eq!(buf.highlighter().line(8).unwrap().end_state, LexState::TripleDouble);
	}

	#[test]
	fn failed_edit_leaves_state_untouched() {
		let mut buf = HighlightedBuffer::new(
			TextBuffer::new("abc"),
			Arc::new(LanguageSpec::python()),
			IndentPolicy::default(),
		);
		assert!(buf.remove(2..10).is_err());
		assert_eq!(buf.highlighter().line_count(), 1);
		assert_eq!(buf.into_inner().text().to_string(), "abc");
	}
}
