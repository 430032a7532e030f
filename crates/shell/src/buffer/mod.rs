//! The shell text area: an output region followed by an editable command line.
//!
//! Two anchors split the text. Everything before `output_end` is output;
//! between `output_end` and `edit_line_start` sits the current prompt; the
//! rest is the command being typed. Output is inserted at `output_end`, so
//! it always lands above the prompt, and only the command line can be edited.

use std::ops::Range as StdRange;

use kiln_primitives::anchor::map_pos;
use kiln_primitives::{
	Anchor, CharIdx, EditError, Gravity, Key, KeyCode, Range, RegionEdit, Result, RopeSlice, TextRegion,
};
use tracing::{debug, trace};

use crate::history::{History, HistoryNav, NavDirection};

mod backspace;

pub use backspace::fold_backspaces;

/// Default cap on the number of lines kept in the buffer.
pub const DEFAULT_MAX_LINES: usize = 10_000;

/// What a key press did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
	/// The key moved the cursor or changed the command line.
	Handled,
	/// The key had no effect.
	Ignored,
	/// Enter accepted this command.
	Submit(String),
}

/// Boundary-enforcing decorator over a [`TextRegion`].
#[derive(Debug)]
pub struct ShellBuffer<R> {
	region: R,
	output_end: Anchor,
	edit_start: Anchor,
	selection: Range,
	history: History,
	nav: HistoryNav,
	max_lines: usize,
	terminated: bool,
}

impl<R: TextRegion> ShellBuffer<R> {
	/// Wraps `region`. Existing text becomes output.
	pub fn new(region: R) -> Self {
		let end = region.len_chars();
		Self {
			region,
			output_end: Anchor::new(end, Gravity::Stay),
			edit_start: Anchor::new(end, Gravity::Stay),
			selection: Range::point(end),
			history: History::new(),
			nav: HistoryNav::default(),
			max_lines: DEFAULT_MAX_LINES,
			terminated: false,
		}
	}

	/// Sets the line cap; the oldest output lines are dropped beyond it.
	pub fn with_max_lines(mut self, max_lines: usize) -> Self {
		self.max_lines = max_lines.max(1);
		self
	}

	/// Starts from an existing history.
	pub fn with_history(mut self, history: History) -> Self {
		self.history = history;
		self
	}

	/// The wrapped region.
	pub fn region(&self) -> &R {
		&self.region
	}

	/// The wrapped region. Edits made through it bypass anchor tracking,
	/// so use it only for non-editing operations such as highlighting.
	pub fn region_mut(&mut self) -> &mut R {
		&mut self.region
	}

	/// End of the output region.
	pub fn output_end(&self) -> CharIdx {
		self.output_end.pos()
	}

	/// Start of the editable command line.
	pub fn edit_line_start(&self) -> CharIdx {
		self.edit_start.pos()
	}

	/// Current selection; `head` is the cursor.
	pub fn selection(&self) -> Range {
		self.selection
	}

	/// Cursor position.
	pub fn cursor(&self) -> CharIdx {
		self.selection.head
	}

	/// Command history.
	pub fn history(&self) -> &History {
		&self.history
	}

	/// Command history, for loading or clearing.
	pub fn history_mut(&mut self) -> &mut History {
		&mut self.history
	}

	/// True once the session behind this buffer has terminated.
	pub fn is_terminated(&self) -> bool {
		self.terminated
	}

	/// True when typing would not edit anything: the selection ends before
	/// the command line, or the buffer was terminated.
	pub fn is_read_only(&self) -> bool {
		self.terminated || self.selection.max() < self.edit_start.pos()
	}

	/// The command being typed.
	pub fn edit_text(&self) -> String {
		self.region
			.slice_to_string(self.edit_start.pos()..self.region.len_chars())
	}

	/// The prompt in front of the command line.
	pub fn prompt(&self) -> String {
		self.region
			.slice_to_string(self.output_end.pos()..self.edit_start.pos())
	}

	/// Output text.
	pub fn output_text(&self) -> String {
		self.region.slice_to_string(0..self.output_end.pos())
	}

	/// Moves the selection, clamped to the text.
	pub fn set_selection(&mut self, selection: Range) {
		self.selection = selection.clamp(self.region.len_chars());
	}

	/// Moves the cursor and clears the selection.
	pub fn set_cursor(&mut self, pos: CharIdx) {
		self.set_selection(Range::point(pos));
	}

	/// Appends output above the prompt.
	///
	/// Backspaces in `text` erase the character before them; leftover
	/// leading backspaces erase already written output, but never past the
	/// start of the line being written.
	pub fn write(&mut self, text: &str) -> Result<()> {
		if text.is_empty() {
			return Ok(());
		}
		let (text, erase) = fold_backspaces(text);
		let at = self.output_end.pos();
		let from = at.saturating_sub(erase).max(self.line_start(at));
		if from == at && text.is_empty() {
			return Ok(());
		}

		self.output_end.set_gravity(Gravity::Advance);
		self.edit_start.set_gravity(Gravity::Advance);
		let result = self.apply(from..at, &text, Gravity::Advance);
		self.output_end.set_gravity(Gravity::Stay);
		self.edit_start.set_gravity(Gravity::Stay);
		let edit = result?;
		trace!(at, erased = edit.removed, inserted = edit.inserted, "shell output");

		self.enforce_max_lines()
	}

	/// Replaces the prompt.
	pub fn set_prompt(&mut self, prompt: &str) -> Result<()> {
		let range = self.output_end.pos()..self.edit_start.pos();
		if self.region.slice_to_string(range.clone()) == prompt {
			return Ok(());
		}
		self.edit_start.set_gravity(Gravity::Advance);
		let result = self.apply(range, prompt, Gravity::Advance);
		self.edit_start.set_gravity(Gravity::Stay);
		result.map(drop)
	}

	/// Accepts the command line.
	///
	/// The command text is removed from the buffer, since the kernel echoes
	/// it back as output, and the prompt becomes part of the output. A
	/// non-empty command is recorded in the history. Returns `None` when
	/// the buffer is read-only.
	pub fn process_line(&mut self) -> Result<Option<String>> {
		if self.is_read_only() {
			return Ok(None);
		}
		let start = self.edit_start.pos();
		let end = self.region.len_chars();
		let raw = self.region.slice_to_string(start..end);
		self.apply(start..end, "", Gravity::Stay)?;

		let command = raw.trim_end().to_owned();
		if !command.is_empty() {
			self.history.add(&command);
		}
		let end = self.region.len_chars();
		self.output_end.set(end);
		self.edit_start.set(end);
		self.selection = Range::point(end);
		debug!(command = %command, "accepted command line");
		Ok(Some(command))
	}

	/// Handles one key press.
	pub fn handle_key(&mut self, key: Key) -> Result<KeyOutcome> {
		if !matches!(key.code, KeyCode::Up | KeyCode::Down) {
			self.nav.reset();
		}
		let extend = key.modifiers.shift;
		let len = self.region.len_chars();
		let edit_start = self.edit_start.pos();
		let head = self.selection.head;

		let outcome = match key.code {
			KeyCode::Enter => match self.process_line()? {
				Some(command) => KeyOutcome::Submit(command),
				None => KeyOutcome::Ignored,
			},
			KeyCode::Home => {
				self.selection = self.selection.move_head(edit_start, extend);
				KeyOutcome::Handled
			}
			KeyCode::End => {
				self.selection = self.selection.move_head(len, extend);
				KeyOutcome::Handled
			}
			KeyCode::Left if head == edit_start || head == 0 => KeyOutcome::Ignored,
			KeyCode::Left => {
				self.selection = self.selection.move_head(head - 1, extend);
				KeyOutcome::Handled
			}
			KeyCode::Right if head >= len => KeyOutcome::Ignored,
			KeyCode::Right => {
				self.selection = self.selection.move_head(head + 1, extend);
				KeyOutcome::Handled
			}
			KeyCode::Backspace if head == edit_start || self.is_read_only() => KeyOutcome::Ignored,
			KeyCode::Backspace => {
				if !self.selection.is_empty() {
					self.delete_selection()?;
				} else if head > edit_start {
					self.apply(head - 1..head, "", Gravity::Stay)?;
					self.selection = Range::point(head - 1);
				}
				KeyOutcome::Handled
			}
			KeyCode::Delete if self.is_read_only() => KeyOutcome::Ignored,
			KeyCode::Delete => {
				if !self.selection.is_empty() {
					self.delete_selection()?;
				} else if head >= edit_start && head < len {
					self.apply(head..head + 1, "", Gravity::Stay)?;
					self.selection = Range::point(head);
				}
				KeyOutcome::Handled
			}
			KeyCode::Up | KeyCode::Down if self.terminated => KeyOutcome::Ignored,
			KeyCode::Up | KeyCode::Down => {
				let direction = if key.code == KeyCode::Up {
					NavDirection::Older
				} else {
					NavDirection::Newer
				};
				let current = self.edit_text();
				let found = self.nav.step(&self.history, &current, direction);
				self.replace_edit_text(&found)?;
				KeyOutcome::Handled
			}
			// No overwrite mode.
			KeyCode::Insert | KeyCode::Escape => KeyOutcome::Ignored,
			_ => match key.text() {
				Some(c) if !self.terminated => {
					self.ensure_cursor_at_edit_line();
					self.insert_at_cursor(c.encode_utf8(&mut [0; 4]))?;
					KeyOutcome::Handled
				}
				_ => KeyOutcome::Ignored,
			},
		};
		Ok(outcome)
	}

	/// Moves the cursor to the end if it is before the command line.
	pub fn ensure_cursor_at_edit_line(&mut self) {
		if self.selection.head < self.edit_start.pos() {
			self.selection = Range::point(self.region.len_chars());
		}
	}

	/// Drops all output, keeping the prompt and command line.
	pub fn clear_screen(&mut self) -> Result<()> {
		let end = self.output_end.pos();
		if end > 0 {
			self.apply(0..end, "", Gravity::Stay)?;
		}
		self.ensure_cursor_at_edit_line();
		Ok(())
	}

	/// Empties the command line.
	pub fn clear_command(&mut self) -> Result<()> {
		self.replace_edit_text("")?;
		self.selection = Range::point(self.edit_start.pos());
		Ok(())
	}

	/// Selected text.
	pub fn copy(&self) -> String {
		self.region.slice_to_string(self.selection.span())
	}

	/// Removes and returns the selected part of the command line. When the
	/// buffer is read-only this only copies.
	pub fn cut(&mut self) -> Result<String> {
		if self.is_read_only() {
			return Ok(self.copy());
		}
		let range = self.editable_span();
		let text = self.region.slice_to_string(range);
		self.delete_selection()?;
		Ok(text)
	}

	/// Inserts `text` on the command line, moving there first if needed.
	pub fn paste(&mut self, text: &str) -> Result<()> {
		if self.terminated {
			return Err(EditError::ReadOnly(self.selection.head));
		}
		self.ensure_cursor_at_edit_line();
		self.insert_at_cursor(text)
	}

	/// Freezes the buffer: the command line becomes output, `notice` is
	/// appended and no further edits are accepted.
	pub fn terminate(&mut self, notice: &str) -> Result<()> {
		let end = self.region.len_chars();
		self.output_end.set(end);
		self.edit_start.set(end);
		self.write(notice)?;
		self.terminated = true;
		self.selection = Range::point(self.region.len_chars());
		Ok(())
	}

	fn line_start(&self, pos: CharIdx) -> CharIdx {
		let text = self.region.text();
		text.line_to_char(text.char_to_line(pos))
	}

	fn editable_span(&self) -> StdRange<CharIdx> {
		let span = self.selection.span();
		let start = span.start.max(self.edit_start.pos());
		start..span.end.max(start)
	}

	fn delete_selection(&mut self) -> Result<()> {
		let range = self.editable_span();
		let start = range.start;
		if !range.is_empty() {
			self.apply(range, "", Gravity::Stay)?;
		}
		self.selection = Range::point(start);
		Ok(())
	}

	fn insert_at_cursor(&mut self, text: &str) -> Result<()> {
		let range = self.editable_span();
		let start = range.start;
		let edit = self.apply(range, text, Gravity::Stay)?;
		self.selection = Range::point(start + edit.inserted);
		Ok(())
	}

	fn replace_edit_text(&mut self, text: &str) -> Result<()> {
		let range = self.edit_start.pos()..self.region.len_chars();
		self.apply(range, text, Gravity::Stay)?;
		self.selection = Range::point(self.region.len_chars());
		Ok(())
	}

	fn enforce_max_lines(&mut self) -> Result<()> {
		let lines = self.region.len_lines();
		if lines <= self.max_lines {
			return Ok(());
		}
		let excess = lines - self.max_lines;
		let cut = self
			.region
			.text()
			.line_to_char(excess)
			.min(self.line_start(self.output_end.pos()));
		if cut == 0 {
			return Ok(());
		}
		debug!(lines = excess, "dropping oldest shell output");
		self.apply(0..cut, "", Gravity::Stay).map(drop)
	}

	/// Applies an edit and maps the anchors and selection through it.
	fn apply(&mut self, range: StdRange<CharIdx>, text: &str, cursor: Gravity) -> Result<RegionEdit> {
		let edit = self.region.replace(range, text)?;
		self.output_end.apply(&edit);
		self.edit_start.apply(&edit);
		self.selection = self.selection.map(|pos| map_pos(pos, &edit, cursor));
		Ok(edit)
	}
}

impl<R: TextRegion> TextRegion for ShellBuffer<R> {
	fn text(&self) -> RopeSlice<'_> {
		self.region.text()
	}

	/// Edits the command line. Ranges that start before it are rejected.
	fn replace(&mut self, range: StdRange<CharIdx>, replacement: &str) -> Result<RegionEdit> {
		if self.terminated || range.start < self.edit_start.pos() {
			return Err(EditError::ReadOnly(range.start));
		}
		self.apply(range, replacement, Gravity::Stay)
	}
}
