use crate::range::CharIdx;
use crate::region::RegionEdit;

/// How an anchor reacts to text inserted exactly at its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gravity {
	/// Stay before the inserted text.
	#[default]
	Stay,
	/// Move past the inserted text.
	Advance,
}

/// A character position that follows edits made elsewhere in its region.
///
/// Text inserted strictly before the anchor shifts it forward; text removed
/// around it collapses it onto the removal start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Anchor {
	pos: CharIdx,
	gravity: Gravity,
}

impl Anchor {
	/// Creates an anchor at `pos`.
	pub fn new(pos: CharIdx, gravity: Gravity) -> Self {
		Self { pos, gravity }
	}

	/// Current position.
	#[inline]
	pub fn pos(&self) -> CharIdx {
		self.pos
	}

	/// Moves the anchor to `pos`.
	#[inline]
	pub fn set(&mut self, pos: CharIdx) {
		self.pos = pos;
	}

	/// Returns the insert gravity.
	pub fn gravity(&self) -> Gravity {
		self.gravity
	}

	/// Changes the insert gravity.
	pub fn set_gravity(&mut self, gravity: Gravity) {
		self.gravity = gravity;
	}

	/// Updates the position for an edit applied to the region.
	pub fn apply(&mut self, edit: &RegionEdit) {
		self.pos = map_pos(self.pos, edit, self.gravity);
	}
}

/// Maps `pos` through `edit` (removal first, then insertion at the same start).
pub fn map_pos(pos: CharIdx, edit: &RegionEdit, gravity: Gravity) -> CharIdx {
	let start = edit.start;
	let pos = if pos >= edit.removed_end() {
		pos - edit.removed
	} else if pos > start {
		start
	} else {
		pos
	};

	if pos > start || (pos == start && gravity == Gravity::Advance && edit.inserted > 0) {
		pos + edit.inserted
	} else {
		pos
	}
}
