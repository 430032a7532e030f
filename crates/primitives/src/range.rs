/// Character offset into a region. Anchors, tokens and the shell's
/// boundaries all count characters, never bytes.
pub type CharIdx = usize;

/// Number of characters.
pub type CharLen = usize;

/// Selection in a region: `anchor` stays put while `head` follows the
/// cursor. `head` may sit before `anchor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Range {
	/// Fixed end.
	pub anchor: CharIdx,
	/// Cursor end.
	pub head: CharIdx,
}

impl Range {
	/// Selection from `anchor` to `head`.
	pub const fn new(anchor: CharIdx, head: CharIdx) -> Self {
		Self { anchor, head }
	}

	/// Bare cursor at `pos`.
	pub const fn point(pos: CharIdx) -> Self {
		Self::new(pos, pos)
	}

	#[inline]
	pub fn min(&self) -> CharIdx {
		self.anchor.min(self.head)
	}

	#[inline]
	pub fn max(&self) -> CharIdx {
		self.anchor.max(self.head)
	}

	/// Selected characters, in text order.
	#[inline]
	pub fn span(&self) -> std::ops::Range<CharIdx> {
		self.min()..self.max()
	}

	/// Nothing selected.
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.anchor == self.head
	}

	/// Puts the cursor at `head`. With `extend` the anchor is kept and the
	/// selection grows or shrinks; otherwise the selection collapses.
	pub fn move_head(self, head: CharIdx, extend: bool) -> Self {
		if extend { Self::new(self.anchor, head) } else { Self::point(head) }
	}

	/// Maps both ends through `f`, e.g. to follow an edit.
	pub fn map(self, mut f: impl FnMut(CharIdx) -> CharIdx) -> Self {
		Self::new(f(self.anchor), f(self.head))
	}

	/// Pulls both ends back to at most `len`.
	pub fn clamp(&self, len: CharLen) -> Self {
		self.map(|pos| pos.min(len))
	}
}
