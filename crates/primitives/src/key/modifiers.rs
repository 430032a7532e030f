/// Modifier keys held during a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
	pub ctrl: bool,
	pub alt: bool,
	/// Extends the selection when combined with a movement key.
	pub shift: bool,
}

impl Modifiers {
	/// Nothing held.
	pub const NONE: Self = Self {
		ctrl: false,
		alt: false,
		shift: false,
	};

	/// Same modifiers plus Shift.
	pub fn shift(self) -> Self {
		Self { shift: true, ..self }
	}
}
