//! Key events delivered to the shell line editor.

mod modifiers;

pub use modifiers::Modifiers;

/// Key identity, independent of modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
	/// A printable character.
	Char(char),
	/// Return / Enter.
	Enter,
	/// Tab.
	Tab,
	/// Backspace.
	Backspace,
	/// Forward delete.
	Delete,
	/// Insert (toggles overwrite in most widgets).
	Insert,
	/// Escape.
	Escape,
	/// Home.
	Home,
	/// End.
	End,
	/// Arrow left.
	Left,
	/// Arrow right.
	Right,
	/// Arrow up.
	Up,
	/// Arrow down.
	Down,
}

/// A key press with its modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
	/// The key pressed.
	pub code: KeyCode,
	/// Modifiers held during the press.
	pub modifiers: Modifiers,
}

impl Key {
	/// Creates an unmodified key press.
	pub const fn new(code: KeyCode) -> Self {
		Self {
			code,
			modifiers: Modifiers::NONE,
		}
	}

	/// Creates an unmodified character key press.
	pub const fn char(c: char) -> Self {
		Self::new(KeyCode::Char(c))
	}

	/// Returns a copy with Shift held.
	pub fn with_shift(self) -> Self {
		Self {
			modifiers: self.modifiers.shift(),
			..self
		}
	}

	/// Returns the text this key types, if any.
	pub fn text(&self) -> Option<char> {
		if self.modifiers.ctrl || self.modifiers.alt {
			return None;
		}
		match self.code {
			KeyCode::Char(c) => Some(c),
			KeyCode::Tab => Some('\t'),
			_ => None,
		}
	}
}

impl From<KeyCode> for Key {
	fn from(code: KeyCode) -> Self {
		Self::new(code)
	}
}
