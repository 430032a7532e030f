//! Style mapping table.
//!
//! Maps every [`StyleKey`] (token kinds plus the two whitespace diagnostics)
//! to a [`TextStyle`]. Keys without an entry are rendered unstyled.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::token::TokenKind;

/// Errors from parsing style configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StyleError {
	/// The key is neither a token kind nor a diagnostic.
	#[error("unknown style key '{0}'")]
	UnknownKey(String),
	/// Color is not `#rrggbb`.
	#[error("invalid color '{0}', expected #rrggbb")]
	InvalidColor(String),
}

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
	/// Red.
	pub r: u8,
	/// Green.
	pub g: u8,
	/// Blue.
	pub b: u8,
}

impl Color {
	/// Creates a color from a `0xRRGGBB` value.
	pub const fn from_hex(rgb: u32) -> Self {
		Self {
			r: (rgb >> 16) as u8,
			g: (rgb >> 8) as u8,
			b: rgb as u8,
		}
	}
}

impl FromStr for Color {
	type Err = StyleError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let invalid = || StyleError::InvalidColor(s.to_owned());
		let hex = s.strip_prefix('#').ok_or_else(invalid)?;
		if hex.len() != 6 {
			return Err(invalid());
		}
		u32::from_str_radix(hex, 16)
			.map(Color::from_hex)
			.map_err(|_| invalid())
	}
}

impl TryFrom<String> for Color {
	type Error = StyleError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<Color> for String {
	fn from(color: Color) -> Self {
		color.to_string()
	}
}

impl fmt::Display for Color {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
	}
}

/// Underline decoration, optionally with a tooltip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Underline {
	/// Line color.
	pub color: Option<Color>,
	/// Squiggly (spell-check) rather than straight.
	pub squiggly: bool,
	/// Hover text.
	pub tooltip: Option<String>,
}

/// Visual attributes for a span.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextStyle {
	/// Foreground color.
	pub fg: Option<Color>,
	/// Background color.
	pub bg: Option<Color>,
	/// Bold weight.
	pub bold: bool,
	/// Italic.
	pub italic: bool,
	/// Underline decoration.
	pub underline: Option<Underline>,
}

impl TextStyle {
	fn fg(rgb: u32) -> Self {
		Self {
			fg: Some(Color::from_hex(rgb)),
			..Self::default()
		}
	}

	fn bold(self) -> Self {
		Self { bold: true, ..self }
	}

	fn squiggle(rgb: u32, tooltip: &str) -> Self {
		Self {
			underline: Some(Underline {
				color: Some(Color::from_hex(rgb)),
				squiggly: true,
				tooltip: Some(tooltip.to_owned()),
			}),
			..Self::default()
		}
	}
}

/// Key into the style table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleKey {
	/// A token kind.
	Token(TokenKind),
	/// Leading whitespace mixing tabs and spaces.
	MixedWhitespace,
	/// Leading whitespace contradicting the indentation policy.
	PolicyMismatch,
}

impl StyleKey {
	/// Configuration name.
	pub fn name(self) -> &'static str {
		match self {
			StyleKey::Token(kind) => kind.name(),
			StyleKey::MixedWhitespace => "mixed-whitespace",
			StyleKey::PolicyMismatch => "policy-mismatch",
		}
	}
}

impl FromStr for StyleKey {
	type Err = StyleError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"mixed-whitespace" => Ok(StyleKey::MixedWhitespace),
			"policy-mismatch" => Ok(StyleKey::PolicyMismatch),
			_ => s
				.parse::<TokenKind>()
				.map(StyleKey::Token)
				.map_err(|()| StyleError::UnknownKey(s.to_owned())),
		}
	}
}

impl From<TokenKind> for StyleKey {
	fn from(kind: TokenKind) -> Self {
		StyleKey::Token(kind)
	}
}

/// Partial style from configuration. Unset fields keep the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct StyleOverride {
	/// Foreground color.
	pub fg: Option<Color>,
	/// Background color.
	pub bg: Option<Color>,
	/// Bold weight.
	pub bold: Option<bool>,
	/// Italic.
	pub italic: Option<bool>,
	/// Underline color; enables the underline.
	pub underline: Option<Color>,
	/// Squiggly underline.
	pub squiggly: Option<bool>,
	/// Underline tooltip.
	pub tooltip: Option<String>,
}

impl StyleOverride {
	fn apply(&self, style: &mut TextStyle) {
		if let Some(fg) = self.fg {
			style.fg = Some(fg);
		}
		if let Some(bg) = self.bg {
			style.bg = Some(bg);
		}
		if let Some(bold) = self.bold {
			style.bold = bold;
		}
		if let Some(italic) = self.italic {
			style.italic = italic;
		}
		if self.underline.is_some() || self.squiggly.is_some() || self.tooltip.is_some() {
			let underline = style.underline.get_or_insert(Underline {
				color: None,
				squiggly: false,
				tooltip: None,
			});
			if let Some(color) = self.underline {
				underline.color = Some(color);
			}
			if let Some(squiggly) = self.squiggly {
				underline.squiggly = squiggly;
			}
			if let Some(tooltip) = &self.tooltip {
				underline.tooltip = Some(tooltip.clone());
			}
		}
	}
}

/// Style for each key that has one.
#[derive(Debug, Clone, Default)]
pub struct StyleTable {
	styles: FxHashMap<StyleKey, TextStyle>,
}

impl StyleTable {
	/// A table with no entries.
	pub fn empty() -> Self {
		Self::default()
	}

	/// The default scheme. Identifiers, operators and other characters are
	/// left unstyled.
	pub fn defaults() -> Self {
		use TokenKind::*;

		let mut table = Self::empty();
		table.set(String, TextStyle::fg(0x7F007F));
		table.set(
			Unterminated,
			TextStyle {
				bg: Some(Color::from_hex(0xFF8888)),
				..TextStyle::fg(0x000000)
			},
		);
		table.set(Comment, TextStyle::fg(0x007F00));
		table.set(
			CellComment,
			TextStyle {
				underline: Some(Underline {
					color: None,
					squiggly: false,
					tooltip: None,
				}),
				..TextStyle::fg(0x007F00).bold()
			},
		);
		table.set(
			TodoComment,
			TextStyle {
				bg: Some(Color::from_hex(0xFFFF00)),
				italic: true,
				..TextStyle::fg(0xE00000)
			},
		);
		table.set(Keyword, TextStyle::fg(0x00007F).bold());
		table.set(Number, TextStyle::fg(0x007F7F));
		table.set(FunctionName, TextStyle::fg(0x007F7F).bold());
		table.set(ClassName, TextStyle::fg(0x0000FF).bold());
		table.set(
			StyleKey::MixedWhitespace,
			TextStyle::squiggle(0xFF0000, "Mixed tabs and spaces"),
		);
		table.set(
			StyleKey::PolicyMismatch,
			TextStyle::squiggle(0x0000FF, "Whitespace differs from document setting"),
		);
		table
	}

	/// Style for `key`, if it has one.
	pub fn get(&self, key: impl Into<StyleKey>) -> Option<&TextStyle> {
		self.styles.get(&key.into())
	}

	/// Sets the style for `key`.
	pub fn set(&mut self, key: impl Into<StyleKey>, style: TextStyle) {
		self.styles.insert(key.into(), style);
	}

	/// Removes the style for `key`, leaving it unstyled.
	pub fn remove(&mut self, key: impl Into<StyleKey>) -> Option<TextStyle> {
		self.styles.remove(&key.into())
	}

	/// Applies configured overrides keyed by style name.
	///
	/// Fails on the first unknown key without applying anything.
	pub fn apply_overrides(&mut self, overrides: &BTreeMap<String, StyleOverride>) -> Result<(), StyleError> {
		let resolved = overrides
			.iter()
			.map(|(name, ov)| name.parse::<StyleKey>().map(|key| (key, ov)))
			.collect::<Result<Vec<_>, _>>()?;
		for (key, ov) in resolved {
			ov.apply(self.styles.entry(key).or_default());
		}
		Ok(())
	}
}
