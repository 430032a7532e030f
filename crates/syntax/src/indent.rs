use serde::{Deserialize, Serialize};

use crate::style::StyleKey;

/// Document-wide indentation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct IndentPolicy {
	/// Indent with spaces rather than tabs.
	pub use_spaces: bool,
	/// Columns per indent level.
	pub width: usize,
}

impl Default for IndentPolicy {
	fn default() -> Self {
		Self {
			use_spaces: true,
			width: 4,
		}
	}
}

/// Result of checking one line's leading whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentCheck {
	/// Consistent with the policy; holds the whitespace length in characters.
	Ok(usize),
	/// Tabs and spaces mixed.
	Mixed,
	/// Tabs where spaces are configured, or the reverse.
	PolicyMismatch,
}

impl IndentCheck {
	/// Value stored in the line annotation; zero suppresses indent guides.
	pub fn indentation(self) -> usize {
		match self {
			IndentCheck::Ok(n) => n,
			IndentCheck::Mixed | IndentCheck::PolicyMismatch => 0,
		}
	}

	/// Style key of the diagnostic overlay, if any.
	pub fn diagnostic(self) -> Option<StyleKey> {
		match self {
			IndentCheck::Ok(_) => None,
			IndentCheck::Mixed => Some(StyleKey::MixedWhitespace),
			IndentCheck::PolicyMismatch => Some(StyleKey::PolicyMismatch),
		}
	}
}

/// Leading whitespace of `line`. A blank line is all leading whitespace.
pub fn leading_whitespace(line: &str) -> &str {
	let rest = line.trim_start();
	&line[..line.len() - rest.len()]
}

impl IndentPolicy {
	/// Classifies the leading whitespace of `line`.
	pub fn check(&self, line: &str) -> IndentCheck {
		let ws = leading_whitespace(line);
		let tabs = ws.contains('\t');
		let spaces = ws.contains(' ');
		if tabs && spaces {
			IndentCheck::Mixed
		} else if (tabs && self.use_spaces) || (spaces && !self.use_spaces) {
			IndentCheck::PolicyMismatch
		} else {
			IndentCheck::Ok(ws.chars().count())
		}
	}

	/// Columns at which indent guides are drawn for a line annotated with
	/// `indentation`: every indent level strictly between column zero and the
	/// start of the text.
	pub fn guide_columns(&self, indentation: usize) -> Vec<usize> {
		if self.width == 0 || indentation == 0 {
			return Vec::new();
		}
		let text_column = if self.use_spaces {
			indentation
		} else {
			indentation * self.width
		};
		(1..)
			.map(|level| level * self.width)
			.take_while(|&col| col < text_column)
			.collect()
	}
}
