use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Classification of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenKind {
	/// A name that is neither a keyword nor a definition target.
	Identifier,
	/// A keyword of the active language variant.
	Keyword,
	/// A string literal, or the part of a multi-line string on this line.
	String,
	/// A string literal that is not closed on its line.
	Unterminated,
	/// A line comment.
	Comment,
	/// A cell separator comment (`##` or `#%%`).
	CellComment,
	/// A comment starting with `todo` or `fixme`.
	TodoComment,
	/// A numeric literal.
	Number,
	/// The name introduced by a function definition keyword.
	FunctionName,
	/// The name introduced by a class definition keyword.
	ClassName,
	/// A run of operator or punctuation characters.
	Operator,
	/// Any other character.
	NonIdentifier,
	/// Zero-width marker at the end of a line carrying a non-clean state.
	BlockState,
}

impl TokenKind {
	/// Every kind, in declaration order.
	pub const ALL: [TokenKind; 13] = [
		TokenKind::Identifier,
		TokenKind::Keyword,
		TokenKind::String,
		TokenKind::Unterminated,
		TokenKind::Comment,
		TokenKind::CellComment,
		TokenKind::TodoComment,
		TokenKind::Number,
		TokenKind::FunctionName,
		TokenKind::ClassName,
		TokenKind::Operator,
		TokenKind::NonIdentifier,
		TokenKind::BlockState,
	];

	/// Kebab-case name used in configuration and token dumps.
	pub const fn name(self) -> &'static str {
		match self {
			TokenKind::Identifier => "identifier",
			TokenKind::Keyword => "keyword",
			TokenKind::String => "string",
			TokenKind::Unterminated => "unterminated",
			TokenKind::Comment => "comment",
			TokenKind::CellComment => "cell-comment",
			TokenKind::TodoComment => "todo-comment",
			TokenKind::Number => "number",
			TokenKind::FunctionName => "function-name",
			TokenKind::ClassName => "class-name",
			TokenKind::Operator => "operator",
			TokenKind::NonIdentifier => "non-identifier",
			TokenKind::BlockState => "block-state",
		}
	}

	/// True for the comment family.
	pub fn is_comment(self) -> bool {
		matches!(
			self,
			TokenKind::Comment | TokenKind::CellComment | TokenKind::TodoComment
		)
	}
}

impl fmt::Display for TokenKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for TokenKind {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		TokenKind::ALL
			.into_iter()
			.find(|kind| kind.name() == s)
			.ok_or(())
	}
}

/// Lexical state carried from the end of one line to the start of the next.
///
/// [`LexState::Clean`] means nothing is carried. Every other state names the
/// open construct, so feeding it back reproduces the same tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LexState {
	/// No open construct.
	#[default]
	Clean,
	/// Inside a `'''` string.
	TripleSingle,
	/// Inside a `"""` string.
	TripleDouble,
	/// Inside a `'` string continued with a trailing backslash.
	ContinuedSingle,
	/// Inside a `"` string continued with a trailing backslash.
	ContinuedDouble,
}

impl LexState {
	/// True when nothing is carried.
	#[inline]
	pub fn is_clean(self) -> bool {
		self == LexState::Clean
	}

	/// Small integer form, zero for [`LexState::Clean`].
	pub const fn as_u8(self) -> u8 {
		match self {
			LexState::Clean => 0,
			LexState::TripleSingle => 1,
			LexState::TripleDouble => 2,
			LexState::ContinuedSingle => 3,
			LexState::ContinuedDouble => 4,
		}
	}

	/// Inverse of [`LexState::as_u8`].
	pub const fn from_u8(value: u8) -> Option<Self> {
		Some(match value {
			0 => LexState::Clean,
			1 => LexState::TripleSingle,
			2 => LexState::TripleDouble,
			3 => LexState::ContinuedSingle,
			4 => LexState::ContinuedDouble,
			_ => return None,
		})
	}

	/// Quote character and triple flag of the open string, if any.
	pub(crate) fn open_string(self) -> Option<(char, bool)> {
		match self {
			LexState::Clean => None,
			LexState::TripleSingle => Some(('\'', true)),
			LexState::TripleDouble => Some(('"', true)),
			LexState::ContinuedSingle => Some(('\'', false)),
			LexState::ContinuedDouble => Some(('"', false)),
		}
	}

	pub(crate) fn for_string(quote: char, triple: bool) -> Self {
		match (quote, triple) {
			('\'', true) => LexState::TripleSingle,
			(_, true) => LexState::TripleDouble,
			('\'', false) => LexState::ContinuedSingle,
			(_, false) => LexState::ContinuedDouble,
		}
	}
}

/// A classified span of one line, in character offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
	/// Classification.
	pub kind: TokenKind,
	/// Start offset within the line.
	pub start: usize,
	/// End offset within the line, exclusive.
	pub end: usize,
	/// Carried state, only set on [`TokenKind::BlockState`] markers.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub state: Option<LexState>,
}

impl Token {
	pub(crate) fn new(kind: TokenKind, start: usize, end: usize) -> Self {
		Self {
			kind,
			start,
			end,
			state: None,
		}
	}

	/// Length in characters.
	#[inline]
	pub fn len(&self) -> usize {
		self.end - self.start
	}

	/// True for zero-width tokens.
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.start == self.end
	}
}

/// Tokens of one line and the state the line ends in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LineParse {
	/// Tokens in increasing, non-overlapping order.
	pub tokens: Vec<Token>,
	/// State to feed into the next line.
	pub end_state: LexState,
}
