//! Heuristic line tokenizer shared by all language variants.
//!
//! The scanner works on character offsets and never fails: malformed input
//! becomes [`TokenKind::Unterminated`] or [`TokenKind::NonIdentifier`].

use ropey::RopeSlice;

use crate::language::{LanguageSpec, LineParser};
use crate::token::{LexState, LineParse, Token, TokenKind};

const OPERATOR_CHARS: &str = "+-*/%&|^~<>=!@.:,;()[]{}";

/// How a string scan ended.
enum StringEnd {
	/// Closing quote found; offset just past it.
	Closed(usize),
	/// Triple-quoted string still open at end of line.
	OpenTriple,
	/// Single-quoted string continued by a trailing backslash.
	Continued,
	/// Single-quoted string with no closing quote.
	Unterminated,
}

/// Per-line definition-name tracking.
#[derive(Default)]
struct NameTracker {
	kind: Option<TokenKind>,
	remaining: u8,
}

impl NameTracker {
	/// Feeds an identifier, returning the definition kind it gets tagged with.
	fn feed(&mut self, spec: &LanguageSpec, word: &str) -> Option<TokenKind> {
		if let Some((kind, span)) = spec.lookahead().trigger(word) {
			self.kind = Some(kind);
			self.remaining = span;
			return None;
		}
		if self.remaining > 0 {
			self.remaining -= 1;
			return self.kind;
		}
		None
	}

	fn reset(&mut self) {
		self.remaining = 0;
	}
}

struct Scanner<'a> {
	spec: &'a LanguageSpec,
	chars: Vec<char>,
	tokens: Vec<Token>,
	names: NameTracker,
}

/// Tokenizes one line for `spec`.
pub(crate) fn scan_line(spec: &LanguageSpec, line: &str, state: LexState) -> LineParse {
	let mut scanner = Scanner {
		spec,
		chars: line.chars().collect(),
		tokens: Vec::new(),
		names: NameTracker::default(),
	};
	let end_state = scanner.run(state);
	let mut tokens = scanner.tokens;
	if !end_state.is_clean() {
		let len = scanner.chars.len();
		tokens.push(Token {
			kind: TokenKind::BlockState,
			start: len,
			end: len,
			state: Some(end_state),
		});
	}
	LineParse { tokens, end_state }
}

/// Tokenizes a whole document top to bottom, chaining end states.
pub fn tokenize_document(parser: &dyn LineParser, text: RopeSlice<'_>) -> Vec<LineParse> {
	let mut state = LexState::Clean;
	(0..text.len_lines())
		.map(|idx| {
			let parse = parser.parse_line(&kiln_primitives::line_text(text, idx), state);
			state = parse.end_state;
			parse
		})
		.collect()
}

impl Scanner<'_> {
	fn run(&mut self, state: LexState) -> LexState {
		let len = self.chars.len();
		let mut pos = 0;

		if let Some((quote, triple)) = state.open_string() {
			match self.finish_string(0, 0, quote, triple) {
				Some(next) => pos = next,
				None => return LexState::for_string(quote, triple),
			}
		}

		while pos < len {
			let c = self.chars[pos];
			if c.is_whitespace() {
				pos += 1;
			} else if c == '#' {
				let kind = self.comment_kind(pos);
				self.tokens.push(Token::new(kind, pos, len));
				return LexState::Clean;
			} else if let Some((quote_at, quote)) = self.string_start(pos) {
				self.names.reset();
				let triple = self.is_triple(quote_at, quote);
				let body = quote_at + if triple { 3 } else { 1 };
				match self.finish_string(pos, body, quote, triple) {
					Some(next) => pos = next,
					None => return LexState::for_string(quote, triple),
				}
			} else if c.is_ascii_digit()
				|| (c == '.' && self.peek(pos + 1).is_some_and(|n| n.is_ascii_digit()))
			{
				self.names.reset();
				let end = self.scan_number(pos);
				self.tokens.push(Token::new(TokenKind::Number, pos, end));
				pos = end;
			} else if is_ident_start(c) {
				let end = self.scan_while(pos, is_ident_continue);
				let word: String = self.chars[pos..end].iter().collect();
				let named = self.names.feed(self.spec, &word);
				let kind = if self.spec.is_keyword(&word) {
					TokenKind::Keyword
				} else {
					named.unwrap_or(TokenKind::Identifier)
				};
				self.tokens.push(Token::new(kind, pos, end));
				pos = end;
			} else if OPERATOR_CHARS.contains(c) {
				let end = self.scan_while(pos, |ch| OPERATOR_CHARS.contains(ch));
				if self.chars[pos..end].iter().any(|&ch| ch != '.' && ch != '*') {
					self.names.reset();
				}
				self.tokens.push(Token::new(TokenKind::Operator, pos, end));
				pos = end;
			} else {
				self.names.reset();
				self.tokens.push(Token::new(TokenKind::NonIdentifier, pos, pos + 1));
				pos += 1;
			}
		}
		LexState::Clean
	}

	/// Scans a string body from `body` and pushes the token starting at
	/// `start`. Returns the resume offset, or `None` if the string runs past
	/// the end of the line.
	fn finish_string(
		&mut self,
		start: usize,
		body: usize,
		quote: char,
		triple: bool,
	) -> Option<usize> {
		let len = self.chars.len();
		match self.scan_string(body, quote, triple) {
			StringEnd::Closed(end) => {
				self.tokens.push(Token::new(TokenKind::String, start, end));
				Some(end)
			}
			StringEnd::OpenTriple | StringEnd::Continued => {
				if start < len {
					self.tokens.push(Token::new(TokenKind::String, start, len));
				}
				None
			}
			StringEnd::Unterminated => {
				self.tokens.push(Token::new(TokenKind::Unterminated, start, len));
				Some(len)
			}
		}
	}

	fn scan_string(&self, mut i: usize, quote: char, triple: bool) -> StringEnd {
		let len = self.chars.len();
		while i < len {
			let c = self.chars[i];
			if c == '\\' {
				if i + 1 >= len {
					return if triple {
						StringEnd::OpenTriple
					} else {
						StringEnd::Continued
					};
				}
				i += 2;
			} else if c == quote {
				if !triple {
					return StringEnd::Closed(i + 1);
				}
				if self.is_triple(i, quote) {
					return StringEnd::Closed(i + 3);
				}
				i += 1;
			} else {
				i += 1;
			}
		}
		if triple {
			StringEnd::OpenTriple
		} else {
			StringEnd::Unterminated
		}
	}

	/// Detects an optionally prefixed string opener at `pos`.
	fn string_start(&self, pos: usize) -> Option<(usize, char)> {
		let mut i = pos;
		while i - pos < 2
			&& self
				.peek(i)
				.is_some_and(|c| matches!(c.to_ascii_lowercase(), 'r' | 'b' | 'u' | 'f'))
		{
			i += 1;
		}
		for at in (pos..=i).rev() {
			if let Some(quote @ ('\'' | '"')) = self.peek(at) {
				let prefix: String = self.chars[pos..at]
					.iter()
					.map(|c| c.to_ascii_lowercase())
					.collect();
				if valid_prefix(&prefix) {
					return Some((at, quote));
				}
			}
		}
		None
	}

	fn is_triple(&self, at: usize, quote: char) -> bool {
		(0..3).all(|k| self.peek(at + k) == Some(quote))
	}

	fn comment_kind(&self, pos: usize) -> TokenKind {
		let text: String = self.chars[pos..].iter().collect();
		let at_line_start = self.chars[..pos].iter().all(|c| c.is_whitespace());
		if at_line_start && (text.starts_with("##") || text.starts_with("#%%")) {
			return TokenKind::CellComment;
		}
		let body = text.trim_start_matches('#').trim_start().to_ascii_lowercase();
		if body.starts_with("todo") || body.starts_with("fixme") {
			TokenKind::TodoComment
		} else {
			TokenKind::Comment
		}
	}

	fn scan_number(&self, pos: usize) -> usize {
		let radix = match (self.peek(pos), self.peek(pos + 1)) {
			(Some('0'), Some('x' | 'X')) => Some(16),
			(Some('0'), Some('o' | 'O')) => Some(8),
			(Some('0'), Some('b' | 'B')) => Some(2),
			_ => None,
		};
		if let Some(radix) = radix {
			let end = self.scan_while(pos + 2, |c| c.is_digit(radix) || c == '_');
			return self.scan_suffix(end, &['l', 'L']);
		}

		let mut end = self.scan_while(pos, is_decimal);
		if self.peek(end) == Some('.') {
			end = self.scan_while(end + 1, is_decimal);
		}
		if matches!(self.peek(end), Some('e' | 'E')) {
			let mut exp = end + 1;
			if matches!(self.peek(exp), Some('+' | '-')) {
				exp += 1;
			}
			if self.peek(exp).is_some_and(|c| c.is_ascii_digit()) {
				end = self.scan_while(exp, is_decimal);
			}
		}
		self.scan_suffix(end, &['j', 'J', 'l', 'L'])
	}

	fn scan_suffix(&self, end: usize, suffixes: &[char]) -> usize {
		match self.peek(end) {
			Some(c) if suffixes.contains(&c) => end + 1,
			_ => end,
		}
	}

	fn scan_while(&self, mut i: usize, pred: impl Fn(char) -> bool) -> usize {
		while i < self.chars.len() && pred(self.chars[i]) {
			i += 1;
		}
		i
	}

	#[inline]
	fn peek(&self, i: usize) -> Option<char> {
		self.chars.get(i).copied()
	}
}

fn valid_prefix(prefix: &str) -> bool {
	matches!(
		prefix,
		"" | "r" | "b" | "u" | "f" | "rb" | "br" | "fr" | "rf"
	)
}

fn is_ident_start(c: char) -> bool {
	c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
	c == '_' || c.is_alphanumeric()
}

fn is_decimal(c: char) -> bool {
	c.is_ascii_digit() || c == '_'
}

#[cfg(test)]
mod tests;
