use std::path::Path;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::lexer;
use crate::token::{LexState, LineParse, TokenKind};

/// Python 3 keywords.
pub const PYTHON_KEYWORDS: &[&str] = &[
	"False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
	"continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
	"if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
	"try", "while", "with", "yield",
];

/// Keywords Cython adds on top of Python.
pub const CYTHON_EXTRA_KEYWORDS: &[&str] = &[
	"cdef", "cpdef", "ctypedef", "cimport", "float", "double", "int", "long",
];

/// Tokenizes one line given the state the previous line ended in.
///
/// Implementations must be pure: the same line and start state always give
/// the same result, so lines can be re-tokenized in any order.
pub trait LineParser: Send + Sync {
	/// Language name, e.g. `python`.
	fn name(&self) -> &str;

	/// File extensions handled, without the leading dot.
	fn extensions(&self) -> &[String];

	/// Tokenizes `line` (without terminator) starting in `state`.
	fn parse_line(&self, line: &str, state: LexState) -> LineParse;
}

/// Which identifiers after a definition keyword are names being defined.
///
/// A trigger keyword arms a counter; each following identifier (keywords
/// included) consumes one step and is tagged while the counter is positive.
#[derive(Debug, Clone, Default)]
pub struct Lookahead {
	triggers: FxHashMap<String, (TokenKind, u8)>,
}

impl Lookahead {
	/// Arms `span` identifiers of `kind` after `keyword`.
	pub fn arm(mut self, keyword: &str, kind: TokenKind, span: u8) -> Self {
		self.triggers.insert(keyword.to_owned(), (kind, span));
		self
	}

	pub(crate) fn trigger(&self, word: &str) -> Option<(TokenKind, u8)> {
		self.triggers.get(word).copied()
	}
}

/// A language variant: a keyword set plus a lookahead policy over the
/// shared tokenizer.
#[derive(Debug, Clone)]
pub struct LanguageSpec {
	name: String,
	extensions: Vec<String>,
	keywords: FxHashSet<String>,
	lookahead: Lookahead,
}

impl LanguageSpec {
	/// Creates a variant with no keywords and no lookahead.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			extensions: Vec::new(),
			keywords: FxHashSet::default(),
			lookahead: Lookahead::default(),
		}
	}

	/// Adds handled file extensions.
	pub fn with_extensions(mut self, exts: &[&str]) -> Self {
		self.extensions.extend(exts.iter().map(|e| e.to_string()));
		self
	}

	/// Adds keywords.
	pub fn with_keywords(mut self, words: &[&str]) -> Self {
		self.keywords.extend(words.iter().map(|w| w.to_string()));
		self
	}

	/// Replaces the lookahead policy.
	pub fn with_lookahead(mut self, lookahead: Lookahead) -> Self {
		self.lookahead = lookahead;
		self
	}

	/// Python 3.
	pub fn python() -> Self {
		Self::new("python")
			.with_extensions(&["py", "pyw"])
			.with_keywords(PYTHON_KEYWORDS)
			.with_lookahead(
				Lookahead::default()
					.arm("def", TokenKind::FunctionName, 1)
					.arm("class", TokenKind::ClassName, 1),
			)
	}

	/// Cython: Python keywords plus C declarations, with two-step lookahead
	/// after function keywords so `cdef int foo` tags `foo`.
	pub fn cython() -> Self {
		Self::new("cython")
			.with_extensions(&["pyx", "pxd", "pxi"])
			.with_keywords(PYTHON_KEYWORDS)
			.with_keywords(CYTHON_EXTRA_KEYWORDS)
			.with_lookahead(
				Lookahead::default()
					.arm("def", TokenKind::FunctionName, 2)
					.arm("cdef", TokenKind::FunctionName, 2)
					.arm("cpdef", TokenKind::FunctionName, 2)
					.arm("class", TokenKind::ClassName, 1),
			)
	}

	/// True if `word` is a keyword of this variant.
	pub fn is_keyword(&self, word: &str) -> bool {
		self.keywords.contains(word)
	}

	/// The lookahead policy.
	pub fn lookahead(&self) -> &Lookahead {
		&self.lookahead
	}
}

impl LineParser for LanguageSpec {
	fn name(&self) -> &str {
		&self.name
	}

	fn extensions(&self) -> &[String] {
		&self.extensions
	}

	fn parse_line(&self, line: &str, state: LexState) -> LineParse {
		lexer::scan_line(self, line, state)
	}
}

/// Selects a [`LineParser`] by language name or file extension.
#[derive(Clone, Default)]
pub struct ParserRegistry {
	parsers: Vec<Arc<dyn LineParser>>,
}

impl ParserRegistry {
	/// An empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// A registry holding the Python and Cython variants.
	pub fn with_builtins() -> Self {
		let mut registry = Self::new();
		registry.register(Arc::new(LanguageSpec::python()));
		registry.register(Arc::new(LanguageSpec::cython()));
		registry
	}

	/// Adds a parser, replacing any with the same name.
	pub fn register(&mut self, parser: Arc<dyn LineParser>) {
		self.parsers.retain(|p| p.name() != parser.name());
		self.parsers.push(parser);
	}

	/// Looks a parser up by name, ignoring case.
	pub fn get(&self, name: &str) -> Option<Arc<dyn LineParser>> {
		self.parsers
			.iter()
			.find(|p| p.name().eq_ignore_ascii_case(name))
			.cloned()
	}

	/// Looks a parser up by the extension of `path`.
	pub fn for_path(&self, path: &Path) -> Option<Arc<dyn LineParser>> {
		let ext = path.extension()?.to_str()?;
		self.parsers
			.iter()
			.find(|p| p.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext)))
			.cloned()
	}

	/// Names of the registered parsers.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.parsers.iter().map(|p| p.name())
	}
}

impl std::fmt::Debug for ParserRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_list().entries(self.names()).finish()
	}
}
