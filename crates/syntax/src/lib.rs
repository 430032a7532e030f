//! Lexical highlighting for the kiln editor and shell.
//!
//! Source text is tokenized one line at a time. Each line starts from the
//! [`LexState`] the previous line ended in, which is how multi-line strings
//! survive line boundaries without a full parse. The [`Highlighter`] caches
//! the per-line results and re-tokenizes only lines whose text or start
//! state changed.

/// Highlighting decorator over a text region.
pub mod decorator;
/// Incremental per-line highlighter.
pub mod highlighter;
/// Leading whitespace checks and indent guides.
pub mod indent;
/// Language variants and the parser registry.
pub mod language;
/// The line tokenizer.
pub mod lexer;
/// Style mapping from token kinds to visual attributes.
pub mod style;
/// Token and lexical state types.
pub mod token;

pub use decorator::HighlightedBuffer;
pub use highlighter::{BlockAnnotation, Highlighter, LineHighlight, StyledSpan};
pub use indent::{IndentCheck, IndentPolicy};
pub use language::{LanguageSpec, LineParser, Lookahead, ParserRegistry};
pub use lexer::tokenize_document;
pub use style::{Color, StyleError, StyleKey, StyleOverride, StyleTable, TextStyle, Underline};
pub use token::{LexState, LineParse, Token, TokenKind};
