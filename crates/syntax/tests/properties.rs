use std::sync::Arc;

use kiln_primitives::{TextBuffer, TextRegion};
use kiln_syntax::{HighlightedBuffer, IndentPolicy, LanguageSpec, LexState, LineParser, tokenize_document};
use proptest::prelude::*;

const ALPHABET: &[&str] = &[
	"a", "x1", " ", "\t", "'", "\"", "'''", "\"\"\"", "\\", "#", "## ", "def ", "class ", "cdef ",
	"(", ")", ":", "*", "0x1f", "3.5", "$", "\n", "\n", "é",
];

fn source() -> impl Strategy<Value = String> {
	prop::collection::vec(prop::sample::select(ALPHABET), 0..40).prop_map(|parts| parts.concat())
}

fn line() -> impl Strategy<Value = String> {
	source().prop_map(|s| s.replace('\n', ""))
}

fn any_state() -> impl Strategy<Value = LexState> {
	(0u8..=4).prop_map(|v| LexState::from_u8(v).unwrap_or_default())
}

proptest! {
	#[test]
	fn parse_line_is_deterministic(text in line(), state in any_state()) {
		for parser in [LanguageSpec::python(), LanguageSpec::cython()] {
			let first = parser.parse_line(&text, state);
			let second = parser.parse_line(&text, state);
			prop_assert_eq!(&first, &second);
		}
	}

	#[test]
	fn tokens_are_ordered_and_in_bounds(text in line(), state in any_state()) {
		let parse = LanguageSpec::cython().parse_line(&text, state);
		let len = text.chars().count();
		let mut last_end = 0;
		for (i, token) in parse.tokens.iter().enumerate() {
			prop_assert!(token.start <= token.end && token.end <= len);
			prop_assert!(token.start >= last_end);
			if i > 0 {
				prop_assert!(token.start > parse.tokens[i - 1].start);
			}
			last_end = token.end;
		}
		prop_assert_eq!(
			parse.end_state.is_clean(),
			parse.tokens.last().map_or(true, |t| t.state.is_none())
		);
	}

	#[test]
	fn incremental_matches_one_pass(
		initial in source(),
		edits in prop::collection::vec((any::<prop::sample::Index>(), 0usize..6, source()), 1..6),
	) {
		let parser: Arc<dyn LineParser> = Arc::new(LanguageSpec::python());
		let mut buf = HighlightedBuffer::new(TextBuffer::new(&initial), parser.clone(), IndentPolicy::default())
			.with_edit_budget(2);

		for (at, removed, inserted) in edits {
			let len = buf.len_chars();
			let start = if len == 0 { 0 } else { at.index(len + 1) };
			let end = (start + removed).min(len);
			buf.replace(start..end, &inserted).unwrap();
		}
		buf.pump_all();

		let expected = tokenize_document(parser.as_ref(), buf.text());
		let highlighter = buf.highlighter();
		prop_assert_eq!(highlighter.line_count(), expected.len());
		for (idx, parse) in expected.iter().enumerate() {
			let line = highlighter.line(idx).unwrap();
			prop_assert_eq!(&line.tokens, &parse.tokens, "line {}", idx);
			prop_assert_eq!(line.end_state, parse.end_state);
			prop_assert_eq!(
				line.annotation.indentation,
				IndentPolicy::default().check(&buf.line(idx)).indentation()
			);
		}
	}
}
