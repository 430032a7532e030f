use pretty_assertions::assert_eq;

use super::*;
use crate::token::TokenKind::*;

type Text = std::string::String;

fn kinds(spec: &LanguageSpec, line: &str, state: LexState) -> (Vec<(TokenKind, Text)>, LexState) {
	let parse = spec.parse_line(line, state);
	let chars: Vec<char> = line.chars().collect();
	let tokens = parse
		.tokens
		.iter()
		.map(|t| (t.kind, chars[t.start..t.end].iter().collect()))
		.collect();
	(tokens, parse.end_state)
}

fn py(line: &str) -> Vec<(TokenKind, Text)> {
	kinds(&LanguageSpec::python(), line, LexState::Clean).0
}

fn tok(kind: TokenKind, text: &str) -> (TokenKind, Text) {
	(kind, text.to_owned())
}

#[test]
fn function_definition() {
	let (tokens, state) = kinds(&LanguageSpec::python(), "def Foo(x):", LexState::Clean);
	assert_eq!(
		tokens,
		vec![
			tok(Keyword, "def"),
			tok(FunctionName, "Foo"),
			tok(Operator, "("),
			tok(Identifier, "x"),
			tok(Operator, "):"),
		]
	);
	assert_eq!(state, LexState::Clean);
}

#[test]
fn class_definition() {
	assert_eq!(
		py("class Bar(Base):"),
		vec![
			tok(Keyword, "class"),
			tok(ClassName, "Bar"),
			tok(Operator, "("),
			tok(Identifier, "Base"),
			tok(Operator, "):"),
		]
	);
}

#[test]
fn triple_quoted_string_spans_lines() {
	let spec = LanguageSpec::python();
	let (first, s1) = kinds(&spec, "s = \"\"\"start", LexState::Clean);
	assert_eq!(
		first,
		vec![
			tok(Identifier, "s"),
			tok(Operator, "="),
			tok(String, "\"\"\"start"),
			tok(BlockState, ""),
		]
	);
	assert_eq!(s1, LexState::TripleDouble);

	let (second, s2) = kinds(&spec, "more text", s1);
	assert_eq!(second, vec![tok(String, "more text"), tok(BlockState, "")]);
	assert_eq!(s2, LexState::TripleDouble);

	let (third, s3) = kinds(&spec, "end\"\"\" + x", s2);
	assert_eq!(
		third,
		vec![
			tok(String, "end\"\"\""),
			tok(Operator, "+"),
			tok(Identifier, "x"),
		]
	);
	assert_eq!(s3, LexState::Clean);
}

#[test]
fn block_state_marker_carries_state() {
	let parse = LanguageSpec::python().parse_line("'''doc", LexState::Clean);
	let marker = parse.tokens.last().unwrap();
	assert_eq!(marker.kind, BlockState);
	assert_eq!((marker.start, marker.end), (6, 6));
	assert_eq!(marker.state, Some(LexState::TripleSingle));
}

#[test]
fn unterminated_single_line_string() {
	assert_eq!(
		py("x = 'abc"),
		vec![tok(Identifier, "x"), tok(Operator, "="), tok(Unterminated, "'abc")]
	);
	let (_, state) = kinds(&LanguageSpec::python(), "x = 'abc", LexState::Clean);
	assert_eq!(state, LexState::Clean);
}

#[test]
fn backslash_continues_single_quoted_string() {
	let spec = LanguageSpec::python();
	let (first, state) = kinds(&spec, "x = \"abc\\", LexState::Clean);
	assert_eq!(first.last(), Some(&tok(BlockState, "")));
	assert_eq!(state, LexState::ContinuedDouble);
	let (second, state) = kinds(&spec, "def\" + 1", state);
	assert_eq!(
		second,
		vec![tok(String, "def\""), tok(Operator, "+"), tok(Number, "1")]
	);
	assert_eq!(state, LexState::Clean);
}

#[test]
fn escaped_quotes_and_prefixes() {
	assert_eq!(
		py(r#"rb'\'' f"{x}" bar"#),
		vec![tok(String, r"rb'\''"), tok(String, "f\"{x}\""), tok(Identifier, "bar")]
	);
	assert_eq!(py("bu'x'"), vec![tok(Identifier, "bu"), tok(String, "'x'")]);
}

#[test]
fn comments() {
	assert_eq!(py("x  # note"), vec![tok(Identifier, "x"), tok(Comment, "# note")]);
	assert_eq!(py("## Cell one"), vec![tok(CellComment, "## Cell one")]);
	assert_eq!(py("  #%% cell"), vec![tok(CellComment, "#%% cell")]);
	assert_eq!(py("x ## not a cell"), vec![tok(Identifier, "x"), tok(Comment, "## not a cell")]);
	assert_eq!(py("# TODO: fix"), vec![tok(TodoComment, "# TODO: fix")]);
	assert_eq!(py("#fixme"), vec![tok(TodoComment, "#fixme")]);
	assert_eq!(py("'#' # c"), vec![tok(String, "'#'"), tok(Comment, "# c")]);
}

#[test]
fn numbers() {
	assert_eq!(
		py("1 0x1F 0o17 0b1_0 3.25 .5 1e-3 2j 1_000"),
		vec![
			tok(Number, "1"),
			tok(Number, "0x1F"),
			tok(Number, "0o17"),
			tok(Number, "0b1_0"),
			tok(Number, "3.25"),
			tok(Number, ".5"),
			tok(Number, "1e-3"),
			tok(Number, "2j"),
			tok(Number, "1_000"),
		]
	);
	assert_eq!(py("x1"), vec![tok(Identifier, "x1")]);
}

#[test]
fn other_characters() {
	assert_eq!(
		py("a $ b?"),
		vec![
			tok(Identifier, "a"),
			tok(NonIdentifier, "$"),
			tok(Identifier, "b"),
			tok(NonIdentifier, "?"),
		]
	);
}

#[test]
fn python_lookahead_is_single_step() {
	assert_eq!(
		py("def f(g)"),
		vec![
			tok(Keyword, "def"),
			tok(FunctionName, "f"),
			tok(Operator, "("),
			tok(Identifier, "g"),
			tok(Operator, ")"),
		]
	);
}

#[test]
fn cython_tags_name_after_type() {
	let spec = LanguageSpec::cython();
	let (tokens, _) = kinds(&spec, "cdef int foo(x)", LexState::Clean);
	assert_eq!(
		tokens,
		vec![
			tok(Keyword, "cdef"),
			tok(Keyword, "int"),
			tok(FunctionName, "foo"),
			tok(Operator, "("),
			tok(Identifier, "x"),
			tok(Operator, ")"),
		]
	);

	let (tokens, _) = kinds(&spec, "cdef double* scale(y)", LexState::Clean);
	assert_eq!(tokens[2], tok(Operator, "*"));
	assert_eq!(tokens[3], tok(FunctionName, "scale"));
}

#[test]
fn cython_punctuation_resets_lookahead() {
	let (tokens, _) = kinds(&LanguageSpec::cython(), "def f(x):", LexState::Clean);
	assert_eq!(tokens[1], tok(FunctionName, "f"));
	assert_eq!(tokens[3], tok(Identifier, "x"));
}

#[test]
fn chained_keywords_rearm() {
	let (tokens, _) = kinds(&LanguageSpec::cython(), "cpdef class Spam:", LexState::Clean);
	assert_eq!(
		tokens,
		vec![
			tok(Keyword, "cpdef"),
			tok(Keyword, "class"),
			tok(ClassName, "Spam"),
			tok(Operator, ":"),
		]
	);
}

#[test]
fn lookahead_does_not_cross_lines() {
	let spec = LanguageSpec::python();
	let (_, state) = kinds(&spec, "def", LexState::Clean);
	assert_eq!(state, LexState::Clean);
	assert_eq!(kinds(&spec, "name", state).0, vec![tok(Identifier, "name")]);
}

#[test]
fn offsets_are_characters() {
	let parse = LanguageSpec::python().parse_line("é = 'ü'", LexState::Clean);
	let spans: Vec<_> = parse.tokens.iter().map(|t| (t.start, t.end)).collect();
	assert_eq!(spans, vec![(0, 1), (2, 3), (4, 7)]);
}

#[test]
fn empty_line_in_string_keeps_state() {
	let parse = LanguageSpec::python().parse_line("", LexState::TripleSingle);
	assert_eq!(parse.end_state, LexState::TripleSingle);
	assert_eq!(parse.tokens.len(), 1);
	assert_eq!(parse.tokens[0].kind, BlockState);
}

#[test]
fn document_chains_states() {
	let text = ropey::Rope::from("a = '''\nb\n'''\nc");
	let parses = tokenize_document(&LanguageSpec::python(), text.slice(..));
	let states: Vec<_> = parses.iter().map(|p| p.end_state).collect();
	assert_eq!(
		states,
		vec![
			LexState::TripleSingle,
			LexState::TripleSingle,
			LexState::Clean,
			LexState::Clean,
		]
	);
}
