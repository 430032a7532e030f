//! Incremental per-line highlighting.
//!
//! The highlighter keeps one slot per buffer line. Slots are created lazily
//! the first time a line is highlighted, dropped when their line is deleted,
//! and recomputed when the line's text or its predecessor's end state
//! changes. Work happens in [`Highlighter::pump`], bounded by a line budget,
//! so a cascade through a long document is spread over several calls.

use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::Arc;

use kiln_primitives::{LineDelta, line_text};
use ropey::RopeSlice;
use tracing::{debug, trace};

use crate::indent::{IndentCheck, IndentPolicy, leading_whitespace};
use crate::language::LineParser;
use crate::style::{StyleKey, StyleTable, TextStyle};
use crate::token::{LexState, Token, TokenKind};

/// Per-line metadata consumed by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockAnnotation {
	/// Leading whitespace length, or zero when the whitespace violates the
	/// indentation policy.
	pub indentation: usize,
}

/// A span to render with the style of `key`, in line-relative characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
	/// Character range within the line.
	pub range: Range<usize>,
	/// Style table key.
	pub key: StyleKey,
}

/// Cached highlighting of one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineHighlight {
	/// Tokens, including a trailing block-state marker if any.
	pub tokens: Vec<Token>,
	/// State the line ends in.
	pub end_state: LexState,
	/// Whitespace check result.
	pub check: IndentCheck,
	/// Annotation for indent guides.
	pub annotation: BlockAnnotation,
	/// Token spans followed by the whitespace diagnostic overlay, if any.
	pub spans: Vec<StyledSpan>,
}

impl LineHighlight {
	/// Resolves spans against `styles`, skipping keys without a style.
	pub fn styled<'a>(&'a self, styles: &'a StyleTable) -> impl Iterator<Item = (Range<usize>, &'a TextStyle)> + 'a {
		self.spans
			.iter()
			.filter_map(|span| styles.get(span.key).map(|style| (span.range.clone(), style)))
	}
}

/// Incremental highlighter for one buffer.
pub struct Highlighter {
	parser: Arc<dyn LineParser>,
	policy: IndentPolicy,
	slots: Vec<Option<LineHighlight>>,
	dirty: BTreeSet<usize>,
}

impl Highlighter {
	/// Creates a highlighter for a buffer of `line_count` lines, all pending.
	pub fn new(parser: Arc<dyn LineParser>, policy: IndentPolicy, line_count: usize) -> Self {
		Self {
			parser,
			policy,
			slots: vec![None; line_count],
			dirty: (0..line_count).collect(),
		}
	}

	/// Active parser.
	pub fn parser(&self) -> &Arc<dyn LineParser> {
		&self.parser
	}

	/// Active indentation policy.
	pub fn policy(&self) -> IndentPolicy {
		self.policy
	}

	/// Swaps the parser and schedules every line.
	pub fn set_parser(&mut self, parser: Arc<dyn LineParser>) {
		self.parser = parser;
		self.invalidate_all();
	}

	/// Changes the policy and schedules every line.
	pub fn set_policy(&mut self, policy: IndentPolicy) {
		self.policy = policy;
		self.invalidate_all();
	}

	/// Number of tracked lines.
	pub fn line_count(&self) -> usize {
		self.slots.len()
	}

	/// Cached highlighting for line `idx`, if it has been computed.
	pub fn line(&self, idx: usize) -> Option<&LineHighlight> {
		self.slots.get(idx)?.as_ref()
	}

	/// True if line `idx` is awaiting (re)highlighting.
	pub fn is_dirty(&self, idx: usize) -> bool {
		self.dirty.contains(&idx)
	}

	/// Number of lines awaiting highlighting.
	pub fn pending(&self) -> usize {
		self.dirty.len()
	}

	/// Schedules every line.
	pub fn invalidate_all(&mut self) {
		self.dirty = (0..self.slots.len()).collect();
	}

	/// Schedules line `idx`.
	pub fn invalidate(&mut self, idx: usize) {
		if idx < self.slots.len() {
			self.dirty.insert(idx);
		}
	}

	/// Splices the slot table for an edit and schedules the changed lines.
	pub fn on_edit(&mut self, delta: &LineDelta) {
		let first = delta.first_line.min(self.slots.len());
		let removed_end = (first + delta.removed_lines).min(self.slots.len());
		self.slots
			.splice(first..removed_end, std::iter::repeat_n(None, delta.inserted_lines));

		let removed = removed_end - first;
		let shifted: Vec<usize> = self
			.dirty
			.split_off(&first)
			.into_iter()
			.filter(|&idx| idx >= removed_end)
			.map(|idx| idx - removed + delta.inserted_lines)
			.collect();
		self.dirty.extend(shifted);
		self.dirty.extend(first..first + delta.inserted_lines);
		trace!(
			first_line = first,
			removed,
			inserted = delta.inserted_lines,
			"highlighter spliced edit"
		);
	}

	/// Re-highlights up to `budget` pending lines, lowest first. Returns the
	/// number of lines processed.
	pub fn pump(&mut self, text: RopeSlice<'_>, budget: usize) -> usize {
		let mut done = 0;
		while done < budget {
			let Some(idx) = self.dirty.pop_first() else {
				break;
			};
			if idx >= self.slots.len() {
				continue;
			}
			let start_state = self.start_state(idx);
			let fresh = self.compute(&line_text(text, idx), start_state);
			let previous_end = self.slots[idx].as_ref().map(|line| line.end_state);
			if previous_end != Some(fresh.end_state) && idx + 1 < self.slots.len() {
				trace!(line = idx, end_state = ?fresh.end_state, "end state changed, cascading");
				self.dirty.insert(idx + 1);
			}
			self.slots[idx] = Some(fresh);
			done += 1;
		}
		if done > 0 {
			debug!(lines = done, pending = self.dirty.len(), "highlight pass");
		}
		done
	}

	/// Re-highlights every line now.
	pub fn rehighlight_all(&mut self, text: RopeSlice<'_>) {
		self.invalidate_all();
		self.pump(text, usize::MAX);
	}

	fn start_state(&self, idx: usize) -> LexState {
		idx.checked_sub(1)
			.and_then(|prev| self.slots[prev].as_ref())
			.map_or(LexState::Clean, |line| line.end_state)
	}

	/// Highlights one line without touching the cache.
	pub fn compute(&self, line: &str, start_state: LexState) -> LineHighlight {
		let parse = self.parser.parse_line(line, start_state);
		let check = self.policy.check(line);

		let mut spans: Vec<StyledSpan> = parse
			.tokens
			.iter()
			.filter(|t| t.kind != TokenKind::BlockState)
			.map(|t| StyledSpan {
				range: t.start..t.end,
				key: StyleKey::Token(t.kind),
			})
			.collect();
		if let Some(key) = check.diagnostic() {
			let ws = leading_whitespace(line).chars().count();
			spans.push(StyledSpan { range: 0..ws, key });
		}

		LineHighlight {
			tokens: parse.tokens,
			end_state: parse.end_state,
			check,
			annotation: BlockAnnotation {
				indentation: check.indentation(),
			},
			spans,
		}
	}
}

impl std::fmt::Debug for Highlighter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Highlighter")
			.field("parser", &self.parser.name())
			.field("policy", &self.policy)
			.field("lines", &self.slots.len())
			.field("pending", &self.dirty.len())
			.finish()
	}
}
