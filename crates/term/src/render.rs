//! ANSI rendering of highlighted source.
//!
//! Tabs are expanded to the indent width and indent guides are drawn in the
//! leading whitespace of lines whose indentation is consistent.

use std::io::{self, Write};
use std::sync::Arc;

use crossterm::queue;
use crossterm::style::{
	Attribute, Color as TermColor, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
	SetUnderlineColor,
};
use kiln_primitives::{Rope, line_text};
use kiln_syntax::indent::leading_whitespace;
use kiln_syntax::{Color, Highlighter, IndentPolicy, LineHighlight, LineParser, StyleKey, StyleTable, TextStyle};

/// Character drawn for an indent guide.
pub const GUIDE: char = '│';

const GUIDE_COLOR: Color = Color::from_hex(0xB0B0B0);

/// How to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
	/// Emit color and attribute escapes.
	pub color: bool,
	/// Indentation policy used for tab width and guides.
	pub policy: IndentPolicy,
}

/// A whitespace diagnostic found while rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
	/// One-based line number.
	pub line: usize,
	/// Which diagnostic.
	pub key: StyleKey,
}

/// Highlights all of `text` and writes it to `out`.
pub fn render_document(
	out: &mut impl Write,
	text: &str,
	parser: Arc<dyn LineParser>,
	styles: &StyleTable,
	opts: RenderOptions,
) -> io::Result<Vec<Diagnostic>> {
	let rope = Rope::from(text);
	let slice = rope.slice(..);
	let mut highlighter = Highlighter::new(parser, opts.policy, slice.len_lines());
	highlighter.rehighlight_all(slice);

	let mut line_count = slice.len_lines();
	if line_count > 1 && text.ends_with('\n') {
		line_count -= 1;
	}

	let mut diagnostics = Vec::new();
	for idx in 0..line_count {
		let Some(highlight) = highlighter.line(idx) else {
			continue;
		};
		let line = line_text(slice, idx);
		render_line(out, &line, highlight, styles, opts)?;
		if let Some(key) = highlight.check.diagnostic() {
			diagnostics.push(Diagnostic { line: idx + 1, key });
		}
	}
	out.flush()?;
	Ok(diagnostics)
}

/// Writes one highlighted line followed by a newline.
pub fn render_line(
	out: &mut impl Write,
	line: &str,
	highlight: &LineHighlight,
	styles: &StyleTable,
	opts: RenderOptions,
) -> io::Result<()> {
	let guide_style = TextStyle {
		fg: Some(GUIDE_COLOR),
		..TextStyle::default()
	};
	let cells = if opts.color {
		cell_styles(line.chars().count(), highlight, styles)
	} else {
		Vec::new()
	};

	let mut current: Option<&TextStyle> = None;
	for cell in layout(line, highlight, opts.policy) {
		if opts.color {
			let style = if cell.guide { &guide_style } else { &cells[cell.source] };
			if current != Some(style) {
				apply_style(out, style)?;
				current = Some(style);
			}
		}
		queue!(out, Print(cell.ch))?;
	}
	if opts.color {
		queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
	}
	queue!(out, Print('\n'))
}

struct Cell {
	ch: char,
	source: usize,
	guide: bool,
}

fn layout(line: &str, highlight: &LineHighlight, policy: IndentPolicy) -> Vec<Cell> {
	let width = policy.width.max(1);
	let guides = policy.guide_columns(highlight.annotation.indentation);
	let leading = leading_whitespace(line).chars().count();

	let mut cells = Vec::with_capacity(line.len());
	let mut column = 0;
	for (source, c) in line.chars().enumerate() {
		let span = if c == '\t' { width - column % width } else { 1 };
		for col in column..column + span {
			let guide = source < leading && guides.contains(&col);
			let ch = match c {
				_ if guide => GUIDE,
				'\t' => ' ',
				c => c,
			};
			cells.push(Cell { ch, source, guide });
		}
		column += span;
	}
	cells
}

fn cell_styles(len: usize, highlight: &LineHighlight, styles: &StyleTable) -> Vec<TextStyle> {
	let mut cells = vec![TextStyle::default(); len];
	for (range, style) in highlight.styled(styles) {
		for cell in cells.iter_mut().take(range.end).skip(range.start) {
			merge(cell, style);
		}
	}
	cells
}

/// Layers `over` onto `base`; the diagnostic overlay only adds an underline.
fn merge(base: &mut TextStyle, over: &TextStyle) {
	if over.fg.is_some() {
		base.fg = over.fg;
	}
	if over.bg.is_some() {
		base.bg = over.bg;
	}
	base.bold |= over.bold;
	base.italic |= over.italic;
	if over.underline.is_some() {
		base.underline.clone_from(&over.underline);
	}
}

fn term_color(color: Color) -> TermColor {
	TermColor::Rgb {
		r: color.r,
		g: color.g,
		b: color.b,
	}
}

fn apply_style(out: &mut impl Write, style: &TextStyle) -> io::Result<()> {
	queue!(out, SetAttribute(Attribute::Reset), ResetColor)?;
	if let Some(fg) = style.fg {
		queue!(out, SetForegroundColor(term_color(fg)))?;
	}
	if let Some(bg) = style.bg {
		queue!(out, SetBackgroundColor(term_color(bg)))?;
	}
	if style.bold {
		queue!(out, SetAttribute(Attribute::Bold))?;
	}
	if style.italic {
		queue!(out, SetAttribute(Attribute::Italic))?;
	}
	if let Some(underline) = &style.underline {
		let attr = if underline.squiggly {
			Attribute::Undercurled
		} else {
			Attribute::Underlined
		};
		queue!(out, SetAttribute(attr))?;
		if let Some(color) = underline.color {
			queue!(out, SetUnderlineColor(term_color(color)))?;
		}
	}
	Ok(())
}
