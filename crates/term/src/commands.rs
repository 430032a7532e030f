//! One-shot file commands.

use std::io::{BufWriter, IsTerminal, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use kiln_primitives::Rope;
use kiln_syntax::{LanguageSpec, LineParse, LineParser, ParserRegistry, StyleKey, StyleTable, tokenize_document};
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::render::{self, RenderOptions};

/// Picks the parser from an explicit language name, then the file
/// extension, falling back to Python.
pub fn select_parser(file: &Path, language: Option<&str>) -> anyhow::Result<Arc<dyn LineParser>> {
	let registry = ParserRegistry::with_builtins();
	if let Some(name) = language {
		return match registry.get(name) {
			Some(parser) => Ok(parser),
			None => {
				let known: Vec<_> = registry.names().collect();
				bail!("unknown language {name:?} (known: {})", known.join(", "))
			}
		};
	}
	Ok(registry
		.for_path(file)
		.unwrap_or_else(|| Arc::new(LanguageSpec::python())))
}

fn read_source(file: &Path) -> anyhow::Result<String> {
	std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))
}

/// `kiln highlight`.
pub fn highlight(
	config: &Config,
	file: &Path,
	language: Option<&str>,
	plain: bool,
	diagnostics: bool,
) -> anyhow::Result<()> {
	let parser = select_parser(file, language)?;
	let text = read_source(file)?;
	let styles = config.style_table()?;
	let stdout = std::io::stdout();
	let opts = RenderOptions {
		color: !plain && stdout.is_terminal(),
		policy: config.indent,
	};
	debug!(file = %file.display(), parser = parser.name(), color = opts.color, "highlighting");

	let mut out = BufWriter::new(stdout.lock());
	let found = render::render_document(&mut out, &text, parser, &styles, opts)?;
	drop(out);

	if diagnostics {
		let mut err = std::io::stderr().lock();
		for diagnostic in &found {
			writeln!(
				err,
				"{}:{}: {}",
				file.display(),
				diagnostic.line,
				tooltip(&styles, diagnostic.key)
			)?;
		}
	}
	Ok(())
}

fn tooltip(styles: &StyleTable, key: StyleKey) -> &str {
	styles
		.get(key)
		.and_then(|style| style.underline.as_ref())
		.and_then(|underline| underline.tooltip.as_deref())
		.unwrap_or(key.name())
}

#[derive(Serialize)]
struct TokenLine<'a> {
	line: usize,
	#[serde(flatten)]
	parse: &'a LineParse,
}

/// `kiln tokens`: one JSON object per line.
pub fn tokens(file: &Path, language: Option<&str>) -> anyhow::Result<()> {
	let parser = select_parser(file, language)?;
	let text = read_source(file)?;
	let mut out = BufWriter::new(std::io::stdout().lock());
	write_tokens(&mut out, &*parser, &text)?;
	out.flush()?;
	Ok(())
}

fn write_tokens(out: &mut impl Write, parser: &dyn LineParser, text: &str) -> anyhow::Result<()> {
	let rope = Rope::from(text);
	for (idx, parse) in tokenize_document(parser, rope.slice(..)).iter().enumerate() {
		serde_json::to_writer(&mut *out, &TokenLine { line: idx + 1, parse })?;
		writeln!(out)?;
	}
	Ok(())
}
