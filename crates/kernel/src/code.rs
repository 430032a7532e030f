//! Large code blocks (running a file, selection or cell).
//!
//! A block is compiled by the kernel under the filename `fname+k`, where `k`
//! is the line offset of the block in its file. Tracebacks therefore report
//! `File "fname+k", line n`, which [`correct_line_offsets`] rewrites to the
//! true location before the text reaches the user.

use std::borrow::Cow;
use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

static FILE_LINE: LazyLock<Option<Regex>> =
	LazyLock::new(|| Regex::new(r#"File "([^"]*?)\+(\d+)", line (\d+)"#).ok());

/// Where a code block came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeOrigin {
	/// The whole file.
	WholeFile,
	/// A run of lines starting at zero-based line `first`.
	Lines {
		/// Zero-based line offset of the first line.
		first: u32,
	},
	/// A named cell starting at zero-based line `first`.
	Cell {
		/// Cell title.
		name: String,
		/// Zero-based line offset of the first line.
		first: u32,
	},
}

/// Payload of a `code` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
	/// Source text, already preprocessed.
	pub source: String,
	/// Originating filename.
	pub fname: String,
	/// Zero-based line offset of the source within the file.
	pub lineno: u32,
	/// Cell title, when running a cell.
	#[serde(default, rename = "cellName", skip_serializing_if = "Option::is_none")]
	pub cell_name: Option<String>,
	#[serde(skip)]
	line_count: usize,
	#[serde(skip)]
	whole_file: bool,
}

impl CodeBlock {
	/// Preprocesses `text` for sending and records where it came from.
	pub fn prepare(text: &str, fname: &str, origin: CodeOrigin) -> Self {
		let text = text.replace('\t', "    ");
		let line_count = text.lines().count().max(1);
		let (lineno, cell_name, whole_file) = match origin {
			CodeOrigin::WholeFile => (0, None, true),
			CodeOrigin::Lines { first } => (first, None, false),
			CodeOrigin::Cell { name, first } => (first, Some(name), false),
		};
		Self {
			source: prepare_source(&text),
			fname: fname.to_owned(),
			lineno,
			cell_name,
			line_count,
			whole_file,
		}
	}

	/// The notice written to the shell before the block runs.
	pub fn notice(&self) -> String {
		let name = display_name(&self.fname);
		let first = self.lineno as usize + 1;
		let last = self.lineno as usize + self.line_count;
		if self.whole_file {
			format!("[executing \"{name}\"]\n")
		} else if let Some(cell) = &self.cell_name {
			format!("[executing cell \"{cell}\" (line {first} of \"{name}\")]\n")
		} else if first == last {
			format!("[executing line {first} of \"{name}\"]\n")
		} else {
			format!("[executing lines {first} to {last} of \"{name}\"]\n")
		}
	}

	/// Filename the kernel compiles the block under.
	pub fn tagged_filename(&self) -> String {
		tag_filename(&self.fname, self.lineno)
	}
}

fn display_name(fname: &str) -> &str {
	if fname.starts_with('<') {
		return fname;
	}
	Path::new(fname)
		.file_name()
		.and_then(|n| n.to_str())
		.unwrap_or(fname)
}

/// Normalizes a block before sending.
///
/// Tabs become four spaces, trailing blank or comment-only lines are
/// dropped, and the smallest indentation of the code lines is removed.
pub fn prepare_source(text: &str) -> String {
	let text = text.replace('\t', "    ");
	let lines: Vec<&str> = text.lines().collect();
	if lines.is_empty() {
		return " ".to_owned();
	}

	let mut last_code = 0;
	let mut min_indent = usize::MAX;
	for (idx, line) in lines.iter().enumerate() {
		let code = line.split('#').next().unwrap_or_default();
		if code.chars().all(|c| c == ' ') {
			continue;
		}
		last_code = idx;
		min_indent = min_indent.min(line.len() - line.trim_start_matches(' ').len());
	}
	if min_indent == usize::MAX {
		min_indent = 0;
	}

	lines[..=last_code]
		.iter()
		.map(|line| {
			let indent = line.len() - line.trim_start_matches(' ').len();
			if indent >= min_indent {
				&line[min_indent..]
			} else {
				line.trim_start_matches(' ')
			}
		})
		.collect::<Vec<_>>()
		.join("\n")
}

/// Filename tagged with a line offset, e.g. `foo.py+7`.
pub fn tag_filename(fname: &str, lineno: u32) -> String {
	if lineno == 0 {
		fname.to_owned()
	} else {
		format!("{fname}+{lineno}")
	}
}

/// Splits a tagged filename and adds its offset: `("foo.py+7", 22)` gives
/// `("foo.py", 29)`. Untagged names pass through.
pub fn correct_filename_and_lineno(fname: &str, lineno: u64) -> (String, u64) {
	if let Some(j) = fname.find('+').filter(|&j| j > 0)
		&& let Ok(offset) = fname[j + 1..].parse::<u64>()
	{
		return (fname[..j].to_owned(), lineno + offset);
	}
	(fname.to_owned(), lineno)
}

/// Rewrites every `File "fname+k", line n` in `text` to `File "fname", line n+k`.
pub fn correct_line_offsets(text: &str) -> Cow<'_, str> {
	let Some(re) = FILE_LINE.as_ref() else {
		return Cow::Borrowed(text);
	};
	re.replace_all(text, |caps: &Captures<'_>| {
		match (caps[2].parse::<u64>(), caps[3].parse::<u64>()) {
			(Ok(offset), Ok(line)) => format!("File \"{}\", line {}", &caps[1], line + offset),
			_ => caps[0].to_owned(),
		}
	})
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn source_is_dedented_and_trimmed() {
		let text = "    if x:\n\ty()\n    # trailing\n\n";
		assert_eq!(prepare_source(text), "if x:\ny()");
		assert_eq!(prepare_source("  a\n    b\n  # c\n  d\n"), "a\n  b\n# c\nd");
		assert_eq!(prepare_source(""), " ");
	}

	#[test]
	fn notices() {
		let file = CodeBlock::prepare("a\nb\n", "/tmp/proj/main.py", CodeOrigin::WholeFile);
		assert_eq!(file.notice(), "[executing \"main.py\"]\n");
		assert_eq!(file.lineno, 0);

		let line = CodeBlock::prepare("a", "main.py", CodeOrigin::Lines { first: 4 });
		assert_eq!(line.notice(), "[executing line 5 of \"main.py\"]\n");

		let lines = CodeBlock::prepare("a\nb\nc", "<tmp 1>", CodeOrigin::Lines { first: 9 });
		assert_eq!(lines.notice(), "[executing lines 10 to 12 of \"<tmp 1>\"]\n");

		let cell = CodeBlock::prepare(
			"a\nb",
			"dir/nb.py",
			CodeOrigin::Cell {
				name: "Setup".into(),
				first: 2,
			},
		);
		assert_eq!(cell.notice(), "[executing cell \"Setup\" (line 3 of \"nb.py\")]\n");
		assert_eq!(cell.tagged_filename(), "dir/nb.py+2");
	}

	#[test]
	fn wire_payload() {
		let cell = CodeBlock::prepare(
			"x",
			"a.py",
			CodeOrigin::Cell {
				name: "c".into(),
				first: 1,
			},
		);
		let json = serde_json::to_value(&cell).unwrap();
		assert_eq!(
			json,
			serde_json::json!({"source": "x", "fname": "a.py", "lineno": 1, "cellName": "c"})
		);
		let plain = serde_json::to_value(CodeBlock::prepare("x", "a.py", CodeOrigin::Lines { first: 0 })).unwrap();
		assert!(plain.get("cellName").is_none());
	}

	#[test]
	fn filename_offsets() {
		assert_eq!(correct_filename_and_lineno("foo.py+7", 22), ("foo.py".into(), 29));
		assert_eq!(correct_filename_and_lineno("foo.py", 22), ("foo.py".into(), 22));
		assert_eq!(correct_filename_and_lineno("+7", 1), ("+7".into(), 1));
		assert_eq!(correct_filename_and_lineno("a+b.py", 3), ("a+b.py".into(), 3));
		assert_eq!(tag_filename("foo.py", 0), "foo.py");
		assert_eq!(tag_filename("foo.py", 7), "foo.py+7");
	}

	#[test]
	fn traceback_lines_are_corrected() {
		let tb = "Traceback (most recent call last):\n  File \"/src/m.py+10\", line 3, in <module>\n  File \"other.py\", line 8, in f\n";
		assert_eq!(
			correct_line_offsets(tb),
			"Traceback (most recent call last):\n  File \"/src/m.py\", line 13, in <module>\n  File \"other.py\", line 8, in f\n"
		);
		assert!(matches!(correct_line_offsets("no frames"), Cow::Borrowed(_)));
	}
}
