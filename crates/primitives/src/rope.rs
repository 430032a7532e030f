//! Rope helpers.

use ropey::RopeSlice;

/// Returns the text of line `idx` without its line terminator.
///
/// Out-of-range lines yield an empty string.
pub fn line_text(text: RopeSlice, idx: usize) -> String {
	if idx >= text.len_lines() {
		return String::new();
	}
	let mut line = String::from(text.line(idx));
	while line.ends_with(['\n', '\r']) {
		line.pop();
	}
	line
}

#[cfg(test)]
mod tests {
	use ropey::Rope;

	use super::*;

	#[test]
	fn line_text_strips_terminators() {
		let text = Rope::from("one\r\ntwo\nthree");
		assert_eq!(line_text(text.slice(..), 0), "one");
		assert_eq!(line_text(text.slice(..), 1), "two");
		assert_eq!(line_text(text.slice(..), 2), "three");
		assert_eq!(line_text(text.slice(..), 9), "");
	}
}
