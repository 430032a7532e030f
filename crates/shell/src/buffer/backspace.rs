/// Applies the backspace characters in `text` to the text itself.
///
/// Returns the folded text and the number of backspaces that had nothing
/// left in `text` to erase; those apply to the text already written before
/// the insertion point.
pub fn fold_backspaces(text: &str) -> (String, usize) {
	if !text.contains('\u{8}') {
		return (text.to_owned(), 0);
	}
	let mut folded = String::with_capacity(text.len());
	let mut unmatched = 0;
	for c in text.chars() {
		if c != '\u{8}' {
			folded.push(c);
		} else if folded.pop().is_none() {
			unmatched += 1;
		}
	}
	(folded, unmatched)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn folds_within_the_batch() {
		assert_eq!(fold_backspaces("abc\u{8}def"), ("abdef".to_owned(), 0));
		assert_eq!(fold_backspaces("ab\u{8}\u{8}c"), ("c".to_owned(), 0));
		assert_eq!(fold_backspaces("plain"), ("plain".to_owned(), 0));
	}

	#[test]
	fn leftover_backspaces_are_counted() {
		assert_eq!(fold_backspaces("\u{8}\u{8}xy"), ("xy".to_owned(), 2));
		assert_eq!(fold_backspaces("a\u{8}\u{8}X"), ("X".to_owned(), 1));
		assert_eq!(fold_backspaces("\u{8}"), (String::new(), 1));
	}
}
