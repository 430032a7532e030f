//! Command history, most recent first.

/// Entered commands, most recent at index 0. Each command appears once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
	entries: Vec<String>,
	limit: Option<usize>,
}

impl History {
	/// Creates an unbounded history.
	pub fn new() -> Self {
		Self::default()
	}

	/// Caps the history at `limit` entries, dropping the oldest.
	pub fn with_limit(mut self, limit: usize) -> Self {
		self.limit = Some(limit);
		self.truncate();
		self
	}

	/// Records `command`, moving an existing occurrence to the front.
	pub fn add(&mut self, command: &str) {
		if let Some(pos) = self.entries.iter().position(|c| c == command) {
			self.entries.remove(pos);
		}
		self.entries.insert(0, command.to_owned());
		self.truncate();
	}

	/// Returns the `step`-th most recent entry (1-based) starting with
	/// `prefix`.
	pub fn find(&self, prefix: &str, step: usize) -> Option<&str> {
		if step == 0 {
			return None;
		}
		self.entries
			.iter()
			.filter(|c| c.starts_with(prefix))
			.nth(step - 1)
			.map(String::as_str)
	}

	/// Like [`History::find`], but returns `prefix` itself when there are
	/// fewer than `step` matches.
	pub fn search<'a>(&'a self, prefix: &'a str, step: usize) -> &'a str {
		self.find(prefix, step).unwrap_or(prefix)
	}

	/// Entries, most recent first.
	pub fn entries(&self) -> &[String] {
		&self.entries
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// True if nothing was recorded.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Forgets everything.
	pub fn clear(&mut self) {
		self.entries.clear();
	}

	fn truncate(&mut self) {
		if let Some(limit) = self.limit {
			self.entries.truncate(limit);
		}
	}
}

/// Direction of a history step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
	/// Towards older entries.
	Older,
	/// Towards newer entries.
	Newer,
}

/// State of an Up/Down walk through the history.
///
/// The first step captures the partly typed command as the needle; later
/// steps visit entries that start with it. Stepping past the oldest match
/// returns the needle and wraps around on the next step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryNav {
	needle: Option<String>,
	step: usize,
}

impl HistoryNav {
	/// True while a walk is in progress.
	pub fn is_active(&self) -> bool {
		self.needle.is_some()
	}

	/// The captured needle.
	pub fn needle(&self) -> Option<&str> {
		self.needle.as_deref()
	}

	/// Ends the walk.
	pub fn reset(&mut self) {
		self.needle = None;
		self.step = 0;
	}

	/// Takes one step and returns the text to show on the edit line.
	/// `current` is only read when the walk starts.
	pub fn step(&mut self, history: &History, current: &str, direction: NavDirection) -> String {
		let needle = self.needle.get_or_insert_with(|| current.to_owned());
		match direction {
			NavDirection::Older => self.step += 1,
			NavDirection::Newer => self.step = self.step.saturating_sub(1).max(1),
		}
		match history.find(needle, self.step) {
			Some(found) => found.to_owned(),
			None => {
				self.step = 0;
				needle.clone()
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn history(entries: &[&str]) -> History {
		let mut history = History::new();
		for entry in entries.iter().rev() {
			history.add(entry);
		}
		history
	}

	#[test]
	fn duplicates_move_to_front() {
		let mut h = History::new();
		h.add("foo");
		h.add("bar");
		h.add("foo");
		assert_eq!(h.entries(), ["foo", "bar"]);
	}

	#[test]
	fn search_by_prefix() {
		let h = history(&["print(2)", "x = 1", "print(1)"]);
		assert_eq!(h.search("print", 1), "print(2)");
		assert_eq!(h.search("print", 2), "print(1)");
		assert_eq!(h.search("print", 3), "print");
		assert_eq!(h.search("", 2), "x = 1");
		assert_eq!(h.search("zzz", 1), "zzz");
	}

	#[test]
	fn limit_drops_oldest() {
		let mut h = History::new().with_limit(2);
		h.add("a");
		h.add("b");
		h.add("c");
		assert_eq!(h.entries(), ["c", "b"]);
	}

	#[test]
	fn up_twice_reaches_older_entry() {
		let h = history(&["cmd2", "cmd1"]);
		let mut nav = HistoryNav::default();
		assert_eq!(nav.step(&h, "", NavDirection::Older), "cmd2");
		assert_eq!(nav.step(&h, "cmd2", NavDirection::Older), "cmd1");
		assert_eq!(nav.needle(), Some(""));
	}

	#[test]
	fn walk_wraps_through_needle_and_clamps_down() {
		let h = history(&["ab2", "x", "ab1"]);
		let mut nav = HistoryNav::default();
		assert_eq!(nav.step(&h, "ab", NavDirection::Older), "ab2");
		assert_eq!(nav.step(&h, "", NavDirection::Older), "ab1");
		assert_eq!(nav.step(&h, "", NavDirection::Older), "ab");
		assert_eq!(nav.step(&h, "", NavDirection::Older), "ab2");
		assert_eq!(nav.step(&h, "", NavDirection::Newer), "ab2");

		nav.reset();
		assert!(!nav.is_active());
		assert_eq!(nav.step(&h, "x", NavDirection::Newer), "x");
	}
}
