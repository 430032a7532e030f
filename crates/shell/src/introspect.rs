//! Autocomplete and call-tip lookups against the kernel.
//!
//! Lookups are answered from [`IntrospectCache`] when a fresh reply for the
//! same query exists, otherwise they wait on a [`RequestHandle`] from the
//! session's correlator. A failed, discarded or timed-out request cancels
//! the popup silently.

use std::time::{Duration, Instant};

use kiln_kernel::{Outcome, Reply, RequestHandle};
use rustc_hash::FxHashMap;
use serde_json::Value as JsonValue;
use tracing::trace;

/// How long a cached reply is reused.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10);

/// Kind of introspection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
	/// Signature of a callable, for call tips.
	Signature,
	/// Attribute names of an object, for autocomplete.
	Attributes,
	/// Value of an expression.
	Eval,
}

impl Query {
	/// Request keyword on the wire.
	pub const fn keyword(self) -> &'static str {
		match self {
			Query::Signature => "SIGNATURE",
			Query::Attributes => "ATTRIBUTES",
			Query::Eval => "EVAL",
		}
	}

	/// Full request text for `subject`.
	pub fn request(self, subject: &str) -> String {
		format!("{} {subject}", self.keyword())
	}
}

/// State of a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
	/// Still waiting for the kernel.
	Pending,
	/// The answer.
	Ready(T),
	/// The popup should be closed without showing anything.
	Cancelled,
}

struct CacheEntry {
	stored_at: Instant,
	value: JsonValue,
}

/// Recent introspection replies keyed by query and subject.
pub struct IntrospectCache {
	ttl: Duration,
	entries: FxHashMap<(Query, String), CacheEntry>,
}

impl Default for IntrospectCache {
	fn default() -> Self {
		Self::new(DEFAULT_CACHE_TTL)
	}
}

impl IntrospectCache {
	/// Creates a cache whose entries expire after `ttl`.
	pub fn new(ttl: Duration) -> Self {
		Self {
			ttl,
			entries: FxHashMap::default(),
		}
	}

	/// Returns a reply stored less than the ttl before `now`.
	pub fn get(&self, query: Query, subject: &str, now: Instant) -> Option<&JsonValue> {
		let entry = self.entries.get(&(query, subject.to_owned()))?;
		(now.saturating_duration_since(entry.stored_at) < self.ttl).then_some(&entry.value)
	}

	/// Stores a reply.
	pub fn insert(&mut self, query: Query, subject: impl Into<String>, value: JsonValue, now: Instant) {
		self.entries.insert(
			(query, subject.into()),
			CacheEntry {
				stored_at: now,
				value,
			},
		);
	}

	/// Drops expired entries.
	pub fn purge(&mut self, now: Instant) {
		let ttl = self.ttl;
		self.entries
			.retain(|_, entry| now.saturating_duration_since(entry.stored_at) < ttl);
	}

	/// Drops everything, e.g. after a kernel restart.
	pub fn clear(&mut self) {
		self.entries.clear();
	}

	/// Number of stored entries, expired ones included.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// True if nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl std::fmt::Debug for IntrospectCache {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("IntrospectCache")
			.field("ttl", &self.ttl)
			.field("entries", &self.entries.len())
			.finish()
	}
}

#[derive(Debug)]
enum Source {
	Ready(JsonValue),
	Waiting(RequestHandle),
	Cancelled,
}

impl Source {
	fn poll(&mut self) -> Lookup<&JsonValue> {
		if let Source::Waiting(handle) = self {
			match handle.try_outcome() {
				None => return Lookup::Pending,
				Some(Outcome::Delivered(Reply::Value(value))) => *self = Source::Ready(value),
				Some(outcome) => {
					trace!(?outcome, "introspection lookup cancelled");
					*self = Source::Cancelled;
				}
			}
		}
		match self {
			Source::Ready(value) => Lookup::Ready(value),
			Source::Cancelled => Lookup::Cancelled,
			Source::Waiting(_) => Lookup::Pending,
		}
	}
}

/// An autocomplete popup waiting for its names.
#[derive(Debug)]
pub struct AutoComplete {
	subject: String,
	needle: String,
	extra: Vec<String>,
	source: Source,
}

impl AutoComplete {
	/// Completion with a reply already at hand.
	pub(crate) fn ready(subject: &str, needle: &str, extra: Vec<String>, value: JsonValue) -> Self {
		Self::with_source(subject, needle, extra, Source::Ready(value))
	}

	/// Completion waiting on the kernel.
	pub(crate) fn waiting(subject: &str, needle: &str, extra: Vec<String>, handle: RequestHandle) -> Self {
		Self::with_source(subject, needle, extra, Source::Waiting(handle))
	}

	fn with_source(subject: &str, needle: &str, extra: Vec<String>, source: Source) -> Self {
		Self {
			subject: subject.to_owned(),
			needle: needle.to_owned(),
			extra,
			source,
		}
	}

	/// Object whose attributes are listed; empty for the global scope.
	pub fn subject(&self) -> &str {
		&self.subject
	}

	/// Partial name typed so far.
	pub fn needle(&self) -> &str {
		&self.needle
	}

	/// Names starting with the needle, sorted case-insensitively.
	pub fn poll(&mut self) -> Lookup<Vec<String>> {
		let value = match self.source.poll() {
			Lookup::Ready(value) => value,
			Lookup::Pending => return Lookup::Pending,
			Lookup::Cancelled => return Lookup::Cancelled,
		};
		let needle = self.needle.to_lowercase();
		let mut names: Vec<String> = reply_names(value)
			.chain(self.extra.iter().cloned())
			.filter(|name| name.to_lowercase().starts_with(&needle))
			.collect();
		names.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
		names.dedup();
		Lookup::Ready(names)
	}
}

fn reply_names(value: &JsonValue) -> Box<dyn Iterator<Item = String> + '_> {
	match value {
		JsonValue::Array(items) => Box::new(items.iter().filter_map(JsonValue::as_str).map(str::to_owned)),
		JsonValue::String(text) => Box::new(
			text.split(',')
				.map(str::trim)
				.filter(|name| !name.is_empty())
				.map(str::to_owned),
		),
		_ => Box::new(std::iter::empty()),
	}
}

/// A call tip waiting for a signature.
#[derive(Debug)]
pub struct CallTip {
	callee: String,
	source: Source,
}

impl CallTip {
	pub(crate) fn ready(callee: &str, value: JsonValue) -> Self {
		Self {
			callee: callee.to_owned(),
			source: Source::Ready(value),
		}
	}

	pub(crate) fn waiting(callee: &str, handle: RequestHandle) -> Self {
		Self {
			callee: callee.to_owned(),
			source: Source::Waiting(handle),
		}
	}

	/// The callable being described.
	pub fn callee(&self) -> &str {
		&self.callee
	}

	/// The signature text. An empty answer is still a valid tip.
	pub fn poll(&mut self) -> Lookup<String> {
		match self.source.poll() {
			Lookup::Ready(JsonValue::String(text)) => Lookup::Ready(text.clone()),
			Lookup::Ready(JsonValue::Array(lines)) => Lookup::Ready(
				lines
					.iter()
					.filter_map(JsonValue::as_str)
					.collect::<Vec<_>>()
					.join("\n"),
			),
			Lookup::Ready(JsonValue::Null) => Lookup::Ready(String::new()),
			Lookup::Ready(other) => Lookup::Ready(other.to_string()),
			Lookup::Pending => Lookup::Pending,
			Lookup::Cancelled => Lookup::Cancelled,
		}
	}
}

fn is_name_char(c: char) -> bool {
	c.is_alphanumeric() || c == '_' || c == '.'
}

fn trailing_name(text: &str) -> &str {
	let start = text
		.char_indices()
		.rev()
		.take_while(|&(_, c)| is_name_char(c))
		.last()
		.map_or(text.len(), |(i, _)| i);
	&text[start..]
}

/// Splits the dotted name before the cursor into the object and the
/// partial attribute: `x = os.pa` gives `("os", "pa")`.
pub fn completion_target(before_cursor: &str) -> (&str, &str) {
	let name = trailing_name(before_cursor);
	match name.rsplit_once('.') {
		Some((subject, needle)) => (subject, needle),
		None => ("", name),
	}
}

/// The callable whose argument list encloses the cursor:
/// `f(a, g(b), ` gives `f`. None outside any call.
pub fn call_tip_target(before_cursor: &str) -> Option<&str> {
	let mut depth = 0usize;
	for (i, c) in before_cursor.char_indices().rev() {
		match c {
			')' => depth += 1,
			'(' if depth > 0 => depth -= 1,
			'(' => {
				let callee = trailing_name(before_cursor[..i].trim_end());
				return (!callee.is_empty() && !callee.starts_with('.')).then_some(callee);
			}
			_ => {}
		}
	}
	None
}
