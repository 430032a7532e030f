//! Pairs introspection requests with their replies.
//!
//! At most one request is on the wire at a time; later posts queue behind
//! it. Each post returns a [`RequestHandle`] that is resolved exactly once,
//! by a matching reply, a timeout, cancellation or connection loss.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// Reply value the kernel sends when a request cannot be answered.
pub const ERROR_SENTINEL: &str = "<error>";

/// Default time a request may stay in flight.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Identifies one request on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

/// Identifies the view (editor, shell) that posted a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequesterId(pub u64);

/// A reply from the kernel.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
	/// A valid answer, possibly empty.
	Value(JsonValue),
	/// The kernel could not resolve the request.
	Failed,
}

impl From<JsonValue> for Reply {
	fn from(value: JsonValue) -> Self {
		if value.as_str() == Some(ERROR_SENTINEL) {
			Reply::Failed
		} else {
			Reply::Value(value)
		}
	}
}

/// How a request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
	/// The reply arrived while the requester was still active.
	Delivered(Reply),
	/// Cancelled, or the requester was no longer active when the reply came.
	Discarded,
	/// No reply within the timeout.
	TimedOut,
	/// The connection went away.
	Closed,
}

/// Completion handle for one request.
#[derive(Debug)]
pub struct RequestHandle {
	id: RequestId,
	requester: RequesterId,
	rx: oneshot::Receiver<Outcome>,
}

impl RequestHandle {
	/// Wire id.
	pub fn id(&self) -> RequestId {
		self.id
	}

	/// Who posted the request.
	pub fn requester(&self) -> RequesterId {
		self.requester
	}

	/// Returns the outcome if the request has been resolved.
	pub fn try_outcome(&mut self) -> Option<Outcome> {
		match self.rx.try_recv() {
			Ok(outcome) => Some(outcome),
			Err(oneshot::error::TryRecvError::Empty) => None,
			Err(oneshot::error::TryRecvError::Closed) => Some(Outcome::Closed),
		}
	}

	/// Waits for the outcome.
	pub async fn outcome(self) -> Outcome {
		self.rx.await.unwrap_or(Outcome::Closed)
	}
}

struct Pending {
	id: RequestId,
	requester: RequesterId,
	text: String,
	tx: oneshot::Sender<Outcome>,
	stale: bool,
}

impl Pending {
	fn finish(self, outcome: Outcome) {
		trace!(id = ?self.id, ?outcome, "request finished");
		let _ = self.tx.send(outcome);
	}
}

struct InFlight {
	pending: Pending,
	sent_at: Instant,
}

/// FIFO request queue with a single in-flight slot.
pub struct Correlator {
	queue: VecDeque<Pending>,
	in_flight: Option<InFlight>,
	/// Queued requests dropped without reaching the wire.
	dropped: Vec<RequestId>,
	next_id: u64,
	timeout: Duration,
}

impl Default for Correlator {
	fn default() -> Self {
		Self::new(DEFAULT_TIMEOUT)
	}
}

impl Correlator {
	/// Creates a correlator whose requests time out after `timeout`.
	pub fn new(timeout: Duration) -> Self {
		Self {
			queue: VecDeque::new(),
			in_flight: None,
			dropped: Vec::new(),
			next_id: 0,
			timeout,
		}
	}

	/// Queues a request.
	pub fn post(&mut self, text: impl Into<String>, requester: RequesterId) -> RequestHandle {
		let id = RequestId(self.next_id);
		self.next_id += 1;
		let (tx, rx) = oneshot::channel();
		let text = text.into();
		debug!(?id, request = %text, "queued introspection request");
		self.queue.push_back(Pending {
			id,
			requester,
			text,
			tx,
			stale: false,
		});
		RequestHandle { id, requester, rx }
	}

	/// Takes the next request to write, if none is in flight. The request
	/// counts as posted from `now`.
	pub fn poll_outbound(&mut self, now: Instant) -> Option<(RequestId, String)> {
		if self.in_flight.is_some() {
			return None;
		}
		while let Some(pending) = self.queue.pop_front() {
			if pending.stale {
				self.dropped.push(pending.id);
				pending.finish(Outcome::Discarded);
				continue;
			}
			let out = (pending.id, pending.text.clone());
			self.in_flight = Some(InFlight { pending, sent_at: now });
			return Some(out);
		}
		None
	}

	/// Resolves the in-flight request with `response`.
	///
	/// Replies that do not match the in-flight id are dropped. If the
	/// requester is no longer active the request resolves as
	/// [`Outcome::Discarded`]. Returns true if a request was resolved.
	pub fn resolve(
		&mut self,
		id: RequestId,
		response: JsonValue,
		is_active: impl Fn(RequesterId) -> bool,
	) -> bool {
		if self.in_flight.as_ref().map(|f| f.pending.id) != Some(id) {
			debug!(?id, "dropping reply without a matching request");
			return false;
		}
		let Some(InFlight { pending, .. }) = self.in_flight.take() else {
			return false;
		};
		let outcome = if pending.stale || !is_active(pending.requester) {
			Outcome::Discarded
		} else {
			Outcome::Delivered(Reply::from(response))
		};
		pending.finish(outcome);
		true
	}

	/// Marks a request stale. Queued requests resolve immediately; an
	/// in-flight one keeps its slot until its reply arrives.
	pub fn cancel(&mut self, id: RequestId) -> bool {
		if let Some(pos) = self.queue.iter().position(|p| p.id == id) {
			if let Some(pending) = self.queue.remove(pos) {
				self.dropped.push(pending.id);
				pending.finish(Outcome::Discarded);
			}
			return true;
		}
		match &mut self.in_flight {
			Some(flight) if flight.pending.id == id => {
				flight.pending.stale = true;
				true
			}
			_ => false,
		}
	}

	/// Marks every request of `requester` stale.
	pub fn cancel_requester(&mut self, requester: RequesterId) {
		for pending in self.queue.iter_mut().filter(|p| p.requester == requester) {
			pending.stale = true;
		}
		if let Some(flight) = &mut self.in_flight
			&& flight.pending.requester == requester
		{
			flight.pending.stale = true;
		}
	}

	/// Times out the in-flight request if it was posted more than the
	/// timeout before `now`.
	pub fn expire(&mut self, now: Instant) -> Option<RequestId> {
		let expired = self
			.in_flight
			.as_ref()
			.is_some_and(|f| now.saturating_duration_since(f.sent_at) >= self.timeout);
		if !expired {
			return None;
		}
		let flight = self.in_flight.take()?;
		let id = flight.pending.id;
		debug!(?id, "introspection request timed out");
		flight.pending.finish(Outcome::TimedOut);
		Some(id)
	}

	/// Ids of queued requests that were discarded before being sent, since
	/// the last call. Such requests never get a reply or a timeout.
	pub fn take_dropped(&mut self) -> Vec<RequestId> {
		std::mem::take(&mut self.dropped)
	}

	/// Resolves everything as [`Outcome::Closed`].
	pub fn fail_all(&mut self) {
		self.dropped.clear();
		if let Some(flight) = self.in_flight.take() {
			flight.pending.finish(Outcome::Closed);
		}
		for pending in self.queue.drain(..) {
			pending.finish(Outcome::Closed);
		}
	}

	/// Id of the request on the wire, if any.
	pub fn in_flight(&self) -> Option<RequestId> {
		self.in_flight.as_ref().map(|f| f.pending.id)
	}

	/// Number of requests not yet resolved.
	pub fn pending(&self) -> usize {
		self.queue.len() + usize::from(self.in_flight.is_some())
	}
}

impl std::fmt::Debug for Correlator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Correlator")
			.field("queued", &self.queue.len())
			.field("in_flight", &self.in_flight())
			.field("timeout", &self.timeout)
			.finish()
	}
}

#[cfg(test)]
mod tests;
