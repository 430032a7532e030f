use std::time::{Duration, Instant};

use serde_json::json;

use super::*;

const EDITOR: RequesterId = RequesterId(1);
const SHELL: RequesterId = RequesterId(2);

fn active(_: RequesterId) -> bool {
	true
}

#[test]
fn one_request_in_flight_at_a_time() {
	let mut corr = Correlator::default();
	let now = Instant::now();
	let mut first = corr.post("SIGNATURE os.path.join", EDITOR);
	let mut second = corr.post("ATTRIBUTES os", SHELL);
	assert_eq!(corr.pending(), 2);

	let (id, text) = corr.poll_outbound(now).unwrap();
	assert_eq!(id, first.id());
	assert_eq!(text, "SIGNATURE os.path.join");
	assert_eq!(corr.poll_outbound(now), None);

	assert!(corr.resolve(id, json!(["join(a, *p)"]), active));
	assert_eq!(
		first.try_outcome(),
		Some(Outcome::Delivered(Reply::Value(json!(["join(a, *p)"]))))
	);
	assert_eq!(second.try_outcome(), None);

	let (id, _) = corr.poll_outbound(now).unwrap();
	assert_eq!(id, second.id());
	assert_eq!(corr.in_flight(), Some(id));
}

#[test]
fn error_sentinel_is_a_failed_reply() {
	let mut corr = Correlator::default();
	let mut handle = corr.post("EVAL nope", EDITOR);
	let (id, _) = corr.poll_outbound(Instant::now()).unwrap();
	corr.resolve(id, json!("<error>"), active);
	assert_eq!(handle.try_outcome(), Some(Outcome::Delivered(Reply::Failed)));
}

#[test]
fn empty_reply_is_still_a_value() {
	let mut corr = Correlator::default();
	let mut handle = corr.post("ATTRIBUTES x", EDITOR);
	let (id, _) = corr.poll_outbound(Instant::now()).unwrap();
	corr.resolve(id, json!([]), active);
	assert_eq!(handle.try_outcome(), Some(Outcome::Delivered(Reply::Value(json!([])))));
}

#[test]
fn mismatched_reply_is_ignored() {
	let mut corr = Correlator::default();
	let mut handle = corr.post("EVAL 1", EDITOR);
	let (id, _) = corr.poll_outbound(Instant::now()).unwrap();
	assert!(!corr.resolve(RequestId(id.0 + 40), json!(1), active));
	assert_eq!(handle.try_outcome(), None);
	assert_eq!(corr.in_flight(), Some(id));
}

#[test]
fn inactive_requester_is_discarded() {
	let mut corr = Correlator::default();
	let mut handle = corr.post("SIGNATURE f", EDITOR);
	let (id, _) = corr.poll_outbound(Instant::now()).unwrap();
	corr.resolve(id, json!(["f()"]), |who| who != EDITOR);
	assert_eq!(handle.try_outcome(), Some(Outcome::Discarded));
}

#[test]
fn cancel_queued_and_in_flight() {
	let mut corr = Correlator::default();
	let mut a = corr.post("EVAL a", EDITOR);
	let mut b = corr.post("EVAL b", EDITOR);
	let now = Instant::now();
	let (id_a, _) = corr.poll_outbound(now).unwrap();

	assert!(corr.cancel(b.id()));
	assert_eq!(b.try_outcome(), Some(Outcome::Discarded));

	assert!(corr.cancel(id_a));
	assert_eq!(a.try_outcome(), None);
	corr.resolve(id_a, json!("a"), active);
	assert_eq!(a.try_outcome(), Some(Outcome::Discarded));

	assert!(!corr.cancel(RequestId(99)));
	assert_eq!(corr.pending(), 0);
}

#[test]
fn cancelled_requester_is_skipped_on_send() {
	let mut corr = Correlator::default();
	let mut stale = corr.post("EVAL a", EDITOR);
	let live = corr.post("EVAL b", SHELL);
	corr.cancel_requester(EDITOR);

	let (id, text) = corr.poll_outbound(Instant::now()).unwrap();
	assert_eq!(id, live.id());
	assert_eq!(text, "EVAL b");
	assert_eq!(stale.try_outcome(), Some(Outcome::Discarded));
}

#[test]
fn requests_dropped_before_sending_are_reported() {
	let mut corr = Correlator::default();
	let now = Instant::now();
	let first = corr.post("ATTRIBUTES os", SHELL);
	let queued: Vec<_> = (0..3)
		.map(|i| corr.post(format!("SIGNATURE f{i}"), EDITOR).id())
		.collect();
	let (id, _) = corr.poll_outbound(now).unwrap();
	assert_eq!(id, first.id());

	assert!(corr.cancel(queued[0]));
	corr.cancel_requester(EDITOR);
	assert_eq!(corr.take_dropped(), [queued[0]]);

	assert_eq!(corr.expire(now + DEFAULT_TIMEOUT), Some(id));
	assert_eq!(corr.poll_outbound(now), None);
	assert_eq!(corr.take_dropped(), queued[1..]);
	assert!(corr.take_dropped().is_empty());
	assert_eq!(corr.pending(), 0);
}

#[test]
fn timeout_frees_the_slot() {
	let mut corr = Correlator::new(Duration::from_millis(500));
	let mut slow = corr.post("EVAL slow", EDITOR);
	let next = corr.post("EVAL next", EDITOR);
	let start = Instant::now();
	let (slow_id, _) = corr.poll_outbound(start).unwrap();

	assert_eq!(corr.expire(start + Duration::from_millis(100)), None);
	assert_eq!(corr.expire(start + Duration::from_millis(500)), Some(slow_id));
	assert_eq!(slow.try_outcome(), Some(Outcome::TimedOut));

	let (id, _) = corr.poll_outbound(start + Duration::from_millis(600)).unwrap();
	assert_eq!(id, next.id());
	// The late reply for the timed-out request carries the old id.
	assert!(!corr.resolve(slow_id, json!("late"), active));
	assert_eq!(corr.in_flight(), Some(next.id()));
}

#[test]
fn closing_fails_everything() {
	let mut corr = Correlator::default();
	let mut a = corr.post("EVAL a", EDITOR);
	let mut b = corr.post("EVAL b", SHELL);
	corr.poll_outbound(Instant::now());
	corr.fail_all();
	assert_eq!(a.try_outcome(), Some(Outcome::Closed));
	assert_eq!(b.try_outcome(), Some(Outcome::Closed));
	assert_eq!(corr.pending(), 0);
}

#[tokio::test]
async fn outcome_can_be_awaited() {
	let mut corr = Correlator::default();
	let handle = corr.post("EVAL 2", EDITOR);
	let (id, _) = corr.poll_outbound(Instant::now()).unwrap();
	corr.resolve(id, json!("2"), active);
	assert_eq!(handle.outcome().await, Outcome::Delivered(Reply::Value(json!("2"))));

	let dropped = corr.post("EVAL 3", EDITOR);
	drop(corr);
	assert_eq!(dropped.outcome().await, Outcome::Closed);
}
