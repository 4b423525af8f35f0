//! Re-read and re-validate loop for optimistic writes.
//!
//! Workflow mutations read a snapshot, validate it and commit with
//! compare-and-swap preconditions. When another writer got there first the
//! commit fails with a storage conflict, and the whole read-validate-commit
//! attempt runs again against fresh state.

use std::future::Future;

/// Errors that can report a lost compare-and-swap race.
pub trait Contention: Sized {
	/// Whether this error is a failed commit precondition.
	fn is_write_conflict(&self) -> bool;

	/// Error returned once the attempt budget is spent.
	fn contended(attempts: u32) -> Self;
}

/// Runs `attempt` until it succeeds, fails for another reason, or has lost
/// `max_attempts` races.
pub async fn retry_on_conflict<T, E, F, Fut>(max_attempts: u32, mut attempt: F) -> Result<T, E>
where
	E: Contention,
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
{
	let max_attempts = max_attempts.max(1);
	let mut attempts = 0;
	loop {
		attempts += 1;
		match attempt().await {
			Err(e) if e.is_write_conflict() => {
				if attempts >= max_attempts {
					tracing::warn!(attempts, "Giving up after repeated write conflicts");
					return Err(E::contended(attempts));
				}
				tracing::debug!(attempt = attempts, "Write conflict, re-reading state");
				tokio::task::yield_now().await;
			},
			other => return other,
		}
	}
}
