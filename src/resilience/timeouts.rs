//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap upstream calls (reissue, forward) with a deadline
//! - Cancel operations cleanly on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other errors
//! - Timed-out forwards return 504; timed-out reissues count as reissue failures

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline of {0:?} exceeded")]
pub struct TimedOut(pub Duration);

/// Run `future`, dropping it if it has not finished within `limit`.
pub async fn with_deadline<F: Future>(limit: Duration, future: F) -> Result<F::Output, TimedOut> {
    tokio::time::timeout(limit, future)
        .await
        .map_err(|_| TimedOut(limit))
}
