//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to an upstream (reissue or forward):
//!     → timeouts.rs (enforce deadline)
//!     → On timeout: caller maps to reissue failure or 504
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries: request bodies are not idempotent and reissue runs at most once

pub mod timeouts;
