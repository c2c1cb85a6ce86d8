//! Request body rewrite subsystem.
//!
//! # Data Flow
//! ```text
//! Buffered request body (bytes)
//!     → body.rs (parse JSON object; members kept in order as raw text)
//!     → locate password by FieldLocation
//!     → hasher.rs (bcrypt on the blocking pool, bounded by a semaphore)
//!     → body.rs (replace value, re-serialize)
//!     → New body bytes for the next Exchange
//! ```
//!
//! # Design Decisions
//! - A body that is not a JSON object fails the request; it is never passed through
//! - Absent target field is not an error: the body is re-serialized unchanged
//! - Hashing never runs on the async worker threads
//! - Members other than the password are written back byte for byte

pub mod body;
pub mod hasher;

pub use body::{rewrite_password, BodyRewriteError, FieldLocation, PASSWORD_FIELD};
pub use hasher::{HashError, PasswordHasher};
