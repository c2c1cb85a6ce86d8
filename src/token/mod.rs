//! Token codec subsystem.
//!
//! # Data Flow
//! ```text
//! Authorization: Bearer <jwt>
//!     → bearer_token (strip scheme)
//!     → codec.rs (signature, structure, then expiry)
//!     → claims.rs (typed claim set)
//!     → filters read subject/role from Claims
//! ```
//!
//! # Design Decisions
//! - Stateless: a codec is built once from the shared secret and cloned via Arc
//! - Expiry is a distinct error kind because it drives the reissue flow
//! - The gateway never mints tokens on the request path; `sign` is for tooling

pub mod claims;
pub mod codec;

pub use claims::{Claims, TokenCategory};
pub use codec::{TokenCodec, TokenError};

/// Extract the token from an `Authorization` header value.
///
/// Accepts `Bearer <token>` (scheme is case-insensitive) as well as a bare
/// token for clients that omit the scheme.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let value = header_value.trim();
    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        Some(_) => return None,
        None => value,
    };

    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
