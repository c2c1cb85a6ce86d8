//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! route.upstream ("books")
//!     → resolver.rs (logical name → SocketAddr, round robin)
//!     → forward.rs (send the exchange, buffered or streamed, bounded by timeout)
//!
//! authenticate filter (expired token)
//!     → reissue.rs (POST reissue path on the auth upstream)
//! ```
//!
//! # Design Decisions
//! - One pooled hyper-util client shared by forwarding and reissue
//! - Resolution and reissue are traits so tests can swap them out
//! - No forwarding retries

pub mod forward;
pub mod reissue;
pub mod resolver;

pub use forward::{ForwardError, Forwarder, OutboundBody};
pub use reissue::{HttpReissuer, ReissueError, ReissueRequest, ReissuedTokens, Reissuer};
pub use resolver::{StaticResolver, UpstreamResolver};
