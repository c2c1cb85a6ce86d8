//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through logs and onto the forwarded request
//! - Metrics are cheap (atomic increments)
//! - Auth failure reasons are logged and counted, never sent to the client

pub mod logging;
pub mod metrics;
