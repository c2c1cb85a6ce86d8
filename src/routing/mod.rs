//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (evaluate path globs and method set)
//!     → Return: matched Route or NoMatch
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Compile path globs and method sets
//!     → Build each route's filter chain
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment globs only)
//! - Deterministic: same input always matches same route
//! - Highest (priority, method-qualified, specificity) wins; ties go to
//!   the earlier declaration

pub mod matcher;
pub mod router;

pub use matcher::{MethodMatcher, PathPattern, PatternError};
pub use router::{Route, RouteError, Router};
