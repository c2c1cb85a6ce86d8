//! Edge gateway library: route matching, token authentication with
//! transparent reissue, admin authorization and password-hashing filters.

// Core subsystems
pub mod config;
pub mod filter;
pub mod http;
pub mod routing;
pub mod upstream;

// Domain building blocks
pub mod rewrite;
pub mod token;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::GatewayConfig;
pub use error::{AuthFailure, GatewayError};
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
