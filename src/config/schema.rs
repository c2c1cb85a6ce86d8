//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Token verification settings.
    pub jwt: JwtConfig,

    /// Auth upstream used for token reissue.
    pub auth: AuthConfig,

    /// Password hashing settings.
    pub hashing: HashingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Logical upstream services and their addresses.
    pub upstreams: Vec<UpstreamConfig>,

    /// Route definitions mapping requests to filter chains and upstreams.
    pub routes: Vec<RouteConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest request body buffered for a rewriting filter. Other routes stream.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Time allowed for an upstream to answer a forwarded request, in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_secs: 10,
        }
    }
}

/// Token verification configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct JwtConfig {
    /// HS256 shared secret. Must be set.
    pub secret: String,

    /// Clock skew tolerance for `exp`, in seconds.
    pub leeway_secs: u64,

    /// Header (and cookie) name carrying the refresh token.
    pub refresh_header: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            leeway_secs: 0,
            refresh_header: "Refresh".to_string(),
        }
    }
}

/// Auth upstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Logical upstream name of the auth service.
    pub upstream: String,

    /// Path of the reissue endpoint on the auth service.
    pub reissue_path: String,

    /// Deadline for a reissue call in milliseconds.
    pub reissue_timeout_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            upstream: "auth".to_string(),
            reissue_path: "/api/auth/reissue".to_string(),
            reissue_timeout_ms: 3000,
        }
    }
}

/// Password hashing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HashingConfig {
    /// bcrypt cost factor (4..=31).
    pub cost: u32,

    /// Maximum number of hashes computed at once.
    pub max_concurrent: usize,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            cost: 10,
            max_concurrent: 4,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A logical upstream service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Logical name referenced by routes (e.g., "books").
    pub name: String,

    /// Addresses (e.g., "127.0.0.1:3000"), used round robin.
    pub addresses: Vec<String>,
}

/// Route configuration mapping requests to a filter chain and an upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub id: String,

    /// Path globs, any of which may match.
    pub paths: Vec<String>,

    /// Accepted methods. Empty accepts any method.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Upstream name to forward to.
    pub upstream: String,

    /// Explicit precedence (higher wins) among routes matching the same request.
    #[serde(default)]
    pub priority: i32,

    /// Filters, run in the order given.
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
}

/// A filter in a route's chain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterConfig {
    /// Validate the access token, reissuing it when expired.
    Authenticate,

    /// Require an admin token, then strip leading path segments.
    AuthorizeAdmin {
        #[serde(default)]
        strip_prefix: usize,
    },

    /// Replace the body's password with its hash.
    ///
    /// `parent` hashes `password` inside that sub-object; `guard` hashes the
    /// top-level `password` only when that field is present. Neither set
    /// hashes the top-level `password`.
    HashPassword {
        #[serde(default)]
        parent: Option<String>,
        #[serde(default)]
        guard: Option<String>,
    },

    /// Expose the user id of a token returned by the auth service.
    Login,
}

impl FilterConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            FilterConfig::Authenticate => "authenticate",
            FilterConfig::AuthorizeAdmin { .. } => "authorize_admin",
            FilterConfig::HashPassword { .. } => "hash_password",
            FilterConfig::Login => "login",
        }
    }
}
