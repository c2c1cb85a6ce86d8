//! Bounded bcrypt worker pool.

use bcrypt::Version;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::HashingConfig;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("bcrypt failed: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("hashing worker terminated: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("hashing pool is closed")]
    Closed,
}

/// Salted, cost-factored password hashing off the async executor.
///
/// At most `max_concurrent` hashes run at once; further callers wait for a
/// permit. If a caller is dropped while its hash is running, the job finishes
/// on the blocking pool and the result is discarded.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
    permits: Arc<Semaphore>,
}

impl PasswordHasher {
    pub fn new(cost: u32, max_concurrent: usize) -> Self {
        Self {
            cost,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn from_config(config: &HashingConfig) -> Self {
        Self::new(config.cost, config.max_concurrent)
    }

    /// Hash `plain`, producing a `$2a$` modular-crypt string.
    pub async fn hash(&self, plain: String) -> Result<String, HashError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| HashError::Closed)?;
        let cost = self.cost;

        let hashed = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            bcrypt::hash_with_result(plain, cost).map(|parts| parts.format_for_version(Version::TwoA))
        })
        .await??;

        Ok(hashed)
    }
}
