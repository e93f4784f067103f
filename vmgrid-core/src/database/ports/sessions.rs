use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// Housekeeping access to the session store. Token issuance and validation
/// are external; the core only purges rows whose expiry has passed.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Delete every session whose `expires_at` is before `now`. Returns the
    /// number of rows removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}
