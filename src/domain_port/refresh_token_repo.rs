use crate::application_port::TokenError;
use crate::domain_model::{PairId, UserId};
use chrono::{DateTime, Utc};

/// Durable refresh credential record. The stored hash is a slow
/// one-way hash of the secret; the secret itself never persists.
/// `is_used` flips false -> true at most once, and only through
/// `mark_used_if_unused`.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: PairId,
    pub user_id: UserId,
    pub secret_hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub issued_ip: String,
    pub is_used: bool,
}

#[async_trait::async_trait]
pub trait RefreshTokenRepo: Send + Sync {
    /// Insert a new record. `TokenError::Conflict` if the id exists.
    async fn save(&self, record: &RefreshTokenRecord) -> Result<(), TokenError>;

    /// Fetch a record, `TokenError::RecordNotFound` if absent.
    async fn get(&self, id: PairId) -> Result<RefreshTokenRecord, TokenError>;

    /// Atomic conditional consume: set `is_used = true` iff it is
    /// currently false. Returns true iff this call made the
    /// transition, so concurrent rotations of one record see exactly
    /// one winner.
    async fn mark_used_if_unused(&self, id: PairId) -> Result<bool, TokenError>;

    /// Read the `is_used` flag, `TokenError::RecordNotFound` if absent.
    async fn is_used(&self, id: PairId) -> Result<bool, TokenError>;
}
