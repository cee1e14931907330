use crate::domain_model::{PairId, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token invalid")]
    TokenInvalid,
    #[error("token expired")]
    TokenExpired,
    #[error("refresh token already used")]
    TokenUsed,
    #[error("ip mismatch")]
    IpMismatch,
    #[error("refresh token not found")]
    RecordNotFound,
    #[error("refresh token id already exists")]
    Conflict,
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct RefreshToken(pub String);

/// One issued credential pair. Handed to the caller and forgotten;
/// only the refresh half leaves a durable trace (its record).
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
}

/// Verified claims of an access token. `pair_id` is the `jti` and is
/// the only link back to the refresh record minted alongside it.
#[derive(Debug, Clone)]
pub struct AccessClaims {
    pub pair_id: PairId,
    pub user_id: UserId,
    pub issued_ip: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait TokenCodec: Send + Sync {
    /// Sign an access token carrying `(user, ip, pair_id)` claims.
    async fn sign_access(
        &self,
        user: UserId,
        ip: &str,
        pair_id: PairId,
    ) -> Result<AccessToken, TokenError>;

    /// Verify signature and structure only. Expiry is deliberately not
    /// checked here so the engine can report `TokenExpired` separately
    /// from `TokenInvalid`.
    async fn parse_access(&self, token: &AccessToken) -> Result<AccessClaims, TokenError>;

    /// Wrap `(pair_id, secret)` into the opaque refresh wire format.
    async fn encode_refresh(
        &self,
        pair_id: PairId,
        secret: &str,
    ) -> Result<RefreshToken, TokenError>;

    /// Unwrap the refresh wire format back into `(pair_id, secret)`.
    async fn decode_refresh(&self, token: &RefreshToken) -> Result<(PairId, String), TokenError>;
}

#[async_trait::async_trait]
pub trait SecretHasher: Send + Sync {
    async fn hash_secret(&self, secret: &str) -> Result<String, TokenError>;
    async fn verify_secret(&self, secret: &str, secret_hash: &str) -> Result<bool, TokenError>;
}

#[async_trait::async_trait]
pub trait TokenService: Send + Sync {
    async fn issue(&self, user: UserId, ip: &str) -> Result<TokenPair, TokenError>;
    async fn rotate_by_refresh(
        &self,
        token: &RefreshToken,
        ip: &str,
    ) -> Result<TokenPair, TokenError>;
    async fn rotate_by_access(
        &self,
        token: &AccessToken,
        ip: &str,
    ) -> Result<TokenPair, TokenError>;
}
