use crate::application_port::{
    AccessToken, RefreshToken, SecretHasher, TokenCodec, TokenError, TokenPair, TokenService,
};
use crate::domain_model::{PairId, UserId};
use crate::domain_port::{IpChangeNotifier, RefreshTokenRecord, RefreshTokenRepo};
use argon2::password_hash::rand_core::{OsRng, RngCore};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RotationConfig {
    pub refresh_ttl: Duration,
    /// Upper bound on the ip-change notification attempt. The
    /// notification is best-effort and must never stall a rotation.
    pub notify_timeout: Duration,
}

/// The rotation engine. Stateless itself; every durable fact lives in
/// the repo, and the consume step relies on the repo's atomic
/// conditional update rather than any in-process lock.
pub struct RotationService {
    repo: Arc<dyn RefreshTokenRepo>,
    codec: Arc<dyn TokenCodec>,
    hasher: Arc<dyn SecretHasher>,
    notifier: Arc<dyn IpChangeNotifier>,
    cfg: RotationConfig,
}

impl RotationService {
    pub fn new(
        repo: Arc<dyn RefreshTokenRepo>,
        codec: Arc<dyn TokenCodec>,
        hasher: Arc<dyn SecretHasher>,
        notifier: Arc<dyn IpChangeNotifier>,
        cfg: RotationConfig,
    ) -> Self {
        Self {
            repo,
            codec,
            hasher,
            notifier,
            cfg,
        }
    }

    fn generate_secret() -> String {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    async fn notify_best_effort(&self, user: UserId, old_ip: &str, new_ip: &str) {
        let attempt = self.notifier.notify_ip_change(user, old_ip, new_ip);
        match tokio::time::timeout(self.cfg.notify_timeout, attempt).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("failed to send ip change warning: {e:#}"),
            Err(_) => warn!("ip change warning timed out"),
        }
    }

    /// Consume the record and mint the successor pair. Exactly one of
    /// any number of concurrent callers gets past the conditional
    /// update; the rest see an already-used token.
    async fn consume_and_reissue(
        &self,
        pair_id: PairId,
        user: UserId,
        ip: &str,
    ) -> Result<TokenPair, TokenError> {
        if !self.repo.mark_used_if_unused(pair_id).await? {
            return Err(TokenError::TokenUsed);
        }
        self.issue(user, ip).await
    }
}

#[async_trait::async_trait]
impl TokenService for RotationService {
    async fn issue(&self, user: UserId, ip: &str) -> Result<TokenPair, TokenError> {
        let pair_id = PairId::generate();

        let access_token = self.codec.sign_access(user, ip, pair_id).await?;

        let secret = Self::generate_secret();
        let secret_hash = self.hasher.hash_secret(&secret).await?;

        let now = Utc::now();
        let record = RefreshTokenRecord {
            id: pair_id,
            user_id: user,
            secret_hash,
            issued_at: now,
            expires_at: now + self.cfg.refresh_ttl,
            issued_ip: ip.to_owned(),
            is_used: false,
        };
        self.repo.save(&record).await?;

        let refresh_token = self.codec.encode_refresh(pair_id, &secret).await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    async fn rotate_by_refresh(
        &self,
        token: &RefreshToken,
        ip: &str,
    ) -> Result<TokenPair, TokenError> {
        let (pair_id, secret) = self.codec.decode_refresh(token).await?;

        let record = self.repo.get(pair_id).await?;

        if Utc::now() > record.expires_at {
            return Err(TokenError::TokenExpired);
        }
        if record.is_used {
            return Err(TokenError::TokenUsed);
        }

        if !self.hasher.verify_secret(&secret, &record.secret_hash).await? {
            return Err(TokenError::TokenInvalid);
        }

        if ip != record.issued_ip {
            // Suspicious but unconsumed: the rightful holder keeps a
            // working token.
            self.notify_best_effort(record.user_id, &record.issued_ip, ip)
                .await;
            return Err(TokenError::IpMismatch);
        }

        self.consume_and_reissue(pair_id, record.user_id, ip).await
    }

    async fn rotate_by_access(
        &self,
        token: &AccessToken,
        ip: &str,
    ) -> Result<TokenPair, TokenError> {
        let claims = self.codec.parse_access(token).await?;

        if Utc::now() > claims.expires_at {
            return Err(TokenError::TokenExpired);
        }

        if self.repo.is_used(claims.pair_id).await? {
            return Err(TokenError::TokenUsed);
        }

        if ip != claims.issued_ip {
            self.notify_best_effort(claims.user_id, &claims.issued_ip, ip)
                .await;
            return Err(TokenError::IpMismatch);
        }

        self.consume_and_reissue(claims.pair_id, claims.user_id, ip)
            .await
    }
}
