use super::util::is_dup_key;
use crate::application_port::TokenError;
use crate::domain_model::{PairId, UserId};
use crate::domain_port::{RefreshTokenRecord, RefreshTokenRepo};
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use uuid::Uuid;

pub struct MySqlRefreshTokenRepo {
    pool: MySqlPool,
}

impl MySqlRefreshTokenRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlRefreshTokenRepo { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), TokenError> {
        sqlx::query(
            r#"
CREATE TABLE IF NOT EXISTS refresh_token (
    id BINARY(16) PRIMARY KEY,
    user_id BINARY(16) NOT NULL,
    secret_hash VARCHAR(128) NOT NULL,
    issued_at TIMESTAMP(6) NOT NULL,
    expires_at TIMESTAMP(6) NOT NULL,
    issued_ip VARCHAR(45) NOT NULL,
    is_used BOOLEAN NOT NULL DEFAULT FALSE
)
"#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| TokenError::Store(e.to_string()))?;

        Ok(())
    }

    #[inline]
    fn id_as_bytes(id: &PairId) -> &[u8] {
        id.0.as_bytes()
    }

    #[inline]
    fn uuid_from_bytes(bytes: &[u8]) -> Result<Uuid, TokenError> {
        Uuid::from_slice(bytes).map_err(|e| TokenError::Store(e.to_string()))
    }

    fn row_to_record(row: MySqlRow) -> Result<RefreshTokenRecord, TokenError> {
        let id_bytes: Vec<u8> = row
            .try_get("id")
            .map_err(|e| TokenError::Store(e.to_string()))?;
        let user_id_bytes: Vec<u8> = row
            .try_get("user_id")
            .map_err(|e| TokenError::Store(e.to_string()))?;

        let secret_hash: String = row
            .try_get("secret_hash")
            .map_err(|e| TokenError::Store(e.to_string()))?;
        let issued_at: DateTime<Utc> = row
            .try_get("issued_at")
            .map_err(|e| TokenError::Store(e.to_string()))?;
        let expires_at: DateTime<Utc> = row
            .try_get("expires_at")
            .map_err(|e| TokenError::Store(e.to_string()))?;
        let issued_ip: String = row
            .try_get("issued_ip")
            .map_err(|e| TokenError::Store(e.to_string()))?;
        let is_used: bool = row
            .try_get("is_used")
            .map_err(|e| TokenError::Store(e.to_string()))?;

        Ok(RefreshTokenRecord {
            id: PairId(Self::uuid_from_bytes(&id_bytes)?),
            user_id: UserId(Self::uuid_from_bytes(&user_id_bytes)?),
            secret_hash,
            issued_at,
            expires_at,
            issued_ip,
            is_used,
        })
    }
}

#[async_trait::async_trait]
impl RefreshTokenRepo for MySqlRefreshTokenRepo {
    async fn save(&self, record: &RefreshTokenRecord) -> Result<(), TokenError> {
        sqlx::query(
            r#"
INSERT INTO refresh_token (id, user_id, secret_hash, issued_at, expires_at, issued_ip, is_used)
VALUES (?, ?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(Self::id_as_bytes(&record.id))
        .bind(record.user_id.0.as_bytes().as_slice())
        .bind(&record.secret_hash)
        .bind(record.issued_at)
        .bind(record.expires_at)
        .bind(&record.issued_ip)
        .bind(record.is_used)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                TokenError::Conflict
            } else {
                TokenError::Store(e.to_string())
            }
        })?;

        Ok(())
    }

    async fn get(&self, id: PairId) -> Result<RefreshTokenRecord, TokenError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT id, user_id, secret_hash, issued_at, expires_at, issued_ip, is_used
FROM refresh_token
WHERE id = ?
"#,
        )
        .bind(Self::id_as_bytes(&id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TokenError::Store(e.to_string()))?;

        match row_opt {
            Some(row) => Self::row_to_record(row),
            None => Err(TokenError::RecordNotFound),
        }
    }

    async fn mark_used_if_unused(&self, id: PairId) -> Result<bool, TokenError> {
        // Single conditional UPDATE; the row count tells us whether
        // this caller won the consume race.
        let result = sqlx::query(
            r#"
UPDATE refresh_token
SET is_used = TRUE
WHERE id = ? AND is_used = FALSE
"#,
        )
        .bind(Self::id_as_bytes(&id))
        .execute(&self.pool)
        .await
        .map_err(|e| TokenError::Store(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn is_used(&self, id: PairId) -> Result<bool, TokenError> {
        let row_opt: Option<MySqlRow> = sqlx::query(
            r#"
SELECT is_used
FROM refresh_token
WHERE id = ?
"#,
        )
        .bind(Self::id_as_bytes(&id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TokenError::Store(e.to_string()))?;

        match row_opt {
            Some(row) => row
                .try_get("is_used")
                .map_err(|e| TokenError::Store(e.to_string())),
            None => Err(TokenError::RecordNotFound),
        }
    }
}
