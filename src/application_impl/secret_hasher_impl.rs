use crate::application_port::{SecretHasher, TokenError};
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

/// Argon2 with its default (deliberately slow) parameters. A leaked
/// hash should not be cheap to brute-force offline, which rules out
/// fast general-purpose hashes here.
pub struct Argon2SecretHasher;

#[async_trait::async_trait]
impl SecretHasher for Argon2SecretHasher {
    async fn hash_secret(&self, secret: &str) -> Result<String, TokenError> {
        let salt = argon2::password_hash::SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| TokenError::InternalError(e.to_string()))?
            .to_string();
        Ok(hash)
    }

    async fn verify_secret(&self, secret: &str, secret_hash: &str) -> Result<bool, TokenError> {
        let parsed = PasswordHash::new(secret_hash).map_err(|e| {
            TokenError::InternalError(format!("invalid PHC hash: {}", e.to_string()))
        })?;

        match Argon2::default().verify_password(secret.as_bytes(), &parsed) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(TokenError::InternalError(format!(
                "verify error: {}",
                e.to_string()
            ))),
        }
    }
}
