use crate::application_port::{AccessClaims, AccessToken, RefreshToken, TokenCodec, TokenError};
use crate::domain_model::{PairId, UserId};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CodecConfig {
    pub signing_key: Vec<u8>,
    pub access_ttl: Duration,
}

#[derive(Debug, Serialize, Deserialize)]
struct JwtAccessClaims {
    jti: String, // pair id, links to the refresh record
    uid: String,
    ip: String,
    iat: i64,
    nbf: i64,
    exp: i64,
}

fn ts_to_datetime(ts: i64) -> Result<DateTime<Utc>, TokenError> {
    DateTime::<Utc>::from_timestamp(ts, 0).ok_or(TokenError::TokenInvalid)
}

// The wire encoding is unpadded on our side but tolerates padded
// input from older clients.
fn b64_decode_tolerant(s: &str) -> Result<Vec<u8>, TokenError> {
    URL_SAFE_NO_PAD
        .decode(s.trim_end_matches('='))
        .map_err(|_| TokenError::TokenInvalid)
}

/// HS512-signed JWT access tokens plus the opaque
/// `base64(pair_id ":" secret)` refresh wire format.
pub struct JwtHs512Codec {
    cfg: CodecConfig,
}

impl JwtHs512Codec {
    pub fn new(cfg: CodecConfig) -> Self {
        JwtHs512Codec { cfg }
    }
}

#[async_trait::async_trait]
impl TokenCodec for JwtHs512Codec {
    async fn sign_access(
        &self,
        user: UserId,
        ip: &str,
        pair_id: PairId,
    ) -> Result<AccessToken, TokenError> {
        let iat_dt = Utc::now();
        let exp_dt = iat_dt + self.cfg.access_ttl;
        let claims = JwtAccessClaims {
            jti: pair_id.to_string(),
            uid: user.to_string(),
            ip: ip.to_owned(),
            iat: iat_dt.timestamp(),
            nbf: iat_dt.timestamp(),
            exp: exp_dt.timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(&self.cfg.signing_key),
        )
        .map_err(|e| TokenError::InternalError(e.to_string()))?;
        Ok(AccessToken(token))
    }

    async fn parse_access(&self, token: &AccessToken) -> Result<AccessClaims, TokenError> {
        let mut v = Validation::new(Algorithm::HS512);
        // Expiry is the engine's call; here only signature and shape.
        v.validate_exp = false;
        let data = decode::<JwtAccessClaims>(
            &token.0,
            &DecodingKey::from_secret(&self.cfg.signing_key),
            &v,
        )
        .map_err(|_| TokenError::TokenInvalid)?;

        let claims = data.claims;
        // jti and uid are load-bearing; an unparseable one is a forged
        // or wrong-kind token, never something to skip over.
        let pair_id = claims
            .jti
            .parse::<PairId>()
            .map_err(|_| TokenError::TokenInvalid)?;
        let user_id = claims
            .uid
            .parse::<UserId>()
            .map_err(|_| TokenError::TokenInvalid)?;

        Ok(AccessClaims {
            pair_id,
            user_id,
            issued_ip: claims.ip,
            issued_at: ts_to_datetime(claims.iat)?,
            expires_at: ts_to_datetime(claims.exp)?,
        })
    }

    async fn encode_refresh(
        &self,
        pair_id: PairId,
        secret: &str,
    ) -> Result<RefreshToken, TokenError> {
        let payload = format!("{}:{}", pair_id, secret);
        Ok(RefreshToken(URL_SAFE_NO_PAD.encode(payload.as_bytes())))
    }

    async fn decode_refresh(&self, token: &RefreshToken) -> Result<(PairId, String), TokenError> {
        let decoded = b64_decode_tolerant(&token.0)?;
        let payload = String::from_utf8(decoded).map_err(|_| TokenError::TokenInvalid)?;

        let parts: Vec<&str> = payload.split(':').collect();
        if parts.len() != 2 {
            return Err(TokenError::TokenInvalid);
        }

        let pair_id = parts[0]
            .parse::<PairId>()
            .map_err(|_| TokenError::TokenInvalid)?;
        Ok((pair_id, parts[1].to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> JwtHs512Codec {
        JwtHs512Codec::new(CodecConfig {
            signing_key: b"test-signing-key".to_vec(),
            access_ttl: Duration::from_secs(300),
        })
    }

    #[tokio::test]
    async fn access_token_round_trips_claims() {
        let codec = codec();
        let user = UserId(uuid::Uuid::new_v4());
        let pair_id = PairId::generate();

        let token = codec.sign_access(user, "10.0.0.1", pair_id).await.unwrap();
        let claims = codec.parse_access(&token).await.unwrap();

        assert_eq!(claims.pair_id, pair_id);
        assert_eq!(claims.user_id, user);
        assert_eq!(claims.issued_ip, "10.0.0.1");
        assert!(claims.expires_at > claims.issued_at);
    }

    #[tokio::test]
    async fn access_token_with_wrong_key_is_invalid() {
        let codec = codec();
        let other = JwtHs512Codec::new(CodecConfig {
            signing_key: b"some-other-key".to_vec(),
            access_ttl: Duration::from_secs(300),
        });

        let token = other
            .sign_access(UserId(uuid::Uuid::new_v4()), "10.0.0.1", PairId::generate())
            .await
            .unwrap();

        assert!(matches!(
            codec.parse_access(&token).await,
            Err(TokenError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn refresh_token_round_trips() {
        let codec = codec();
        let pair_id = PairId::generate();

        let token = codec.encode_refresh(pair_id, "s3cr3t").await.unwrap();
        let (decoded_id, secret) = codec.decode_refresh(&token).await.unwrap();

        assert_eq!(decoded_id, pair_id);
        assert_eq!(secret, "s3cr3t");
    }

    #[tokio::test]
    async fn refresh_decode_rejects_garbage() {
        let codec = codec();

        // not base64 at all
        let err = codec
            .decode_refresh(&RefreshToken("!!!not-base64!!!".to_owned()))
            .await;
        assert!(matches!(err, Err(TokenError::TokenInvalid)));

        // decodes, but no colon
        let no_colon = RefreshToken(URL_SAFE_NO_PAD.encode(b"justonefield"));
        assert!(matches!(
            codec.decode_refresh(&no_colon).await,
            Err(TokenError::TokenInvalid)
        ));

        // decodes, but too many fields
        let extra = RefreshToken(URL_SAFE_NO_PAD.encode(b"a:b:c"));
        assert!(matches!(
            codec.decode_refresh(&extra).await,
            Err(TokenError::TokenInvalid)
        ));

        // two fields, but the first is not a pair id
        let bad_id = RefreshToken(URL_SAFE_NO_PAD.encode(b"not-a-uuid:secret"));
        assert!(matches!(
            codec.decode_refresh(&bad_id).await,
            Err(TokenError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn refresh_decode_tolerates_padding() {
        let codec = codec();
        let pair_id = PairId::generate();

        let token = codec.encode_refresh(pair_id, "secret").await.unwrap();
        let padded = RefreshToken(format!("{}==", token.0));

        // padded variants of our own output still decode
        let (decoded_id, _) = codec.decode_refresh(&padded).await.unwrap();
        assert_eq!(decoded_id, pair_id);
    }

    #[tokio::test]
    async fn truncated_refresh_token_is_invalid() {
        let codec = codec();
        let token = codec
            .encode_refresh(PairId::generate(), "secret")
            .await
            .unwrap();

        let truncated = RefreshToken(token.0[..token.0.len() / 2].to_owned());
        // either base64 or the payload split fails, both are invalid
        assert!(matches!(
            codec.decode_refresh(&truncated).await,
            Err(TokenError::TokenInvalid)
        ));
    }
}
