use super::error::*;
use crate::application_port::{AccessToken, RefreshToken, TokenPair, TokenService};
use crate::domain_model::UserId;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

fn client_ip(addr: Option<SocketAddr>) -> Result<String, warp::Rejection> {
    addr.map(|a| a.ip().to_string())
        .ok_or_else(|| reject::custom(ApiErrorCode::InvalidRequest))
}

#[derive(Debug, Deserialize)]
pub struct IssueRequest {
    pub user_id: uuid::Uuid,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Refresh,
    Access,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub token: String,
    pub token_type: TokenKind,
}

#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<TokenPair> for TokenPairResponse {
    fn from(pair: TokenPair) -> Self {
        TokenPairResponse {
            access_token: pair.access_token.0,
            refresh_token: pair.refresh_token.0,
        }
    }
}

pub async fn issue_tokens(
    body: IssueRequest,
    addr: Option<SocketAddr>,
    token_service: Arc<dyn TokenService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let ip = client_ip(addr)?;

    let pair = token_service
        .issue(UserId(body.user_id), &ip)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(
        TokenPairResponse::from(pair),
    )))
}

pub async fn refresh_tokens(
    body: RefreshRequest,
    addr: Option<SocketAddr>,
    token_service: Arc<dyn TokenService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let ip = client_ip(addr)?;

    // Which rotation path to take is the caller's declaration; the
    // engine itself never guesses a token's kind.
    let pair = match body.token_type {
        TokenKind::Refresh => {
            token_service
                .rotate_by_refresh(&RefreshToken(body.token), &ip)
                .await
        }
        TokenKind::Access => {
            token_service
                .rotate_by_access(&AccessToken(body.token), &ip)
                .await
        }
    }
    .map_err(ApiErrorCode::from)
    .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(
        TokenPairResponse::from(pair),
    )))
}
