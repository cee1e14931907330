use crate::api::v1::handler::ApiResponse;
use crate::application_port::TokenError;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::warn;
use warp::http::StatusCode;
use warp::{Rejection, reject};

pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    if let Some(err) = err.find::<ApiErrorCode>() {
        let json = warp::reply::json(&ApiResponse::<()>::err(err.clone(), err.to_string()));
        Ok(warp::reply::with_status(json, StatusCode::OK))
    } else if let Some(err) = err.find::<warp::filters::body::BodyDeserializeError>() {
        let json = warp::reply::json(&ApiResponse::<()>::err(
            ApiErrorCode::InvalidRequest,
            err.to_string(),
        ));
        Ok(warp::reply::with_status(json, StatusCode::BAD_REQUEST))
    } else {
        let json = warp::reply::json(&ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(ApiError {
                code: ApiErrorCode::InternalError,
                message: format!("Unhandled error: {:?}", err),
            }),
        });
        Ok(warp::reply::with_status(
            json,
            StatusCode::INTERNAL_SERVER_ERROR,
        ))
    }
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Malformed request")]
    InvalidRequest,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Token has expired")]
    TokenExpired,
    #[error("Refresh token was already used")]
    TokenReused,
    #[error("Rotation refused for this address")]
    IpMismatch,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn internal<E: std::fmt::Display>(error: E) -> ApiErrorCode {
        warn!("Internal error: {}", error);
        ApiErrorCode::InternalError
    }
}

impl reject::Reject for ApiErrorCode {}

impl From<TokenError> for ApiErrorCode {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::TokenInvalid => ApiErrorCode::InvalidToken,
            TokenError::TokenExpired => ApiErrorCode::TokenExpired,
            TokenError::TokenUsed => ApiErrorCode::TokenReused,
            TokenError::IpMismatch => ApiErrorCode::IpMismatch,
            // an unknown pair id on the wire is just an invalid token
            // as far as the caller is concerned
            TokenError::RecordNotFound => ApiErrorCode::InvalidToken,
            TokenError::Conflict => ApiErrorCode::internal("pair id collision"),
            TokenError::Store(e) => ApiErrorCode::internal(e),
            TokenError::InternalError(e) => ApiErrorCode::internal(e),
        }
    }
}
