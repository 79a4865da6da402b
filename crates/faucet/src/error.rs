//! Error types for the faucet service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Faucet service errors
#[derive(Error, Debug)]
pub enum FaucetError {
    #[error("You have exceeded the rate limit. Please wait {} before you try again", format_wait(.0))]
    RateLimitExceeded(Duration),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("Faucet queue is too long, please try again later")]
    QueueFull,

    /// Raw collaborator error text, surfaced verbatim on the direct path
    #[error("{0}")]
    TransferFailed(String),

    #[error("transfer timed out after {}s", .0.as_secs())]
    TransferTimeout(Duration),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    InvalidPrivateKey(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl FaucetError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            FaucetError::RateLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            FaucetError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
            FaucetError::QueueFull => StatusCode::SERVICE_UNAVAILABLE,
            FaucetError::TransferFailed(_) | FaucetError::TransferTimeout(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            FaucetError::Rpc(_) => StatusCode::BAD_GATEWAY,
            FaucetError::InvalidConfig(_)
            | FaucetError::InvalidPrivateKey(_)
            | FaucetError::Metrics(_)
            | FaucetError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for FaucetError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "message": self.to_string() }));
        (status, body).into_response()
    }
}

/// Renders a wait time as `XhYmZs`, dropping leading zero units.
pub fn format_wait(wait: &Duration) -> String {
    let total = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

pub type FaucetResult<T> = Result<T, FaucetError>;
