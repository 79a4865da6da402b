//! HTTP API for faucet service

use crate::error::{FaucetError, FaucetResult};
use crate::limiter::client_key;
use crate::service::{ClaimRequest, FaucetInfo, FaucetService};
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Claim request, taken from the query string or a JSON body
#[derive(Debug, Default, Deserialize)]
pub struct ClaimParams {
    pub address: Option<String>,
}

/// Message response
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

fn read_address(params: ClaimParams, body: &Bytes) -> FaucetResult<String> {
    if let Some(address) = params.address {
        return Ok(address);
    }
    if body.is_empty() {
        return Err(FaucetError::InvalidAddress("missing address".to_string()));
    }
    serde_json::from_slice::<ClaimParams>(body)
        .map_err(|e| FaucetError::InvalidAddress(format!("malformed request body: {}", e)))?
        .address
        .ok_or_else(|| FaucetError::InvalidAddress("missing address".to_string()))
}

/// Claim handler
pub async fn claim_handler(
    State(service): State<Arc<FaucetService>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    query: Result<Query<ClaimParams>, QueryRejection>,
    body: Bytes,
) -> Response {
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => {
            return FaucetError::InvalidAddress(format!(
                "malformed query: {}",
                rejection.body_text()
            ))
            .into_response()
        }
    };
    let address = match read_address(params, &body) {
        Ok(address) => address,
        Err(e) => return e.into_response(),
    };
    let client = client_key(&headers, remote, service.config().proxy_count);

    match service.claim(ClaimRequest::new(client, address)).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: outcome.message(),
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Info handler
pub async fn info_handler(State(service): State<Arc<FaucetService>>) -> Json<FaucetInfo> {
    Json(service.info())
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Prometheus metrics handler
pub async fn metrics_handler(State(service): State<Arc<FaucetService>>) -> FaucetResult<String> {
    service.metrics().gather()
}

pub fn build_router(service: Arc<FaucetService>) -> Router {
    let cors_enabled = service.config().cors_enabled;

    let mut app = Router::new()
        .route("/api/claim", post(claim_handler))
        .route("/api/info", get(info_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(service)
        .layer(TraceLayer::new_for_http());

    if cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}
