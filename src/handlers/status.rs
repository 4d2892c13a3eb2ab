//! Liveness and build information.

use axum::http::StatusCode;
use serde_json::json;

use crate::handlers::HandlerResult;
use crate::http::{NormalizedRequest, NormalizedResponse};

/// `GET /health`. Never touches external state and never fails.
pub async fn health(_req: NormalizedRequest) -> HandlerResult {
    Ok(NormalizedResponse::json(StatusCode::OK, json!({ "status": "ok" })))
}

/// `GET /ping`.
pub async fn ping(_req: NormalizedRequest) -> HandlerResult {
    Ok(NormalizedResponse::text(StatusCode::OK, "pong"))
}

/// `GET /versao`.
pub async fn versao(_req: NormalizedRequest) -> HandlerResult {
    Ok(NormalizedResponse::json(
        StatusCode::OK,
        json!({
            "nome": env!("CARGO_PKG_NAME"),
            "versao": env!("CARGO_PKG_VERSION"),
        }),
    ))
}
