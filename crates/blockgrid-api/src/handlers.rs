//! REST API handlers.
//!
//! The multiply handler owns the full request cycle: parse the uploads,
//! build a fresh pool, run the decomposition, report the outcome.

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use blockgrid_core::{Block, parse_matrix};
use blockgrid_dispatch::{ClientPool, Dispatcher};
use blockgrid_engine::{EngineError, MultiplyEngine};
use tracing::{error, info};

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

/// Successful multiply payload.
#[derive(serde::Serialize)]
pub struct MultiplyReport {
    pub dimension: usize,
    pub deadline_ms: f64,
    pub elapsed_ms: f64,
    pub pool_size: usize,
    pub matrix: Vec<Vec<f64>>,
}

// ── Multiply ───────────────────────────────────────────────────

/// POST /multiply
///
/// Multipart form: files `A` and `B` holding whitespace-separated square
/// matrices, plus an optional `deadline` field in milliseconds.
pub async fn multiply(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut a: Option<Block> = None;
    let mut b: Option<Block> = None;
    let mut deadline_ms: Option<f64> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return error_response(
                    &format!("malformed multipart body: {e}"),
                    StatusCode::BAD_REQUEST,
                )
                .into_response();
            }
        };
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let text = match field.text().await {
            Ok(text) => text,
            Err(e) => {
                return error_response(
                    &format!("unreadable field {name:?}: {e}"),
                    StatusCode::BAD_REQUEST,
                )
                .into_response();
            }
        };
        match name.as_str() {
            "A" => match parse_matrix(&text) {
                Ok(block) => a = Some(block),
                Err(e) => {
                    return error_response(&format!("file \"A\": {e}"), StatusCode::BAD_REQUEST)
                        .into_response();
                }
            },
            "B" => match parse_matrix(&text) {
                Ok(block) => b = Some(block),
                Err(e) => {
                    return error_response(&format!("file \"B\": {e}"), StatusCode::BAD_REQUEST)
                        .into_response();
                }
            },
            "deadline" => match text.trim().parse::<f64>() {
                Ok(value) if value > 0.0 => deadline_ms = Some(value),
                _ => {
                    return error_response(
                        "deadline must be a positive number of milliseconds",
                        StatusCode::BAD_REQUEST,
                    )
                    .into_response();
                }
            },
            _ => {}
        }
    }

    let Some(a) = a else {
        return error_response("request is missing file \"A\"", StatusCode::BAD_REQUEST)
            .into_response();
    };
    let Some(b) = b else {
        return error_response("request is missing file \"B\"", StatusCode::BAD_REQUEST)
            .into_response();
    };
    let deadline_ms = deadline_ms.unwrap_or(state.dispatch.deadline_ms);

    // Every request gets its own pool and therefore its own footprint
    // measurement and sizing decision.
    let pool = match ClientPool::new(state.dispatch.clone()) {
        Ok(pool) => Arc::new(pool),
        Err(e) => {
            return error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
                .into_response();
        }
    };
    let engine = MultiplyEngine::new(Dispatcher::new(pool));

    let started = Instant::now();
    match engine.multiply(&a, &b, deadline_ms).await {
        Ok(product) => {
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            let pool_size = engine.dispatcher().pool().size().await;
            info!(
                dimension = product.dim(),
                deadline_ms, elapsed_ms, pool_size, "multiply served"
            );
            ApiResponse::ok(MultiplyReport {
                dimension: product.dim(),
                deadline_ms,
                elapsed_ms,
                pool_size,
                matrix: product.rows(),
            })
            .into_response()
        }
        Err(e @ (EngineError::DimensionMismatch { .. } | EngineError::NotPowerOfTwo(_))) => {
            error_response(&e.to_string(), StatusCode::BAD_REQUEST).into_response()
        }
        Err(EngineError::Dispatch(e)) => {
            error!(error = %e, "worker dispatch failed");
            error_response(&e.to_string(), StatusCode::BAD_GATEWAY).into_response()
        }
        Err(e) => {
            error!(error = %e, "multiply failed");
            error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response()
        }
    }
}

// ── Health ─────────────────────────────────────────────────────

/// GET /healthz
pub async fn healthz() -> &'static str {
    "ok"
}
