//! blockgrid-api — REST surface for distributed block multiplication.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/multiply` | Multiply two uploaded matrices |
//! | GET | `/healthz` | Liveness probe |

pub mod handlers;

use axum::Router;
use axum::routing::{get, post};
use blockgrid_core::DispatchConfig;

/// Shared state for API handlers.
///
/// Carries the dispatch configuration rather than a live pool: each
/// multiply request builds its own pool, so concurrent requests run
/// their sizing cycles independently.
#[derive(Clone)]
pub struct ApiState {
    pub dispatch: DispatchConfig,
}

/// Build the API router.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/multiply", post(handlers::multiply))
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
}
