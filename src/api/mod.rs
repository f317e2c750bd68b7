//! Axum HTTP surface. Handlers are thin adapters over [`crate::search::pipeline`].

pub mod health;
pub mod search;

use anyhow::Context;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::state::AppState;

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(health::health_check))
        .route("/api/search", post(search::search))
        .route("/search", post(search::search))
        .layer(cors)
        .with_state(state)
}

/// CORS policy for `origins`. A `*` entry allows any origin.
pub fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    if origins.iter().any(|o| o == "*") {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(exposed_headers()));
    }

    let origins = origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin: {o}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers(exposed_headers()))
}

/// Let browsers read the hydration counts on search responses.
fn exposed_headers() -> [HeaderName; 2] {
    [
        HeaderName::from_static(search::RESULTS_REQUESTED_HEADER),
        HeaderName::from_static(search::RESULTS_HYDRATED_HEADER),
    ]
}
