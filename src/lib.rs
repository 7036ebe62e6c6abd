//! GPX activity ingestion: flattens uploaded tracks, derives distance, speed
//! and heart-rate summaries, stores them in PostGIS and serves them back as
//! chart-ready series.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod routes;
pub mod state;
pub mod store;
pub mod types;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Full HTTP surface with the shared layers applied.
pub fn app(state: state::AppState) -> Router {
    let max_file_size = state.config.max_file_size;

    Router::new()
        .merge(routes::health::router())
        .merge(routes::upload::router())
        .merge(routes::activities::router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(axum::extract::DefaultBodyLimit::max(max_file_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
