use axum::extract::{Path, Query, State};
use axum::{routing::get, Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::pipeline::series;
use crate::state::AppState;
use crate::store;
use crate::types::series::{ActivityPage, TrackResponse};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 200;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/activities", get(list_activities))
        .route("/api/activities/:id/track", get(activity_track))
}

/// Raw query values; anything unparsable falls back to the defaults.
#[derive(Debug, Deserialize)]
struct PageParams {
    limit: Option<String>,
    offset: Option<String>,
}

impl PageParams {
    fn limit(&self) -> i64 {
        self.limit
            .as_deref()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|n| (1..=MAX_LIMIT).contains(n))
            .unwrap_or(DEFAULT_LIMIT)
    }

    fn offset(&self) -> i64 {
        self.offset
            .as_deref()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|n| *n >= 0)
            .unwrap_or(0)
    }
}

async fn list_activities(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<ActivityPage>, AppError> {
    let limit = params.limit();
    let offset = params.offset();

    let items = store::with_deadline(
        state.config.store_timeout,
        state.store.list_activities(limit, offset),
    )
    .await?;

    Ok(Json(ActivityPage {
        limit,
        offset,
        items,
    }))
}

async fn activity_track(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TrackResponse>, AppError> {
    let id = Uuid::parse_str(&id).map_err(|_| AppError::BadRequest("bad id".to_string()))?;
    let deadline = state.config.store_timeout;

    let activity = store::with_deadline(deadline, state.store.fetch_activity(id)).await?;
    let points = store::with_deadline(deadline, state.store.fetch_points(id)).await?;

    tracing::debug!("Assembling track {} from {} points", id, points.len());

    Ok(Json(series::assemble(id, activity, &points)?))
}
