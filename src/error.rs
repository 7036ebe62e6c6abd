use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid GPX: {0}")]
    InvalidGpx(String),
    #[error("Track point has a missing or non-numeric {0} attribute")]
    InvalidCoordinate(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Insufficient data points (need at least 2, got {0})")]
    InsufficientPoints(usize),
    #[error("Insufficient timestamped points (need at least 2, got {0})")]
    InsufficientTimedPoints(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum SeriesError {
    #[error("Activity has no trackpoints")]
    NoTrackpoints,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Activity not found: {0}")]
    NotFound(uuid::Uuid),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("store operation timed out")]
    Timeout,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Series(#[from] SeriesError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Parse(_) | AppError::Process(_) => {
                tracing::warn!(error = %self, "GPX import rejected");
                (StatusCode::BAD_REQUEST, format!("failed to import gpx: {}", self))
            }
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Series(_) | AppError::Store(StoreError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            AppError::Store(err) => {
                tracing::error!(error = %err, "Store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error".to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
