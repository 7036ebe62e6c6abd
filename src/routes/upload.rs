use axum::extract::Multipart;
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::pipeline::{parse, process};
use crate::state::AppState;
use crate::store;
use crate::types::activity::FileFormat;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/upload", post(upload))
}

#[derive(Serialize, Deserialize)]
struct UploadResponse {
    id: Uuid,
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(format!("Failed to read multipart field: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            filename = field.file_name().map(|s| s.to_string());
            file_bytes = Some(field.bytes().await.map_err(|e| {
                AppError::BadRequest(format!("Failed to read file bytes: {}", e))
            })?.to_vec());
        }
    }

    let bytes = file_bytes
        .ok_or_else(|| AppError::BadRequest("missing form field 'file'".to_string()))?;
    let filename = filename.unwrap_or_default();

    let format = FileFormat::from_filename(&filename)
        .ok_or_else(|| AppError::BadRequest("only .gpx supported".to_string()))?;

    tracing::info!("Importing {} ({} bytes)", filename, bytes.len());

    let raw = parse::parse(&bytes, format)?;
    let processed = process::process(&raw)?;

    let id = store::with_deadline(
        state.config.store_timeout,
        state.store.insert_activity(&processed),
    )
    .await?;

    tracing::info!(
        "Imported {} as {} ({} points, {:.0} m, {} s)",
        filename,
        id,
        processed.points.len(),
        processed.summary.distance_m,
        processed.summary.duration_sec
    );

    Ok(Json(UploadResponse { id }))
}
