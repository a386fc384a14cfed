//! The /upload route: proxy a produced output file to the blob store.

use crate::server::AppContext;
use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use std::path::{Component, Path};

#[derive(Deserialize)]
pub struct UploadRequest {
    /// Path of the file below the output root, e.g.
    /// `{request_id}/track-160.opus`
    pub file_name: String,
}

pub async fn upload(
    State(ctx): State<AppContext>,
    Json(payload): Json<UploadRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let Some(store) = &ctx.store else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "Blob store not configured".to_string(),
        ));
    };

    let relative = Path::new(&payload.file_name);
    // Only plain components; no escaping the output root
    if relative.components().any(|c| !matches!(c, Component::Normal(_))) {
        return Err((StatusCode::BAD_REQUEST, "Invalid file name".to_string()));
    }

    let path = ctx.config.encoder.output_dir.join(relative);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err((StatusCode::NOT_FOUND, "File not found".to_string()));
        }
        Err(e) => {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to read file: {}", e),
            ));
        }
    };

    let name = relative
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| payload.file_name.clone());

    let handle = store.store(&name, bytes).await.map_err(|e| {
        tracing::error!(file = %payload.file_name, error = %e, "blob store upload failed");
        (StatusCode::BAD_GATEWAY, e.to_string())
    })?;

    Ok(Json(handle))
}
