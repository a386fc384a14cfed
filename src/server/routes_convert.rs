//! The /convert route: accept one uploaded audio file, encode it to every
//! configured bitrate, answer exactly once.

use crate::convert::ConvertError;
use crate::server::AppContext;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::path::Path;

/// Multipart field carrying the audio payload
const UPLOAD_FIELD: &str = "music";

#[derive(Serialize)]
pub struct ConvertResponse {
    pub message: String,
    /// Paths under /output, one per bitrate
    pub outputs: Vec<String>,
}

pub async fn convert(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<Json<ConvertResponse>, (StatusCode, String)> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read upload: {}", e)))?;
        upload = Some((file_name, data.to_vec()));
        break;
    }

    let Some((file_name, data)) = upload else {
        return Err(error_response(&ConvertError::InputMissing));
    };

    // Stage the upload under its own base name so the output variants
    // derive their names from it.
    let staging = tempfile::tempdir_in(&ctx.config.encoder.work_dir)
        .map_err(|e| internal(format!("Failed to stage upload: {}", e)))?;
    let source = staging.path().join(sanitize_file_name(&file_name));
    tokio::fs::write(&source, &data)
        .await
        .map_err(|e| internal(format!("Failed to stage upload: {}", e)))?;

    let result = ctx
        .conversion
        .convert(&source)
        .await
        .map_err(|e| error_response(&e))?;

    let outputs = result
        .outputs
        .iter()
        .filter_map(|path| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .map(|name| format!("/output/{}/{}", result.request_id, name))
        .collect();

    Ok(Json(ConvertResponse {
        message: "Conversion completed.".to_string(),
        outputs,
    }))
}

fn error_response(error: &ConvertError) -> (StatusCode, String) {
    let status = if error.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, error.to_string())
}

fn internal(message: String) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, message)
}

/// Reduce a client-supplied file name to its final component.
fn sanitize_file_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .unwrap_or("upload")
        .to_string()
}
