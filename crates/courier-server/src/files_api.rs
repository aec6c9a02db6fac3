//! HTTP surface over the file depot.
//!
//! Response bodies follow the `{ success, ... }` shape the depot's web
//! client expects; errors come back as `{ success: false, error }`.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use courier_files::{encode_component, FilesError};
use tokio_util::io::ReaderStream;

use crate::server::AppState;

/// GET /api/files: every regular file in the depot, sorted by name.
pub async fn list_files(State(state): State<AppState>) -> Response {
    match state.store.list().await {
        Ok(files) => {
            let total = files.len();
            Json(serde_json::json!({
                "success": true,
                "files": files,
                "totalFiles": total,
            }))
            .into_response()
        }
        Err(error) => {
            tracing::error!(%error, "Failed to list files");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to list files")
        }
    }
}

/// GET /api/file-info/{filename}: metadata for a single file.
pub async fn file_info(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    match state.store.metadata(&filename).await {
        Ok(file) => Json(serde_json::json!({
            "success": true,
            "file": file,
        }))
        .into_response(),
        Err(error) => files_error_response(error),
    }
}

/// GET /api/download/{filename}: stream file bytes as an attachment.
pub async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    let (file, entry) = match state.store.open(&filename).await {
        Ok(opened) => opened,
        Err(error) => return files_error_response(error),
    };

    tracing::debug!(name = %entry.name, size = entry.size, "Streaming download");

    let headers = [
        (header::CONTENT_TYPE, entry.mime_type.clone()),
        (header::CONTENT_LENGTH, entry.size.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", encode_component(&entry.name)),
        ),
    ];

    (headers, Body::from_stream(ReaderStream::new(file))).into_response()
}

fn files_error_response(error: FilesError) -> Response {
    let (status, message) = match &error {
        FilesError::NotFound(_) => (StatusCode::NOT_FOUND, "file not found"),
        FilesError::NotAFile(_) => (StatusCode::BAD_REQUEST, "not a regular file"),
        FilesError::OutsideRoot(_) => (StatusCode::FORBIDDEN, "access denied"),
        FilesError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "file access failed"),
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(%error, "File request failed");
    }
    error_response(status, message)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({ "success": false, "error": message })),
    )
        .into_response()
}
