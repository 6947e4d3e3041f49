use std::sync::Arc;

use axum::{
    extract::{
        multipart::MultipartError, rejection::JsonRejection, DefaultBodyLimit, Multipart, Path,
        Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::FileRecord,
    services::{
        analytics::types::Row,
        file_processor::{self, LoadedFile, RemoteFile, Upload},
    },
    AppState,
};

/// Room for the multipart framing around the file itself.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn routes(max_file_size: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::max(max_file_size + MULTIPART_OVERHEAD)),
        )
        .route("/upload/remote", post(register_remote))
        .route("/upload/files", get(list_files))
        .route("/upload/files/:id", get(get_file))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
    filename: String,
    rows: usize,
    columns: usize,
    headers: Vec<String>,
    file_size: u64,
    storage_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    success: bool,
    message: String,
    file_id: String,
    data: Vec<Row>,
    metadata: UploadMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRequest {
    url: String,
    filename: Option<String>,
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FileList {
    files: Vec<FileRecord>,
}

#[derive(Debug, Serialize)]
pub struct FileEnvelope {
    file: FileRecord,
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::InvalidInput(format!("Malformed upload: {}", err.body_text()))
    }
}

async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut file: Option<(String, bytes::Bytes)> = None;
    let mut user_id = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                let name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::InvalidInput("Uploaded file has no name".to_string()))?;
                let data = field.bytes().await.map_err(multipart_error)?;
                tracing::info!("Received upload {} ({}KB)", name, data.len() / 1024);
                file = Some((name, data));
            }
            Some("userId") => {
                user_id = Some(field.text().await.map_err(multipart_error)?);
            }
            other => {
                tracing::debug!("Ignoring multipart field {:?}", other);
            }
        }
    }

    let (original_name, data) =
        file.ok_or_else(|| AppError::InvalidInput("No file uploaded".to_string()))?;

    let loaded = file_processor::ingest_upload(
        &state,
        Upload {
            original_name,
            data,
            user_id,
        },
    )
    .await?;

    Ok(Json(upload_response(
        loaded,
        "File uploaded, processed, and stored successfully",
    )))
}

async fn register_remote(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RemoteRequest>, JsonRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let Json(request) = body?;

    let loaded = file_processor::register_remote(
        &state,
        RemoteFile {
            url: request.url,
            original_name: request.filename,
            user_id: request.user_id,
        },
    )
    .await?;

    Ok(Json(upload_response(
        loaded,
        "Remote file registered and processed successfully",
    )))
}

fn upload_response(loaded: LoadedFile, message: &str) -> UploadResponse {
    let record = loaded.record;
    UploadResponse {
        success: true,
        message: message.to_string(),
        file_id: record.id,
        data: loaded.table.rows,
        metadata: UploadMetadata {
            filename: record.original_name,
            rows: record.row_count,
            columns: record.column_count,
            headers: record.headers,
            file_size: record.file_size,
            storage_key: record.storage.location,
        },
    }
}

async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<FileList>, AppError> {
    let user_id = query.user_id.as_deref().filter(|u| !u.is_empty());
    let files = state.files.list(user_id)?;
    tracing::info!("Listing {} files (user filter: {:?})", files.len(), user_id);
    Ok(Json(FileList { files }))
}

async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FileEnvelope>, AppError> {
    let file = state
        .files
        .find_by_id(&id)?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;
    Ok(Json(FileEnvelope { file }))
}
