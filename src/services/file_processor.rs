use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{FileRecord, StorageInfo};
use crate::services::analytics::types::Table;
use crate::services::sheet_parser::{self, ParsedSheet, SheetFormat};
use crate::services::storage;
use crate::AppState;

/// A stored upload re-read from storage, ready for analysis.
#[derive(Debug)]
pub struct LoadedFile {
    pub record: FileRecord,
    pub table: Table,
}

#[derive(Debug)]
pub struct Upload {
    pub original_name: String,
    pub data: Bytes,
    pub user_id: Option<String>,
}

/// A spreadsheet that stays hosted elsewhere and is fetched on every analysis.
#[derive(Debug)]
pub struct RemoteFile {
    pub url: String,
    pub original_name: Option<String>,
    pub user_id: Option<String>,
}

/// Looks up a file record and parses the raw upload behind it.
pub async fn load_file_table(state: &AppState, file_id: &str) -> Result<LoadedFile, AppError> {
    let record = state
        .files
        .find_by_id(file_id)?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    tracing::info!("Loading {} from {}", record.original_name, record.storage.location);
    let data = state.store.get(&record.storage.location).await?;

    let format = SheetFormat::from_filename(&record.original_name)
        .map_err(|e| AppError::UpstreamFetch(e.to_string()))?;
    let parsed = sheet_parser::parse_sheet(&data, format).map_err(|e| {
        tracing::error!("Stored file {} could not be parsed: {}", record.id, e);
        AppError::UpstreamFetch(format!("Failed to parse stored file: {}", e))
    })?;

    Ok(LoadedFile {
        record,
        table: parsed.table,
    })
}

fn check_size(state: &AppState, len: usize) -> Result<(), AppError> {
    if len > state.config.max_file_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File exceeds the {}MB limit",
            state.config.max_file_size / (1024 * 1024)
        )));
    }
    Ok(())
}

fn new_record(
    id: String,
    now: DateTime<Utc>,
    original_name: String,
    parsed: &ParsedSheet,
    file_size: usize,
    user_id: Option<String>,
    storage: StorageInfo,
) -> FileRecord {
    FileRecord {
        id,
        filename: storage.location.clone(),
        original_name,
        upload_date: now,
        sheet_name: parsed.sheet_name.clone(),
        headers: parsed.table.headers.clone(),
        row_count: parsed.table.rows.len(),
        column_count: parsed.table.headers.len(),
        file_size: file_size as u64,
        user_id: user_id
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| "anonymous".to_string()),
        storage,
    }
}

/// Parses, stores and records a new upload. The file is parsed before anything
/// is written so unreadable uploads leave no trace.
pub async fn ingest_upload(state: &AppState, upload: Upload) -> Result<LoadedFile, AppError> {
    let start = std::time::Instant::now();

    check_size(state, upload.data.len())?;
    let format = SheetFormat::from_filename(&upload.original_name)?;
    let parsed = sheet_parser::parse_sheet(&upload.data, format)?;

    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let key = storage::object_key(&state.config.upload_folder, &id, &upload.original_name, now);
    let stored = state.store.put(&key, &upload.data).await?;

    let record = new_record(
        id,
        now,
        upload.original_name,
        &parsed,
        upload.data.len(),
        upload.user_id,
        StorageInfo {
            location: stored.key,
            bytes: stored.bytes,
            format: stored.format,
        },
    );

    if let Err(err) = state.files.insert(&record) {
        if let Err(cleanup) = state.store.delete(&key).await {
            tracing::warn!("Orphaned object {} left in store: {}", key, cleanup);
        }
        return Err(err);
    }

    tracing::info!(
        "Ingested {} as {} ({} rows) in {:?}",
        record.original_name,
        record.id,
        record.row_count,
        start.elapsed()
    );

    Ok(LoadedFile {
        record,
        table: parsed.table,
    })
}

/// Records a spreadsheet hosted at an `http(s)` URL. The file is fetched and
/// parsed once to validate it and capture its headers; nothing is copied into
/// the local store.
pub async fn register_remote(state: &AppState, remote: RemoteFile) -> Result<LoadedFile, AppError> {
    let start = std::time::Instant::now();

    let url = storage::remote_url(remote.url.trim())
        .ok_or_else(|| AppError::InvalidInput("Only http(s) URLs can be registered".to_string()))?;
    let original_name = remote
        .original_name
        .filter(|name| !name.trim().is_empty())
        .or_else(|| storage::remote_file_name(&url))
        .ok_or_else(|| AppError::InvalidInput("Could not determine a file name for the URL".to_string()))?;
    let format = SheetFormat::from_filename(&original_name)?;

    tracing::info!("Registering remote file {} from {}", original_name, url);
    let data = state.store.get(url.as_str()).await?;
    check_size(state, data.len())?;
    let parsed = sheet_parser::parse_sheet(&data, format)?;

    let storage = StorageInfo {
        location: url.to_string(),
        bytes: data.len() as u64,
        format: storage::file_extension(&original_name),
    };
    let record = new_record(
        Uuid::new_v4().to_string(),
        Utc::now(),
        original_name,
        &parsed,
        data.len(),
        remote.user_id,
        storage,
    );
    state.files.insert(&record)?;

    tracing::info!(
        "Registered {} as {} ({} rows) in {:?}",
        record.original_name,
        record.id,
        record.row_count,
        start.elapsed()
    );

    Ok(LoadedFile {
        record,
        table: parsed.table,
    })
}
