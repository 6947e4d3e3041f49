use chrono::{DateTime, Utc};
use serde::Serialize;

/// Where the raw upload lives and what the store reported about it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageInfo {
    /// Object store key, or an `http(s)` URL for remotely hosted files.
    pub location: String,
    pub bytes: u64,
    pub format: String,
}

/// Metadata persisted for each uploaded spreadsheet. Sheet contents are not
/// stored here; they are re-read from storage on every analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub filename: String,
    pub original_name: String,
    pub upload_date: DateTime<Utc>,
    pub sheet_name: String,
    pub headers: Vec<String>,
    pub row_count: usize,
    pub column_count: usize,
    pub file_size: u64,
    pub user_id: String,
    pub storage: StorageInfo,
}
