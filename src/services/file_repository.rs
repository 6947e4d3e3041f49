use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use tracing::{debug, error, info};

use crate::error::AppError;
use crate::models::{FileRecord, StorageInfo};

const CREATE_FILES_TABLE: &str = "CREATE TABLE IF NOT EXISTS files (
    id TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    original_name TEXT NOT NULL,
    upload_date TEXT NOT NULL,
    sheet_name TEXT NOT NULL,
    headers TEXT NOT NULL,
    row_count INTEGER NOT NULL,
    column_count INTEGER NOT NULL,
    file_size INTEGER NOT NULL,
    user_id TEXT NOT NULL,
    storage_location TEXT NOT NULL,
    storage_bytes INTEGER NOT NULL,
    storage_format TEXT NOT NULL
)";

const SELECT_COLUMNS: &str = "id, filename, original_name, upload_date, sheet_name, headers, \
    row_count, column_count, file_size, user_id, storage_location, storage_bytes, storage_format";

/// Upload metadata kept in SQLite.
pub struct FileRepository {
    conn: Mutex<Connection>,
}

fn conversion_error(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    let upload_date: String = row.get(3)?;
    let upload_date = DateTime::parse_from_rfc3339(&upload_date)
        .map_err(|e| conversion_error(3, e))?
        .with_timezone(&Utc);

    let headers: String = row.get(5)?;
    let headers: Vec<String> = serde_json::from_str(&headers).map_err(|e| conversion_error(5, e))?;

    Ok(FileRecord {
        id: row.get(0)?,
        filename: row.get(1)?,
        original_name: row.get(2)?,
        upload_date,
        sheet_name: row.get(4)?,
        headers,
        row_count: row.get::<_, i64>(6)? as usize,
        column_count: row.get::<_, i64>(7)? as usize,
        file_size: row.get::<_, i64>(8)? as u64,
        user_id: row.get(9)?,
        storage: StorageInfo {
            location: row.get(10)?,
            bytes: row.get::<_, i64>(11)? as u64,
            format: row.get(12)?,
        },
    })
}

impl FileRepository {
    /// Opens (or creates) the metadata database. `:memory:` keeps it in RAM.
    pub fn open(path: &str) -> Result<Self, AppError> {
        info!("Opening metadata database: {}", path);
        let conn = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(|e| {
            error!("Failed to open metadata database: {}", e);
            AppError::DatabaseError(e.to_string())
        })?;

        conn.execute(CREATE_FILES_TABLE, [])?;
        debug!("Metadata schema ready");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn insert(&self, record: &FileRecord) -> Result<(), AppError> {
        let headers = serde_json::to_string(&record.headers)?;
        let conn = self.conn.lock();

        conn.execute(
            "INSERT INTO files (id, filename, original_name, upload_date, sheet_name, headers, \
             row_count, column_count, file_size, user_id, storage_location, storage_bytes, storage_format) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                record.id,
                record.filename,
                record.original_name,
                record.upload_date.to_rfc3339_opts(SecondsFormat::Millis, true),
                record.sheet_name,
                headers,
                record.row_count as i64,
                record.column_count as i64,
                record.file_size as i64,
                record.user_id,
                record.storage.location,
                record.storage.bytes as i64,
                record.storage.format,
            ],
        )
        .map_err(|e| {
            error!("Failed to insert file record {}: {}", record.id, e);
            AppError::DatabaseError(e.to_string())
        })?;

        info!("Saved metadata for file {} ({})", record.id, record.original_name);
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> Result<Option<FileRecord>, AppError> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM files WHERE id = ?1", SELECT_COLUMNS);
        let record = conn
            .query_row(&sql, params![id], record_from_row)
            .optional()?;

        debug!("Lookup for file {}: found={}", id, record.is_some());
        Ok(record)
    }

    /// All records, newest first, optionally limited to one user.
    pub fn list(&self, user_id: Option<&str>) -> Result<Vec<FileRecord>, AppError> {
        let conn = self.conn.lock();

        let records = match user_id {
            Some(user_id) => {
                let sql = format!(
                    "SELECT {} FROM files WHERE user_id = ?1 ORDER BY upload_date DESC",
                    SELECT_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![user_id], record_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let sql = format!("SELECT {} FROM files ORDER BY upload_date DESC", SELECT_COLUMNS);
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map([], record_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };

        debug!("Listed {} file records", records.len());
        Ok(records)
    }
}
