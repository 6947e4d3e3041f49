use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use tokio::io::AsyncWriteExt;

use crate::error::AppError;

/// Where and how big a stored object ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub key: String,
    pub bytes: u64,
    pub format: String,
}

/// Raw upload storage. Keys map to files below `root`; locations that are
/// `http(s)` URLs are fetched remotely instead.
pub struct FileStore {
    root: PathBuf,
    client: Client,
    max_remote_bytes: usize,
}

/// Parses `location` as an `http(s)` URL. Object store keys yield `None`.
pub fn remote_url(location: &str) -> Option<Url> {
    Url::parse(location)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

/// Last non-empty path segment of a URL, e.g. `sales.xlsx`.
pub fn remote_file_name(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
}

/// Lowercased extension of a file name or key, empty when there is none.
pub fn file_extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default()
}

fn clean_stem(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// `<folder>/<millis>-<id>-<stem>.<ext>`, with the stem reduced to safe
/// characters. The file id keeps keys unique across uploads of the same name.
pub fn object_key(folder: &str, file_id: &str, original_name: &str, now: DateTime<Utc>) -> String {
    let stem = Path::new(original_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .map(clean_stem)
        .unwrap_or_else(|| "upload".to_string());

    let name = format!(
        "{}-{}-{}.{}",
        now.timestamp_millis(),
        file_id,
        stem,
        file_extension(original_name)
    );
    if folder.is_empty() {
        name
    } else {
        format!("{}/{}", folder.trim_matches('/'), name)
    }
}

impl FileStore {
    pub async fn new(root: impl Into<PathBuf>, max_remote_bytes: usize) -> Result<Self, AppError> {
        Self::with_client(root, Client::new(), max_remote_bytes).await
    }

    pub async fn with_client(
        root: impl Into<PathBuf>,
        client: Client,
        max_remote_bytes: usize,
    ) -> Result<Self, AppError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        tracing::info!("Object store rooted at {}", root.display());

        Ok(Self {
            root,
            client,
            max_remote_bytes,
        })
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(AppError::InvalidInput(format!("Invalid storage key: {}", key)));
        }
        Ok(self.root.join(relative))
    }

    /// Writes a new object. Existing keys are never overwritten.
    pub async fn put(&self, key: &str, data: &[u8]) -> Result<StoredObject, AppError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create {}: {}", key, e);
                if e.kind() == ErrorKind::AlreadyExists {
                    AppError::Internal(format!("Storage key already in use: {}", key))
                } else {
                    AppError::IoError(e)
                }
            })?;
        file.write_all(data).await?;
        file.flush().await?;

        tracing::info!("Stored {} ({}KB)", key, data.len() / 1024);
        Ok(StoredObject {
            key: key.to_string(),
            bytes: data.len() as u64,
            format: file_extension(key),
        })
    }

    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.resolve(key)?;
        tokio::fs::remove_file(&path).await?;
        tracing::info!("Removed {}", key);
        Ok(())
    }

    /// Fetches the raw bytes behind a record's storage location.
    pub async fn get(&self, location: &str) -> Result<Bytes, AppError> {
        let start = std::time::Instant::now();
        let data = match remote_url(location) {
            Some(url) => self.fetch_remote(url).await?,
            None => {
                let path = self.resolve(location)?;
                let contents = tokio::fs::read(&path).await.map_err(|e| {
                    AppError::UpstreamFetch(format!("Failed to read stored file {}: {}", location, e))
                })?;
                Bytes::from(contents)
            }
        };

        tracing::debug!("Fetched {} ({} bytes) in {:?}", location, data.len(), start.elapsed());
        Ok(data)
    }

    async fn fetch_remote(&self, url: Url) -> Result<Bytes, AppError> {
        let too_large = || {
            AppError::PayloadTooLarge(format!(
                "Remote file exceeds the {}KB limit",
                self.max_remote_bytes / 1024
            ))
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| AppError::UpstreamFetch(format!("Failed to fetch {}: {}", url, e)))?;

        if response
            .content_length()
            .map_or(false, |len| len > self.max_remote_bytes as u64)
        {
            return Err(too_large());
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| AppError::UpstreamFetch(format!("Failed to read {}: {}", url, e)))?;
        if data.len() > self.max_remote_bytes {
            return Err(too_large());
        }
        Ok(data)
    }
}
