use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use dotenvy::dotenv;

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub max_file_size: usize,
    /// Root directory of the local object store.
    pub upload_dir: PathBuf,
    /// SQLite file for upload metadata, or `:memory:`.
    pub database_path: String,
    /// Key prefix for stored uploads.
    pub upload_folder: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_file_size: default_max_file_size(),
            upload_dir: PathBuf::from("uploads"),
            database_path: "analytics.db".to_string(),
            upload_folder: "excel-uploads".to_string(),
        }
    }
}

fn env_parsed<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let defaults = Config::default();
        Ok(Config {
            bind_addr: env_parsed("BIND_ADDR", defaults.bind_addr)?,
            max_file_size: env_parsed("MAX_FILE_SIZE", defaults.max_file_size)?,
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            database_path: std::env::var("DATABASE_PATH").unwrap_or(defaults.database_path),
            upload_folder: std::env::var("UPLOAD_FOLDER").unwrap_or(defaults.upload_folder),
        })
    }
}

pub fn load_config() -> Result<Config> {
    let config = Config::from_env()?;
    tracing::info!(
        "Configuration loaded: bind={}, upload_dir={}, database={}, max_file_size={}KB",
        config.bind_addr,
        config.upload_dir.display(),
        config.database_path,
        config.max_file_size / 1024
    );
    Ok(config)
}
