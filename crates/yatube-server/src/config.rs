use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

/// Placeholder session secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub media_dir: PathBuf,
    pub jwt_secret: String,
    pub index_cache_ttl: Duration,
    pub max_upload_bytes: usize,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().with_context(|| format!("invalid {}: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

pub fn db_path() -> PathBuf {
    var_or("YATUBE_DB_PATH", "yatube.db").into()
}

impl Config {
    /// Read the configuration from `YATUBE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let jwt_secret = std::env::var("YATUBE_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("YATUBE_JWT_SECRET is unset or still a placeholder; set it in .env");
        }

        Ok(Self {
            host: var_or("YATUBE_HOST", "0.0.0.0"),
            port: parse_var("YATUBE_PORT", 8000)?,
            db_path: db_path(),
            media_dir: var_or("YATUBE_MEDIA_DIR", "./media").into(),
            jwt_secret,
            index_cache_ttl: Duration::from_secs(parse_var("YATUBE_INDEX_CACHE_SECS", 20)?),
            max_upload_bytes: parse_var("YATUBE_MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
        })
    }
}
