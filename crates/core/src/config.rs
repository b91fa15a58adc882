//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the catalog. Request
//! handling never reads process-wide environment variables, which keeps behaviour consistent in
//! multi-threaded runtimes and test harnesses.

use crate::constants::{
    DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_DATABASE_PATH, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_STORAGE_DIR,
};
use crate::{CatalogError, CatalogResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoreConfig {
    storage_dir: PathBuf,
    database_path: PathBuf,
    busy_timeout: Duration,
    max_upload_bytes: usize,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidParameter`] if either path is empty or the upload limit is
    /// zero.
    pub fn new(
        storage_dir: PathBuf,
        database_path: PathBuf,
        busy_timeout: Duration,
        max_upload_bytes: usize,
    ) -> CatalogResult<Self> {
        if storage_dir.as_os_str().is_empty() {
            return Err(CatalogError::InvalidParameter(
                "storage_dir cannot be empty".into(),
            ));
        }
        if database_path.as_os_str().is_empty() {
            return Err(CatalogError::InvalidParameter(
                "database_path cannot be empty".into(),
            ));
        }
        if max_upload_bytes == 0 {
            return Err(CatalogError::InvalidParameter(
                "max_upload_bytes must be greater than zero".into(),
            ));
        }

        Ok(Self {
            storage_dir,
            database_path,
            busy_timeout,
            max_upload_bytes,
        })
    }

    /// Build a configuration from raw, optional environment values.
    ///
    /// `None`, empty or whitespace-only values fall back to the defaults in
    /// [`crate::constants`].
    pub fn from_env_values(
        storage_dir: Option<String>,
        database_path: Option<String>,
        busy_timeout_ms: Option<String>,
        max_upload_bytes: Option<String>,
    ) -> CatalogResult<Self> {
        let storage_dir = non_blank(storage_dir).unwrap_or_else(|| DEFAULT_STORAGE_DIR.into());
        let database_path =
            non_blank(database_path).unwrap_or_else(|| DEFAULT_DATABASE_PATH.into());
        let busy_timeout_ms =
            parse_number("busy_timeout_ms", busy_timeout_ms)?.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS);
        let max_upload_bytes = parse_number("max_upload_bytes", max_upload_bytes)?
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Self::new(
            PathBuf::from(storage_dir),
            PathBuf::from(database_path),
            Duration::from_millis(busy_timeout_ms),
            max_upload_bytes,
        )
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_number<T: FromStr>(field: &str, value: Option<String>) -> CatalogResult<Option<T>> {
    non_blank(value)
        .map(|v| {
            v.parse::<T>().map_err(|_| {
                CatalogError::InvalidParameter(format!("{field} must be a whole number, got '{v}'"))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = CoreConfig::from_env_values(None, None, None, None).unwrap();
        assert_eq!(cfg, CoreConfig::default());
        assert_eq!(cfg.storage_dir(), Path::new("images"));
        assert_eq!(cfg.database_path(), Path::new("images.db"));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let cfg = CoreConfig::from_env_values(
            Some("  ".into()),
            Some(String::new()),
            Some(" ".into()),
            None,
        )
        .unwrap();
        assert_eq!(cfg, CoreConfig::default());
    }

    #[test]
    fn explicit_values_are_used() {
        let cfg = CoreConfig::from_env_values(
            Some("/srv/images".into()),
            Some("/var/lib/imghost/catalog.db".into()),
            Some("250".into()),
            Some("1024".into()),
        )
        .unwrap();

        assert_eq!(cfg.storage_dir(), Path::new("/srv/images"));
        assert_eq!(cfg.database_path(), Path::new("/var/lib/imghost/catalog.db"));
        assert_eq!(cfg.busy_timeout(), Duration::from_millis(250));
        assert_eq!(cfg.max_upload_bytes(), 1024);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = CoreConfig::from_env_values(None, None, Some("soon".into()), None).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidParameter(msg) if msg.contains("busy_timeout_ms")));
    }

    #[test]
    fn zero_upload_limit_is_rejected() {
        let result = CoreConfig::new(
            PathBuf::from("images"),
            PathBuf::from("images.db"),
            Duration::from_secs(1),
            0,
        );
        assert!(matches!(result, Err(CatalogError::InvalidParameter(_))));
    }
}
