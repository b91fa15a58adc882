//! Constants used throughout the image host core crate.

/// Default storage directory when no explicit directory is configured.
pub const DEFAULT_STORAGE_DIR: &str = "images";

/// Default SQLite database file when no explicit path is configured.
pub const DEFAULT_DATABASE_PATH: &str = "images.db";

/// Default largest accepted upload body, in bytes (25 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Default time a metadata operation waits on a locked database, in milliseconds.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Media type prefix every upload must carry.
pub const IMAGE_MEDIA_TYPE_PREFIX: &str = "image/";
