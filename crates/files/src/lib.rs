//! Image host file storage
//!
//! This crate owns the storage directory: the flat folder holding one file per catalogued
//! image. It knows nothing about the metadata store; the catalog decides *when* a file is
//! written or removed, this crate decides *how*.
//!
//! ## Storage Model
//!
//! ```text
//! <storage_root>/
//! ├── cat.png
//! ├── dog.jpg
//! └── .upload-XXXXXX.part   # in-flight write, renamed into place when complete
//! ```
//!
//! - Files are addressed by a single filename component; nested paths are rejected
//! - Writes are whole-file replacements staged in a temporary file in the same directory
//! - Readers never observe a partially written file under its final name
//!
//! ## Example Usage
//!
//! ```no_run
//! use imghost_files::FilesService;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = FilesService::create(Path::new("images"))?;
//! let staged = service.stage(&b"PNGDATA"[..])?;
//! let path = service.place(staged, "cat.png")?;
//! assert!(service.exists(&path));
//! # Ok(())
//! # }
//! ```

mod files;

pub use files::{FilesService, StagedFile, STAGING_PREFIX};

/// Errors that can occur during file operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory does not exist or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// Path validation failed (potential directory traversal or unsafe path)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for file operations.
pub type FilesResult<T> = Result<T, FilesError>;
