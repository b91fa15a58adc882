use crate::LookupBy;
use std::path::PathBuf;

/// Coarse classification of a [`CatalogError`].
///
/// Callers such as the HTTP layer branch on this rather than on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The uploaded content is not an image
    InvalidMediaType,
    /// A selector or name supplied by the caller is malformed
    InvalidParameter,
    /// Another record already uses the requested name
    DuplicateName,
    /// No such record, or the record's file is missing
    NotFound,
    /// Unexpected I/O or metadata-store failure
    StorageFailure,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("file must be an image, got content type '{0}'")]
    InvalidMediaType(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("an image with name '{0}' already exists")]
    DuplicateName(String),
    #[error("image not found with {by} '{key}'")]
    NotFound { by: LookupBy, key: String },
    #[error("image file not found: {}", path.display())]
    FileMissing { path: PathBuf },

    #[error("storage failure: {0}")]
    Files(#[from] imghost_files::FilesError),
    #[error("metadata store failure: {0}")]
    Metadata(#[from] rusqlite::Error),
    #[error("failed to create metadata directory: {0}")]
    MetadataDirCreation(std::io::Error),
    #[error("stored record has a malformed field: '{0}'")]
    CorruptRecord(String),
    #[error(
        "store failed and cleanup also failed (path: {path}): store={store_error}; cleanup={cleanup_error}",
        path = path.display()
    )]
    CleanupAfterStoreFailed {
        path: PathBuf,
        #[source]
        store_error: Box<CatalogError>,
        cleanup_error: imghost_files::FilesError,
    },
    #[error("blocking task failed: {0}")]
    Task(String),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::InvalidMediaType(_) => ErrorKind::InvalidMediaType,
            CatalogError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            CatalogError::DuplicateName(_) => ErrorKind::DuplicateName,
            CatalogError::NotFound { .. } | CatalogError::FileMissing { .. } => {
                ErrorKind::NotFound
            }
            CatalogError::Files(_)
            | CatalogError::Metadata(_)
            | CatalogError::MetadataDirCreation(_)
            | CatalogError::CorruptRecord(_)
            | CatalogError::CleanupAfterStoreFailed { .. }
            | CatalogError::Task(_) => ErrorKind::StorageFailure,
        }
    }
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
