//! Storage-directory service implementation
//!
//! [`FilesService`] is bound to one storage root and performs every filesystem side effect of
//! the image catalog: writing uploaded bytes, checking that a catalogued file is present, and
//! removing files on delete.
//!
//! # Write Protocol
//!
//! A write happens in two steps. [`FilesService::stage`] streams the content into a temporary
//! file created inside the storage root; [`FilesService::place`] renames it over the final path.
//! The rename is atomic on the same filesystem, so the final filename either holds the previous
//! content or the complete new content. A staged file that is never placed is removed when it is
//! dropped.
//!
//! # Path Model
//!
//! - The root is kept exactly as configured (it is not canonicalised), so stored paths read
//!   like `images/cat.png` when the root is `images`
//! - Only single, normal filename components are accepted under the root
//! - Removal refuses paths whose parent is not the storage root

use crate::{FilesError, FilesResult};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

/// Filename prefix of in-flight staging files
pub const STAGING_PREFIX: &str = ".upload-";
const STAGING_SUFFIX: &str = ".part";

/// Content staged in the storage root under a temporary name.
///
/// Dropping it without calling [`FilesService::place`] removes the staging file.
#[derive(Debug)]
pub struct StagedFile {
    temp: tempfile::NamedTempFile,
}

/// Service for managing the files in one storage directory
#[derive(Debug, Clone)]
pub struct FilesService {
    /// Directory holding one file per stored image
    root_directory: PathBuf,
}

impl FilesService {
    /// Creates a `FilesService` for an existing storage directory
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidRootDirectory`] if the root does not exist or is not a
    /// directory.
    pub fn new(root_directory: &Path) -> FilesResult<Self> {
        if !root_directory.exists() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Directory does not exist: {}",
                root_directory.display()
            )));
        }

        if !root_directory.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root_directory.display()
            )));
        }

        Ok(Self {
            root_directory: root_directory.to_path_buf(),
        })
    }

    /// Creates the storage directory (and parents) if absent, then behaves like [`Self::new`]
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if directory creation fails or the path exists as a non-directory.
    pub fn create(root_directory: &Path) -> FilesResult<Self> {
        if !root_directory.exists() {
            fs::create_dir_all(root_directory).map_err(|e| {
                FilesError::Io(io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create storage directory {}: {}",
                        root_directory.display(),
                        e
                    ),
                ))
            })?;
        }
        Self::new(root_directory)
    }

    /// Returns the storage root, as configured
    #[must_use]
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    /// Computes the final path for `file_name` under the storage root
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidPath`] unless `file_name` is exactly one normal path
    /// component (no separators, no `.`/`..`, not absolute).
    pub fn path_for(&self, file_name: &str) -> FilesResult<PathBuf> {
        validate_file_name(file_name)?;
        Ok(self.root_directory.join(file_name))
    }

    /// Streams `content` into a new staging file in the storage root
    ///
    /// The bytes are flushed and synced before returning, so placing the file afterwards is a
    /// single rename.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if the staging file cannot be created, written or synced, or the
    /// content stream fails. No staging file is left behind in that case.
    pub fn stage<R: Read>(&self, mut content: R) -> FilesResult<StagedFile> {
        let mut temp = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(STAGING_SUFFIX)
            .tempfile_in(&self.root_directory)
            .map_err(|e| {
                FilesError::Io(io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create staging file in {}: {}",
                        self.root_directory.display(),
                        e
                    ),
                ))
            })?;

        io::copy(&mut content, temp.as_file_mut()).map_err(|e| {
            FilesError::Io(io::Error::new(
                e.kind(),
                format!("Failed to write staged content: {}", e),
            ))
        })?;

        temp.as_file_mut().flush()?;
        temp.as_file().sync_all()?;

        Ok(StagedFile { temp })
    }

    /// Renames a staged file to `file_name`, creating or replacing it
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidPath`] for an unusable filename, or [`FilesError::Io`] if
    /// the rename fails. The staging file is removed on either error.
    pub fn place(&self, staged: StagedFile, file_name: &str) -> FilesResult<PathBuf> {
        let path = self.path_for(file_name)?;

        staged.temp.persist(&path).map_err(|e| {
            FilesError::Io(io::Error::new(
                e.error.kind(),
                format!("Failed to move file into {}: {}", path.display(), e.error),
            ))
        })?;

        Ok(path)
    }

    /// Returns true if `file_name` is a staging file of an in-flight write
    #[must_use]
    pub fn is_staging_name(file_name: &str) -> bool {
        file_name.starts_with(STAGING_PREFIX) && file_name.ends_with(STAGING_SUFFIX)
    }

    /// Returns true if a regular file exists at `path`
    #[must_use]
    pub fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// Removes the file at `path` if it exists
    ///
    /// Returns `Ok(true)` when a file was removed and `Ok(false)` when there was nothing to
    /// remove.
    ///
    /// # Errors
    ///
    /// Returns [`FilesError::InvalidPath`] if `path` is not directly under the storage root,
    /// or [`FilesError::Io`] if removal fails for any reason other than absence.
    pub fn remove(&self, path: &Path) -> FilesResult<bool> {
        self.ensure_in_root(path)?;

        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FilesError::Io(io::Error::new(
                e.kind(),
                format!("Failed to remove file {}: {}", path.display(), e),
            ))),
        }
    }

    fn ensure_in_root(&self, path: &Path) -> FilesResult<()> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| FilesError::InvalidPath(path.display().to_string()))?;
        validate_file_name(file_name)?;

        if path.parent() != Some(self.root_directory.as_path()) {
            return Err(FilesError::InvalidPath(format!(
                "{} is outside storage root {}",
                path.display(),
                self.root_directory.display()
            )));
        }
        Ok(())
    }
}

fn validate_file_name(file_name: &str) -> FilesResult<()> {
    let mut components = Path::new(file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(c)), None) if c == file_name && !file_name.contains('\\') => {
            Ok(())
        }
        _ => Err(FilesError::InvalidPath(format!(
            "'{}' is not a plain filename",
            file_name
        ))),
    }
}
