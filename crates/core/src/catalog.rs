//! The image catalog.
//!
//! [`ImageCatalog`] owns the metadata store and the storage directory as one unit and keeps
//! them in agreement: a record exists if and only if its file exists.
//!
//! ## Store
//!
//! 1. Reject non-image content types and unusable names (no side effects).
//! 2. Fast-path uniqueness check on the name.
//! 3. Stream the bytes into a staging file in the storage directory. No lock is held yet, so
//!    a slow upload does not hold up writers of other names.
//! 4. Open a write transaction and insert the record. `UNIQUE(name)` decides races.
//! 5. Rename the staged file into place, then commit. If the insert, rename or commit fails, the
//!    transaction is rolled back, the staging file is dropped and any file this call placed is
//!    removed.
//!
//! The rename only happens once the row is claimed, so a losing concurrent store never touches
//! the winner's file.
//!
//! Files are located by joining the record's filename to the configured storage root, so a
//! root spelled differently across restarts (`images`, `./images`, an absolute path) still
//! finds existing files.
//!
//! ## Delete
//!
//! The row is deleted inside a write transaction, the file is removed, and only then is the
//! transaction committed. A failed removal rolls the row back and reports a storage failure, so
//! neither a record without a file nor a silently orphaned file is left behind.
//!
//! ## Pure Data Operations
//!
//! No HTTP concerns live here. Every operation is blocking; async callers should run them on a
//! blocking thread pool.

use crate::config::CoreConfig;
use crate::constants::IMAGE_MEDIA_TYPE_PREFIX;
use crate::metadata::MetadataStore;
use crate::naming::StoredName;
use crate::record::{ImageRecord, LookupBy};
use crate::{CatalogError, CatalogResult};
use imghost_files::FilesService;
use imghost_uuid::ImageId;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Catalog of stored images.
///
/// Cheap to clone; clones share the same database file and storage directory.
#[derive(Clone, Debug)]
pub struct ImageCatalog {
    metadata: MetadataStore,
    files: FilesService,
}

impl ImageCatalog {
    /// Opens the catalog described by `cfg`.
    ///
    /// Creates the storage directory, the database file and the `images` table when absent.
    /// Call once at startup and share the result.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if either store cannot be created or opened.
    pub fn open(cfg: &CoreConfig) -> CatalogResult<Self> {
        let files = FilesService::create(cfg.storage_dir())?;
        let metadata = MetadataStore::open(cfg.database_path(), cfg.busy_timeout())?;

        tracing::info!(
            "image catalog ready (storage: {}, database: {})",
            files.root_directory().display(),
            metadata.db_path().display()
        );

        Ok(Self { metadata, files })
    }

    pub fn storage_dir(&self) -> &Path {
        self.files.root_directory()
    }

    /// Stores an uploaded image and returns its new id.
    ///
    /// # Arguments
    ///
    /// * `content` - the uploaded bytes, streamed to disk
    /// * `content_type` - declared media type; must be `image/*`
    /// * `original_filename` - filename as uploaded, source of the stem and extension
    /// * `custom_name` - optional logical name replacing the stem
    ///
    /// # Errors
    ///
    /// - [`CatalogError::InvalidMediaType`] if `content_type` is not an image type
    /// - [`CatalogError::InvalidParameter`] if no usable name can be derived
    /// - [`CatalogError::DuplicateName`] if the name is taken (no file is written)
    /// - storage-failure variants for I/O or database errors; no record or file is left behind
    pub fn store<R: Read>(
        &self,
        content: R,
        content_type: &str,
        original_filename: &str,
        custom_name: Option<&str>,
    ) -> CatalogResult<ImageId> {
        ensure_image_media_type(content_type)?;
        let derived = StoredName::derive(original_filename, custom_name)?;
        let file_name = derived.file_name();

        if self.metadata.name_exists(derived.name.as_str())? {
            return Err(CatalogError::DuplicateName(derived.name.to_string()));
        }

        let record = ImageRecord {
            id: ImageId::new(),
            name: derived.name.to_string(),
            path: self.files.path_for(&file_name)?,
            original_name: derived.stem,
        };

        let staged = self.files.stage(content)?;

        let mut written: Option<PathBuf> = None;
        let result = self.metadata.insert_with(&record, || {
            written = Some(self.files.place(staged, &file_name)?);
            Ok(())
        });

        match result {
            Ok(()) => {
                tracing::info!(
                    "stored image {} as '{}' at {}",
                    record.id,
                    record.name,
                    record.path.display()
                );
                Ok(record.id)
            }
            Err(store_error) => match written {
                Some(path) => Err(self.discard_written(path, store_error)),
                None => Err(store_error),
            },
        }
    }

    /// Resolves a key to the path of an existing image file.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] if no record matches
    /// - [`CatalogError::FileMissing`] if the record exists but its file does not
    pub fn resolve(&self, key: &str, by: LookupBy) -> CatalogResult<PathBuf> {
        let record = self
            .metadata
            .find(by, key)?
            .ok_or_else(|| CatalogError::NotFound {
                by,
                key: key.to_string(),
            })?;

        let path = self.locate(&record)?;
        if !self.files.exists(&path) {
            tracing::warn!(
                "record {} ('{}') has no file at {}",
                record.id,
                record.name,
                path.display()
            );
            return Err(CatalogError::FileMissing { path });
        }

        tracing::debug!("resolved {} '{}' to {}", by, key, path.display());
        Ok(path)
    }

    /// Like [`Self::resolve`] but takes the selector as text (`id` or `name`).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidParameter`] for any other selector, without performing a
    /// lookup.
    pub fn resolve_by(&self, key: &str, by: &str) -> CatalogResult<PathBuf> {
        let by = by.parse::<LookupBy>()?;
        self.resolve(key, by)
    }

    /// Deletes the record with `id` and its file.
    ///
    /// A file that is already absent is not an error; the record is still removed.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotFound`] if no record has this id
    /// - a storage-failure variant if the file cannot be removed; the record is then kept
    pub fn delete(&self, id: &str) -> CatalogResult<()> {
        let record = self.metadata.delete_with(id, |record| {
            let path = self.locate(record)?;
            let removed = self.files.remove(&path)?;
            if !removed {
                tracing::warn!(
                    "deleting {} ('{}'): file {} was already gone",
                    record.id,
                    record.name,
                    path.display()
                );
            }
            Ok(())
        })?;

        tracing::info!("deleted image {} ('{}')", record.id, record.name);
        Ok(())
    }

    /// Path of a stored file addressed by its on-disk filename (`{name}{ext}`).
    ///
    /// # Errors
    ///
    /// - [`CatalogError::InvalidParameter`] if `file_name` is not a plain filename
    /// - [`CatalogError::FileMissing`] if no such file is stored
    pub fn stored_file(&self, file_name: &str) -> CatalogResult<PathBuf> {
        let path = self
            .files
            .path_for(file_name)
            .map_err(|e| CatalogError::InvalidParameter(e.to_string()))?;

        if FilesService::is_staging_name(file_name) || !self.files.exists(&path) {
            return Err(CatalogError::FileMissing { path });
        }
        Ok(path)
    }

    /// Every record, in insertion order.
    pub fn list_all(&self) -> CatalogResult<Vec<ImageRecord>> {
        self.metadata.list_all()
    }

    /// Location of a record's file under the current storage root.
    fn locate(&self, record: &ImageRecord) -> CatalogResult<PathBuf> {
        let file_name = record
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CatalogError::CorruptRecord(record.path.display().to_string()))?;
        Ok(self.files.path_for(file_name)?)
    }

    fn discard_written(&self, path: PathBuf, store_error: CatalogError) -> CatalogError {
        tracing::warn!(
            "store failed after writing {}; removing it: {}",
            path.display(),
            store_error
        );
        match self.files.remove(&path) {
            Ok(_) => store_error,
            Err(cleanup_error) => {
                tracing::error!(
                    "could not remove {} after failed store: {}",
                    path.display(),
                    cleanup_error
                );
                CatalogError::CleanupAfterStoreFailed {
                    path,
                    store_error: Box::new(store_error),
                    cleanup_error,
                }
            }
        }
    }
}

/// Checks that a declared content type is an image type.
///
/// Matching is case-insensitive and ignores parameters such as `; charset=...`.
pub fn ensure_image_media_type(content_type: &str) -> CatalogResult<()> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();
    let is_image = essence.len() > IMAGE_MEDIA_TYPE_PREFIX.len()
        && essence
            .get(..IMAGE_MEDIA_TYPE_PREFIX.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(IMAGE_MEDIA_TYPE_PREFIX));

    if is_image {
        Ok(())
    } else {
        Err(CatalogError::InvalidMediaType(content_type.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::fs;
    use std::sync::{mpsc, Arc, Barrier};
    use std::time::Duration;
    use tempfile::TempDir;

    fn catalog(temp: &TempDir) -> ImageCatalog {
        catalog_at(temp.path().join("images"), temp, Duration::from_secs(10))
    }

    fn catalog_at(storage_dir: PathBuf, temp: &TempDir, busy_timeout: Duration) -> ImageCatalog {
        let cfg = CoreConfig::new(
            storage_dir,
            temp.path().join("images.db"),
            busy_timeout,
            1024 * 1024,
        )
        .unwrap();
        ImageCatalog::open(&cfg).unwrap()
    }

    fn stored_files(catalog: &ImageCatalog) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(catalog.storage_dir())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn media_type_check() {
        for ok in ["image/png", "IMAGE/JPEG", "image/svg+xml", "image/png; q=1"] {
            assert!(ensure_image_media_type(ok).is_ok(), "{ok:?}");
        }
        for bad in ["text/plain", "", "image/", "imagepng", "application/image/png"] {
            assert!(
                matches!(
                    ensure_image_media_type(bad),
                    Err(CatalogError::InvalidMediaType(_))
                ),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn store_then_resolve_by_id_and_name() {
        let temp = TempDir::new().unwrap();
        let catalog = catalog(&temp);

        let id = catalog
            .store(&b"PNGDATA"[..], "image/png", "cat.png", None)
            .unwrap();

        let by_id = catalog.resolve(&id.to_string(), LookupBy::Id).unwrap();
        let by_name = catalog.resolve("cat", LookupBy::Name).unwrap();

        assert_eq!(by_id, by_name);
        assert_eq!(by_id, catalog.storage_dir().join("cat.png"));
        assert_eq!(fs::read(&by_id).unwrap(), b"PNGDATA");
    }

    #[test]
    fn stored_record_fields() {
        let temp = TempDir::new().unwrap();
        let catalog = catalog(&temp);

        let id = catalog
            .store(&b"GIF89a"[..], "image/gif", "holiday.gif", Some("beach"))
            .unwrap();

        let records = catalog.list_all().unwrap();
        assert_eq!(
            records,
            vec![ImageRecord {
                id,
                name: "beach".into(),
                path: catalog.storage_dir().join("beach.gif"),
                original_name: "holiday".into(),
            }]
        );
    }

    #[test]
    fn non_image_is_rejected_without_side_effects() {
        let temp = TempDir::new().unwrap();
        let catalog = catalog(&temp);

        let err = catalog
            .store(&b"hello"[..], "text/plain", "notes.txt", None)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidMediaType);
        assert!(stored_files(&catalog).is_empty());
        assert!(catalog.list_all().unwrap().is_empty());
    }

    #[test]
    fn duplicate_filename_keeps_first_file() {
        let temp = TempDir::new().unwrap();
        let catalog = catalog(&temp);

        let first = catalog
            .store(&b"FIRST"[..], "image/png", "cat.png", None)
            .unwrap();
        let err = catalog
            .store(&b"SECOND"[..], "image/png", "cat.png", None)
            .unwrap_err();

        assert!(matches!(err, CatalogError::DuplicateName(ref n) if n == "cat"));
        assert_eq!(stored_files(&catalog), vec!["cat.png"]);
        let path = catalog.resolve(&first.to_string(), LookupBy::Id).unwrap();
        assert_eq!(fs::read(path).unwrap(), b"FIRST");
    }

    #[test]
    fn duplicate_custom_name_with_other_extension_leaves_no_orphan() {
        let temp = TempDir::new().unwrap();
        let catalog = catalog(&temp);

        catalog
            .store(&b"PNGDATA"[..], "image/png", "cat.png", None)
            .unwrap();
        let err = catalog
            .store(&b"JPEGDATA"[..], "image/jpeg", "other.jpg", Some("cat"))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DuplicateName);
        assert_eq!(stored_files(&catalog), vec!["cat.png"]);
        assert_eq!(catalog.list_all().unwrap().len(), 1);
    }

    #[test]
    fn distinct_names_sharing_a_file_are_rejected() {
        let temp = TempDir::new().unwrap();
        let catalog = catalog(&temp);

        catalog
            .store(&b"ORIGINAL"[..], "image/png", "cat.png", None)
            .unwrap();
        let err = catalog
            .store(&b"IMPOSTOR"[..], "image/png", "upload", Some("cat.png"))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DuplicateName);
        let path = catalog.resolve("cat", LookupBy::Name).unwrap();
        assert_eq!(fs::read(path).unwrap(), b"ORIGINAL");
        assert_eq!(stored_files(&catalog), vec!["cat.png"]);
    }

    #[test]
    fn names_are_case_sensitive() {
        let temp = TempDir::new().unwrap();
        let catalog = catalog(&temp);

        catalog.store(&b"a"[..], "image/png", "cat.png", None).unwrap();
        catalog.store(&b"b"[..], "image/png", "Cat.gif", None).unwrap();

        assert_eq!(catalog.list_all().unwrap().len(), 2);
    }

    #[test]
    fn concrete_scenario() {
        let temp = TempDir::new().unwrap();
        let catalog = catalog(&temp);

        let x = catalog
            .store(&b"PNGDATA"[..], "image/png", "cat.png", None)
            .unwrap();
        let records = catalog.list_all().unwrap();
        assert_eq!(records[0].name, "cat");
        assert!(records[0].path.ends_with("images/cat.png"));

        let err = catalog
            .store(&b"OTHER"[..], "image/png", "other.png", Some("cat"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateName);

        catalog.delete(&x.to_string()).unwrap();

        let err = catalog.resolve(&x.to_string(), LookupBy::Id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn delete_removes_record_and_file() {
        let temp = TempDir::new().unwrap();
        let catalog = catalog(&temp);
        let id = catalog
            .store(&b"PNGDATA"[..], "image/png", "cat.png", None)
            .unwrap();
        let path = catalog.resolve("cat", LookupBy::Name).unwrap();

        catalog.delete(&id.to_string()).unwrap();

        assert!(!path.exists());
        for (key, by) in [(id.to_string(), LookupBy::Id), ("cat".into(), LookupBy::Name)] {
            let err = catalog.resolve(&key, by).unwrap_err();
            assert!(matches!(err, CatalogError::NotFound { .. }), "{by}: {err:?}");
        }
    }

    #[test]
    fn files_are_found_when_root_is_spelled_differently() {
        let temp = TempDir::new().unwrap();
        let id = catalog(&temp)
            .store(&b"PNGDATA"[..], "image/png", "cat.png", None)
            .unwrap();

        let root = temp.path().join("images").join("..").join("images");
        let reopened = catalog_at(root.clone(), &temp, Duration::from_secs(10));

        let path = reopened.resolve("cat", LookupBy::Name).unwrap();
        assert_eq!(path, root.join("cat.png"));
        assert_eq!(fs::read(&path).unwrap(), b"PNGDATA");

        reopened.delete(&id.to_string()).unwrap();

        assert!(reopened.list_all().unwrap().is_empty());
        assert!(!temp.path().join("images").join("cat.png").exists());
    }

    #[test]
    fn delete_unknown_id() {
        let temp = TempDir::new().unwrap();
        let catalog = catalog(&temp);

        let err = catalog.delete("ffffffffffffffffffffffffffffffff").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = catalog.delete("not even an id").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn delete_tolerates_missing_file() {
        let temp = TempDir::new().unwrap();
        let catalog = catalog(&temp);
        let id = catalog
            .store(&b"PNGDATA"[..], "image/png", "cat.png", None)
            .unwrap();
        fs::remove_file(catalog.storage_dir().join("cat.png")).unwrap();

        catalog.delete(&id.to_string()).unwrap();

        assert!(catalog.list_all().unwrap().is_empty());
    }

    #[test]
    fn failed_file_removal_keeps_record() {
        let temp = TempDir::new().unwrap();
        let catalog = catalog(&temp);
        let id = catalog
            .store(&b"PNGDATA"[..], "image/png", "cat.png", None)
            .unwrap();
        // A directory in place of the file makes remove_file fail with an I/O error.
        let path = catalog.storage_dir().join("cat.png");
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        let err = catalog.delete(&id.to_string()).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StorageFailure);
        assert_eq!(catalog.list_all().unwrap().len(), 1);
    }

    #[test]
    fn resolve_reports_missing_file_distinctly() {
        let temp = TempDir::new().unwrap();
        let catalog = catalog(&temp);
        catalog
            .store(&b"PNGDATA"[..], "image/png", "cat.png", None)
            .unwrap();
        fs::remove_file(catalog.storage_dir().join("cat.png")).unwrap();

        let err = catalog.resolve("cat", LookupBy::Name).unwrap_err();

        assert!(matches!(err, CatalogError::FileMissing { .. }));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn resolve_by_rejects_unknown_selector() {
        let temp = TempDir::new().unwrap();
        let catalog = catalog(&temp);
        catalog
            .store(&b"PNGDATA"[..], "image/png", "cat.png", None)
            .unwrap();

        let err = catalog.resolve_by("cat", "path").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);

        assert!(catalog.resolve_by("cat", "name").is_ok());
    }

    #[test]
    fn stored_file_by_filename() {
        let temp = TempDir::new().unwrap();
        let catalog = catalog(&temp);
        catalog
            .store(&b"PNGDATA"[..], "image/png", "cat.png", None)
            .unwrap();

        let path = catalog.stored_file("cat.png").unwrap();
        assert_eq!(fs::read(path).unwrap(), b"PNGDATA");

        assert_eq!(
            catalog.stored_file("dog.png").unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            catalog.stored_file("../images.db").unwrap_err().kind(),
            ErrorKind::InvalidParameter
        );
    }

    #[test]
    fn list_after_stores_and_deletes() {
        let temp = TempDir::new().unwrap();
        let catalog = catalog(&temp);

        let ids: Vec<ImageId> = (0..5)
            .map(|i| {
                catalog
                    .store(&b"x"[..], "image/png", &format!("img{i}.png"), None)
                    .unwrap()
            })
            .collect();
        catalog.delete(&ids[1].to_string()).unwrap();
        catalog.delete(&ids[3].to_string()).unwrap();

        let listed: Vec<ImageId> = catalog.list_all().unwrap().into_iter().map(|r| r.id).collect();

        assert_eq!(listed, vec![ids[0], ids[2], ids[4]]);
        assert_eq!(stored_files(&catalog), vec!["img0.png", "img2.png", "img4.png"]);
    }

    #[test]
    fn failed_upload_stream_leaves_nothing() {
        struct Failing;
        impl Read for Failing {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("connection reset"))
            }
        }

        let temp = TempDir::new().unwrap();
        let catalog = catalog(&temp);

        let err = catalog
            .store(Failing, "image/png", "cat.png", None)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StorageFailure);
        assert!(stored_files(&catalog).is_empty());
        assert!(catalog.list_all().unwrap().is_empty());

        // The name is free again.
        catalog
            .store(&b"PNGDATA"[..], "image/png", "cat.png", None)
            .unwrap();
    }

    #[test]
    fn slow_upload_does_not_block_other_names() {
        struct Slow {
            started: Option<mpsc::Sender<()>>,
            data: &'static [u8],
        }
        impl Read for Slow {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if let Some(started) = self.started.take() {
                    started.send(()).unwrap();
                    std::thread::sleep(Duration::from_millis(800));
                }
                self.data.read(buf)
            }
        }

        let temp = TempDir::new().unwrap();
        let catalog = catalog_at(
            temp.path().join("images"),
            &temp,
            Duration::from_millis(200),
        );
        let (started_tx, started_rx) = mpsc::channel();

        let slow_catalog = catalog.clone();
        let slow = std::thread::spawn(move || {
            let content = Slow {
                started: Some(started_tx),
                data: b"SLOWDATA",
            };
            slow_catalog.store(content, "image/png", "slow.png", None)
        });

        started_rx.recv().unwrap();
        let other = catalog.store(&b"DOGDATA"[..], "image/png", "dog.png", None);

        assert!(other.is_ok(), "{other:?}");
        assert!(slow.join().unwrap().is_ok());
        assert_eq!(stored_files(&catalog), vec!["dog.png", "slow.png"]);
    }

    #[test]
    fn concurrent_stores_of_one_name_succeed_once() {
        const WRITERS: usize = 8;
        let temp = TempDir::new().unwrap();
        let catalog = catalog(&temp);
        let barrier = Arc::new(Barrier::new(WRITERS));

        let handles: Vec<_> = (0..WRITERS)
            .map(|i| {
                let catalog = catalog.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    let content = format!("writer-{i}");
                    barrier.wait();
                    catalog.store(content.as_bytes(), "image/png", "cat.png", None)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners: Vec<&ImageId> = results.iter().filter_map(|r| r.as_ref().ok()).collect();

        assert_eq!(winners.len(), 1);
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert_eq!(err.kind(), ErrorKind::DuplicateName, "{err}");
        }
        assert_eq!(stored_files(&catalog), vec!["cat.png"]);

        let path = catalog.resolve(&winners[0].to_string(), LookupBy::Id).unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert!(content.starts_with("writer-"));
    }
}
