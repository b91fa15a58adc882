//! # Image Host Core
//!
//! Core business logic for the image host:
//! - [`ImageCatalog`]: store, resolve, delete and list images
//! - SQLite metadata store holding one row per image
//! - the naming rules mapping an upload onto a stored file
//!
//! The catalog guarantees that a metadata record exists if and only if its file exists in the
//! storage directory, including when an operation fails part-way.
//!
//! **No API concerns**: HTTP routing and serving belong in `api-rest`.

pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod metadata;
pub mod naming;
pub mod record;

pub use catalog::{ensure_image_media_type, ImageCatalog};
pub use config::CoreConfig;
pub use constants::{
    DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_DATABASE_PATH, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_STORAGE_DIR,
};
pub use error::{CatalogError, CatalogResult, ErrorKind};
pub use imghost_types::{ImageName, NonEmptyText};
pub use imghost_uuid::ImageId;
pub use naming::StoredName;
pub use record::{ImageRecord, LookupBy};
