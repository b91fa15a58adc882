//! Image identifiers.
//!
//! Every stored image is issued a random 128-bit identifier. The textual form used in the
//! metadata store, in URLs and in CLI output is the *canonical* representation:
//! **32 lowercase hexadecimal characters** (no hyphens).
//!
//! ## Canonical form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! This is the same value you would get from `Uuid::new_v4().simple().to_string()`.
//! Use [`ImageId::parse`] to validate an identifier supplied from outside the process.

mod image_id;

pub use image_id::{ImageId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
