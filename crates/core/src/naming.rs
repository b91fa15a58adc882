//! Mapping an upload's filename and optional custom name onto a stored name.
//!
//! The mapping is total: every `(original_filename, custom_name)` pair either yields a
//! [`StoredName`] or an `InvalidParameter` error, before any side effect happens.
//!
//! 1. The final path component of the filename is taken, splitting on both `/` and `\`.
//! 2. The extension is the suffix from the last `.` (inclusive), provided that dot is neither
//!    the first nor the last character of the component. Otherwise the extension is empty.
//!    The stem is what precedes the extension.
//! 3. The name is the custom name trimmed of surrounding whitespace, when that is non-empty,
//!    else the stem. A custom name is always treated as a stem: the upload's extension is
//!    appended to it unchanged.
//! 4. The name must be usable as a single filename component (see [`ImageName`]) and must not
//!    start with the storage directory's staging prefix (`.upload-`).
//!
//! | filename      | custom  | stem       | ext    | stored file   |
//! |---------------|---------|------------|--------|---------------|
//! | `cat.png`     | -       | `cat`      | `.png` | `cat.png`     |
//! | `a.tar.gz`    | -       | `a.tar`    | `.gz`  | `a.tar.gz`    |
//! | `.hidden`     | -       | `.hidden`  |        | `.hidden`     |
//! | `trailing.`   | -       | `trailing.`|        | `trailing.`   |
//! | `C:\x\d.jpg`  | -       | `d`        | `.jpg` | `d.jpg`       |
//! | `cat.png`     | `dog`   | `cat`      | `.png` | `dog.png`     |
//! | `cat.png`     | `d.gif` | `cat`      | `.png` | `d.gif.png`   |

use crate::{CatalogError, CatalogResult};
use imghost_files::STAGING_PREFIX;
use imghost_types::{ImageName, NonEmptyText, TextError};

/// Names derived for one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredName {
    /// Filename stem as uploaded, kept as the record's `original_name`
    pub stem: String,
    /// Extension including its leading dot, or empty
    pub ext: String,
    /// Unique logical name, also the stem of the stored file
    pub name: ImageName,
}

impl StoredName {
    /// Derives the stored name for an upload.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidParameter`] when the resulting name is empty or is not a
    /// safe filename component.
    pub fn derive(original_filename: &str, custom_name: Option<&str>) -> CatalogResult<Self> {
        let (stem, ext) = split_filename(original_filename);

        let custom = custom_name.and_then(|c| NonEmptyText::new(c).ok());
        let name = match custom {
            Some(custom) => ImageName::try_from(custom),
            None => ImageName::new(stem),
        }
        .map_err(|e| match e {
            TextError::Empty => CatalogError::InvalidParameter(format!(
                "cannot derive an image name from filename '{}'",
                original_filename
            )),
            TextError::UnsafeName(name) => CatalogError::InvalidParameter(format!(
                "'{}' cannot be used as an image name",
                name
            )),
        })?;

        if name.as_str().starts_with(STAGING_PREFIX) {
            return Err(CatalogError::InvalidParameter(format!(
                "image names may not start with '{}'",
                STAGING_PREFIX
            )));
        }

        Ok(Self {
            stem: stem.to_string(),
            ext: ext.to_string(),
            name,
        })
    }

    /// Filename of the stored file: `{name}{ext}`.
    pub fn file_name(&self) -> String {
        self.name.file_name(&self.ext)
    }
}

/// Splits a filename into `(stem, ext)` following steps 1 and 2 of the module rules.
pub fn split_filename(original_filename: &str) -> (&str, &str) {
    let component = original_filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    match component.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < component.len() => component.split_at(idx),
        _ => (component, ""),
    }
}
