use crate::CatalogError;
use imghost_uuid::ImageId;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Metadata describing one stored image.
///
/// Records are created whole by a store and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRecord {
    pub id: ImageId,
    pub name: String,
    pub path: PathBuf,
    pub original_name: String,
}

/// Which key a lookup uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupBy {
    Id,
    Name,
}

impl LookupBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupBy::Id => "id",
            LookupBy::Name => "name",
        }
    }
}

impl fmt::Display for LookupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LookupBy {
    type Err = CatalogError;

    /// Accepts exactly `id` or `name`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(LookupBy::Id),
            "name" => Ok(LookupBy::Name),
            other => Err(CatalogError::InvalidParameter(format!(
                "'by' parameter must be either 'id' or 'name', got '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_parses_known_selectors() {
        assert_eq!("id".parse::<LookupBy>().unwrap(), LookupBy::Id);
        assert_eq!("name".parse::<LookupBy>().unwrap(), LookupBy::Name);
    }

    #[test]
    fn lookup_by_rejects_other_selectors() {
        for input in ["", "ID", "path", "original_name", "name "] {
            let err = input.parse::<LookupBy>().unwrap_err();
            assert!(matches!(err, CatalogError::InvalidParameter(_)), "{input:?}");
        }
    }

    #[test]
    fn record_serializes_flat() {
        let record = ImageRecord {
            id: ImageId::parse("550e8400e29b41d4a716446655440000").unwrap(),
            name: "cat".into(),
            path: PathBuf::from("images/cat.png"),
            original_name: "cat".into(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "550e8400e29b41d4a716446655440000",
                "name": "cat",
                "path": "images/cat.png",
                "original_name": "cat",
            })
        );
    }
}
