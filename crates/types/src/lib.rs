//! Validated text types shared across the image host crates.
//!
//! Values of these types are checked once at construction, so code holding one can rely on the
//! guarantee without re-validating.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// The input cannot be used as a single filename component
    #[error("'{0}' is not a valid image name")]
    UnsafeName(String),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// Returns `Err(TextError::Empty)` if the trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// The logical name of a stored image.
///
/// An image name doubles as the stem of its on-disk filename, so it must be usable as exactly
/// one path component:
/// - non-empty
/// - not `.` or `..`
/// - free of `/`, `\` and NUL
///
/// Unlike [`NonEmptyText`], the input is taken verbatim. Callers decide whether to trim.
/// Names compare case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageName(String);

impl ImageName {
    /// Validates `input` as an image name.
    ///
    /// # Errors
    ///
    /// - [`TextError::Empty`] for an empty input
    /// - [`TextError::UnsafeName`] for dot segments and inputs containing separators or NUL
    pub fn new(input: impl Into<String>) -> Result<Self, TextError> {
        let input = input.into();
        if input.is_empty() {
            return Err(TextError::Empty);
        }
        if input == "." || input == ".." || input.contains(['/', '\\', '\0']) {
            return Err(TextError::UnsafeName(input));
        }
        Ok(Self(input))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// On-disk filename for this name with the given extension (including its leading dot).
    pub fn file_name(&self, ext: &str) -> String {
        format!("{}{}", self.0, ext)
    }
}

impl std::fmt::Display for ImageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ImageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<NonEmptyText> for ImageName {
    type Error = TextError;

    fn try_from(value: NonEmptyText) -> Result<Self, Self::Error> {
        ImageName::new(value.into_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_input() {
        let text = NonEmptyText::new("  cat  ").unwrap();
        assert_eq!(text.as_str(), "cat");
    }

    #[test]
    fn non_empty_text_rejects_whitespace() {
        assert_eq!(NonEmptyText::new("   \t"), Err(TextError::Empty));
        assert_eq!(NonEmptyText::new(""), Err(TextError::Empty));
    }

    #[test]
    fn non_empty_text_deserialize_rejects_empty() {
        let result: Result<NonEmptyText, _> = serde_json::from_str("\"  \"");
        assert!(result.is_err());

        let ok: NonEmptyText = serde_json::from_str("\" dog \"").unwrap();
        assert_eq!(ok.as_str(), "dog");
    }

    #[test]
    fn image_name_accepts_plain_names() {
        for input in ["cat", "my photo", "a.tar", ".hidden", "UPPER"] {
            let name = ImageName::new(input).unwrap();
            assert_eq!(name.as_str(), input);
        }
    }

    #[test]
    fn image_name_keeps_surrounding_whitespace() {
        let name = ImageName::new(" cat").unwrap();
        assert_eq!(name.as_str(), " cat");
    }

    #[test]
    fn image_name_rejects_path_like_input() {
        for input in [".", "..", "a/b", "..\\evil", "nul\0byte", "/abs"] {
            assert!(
                matches!(ImageName::new(input), Err(TextError::UnsafeName(_))),
                "expected {input:?} to be rejected"
            );
        }
        assert_eq!(ImageName::new(""), Err(TextError::Empty));
    }

    #[test]
    fn image_name_file_name_appends_extension() {
        let name = ImageName::new("cat").unwrap();
        assert_eq!(name.file_name(".png"), "cat.png");
        assert_eq!(name.file_name(""), "cat");
    }

    #[test]
    fn image_name_from_non_empty_text() {
        let text = NonEmptyText::new(" dog ").unwrap();
        let name = ImageName::try_from(text).unwrap();
        assert_eq!(name.as_str(), "dog");
    }
}
