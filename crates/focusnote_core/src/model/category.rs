//! Category domain model and name validation.
//!
//! # Responsibility
//! - Define the category record notes are grouped by.
//! - Normalize and validate user-provided category names and icons.
//!
//! # Invariants
//! - Stored names are trimmed, 2..=50 characters, free of path-hostile
//!   characters, and unique ignoring case.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type CategoryId = Uuid;

pub const CATEGORY_NAME_MIN_CHARS: usize = 2;
pub const CATEGORY_NAME_MAX_CHARS: usize = 50;

static FORBIDDEN_NAME_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[/\\:*?"<>|]"#).expect("valid forbidden-chars regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Opaque icon reference resolved by the UI layer.
    pub icon_ref: String,
    /// Epoch milliseconds.
    pub created_at: i64,
}

impl Category {
    /// Creates a category with a generated id.
    ///
    /// Callers are expected to pass a name already accepted by
    /// [`validate_category_name`].
    pub fn new(name: impl Into<String>, icon_ref: impl Into<String>, now_ms: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            icon_ref: icon_ref.into(),
            created_at: now_ms,
        }
    }
}

/// Rejection reasons for category names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryValidationError {
    EmptyName,
    TooShort,
    TooLong,
    InvalidChars,
    DuplicateName,
}

impl CategoryValidationError {
    pub fn code(self) -> &'static str {
        match self {
            Self::EmptyName => "empty_name",
            Self::TooShort => "too_short",
            Self::TooLong => "too_long",
            Self::InvalidChars => "invalid_chars",
            Self::DuplicateName => "duplicate_name",
        }
    }
}

impl Display for CategoryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "category name cannot be empty"),
            Self::TooShort => write!(
                f,
                "category name must have at least {CATEGORY_NAME_MIN_CHARS} characters"
            ),
            Self::TooLong => write!(
                f,
                "category name must have at most {CATEGORY_NAME_MAX_CHARS} characters"
            ),
            Self::InvalidChars => write!(
                f,
                "category name cannot contain any of / \\ : * ? \" < > |"
            ),
            Self::DuplicateName => write!(f, "a category with this name already exists"),
        }
    }
}

impl Error for CategoryValidationError {}

/// Trims `raw` and checks shape rules. Returns the name to store.
///
/// Length is measured in Unicode scalar values, not bytes.
pub fn validate_category_name(raw: &str) -> Result<String, CategoryValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CategoryValidationError::EmptyName);
    }

    let chars = trimmed.chars().count();
    if chars < CATEGORY_NAME_MIN_CHARS {
        return Err(CategoryValidationError::TooShort);
    }
    if chars > CATEGORY_NAME_MAX_CHARS {
        return Err(CategoryValidationError::TooLong);
    }
    if FORBIDDEN_NAME_CHARS_RE.is_match(trimmed) {
        return Err(CategoryValidationError::InvalidChars);
    }

    Ok(trimmed.to_string())
}

/// Case-insensitive name comparison used for duplicate detection.
pub fn names_collide(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Returns the trimmed icon, or `fallback` when blank.
pub fn normalize_icon(raw: &str, fallback: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{names_collide, normalize_icon, validate_category_name, CategoryValidationError};

    #[test]
    fn validate_trims_and_accepts_boundary_lengths() {
        assert_eq!(validate_category_name("  Work  ").unwrap(), "Work");
        assert_eq!(validate_category_name("ab").unwrap(), "ab");
        let fifty = "x".repeat(50);
        assert_eq!(validate_category_name(&fifty).unwrap(), fifty);
    }

    #[test]
    fn validate_rejects_each_shape_violation() {
        assert_eq!(
            validate_category_name("   "),
            Err(CategoryValidationError::EmptyName)
        );
        assert_eq!(
            validate_category_name(" a "),
            Err(CategoryValidationError::TooShort)
        );
        assert_eq!(
            validate_category_name(&"y".repeat(51)),
            Err(CategoryValidationError::TooLong)
        );
        for bad in ["a/b", "a\\b", "a:b", "a*b", "a?b", "a\"b", "a<b", "a>b", "a|b"] {
            assert_eq!(
                validate_category_name(bad),
                Err(CategoryValidationError::InvalidChars),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn multibyte_names_count_characters_not_bytes() {
        assert_eq!(validate_category_name("日本").unwrap(), "日本");
        assert!(validate_category_name(&"é".repeat(50)).is_ok());
    }

    #[test]
    fn duplicate_detection_ignores_case() {
        assert!(names_collide("Work", "wORK"));
        assert!(!names_collide("Work", "Works"));
    }

    #[test]
    fn blank_icon_uses_fallback() {
        assert_eq!(normalize_icon("  ", "folder"), "folder");
        assert_eq!(normalize_icon(" star ", "folder"), "star");
    }
}
