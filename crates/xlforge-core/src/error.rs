//! Error types for xlforge-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in xlforge-core.
///
/// Variant names follow the kind taxonomy: they describe *what went wrong*,
/// not which type produced it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Parse failure for ARef / CellRange / RefType.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// Row index out of Excel's valid range.
    #[error("row {0} out of bounds (max: {1})")]
    InvalidRow(u32, u32),

    /// Column index out of Excel's valid range.
    #[error("column {0} out of bounds (max: {1})")]
    InvalidColumn(u32, u32),

    /// Sheet name empty, too long, contains forbidden characters, or is reserved.
    #[error("invalid sheet name: {0}")]
    InvalidSheetName(String),

    /// Sheet not found by name.
    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    /// Sheet index out of bounds.
    #[error("sheet index {0} out of bounds (count: {1})")]
    SheetOutOfBounds(usize, usize),

    /// Duplicate sheet name (case-insensitive).
    #[error("sheet name already exists: {0}")]
    DuplicateSheetName(String),

    /// Invalid named range.
    #[error("invalid named range: {0}")]
    InvalidName(String),

    /// Invalid style id (not present in the registry it is looked up against).
    #[error("invalid style id: {0}")]
    InvalidStyleId(u32),

    /// Writing a value of a type with no codec.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// Two merge ranges intersect (optional, surfaced at write time).
    #[error("merge ranges overlap: {0} and {1}")]
    MergeOverlap(String, String),

    /// Catch-all with a stable message, carrying truncated offending text.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new "other" error with a message.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Truncate a triggering value to a safe length for inclusion in error messages.
    pub fn truncate(s: &str) -> String {
        const MAX: usize = 120;
        if s.len() <= MAX {
            s.to_string()
        } else {
            format!("{}…", &s[..MAX])
        }
    }
}
