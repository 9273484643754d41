//! Error types for the XLSX (Office Open XML) codec.

use thiserror::Error;

/// Result type alias using [`XlsxError`].
pub type XlsxResult<T> = std::result::Result<T, XlsxError>;

/// Errors that can occur while reading or writing an `.xlsx` package.
///
/// Variant names follow the kind taxonomy from the core error design: they
/// describe *what went wrong*, not which library produced it.
#[derive(Debug, Error)]
pub enum XlsxError {
    /// Filesystem or ZIP-container I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP container is corrupt or malformed.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A part's XML is not well-formed.
    #[error("malformed XML in {part}: {source}")]
    Xml {
        part: String,
        #[source]
        source: quick_xml::Error,
    },

    /// A required OOXML part is missing from the package (e.g. `workbook.xml`).
    #[error("missing required part: {0}")]
    MissingPart(String),

    /// A part's structure doesn't match what the codec expects.
    #[error("invalid XLSX format: {0}")]
    InvalidFormat(String),

    /// A part declared a `<!DOCTYPE` or referenced an external entity.
    ///
    /// Rejected unconditionally; `xxe_disabled` is not a toggle, it is always on.
    #[error("rejected XML with DOCTYPE/external entity in {0}")]
    XxeRejected(String),

    /// A formula's text failed to parse while decoding a cached `<f>` element.
    #[error("formula error: {0}")]
    Formula(#[from] xlforge_formula::error::FormulaError),

    /// A domain error surfaced by `xlforge-core` (bad reference, sheet name, style id, ...).
    #[error("core error: {0}")]
    Core(#[from] xlforge_core::Error),

    /// Attempted to write a workbook with zero sheets, or two sheets sharing a name.
    #[error("{0}")]
    InvalidWorkbook(String),
}

impl XlsxError {
    pub fn xml(part: impl Into<String>, source: quick_xml::Error) -> Self {
        XlsxError::Xml { part: part.into(), source }
    }
}
