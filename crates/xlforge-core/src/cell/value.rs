//! Cell values: the tagged union stored at each populated [`super::ARef`].

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The value held by a cell.
///
/// All arithmetic uses [`Decimal`] (arbitrary-precision, base-10) rather than
/// `f64`, matching Excel's financial semantics: `0.1 + 0.2` must render `0.3`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// No value.
    Empty,
    /// Plain text.
    Text(SharedString),
    /// A decimal number.
    Number(Decimal),
    /// `TRUE` / `FALSE`.
    Bool(bool),
    /// A naive (timezone-less) date-time, matching Excel's own serial-date model.
    DateTime(NaiveDateTime),
    /// An Excel error value.
    Error(CellError),
    /// Rich text: a sequence of runs, each with its own inline formatting.
    RichText(Arc<[RichTextRun]>),
    /// A formula cell: the literal formula text (without the leading `=`) and
    /// its last computed value, if any.
    Formula {
        expr: String,
        cached: Option<Box<CellValue>>,
    },
}

impl CellValue {
    /// Construct a text value.
    pub fn text<S: Into<String>>(s: S) -> Self {
        CellValue::Text(SharedString::new(s.into()))
    }

    /// Construct a formula value with no cached result.
    pub fn formula<S: Into<String>>(expr: S) -> Self {
        CellValue::Formula { expr: expr.into(), cached: None }
    }

    /// Construct a formula value with a cached result.
    pub fn formula_with_cache<S: Into<String>>(expr: S, cached: CellValue) -> Self {
        CellValue::Formula { expr: expr.into(), cached: Some(Box::new(cached)) }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Formula { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }

    /// The value a formula's cache resolves to, or `self` if not a formula.
    /// Recurses through nested formula caches (should not occur in practice,
    /// but keeps the accessor total).
    pub fn effective_value(&self) -> &CellValue {
        match self {
            CellValue::Formula { cached: Some(v), .. } => v.effective_value(),
            _ => self,
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self.effective_value() {
            CellValue::Number(n) => Some(*n),
            CellValue::Bool(true) => Some(Decimal::ONE),
            CellValue::Bool(false) => Some(Decimal::ZERO),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.effective_value() {
            CellValue::Bool(b) => Some(*b),
            CellValue::Number(n) => Some(!n.is_zero()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.effective_value() {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn formula_text(&self) -> Option<&str> {
        match self {
            CellValue::Formula { expr, .. } => Some(expr),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Text(_) => "text",
            CellValue::Number(_) => "number",
            CellValue::Bool(_) => "bool",
            CellValue::DateTime(_) => "datetime",
            CellValue::Error(_) => "error",
            CellValue::RichText(_) => "rich_text",
            CellValue::Formula { .. } => "formula",
        }
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => write!(f, ""),
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::DateTime(dt) => write!(f, "{dt}"),
            CellValue::Error(e) => write!(f, "{e}"),
            CellValue::RichText(runs) => {
                for run in runs.iter() {
                    write!(f, "{}", run.text)?;
                }
                Ok(())
            }
            CellValue::Formula { cached: Some(v), .. } => write!(f, "{v}"),
            CellValue::Formula { expr, .. } => write!(f, "={expr}"),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(Decimal::from(n))
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(Decimal::try_from(n).unwrap_or(Decimal::ZERO))
    }
}

impl From<Decimal> for CellValue {
    fn from(n: Decimal) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::text(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::text(s)
    }
}

impl From<CellError> for CellValue {
    fn from(e: CellError) -> Self {
        CellValue::Error(e)
    }
}

/// A run of rich text with its own formatting (bold/italic/color/font name),
/// kept deliberately thin: full [`crate::style::CellStyle`] application is a
/// cell-level, not a run-level, concept.
#[derive(Debug, Clone, PartialEq)]
pub struct RichTextRun {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

impl RichTextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self { text: text.into(), bold: false, italic: false }
    }
}

/// Excel's error literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellError {
    /// `#NULL!` - incorrect range operator.
    Null,
    /// `#DIV/0!` - division by zero.
    Div0,
    /// `#VALUE!` - wrong type of argument or operand.
    Value,
    /// `#REF!` - invalid cell reference.
    Ref,
    /// `#NAME?` - unrecognized formula name.
    Name,
    /// `#NUM!` - invalid numeric value.
    Num,
    /// `#N/A` - value not available.
    Na,
}

impl CellError {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellError::Null => "#NULL!",
            CellError::Div0 => "#DIV/0!",
            CellError::Value => "#VALUE!",
            CellError::Ref => "#REF!",
            CellError::Name => "#NAME?",
            CellError::Num => "#NUM!",
            CellError::Na => "#N/A",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "#NULL!" => Some(CellError::Null),
            "#DIV/0!" => Some(CellError::Div0),
            "#VALUE!" => Some(CellError::Value),
            "#REF!" => Some(CellError::Ref),
            "#NAME?" => Some(CellError::Name),
            "#NUM!" => Some(CellError::Num),
            "#N/A" => Some(CellError::Na),
            _ => None,
        }
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An `Arc<str>`-backed string, cheap to clone and share across cells that
/// happen to hold the same text (e.g. repeated labels in a column).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SharedString(Arc<str>);

impl SharedString {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        SharedString(Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl fmt::Display for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SharedString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SharedString {
    fn from(s: &str) -> Self {
        SharedString::new(s)
    }
}

impl From<String> for SharedString {
    fn from(s: String) -> Self {
        SharedString::new(s)
    }
}

/// Deduplicates string allocations across cells sharing the same text.
#[derive(Debug, Default)]
pub struct StringPool {
    strings: HashMap<Arc<str>, SharedString>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern<S: AsRef<str>>(&mut self, s: S) -> SharedString {
        let s = s.as_ref();
        if let Some(shared) = self.strings.get(s) {
            shared.clone()
        } else {
            let arc: Arc<str> = Arc::from(s);
            let shared = SharedString(arc.clone());
            self.strings.insert(arc, shared.clone());
            shared
        }
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn clear(&mut self) {
        self.strings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        assert_eq!(CellValue::from(42i64), CellValue::Number(Decimal::from(42)));
        assert_eq!(CellValue::from(true), CellValue::Bool(true));
        assert_eq!(CellValue::from("hello").as_str(), Some("hello"));
    }

    #[test]
    fn as_number_coerces_bool() {
        assert_eq!(CellValue::Bool(true).as_number(), Some(Decimal::ONE));
        assert_eq!(CellValue::Bool(false).as_number(), Some(Decimal::ZERO));
        assert_eq!(CellValue::text("hello").as_number(), None);
        assert_eq!(CellValue::Empty.as_number(), None);
    }

    #[test]
    fn error_round_trip() {
        for e in [
            CellError::Null,
            CellError::Div0,
            CellError::Value,
            CellError::Ref,
            CellError::Name,
            CellError::Num,
            CellError::Na,
        ] {
            assert_eq!(CellError::from_str(e.as_str()), Some(e));
        }
        assert_eq!(CellError::from_str("#n/a"), Some(CellError::Na));
        assert_eq!(CellError::from_str("nope"), None);
    }

    #[test]
    fn string_pool_dedups() {
        let mut pool = StringPool::new();
        let s1 = pool.intern("hello");
        let s2 = pool.intern("hello");
        let s3 = pool.intern("world");
        assert!(Arc::ptr_eq(&s1.0, &s2.0));
        assert!(!Arc::ptr_eq(&s1.0, &s3.0));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn formula_effective_value() {
        let f = CellValue::formula_with_cache("A1*2", CellValue::from(20i64));
        assert_eq!(f.as_number(), Some(Decimal::from(20)));
        assert_eq!(f.formula_text(), Some("A1*2"));
    }
}
