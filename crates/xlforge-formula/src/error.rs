//! Formula error types: parser failures and the evaluator's error taxonomy.

use thiserror::Error;
use xlforge_core::ARef;

pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Parser failures: a malformed formula never panics, it returns one of these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unbalanced parentheses in formula")]
    UnbalancedParens,
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("formula text exceeds {0} characters")]
    TooLong(usize),
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("unexpected end of formula")]
    UnexpectedEnd,
    #[error("invalid reference: {0}")]
    InvalidReference(String),
    #[error("empty formula")]
    Empty,
    #[error("unknown function '{0}'")]
    UnknownFunction(String),
    #[error("wrong argument count for {function}: expected {expected}, got {actual}")]
    ArgumentCount { function: String, expected: String, actual: usize },
}

/// The evaluator's error taxonomy (spec §4.6.3): a kind per failure shape,
/// not a single catch-all, so callers can match on *why* evaluation failed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    /// `x / y` where `y` evaluates to zero.
    #[error("#DIV/0!: {0} / {1}")]
    DivByZero(String, String),

    /// A non-empty cell was required but `reference` could not be resolved.
    #[error("#REF!: {reference} ({reason})")]
    RefError { reference: ARef, reason: String },

    /// Decoding a cell's value to the expected type failed.
    #[error("codec failed decoding {reference}: {cause}")]
    CodecFailed { reference: ARef, cause: String },

    /// An operation received a value of the wrong shape, e.g. arithmetic on text.
    #[error("type mismatch in {op}: expected {expected}, got {got}")]
    TypeMismatch { op: String, expected: String, got: String },

    /// Catch-all for every other evaluation fault, including an unresolved
    /// `PolyRef` reaching the evaluator (a resolution-pass bug, not user
    /// error) and recursion-depth overflow.
    #[error("evaluation failed: {msg}")]
    EvalFailed { msg: String, origin: Option<String> },
}

impl EvalError {
    pub fn eval_failed(msg: impl Into<String>) -> Self {
        EvalError::EvalFailed { msg: msg.into(), origin: None }
    }

    pub fn eval_failed_at(msg: impl Into<String>, origin: impl Into<String>) -> Self {
        EvalError::EvalFailed { msg: msg.into(), origin: Some(origin.into()) }
    }

    /// The Excel error literal this evaluator error renders as when stored
    /// back into a cell's value.
    pub fn as_cell_error(&self) -> xlforge_core::CellError {
        use xlforge_core::CellError;
        match self {
            EvalError::DivByZero(..) => CellError::Div0,
            EvalError::RefError { .. } => CellError::Ref,
            EvalError::CodecFailed { .. } => CellError::Value,
            EvalError::TypeMismatch { .. } => CellError::Value,
            EvalError::EvalFailed { .. } => CellError::Na,
        }
    }
}

/// Top-level error for this crate: either the text never parsed, or parsing
/// succeeded but evaluation faulted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulaError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("eval error: {0}")]
    Eval(#[from] EvalError),
}
