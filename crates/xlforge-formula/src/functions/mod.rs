//! Built-in function implementations, one module per family.
//!
//! Dispatch happens in `evaluator.rs` via a match on [`crate::ast::FunctionSpec`]
//! rather than through a string-keyed registry: the parser already resolved the
//! function name to a closed enum variant, so there is no remaining use for a
//! runtime lookup table the way the teacher's open-ended catalog needed one.

pub mod criteria;
pub mod date;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod text;

use crate::error::EvalError;

/// Shared arity check used by functions whose argument count isn't already
/// pinned down by the grammar (e.g. variadic `SUMIFS`).
pub(crate) fn check_arity(
    name: &str,
    len: usize,
    min: usize,
    max: Option<usize>,
) -> Result<(), EvalError> {
    let ok = len >= min && max.map_or(true, |m| len <= m);
    if ok {
        return Ok(());
    }
    let expected = match max {
        Some(m) if m == min => min.to_string(),
        Some(m) => format!("{min}..={m}"),
        None => format!("at least {min}"),
    };
    Err(EvalError::eval_failed(format!(
        "{name}: expected {expected} argument(s), got {len}"
    )))
}
