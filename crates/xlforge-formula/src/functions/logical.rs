//! `NOT`. `IF`, `AND`, and `OR` are all evaluated directly in `evaluator.rs`
//! instead of through this module: all three short-circuit (Excel never
//! evaluates `IF`'s untaken branch, `AND`'s remaining arguments once one is
//! false, or `OR`'s remaining arguments once one is true), which needs access
//! to the unevaluated `Expr` arguments, not finished `Value`s. `coerce_bool`
//! is shared with the evaluator's `AND`/`OR` loops.

use crate::ast::Value;
use crate::error::EvalError;

pub(crate) fn coerce_bool(v: &Value, op: &str) -> Result<bool, EvalError> {
    v.as_bool().ok_or_else(|| EvalError::TypeMismatch {
        op: op.into(),
        expected: "bool".into(),
        got: v.type_name().into(),
    })
}

pub fn not(arg: &Value) -> Result<Value, EvalError> {
    Ok(Value::Bool(!coerce_bool(arg, "NOT")?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn not_flips_boolean() {
        assert_eq!(not(&Value::Bool(true)).unwrap(), Value::Bool(false));
    }

    #[test]
    fn not_coerces_numeric_zero_to_false() {
        assert_eq!(not(&Value::Number(Decimal::ZERO)).unwrap(), Value::Bool(true));
    }

    #[test]
    fn not_rejects_text() {
        assert!(not(&Value::Text("x".into())).is_err());
    }

}
