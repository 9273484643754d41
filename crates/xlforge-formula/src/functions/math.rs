//! `SUMPRODUCT`. Every other teacher math function (`ROUND`, `POWER`, `SIN`,
//! `LOG`, ...) has no named-family counterpart and was dropped.

use crate::ast::Value;
use crate::error::EvalError;
use rust_decimal::Decimal;

/// `SUMPRODUCT(array1, array2, ...)`: every array must share the same shape;
/// the result is the sum of the elementwise product across all arrays.
pub fn sumproduct(arrays: &[Vec<Vec<Value>>]) -> Result<Value, EvalError> {
    let first = arrays.first().ok_or_else(|| EvalError::eval_failed("SUMPRODUCT: no arguments"))?;
    let rows = first.len();
    let cols = first.first().map_or(0, |r| r.len());

    for a in arrays {
        if a.len() != rows || a.first().map_or(0, |r| r.len()) != cols {
            return Err(EvalError::TypeMismatch {
                op: "SUMPRODUCT".into(),
                expected: format!("{rows}x{cols} array"),
                got: format!("{}x{} array", a.len(), a.first().map_or(0, |r| r.len())),
            });
        }
    }

    let mut total = Decimal::ZERO;
    for r in 0..rows {
        for c in 0..cols {
            let mut product = Decimal::ONE;
            for a in arrays {
                let n = a[r][c].as_number().unwrap_or(Decimal::ZERO);
                product *= n;
            }
            total += product;
        }
    }
    Ok(Value::Number(total))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(vals: &[i64]) -> Vec<Vec<Value>> {
        vals.iter().map(|v| vec![Value::Number(Decimal::from(*v))]).collect()
    }

    #[test]
    fn sumproduct_multiplies_elementwise_then_sums() {
        let a = grid(&[1, 2, 3]);
        let b = grid(&[4, 5, 6]);
        let result = sumproduct(&[a, b]).unwrap();
        assert_eq!(result, Value::Number(Decimal::from(32)));
    }

    #[test]
    fn sumproduct_rejects_mismatched_shapes() {
        let a = grid(&[1, 2]);
        let b = grid(&[1, 2, 3]);
        assert!(sumproduct(&[a, b]).is_err());
    }
}
