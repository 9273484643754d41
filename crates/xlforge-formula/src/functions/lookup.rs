//! `VLOOKUP`/`XLOOKUP`.

use crate::ast::Value;
use crate::error::EvalError;
use rust_decimal::Decimal;
use xlforge_core::CellError;

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Text(x), Value::Text(y)) => x.eq_ignore_ascii_case(y),
        (Value::Number(x), Value::Text(s)) | (Value::Text(s), Value::Number(x)) => {
            s.parse::<Decimal>().map(|n| n == *x).unwrap_or(false)
        }
        (Value::Empty, Value::Empty) => true,
        _ => false,
    }
}

/// `VLOOKUP(lookup_value, table, col_index, [range_lookup])`. Only exact
/// match (`range_lookup = FALSE`) is supported; approximate match requires a
/// sorted-table scan the specified function family doesn't call for.
pub fn vlookup(
    lookup_value: &Value,
    table: &[Vec<Value>],
    col_index: &Value,
    range_lookup: Option<&Value>,
) -> Result<Value, EvalError> {
    if table.is_empty() || table[0].is_empty() {
        return Ok(Value::Error(CellError::Na));
    }
    let col_index = col_index.as_number().ok_or_else(|| EvalError::TypeMismatch {
        op: "VLOOKUP".into(),
        expected: "number".into(),
        got: col_index.type_name().into(),
    })?;
    let col_index: i64 = col_index.trunc().to_string().parse().unwrap_or(0);
    if col_index < 1 {
        return Ok(Value::Error(CellError::Value));
    }
    let col = (col_index - 1) as usize;
    if col >= table[0].len() {
        return Ok(Value::Error(CellError::Ref));
    }
    let approximate = range_lookup.and_then(Value::as_bool).unwrap_or(true);
    if approximate {
        // Assumes the first column is sorted ascending; returns the last row
        // whose key does not exceed lookup_value.
        let mut best: Option<&Vec<Value>> = None;
        for row in table {
            if let (Some(key), Some(target)) = (row[0].as_number(), lookup_value.as_number()) {
                if key <= target {
                    best = Some(row);
                } else {
                    break;
                }
            }
        }
        return Ok(best.and_then(|row| row.get(col)).cloned().unwrap_or(Value::Error(CellError::Na)));
    }
    for row in table {
        if values_equal(lookup_value, &row[0]) {
            return Ok(row.get(col).cloned().unwrap_or(Value::Empty));
        }
    }
    Ok(Value::Error(CellError::Na))
}

/// `XLOOKUP(lookup_value, lookup_array, return_array, [if_not_found])`.
pub fn xlookup(
    lookup_value: &Value,
    lookup_array: &[Value],
    return_array: &[Value],
    if_not_found: Option<&Value>,
) -> Result<Value, EvalError> {
    if lookup_array.len() != return_array.len() {
        return Err(EvalError::TypeMismatch {
            op: "XLOOKUP".into(),
            expected: format!("return_array of length {}", lookup_array.len()),
            got: format!("length {}", return_array.len()),
        });
    }
    for (key, value) in lookup_array.iter().zip(return_array) {
        if values_equal(lookup_value, key) {
            return Ok(value.clone());
        }
    }
    Ok(if_not_found.cloned().unwrap_or(Value::Error(CellError::Na)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: i64) -> Value {
        Value::Number(Decimal::from(v))
    }

    #[test]
    fn vlookup_exact_match_returns_requested_column() {
        let table = vec![
            vec![Value::Text("a".into()), n(1)],
            vec![Value::Text("b".into()), n(2)],
        ];
        let result = vlookup(&Value::Text("b".into()), &table, &n(2), Some(&Value::Bool(false))).unwrap();
        assert_eq!(result, n(2));
    }

    #[test]
    fn vlookup_missing_key_is_na() {
        let table = vec![vec![Value::Text("a".into()), n(1)]];
        let result = vlookup(&Value::Text("z".into()), &table, &n(2), Some(&Value::Bool(false))).unwrap();
        assert_eq!(result, Value::Error(CellError::Na));
    }

    #[test]
    fn xlookup_uses_if_not_found_fallback() {
        let lookup = vec![n(1), n(2)];
        let ret = vec![Value::Text("one".into()), Value::Text("two".into())];
        let result = xlookup(&n(9), &lookup, &ret, Some(&Value::Text("missing".into()))).unwrap();
        assert_eq!(result, Value::Text("missing".into()));
    }
}
