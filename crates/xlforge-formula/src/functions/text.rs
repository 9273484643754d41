//! `LEFT`/`RIGHT`/`MID`/`LEN`/`CONCATENATE`/`UPPER`/`LOWER`/`TRIM`/`TEXT`.

use crate::ast::Value;
use crate::error::EvalError;
use crate::functions::date::datetime_to_serial;

fn as_text(v: &Value) -> String {
    match v {
        Value::Text(s) => s.clone(),
        Value::Number(n) => n.normalize().to_string(),
        Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Value::DateTime(dt) => dt.to_string(),
        Value::Error(e) => e.as_str().to_string(),
        Value::Empty => String::new(),
    }
}

fn as_count(v: &Value, name: &str) -> Result<usize, EvalError> {
    let n = v.as_number().ok_or_else(|| EvalError::TypeMismatch {
        op: name.into(),
        expected: "number".into(),
        got: v.type_name().into(),
    })?;
    let i: i64 = n.trunc().to_string().parse().unwrap_or(0);
    Ok(i.max(0) as usize)
}

pub fn left(text: &Value, count: Option<&Value>) -> Result<Value, EvalError> {
    let s = as_text(text);
    let n = match count {
        Some(v) => as_count(v, "LEFT")?,
        None => 1,
    };
    Ok(Value::Text(s.chars().take(n).collect()))
}

pub fn right(text: &Value, count: Option<&Value>) -> Result<Value, EvalError> {
    let s = as_text(text);
    let n = match count {
        Some(v) => as_count(v, "RIGHT")?,
        None => 1,
    };
    let len = s.chars().count();
    let skip = len.saturating_sub(n);
    Ok(Value::Text(s.chars().skip(skip).collect()))
}

pub fn mid(text: &Value, start: &Value, count: &Value) -> Result<Value, EvalError> {
    let s = as_text(text);
    let start = as_count(start, "MID")?;
    let n = as_count(count, "MID")?;
    if start == 0 {
        return Err(EvalError::eval_failed("MID: start_num must be at least 1"));
    }
    Ok(Value::Text(s.chars().skip(start - 1).take(n).collect()))
}

pub fn len(text: &Value) -> Value {
    Value::Number(rust_decimal::Decimal::from(as_text(text).chars().count()))
}

pub fn concatenate(args: &[Value]) -> Value {
    Value::Text(args.iter().map(as_text).collect())
}

pub fn upper(text: &Value) -> Value {
    Value::Text(as_text(text).to_uppercase())
}

pub fn lower(text: &Value) -> Value {
    Value::Text(as_text(text).to_lowercase())
}

pub fn trim(text: &Value) -> Value {
    let collapsed = as_text(text).split_whitespace().collect::<Vec<_>>().join(" ");
    Value::Text(collapsed)
}

/// `TEXT(value, format_code)`: renders a number (or date/time, represented as
/// a serial number) through the number-format renderer.
pub fn text(value: &Value, format_code: &Value) -> Result<Value, EvalError> {
    let code = match format_code {
        Value::Text(s) => s.as_str(),
        _ => {
            return Err(EvalError::TypeMismatch {
                op: "TEXT".into(),
                expected: "text".into(),
                got: format_code.type_name().into(),
            })
        }
    };
    let n = match value {
        Value::Number(n) => *n,
        Value::DateTime(dt) => datetime_to_serial(*dt),
        Value::Bool(b) => rust_decimal::Decimal::from(*b as i64),
        _ => {
            return Err(EvalError::TypeMismatch {
                op: "TEXT".into(),
                expected: "number".into(),
                got: value.type_name().into(),
            })
        }
    };
    Ok(Value::Text(xlforge_core::style::number_format::render(n, code)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn left_takes_default_single_char() {
        assert_eq!(left(&Value::Text("hello".into()), None).unwrap(), Value::Text("h".into()));
    }

    #[test]
    fn right_takes_requested_count() {
        let n = Value::Number(Decimal::from(3));
        assert_eq!(right(&Value::Text("hello".into()), Some(&n)).unwrap(), Value::Text("llo".into()));
    }

    #[test]
    fn mid_extracts_substring() {
        let start = Value::Number(Decimal::from(2));
        let count = Value::Number(Decimal::from(3));
        assert_eq!(mid(&Value::Text("hello".into()), &start, &count).unwrap(), Value::Text("ell".into()));
    }

    #[test]
    fn len_counts_characters() {
        assert_eq!(len(&Value::Text("hello".into())), Value::Number(Decimal::from(5)));
    }

    #[test]
    fn concatenate_joins_mixed_types() {
        let args = vec![Value::Text("x=".into()), Value::Number(Decimal::from(5))];
        assert_eq!(concatenate(&args), Value::Text("x=5".into()));
    }

    #[test]
    fn trim_collapses_internal_whitespace() {
        assert_eq!(trim(&Value::Text("  a   b  ".into())), Value::Text("a b".into()));
    }
}
