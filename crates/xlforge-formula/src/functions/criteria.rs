//! Criteria matching for SUMIF/SUMIFS, and the grid-reduction logic the two
//! share.
//!
//! A criteria can be a number (exact match), a comparison (`">5"`, `"<=10"`,
//! `"<>0"`), a wildcard text pattern (`*`/`?`), or the empty string (matches
//! blank cells).

use crate::ast::Value;
use crate::error::EvalError;
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug)]
enum Criteria {
    Number(Decimal),
    Comparison(Op, Decimal),
    Text(String),
    Empty,
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl Criteria {
    fn from_value(v: &Value) -> Self {
        match v {
            Value::Number(n) => Criteria::Number(*n),
            Value::Bool(b) => Criteria::Number(if *b { Decimal::ONE } else { Decimal::ZERO }),
            Value::Empty => Criteria::Empty,
            Value::Error(_) => Criteria::Empty,
            Value::DateTime(_) => Criteria::Empty,
            Value::Text(s) => Self::parse_text(s),
        }
    }

    fn parse_text(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() {
            return Criteria::Empty;
        }
        if let Some(c) = Self::parse_comparison(s) {
            return c;
        }
        if let Ok(n) = Decimal::from_str(s) {
            return Criteria::Number(n);
        }
        Criteria::Text(s.to_lowercase())
    }

    fn parse_comparison(s: &str) -> Option<Self> {
        let (op, rest) = if let Some(r) = s.strip_prefix(">=") {
            (Op::Gte, r)
        } else if let Some(r) = s.strip_prefix("<=") {
            (Op::Lte, r)
        } else if let Some(r) = s.strip_prefix("<>") {
            (Op::Neq, r)
        } else if let Some(r) = s.strip_prefix('>') {
            (Op::Gt, r)
        } else if let Some(r) = s.strip_prefix('<') {
            (Op::Lt, r)
        } else if let Some(r) = s.strip_prefix('=') {
            (Op::Eq, r)
        } else {
            return None;
        };
        Decimal::from_str(rest.trim()).ok().map(|n| Criteria::Comparison(op, n))
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Criteria::Number(want) => match value {
                Value::Number(n) => n == want,
                Value::Bool(b) => Decimal::from(*b as i64) == *want,
                _ => false,
            },
            Criteria::Comparison(op, want) => {
                let n = match value {
                    Value::Number(n) => *n,
                    Value::Bool(b) => Decimal::from(*b as i64),
                    _ => return false,
                };
                match op {
                    Op::Eq => n == *want,
                    Op::Neq => n != *want,
                    Op::Lt => n < *want,
                    Op::Lte => n <= *want,
                    Op::Gt => n > *want,
                    Op::Gte => n >= *want,
                }
            }
            Criteria::Text(pattern) => {
                let text = match value {
                    Value::Text(s) => s.to_lowercase(),
                    Value::Empty => String::new(),
                    _ => return false,
                };
                wildcard_match(pattern, &text)
            }
            Criteria::Empty => matches!(value, Value::Empty) || matches!(value, Value::Text(s) if s.is_empty()),
        }
    }
}

/// `*` matches any run of characters, `?` matches exactly one.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    if !pattern.contains('*') && !pattern.contains('?') {
        return pattern == text;
    }
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, ti));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

fn sum_grid(rows: usize, cols: usize, at: impl Fn(usize, usize) -> Value) -> Decimal {
    let mut total = Decimal::ZERO;
    for r in 0..rows {
        for c in 0..cols {
            if let Value::Number(n) = at(r, c) {
                total += n;
            }
        }
    }
    total
}

/// `SUMIF(range, criteria, [sum_range])`. `sum_range` must share `range`'s
/// shape; when absent, `range` itself is summed.
pub fn sumif(
    range: &[Vec<Value>],
    criteria: &Value,
    sum_range: Option<&[Vec<Value>]>,
) -> Result<Value, EvalError> {
    let c = Criteria::from_value(criteria);
    let sum_range = sum_range.unwrap_or(range);
    let rows = range.len().min(sum_range.len());
    let cols = range.first().map_or(0, |r| r.len()).min(sum_range.first().map_or(0, |r| r.len()));
    let total = sum_grid(rows, cols, |r, col| {
        if c.matches(&range[r][col]) {
            sum_range[r][col].clone()
        } else {
            Value::Empty
        }
    });
    Ok(Value::Number(total))
}

/// `SUMIFS(sum_range, criteria_range1, criteria1, [criteria_range2, criteria2, ...])`.
pub fn sumifs(sum_range: &[Vec<Value>], pairs: &[(&[Vec<Value>], &Value)]) -> Result<Value, EvalError> {
    let rows = sum_range.len();
    let cols = sum_range.first().map_or(0, |r| r.len());
    let matchers: Vec<Criteria> = pairs.iter().map(|(_, v)| Criteria::from_value(v)).collect();
    let total = sum_grid(rows, cols, |r, c| {
        let all_match = pairs
            .iter()
            .zip(&matchers)
            .all(|((grid, _), m)| grid.get(r).and_then(|row| row.get(c)).is_some_and(|v| m.matches(v)));
        if all_match {
            sum_range[r][c].clone()
        } else {
            Value::Empty
        }
    });
    Ok(Value::Number(total))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(v: i64) -> Value {
        Value::Number(Decimal::from(v))
    }

    #[test]
    fn wildcard_matches_prefix_and_suffix() {
        assert!(wildcard_match("a*", "apple"));
        assert!(wildcard_match("*e", "apple"));
        assert!(!wildcard_match("*z", "apple"));
    }

    #[test]
    fn sumif_filters_by_comparison_criteria() {
        let range = vec![vec![n(1)], vec![n(5)], vec![n(10)]];
        let result = sumif(&range, &Value::Text(">3".into()), None).unwrap();
        assert_eq!(result, Value::Number(Decimal::from(15)));
    }

    #[test]
    fn sumif_sums_separate_sum_range() {
        let range = vec![vec![Value::Text("a".into())], vec![Value::Text("b".into())]];
        let sum_range = vec![vec![n(10)], vec![n(20)]];
        let result = sumif(&range, &Value::Text("a".into()), Some(&sum_range)).unwrap();
        assert_eq!(result, Value::Number(Decimal::from(10)));
    }

    #[test]
    fn sumifs_requires_all_criteria_to_match() {
        let sum_range = vec![vec![n(1)], vec![n(2)], vec![n(3)]];
        let range_a = vec![vec![n(1)], vec![n(1)], vec![n(1)]];
        let range_b = vec![vec![n(10)], vec![n(20)], vec![n(10)]];
        let result =
            sumifs(&sum_range, &[(&range_a, &n(1)), (&range_b, &n(10))]).unwrap();
        assert_eq!(result, Value::Number(Decimal::from(4)));
    }
}
