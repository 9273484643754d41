//! The formula abstract syntax tree.
//!
//! Rust has no GADTs, so the typed node families the evaluator cares about
//! (values vs. references vs. ranges) are encoded as a single flat `Expr`
//! enum plus a boxed [`Value`] result sum, with the evaluator responsible for
//! rejecting shape mismatches at eval time via [`crate::error::EvalError`].
//!
//! `PolyRef`/`SheetPolyRef` are transient: the parser produces them for a
//! bare reference token before it knows from context whether the token
//! denotes a single cell or is about to be widened into a range (`A1:B2`),
//! and resolves every one of them to a `Ref`/`SheetRef`/`RangeRef`/
//! `SheetRange` before returning. A `PolyRef` reaching the evaluator is a
//! parser bug, not a user-facing error.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use xlforge_core::{CellError, CellRange, SheetName, ARef};

/// Which aggregate function a `Aggregate` node invokes. New aggregators are
/// added to the registry in `evaluator.rs` without changing this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregatorId {
    Sum,
    Count,
    Average,
    Min,
    Max,
    CountA,
    CountBlank,
}

impl AggregatorId {
    /// Parse an aggregator function name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_uppercase().as_str() {
            "SUM" => AggregatorId::Sum,
            "COUNT" => AggregatorId::Count,
            "AVERAGE" => AggregatorId::Average,
            "MIN" => AggregatorId::Min,
            "MAX" => AggregatorId::Max,
            "COUNTA" => AggregatorId::CountA,
            "COUNTBLANK" => AggregatorId::CountBlank,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            AggregatorId::Sum => "SUM",
            AggregatorId::Count => "COUNT",
            AggregatorId::Average => "AVERAGE",
            AggregatorId::Min => "MIN",
            AggregatorId::Max => "MAX",
            AggregatorId::CountA => "COUNTA",
            AggregatorId::CountBlank => "COUNTBLANK",
        }
    }
}

/// Where an `Aggregate` node's range lives: the formula's own sheet, or an
/// explicitly sheet-qualified one.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeLocation {
    Local(CellRange),
    CrossSheet(SheetName, CellRange),
}

/// A named, non-aggregate function call target (`IF`, `VLOOKUP`, `LEFT`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionSpec {
    If,
    And,
    Or,
    Not,
    SumIf,
    SumIfs,
    VLookup,
    XLookup,
    SumProduct,
    Left,
    Right,
    Mid,
    Len,
    Concatenate,
    Upper,
    Lower,
    Trim,
    Text,
    Date,
    Year,
    Month,
    Day,
    Today,
    Now,
}

impl FunctionSpec {
    /// Parse a formula function name (case-insensitive). `None` for any name
    /// outside the supported catalog.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_uppercase().as_str() {
            "IF" => FunctionSpec::If,
            "AND" => FunctionSpec::And,
            "OR" => FunctionSpec::Or,
            "NOT" => FunctionSpec::Not,
            "SUMIF" => FunctionSpec::SumIf,
            "SUMIFS" => FunctionSpec::SumIfs,
            "VLOOKUP" => FunctionSpec::VLookup,
            "XLOOKUP" => FunctionSpec::XLookup,
            "SUMPRODUCT" => FunctionSpec::SumProduct,
            "LEFT" => FunctionSpec::Left,
            "RIGHT" => FunctionSpec::Right,
            "MID" => FunctionSpec::Mid,
            "LEN" => FunctionSpec::Len,
            "CONCATENATE" => FunctionSpec::Concatenate,
            "UPPER" => FunctionSpec::Upper,
            "LOWER" => FunctionSpec::Lower,
            "TRIM" => FunctionSpec::Trim,
            "TEXT" => FunctionSpec::Text,
            "DATE" => FunctionSpec::Date,
            "YEAR" => FunctionSpec::Year,
            "MONTH" => FunctionSpec::Month,
            "DAY" => FunctionSpec::Day,
            "TODAY" => FunctionSpec::Today,
            "NOW" => FunctionSpec::Now,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            FunctionSpec::If => "IF",
            FunctionSpec::And => "AND",
            FunctionSpec::Or => "OR",
            FunctionSpec::Not => "NOT",
            FunctionSpec::SumIf => "SUMIF",
            FunctionSpec::SumIfs => "SUMIFS",
            FunctionSpec::VLookup => "VLOOKUP",
            FunctionSpec::XLookup => "XLOOKUP",
            FunctionSpec::SumProduct => "SUMPRODUCT",
            FunctionSpec::Left => "LEFT",
            FunctionSpec::Right => "RIGHT",
            FunctionSpec::Mid => "MID",
            FunctionSpec::Len => "LEN",
            FunctionSpec::Concatenate => "CONCATENATE",
            FunctionSpec::Upper => "UPPER",
            FunctionSpec::Lower => "LOWER",
            FunctionSpec::Trim => "TRIM",
            FunctionSpec::Text => "TEXT",
            FunctionSpec::Date => "DATE",
            FunctionSpec::Year => "YEAR",
            FunctionSpec::Month => "MONTH",
            FunctionSpec::Day => "DAY",
            FunctionSpec::Today => "TODAY",
            FunctionSpec::Now => "NOW",
        }
    }
}

/// A parsed formula expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Lit(Value),

    /// Parser-only: an unqualified reference token whose cell-vs-range shape
    /// isn't known yet. Resolved away before the parser returns.
    PolyRef(ARef),
    /// Parser-only: a sheet-qualified reference token, same caveat.
    SheetPolyRef(SheetName, ARef),

    Ref(ARef),
    SheetRef(SheetName, ARef),
    RangeRef(CellRange),
    SheetRange(SheetName, CellRange),

    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Concat(Box<Expr>, Box<Expr>),

    Lt(Box<Expr>, Box<Expr>),
    Lte(Box<Expr>, Box<Expr>),
    Gt(Box<Expr>, Box<Expr>),
    Gte(Box<Expr>, Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Neq(Box<Expr>, Box<Expr>),

    ToInt(Box<Expr>),
    DateToSerial(Box<Expr>),
    DateTimeToSerial(Box<Expr>),

    Aggregate(AggregatorId, RangeLocation),
    Call(FunctionSpec, Vec<Expr>),
}

impl Expr {
    /// Negation desugars to `Sub(Lit(0), x)` rather than carrying its own
    /// unary node.
    pub fn negate(operand: Expr) -> Expr {
        Expr::Sub(Box::new(Expr::Lit(Value::Number(Decimal::ZERO))), Box::new(operand))
    }

    /// True for the two parser-only node kinds; an `Expr` tree handed to the
    /// evaluator must contain none of these.
    pub fn is_unresolved_poly_ref(&self) -> bool {
        matches!(self, Expr::PolyRef(_) | Expr::SheetPolyRef(_, _))
    }
}

/// The result of evaluating an [`Expr`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(Decimal),
    Text(String),
    Bool(bool),
    DateTime(NaiveDateTime),
    Error(CellError),
    Empty,
}

impl Value {
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Number(_) | Value::Bool(_))
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(true) => Some(Decimal::ONE),
            Value::Bool(false) => Some(Decimal::ZERO),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => Some(!n.is_zero()),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Bool(_) => "bool",
            Value::DateTime(_) => "datetime",
            Value::Error(_) => "error",
            Value::Empty => "empty",
        }
    }
}

impl From<xlforge_core::CellValue> for Value {
    fn from(v: xlforge_core::CellValue) -> Self {
        match v.effective_value().clone() {
            xlforge_core::CellValue::Empty => Value::Empty,
            xlforge_core::CellValue::Text(s) => Value::Text(s.as_str().to_string()),
            xlforge_core::CellValue::Number(n) => Value::Number(n),
            xlforge_core::CellValue::Bool(b) => Value::Bool(b),
            xlforge_core::CellValue::DateTime(dt) => Value::DateTime(dt),
            xlforge_core::CellValue::Error(e) => Value::Error(e),
            xlforge_core::CellValue::RichText(runs) => {
                Value::Text(runs.iter().map(|r| r.text.as_str()).collect())
            }
            // effective_value() already unwraps Formula, but keep this total.
            xlforge_core::CellValue::Formula { .. } => Value::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_spec_name_round_trips() {
        for f in [
            FunctionSpec::If,
            FunctionSpec::SumIfs,
            FunctionSpec::VLookup,
            FunctionSpec::XLookup,
            FunctionSpec::SumProduct,
            FunctionSpec::Text,
        ] {
            assert_eq!(FunctionSpec::from_name(f.name()), Some(f));
            assert_eq!(FunctionSpec::from_name(&f.name().to_ascii_lowercase()), Some(f));
        }
        assert_eq!(FunctionSpec::from_name("NOTAFUNCTION"), None);
    }

    #[test]
    fn aggregator_id_name_round_trips() {
        for a in [
            AggregatorId::Sum,
            AggregatorId::CountA,
            AggregatorId::CountBlank,
            AggregatorId::Average,
        ] {
            assert_eq!(AggregatorId::from_name(a.name()), Some(a));
        }
        assert_eq!(AggregatorId::from_name("SUM"), Some(AggregatorId::Sum));
        assert_eq!(FunctionSpec::from_name("SUM"), None);
    }

    #[test]
    fn negate_desugars_to_subtraction() {
        let e = Expr::negate(Expr::Lit(Value::Number(Decimal::from(5))));
        assert_eq!(
            e,
            Expr::Sub(
                Box::new(Expr::Lit(Value::Number(Decimal::ZERO))),
                Box::new(Expr::Lit(Value::Number(Decimal::from(5))))
            )
        );
    }

    #[test]
    fn poly_ref_detection() {
        let aref = ARef::from_indices(0, 0).unwrap();
        assert!(Expr::PolyRef(aref).is_unresolved_poly_ref());
        assert!(!Expr::Ref(aref).is_unresolved_poly_ref());
    }
}
