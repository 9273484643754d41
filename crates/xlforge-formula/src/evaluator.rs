//! Evaluates a parsed [`Expr`] against a workbook snapshot.
//!
//! Evaluation is a pure function of `(Expr, Workbook, current sheet)`: it
//! reads whatever cell values are already stored (a formula cell's `cached`
//! value, by way of `CellValue::effective_value`), it does not itself decide
//! recalculation order. That is the dependency graph's job.

use crate::ast::{AggregatorId, Expr, FunctionSpec, RangeLocation, Value};
use crate::error::EvalError;
use crate::functions::{criteria, date, logical, lookup, math, text};
use rust_decimal::Decimal;
use xlforge_core::{ARef, CellRange, SheetName, Workbook};

pub struct EvalContext<'a> {
    pub workbook: &'a Workbook,
    pub sheet_index: usize,
}

impl<'a> EvalContext<'a> {
    pub fn new(workbook: &'a Workbook, sheet_index: usize) -> Self {
        Self { workbook, sheet_index }
    }

    fn resolve_sheet(&self, sheet: &SheetName) -> Result<usize, EvalError> {
        self.workbook
            .sheet_index(sheet.as_str())
            .ok_or_else(|| EvalError::eval_failed(format!("unknown sheet '{}'", sheet.as_str())))
    }

    fn cell_value(&self, sheet_index: usize, aref: ARef) -> Result<Value, EvalError> {
        let sheet = self
            .workbook
            .sheet(sheet_index)
            .map_err(|e| EvalError::RefError { reference: aref, reason: e.to_string() })?;
        Ok(Value::from(sheet.get(aref).value))
    }

    fn range_grid(&self, sheet_index: usize, range: CellRange) -> Result<Vec<Vec<Value>>, EvalError> {
        let sheet = self
            .workbook
            .sheet(sheet_index)
            .map_err(|e| EvalError::eval_failed(format!("range lookup: {e}")))?;
        let cols = range.col_count();
        let mut grid: Vec<Vec<Value>> = Vec::with_capacity(range.row_count());
        let mut row: Vec<Value> = Vec::with_capacity(cols);
        for aref in range.cells() {
            row.push(Value::from(sheet.get(aref).value));
            if row.len() == cols {
                grid.push(std::mem::replace(&mut row, Vec::with_capacity(cols)));
            }
        }
        Ok(grid)
    }

    fn location(&self, loc: &RangeLocation) -> Result<(usize, CellRange), EvalError> {
        match loc {
            RangeLocation::Local(r) => Ok((self.sheet_index, *r)),
            RangeLocation::CrossSheet(sheet, r) => Ok((self.resolve_sheet(sheet)?, *r)),
        }
    }

    fn now(&self) -> chrono::NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

fn numeric(v: &Value, op: &str) -> Result<Decimal, EvalError> {
    v.as_number().ok_or_else(|| EvalError::TypeMismatch {
        op: op.into(),
        expected: "number".into(),
        got: v.type_name().into(),
    })
}

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

fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    use std::cmp::Ordering;
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.partial_cmp(y),
        (Value::Text(x), Value::Text(y)) => Some(x.to_lowercase().cmp(&y.to_lowercase())),
        (Value::DateTime(x), Value::DateTime(y)) => x.partial_cmp(y),
        (Value::Empty, Value::Empty) => Some(Ordering::Equal),
        // Excel's cross-type ordering: numbers < text < booleans, empty as its
        // typed zero/""/FALSE.
        (Value::Number(_) | Value::Empty, Value::Text(_) | Value::Bool(_))
        | (Value::Text(_), Value::Bool(_)) => Some(Ordering::Less),
        (Value::Text(_) | Value::Bool(_), Value::Number(_) | Value::Empty)
        | (Value::Bool(_), Value::Text(_)) => Some(Ordering::Greater),
        _ => None,
    }
}

/// Evaluate `expr` in `ctx`. Every branch returns a scalar [`Value`]; a
/// bare [`Expr::RangeRef`]/[`Expr::SheetRange`] outside an aggregate or a
/// range-consuming function call is a type error, not a silent first-cell
/// pick.
pub fn evaluate(expr: &Expr, ctx: &EvalContext) -> Result<Value, EvalError> {
    match expr {
        Expr::Lit(v) => Ok(v.clone()),

        Expr::PolyRef(_) | Expr::SheetPolyRef(_, _) => {
            Err(EvalError::eval_failed_at("unresolved reference token reached the evaluator", "parser"))
        }

        Expr::Ref(aref) => ctx.cell_value(ctx.sheet_index, *aref),
        Expr::SheetRef(sheet, aref) => {
            let idx = ctx.resolve_sheet(sheet)?;
            ctx.cell_value(idx, *aref)
        }
        Expr::RangeRef(_) | Expr::SheetRange(_, _) => Err(EvalError::TypeMismatch {
            op: "scalar context".into(),
            expected: "single cell".into(),
            got: "range".into(),
        }),

        Expr::Add(a, b) => arith(a, b, ctx, "+", |x, y| Ok(x + y)),
        Expr::Sub(a, b) => arith(a, b, ctx, "-", |x, y| Ok(x - y)),
        Expr::Mul(a, b) => arith(a, b, ctx, "*", |x, y| Ok(x * y)),
        Expr::Div(a, b) => {
            let x = numeric(&evaluate(a, ctx)?, "/")?;
            let y = numeric(&evaluate(b, ctx)?, "/")?;
            if y.is_zero() {
                return Err(EvalError::DivByZero(x.to_string(), y.to_string()));
            }
            Ok(Value::Number(x / y))
        }
        Expr::Concat(a, b) => {
            let x = as_text(&evaluate(a, ctx)?);
            let y = as_text(&evaluate(b, ctx)?);
            Ok(Value::Text(x + &y))
        }

        Expr::Lt(a, b) => cmp(a, b, ctx, |o| o.is_lt()),
        Expr::Lte(a, b) => cmp(a, b, ctx, |o| o.is_le()),
        Expr::Gt(a, b) => cmp(a, b, ctx, |o| o.is_gt()),
        Expr::Gte(a, b) => cmp(a, b, ctx, |o| o.is_ge()),
        Expr::Eq(a, b) => cmp(a, b, ctx, |o| o.is_eq()),
        Expr::Neq(a, b) => cmp(a, b, ctx, |o| !o.is_eq()),

        Expr::ToInt(e) => {
            let n = numeric(&evaluate(e, ctx)?, "ToInt")?;
            Ok(Value::Number(n.trunc()))
        }
        Expr::DateToSerial(e) => match evaluate(e, ctx)? {
            Value::DateTime(dt) => Ok(Value::Number(date::datetime_to_serial(dt).trunc())),
            Value::Number(n) => Ok(Value::Number(n.trunc())),
            other => Err(EvalError::TypeMismatch {
                op: "DateToSerial".into(),
                expected: "date".into(),
                got: other.type_name().into(),
            }),
        },
        Expr::DateTimeToSerial(e) => match evaluate(e, ctx)? {
            Value::DateTime(dt) => Ok(Value::Number(date::datetime_to_serial(dt))),
            Value::Number(n) => Ok(Value::Number(n)),
            other => Err(EvalError::TypeMismatch {
                op: "DateTimeToSerial".into(),
                expected: "date".into(),
                got: other.type_name().into(),
            }),
        },

        Expr::Aggregate(id, loc) => evaluate_aggregate(*id, loc, ctx),
        Expr::Call(spec, args) => evaluate_call(*spec, args, ctx),
    }
}

fn arith(
    a: &Expr,
    b: &Expr,
    ctx: &EvalContext,
    op: &str,
    f: impl Fn(Decimal, Decimal) -> Result<Decimal, EvalError>,
) -> Result<Value, EvalError> {
    let x = numeric(&evaluate(a, ctx)?, op)?;
    let y = numeric(&evaluate(b, ctx)?, op)?;
    f(x, y).map(Value::Number)
}

fn cmp(a: &Expr, b: &Expr, ctx: &EvalContext, f: impl Fn(std::cmp::Ordering) -> bool) -> Result<Value, EvalError> {
    let x = evaluate(a, ctx)?;
    let y = evaluate(b, ctx)?;
    let ord = compare(&x, &y).ok_or_else(|| EvalError::TypeMismatch {
        op: "comparison".into(),
        expected: x.type_name().into(),
        got: y.type_name().into(),
    })?;
    Ok(Value::Bool(f(ord)))
}

fn evaluate_aggregate(id: AggregatorId, loc: &RangeLocation, ctx: &EvalContext) -> Result<Value, EvalError> {
    let (sheet_index, range) = ctx.location(loc)?;
    let grid = ctx.range_grid(sheet_index, range)?;
    let cells: Vec<&Value> = grid.iter().flatten().collect();
    let numbers: Vec<Decimal> = cells.iter().filter_map(|v| if let Value::Number(n) = v { Some(*n) } else { None }).collect();

    match id {
        AggregatorId::Sum => Ok(Value::Number(numbers.iter().sum())),
        AggregatorId::Count => Ok(Value::Number(Decimal::from(numbers.len()))),
        AggregatorId::CountA => {
            Ok(Value::Number(Decimal::from(cells.iter().filter(|v| !matches!(v, Value::Empty)).count())))
        }
        AggregatorId::CountBlank => {
            Ok(Value::Number(Decimal::from(cells.iter().filter(|v| matches!(v, Value::Empty)).count())))
        }
        AggregatorId::Average => {
            if numbers.is_empty() {
                return Err(EvalError::DivByZero("AVERAGE".into(), "0 numeric cells in range".into()));
            }
            let sum: Decimal = numbers.iter().sum();
            Ok(Value::Number(sum / Decimal::from(numbers.len())))
        }
        AggregatorId::Min => Ok(Value::Number(numbers.iter().copied().fold(Decimal::ZERO, Decimal::min))),
        AggregatorId::Max => Ok(Value::Number(numbers.iter().copied().fold(Decimal::ZERO, Decimal::max))),
    }
}

/// Resolve a range-shaped `Expr` (a bare cell widens to a 1x1 grid) without
/// going through scalar `evaluate`, for the range-consuming functions below.
fn resolve_grid(expr: &Expr, ctx: &EvalContext) -> Result<Vec<Vec<Value>>, EvalError> {
    match expr {
        Expr::RangeRef(range) => ctx.range_grid(ctx.sheet_index, *range),
        Expr::SheetRange(sheet, range) => {
            let idx = ctx.resolve_sheet(sheet)?;
            ctx.range_grid(idx, *range)
        }
        Expr::Ref(aref) => Ok(vec![vec![ctx.cell_value(ctx.sheet_index, *aref)?]]),
        Expr::SheetRef(sheet, aref) => {
            let idx = ctx.resolve_sheet(sheet)?;
            Ok(vec![vec![ctx.cell_value(idx, *aref)?]])
        }
        other => Ok(vec![vec![evaluate(other, ctx)?]]),
    }
}

fn flatten(grid: Vec<Vec<Value>>) -> Vec<Value> {
    grid.into_iter().flatten().collect()
}

fn evaluate_call(spec: FunctionSpec, args: &[Expr], ctx: &EvalContext) -> Result<Value, EvalError> {
    use crate::functions::check_arity;
    let name = spec.name();

    match spec {
        FunctionSpec::If => {
            check_arity(name, args.len(), 2, Some(3))?;
            let cond = evaluate(&args[0], ctx)?;
            let cond = cond.as_bool().ok_or_else(|| EvalError::TypeMismatch {
                op: name.into(),
                expected: "bool".into(),
                got: cond.type_name().into(),
            })?;
            if cond {
                evaluate(&args[1], ctx)
            } else if let Some(else_branch) = args.get(2) {
                evaluate(else_branch, ctx)
            } else {
                Ok(Value::Bool(false))
            }
        }

        FunctionSpec::And => {
            check_arity(name, args.len(), 1, None)?;
            for a in args {
                if !logical::coerce_bool(&evaluate(a, ctx)?, name)? {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        FunctionSpec::Or => {
            check_arity(name, args.len(), 1, None)?;
            for a in args {
                if logical::coerce_bool(&evaluate(a, ctx)?, name)? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        FunctionSpec::Not => {
            check_arity(name, args.len(), 1, Some(1))?;
            logical::not(&evaluate(&args[0], ctx)?)
        }

        FunctionSpec::SumIf => {
            check_arity(name, args.len(), 2, Some(3))?;
            let range = resolve_grid(&args[0], ctx)?;
            let criteria_val = evaluate(&args[1], ctx)?;
            let sum_range = args.get(2).map(|e| resolve_grid(e, ctx)).transpose()?;
            criteria::sumif(&range, &criteria_val, sum_range.as_deref())
        }
        FunctionSpec::SumIfs => {
            check_arity(name, args.len(), 3, None)?;
            if (args.len() - 1) % 2 != 0 {
                return Err(EvalError::eval_failed_at(
                    "SUMIFS needs criteria_range/criteria pairs after sum_range",
                    "SUMIFS",
                ));
            }
            let sum_range = resolve_grid(&args[0], ctx)?;
            let mut grids = Vec::new();
            let mut criteria_vals = Vec::new();
            for pair in args[1..].chunks(2) {
                grids.push(resolve_grid(&pair[0], ctx)?);
                criteria_vals.push(evaluate(&pair[1], ctx)?);
            }
            let pairs: Vec<(&[Vec<Value>], &Value)> =
                grids.iter().map(|g| g.as_slice()).zip(criteria_vals.iter()).collect();
            criteria::sumifs(&sum_range, &pairs)
        }

        FunctionSpec::VLookup => {
            check_arity(name, args.len(), 3, Some(4))?;
            let lookup_value = evaluate(&args[0], ctx)?;
            let table = resolve_grid(&args[1], ctx)?;
            let col_index = evaluate(&args[2], ctx)?;
            let range_lookup = args.get(3).map(|e| evaluate(e, ctx)).transpose()?;
            lookup::vlookup(&lookup_value, &table, &col_index, range_lookup.as_ref())
        }
        FunctionSpec::XLookup => {
            check_arity(name, args.len(), 3, Some(4))?;
            let lookup_value = evaluate(&args[0], ctx)?;
            let lookup_array = flatten(resolve_grid(&args[1], ctx)?);
            let return_array = flatten(resolve_grid(&args[2], ctx)?);
            let if_not_found = args.get(3).map(|e| evaluate(e, ctx)).transpose()?;
            lookup::xlookup(&lookup_value, &lookup_array, &return_array, if_not_found.as_ref())
        }
        FunctionSpec::SumProduct => {
            check_arity(name, args.len(), 1, None)?;
            let grids = args.iter().map(|e| resolve_grid(e, ctx)).collect::<Result<Vec<_>, _>>()?;
            math::sumproduct(&grids)
        }

        FunctionSpec::Left => {
            check_arity(name, args.len(), 1, Some(2))?;
            let t = evaluate(&args[0], ctx)?;
            let c = args.get(1).map(|e| evaluate(e, ctx)).transpose()?;
            text::left(&t, c.as_ref())
        }
        FunctionSpec::Right => {
            check_arity(name, args.len(), 1, Some(2))?;
            let t = evaluate(&args[0], ctx)?;
            let c = args.get(1).map(|e| evaluate(e, ctx)).transpose()?;
            text::right(&t, c.as_ref())
        }
        FunctionSpec::Mid => {
            check_arity(name, args.len(), 3, Some(3))?;
            let t = evaluate(&args[0], ctx)?;
            let start = evaluate(&args[1], ctx)?;
            let count = evaluate(&args[2], ctx)?;
            text::mid(&t, &start, &count)
        }
        FunctionSpec::Len => {
            check_arity(name, args.len(), 1, Some(1))?;
            Ok(text::len(&evaluate(&args[0], ctx)?))
        }
        FunctionSpec::Concatenate => {
            check_arity(name, args.len(), 1, None)?;
            let values = args.iter().map(|a| evaluate(a, ctx)).collect::<Result<Vec<_>, _>>()?;
            Ok(text::concatenate(&values))
        }
        FunctionSpec::Upper => {
            check_arity(name, args.len(), 1, Some(1))?;
            Ok(text::upper(&evaluate(&args[0], ctx)?))
        }
        FunctionSpec::Lower => {
            check_arity(name, args.len(), 1, Some(1))?;
            Ok(text::lower(&evaluate(&args[0], ctx)?))
        }
        FunctionSpec::Trim => {
            check_arity(name, args.len(), 1, Some(1))?;
            Ok(text::trim(&evaluate(&args[0], ctx)?))
        }
        FunctionSpec::Text => {
            check_arity(name, args.len(), 2, Some(2))?;
            let v = evaluate(&args[0], ctx)?;
            let code = evaluate(&args[1], ctx)?;
            text::text(&v, &code)
        }

        FunctionSpec::Date => {
            check_arity(name, args.len(), 3, Some(3))?;
            let y = evaluate(&args[0], ctx)?;
            let m = evaluate(&args[1], ctx)?;
            let d = evaluate(&args[2], ctx)?;
            date::date(&y, &m, &d)
        }
        FunctionSpec::Year => {
            check_arity(name, args.len(), 1, Some(1))?;
            date::year(&evaluate(&args[0], ctx)?)
        }
        FunctionSpec::Month => {
            check_arity(name, args.len(), 1, Some(1))?;
            date::month(&evaluate(&args[0], ctx)?)
        }
        FunctionSpec::Day => {
            check_arity(name, args.len(), 1, Some(1))?;
            date::day(&evaluate(&args[0], ctx)?)
        }
        FunctionSpec::Today => {
            check_arity(name, args.len(), 0, Some(0))?;
            Ok(date::today(ctx.now()))
        }
        FunctionSpec::Now => {
            check_arity(name, args.len(), 0, Some(0))?;
            Ok(date::now(ctx.now()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_formula;
    use xlforge_core::{CellValue, Column, Row, Sheet, SheetName};

    fn workbook_with(values: &[(&str, u32, u32, CellValue)]) -> Workbook {
        let mut sheet = Sheet::new(SheetName::new("Sheet1").unwrap());
        for (_, row, col, value) in values {
            let aref = ARef::new(Row::new(*row).unwrap(), Column::new(*col).unwrap());
            sheet = sheet.put(aref, value.clone());
        }
        Workbook::from_sheets(vec![sheet]).unwrap()
    }

    fn eval_str(formula: &str, wb: &Workbook) -> Result<Value, crate::error::FormulaError> {
        let expr = parse_formula(formula)?;
        let ctx = EvalContext::new(wb, 0);
        Ok(evaluate(&expr, &ctx)?)
    }

    #[test]
    fn arithmetic_and_precedence() {
        let wb = workbook_with(&[]);
        assert_eq!(eval_str("=1+2*3", &wb).unwrap(), Value::Number(Decimal::from(7)));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let wb = workbook_with(&[]);
        assert!(matches!(eval_str("=1/0", &wb), Err(crate::error::FormulaError::Eval(EvalError::DivByZero(..)))));
    }

    #[test]
    fn cell_reference_reads_stored_value() {
        let wb = workbook_with(&[("Sheet1", 0, 0, CellValue::Number(Decimal::from(42)))]);
        assert_eq!(eval_str("=A1", &wb).unwrap(), Value::Number(Decimal::from(42)));
    }

    #[test]
    fn sum_aggregate_over_range() {
        let wb = workbook_with(&[
            ("Sheet1", 0, 0, CellValue::Number(Decimal::from(1))),
            ("Sheet1", 1, 0, CellValue::Number(Decimal::from(2))),
            ("Sheet1", 2, 0, CellValue::Number(Decimal::from(3))),
        ]);
        assert_eq!(eval_str("=SUM(A1:A3)", &wb).unwrap(), Value::Number(Decimal::from(6)));
    }

    #[test]
    fn average_of_no_numeric_cells_is_div_by_zero() {
        let wb = workbook_with(&[]);
        assert!(matches!(
            eval_str("=AVERAGE(A1:A3)", &wb),
            Err(crate::error::FormulaError::Eval(EvalError::DivByZero(..)))
        ));
    }

    #[test]
    fn if_only_evaluates_taken_branch() {
        let wb = workbook_with(&[("Sheet1", 0, 1, CellValue::Number(Decimal::ZERO))]);
        // B1 = 0, so 1/B1 would be #DIV/0! if evaluated; IF must not take that branch.
        assert_eq!(eval_str("=IF(B1=0,0,1/B1)", &wb).unwrap(), Value::Number(Decimal::ZERO));
    }

    #[test]
    fn and_short_circuits_on_first_false() {
        let wb = workbook_with(&[("Sheet1", 0, 1, CellValue::Number(Decimal::ZERO))]);
        // B1 = 0, so 1/B1 would be #DIV/0! if evaluated; AND must not reach it.
        assert_eq!(eval_str("=AND(FALSE,1/B1>0)", &wb).unwrap(), Value::Bool(false));
    }

    #[test]
    fn or_short_circuits_on_first_true() {
        let wb = workbook_with(&[("Sheet1", 0, 1, CellValue::Number(Decimal::ZERO))]);
        assert_eq!(eval_str("=OR(TRUE,1/B1>0)", &wb).unwrap(), Value::Bool(true));
    }

    #[test]
    fn vlookup_exact_match() {
        let wb = workbook_with(&[
            ("Sheet1", 0, 0, CellValue::Text("a".into())),
            ("Sheet1", 0, 1, CellValue::Number(Decimal::from(1))),
            ("Sheet1", 1, 0, CellValue::Text("b".into())),
            ("Sheet1", 1, 1, CellValue::Number(Decimal::from(2))),
        ]);
        assert_eq!(
            eval_str("=VLOOKUP(\"b\",A1:B2,2,FALSE)", &wb).unwrap(),
            Value::Number(Decimal::from(2))
        );
    }

    #[test]
    fn concat_joins_numbers_and_text() {
        let wb = workbook_with(&[]);
        assert_eq!(eval_str("=\"x=\"&1", &wb).unwrap(), Value::Text("x=1".into()));
    }
}
