//! Eager recalculation: after a `Sheet::put`, find every formula cell that
//! transitively depends on what changed, re-evaluate it in dependency order,
//! and write its new cached value back into the workbook.
//!
//! # Example
//!
//! ```rust,ignore
//! use xlforge::prelude::*;
//! use xlforge::calculation::{build_dependency_graph, WorkbookCalculationExt};
//!
//! let graph = build_dependency_graph(&workbook);
//! let (workbook, stats) = workbook.recalculate(&graph, &[modified_ref]);
//! println!("recalculated {} cells", stats.cells_recalculated);
//! ```

use std::collections::HashMap;

use xlforge_core::{ARef, CellError, CellValue, SheetName, Workbook};
use xlforge_formula::{evaluate, parse_formula, DependencyGraph, EvalContext, Expr, QualifiedRef, RangeLocation, Value};

/// Statistics from one [`recalculate`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationStats {
    /// Formula cells whose cached value was recomputed.
    pub cells_recalculated: usize,
    /// Cells caught in a dependency cycle; their caches were cleared to a
    /// `#REF!` error rather than recomputed.
    pub cycles_detected: usize,
    /// Longest dependency chain walked from the modified set, in edges.
    pub max_depth: u32,
}

/// Build the dependency graph for every formula cell in `workbook`: one
/// edge per cell reference or range cell a formula's text reads.
pub fn build_dependency_graph(workbook: &Workbook) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for sheet in workbook.sheets() {
        let sheet_name = sheet.name().clone();
        for cell in sheet.formula_cells() {
            let Some(text) = cell.value.formula_text() else { continue };
            let Ok(ast) = parse_formula(text) else { continue };
            let dependent = QualifiedRef::new(sheet_name.clone(), cell.reference);
            let mut precedents = Vec::new();
            collect_references(&ast, &sheet_name, &mut precedents);
            for precedent in precedents {
                graph.add_dependency(precedent, dependent.clone());
            }
        }
    }
    graph
}

fn collect_references(expr: &Expr, current_sheet: &SheetName, out: &mut Vec<QualifiedRef>) {
    match expr {
        Expr::Lit(_) | Expr::PolyRef(_) | Expr::SheetPolyRef(_, _) => {}
        Expr::Ref(aref) => out.push(QualifiedRef::new(current_sheet.clone(), *aref)),
        Expr::SheetRef(sheet, aref) => out.push(QualifiedRef::new(sheet.clone(), *aref)),
        Expr::RangeRef(range) => {
            for aref in range.cells() {
                out.push(QualifiedRef::new(current_sheet.clone(), aref));
            }
        }
        Expr::SheetRange(sheet, range) => {
            for aref in range.cells() {
                out.push(QualifiedRef::new(sheet.clone(), aref));
            }
        }
        Expr::Add(a, b)
        | Expr::Sub(a, b)
        | Expr::Mul(a, b)
        | Expr::Div(a, b)
        | Expr::Concat(a, b)
        | Expr::Lt(a, b)
        | Expr::Lte(a, b)
        | Expr::Gt(a, b)
        | Expr::Gte(a, b)
        | Expr::Eq(a, b)
        | Expr::Neq(a, b) => {
            collect_references(a, current_sheet, out);
            collect_references(b, current_sheet, out);
        }
        Expr::ToInt(a) | Expr::DateToSerial(a) | Expr::DateTimeToSerial(a) => {
            collect_references(a, current_sheet, out)
        }
        Expr::Aggregate(_, location) => match location {
            RangeLocation::Local(range) => {
                for aref in range.cells() {
                    out.push(QualifiedRef::new(current_sheet.clone(), aref));
                }
            }
            RangeLocation::CrossSheet(sheet, range) => {
                for aref in range.cells() {
                    out.push(QualifiedRef::new(sheet.clone(), aref));
                }
            }
        },
        Expr::Call(_, args) => {
            for arg in args {
                collect_references(arg, current_sheet, out);
            }
        }
    }
}

fn value_to_cell_value(value: Value) -> CellValue {
    match value {
        Value::Number(n) => CellValue::Number(n),
        Value::Text(s) => CellValue::text(s),
        Value::Bool(b) => CellValue::Bool(b),
        Value::DateTime(dt) => CellValue::DateTime(dt),
        Value::Error(e) => CellValue::from(e),
        Value::Empty => CellValue::Empty,
    }
}

/// Re-evaluate every formula cell transitively affected by `modified`, in
/// dependency order, and write the new cached values back into a fresh
/// `Workbook`. A dependency cycle reachable from `modified` aborts ordering
/// for the whole affected set; every cell in it gets its cache cleared to a
/// `#REF!` error so the next read surfaces the cycle instead of a stale
/// value, and `cells_recalculated` stays at zero for that call.
pub fn recalculate(workbook: &Workbook, graph: &DependencyGraph, modified: &[QualifiedRef]) -> (Workbook, CalculationStats) {
    let mut stats = CalculationStats::default();
    stats.max_depth = bfs_depth(graph, modified);

    let order = match graph.topological_sort(modified) {
        Ok(order) => order,
        Err(unordered) => {
            stats.cycles_detected = unordered.len();
            let workbook = clear_cycle_caches(workbook, &unordered);
            return (workbook, stats);
        }
    };

    let mut workbook = workbook.clone();
    for cell_ref in &order {
        let Some(sheet_index) = workbook.sheet_index(cell_ref.sheet.as_str()) else { continue };
        let Ok(sheet) = workbook.sheet(sheet_index) else { continue };
        let cell = sheet.get(cell_ref.reference);
        let Some(text) = cell.value.formula_text().map(str::to_string) else { continue };

        let new_value = match parse_formula(&text) {
            Ok(ast) => {
                let ctx = EvalContext::new(&workbook, sheet_index);
                match evaluate(&ast, &ctx) {
                    Ok(value) => CellValue::formula_with_cache(text, value_to_cell_value(value)),
                    Err(e) => CellValue::formula_with_cache(text, CellValue::from(e.as_cell_error())),
                }
            }
            Err(_) => CellValue::formula(text),
        };

        let sheet = workbook.sheet(sheet_index).expect("checked above").put(cell_ref.reference, new_value);
        workbook = workbook.with_sheet(sheet_index, sheet).expect("sheet_index came from this workbook");
        stats.cells_recalculated += 1;
    }

    (workbook, stats)
}

fn clear_cycle_caches(workbook: &Workbook, cells: &[QualifiedRef]) -> Workbook {
    let mut workbook = workbook.clone();
    for cell_ref in cells {
        let Some(sheet_index) = workbook.sheet_index(cell_ref.sheet.as_str()) else { continue };
        let Ok(sheet) = workbook.sheet(sheet_index) else { continue };
        let cell = sheet.get(cell_ref.reference);
        let Some(text) = cell.value.formula_text().map(str::to_string) else { continue };
        let sheet = sheet.put(cell_ref.reference, CellValue::formula_with_cache(text, CellValue::from(CellError::Ref)));
        workbook = workbook.with_sheet(sheet_index, sheet).expect("sheet_index came from this workbook");
    }
    workbook
}

/// BFS layer depth of the dependency graph reachable from `roots`, for
/// reporting only; does not affect recalculation order.
fn bfs_depth(graph: &DependencyGraph, roots: &[QualifiedRef]) -> u32 {
    let mut depth: HashMap<QualifiedRef, u32> = roots.iter().map(|r| (r.clone(), 0)).collect();
    let mut frontier: Vec<QualifiedRef> = roots.to_vec();
    let mut level = 0u32;
    while !frontier.is_empty() {
        level += 1;
        let mut next = Vec::new();
        for cell in &frontier {
            for dependent in graph.dependents_of(cell) {
                if !depth.contains_key(&dependent) {
                    depth.insert(dependent.clone(), level);
                    next.push(dependent);
                }
            }
        }
        frontier = next;
    }
    depth.values().copied().max().unwrap_or(0)
}

/// Extension trait form of [`recalculate`], for use through [`crate::prelude`].
pub trait WorkbookCalculationExt {
    fn recalculate(&self, graph: &DependencyGraph, modified: &[QualifiedRef]) -> (Workbook, CalculationStats);
}

impl WorkbookCalculationExt for Workbook {
    fn recalculate(&self, graph: &DependencyGraph, modified: &[QualifiedRef]) -> (Workbook, CalculationStats) {
        recalculate(self, graph, modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xlforge_core::{Column, Row, Sheet, SheetName};

    fn a1(row: u32, col: u32) -> ARef {
        ARef::new(Row::new(row).unwrap(), Column::new(col).unwrap())
    }

    fn qref(sheet: &str, row: u32, col: u32) -> QualifiedRef {
        QualifiedRef::new(SheetName::new(sheet).unwrap(), a1(row, col))
    }

    fn workbook_with(sheet: Sheet) -> Workbook {
        Workbook::from_sheets(vec![sheet]).unwrap()
    }

    #[test]
    fn recalculates_a_simple_chain() {
        let sheet = Sheet::new(SheetName::new("Sheet1").unwrap())
            .put(a1(0, 0), CellValue::Number(5.into()))
            .put(a1(1, 0), CellValue::formula("A1*2"))
            .put(a1(2, 0), CellValue::formula("A2+10"));
        let workbook = workbook_with(sheet);
        let graph = build_dependency_graph(&workbook);

        let (workbook, stats) = recalculate(&workbook, &graph, &[qref("Sheet1", 0, 0)]);

        assert_eq!(stats.cells_recalculated, 2);
        assert_eq!(stats.cycles_detected, 0);
        let sheet = workbook.sheet(0).unwrap();
        assert_eq!(sheet.get(a1(1, 0)).value.effective_value(), &CellValue::Number(10.into()));
        assert_eq!(sheet.get(a1(2, 0)).value.effective_value(), &CellValue::Number(20.into()));
    }

    #[test]
    fn sum_over_a_range_recalculates_on_precedent_change() {
        let sheet = Sheet::new(SheetName::new("Sheet1").unwrap())
            .put(a1(0, 0), CellValue::Number(1.into()))
            .put(a1(1, 0), CellValue::Number(2.into()))
            .put(a1(2, 0), CellValue::formula("SUM(A1:A2)"));
        let workbook = workbook_with(sheet);
        let graph = build_dependency_graph(&workbook);

        let (workbook, stats) = recalculate(&workbook, &graph, &[qref("Sheet1", 0, 0), qref("Sheet1", 1, 0)]);

        assert_eq!(stats.cells_recalculated, 1);
        let sheet = workbook.sheet(0).unwrap();
        assert_eq!(sheet.get(a1(2, 0)).value.effective_value(), &CellValue::Number(3.into()));
    }

    #[test]
    fn circular_reference_clears_caches_instead_of_computing() {
        let sheet = Sheet::new(SheetName::new("Sheet1").unwrap())
            .put(a1(0, 0), CellValue::formula("B1"))
            .put(a1(0, 1), CellValue::formula("A1"));
        let workbook = workbook_with(sheet);
        let graph = build_dependency_graph(&workbook);

        let (workbook, stats) = recalculate(&workbook, &graph, &[qref("Sheet1", 0, 0)]);

        assert_eq!(stats.cells_recalculated, 0);
        assert_eq!(stats.cycles_detected, 2);
        let sheet = workbook.sheet(0).unwrap();
        assert_eq!(sheet.get(a1(0, 0)).value.effective_value(), &CellValue::from(CellError::Ref));
    }

    #[test]
    fn cross_sheet_reference_is_tracked() {
        let sheet1 = Sheet::new(SheetName::new("Sheet1").unwrap()).put(a1(0, 0), CellValue::Number(7.into()));
        let sheet2 =
            Sheet::new(SheetName::new("Sheet2").unwrap()).put(a1(0, 0), CellValue::formula("Sheet1!A1+1"));
        let workbook = Workbook::from_sheets(vec![sheet1, sheet2]).unwrap();
        let graph = build_dependency_graph(&workbook);

        let (workbook, stats) = recalculate(&workbook, &graph, &[qref("Sheet1", 0, 0)]);

        assert_eq!(stats.cells_recalculated, 1);
        let sheet2 = workbook.sheet(1).unwrap();
        assert_eq!(sheet2.get(a1(0, 0)).value.effective_value(), &CellValue::Number(8.into()));
    }
}
