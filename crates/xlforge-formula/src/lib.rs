//! # xlforge-formula
//!
//! Formula parser and evaluator.
//!
//! This crate provides:
//! - Formula parsing (text → typed [`ast::Expr`])
//! - Formula evaluation ([`ast::Expr`] → [`ast::Value`], against a workbook
//!   snapshot)
//! - A closed catalog of built-in functions, dispatched by matching on
//!   [`ast::FunctionSpec`] rather than a string-keyed registry
//! - A dependency graph for calculation-chain ordering, surfacing circular
//!   references as data instead of silently dropping them
//!
//! ## Example
//!
//! ```rust,ignore
//! use xlforge_formula::{parse_formula, evaluate, EvalContext};
//!
//! let expr = parse_formula("=SUM(A1:A10)")?;
//! let ctx = EvalContext::new(&workbook, sheet_index);
//! let result = evaluate(&expr, &ctx)?;
//! ```

pub mod ast;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;

pub use ast::{AggregatorId, Expr, FunctionSpec, RangeLocation, Value};
pub use dependency::{DependencyGraph, QualifiedRef};
pub use error::{EvalError, FormulaError, FormulaResult, ParseError};
pub use evaluator::{evaluate, EvalContext};
pub use parser::parse_formula;
