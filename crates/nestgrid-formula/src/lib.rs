//! # nestgrid-formula
//!
//! Formula parser, evaluator and scheduler for nestgrid.
//!
//! This crate provides:
//! - Formula parsing (text → AST), with function calls checked against their
//!   argument contracts at parse time
//! - Formula evaluation (AST → value) against a `(root table, cell id)` context
//! - Built-in functions and criteria matching
//! - Relative reference translation for copied formulas
//! - Dependency graph and evaluation ordering for recompute passes
//!
//! ## Example
//!
//! ```rust
//! use nestgrid_core::Table;
//! use nestgrid_formula::{evaluate_formula, parse_formula, EvaluationContext, FormulaValue};
//!
//! let mut table = Table::new(2, 1);
//! table.set_value(1, 1, 20.0).unwrap();
//! let target = table.cell_at(2, 1).unwrap().id();
//!
//! let parsed = parse_formula("=A1*2+1").unwrap();
//! let value = evaluate_formula(&parsed, &EvaluationContext::new(&table, target)).unwrap();
//! assert_eq!(value, FormulaValue::Number(41.0));
//! ```

pub mod ast;
pub mod cache;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod schedule;
pub mod tokenizer;
pub mod translate;

pub use ast::{
    ArgKind, ArgKinds, Argument, BinaryOperator, CompareOperator, FormulaExpr, ParsedFormula,
    UnaryOperator,
};
pub use cache::ExpressionCache;
pub use dependency::{CycleError, DependencyGraph, FunctionNode, NodeId};
pub use error::{ErrorKind, FormulaError, FormulaResult};
pub use evaluator::{coerce, evaluate, evaluate_formula, EvaluationContext, FormulaValue};
pub use functions::{registry, FunctionDef, FunctionRegistry, ReturnType};
pub use parser::{parse_expression, parse_formula, parse_formula_with};
pub use schedule::ScheduleMode;
pub use translate::translate;
