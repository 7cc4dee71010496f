//! # nestgrid
//!
//! A formula engine for tables whose cells can hold further tables.
//!
//! Nestgrid evaluates spreadsheet-style formulas bound to the cells of a
//! [`Table`]. References reach into nested tables with dotted addresses such
//! as `B2.A1`, and a recompute pass stores every result back into its cell.
//!
//! ## Features
//!
//! - Addresses, ranges and nested references with `$` absolute parts
//! - Formula parsing with per-function argument contracts
//! - Math, logical, text and statistical built-ins, including criteria
//!   functions such as `COUNTIF`
//! - Dependency-ordered recompute with per-cell failures
//! - Reference translation when a formula is copied to another cell
//!
//! ## Example
//!
//! ```rust
//! use nestgrid::prelude::*;
//!
//! let mut table = Table::new(2, 2);
//! table.set_sub_table(1, 1, SubTableKind::Collection, Table::new(2, 1)).unwrap();
//! table.cell_at_mut(1, 1).unwrap().sub_table_mut().unwrap().set_value(2, 1, 4.0).unwrap();
//!
//! let mut bindings = FormulaBindings::new();
//! bindings.set(table.cell_at(2, 2).unwrap().id(), "=A1.B1*10");
//!
//! let report = table.recalculate(&bindings);
//! assert!(report.is_clean());
//! assert_eq!(table.cell_at(2, 2).unwrap().value(), Some(&CellValue::Number(40.0)));
//! ```

pub mod calculation;
pub mod copy;
pub mod prelude;

// Re-export calculation types
pub use calculation::{
    CalculationOptions, CalculationReport, CalculationStats, Calculator, TableCalculationExt,
};
pub use copy::copy_formula;

// Re-export core types
pub use nestgrid_core::{
    column_to_letters, letters_to_column, resolve_location, resolve_range, resolve_reference,
    resolve_single, Address, AnchorId, AnchorKind, AxisRef, Cell, CellAnchor, CellContent,
    CellId, CellLocation, CellValue, Coord, Error, FormulaBindings, RangeAddress, Reference,
    Result, Segment, SubTableKind, Table, ValueType,
};

// Re-export formula types
pub use nestgrid_formula::{
    coerce, evaluate, evaluate_formula, parse_formula, registry, translate, ErrorKind,
    EvaluationContext, ExpressionCache, FormulaError, FormulaExpr, FormulaResult, FormulaValue,
    FunctionRegistry, ParsedFormula, ScheduleMode,
};
