//! Prelude module - common imports for nestgrid users
//!
//! ```rust
//! use nestgrid::prelude::*;
//! ```

pub use crate::{
    // Addressing
    Address,
    // Calculation types
    CalculationOptions,
    CalculationReport,
    CalculationStats,
    Calculator,
    // Main types
    Cell,
    CellId,
    CellValue,
    // Error types
    Error,
    ErrorKind,
    FormulaBindings,
    FormulaError,
    FormulaResult,
    RangeAddress,
    Reference,
    Result,
    ScheduleMode,
    SubTableKind,
    Table,
    // Extension traits
    TableCalculationExt,
    ValueType,

    copy_formula,
};
