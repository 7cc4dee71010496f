//! # nestgrid-core
//!
//! Core data structures for the nestgrid formula engine.
//!
//! This crate provides:
//! - [`Table`], [`Cell`] and [`CellAnchor`] - a grid whose cells may own nested tables
//! - [`Address`], [`RangeAddress`] and [`Reference`] - textual coordinates such as `B2.$A1`
//! - [`resolve`] - mapping addresses onto cells
//! - [`FormulaBindings`] - the cell id to formula text map consumed by recompute passes
//!
//! ## Example
//!
//! ```rust
//! use nestgrid_core::{resolve, Address, CellValue, Table};
//!
//! let mut table = Table::new(3, 3);
//! table.set_value(2, 1, 42.0).unwrap();
//!
//! let cell = resolve::resolve_single(&Address::parse("B1").unwrap(), &table, true).unwrap();
//! assert_eq!(cell.value(), Some(&CellValue::Number(42.0)));
//! ```

pub mod address;
pub mod bindings;
pub mod error;
pub mod resolve;
pub mod table;

// Re-exports for convenience
pub use address::{column_to_letters, letters_to_column, Address, AxisRef, RangeAddress, Reference, Segment};
pub use bindings::FormulaBindings;
pub use error::{Error, Result};
pub use resolve::{resolve_location, resolve_range, resolve_reference, resolve_single};
pub use table::{
    AnchorId, AnchorKind, Cell, CellAnchor, CellContent, CellId, CellLocation, CellValue, Coord,
    SubTableKind, Table, ValueType,
};
