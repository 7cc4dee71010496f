//! Copying formulas between cells

use crate::{resolve_single, translate, Address, CellId, FormulaBindings, FormulaError, FormulaResult, Table};
use log::debug;

/// Copy the formula bound at `origin` to `destination`, shifting its relative
/// references by the distance between the two cells
///
/// Returns the id of the destination cell, whose previous binding (if any) is
/// replaced. Fails without touching `bindings` when `origin` has no formula or
/// a translated reference would leave the table.
pub fn copy_formula(
    table: &Table,
    bindings: &mut FormulaBindings,
    origin: &Address,
    destination: &Address,
) -> FormulaResult<CellId> {
    let from = resolve_single(origin, table, true)?.id();
    let to = resolve_single(destination, table, true)?.id();

    let formula = bindings
        .get(from)
        .ok_or_else(|| FormulaError::Resolution(format!("no formula is bound at {}", origin)))?;
    let translated = translate(formula, origin, destination, table)?;

    debug!("copied {} -> {} as {:?}", origin, destination, translated);
    bindings.set(to, translated);
    Ok(to)
}
