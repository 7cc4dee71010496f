//! Reference resolution
//!
//! Maps parsed addresses onto the cells of a root [`Table`]. `$` markers play
//! no part here; they only matter when a formula is translated.

use crate::address::{Address, RangeAddress, Reference, Segment};
use crate::error::{Error, Result};
use crate::table::{Cell, CellLocation, Coord, Table};

/// Resolve a single address to its cell
///
/// Every segment but the last must land on a sub-table cell, whose nested table
/// becomes the table the next segment is looked up in. A segment that names
/// only a column is completed with row 1 when `single_part_means_range_start`
/// is set and with the table's last row otherwise; a row-only segment is
/// completed with column A or the last column the same way.
pub fn resolve_single<'t>(
    address: &Address,
    root: &'t Table,
    single_part_means_range_start: bool,
) -> Result<&'t Cell> {
    walk(address, root, single_part_means_range_start).map(|(_, cell)| cell)
}

/// Resolve a single address to the coordinates it passes through
pub fn resolve_location(
    address: &Address,
    root: &Table,
    single_part_means_range_start: bool,
) -> Result<CellLocation> {
    walk(address, root, single_part_means_range_start)
        .map(|(coords, _)| CellLocation::new(coords))
}

/// Resolve a range to its cells
///
/// Both endpoints must sit at the same depth. The rectangle between them is
/// inclusive at every depth and independent of the endpoints' order; cells come
/// out row-major, or column-major when the enclosing table is transposed.
/// Positions falling outside a nested table are skipped.
pub fn resolve_range<'t>(range: &RangeAddress, root: &'t Table) -> Result<Vec<&'t Cell>> {
    let (start, _) = walk(&range.start, root, true)?;
    let (end, _) = walk(&range.end, root, false)?;

    if start.len() != end.len() {
        return Err(Error::DepthMismatch {
            start: start.len() - 1,
            end: end.len() - 1,
        });
    }

    let mut cells = Vec::new();
    collect(root, &start, &end, &mut cells);
    Ok(cells)
}

/// Resolve either kind of reference to the cells it covers
pub fn resolve_reference<'t>(reference: &Reference, root: &'t Table) -> Result<Vec<&'t Cell>> {
    match reference {
        Reference::Single(address) => resolve_single(address, root, true).map(|cell| vec![cell]),
        Reference::Range(range) => resolve_range(range, root),
    }
}

fn complete(segment: &Segment, table: &Table, range_start: bool) -> Coord {
    let column = match segment.column {
        Some(column) => column.position,
        None if range_start => 1,
        None => table.column_count(),
    };
    let row = match segment.row {
        Some(row) => row.position,
        None if range_start => 1,
        None => table.row_count(),
    };
    Coord::new(column, row)
}

fn walk<'t>(address: &Address, root: &'t Table, range_start: bool) -> Result<(Vec<Coord>, &'t Cell)> {
    let segments = address.segments();
    let mut coords = Vec::with_capacity(segments.len());
    let mut table = root;

    for (i, segment) in segments.iter().enumerate() {
        let coord = complete(segment, table, range_start);
        let cell = table.cell_at(coord.column, coord.row).ok_or_else(|| {
            Error::resolution(format!("'{}' has no cell at {}", address, coord))
        })?;
        coords.push(coord);

        if i + 1 == segments.len() {
            return Ok((coords, cell));
        }

        table = cell.sub_table().ok_or_else(|| {
            Error::NotATable(format!("{} in '{}'", CellLocation::new(coords.clone()), address))
        })?;
    }

    Err(Error::format("empty address"))
}

fn axis(from: u32, to: u32) -> Vec<u32> {
    if from <= to {
        (from..=to).collect()
    } else {
        (to..=from).rev().collect()
    }
}

fn collect<'t>(table: &'t Table, start: &[Coord], end: &[Coord], out: &mut Vec<&'t Cell>) {
    let (Some((s, start_rest)), Some((e, end_rest))) = (start.split_first(), end.split_first())
    else {
        return;
    };

    let columns = axis(s.column, e.column);
    let rows = axis(s.row, e.row);

    if table.is_transposed() {
        for &column in &columns {
            for &row in &rows {
                visit(table, column, row, start_rest, end_rest, out);
            }
        }
    } else {
        for &row in &rows {
            for &column in &columns {
                visit(table, column, row, start_rest, end_rest, out);
            }
        }
    }
}

fn visit<'t>(
    table: &'t Table,
    column: u32,
    row: u32,
    start_rest: &[Coord],
    end_rest: &[Coord],
    out: &mut Vec<&'t Cell>,
) {
    let Some(cell) = table.cell_at(column, row) else {
        return;
    };
    if start_rest.is_empty() {
        out.push(cell);
    } else if let Some(sub) = cell.sub_table() {
        collect(sub, start_rest, end_rest, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{CellId, SubTableKind};
    use pretty_assertions::assert_eq;

    fn grid(columns: u32, rows: u32) -> Table {
        let mut table = Table::new(columns, rows);
        for c in 1..=columns {
            for r in 1..=rows {
                table.set_value(c, r, format!("{}", Coord::new(c, r))).unwrap();
            }
        }
        table
    }

    fn names(cells: &[&Cell]) -> Vec<String> {
        cells
            .iter()
            .map(|c| c.value().map(|v| v.to_string()).unwrap_or_default())
            .collect()
    }

    fn range(text: &str) -> RangeAddress {
        RangeAddress::parse(text).unwrap()
    }

    #[test]
    fn test_resolve_single() {
        let table = grid(3, 3);
        let cell = resolve_single(&Address::parse("B3").unwrap(), &table, true).unwrap();
        assert_eq!(cell.value().unwrap().to_string(), "B3");

        let cell = resolve_single(&Address::parse("$B$3").unwrap(), &table, true).unwrap();
        assert_eq!(cell.value().unwrap().to_string(), "B3");

        assert!(matches!(
            resolve_single(&Address::parse("D1").unwrap(), &table, true),
            Err(Error::Resolution(_))
        ));
    }

    #[test]
    fn test_single_axis_completion() {
        let table = grid(3, 4);
        let column = Address::parse("B").unwrap();
        let row = Address::parse("2").unwrap();

        let at = |addr: &Address, start| {
            resolve_single(addr, &table, start)
                .unwrap()
                .value()
                .unwrap()
                .to_string()
        };
        assert_eq!(at(&column, true), "B1");
        assert_eq!(at(&column, false), "B4");
        assert_eq!(at(&row, true), "A2");
        assert_eq!(at(&row, false), "C2");
    }

    #[test]
    fn test_range_is_inclusive_and_direction_agnostic() {
        let table = grid(3, 3);
        let forward = resolve_range(&range("A1:C3"), &table).unwrap();
        let backward = resolve_range(&range("C3:A1"), &table).unwrap();

        assert_eq!(forward.len(), 9);
        assert_eq!(
            names(&forward),
            vec!["A1", "B1", "C1", "A2", "B2", "C2", "A3", "B3", "C3"]
        );

        let mut a: Vec<CellId> = forward.iter().map(|c| c.id()).collect();
        let mut b: Vec<CellId> = backward.iter().map(|c| c.id()).collect();
        assert_eq!(names(&backward)[0], "C3");
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn test_range_mixed_direction() {
        let table = grid(3, 3);
        let cells = resolve_range(&range("C1:A2"), &table).unwrap();
        assert_eq!(names(&cells), vec!["C1", "B1", "A1", "C2", "B2", "A2"]);
    }

    #[test]
    fn test_transposed_range_is_column_major() {
        let mut table = grid(2, 2);
        table.set_transposed(true);
        let cells = resolve_range(&range("A1:B2"), &table).unwrap();
        assert_eq!(names(&cells), vec!["A1", "A2", "B1", "B2"]);
    }

    #[test]
    fn test_whole_columns_and_rows() {
        let table = grid(3, 4);
        let cells = resolve_range(&range("B:C"), &table).unwrap();
        assert_eq!(cells.len(), 8);

        let cells = resolve_range(&range("2:3"), &table).unwrap();
        assert_eq!(names(&cells), vec!["A2", "B2", "C2", "A3", "B3", "C3"]);
    }

    #[test]
    fn test_nested_resolution() {
        let inner = grid(2, 2);
        let mut root = grid(2, 2);
        root.set_sub_table(2, 2, SubTableKind::Fields, inner).unwrap();

        let cell = resolve_single(&Address::parse("B2.A2").unwrap(), &root, true).unwrap();
        assert_eq!(cell.value().unwrap().to_string(), "A2");

        let location = resolve_location(&Address::parse("B2.A2").unwrap(), &root, true).unwrap();
        assert_eq!(location.to_string(), "B2.A2");
        assert_eq!(location.depth(), 1);

        let cells = resolve_range(&range("B2.A1:B2.B1"), &root).unwrap();
        assert_eq!(names(&cells), vec!["A1", "B1"]);
    }

    #[test]
    fn test_non_table_segment_fails() {
        let root = grid(2, 2);
        assert!(matches!(
            resolve_single(&Address::parse("A1.A1").unwrap(), &root, true),
            Err(Error::NotATable(_))
        ));
    }

    #[test]
    fn test_range_depth_mismatch() {
        let mut root = grid(2, 2);
        root.set_sub_table(1, 1, SubTableKind::Collection, grid(1, 1))
            .unwrap();
        assert_eq!(
            resolve_range(&range("A1.A1:B2"), &root).unwrap_err(),
            Error::DepthMismatch { start: 1, end: 0 }
        );
    }

    #[test]
    fn test_nested_range_spans_sibling_tables() {
        let mut root = Table::new(2, 1);
        root.set_sub_table(1, 1, SubTableKind::Collection, grid(1, 2))
            .unwrap();
        root.set_sub_table(2, 1, SubTableKind::Collection, grid(1, 3))
            .unwrap();

        // The deeper rectangle A1:A3 is clipped to each nested table.
        let cells = resolve_range(&range("A1.A1:B1.A3"), &root).unwrap();
        assert_eq!(names(&cells), vec!["A1", "A2", "A1", "A2", "A3"]);
    }
}
