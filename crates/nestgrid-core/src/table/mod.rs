//! Nested table model
//!
//! A [`Table`] is an ordered grid of [`Cell`]s addressed by 1-based column and
//! row positions. Positions live on [`CellAnchor`]s rather than on cells, so
//! reordering rows or columns only renumbers anchors. A cell may own a nested
//! table (see [`CellContent::SubTable`]), which is how dotted addresses such as
//! `B2.A1` descend.

pub mod value;

pub use value::{CellValue, ValueType};

use crate::address::{column_to_letters, Address, AxisRef, Segment};
use crate::error::{Error, Result};
use ahash::AHashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CELL_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_ANCHOR_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique cell identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellId(u64);

impl CellId {
    fn next() -> Self {
        CellId(NEXT_CELL_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable identity of a row or column anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnchorId(u64);

impl AnchorId {
    fn next() -> Self {
        AnchorId(NEXT_ANCHOR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Which axis an anchor belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AnchorKind {
    Row,
    Column,
}

/// A row or column of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellAnchor {
    id: AnchorId,
    kind: AnchorKind,
    position: u32,
}

impl CellAnchor {
    fn new(kind: AnchorKind, position: u32) -> Self {
        Self {
            id: AnchorId::next(),
            kind,
            position,
        }
    }

    pub fn id(&self) -> AnchorId {
        self.id
    }

    pub fn kind(&self) -> AnchorKind {
        self.kind
    }

    /// 1-based position along the anchor's axis
    pub fn position(&self) -> u32 {
        self.position
    }
}

/// How the child rows of a nested table are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SubTableKind {
    /// Each row is a named field of one object
    Fields,
    /// Rows are list entries
    Collection,
    /// Rows are key/value entries
    Dictionary,
}

/// What a cell holds
#[derive(Debug)]
pub enum CellContent {
    Simple(CellValue),
    SubTable { kind: SubTableKind, table: Box<Table> },
}

/// A single cell
#[derive(Debug)]
pub struct Cell {
    id: CellId,
    row: AnchorId,
    column: AnchorId,
    value_type: ValueType,
    content: CellContent,
}

impl Cell {
    fn new(column: AnchorId, row: AnchorId) -> Self {
        Self {
            id: CellId::next(),
            row,
            column,
            value_type: ValueType::Any,
            content: CellContent::Simple(CellValue::Empty),
        }
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    /// Row anchor of this cell (owned by the cell's table)
    pub fn row(&self) -> AnchorId {
        self.row
    }

    /// Column anchor of this cell (owned by the cell's table)
    pub fn column(&self) -> AnchorId {
        self.column
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn set_value_type(&mut self, value_type: ValueType) {
        self.value_type = value_type;
    }

    pub fn content(&self) -> &CellContent {
        &self.content
    }

    /// The stored value, or `None` for a sub-table cell
    pub fn value(&self) -> Option<&CellValue> {
        match &self.content {
            CellContent::Simple(value) => Some(value),
            CellContent::SubTable { .. } => None,
        }
    }

    /// Replace the content with a simple value, dropping any nested table
    pub fn set_value(&mut self, value: impl Into<CellValue>) {
        self.content = CellContent::Simple(value.into());
    }

    pub fn is_sub_table(&self) -> bool {
        matches!(self.content, CellContent::SubTable { .. })
    }

    pub fn sub_table(&self) -> Option<&Table> {
        match &self.content {
            CellContent::SubTable { table, .. } => Some(table),
            CellContent::Simple(_) => None,
        }
    }

    pub fn sub_table_mut(&mut self) -> Option<&mut Table> {
        match &mut self.content {
            CellContent::SubTable { table, .. } => Some(table),
            CellContent::Simple(_) => None,
        }
    }

    pub fn sub_table_kind(&self) -> Option<SubTableKind> {
        match &self.content {
            CellContent::SubTable { kind, .. } => Some(*kind),
            CellContent::Simple(_) => None,
        }
    }
}

/// A 1-based (column, row) position inside one table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    pub column: u32,
    pub row: u32,
}

impl Coord {
    pub fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_to_letters(self.column), self.row)
    }
}

/// Coordinates of a cell and of each enclosing sub-table cell, outermost first
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellLocation {
    segments: Vec<Coord>,
}

impl CellLocation {
    pub fn new(segments: Vec<Coord>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[Coord] {
        &self.segments
    }

    /// Number of sub-table boundaries between the cell and the root table
    pub fn depth(&self) -> usize {
        self.segments.len().saturating_sub(1)
    }

    /// Relative address naming this location
    pub fn to_address(&self) -> Address {
        Address::new(
            self.segments
                .iter()
                .map(|coord| Segment {
                    column: Some(AxisRef::relative(coord.column)),
                    row: Some(AxisRef::relative(coord.row)),
                })
                .collect(),
        )
    }
}

impl fmt::Display for CellLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, coord) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", coord)?;
        }
        Ok(())
    }
}

/// An ordered grid of cells
#[derive(Debug, Default)]
pub struct Table {
    /// Row anchors, kept in position order
    rows: Vec<CellAnchor>,
    /// Column anchors, kept in position order
    columns: Vec<CellAnchor>,
    cells: Vec<Cell>,
    /// (column anchor, row anchor) -> index into `cells`
    index: AHashMap<(AnchorId, AnchorId), usize>,
    /// Own cell id -> index into `cells`
    by_id: AHashMap<CellId, usize>,
    /// Descendant cell id -> index of the sub-table cell holding it, recorded
    /// when the sub-table is attached
    nested: AHashMap<CellId, usize>,
    /// Anchor id -> current position, for both axes
    positions: AHashMap<AnchorId, u32>,
    /// Sub-table cell that owns this table, if any
    owner: Option<CellId>,
    transposed: bool,
}

impl Table {
    /// Create a table of empty simple cells
    pub fn new(columns: u32, rows: u32) -> Self {
        let mut table = Self::default();
        for _ in 0..columns {
            table.add_column();
        }
        for _ in 0..rows {
            table.add_row();
        }
        table
    }

    pub fn row_count(&self) -> u32 {
        self.rows.len() as u32
    }

    pub fn column_count(&self) -> u32 {
        self.columns.len() as u32
    }

    pub fn rows(&self) -> &[CellAnchor] {
        &self.rows
    }

    pub fn columns(&self) -> &[CellAnchor] {
        &self.columns
    }

    /// Whether ranges in this table enumerate column-major
    pub fn is_transposed(&self) -> bool {
        self.transposed
    }

    pub fn set_transposed(&mut self, transposed: bool) {
        self.transposed = transposed;
    }

    /// The sub-table cell owning this table
    pub fn owner(&self) -> Option<CellId> {
        self.owner
    }

    /// Append a row of empty cells and return its position
    pub fn add_row(&mut self) -> u32 {
        let anchor = CellAnchor::new(AnchorKind::Row, self.row_count() + 1);
        let columns: Vec<AnchorId> = self.columns.iter().map(|c| c.id).collect();
        for column in columns {
            self.insert_cell(Cell::new(column, anchor.id));
        }
        let position = anchor.position;
        self.positions.insert(anchor.id, position);
        self.rows.push(anchor);
        position
    }

    /// Append a column of empty cells and return its position
    pub fn add_column(&mut self) -> u32 {
        let anchor = CellAnchor::new(AnchorKind::Column, self.column_count() + 1);
        let rows: Vec<AnchorId> = self.rows.iter().map(|r| r.id).collect();
        for row in rows {
            self.insert_cell(Cell::new(anchor.id, row));
        }
        let position = anchor.position;
        self.positions.insert(anchor.id, position);
        self.columns.push(anchor);
        position
    }

    fn insert_cell(&mut self, cell: Cell) {
        self.index.insert((cell.column, cell.row), self.cells.len());
        self.by_id.insert(cell.id, self.cells.len());
        self.cells.push(cell);
    }

    fn slot(&self, column: u32, row: u32) -> Option<usize> {
        let column = self.columns.get(column.checked_sub(1)? as usize)?;
        let row = self.rows.get(row.checked_sub(1)? as usize)?;
        self.index.get(&(column.id, row.id)).copied()
    }

    /// Cell at a 1-based (column, row) position
    pub fn cell_at(&self, column: u32, row: u32) -> Option<&Cell> {
        self.slot(column, row).map(|i| &self.cells[i])
    }

    pub fn cell_at_mut(&mut self, column: u32, row: u32) -> Option<&mut Cell> {
        self.slot(column, row).map(move |i| &mut self.cells[i])
    }

    fn require_cell_mut(&mut self, column: u32, row: u32) -> Result<&mut Cell> {
        let (columns, rows) = (self.column_count(), self.row_count());
        if column == 0 || column > columns {
            return Err(Error::PositionOutOfRange {
                position: column,
                count: columns,
            });
        }
        if row == 0 || row > rows {
            return Err(Error::PositionOutOfRange {
                position: row,
                count: rows,
            });
        }
        self.cell_at_mut(column, row)
            .ok_or_else(|| Error::resolution(format!("no cell at {}", Coord::new(column, row))))
    }

    /// Store a simple value at a position, returning the cell's id
    pub fn set_value(&mut self, column: u32, row: u32, value: impl Into<CellValue>) -> Result<CellId> {
        let cell = self.require_cell_mut(column, row)?;
        cell.set_value(value);
        Ok(cell.id)
    }

    /// Declare the value type of the cell at a position
    pub fn set_value_type(&mut self, column: u32, row: u32, value_type: ValueType) -> Result<CellId> {
        let cell = self.require_cell_mut(column, row)?;
        cell.value_type = value_type;
        Ok(cell.id)
    }

    /// Turn the cell at a position into a sub-table cell owning `table`
    pub fn set_sub_table(
        &mut self,
        column: u32,
        row: u32,
        kind: SubTableKind,
        mut table: Table,
    ) -> Result<CellId> {
        let descendants: Vec<CellId> = table.by_id.keys().chain(table.nested.keys()).copied().collect();

        let cell = self.require_cell_mut(column, row)?;
        let id = cell.id;
        table.owner = Some(id);
        cell.content = CellContent::SubTable {
            kind,
            table: Box::new(table),
        };

        if let Some(&slot) = self.by_id.get(&id) {
            self.nested.retain(|_, holder| *holder != slot);
            self.nested.extend(descendants.into_iter().map(|descendant| (descendant, slot)));
        }
        Ok(id)
    }

    /// Cells of this table only, in insertion order
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Position of one of this table's cells
    pub fn position_of(&self, cell: &Cell) -> Option<Coord> {
        let column = self.positions.get(&cell.column)?;
        let row = self.positions.get(&cell.row)?;
        Some(Coord::new(*column, *row))
    }

    /// Indexes of the sub-table cells to search for `id`: the one recorded at
    /// attach time first, then every other one
    ///
    /// Nested tables edited after being attached are not indexed by their
    /// ancestors, so a miss on the recorded holder falls back to a scan.
    fn holders(&self, id: CellId) -> impl Iterator<Item = usize> + '_ {
        let hint = self.nested.get(&id).copied();
        hint.into_iter().chain(
            (0..self.cells.len()).filter(move |&i| Some(i) != hint && self.cells[i].is_sub_table()),
        )
    }

    /// Find a cell by id anywhere under this table
    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        if let Some(&i) = self.by_id.get(&id) {
            return Some(&self.cells[i]);
        }
        self.holders(id)
            .find_map(|i| self.cells[i].sub_table().and_then(|t| t.cell(id)))
    }

    /// Find a cell by id anywhere under this table, mutably
    pub fn cell_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        if let Some(&i) = self.by_id.get(&id) {
            return Some(&mut self.cells[i]);
        }
        let holder = self
            .holders(id)
            .find(|&i| self.cells[i].sub_table().map_or(false, |t| t.cell(id).is_some()))?;
        self.cells[holder].sub_table_mut().and_then(|t| t.cell_mut(id))
    }

    /// Coordinates of a cell at every depth, outermost first
    pub fn locate(&self, id: CellId) -> Option<CellLocation> {
        let mut segments = Vec::new();
        if self.locate_into(id, &mut segments) {
            Some(CellLocation::new(segments))
        } else {
            None
        }
    }

    fn locate_into(&self, id: CellId, path: &mut Vec<Coord>) -> bool {
        if let Some(&i) = self.by_id.get(&id) {
            return match self.position_of(&self.cells[i]) {
                Some(coord) => {
                    path.push(coord);
                    true
                }
                None => false,
            };
        }

        for i in self.holders(id) {
            let cell = &self.cells[i];
            let (Some(sub), Some(coord)) = (cell.sub_table(), self.position_of(cell)) else {
                continue;
            };
            path.push(coord);
            if sub.locate_into(id, path) {
                return true;
            }
            path.pop();
        }
        false
    }

    /// Inverse of [`Table::locate`]
    pub fn cell_at_location(&self, location: &CellLocation) -> Option<&Cell> {
        let (last, outer) = location.segments().split_last()?;
        let mut table = self;
        for coord in outer {
            table = table.cell_at(coord.column, coord.row)?.sub_table()?;
        }
        table.cell_at(last.column, last.row)
    }

    /// Move a row to a new position, shifting the rows in between
    pub fn move_row(&mut self, from: u32, to: u32) -> Result<()> {
        Self::move_anchor(&mut self.rows, &mut self.positions, from, to)
    }

    /// Move a column to a new position, shifting the columns in between
    pub fn move_column(&mut self, from: u32, to: u32) -> Result<()> {
        Self::move_anchor(&mut self.columns, &mut self.positions, from, to)
    }

    fn move_anchor(
        anchors: &mut Vec<CellAnchor>,
        positions: &mut AHashMap<AnchorId, u32>,
        from: u32,
        to: u32,
    ) -> Result<()> {
        let count = anchors.len() as u32;
        for position in [from, to] {
            if position == 0 || position > count {
                return Err(Error::PositionOutOfRange { position, count });
            }
        }
        let anchor = anchors.remove(from as usize - 1);
        anchors.insert(to as usize - 1, anchor);
        for (i, anchor) in anchors.iter_mut().enumerate() {
            anchor.position = i as u32 + 1;
            positions.insert(anchor.id, anchor.position);
        }
        Ok(())
    }
}
