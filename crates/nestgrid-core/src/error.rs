//! Error types for nestgrid-core

use crate::table::CellId;
use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in nestgrid-core
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Malformed address or range text
    #[error("Invalid address: {0}")]
    Format(String),

    /// Address does not resolve to an existing cell
    #[error("Unresolved reference: {0}")]
    Resolution(String),

    /// Range endpoints sit at different nesting depths
    #[error("Range endpoints differ in depth: start is at depth {start}, end is at depth {end}")]
    DepthMismatch { start: usize, end: usize },

    /// A non-terminal address segment pointed at a cell without a nested table
    #[error("Cell {0} does not hold a nested table")]
    NotATable(String),

    /// No cell with this id exists under the root table
    #[error("Cell {0} not found")]
    CellNotFound(CellId),

    /// Anchor position outside the table
    #[error("Position {position} out of range (count: {count})")]
    PositionOutOfRange { position: u32, count: u32 },
}

impl Error {
    /// Create a format error with a message
    pub fn format<S: Into<String>>(msg: S) -> Self {
        Error::Format(msg.into())
    }

    /// Create a resolution error with a message
    pub fn resolution<S: Into<String>>(msg: S) -> Self {
        Error::Resolution(msg.into())
    }

    /// Whether this error came from malformed address text
    pub fn is_format(&self) -> bool {
        matches!(self, Error::Format(_))
    }
}
