//! Formula error types

use nestgrid_core::Error as CoreError;
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Broad classification of a formula failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed address, range or formula text
    Format,
    /// An address that does not lead to a cell
    Resolution,
    /// A formula that transitively references itself
    CircularDependency,
    /// Division by zero or a non-numeric operand
    Arithmetic,
    /// A result that does not fit the cell's declared type
    TypeCoercion,
    /// A function call outside its argument contract
    Validation,
}

/// Errors that can occur during formula parsing or evaluation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Malformed address or range text
    #[error("Format error: {0}")]
    Format(String),

    /// Formula parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Reference to a missing cell
    #[error("Unresolved reference: {0}")]
    Resolution(String),

    /// A relative reference that no longer resolves after translation
    #[error("Broken relative reference: {0}")]
    BrokenReference(String),

    /// Circular dependency
    #[error("Circular dependency: {0}")]
    CircularDependency(String),

    /// Arithmetic failure
    #[error("Arithmetic error: {0}")]
    Arithmetic(String),

    /// Result cannot be stored as the declared type
    #[error("Cannot store {actual} as {expected}")]
    TypeCoercion {
        expected: &'static str,
        actual: String,
    },

    /// Argument outside the function's contract
    #[error("Invalid argument: {0}")]
    Validation(String),

    /// Unknown function
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },
}

impl FormulaError {
    /// Which of the engine's error classes this belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            FormulaError::Format(_) | FormulaError::Parse(_) | FormulaError::UnknownFunction(_) => {
                ErrorKind::Format
            }
            FormulaError::Resolution(_) | FormulaError::BrokenReference(_) => ErrorKind::Resolution,
            FormulaError::CircularDependency(_) => ErrorKind::CircularDependency,
            FormulaError::Arithmetic(_) => ErrorKind::Arithmetic,
            FormulaError::TypeCoercion { .. } => ErrorKind::TypeCoercion,
            FormulaError::Validation(_) | FormulaError::ArgumentCount { .. } => ErrorKind::Validation,
        }
    }

    pub(crate) fn arithmetic<S: Into<String>>(msg: S) -> Self {
        FormulaError::Arithmetic(msg.into())
    }

    pub(crate) fn parse<S: Into<String>>(msg: S) -> Self {
        FormulaError::Parse(msg.into())
    }
}

impl From<CoreError> for FormulaError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Format(msg) => FormulaError::Format(msg),
            other => FormulaError::Resolution(other.to_string()),
        }
    }
}
