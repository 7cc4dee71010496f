//! Cell value types

use std::fmt;

/// A primitive value stored in a simple cell
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellValue {
    /// Empty cell
    #[default]
    Empty,
    /// Numeric value (all numbers are f64)
    Number(f64),
    /// Text value
    Text(String),
    /// Boolean value
    Boolean(bool),
}

impl CellValue {
    /// Check if the value is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Get as number, if numeric
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as text, if text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get as boolean, if boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Name of the variant, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Empty => "empty",
            CellValue::Number(_) => "number",
            CellValue::Text(_) => "text",
            CellValue::Boolean(_) => "boolean",
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Boolean(true) => f.write_str("TRUE"),
            CellValue::Boolean(false) => f.write_str("FALSE"),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

/// Declared value type of a cell; formula results are coerced to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueType {
    /// Accepts whatever the formula produces
    #[default]
    Any,
    Number,
    Text,
    Boolean,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(CellValue::from(2.5), CellValue::Number(2.5));
        assert_eq!(CellValue::from(-3), CellValue::Number(-3.0));
        assert_eq!(CellValue::from(true), CellValue::Boolean(true));
        assert_eq!(CellValue::from("a"), CellValue::Text("a".into()));
        assert_eq!(CellValue::from(String::from("b")), CellValue::Text("b".into()));
    }

    #[test]
    fn test_accessors_match_variant_only() {
        let number = CellValue::Number(1.0);
        assert_eq!(number.as_number(), Some(1.0));
        assert_eq!(number.as_text(), None);
        assert_eq!(number.as_bool(), None);

        // no implicit conversion from numeric text
        let text = CellValue::from("1");
        assert_eq!(text.as_number(), None);
        assert_eq!(text.as_text(), Some("1"));
        assert_eq!(CellValue::Boolean(false).as_bool(), Some(false));

        assert!(CellValue::default().is_empty());
        assert!(!CellValue::Text(String::new()).is_empty());
    }

    #[test]
    fn test_display_and_type_name() {
        assert_eq!(CellValue::Empty.to_string(), "");
        assert_eq!(CellValue::Number(42.0).to_string(), "42");
        assert_eq!(CellValue::Number(0.5).to_string(), "0.5");
        assert_eq!(CellValue::Boolean(true).to_string(), "TRUE");
        assert_eq!(CellValue::Boolean(false).to_string(), "FALSE");
        assert_eq!(CellValue::from("x y").to_string(), "x y");

        assert_eq!(CellValue::Empty.type_name(), "empty");
        assert_eq!(CellValue::Number(1.0).type_name(), "number");
        assert_eq!(CellValue::from("").type_name(), "text");
        assert_eq!(CellValue::Boolean(true).type_name(), "boolean");
        assert_eq!(ValueType::default(), ValueType::Any);
    }
}
