//! Textual cell addresses
//!
//! A segment is `[$]Letters[$]Digits`; either half may be missing when the
//! segment is a range endpoint (`A:C` covers whole columns, `2:4` whole rows).
//! Segments joined by `.` descend into nested tables, outermost first, and two
//! addresses joined by `:` form a rectangular range. A `$` pins the part it
//! precedes so relative translation leaves it alone.

use crate::error::{Error, Result};
use lazy_regex::regex_captures;
use std::fmt;
use std::str::FromStr;

/// Convert a 1-based column position to letters (1 = A, 26 = Z, 27 = AA)
pub fn column_to_letters(position: u32) -> String {
    let mut result = String::new();
    let mut n = position;

    while n > 0 {
        n -= 1;
        let c = ((n % 26) as u8 + b'A') as char;
        result.insert(0, c);
        n /= 26;
    }

    result
}

/// Convert column letters to a 1-based position (A = 1, Z = 26, AA = 27)
///
/// Letters are case-insensitive.
pub fn letters_to_column(letters: &str) -> Result<u32> {
    if letters.is_empty() {
        return Err(Error::format("empty column letters"));
    }

    let mut position: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return Err(Error::format(format!("invalid column letter '{}'", c)));
        }
        let digit = c.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
        position = position
            .checked_mul(26)
            .and_then(|p| p.checked_add(digit))
            .ok_or_else(|| Error::format(format!("column '{}' is too large", letters)))?;
    }

    Ok(position)
}

/// One axis of a segment: a position and whether it is pinned with `$`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxisRef {
    pub position: u32,
    pub absolute: bool,
}

impl AxisRef {
    pub fn relative(position: u32) -> Self {
        Self {
            position,
            absolute: false,
        }
    }

    pub fn absolute(position: u32) -> Self {
        Self {
            position,
            absolute: true,
        }
    }
}

/// One dotted segment of an address; at least one axis is present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Segment {
    pub column: Option<AxisRef>,
    pub row: Option<AxisRef>,
}

impl Segment {
    /// A relative single-cell segment
    pub fn cell(column: u32, row: u32) -> Self {
        Self {
            column: Some(AxisRef::relative(column)),
            row: Some(AxisRef::relative(row)),
        }
    }

    /// Whether only one of column or row is given
    pub fn is_single_axis(&self) -> bool {
        self.column.is_none() || self.row.is_none()
    }

    /// Parse one segment such as `$B3`, `C`, or `$7`
    pub fn parse(text: &str) -> Result<Self> {
        let (_, col_dollar, letters, row_dollar, digits) =
            regex_captures!(r"^(\$?)([A-Za-z]*)(\$?)([0-9]*)$", text)
                .ok_or_else(|| Error::format(format!("malformed segment '{}'", text)))?;

        if letters.is_empty() && digits.is_empty() {
            return Err(Error::format(format!("empty segment '{}'", text)));
        }

        if letters.is_empty() {
            // A lone `$7` pins the row; `$$7` has nothing for the first `$` to mark.
            if !col_dollar.is_empty() && !row_dollar.is_empty() {
                return Err(Error::format(format!("unmatched '$' in '{}'", text)));
            }
            let row = parse_row(digits, text)?;
            return Ok(Self {
                column: None,
                row: Some(AxisRef {
                    position: row,
                    absolute: !col_dollar.is_empty() || !row_dollar.is_empty(),
                }),
            });
        }

        let column = AxisRef {
            position: letters_to_column(letters)?,
            absolute: !col_dollar.is_empty(),
        };

        if digits.is_empty() {
            if !row_dollar.is_empty() {
                return Err(Error::format(format!("unmatched '$' in '{}'", text)));
            }
            return Ok(Self {
                column: Some(column),
                row: None,
            });
        }

        Ok(Self {
            column: Some(column),
            row: Some(AxisRef {
                position: parse_row(digits, text)?,
                absolute: !row_dollar.is_empty(),
            }),
        })
    }
}

fn parse_row(digits: &str, text: &str) -> Result<u32> {
    let row: u32 = digits
        .parse()
        .map_err(|_| Error::format(format!("row number too large in '{}'", text)))?;
    if row == 0 {
        return Err(Error::format(format!("row number must be >= 1 in '{}'", text)));
    }
    Ok(row)
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(column) = self.column {
            if column.absolute {
                f.write_str("$")?;
            }
            f.write_str(&column_to_letters(column.position))?;
        }
        if let Some(row) = self.row {
            if row.absolute {
                f.write_str("$")?;
            }
            write!(f, "{}", row.position)?;
        }
        Ok(())
    }
}

/// A possibly nested single-cell address, outermost segment first
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    segments: Vec<Segment>,
}

impl Address {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Parse an address such as `A1`, `$B$2.C3`, or `C` (as a range endpoint)
    ///
    /// # Examples
    /// ```
    /// use nestgrid_core::Address;
    ///
    /// let addr = Address::parse("B2.$A1").unwrap();
    /// assert_eq!(addr.depth(), 1);
    /// assert_eq!(addr.to_string(), "B2.$A1");
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::format("empty address"));
        }
        let segments = text
            .split('.')
            .map(Segment::parse)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segments_mut(&mut self) -> &mut [Segment] {
        &mut self.segments
    }

    /// Nesting depth addressed by the final segment
    pub fn depth(&self) -> usize {
        self.segments.len().saturating_sub(1)
    }

    /// Whether every segment names both a column and a row
    pub fn is_complete(&self) -> bool {
        self.segments.iter().all(|s| !s.is_single_axis())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A rectangular range between two addresses
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RangeAddress {
    pub start: Address,
    pub end: Address,
}

impl RangeAddress {
    pub fn new(start: Address, end: Address) -> Self {
        Self { start, end }
    }

    /// Parse `start:end`
    pub fn parse(text: &str) -> Result<Self> {
        match Reference::parse(text)? {
            Reference::Range(range) => Ok(range),
            Reference::Single(_) => Err(Error::format(format!("'{}' is not a range", text))),
        }
    }
}

impl fmt::Display for RangeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

impl FromStr for RangeAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Either a single address or a range
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    Single(Address),
    Range(RangeAddress),
}

impl Reference {
    pub fn parse(text: &str) -> Result<Self> {
        let mut parts = text.trim().split(':');
        let start = parts.next().unwrap_or_default();
        match (parts.next(), parts.next()) {
            (None, _) => {
                let address = Address::parse(start)?;
                if !address.is_complete() {
                    return Err(Error::format(format!(
                        "'{}' names only a row or column outside a range",
                        text
                    )));
                }
                Ok(Reference::Single(address))
            }
            (Some(end), None) => Ok(Reference::Range(RangeAddress::new(
                Address::parse(start)?,
                Address::parse(end)?,
            ))),
            (Some(_), Some(_)) => Err(Error::format(format!("too many ':' in '{}'", text))),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Single(address) => write!(f, "{}", address),
            Reference::Range(range) => write!(f, "{}", range),
        }
    }
}

impl FromStr for Reference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_column_to_letters() {
        assert_eq!(column_to_letters(1), "A");
        assert_eq!(column_to_letters(2), "B");
        assert_eq!(column_to_letters(26), "Z");
        assert_eq!(column_to_letters(27), "AA");
        assert_eq!(column_to_letters(28), "AB");
        assert_eq!(column_to_letters(702), "ZZ");
        assert_eq!(column_to_letters(703), "AAA");
    }

    #[test]
    fn test_letters_to_column() {
        assert_eq!(letters_to_column("A").unwrap(), 1);
        assert_eq!(letters_to_column("Z").unwrap(), 26);
        assert_eq!(letters_to_column("AA").unwrap(), 27);
        assert_eq!(letters_to_column("ZZ").unwrap(), 702);
        assert_eq!(letters_to_column("aa").unwrap(), 27);
        assert!(letters_to_column("").is_err());
        assert!(letters_to_column("A1").is_err());
        assert!(letters_to_column("ZZZZZZZZZ").is_err());
    }

    #[test]
    fn test_segment_parse() {
        assert_eq!(Segment::parse("B3").unwrap(), Segment::cell(2, 3));
        assert_eq!(
            Segment::parse("$B$3").unwrap(),
            Segment {
                column: Some(AxisRef::absolute(2)),
                row: Some(AxisRef::absolute(3)),
            }
        );
        assert_eq!(
            Segment::parse("C").unwrap(),
            Segment {
                column: Some(AxisRef::relative(3)),
                row: None,
            }
        );
        assert_eq!(
            Segment::parse("$7").unwrap(),
            Segment {
                column: None,
                row: Some(AxisRef::absolute(7)),
            }
        );
    }

    #[test]
    fn test_segment_parse_errors() {
        for bad in ["", "$", "$$", "A$", "$$7", "1A", "A0", "A-1", "A 1"] {
            let err = Segment::parse(bad).unwrap_err();
            assert!(err.is_format(), "{} should be a format error", bad);
        }
    }

    #[test]
    fn test_address_parse_nested() {
        let addr = Address::parse("B2.$A1").unwrap();
        assert_eq!(addr.segments().len(), 2);
        assert_eq!(addr.depth(), 1);
        assert_eq!(addr.segments()[1].column, Some(AxisRef::absolute(1)));
        assert!(Address::parse("A1..B2").is_err());
        assert!(Address::parse("").is_err());
    }

    #[test]
    fn test_reference_parse() {
        assert_eq!(
            Reference::parse("A1:C3").unwrap().to_string(),
            "A1:C3"
        );
        assert!(matches!(
            Reference::parse("A:B").unwrap(),
            Reference::Range(_)
        ));
        assert!(Reference::parse("A").is_err());
        assert!(Reference::parse("A1:B2:C3").is_err());
        assert!(RangeAddress::parse("A1").is_err());
    }

    #[test]
    fn test_display_keeps_markers() {
        for text in ["A1", "$A1", "A$1", "$A$1", "B2.$C$3", "A:$C", "$1:4", "A1.B2:A1.C5"] {
            assert_eq!(Reference::parse(text).unwrap().to_string(), text);
        }
    }

    proptest! {
        #[test]
        fn column_letters_round_trip(position in 1u32..=1_000_000) {
            prop_assert_eq!(letters_to_column(&column_to_letters(position)).unwrap(), position);
        }

        #[test]
        fn address_text_round_trip(
            segments in prop::collection::vec((1u32..5000, any::<bool>(), 1u32..100_000, any::<bool>()), 1..4)
        ) {
            let address = Address::new(
                segments
                    .iter()
                    .map(|&(c, ca, r, ra)| Segment {
                        column: Some(AxisRef { position: c, absolute: ca }),
                        row: Some(AxisRef { position: r, absolute: ra }),
                    })
                    .collect(),
            );
            prop_assert_eq!(Address::parse(&address.to_string()).unwrap(), address);
        }
    }
}
