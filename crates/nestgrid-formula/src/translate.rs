//! Relative reference translation
//!
//! Rewrites the references of a formula copied from one cell to another. Each
//! dotted segment of a reference is shifted by the offset between the origin
//! and destination cells at that segment's depth; parts marked with `$` stay.

use crate::error::{FormulaError, FormulaResult};
use crate::tokenizer::{at_word_start, match_range, match_reference, skip_string};
use log::trace;
use nestgrid_core::{
    resolve_location, resolve_range, resolve_single, Address, AxisRef, RangeAddress, Table,
};

/// Per-depth `(column, row)` offsets, outermost first
type Deltas = Vec<(i64, i64)>;

/// Translate the relative references of `formula` from `origin` to `destination`
///
/// Literal formulas (no leading `=`) and copies onto the origin cell itself,
/// however its address is spelled, come back unchanged.
/// A reference pushed before the first row or column, or one that no longer
/// resolves against `root`, is a [`FormulaError::BrokenReference`].
///
/// # Example
/// ```rust
/// use nestgrid_core::{Address, Table};
/// use nestgrid_formula::translate;
///
/// let table = Table::new(4, 4);
/// let from = Address::parse("B2").unwrap();
/// let to = Address::parse("C3").unwrap();
/// assert_eq!(translate("=$A1+B$1", &from, &to, &table).unwrap(), "=$A2+C$1");
/// ```
pub fn translate(
    formula: &str,
    origin: &Address,
    destination: &Address,
    root: &Table,
) -> FormulaResult<String> {
    if !formula.trim_start().starts_with('=') {
        return Ok(formula.to_string());
    }

    let from = resolve_location(origin, root, true)?;
    let to = resolve_location(destination, root, true)?;
    if from == to {
        return Ok(formula.to_string());
    }
    let deltas: Deltas = (0..from.segments().len().max(to.segments().len()))
        .map(|depth| match (from.segments().get(depth), to.segments().get(depth)) {
            (Some(a), Some(b)) => (
                i64::from(b.column) - i64::from(a.column),
                i64::from(b.row) - i64::from(a.row),
            ),
            _ => (0, 0),
        })
        .collect();

    trace!("translating {:?} from {} to {} by {:?}", formula, origin, destination, deltas);

    let mut out = String::with_capacity(formula.len());
    let mut copied = 0;
    let mut i = 0;

    while let Some(c) = formula[i..].chars().next() {
        if c == '"' {
            i = skip_string(formula, i)?;
            continue;
        }

        let starts_word = (c.is_ascii_alphanumeric() || c == '$') && at_word_start(formula, i);
        if !starts_word {
            i += c.len_utf8();
            continue;
        }

        let rest = &formula[i..];
        let rewritten = if let Some(m) = match_range(rest) {
            Some((m.len(), shift_range(m, &deltas, root)?))
        } else if let Some(m) = match_reference(rest) {
            Some((m.len(), shift_single(m, &deltas, root)?))
        } else {
            None
        };

        match rewritten {
            Some((len, text)) => {
                out.push_str(&formula[copied..i]);
                out.push_str(&text);
                i += len;
                copied = i;
            }
            None => {
                // function names, booleans and numbers
                i += rest
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '$'))
                    .unwrap_or(rest.len());
            }
        }
    }

    out.push_str(&formula[copied..]);
    Ok(out)
}

fn shift_range(text: &str, deltas: &[(i64, i64)], root: &Table) -> FormulaResult<String> {
    let range = RangeAddress::parse(text)?;
    let shifted = RangeAddress::new(
        shift_address(&range.start, deltas, text)?,
        shift_address(&range.end, deltas, text)?,
    );
    resolve_range(&shifted, root).map_err(|err| {
        FormulaError::BrokenReference(format!("{} became {}: {}", text, shifted, err))
    })?;
    Ok(shifted.to_string())
}

fn shift_single(text: &str, deltas: &[(i64, i64)], root: &Table) -> FormulaResult<String> {
    let address = Address::parse(text)?;
    let shifted = shift_address(&address, deltas, text)?;
    resolve_single(&shifted, root, true).map_err(|err| {
        FormulaError::BrokenReference(format!("{} became {}: {}", text, shifted, err))
    })?;
    Ok(shifted.to_string())
}

fn shift_address(address: &Address, deltas: &[(i64, i64)], text: &str) -> FormulaResult<Address> {
    let mut shifted = address.clone();
    for (depth, segment) in shifted.segments_mut().iter_mut().enumerate() {
        let (columns, rows) = deltas.get(depth).copied().unwrap_or((0, 0));
        segment.column = segment.column.map(|axis| shift_axis(axis, columns, text)).transpose()?;
        segment.row = segment.row.map(|axis| shift_axis(axis, rows, text)).transpose()?;
    }
    Ok(shifted)
}

fn shift_axis(axis: AxisRef, delta: i64, text: &str) -> FormulaResult<AxisRef> {
    if axis.absolute {
        return Ok(axis);
    }
    let position = i64::from(axis.position) + delta;
    u32::try_from(position)
        .ok()
        .filter(|&p| p >= 1)
        .map(AxisRef::relative)
        .ok_or_else(|| {
            FormulaError::BrokenReference(format!("{} would move before the first row or column", text))
        })
}
