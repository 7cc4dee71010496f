//! Statistical and conditional aggregation functions

use super::criteria::CriteriaMatcher;
use super::{arg, collect_numbers, flatten};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};

/// COUNTA(value1, [value2], ...) - counts non-empty values
pub fn fn_counta(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let count = flatten(args)
        .filter(|v| !matches!(v, FormulaValue::Empty))
        .count();
    Ok(FormulaValue::Number(count as f64))
}

/// COUNTBLANK(range) - counts empty cells and empty text
pub fn fn_countblank(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let count = flatten(args)
        .filter(|v| match v {
            FormulaValue::Empty => true,
            FormulaValue::Text(s) => s.is_empty(),
            _ => false,
        })
        .count();
    Ok(FormulaValue::Number(count as f64))
}

/// MEDIAN(number1, [number2], ...)
///
/// With an even count the two middle values are averaged.
pub fn fn_median(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut numbers = collect_numbers(args)?;
    if numbers.is_empty() {
        return Err(FormulaError::arithmetic("MEDIAN of no numbers"));
    }

    numbers.sort_by(|a, b| a.total_cmp(b));

    let len = numbers.len();
    let median = if len % 2 == 1 {
        numbers[len / 2]
    } else {
        (numbers[len / 2 - 1] + numbers[len / 2]) / 2.0
    };

    Ok(FormulaValue::Number(median))
}

/// Cells of a range argument; a single value counts as a one-cell range
fn cells(value: &FormulaValue) -> &[FormulaValue] {
    match value {
        FormulaValue::Range(items) => items,
        other => std::slice::from_ref(other),
    }
}

/// Values of the optional third argument paired by index with the matching
/// cells of the first; the first range stands in when it is absent
fn matching_values<'v>(args: &'v [FormulaValue], function: &str) -> FormulaResult<Vec<&'v FormulaValue>> {
    let range = cells(arg(args, 0, function)?);
    let matcher = CriteriaMatcher::new(arg(args, 1, function)?);
    let values = args.get(2).map_or(range, cells);

    Ok(range
        .iter()
        .enumerate()
        .filter(|(_, cell)| matcher.matches(cell))
        .filter_map(|(i, _)| values.get(i))
        .collect())
}

/// COUNTIF(range, criteria)
pub fn fn_countif(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let range = cells(arg(args, 0, "COUNTIF")?);
    let matcher = CriteriaMatcher::new(arg(args, 1, "COUNTIF")?);
    let count = range.iter().filter(|cell| matcher.matches(cell)).count();
    Ok(FormulaValue::Number(count as f64))
}

/// SUMIF(range, criteria, [sum_range])
pub fn fn_sumif(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let sum = matching_values(args, "SUMIF")?
        .into_iter()
        .filter_map(|v| match v {
            FormulaValue::Number(n) => Some(*n),
            _ => None,
        })
        .sum();
    Ok(FormulaValue::Number(sum))
}

/// AVERAGEIF(range, criteria, [average_range])
pub fn fn_averageif(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers: Vec<f64> = matching_values(args, "AVERAGEIF")?
        .into_iter()
        .filter_map(|v| match v {
            FormulaValue::Number(n) => Some(*n),
            _ => None,
        })
        .collect();

    if numbers.is_empty() {
        return Err(FormulaError::arithmetic("AVERAGEIF matched no numbers"));
    }
    Ok(FormulaValue::Number(numbers.iter().sum::<f64>() / numbers.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use nestgrid_core::Table;

    fn call(
        f: fn(&[FormulaValue], &EvaluationContext) -> FormulaResult<FormulaValue>,
        args: &[FormulaValue],
    ) -> FormulaResult<FormulaValue> {
        let table = Table::new(1, 1);
        let here = table.cell_at(1, 1).unwrap().id();
        f(args, &EvaluationContext::new(&table, here))
    }

    fn num(n: f64) -> FormulaValue {
        FormulaValue::Number(n)
    }

    fn text(s: &str) -> FormulaValue {
        FormulaValue::Text(s.into())
    }

    fn fruit() -> FormulaValue {
        FormulaValue::Range(vec![text("apple"), text("pear"), text("Apple"), FormulaValue::Empty])
    }

    fn amounts() -> FormulaValue {
        FormulaValue::Range(vec![num(1.0), num(2.0), num(4.0), num(8.0)])
    }

    #[test]
    fn test_counta_and_countblank() {
        assert_eq!(call(fn_counta, &[fruit()]).unwrap(), num(3.0));
        let range = FormulaValue::Range(vec![FormulaValue::Empty, text(""), num(0.0)]);
        assert_eq!(call(fn_countblank, &[range]).unwrap(), num(2.0));
    }

    #[test]
    fn test_median() {
        assert_eq!(call(fn_median, &[amounts()]).unwrap(), num(3.0));
        assert_eq!(call(fn_median, &[num(5.0), num(1.0), num(3.0)]).unwrap(), num(3.0));
        assert_eq!(
            call(fn_median, &[FormulaValue::Range(vec![])]).unwrap_err().kind(),
            ErrorKind::Arithmetic
        );
    }

    #[test]
    fn test_countif() {
        assert_eq!(call(fn_countif, &[fruit(), text("apple")]).unwrap(), num(2.0));
        assert_eq!(call(fn_countif, &[fruit(), text("")]).unwrap(), num(1.0));
        assert_eq!(call(fn_countif, &[amounts(), text(">=2")]).unwrap(), num(3.0));
        assert_eq!(call(fn_countif, &[num(3.0), num(3.0)]).unwrap(), num(1.0));
    }

    #[test]
    fn test_sumif_pairs_by_index() {
        assert_eq!(call(fn_sumif, &[amounts(), text(">1")]).unwrap(), num(14.0));
        assert_eq!(
            call(fn_sumif, &[fruit(), text("apple"), amounts()]).unwrap(),
            num(5.0)
        );
        assert_eq!(call(fn_sumif, &[fruit(), text("p*"), amounts()]).unwrap(), num(2.0));
    }

    #[test]
    fn test_averageif() {
        assert_eq!(
            call(fn_averageif, &[fruit(), text("apple"), amounts()]).unwrap(),
            num(2.5)
        );
        assert_eq!(
            call(fn_averageif, &[amounts(), text(">100")]).unwrap_err().kind(),
            ErrorKind::Arithmetic
        );
    }
}
