//! Math functions

use super::{arg, collect_numbers, flatten};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};
use nestgrid_core::Error as CoreError;

/// SUM function
pub fn fn_sum(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let sum = collect_numbers(args)?.into_iter().sum();
    Ok(FormulaValue::Number(sum))
}

/// AVERAGE function
pub fn fn_average(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = collect_numbers(args)?;
    if numbers.is_empty() {
        return Err(FormulaError::arithmetic("AVERAGE of no numbers"));
    }
    Ok(FormulaValue::Number(numbers.iter().sum::<f64>() / numbers.len() as f64))
}

/// MIN function
pub fn fn_min(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let min = collect_numbers(args)?.into_iter().reduce(f64::min);
    Ok(FormulaValue::Number(min.unwrap_or(0.0)))
}

/// MAX function
pub fn fn_max(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let max = collect_numbers(args)?.into_iter().reduce(f64::max);
    Ok(FormulaValue::Number(max.unwrap_or(0.0)))
}

/// COUNT function
pub fn fn_count(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let count = flatten(args)
        .filter(|v| matches!(v, FormulaValue::Number(_)))
        .count();
    Ok(FormulaValue::Number(count as f64))
}

/// PRODUCT function
pub fn fn_product(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = collect_numbers(args)?;
    if numbers.is_empty() {
        return Ok(FormulaValue::Number(0.0));
    }
    Ok(FormulaValue::Number(numbers.into_iter().product()))
}

/// ABS function
pub fn fn_abs(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = arg(args, 0, "ABS")?.to_number()?;
    Ok(FormulaValue::Number(n.abs()))
}

fn digits(args: &[FormulaValue]) -> FormulaResult<i32> {
    match args.get(1) {
        Some(value) => Ok(value.to_number()?.trunc() as i32),
        None => Ok(0),
    }
}

/// Round `n` at `digits` decimal places with the given rounding
fn round_with(n: f64, digits: i32, round: fn(f64) -> f64) -> f64 {
    let factor = 10f64.powi(digits);
    round(n * factor) / factor
}

/// ROUND function (half away from zero)
pub fn fn_round(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = arg(args, 0, "ROUND")?.to_number()?;
    Ok(FormulaValue::Number(round_with(n, digits(args)?, f64::round)))
}

/// ROUNDUP function (away from zero)
pub fn fn_roundup(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = arg(args, 0, "ROUNDUP")?.to_number()?;
    let away = |x: f64| if x >= 0.0 { x.ceil() } else { x.floor() };
    Ok(FormulaValue::Number(round_with(n, digits(args)?, away)))
}

/// ROUNDDOWN function (toward zero)
pub fn fn_rounddown(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = arg(args, 0, "ROUNDDOWN")?.to_number()?;
    Ok(FormulaValue::Number(round_with(n, digits(args)?, f64::trunc)))
}

/// INT function (round down to integer)
pub fn fn_int(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = arg(args, 0, "INT")?.to_number()?;
    Ok(FormulaValue::Number(n.floor()))
}

/// MOD function, result takes the sign of the divisor
pub fn fn_mod(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = arg(args, 0, "MOD")?.to_number()?;
    let d = arg(args, 1, "MOD")?.to_number()?;

    if d == 0.0 {
        return Err(FormulaError::arithmetic("MOD by zero"));
    }

    Ok(FormulaValue::Number(n - d * (n / d).floor()))
}

/// POWER function
pub fn fn_power(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let base = arg(args, 0, "POWER")?.to_number()?;
    let exp = arg(args, 1, "POWER")?.to_number()?;

    let result = base.powf(exp);
    if result.is_nan() || result.is_infinite() {
        Err(FormulaError::arithmetic(format!("POWER({}, {}) is not a finite number", base, exp)))
    } else {
        Ok(FormulaValue::Number(result))
    }
}

/// SQRT function
pub fn fn_sqrt(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = arg(args, 0, "SQRT")?.to_number()?;
    if n < 0.0 {
        return Err(FormulaError::arithmetic("SQRT of a negative number"));
    }
    Ok(FormulaValue::Number(n.sqrt()))
}

/// ROW function: row of the evaluating cell within its own table
pub fn fn_row(_args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let location = ctx
        .root
        .locate(ctx.cell)
        .ok_or(CoreError::CellNotFound(ctx.cell))?;
    let row = location.segments().last().map_or(0, |coord| coord.row);
    Ok(FormulaValue::Number(row as f64))
}

/// COLUMN function: column of the evaluating cell within its own table
pub fn fn_column(_args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let location = ctx
        .root
        .locate(ctx.cell)
        .ok_or(CoreError::CellNotFound(ctx.cell))?;
    let column = location.segments().last().map_or(0, |coord| coord.column);
    Ok(FormulaValue::Number(column as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use nestgrid_core::{SubTableKind, Table};

    fn num(n: f64) -> FormulaValue {
        FormulaValue::Number(n)
    }

    fn call(
        f: fn(&[FormulaValue], &EvaluationContext) -> FormulaResult<FormulaValue>,
        args: &[FormulaValue],
    ) -> FormulaResult<FormulaValue> {
        let table = Table::new(1, 1);
        let here = table.cell_at(1, 1).unwrap().id();
        f(args, &EvaluationContext::new(&table, here))
    }

    #[test]
    fn test_sum_skips_text_inside_ranges() {
        let range = FormulaValue::Range(vec![num(1.0), FormulaValue::Text("a".into()), num(2.0)]);
        assert_eq!(call(fn_sum, &[range, num(3.0)]).unwrap(), num(6.0));
        // a direct text argument must be numeric
        assert_eq!(call(fn_sum, &[FormulaValue::Text("4".into())]).unwrap(), num(4.0));
        assert_eq!(
            call(fn_sum, &[FormulaValue::Text("a".into())]).unwrap_err().kind(),
            ErrorKind::Arithmetic
        );
    }

    #[test]
    fn test_average_min_max() {
        let range = FormulaValue::Range(vec![num(1.0), num(5.0), num(3.0)]);
        assert_eq!(call(fn_average, &[range.clone()]).unwrap(), num(3.0));
        assert_eq!(call(fn_min, &[range.clone()]).unwrap(), num(1.0));
        assert_eq!(call(fn_max, &[range]).unwrap(), num(5.0));
        assert_eq!(
            call(fn_average, &[FormulaValue::Range(vec![])]).unwrap_err().kind(),
            ErrorKind::Arithmetic
        );
        assert_eq!(call(fn_max, &[FormulaValue::Range(vec![])]).unwrap(), num(0.0));
    }

    #[test]
    fn test_rounding() {
        assert_eq!(call(fn_round, &[num(2.5)]).unwrap(), num(3.0));
        assert_eq!(call(fn_round, &[num(-2.5)]).unwrap(), num(-3.0));
        assert_eq!(call(fn_round, &[num(1234.5678), num(-2.0)]).unwrap(), num(1200.0));
        assert_eq!(call(fn_roundup, &[num(1.21), num(1.0)]).unwrap(), num(1.3));
        assert_eq!(call(fn_roundup, &[num(-1.21), num(1.0)]).unwrap(), num(-1.3));
        assert_eq!(call(fn_rounddown, &[num(1.29), num(1.0)]).unwrap(), num(1.2));
        assert_eq!(call(fn_int, &[num(-1.5)]).unwrap(), num(-2.0));
    }

    #[test]
    fn test_mod_follows_divisor_sign() {
        assert_eq!(call(fn_mod, &[num(7.0), num(3.0)]).unwrap(), num(1.0));
        assert_eq!(call(fn_mod, &[num(-7.0), num(3.0)]).unwrap(), num(2.0));
        assert_eq!(call(fn_mod, &[num(7.0), num(-3.0)]).unwrap(), num(-2.0));
        assert_eq!(
            call(fn_mod, &[num(1.0), num(0.0)]).unwrap_err().kind(),
            ErrorKind::Arithmetic
        );
    }

    #[test]
    fn test_power_and_sqrt() {
        assert_eq!(call(fn_power, &[num(2.0), num(10.0)]).unwrap(), num(1024.0));
        assert_eq!(call(fn_sqrt, &[num(16.0)]).unwrap(), num(4.0));
        assert_eq!(call(fn_sqrt, &[num(-1.0)]).unwrap_err().kind(), ErrorKind::Arithmetic);
        assert_eq!(call(fn_product, &[num(2.0), num(3.0), num(4.0)]).unwrap(), num(24.0));
    }

    #[test]
    fn test_row_and_column_use_innermost_table() {
        let inner = Table::new(3, 4);
        let target = inner.cell_at(2, 4).unwrap().id();
        let mut root = Table::new(2, 2);
        root.set_sub_table(2, 1, SubTableKind::Collection, inner).unwrap();

        let ctx = EvaluationContext::new(&root, target);
        assert_eq!(fn_row(&[], &ctx).unwrap(), num(4.0));
        assert_eq!(fn_column(&[], &ctx).unwrap(), num(2.0));
    }

    #[test]
    fn test_row_of_foreign_cell_is_not_found() {
        let other = Table::new(1, 1);
        let foreign = other.cell_at(1, 1).unwrap().id();
        let table = Table::new(2, 2);

        let err = fn_row(&[], &EvaluationContext::new(&table, foreign)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert!(err.to_string().contains(&foreign.to_string()));
        assert!(fn_column(&[], &EvaluationContext::new(&table, foreign)).is_err());
    }
}
