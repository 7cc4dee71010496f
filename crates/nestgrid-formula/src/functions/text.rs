//! Text functions

use super::{arg, flatten};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};

fn take_left(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn take_right(s: &str, n: usize) -> String {
    let len = s.chars().count();
    if n >= len {
        return s.to_string();
    }
    s.chars().skip(len - n).collect()
}

/// Optional character count, defaulting to 1
fn char_count(args: &[FormulaValue], function: &str) -> FormulaResult<usize> {
    let Some(value) = args.get(1) else {
        return Ok(1);
    };
    let n = value.to_number()?.trunc();
    if n < 0.0 {
        return Err(FormulaError::Validation(format!(
            "{} needs a non-negative character count, got {}",
            function, n
        )));
    }
    Ok(n as usize)
}

/// LEN(text)
pub fn fn_len(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let s = arg(args, 0, "LEN")?.as_string();
    Ok(FormulaValue::Number(s.chars().count() as f64))
}

/// LEFT(text, [num_chars])
pub fn fn_left(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let text = arg(args, 0, "LEFT")?.as_string();
    let n = char_count(args, "LEFT")?;
    Ok(FormulaValue::Text(take_left(&text, n)))
}

/// RIGHT(text, [num_chars])
pub fn fn_right(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let text = arg(args, 0, "RIGHT")?.as_string();
    let n = char_count(args, "RIGHT")?;
    Ok(FormulaValue::Text(take_right(&text, n)))
}

/// LOWER(text)
pub fn fn_lower(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Text(arg(args, 0, "LOWER")?.as_string().to_lowercase()))
}

/// UPPER(text)
pub fn fn_upper(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Text(arg(args, 0, "UPPER")?.as_string().to_uppercase()))
}

/// TRIM(text): strip both ends and collapse inner runs of whitespace
pub fn fn_trim(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let s = arg(args, 0, "TRIM")?.as_string();
    let trimmed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    Ok(FormulaValue::Text(trimmed))
}

/// CONCAT(text1, [text2], ...)
pub fn fn_concat(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let out: String = flatten(args).map(FormulaValue::as_string).collect();
    Ok(FormulaValue::Text(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nestgrid_core::Table;

    fn call(
        f: fn(&[FormulaValue], &EvaluationContext) -> FormulaResult<FormulaValue>,
        args: &[FormulaValue],
    ) -> FormulaResult<FormulaValue> {
        let table = Table::new(1, 1);
        let here = table.cell_at(1, 1).unwrap().id();
        f(args, &EvaluationContext::new(&table, here))
    }

    fn text(s: &str) -> FormulaValue {
        FormulaValue::Text(s.into())
    }

    #[test]
    fn test_len_counts_characters() {
        assert_eq!(call(fn_len, &[text("héllo")]).unwrap(), FormulaValue::Number(5.0));
        assert_eq!(call(fn_len, &[FormulaValue::Number(12.5)]).unwrap(), FormulaValue::Number(4.0));
    }

    #[test]
    fn test_left_right() {
        assert_eq!(call(fn_left, &[text("abcdef")]).unwrap(), text("a"));
        assert_eq!(
            call(fn_left, &[text("abcdef"), FormulaValue::Number(3.0)]).unwrap(),
            text("abc")
        );
        assert_eq!(
            call(fn_right, &[text("abcdef"), FormulaValue::Number(2.0)]).unwrap(),
            text("ef")
        );
        assert_eq!(
            call(fn_right, &[text("ab"), FormulaValue::Number(10.0)]).unwrap(),
            text("ab")
        );
        assert!(call(fn_left, &[text("ab"), FormulaValue::Number(-1.0)]).is_err());
    }

    #[test]
    fn test_case_and_trim() {
        assert_eq!(call(fn_upper, &[text("MiXed")]).unwrap(), text("MIXED"));
        assert_eq!(call(fn_lower, &[text("MiXed")]).unwrap(), text("mixed"));
        assert_eq!(call(fn_trim, &[text("  a   b  ")]).unwrap(), text("a b"));
    }

    #[test]
    fn test_concat_flattens_ranges() {
        let range = FormulaValue::Range(vec![text("a"), FormulaValue::Number(1.0), FormulaValue::Empty]);
        assert_eq!(
            call(fn_concat, &[range, FormulaValue::Boolean(true)]).unwrap(),
            text("a1TRUE")
        );
    }
}
