//! Logical functions

use super::arg;
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};

/// IF function
///
/// The evaluator hands over only the branch that was taken; the other one
/// arrives as [`FormulaValue::Empty`].
pub fn fn_if(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let condition = arg(args, 0, "IF")?;
    let if_true = arg(args, 1, "IF")?;
    let if_false = args.get(2);

    let condition = condition.as_bool().ok_or_else(|| FormulaError::TypeCoercion {
        expected: "boolean",
        actual: condition.as_string(),
    })?;

    if condition {
        Ok(if_true.clone())
    } else {
        Ok(if_false.cloned().unwrap_or(FormulaValue::Boolean(false)))
    }
}

/// Logical values among the arguments: booleans and numbers, in ranges and
/// direct arguments alike; text that spells a boolean counts when passed directly
fn logical_values(args: &[FormulaValue]) -> FormulaResult<Vec<bool>> {
    let mut values = Vec::new();
    for arg in args {
        match arg {
            FormulaValue::Range(items) => values.extend(items.iter().filter_map(|v| match v {
                FormulaValue::Boolean(b) => Some(*b),
                FormulaValue::Number(n) => Some(*n != 0.0),
                _ => None,
            })),
            FormulaValue::Empty => {}
            other => values.push(other.as_bool().ok_or_else(|| FormulaError::TypeCoercion {
                expected: "boolean",
                actual: other.as_string(),
            })?),
        }
    }

    if values.is_empty() {
        return Err(FormulaError::Validation("no logical values to combine".into()));
    }
    Ok(values)
}

/// AND function
pub fn fn_and(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let values = logical_values(args)?;
    Ok(FormulaValue::Boolean(values.into_iter().all(|b| b)))
}

/// OR function
pub fn fn_or(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let values = logical_values(args)?;
    Ok(FormulaValue::Boolean(values.into_iter().any(|b| b)))
}

/// NOT function
pub fn fn_not(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let value = arg(args, 0, "NOT")?;
    let b = value.as_bool().ok_or_else(|| FormulaError::TypeCoercion {
        expected: "boolean",
        actual: value.as_string(),
    })?;
    Ok(FormulaValue::Boolean(!b))
}
