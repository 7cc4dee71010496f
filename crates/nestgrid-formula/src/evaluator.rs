//! Formula evaluator
//!
//! Evaluates formula ASTs against an explicit `(root table, cell id)` context.

use crate::ast::{Argument, BinaryOperator, FormulaExpr, ParsedFormula, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::{criteria, registry};
use log::trace;
use nestgrid_core::{resolve_range, resolve_single, CellId, CellValue, Table, ValueType};

/// Value types during formula evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    Text(String),
    Boolean(bool),
    Empty,
    /// The values of a range's cells, in resolution order
    Range(Vec<FormulaValue>),
}

impl FormulaValue {
    /// Convert to number, if possible
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormulaValue::Number(n) => Some(*n),
            FormulaValue::Boolean(true) => Some(1.0),
            FormulaValue::Boolean(false) => Some(0.0),
            FormulaValue::Text(s) => s.trim().parse().ok(),
            FormulaValue::Empty => Some(0.0),
            FormulaValue::Range(_) => None,
        }
    }

    /// Force conversion to number for arithmetic
    ///
    /// A range converts only when it holds exactly one cell.
    pub fn to_number(&self) -> FormulaResult<f64> {
        match self {
            FormulaValue::Range(items) if items.len() == 1 => items[0].to_number(),
            FormulaValue::Range(items) => Err(FormulaError::arithmetic(format!(
                "a range of {} cells used as a number",
                items.len()
            ))),
            other => other.as_number().ok_or_else(|| {
                FormulaError::arithmetic(format!("cannot convert {} to number", other.as_string()))
            }),
        }
    }

    /// Convert to boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FormulaValue::Boolean(b) => Some(*b),
            FormulaValue::Number(n) => Some(*n != 0.0),
            FormulaValue::Text(s) => {
                let upper = s.trim().to_uppercase();
                if upper == "TRUE" {
                    Some(true)
                } else if upper == "FALSE" {
                    Some(false)
                } else {
                    None
                }
            }
            FormulaValue::Empty => Some(false),
            FormulaValue::Range(items) if items.len() == 1 => items[0].as_bool(),
            FormulaValue::Range(_) => None,
        }
    }

    /// Convert to string
    pub fn as_string(&self) -> String {
        match self {
            FormulaValue::Number(n) => {
                // Integers print without a fractional part
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            FormulaValue::Text(s) => s.clone(),
            FormulaValue::Boolean(true) => "TRUE".to_string(),
            FormulaValue::Boolean(false) => "FALSE".to_string(),
            FormulaValue::Empty => String::new(),
            FormulaValue::Range(items) if items.len() == 1 => items[0].as_string(),
            FormulaValue::Range(items) => format!("<range of {}>", items.len()),
        }
    }

    /// Collapse a one-cell range to its value
    pub fn scalar(self) -> FormulaResult<FormulaValue> {
        match self {
            FormulaValue::Range(mut items) if items.len() == 1 => Ok(items.remove(0)),
            FormulaValue::Range(items) => Err(FormulaError::arithmetic(format!(
                "a range of {} cells used as a single value",
                items.len()
            ))),
            other => Ok(other),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            FormulaValue::Number(_) => "number",
            FormulaValue::Text(_) => "text",
            FormulaValue::Boolean(_) => "boolean",
            FormulaValue::Empty => "empty",
            FormulaValue::Range(_) => "range",
        }
    }
}

impl From<CellValue> for FormulaValue {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Empty => FormulaValue::Empty,
            CellValue::Number(n) => FormulaValue::Number(n),
            CellValue::Text(s) => FormulaValue::Text(s),
            CellValue::Boolean(b) => FormulaValue::Boolean(b),
        }
    }
}

impl From<&CellValue> for FormulaValue {
    fn from(value: &CellValue) -> Self {
        value.clone().into()
    }
}

/// Context for formula evaluation
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// Root table all addresses are resolved against
    pub root: &'a Table,
    /// The cell whose formula is being evaluated
    pub cell: CellId,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(root: &'a Table, cell: CellId) -> Self {
        Self { root, cell }
    }
}

/// Evaluate a parsed cell formula
///
/// Literal formulas evaluate to their stored value.
pub fn evaluate_formula(formula: &ParsedFormula, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    match formula {
        ParsedFormula::Literal(value) => Ok(value.into()),
        ParsedFormula::Expression(expr) => evaluate(expr, ctx)?.scalar(),
    }
}

/// Evaluate a formula expression
pub fn evaluate(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    match expr {
        // === Literals ===
        FormulaExpr::Number(n) => Ok(FormulaValue::Number(*n)),
        FormulaExpr::Text(s) => Ok(FormulaValue::Text(s.clone())),
        FormulaExpr::Boolean(b) => Ok(FormulaValue::Boolean(*b)),

        // === References ===
        FormulaExpr::Reference(address) => {
            let cell = resolve_single(address, ctx.root, true)?;
            cell.value().map(FormulaValue::from).ok_or_else(|| {
                FormulaError::Resolution(format!("{} refers to a sub-table, not a value", address))
            })
        }

        FormulaExpr::Range(range) => {
            let values = resolve_range(range, ctx.root)?
                .into_iter()
                .filter_map(|cell| cell.value().map(FormulaValue::from))
                .collect();
            Ok(FormulaValue::Range(values))
        }

        // === Operators ===
        FormulaExpr::BinaryOp { op, left, right } => evaluate_binary_op(*op, left, right, ctx),

        FormulaExpr::UnaryOp { op, operand } => evaluate_unary_op(*op, operand, ctx),

        FormulaExpr::Condition { op, left, right } => {
            let left = evaluate(left, ctx)?.scalar()?;
            let right = evaluate(right, ctx)?.scalar()?;
            Ok(FormulaValue::Boolean(criteria::compare(*op, &left, &right)))
        }

        // === Functions ===
        FormulaExpr::Function { name, args } => evaluate_function(name, args, ctx),
    }
}

/// Evaluate a binary operation
fn evaluate_binary_op(
    op: BinaryOperator,
    left: &FormulaExpr,
    right: &FormulaExpr,
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let l = evaluate(left, ctx)?.to_number()?;
    let r = evaluate(right, ctx)?.to_number()?;

    let result = match op {
        BinaryOperator::Add => l + r,
        BinaryOperator::Subtract => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide => {
            if r == 0.0 {
                return Err(FormulaError::arithmetic("division by zero"));
            }
            l / r
        }
        BinaryOperator::Power => l.powf(r),
    };
    finite(result).map(FormulaValue::Number)
}

/// Reject results that overflowed or are undefined
fn finite(n: f64) -> FormulaResult<f64> {
    if n.is_finite() {
        Ok(n)
    } else {
        Err(FormulaError::arithmetic(format!("{} is not a finite number", n)))
    }
}

/// Evaluate a unary operation
fn evaluate_unary_op(
    op: UnaryOperator,
    operand: &FormulaExpr,
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let n = evaluate(operand, ctx)?.to_number()?;

    match op {
        UnaryOperator::Plus => Ok(FormulaValue::Number(n)),
        UnaryOperator::Negate => Ok(FormulaValue::Number(-n)),
        UnaryOperator::Percent => Ok(FormulaValue::Number(n / 100.0)),
    }
}

/// Evaluate a single function argument
///
/// Criteria arguments become operator-prefixed text so functions see them the
/// same way as a criteria string held in a cell.
fn evaluate_argument(arg: &Argument, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    match arg {
        Argument::Expr(expr) => evaluate(expr, ctx),
        Argument::Criteria { op, value } => {
            let value = evaluate(value, ctx)?.scalar()?;
            Ok(FormulaValue::Text(format!("{}{}", op.symbol(), value.as_string())))
        }
    }
}

/// Evaluate a function call
fn evaluate_function(
    name: &str,
    args: &[Argument],
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let func = registry()
        .get(name)
        .ok_or_else(|| FormulaError::UnknownFunction(name.to_string()))?;

    trace!("evaluating {} with {} argument(s)", func.name, args.len());

    let evaluated_args = if func.name == "IF" {
        evaluate_if_arguments(args, ctx)?
    } else {
        args.iter()
            .map(|arg| evaluate_argument(arg, ctx))
            .collect::<FormulaResult<Vec<_>>>()?
    };

    let result = match (func.implementation)(&evaluated_args, ctx)? {
        FormulaValue::Number(n) => FormulaValue::Number(finite(n)?),
        other => other,
    };
    if !func.returns.admits(&result) {
        return Err(FormulaError::Validation(format!(
            "{} produced a {} where its declared result type was expected",
            func.name,
            result.type_name()
        )));
    }
    Ok(result)
}

/// IF evaluates only the branch it takes; the other is passed as empty
fn evaluate_if_arguments(args: &[Argument], ctx: &EvaluationContext) -> FormulaResult<Vec<FormulaValue>> {
    let mut evaluated = vec![FormulaValue::Empty; args.len()];
    let Some(condition) = args.first() else {
        return Ok(evaluated);
    };

    let condition = evaluate_argument(condition, ctx)?.scalar()?;
    let taken = match condition.as_bool() {
        Some(true) => 1,
        Some(false) => 2,
        None => {
            return Err(FormulaError::TypeCoercion {
                expected: "boolean",
                actual: condition.as_string(),
            })
        }
    };

    if let Some(branch) = args.get(taken) {
        evaluated[taken] = evaluate_argument(branch, ctx)?;
    }
    evaluated[0] = condition;
    Ok(evaluated)
}

/// Convert a formula result to the value a cell of `value_type` stores
pub fn coerce(value: FormulaValue, value_type: ValueType) -> FormulaResult<CellValue> {
    let value = value.scalar()?;
    let mismatch = |value: &FormulaValue, expected: &'static str| FormulaError::TypeCoercion {
        expected,
        actual: format!("{} {:?}", value.type_name(), value.as_string()),
    };

    match value_type {
        ValueType::Any => Ok(match value {
            FormulaValue::Number(n) => CellValue::Number(n),
            FormulaValue::Text(s) => CellValue::Text(s),
            FormulaValue::Boolean(b) => CellValue::Boolean(b),
            FormulaValue::Empty | FormulaValue::Range(_) => CellValue::Empty,
        }),
        ValueType::Number => value
            .as_number()
            .map(CellValue::Number)
            .ok_or_else(|| mismatch(&value, "number")),
        ValueType::Text => Ok(CellValue::Text(value.as_string())),
        ValueType::Boolean => value
            .as_bool()
            .map(CellValue::Boolean)
            .ok_or_else(|| mismatch(&value, "boolean")),
    }
}
