//! Conditions and criteria matching for COUNTIF, SUMIF and AVERAGEIF
//!
//! Both sides of a comparison are coerced in order: boolean (`true`/`false`,
//! case-insensitive), then number (equality within 1e-10), then text compared
//! case-insensitively. Criteria can be:
//! - A plain value: equality (e.g., 5 or "apple")
//! - An operator-prefixed value: ">5", ">=10", "<>apple", "!=0", "=5"
//! - Wildcards on text equality: "*" matches any characters, "?" a single one
//! - Empty text: matches empty cells

use crate::ast::CompareOperator;
use crate::evaluator::FormulaValue;
use std::cmp::Ordering;

const EPSILON: f64 = 1e-10;

fn condition_bool(value: &FormulaValue) -> Option<bool> {
    match value {
        FormulaValue::Boolean(b) => Some(*b),
        FormulaValue::Text(s) if s.trim().eq_ignore_ascii_case("true") => Some(true),
        FormulaValue::Text(s) if s.trim().eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn condition_number(value: &FormulaValue) -> Option<f64> {
    match value {
        FormulaValue::Number(n) => Some(*n),
        FormulaValue::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Evaluate `left op right` with condition coercion
pub fn compare(op: CompareOperator, left: &FormulaValue, right: &FormulaValue) -> bool {
    let ordering = if let (Some(a), Some(b)) = (condition_bool(left), condition_bool(right)) {
        a.cmp(&b)
    } else if let (Some(a), Some(b)) = (condition_number(left), condition_number(right)) {
        if (a - b).abs() < EPSILON {
            Ordering::Equal
        } else {
            a.partial_cmp(&b).unwrap_or(Ordering::Less)
        }
    } else {
        left.as_string()
            .to_lowercase()
            .cmp(&right.as_string().to_lowercase())
    };

    match op {
        CompareOperator::Equal => ordering == Ordering::Equal,
        CompareOperator::NotEqual => ordering != Ordering::Equal,
        CompareOperator::LessThan => ordering == Ordering::Less,
        CompareOperator::LessEqual => ordering != Ordering::Greater,
        CompareOperator::GreaterThan => ordering == Ordering::Greater,
        CompareOperator::GreaterEqual => ordering != Ordering::Less,
    }
}

/// Criteria matcher for SUMIF/COUNTIF/AVERAGEIF
#[derive(Debug)]
pub struct CriteriaMatcher {
    op: CompareOperator,
    operand: FormulaValue,
    /// Lowercased pattern when the operand carries wildcards
    pattern: Option<Vec<char>>,
}

impl CriteriaMatcher {
    /// Create a new criteria matcher from an evaluated criteria argument
    pub fn new(criteria: &FormulaValue) -> Self {
        match criteria {
            FormulaValue::Text(s) => Self::parse_text_criteria(s),
            FormulaValue::Range(items) if items.len() == 1 => Self::new(&items[0]),
            other => Self {
                op: CompareOperator::Equal,
                operand: other.clone(),
                pattern: None,
            },
        }
    }

    fn parse_text_criteria(s: &str) -> Self {
        let s = s.trim();
        let (op, rest) = match CompareOperator::parse_prefix(s) {
            Some((op, len)) => (op, s[len..].trim()),
            None => (CompareOperator::Equal, s),
        };

        let pattern = match op {
            CompareOperator::Equal | CompareOperator::NotEqual
                if rest.contains('*') || rest.contains('?') =>
            {
                Some(rest.to_lowercase().chars().collect())
            }
            _ => None,
        };

        Self {
            op,
            operand: FormulaValue::Text(rest.to_string()),
            pattern,
        }
    }

    /// Check if a value matches the criteria
    pub fn matches(&self, value: &FormulaValue) -> bool {
        match &self.pattern {
            Some(pattern) => {
                let text: Vec<char> = value.as_string().to_lowercase().chars().collect();
                let matched = wildcard_match(pattern, &text);
                if self.op == CompareOperator::NotEqual {
                    !matched
                } else {
                    matched
                }
            }
            None => compare(self.op, value, &self.operand),
        }
    }
}

/// Match with wildcards: * = any characters, ? = single character
fn wildcard_match(pattern: &[char], text: &[char]) -> bool {
    let mut pi = 0; // pattern index
    let mut ti = 0; // text index
    let mut star_pi = None; // position of last * in pattern
    let mut star_ti = 0; // text position when the last * was seen

    while ti < text.len() {
        if pi < pattern.len() && (pattern[pi] == '?' || pattern[pi] == text[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < pattern.len() && pattern[pi] == '*' {
            star_pi = Some(pi);
            star_ti = ti;
            pi += 1;
        } else if let Some(sp) = star_pi {
            pi = sp + 1;
            star_ti += 1;
            ti = star_ti;
        } else {
            return false;
        }
    }

    while pi < pattern.len() && pattern[pi] == '*' {
        pi += 1;
    }

    pi == pattern.len()
}
