//! Formula parser
//!
//! A recursive descent parser over the tokens produced by [`crate::tokenizer`].
//! Precedence, lowest to highest:
//!
//! 1. comparison (`= <> != < <= > >=`)
//! 2. `+ -`
//! 3. `* /`
//! 4. `^` (right-associative)
//! 5. prefix `+ -`
//! 6. postfix `%` (chainable)

use crate::ast::{
    Argument, BinaryOperator, CompareOperator, FormulaExpr, ParsedFormula, UnaryOperator,
};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::{registry, FunctionRegistry};
use crate::tokenizer::{tokenize, FunctionCall, Token};
use nestgrid_core::CellValue;

/// Parse cell formula text using the built-in function registry
///
/// Text starting with `=` is a live formula; anything else is a literal,
/// read as a number when it parses as one and as text otherwise.
///
/// # Example
/// ```rust
/// use nestgrid_formula::{parse_formula, ParsedFormula};
///
/// let parsed = parse_formula("=SUM(A1:A10)*2").unwrap();
/// assert!(matches!(parsed, ParsedFormula::Expression(_)));
///
/// let literal = parse_formula("12.5").unwrap();
/// assert!(matches!(literal, ParsedFormula::Literal(_)));
/// ```
pub fn parse_formula(text: &str) -> FormulaResult<ParsedFormula> {
    parse_formula_with(text, registry())
}

/// Parse cell formula text against a specific registry
pub fn parse_formula_with(text: &str, registry: &FunctionRegistry) -> FormulaResult<ParsedFormula> {
    match text.trim_start().strip_prefix('=') {
        Some(expr) => Ok(ParsedFormula::Expression(parse_expression(expr, registry)?)),
        None => Ok(ParsedFormula::Literal(parse_literal(text))),
    }
}

fn parse_literal(text: &str) -> CellValue {
    if text.is_empty() {
        return CellValue::Empty;
    }
    match text.trim().parse::<f64>() {
        Ok(n) => CellValue::Number(n),
        Err(_) => CellValue::Text(text.to_string()),
    }
}

/// Parse expression text (without the leading `=`)
pub fn parse_expression(text: &str, registry: &FunctionRegistry) -> FormulaResult<FormulaExpr> {
    let (tokens, calls) = tokenize(text, registry)?;
    if tokens.is_empty() {
        return Err(FormulaError::parse("empty expression"));
    }

    let mut parser = FormulaParser {
        tokens,
        pos: 0,
        calls,
        registry,
    };
    let expr = parser.parse_comparison()?;

    if let Some(token) = parser.peek() {
        return Err(FormulaError::parse(format!(
            "unexpected {:?} in '{}'",
            token, text
        )));
    }

    Ok(expr)
}

/// Parse one function argument: criteria when it opens with a comparison operator
fn parse_argument(text: &str, registry: &FunctionRegistry) -> FormulaResult<Argument> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(FormulaError::parse("empty argument"));
    }

    match CompareOperator::parse_prefix(trimmed) {
        Some((op, len)) => {
            let rest = trimmed[len..].trim();
            let value = if rest.is_empty() {
                FormulaExpr::Text(String::new())
            } else {
                parse_expression(rest, registry)?
            };
            Ok(Argument::Criteria { op, value })
        }
        None => Ok(Argument::Expr(parse_expression(trimmed, registry)?)),
    }
}

struct FormulaParser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    calls: Vec<FunctionCall<'a>>,
    registry: &'a FunctionRegistry,
}

impl<'a> FormulaParser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn consume(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    // === Grammar ===

    fn parse_comparison(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_additive()?;

        while let Some(Token::Compare(op)) = self.peek() {
            let op = *op;
            self.pos += 1;
            let right = self.parse_additive()?;
            left = FormulaExpr::Condition {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOperator::Add,
                Some(Token::Minus) => BinaryOperator::Subtract,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_power()?;

        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOperator::Multiply,
                Some(Token::Slash) => BinaryOperator::Divide,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_power()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_power(&mut self) -> FormulaResult<FormulaExpr> {
        let base = self.parse_unary()?;

        if self.consume(&Token::Caret) {
            // Right-associative: 2^3^2 = 2^(3^2)
            let exponent = self.parse_power()?;
            return Ok(binary(BinaryOperator::Power, base, exponent));
        }

        Ok(base)
    }

    fn parse_unary(&mut self) -> FormulaResult<FormulaExpr> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOperator::Negate,
            Some(Token::Plus) => UnaryOperator::Plus,
            _ => return self.parse_postfix(),
        };
        self.pos += 1;
        let operand = self.parse_unary()?;
        Ok(FormulaExpr::UnaryOp {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> FormulaResult<FormulaExpr> {
        let mut expr = self.parse_primary()?;

        while self.consume(&Token::Percent) {
            expr = FormulaExpr::UnaryOp {
                op: UnaryOperator::Percent,
                operand: Box::new(expr),
            };
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        match self.next() {
            Some(Token::Number(n)) => Ok(FormulaExpr::Number(n)),
            Some(Token::Text(s)) => Ok(FormulaExpr::Text(s)),
            Some(Token::Boolean(b)) => Ok(FormulaExpr::Boolean(b)),
            Some(Token::Reference(address)) => Ok(FormulaExpr::Reference(address)),
            Some(Token::Range(range)) => Ok(FormulaExpr::Range(range)),
            Some(Token::Call(index)) => self.parse_call(index),
            Some(Token::LeftParen) => {
                let expr = self.parse_comparison()?;
                if !self.consume(&Token::RightParen) {
                    return Err(FormulaError::parse("expected ')'"));
                }
                Ok(expr)
            }
            Some(token) => Err(FormulaError::parse(format!("unexpected {:?}", token))),
            None => Err(FormulaError::parse("unexpected end of formula")),
        }
    }

    fn parse_call(&mut self, index: usize) -> FormulaResult<FormulaExpr> {
        let call = self
            .calls
            .get(index)
            .ok_or_else(|| FormulaError::parse("dangling function call"))?;
        let def = self
            .registry
            .get(call.name)
            .ok_or_else(|| FormulaError::UnknownFunction(call.name.to_string()))?;

        let args = call
            .args
            .iter()
            .map(|arg| parse_argument(arg, self.registry))
            .collect::<FormulaResult<Vec<_>>>()?;

        def.validate(&args)?;

        Ok(FormulaExpr::Function {
            name: def.name.to_string(),
            args,
        })
    }
}

fn binary(op: BinaryOperator, left: FormulaExpr, right: FormulaExpr) -> FormulaExpr {
    FormulaExpr::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
