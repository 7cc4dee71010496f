//! Abstract Syntax Tree for formulas

use nestgrid_core::{Address, CellValue, RangeAddress, Reference};
use std::fmt;

/// A parsed cell formula
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedFormula {
    /// Text without a leading `=`, stored as-is
    Literal(CellValue),
    /// A live `=` formula
    Expression(FormulaExpr),
}

impl ParsedFormula {
    /// Every reference the formula reads, in source order
    pub fn references(&self) -> Vec<Reference> {
        let mut refs = Vec::new();
        if let ParsedFormula::Expression(expr) = self {
            expr.collect_references(&mut refs);
        }
        refs
    }
}

/// Formula expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaExpr {
    /// Numeric literal
    Number(f64),
    /// String literal
    Text(String),
    /// Boolean literal
    Boolean(bool),

    /// Single cell reference (`A1`, `B2.$C3`)
    Reference(Address),
    /// Rectangular range (`A1:C3`, `A:B`)
    Range(RangeAddress),

    /// Arithmetic on two operands
    BinaryOp {
        op: BinaryOperator,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },
    /// Prefix sign or postfix percent
    UnaryOp {
        op: UnaryOperator,
        operand: Box<FormulaExpr>,
    },
    /// Comparison producing a boolean
    Condition {
        op: CompareOperator,
        left: Box<FormulaExpr>,
        right: Box<FormulaExpr>,
    },

    /// Call of a registered function (name is uppercase)
    Function { name: String, args: Vec<Argument> },
}

impl FormulaExpr {
    /// Classify the expression for argument contract checks
    pub fn kind(&self) -> ArgKind {
        match self {
            FormulaExpr::Number(_) | FormulaExpr::Text(_) | FormulaExpr::Boolean(_) => {
                ArgKind::Literal
            }
            FormulaExpr::Reference(_) => ArgKind::Reference,
            FormulaExpr::Range(_) => ArgKind::Range,
            FormulaExpr::BinaryOp { .. } | FormulaExpr::UnaryOp { .. } => ArgKind::Arithmetic,
            FormulaExpr::Condition { .. } => ArgKind::Condition,
            FormulaExpr::Function { .. } => ArgKind::Function,
        }
    }

    fn collect_references(&self, refs: &mut Vec<Reference>) {
        match self {
            FormulaExpr::Reference(address) => refs.push(Reference::Single(address.clone())),
            FormulaExpr::Range(range) => refs.push(Reference::Range(range.clone())),
            FormulaExpr::BinaryOp { left, right, .. } | FormulaExpr::Condition { left, right, .. } => {
                left.collect_references(refs);
                right.collect_references(refs);
            }
            FormulaExpr::UnaryOp { operand, .. } => operand.collect_references(refs),
            FormulaExpr::Function { args, .. } => {
                for arg in args {
                    arg.expr().collect_references(refs);
                }
            }
            FormulaExpr::Number(_) | FormulaExpr::Text(_) | FormulaExpr::Boolean(_) => {}
        }
    }
}

/// A function call argument
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// Any expression
    Expr(FormulaExpr),
    /// Operator-prefixed comparison value (`>5`, `<>"x"`)
    Criteria { op: CompareOperator, value: FormulaExpr },
}

impl Argument {
    pub fn kind(&self) -> ArgKind {
        match self {
            Argument::Expr(expr) => expr.kind(),
            Argument::Criteria { .. } => ArgKind::Criteria,
        }
    }

    /// The expression carrying the argument's value
    pub fn expr(&self) -> &FormulaExpr {
        match self {
            Argument::Expr(expr) => expr,
            Argument::Criteria { value, .. } => value,
        }
    }
}

/// Syntactic category of a function argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
    Reference,
    Range,
    Function,
    Literal,
    Arithmetic,
    Condition,
    Criteria,
}

impl ArgKind {
    fn bit(self) -> u8 {
        match self {
            ArgKind::Reference => 1 << 0,
            ArgKind::Range => 1 << 1,
            ArgKind::Function => 1 << 2,
            ArgKind::Literal => 1 << 3,
            ArgKind::Arithmetic => 1 << 4,
            ArgKind::Condition => 1 << 5,
            ArgKind::Criteria => 1 << 6,
        }
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgKind::Reference => "reference",
            ArgKind::Range => "range",
            ArgKind::Function => "function call",
            ArgKind::Literal => "literal",
            ArgKind::Arithmetic => "arithmetic expression",
            ArgKind::Condition => "condition",
            ArgKind::Criteria => "criteria",
        };
        f.write_str(name)
    }
}

/// Set of accepted argument kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgKinds(u8);

impl ArgKinds {
    /// Anything that folds to one value
    pub const SCALAR: ArgKinds = ArgKinds(0b0011_1101);
    /// A range or a single reference
    pub const CELLS: ArgKinds = ArgKinds(0b0000_0011);
    /// Scalars plus ranges
    pub const ANY: ArgKinds = ArgKinds::SCALAR.union(ArgKinds::CELLS);
    /// Criteria, or a scalar holding criteria text
    pub const CRITERIA: ArgKinds = ArgKinds(0b0101_1101);

    pub const fn union(self, other: ArgKinds) -> ArgKinds {
        ArgKinds(self.0 | other.0)
    }

    pub fn contains(self, kind: ArgKind) -> bool {
        self.0 & kind.bit() != 0
    }
}

/// Binary arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// `+x`
    Plus,
    /// `-x`
    Negate,
    /// `x%`
    Percent,
}

/// Comparison operators shared by conditions and criteria
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOperator {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl CompareOperator {
    /// Match an operator at the start of `text`, longest spelling first
    pub fn parse_prefix(text: &str) -> Option<(CompareOperator, usize)> {
        const SPELLINGS: [(&str, CompareOperator); 7] = [
            (">=", CompareOperator::GreaterEqual),
            ("<=", CompareOperator::LessEqual),
            ("<>", CompareOperator::NotEqual),
            ("!=", CompareOperator::NotEqual),
            (">", CompareOperator::GreaterThan),
            ("<", CompareOperator::LessThan),
            ("=", CompareOperator::Equal),
        ];
        SPELLINGS
            .iter()
            .find(|(spelling, _)| text.starts_with(spelling))
            .map(|(spelling, op)| (*op, spelling.len()))
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOperator::Equal => "=",
            CompareOperator::NotEqual => "<>",
            CompareOperator::LessThan => "<",
            CompareOperator::LessEqual => "<=",
            CompareOperator::GreaterThan => ">",
            CompareOperator::GreaterEqual => ">=",
        }
    }
}
