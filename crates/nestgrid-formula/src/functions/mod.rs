//! Built-in functions
//!
//! Every function is registered explicitly in [`FunctionRegistry::new`] with an
//! argument contract (one [`ArgSlot`] per position, the last one repeating for
//! variadic functions) and a [`ReturnType`] tag.

pub mod criteria;
pub mod logical;
pub mod math;
pub mod statistical;
pub mod text;

use crate::ast::{ArgKinds, Argument};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};
use crate::tokenizer::at_word_start;
use ahash::AHashMap;
use std::sync::OnceLock;

/// Function implementation signature
///
/// Arguments arrive evaluated: references as their cell's value, ranges as
/// [`FormulaValue::Range`], criteria as operator-prefixed text.
pub type FunctionImpl = fn(&[FormulaValue], &EvaluationContext) -> FormulaResult<FormulaValue>;

/// One positional argument of a function contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSlot {
    /// Argument kinds accepted in this position
    pub kinds: ArgKinds,
    pub optional: bool,
}

impl ArgSlot {
    pub const fn required(kinds: ArgKinds) -> Self {
        Self {
            kinds,
            optional: false,
        }
    }

    pub const fn optional(kinds: ArgKinds) -> Self {
        Self {
            kinds,
            optional: true,
        }
    }
}

/// Declared result type of a function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnType {
    Number,
    Text,
    Boolean,
    /// Whatever the arguments produce
    Any,
}

impl ReturnType {
    /// Whether a produced value honours the declaration
    pub fn admits(self, value: &FormulaValue) -> bool {
        match self {
            ReturnType::Number => matches!(value, FormulaValue::Number(_)),
            ReturnType::Text => matches!(value, FormulaValue::Text(_)),
            ReturnType::Boolean => matches!(value, FormulaValue::Boolean(_)),
            ReturnType::Any => true,
        }
    }
}

/// Function definition
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Positional argument contract
    pub args: &'static [ArgSlot],
    /// The last slot repeats without limit
    pub variadic: bool,
    pub returns: ReturnType,
    /// Implementation
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    /// Number of required arguments
    pub fn min_args(&self) -> usize {
        self.args.iter().filter(|slot| !slot.optional).count()
    }

    /// Upper bound on arguments (None = unlimited)
    pub fn max_args(&self) -> Option<usize> {
        if self.variadic {
            None
        } else {
            Some(self.args.len())
        }
    }

    /// The slot governing argument `index`
    pub fn slot(&self, index: usize) -> Option<&ArgSlot> {
        self.args
            .get(index)
            .or_else(|| self.args.last().filter(|_| self.variadic))
    }

    /// Check parsed arguments against the contract
    pub fn validate(&self, args: &[Argument]) -> FormulaResult<()> {
        let min = self.min_args();
        if args.len() < min {
            return Err(FormulaError::ArgumentCount {
                function: self.name.to_string(),
                expected: format!("at least {}", min),
                actual: args.len(),
            });
        }

        if let Some(max) = self.max_args() {
            if args.len() > max {
                return Err(FormulaError::ArgumentCount {
                    function: self.name.to_string(),
                    expected: format!("at most {}", max),
                    actual: args.len(),
                });
            }
        }

        for (i, arg) in args.iter().enumerate() {
            let kind = arg.kind();
            let accepted = self.slot(i).map_or(false, |slot| slot.kinds.contains(kind));
            if !accepted {
                return Err(FormulaError::Validation(format!(
                    "{} does not accept a {} as argument {}",
                    self.name,
                    kind,
                    i + 1
                )));
            }
        }

        Ok(())
    }
}

/// Function registry
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
    /// Registered names, longest first
    names: Vec<&'static str>,
}

static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// The registry holding every built-in function
pub fn registry() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}

/// One or more values or ranges
const LIST: &[ArgSlot] = &[ArgSlot::required(ArgKinds::ANY)];
const ONE: &[ArgSlot] = &[ArgSlot::required(ArgKinds::SCALAR)];
const TWO: &[ArgSlot] = &[
    ArgSlot::required(ArgKinds::SCALAR),
    ArgSlot::required(ArgKinds::SCALAR),
];
const ONE_OPTIONAL_DIGITS: &[ArgSlot] = &[
    ArgSlot::required(ArgKinds::SCALAR),
    ArgSlot::optional(ArgKinds::SCALAR),
];
const NONE: &[ArgSlot] = &[];
const IF_ARGS: &[ArgSlot] = &[
    ArgSlot::required(ArgKinds::SCALAR),
    ArgSlot::required(ArgKinds::SCALAR),
    ArgSlot::optional(ArgKinds::SCALAR),
];
const COUNT_IF_ARGS: &[ArgSlot] = &[
    ArgSlot::required(ArgKinds::CELLS),
    ArgSlot::required(ArgKinds::CRITERIA),
];
const SUM_IF_ARGS: &[ArgSlot] = &[
    ArgSlot::required(ArgKinds::CELLS),
    ArgSlot::required(ArgKinds::CRITERIA),
    ArgSlot::optional(ArgKinds::CELLS),
];
const CELLS: &[ArgSlot] = &[ArgSlot::required(ArgKinds::CELLS)];

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
            names: Vec::new(),
        };

        registry.register_math_functions();
        registry.register_logical_functions();
        registry.register_text_functions();
        registry.register_statistical_functions();

        registry
    }

    /// Look up a function by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    /// Register a function, replacing any previous one of the same name
    pub fn register(&mut self, def: FunctionDef) {
        if !self.names.contains(&def.name) {
            self.names.push(def.name);
            self.names
                .sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        }
        self.functions.insert(def.name.to_uppercase(), def);
    }

    /// Longest registered name starting at byte `pos` of `text`
    pub fn match_at(&self, text: &str, pos: usize) -> Option<&FunctionDef> {
        self.names
            .iter()
            .find(|name| {
                text.get(pos..pos + name.len())
                    .map_or(false, |s| s.eq_ignore_ascii_case(name))
            })
            .and_then(|name| self.get(name))
    }

    /// Earliest, then longest, registered name starting a word in `text[from..]`
    ///
    /// Returns the byte position of the name within `text`.
    pub fn find_in(&self, text: &str, from: usize) -> Option<(usize, &FunctionDef)> {
        text.get(from..)?
            .char_indices()
            .map(|(offset, _)| from + offset)
            .filter(|&pos| at_word_start(text, pos))
            .find_map(|pos| self.match_at(text, pos).map(|def| (pos, def)))
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    fn register_math_functions(&mut self) {
        // SUM
        self.register(FunctionDef {
            name: "SUM",
            args: LIST,
            variadic: true,
            returns: ReturnType::Number,
            implementation: math::fn_sum,
        });

        // AVERAGE
        self.register(FunctionDef {
            name: "AVERAGE",
            args: LIST,
            variadic: true,
            returns: ReturnType::Number,
            implementation: math::fn_average,
        });

        // MIN
        self.register(FunctionDef {
            name: "MIN",
            args: LIST,
            variadic: true,
            returns: ReturnType::Number,
            implementation: math::fn_min,
        });

        // MAX
        self.register(FunctionDef {
            name: "MAX",
            args: LIST,
            variadic: true,
            returns: ReturnType::Number,
            implementation: math::fn_max,
        });

        // COUNT
        self.register(FunctionDef {
            name: "COUNT",
            args: LIST,
            variadic: true,
            returns: ReturnType::Number,
            implementation: math::fn_count,
        });

        // PRODUCT
        self.register(FunctionDef {
            name: "PRODUCT",
            args: LIST,
            variadic: true,
            returns: ReturnType::Number,
            implementation: math::fn_product,
        });

        // ABS
        self.register(FunctionDef {
            name: "ABS",
            args: ONE,
            variadic: false,
            returns: ReturnType::Number,
            implementation: math::fn_abs,
        });

        // ROUND
        self.register(FunctionDef {
            name: "ROUND",
            args: ONE_OPTIONAL_DIGITS,
            variadic: false,
            returns: ReturnType::Number,
            implementation: math::fn_round,
        });

        // ROUNDUP
        self.register(FunctionDef {
            name: "ROUNDUP",
            args: ONE_OPTIONAL_DIGITS,
            variadic: false,
            returns: ReturnType::Number,
            implementation: math::fn_roundup,
        });

        // ROUNDDOWN
        self.register(FunctionDef {
            name: "ROUNDDOWN",
            args: ONE_OPTIONAL_DIGITS,
            variadic: false,
            returns: ReturnType::Number,
            implementation: math::fn_rounddown,
        });

        // INT
        self.register(FunctionDef {
            name: "INT",
            args: ONE,
            variadic: false,
            returns: ReturnType::Number,
            implementation: math::fn_int,
        });

        // MOD
        self.register(FunctionDef {
            name: "MOD",
            args: TWO,
            variadic: false,
            returns: ReturnType::Number,
            implementation: math::fn_mod,
        });

        // POWER
        self.register(FunctionDef {
            name: "POWER",
            args: TWO,
            variadic: false,
            returns: ReturnType::Number,
            implementation: math::fn_power,
        });

        // SQRT
        self.register(FunctionDef {
            name: "SQRT",
            args: ONE,
            variadic: false,
            returns: ReturnType::Number,
            implementation: math::fn_sqrt,
        });

        // ROW
        self.register(FunctionDef {
            name: "ROW",
            args: NONE,
            variadic: false,
            returns: ReturnType::Number,
            implementation: math::fn_row,
        });

        // COLUMN
        self.register(FunctionDef {
            name: "COLUMN",
            args: NONE,
            variadic: false,
            returns: ReturnType::Number,
            implementation: math::fn_column,
        });
    }

    fn register_logical_functions(&mut self) {
        // IF (the evaluator skips the branch not taken)
        self.register(FunctionDef {
            name: "IF",
            args: IF_ARGS,
            variadic: false,
            returns: ReturnType::Any,
            implementation: logical::fn_if,
        });

        // AND
        self.register(FunctionDef {
            name: "AND",
            args: LIST,
            variadic: true,
            returns: ReturnType::Boolean,
            implementation: logical::fn_and,
        });

        // OR
        self.register(FunctionDef {
            name: "OR",
            args: LIST,
            variadic: true,
            returns: ReturnType::Boolean,
            implementation: logical::fn_or,
        });

        // NOT
        self.register(FunctionDef {
            name: "NOT",
            args: ONE,
            variadic: false,
            returns: ReturnType::Boolean,
            implementation: logical::fn_not,
        });
    }

    fn register_text_functions(&mut self) {
        // CONCAT
        self.register(FunctionDef {
            name: "CONCAT",
            args: LIST,
            variadic: true,
            returns: ReturnType::Text,
            implementation: text::fn_concat,
        });

        // LEN
        self.register(FunctionDef {
            name: "LEN",
            args: ONE,
            variadic: false,
            returns: ReturnType::Number,
            implementation: text::fn_len,
        });

        // LEFT
        self.register(FunctionDef {
            name: "LEFT",
            args: ONE_OPTIONAL_DIGITS,
            variadic: false,
            returns: ReturnType::Text,
            implementation: text::fn_left,
        });

        // RIGHT
        self.register(FunctionDef {
            name: "RIGHT",
            args: ONE_OPTIONAL_DIGITS,
            variadic: false,
            returns: ReturnType::Text,
            implementation: text::fn_right,
        });

        // UPPER
        self.register(FunctionDef {
            name: "UPPER",
            args: ONE,
            variadic: false,
            returns: ReturnType::Text,
            implementation: text::fn_upper,
        });

        // LOWER
        self.register(FunctionDef {
            name: "LOWER",
            args: ONE,
            variadic: false,
            returns: ReturnType::Text,
            implementation: text::fn_lower,
        });

        // TRIM
        self.register(FunctionDef {
            name: "TRIM",
            args: ONE,
            variadic: false,
            returns: ReturnType::Text,
            implementation: text::fn_trim,
        });
    }

    fn register_statistical_functions(&mut self) {
        // COUNTA
        self.register(FunctionDef {
            name: "COUNTA",
            args: LIST,
            variadic: true,
            returns: ReturnType::Number,
            implementation: statistical::fn_counta,
        });

        // COUNTBLANK
        self.register(FunctionDef {
            name: "COUNTBLANK",
            args: CELLS,
            variadic: false,
            returns: ReturnType::Number,
            implementation: statistical::fn_countblank,
        });

        // MEDIAN
        self.register(FunctionDef {
            name: "MEDIAN",
            args: LIST,
            variadic: true,
            returns: ReturnType::Number,
            implementation: statistical::fn_median,
        });

        // COUNTIF
        self.register(FunctionDef {
            name: "COUNTIF",
            args: COUNT_IF_ARGS,
            variadic: false,
            returns: ReturnType::Number,
            implementation: statistical::fn_countif,
        });

        // SUMIF
        self.register(FunctionDef {
            name: "SUMIF",
            args: SUM_IF_ARGS,
            variadic: false,
            returns: ReturnType::Number,
            implementation: statistical::fn_sumif,
        });

        // AVERAGEIF
        self.register(FunctionDef {
            name: "AVERAGEIF",
            args: SUM_IF_ARGS,
            variadic: false,
            returns: ReturnType::Number,
            implementation: statistical::fn_averageif,
        });
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Every value of the arguments, with ranges expanded in place
pub(crate) fn flatten(args: &[FormulaValue]) -> impl Iterator<Item = &FormulaValue> {
    args.iter().flat_map(|arg| match arg {
        FormulaValue::Range(items) => items.iter(),
        other => std::slice::from_ref(other).iter(),
    })
}

/// Numbers to aggregate: every number inside ranges, and every direct argument
/// that coerces to one (empty direct arguments are skipped)
pub(crate) fn collect_numbers(args: &[FormulaValue]) -> FormulaResult<Vec<f64>> {
    let mut numbers = Vec::new();
    for arg in args {
        match arg {
            FormulaValue::Range(items) => numbers.extend(items.iter().filter_map(|v| match v {
                FormulaValue::Number(n) => Some(*n),
                _ => None,
            })),
            FormulaValue::Empty => {}
            other => numbers.push(other.to_number()?),
        }
    }
    Ok(numbers)
}

/// Required argument at `index`
pub(crate) fn arg<'v>(args: &'v [FormulaValue], index: usize, function: &str) -> FormulaResult<&'v FormulaValue> {
    args.get(index).ok_or_else(|| FormulaError::ArgumentCount {
        function: function.to_string(),
        expected: format!("at least {}", index + 1),
        actual: args.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ArgKind, FormulaExpr};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(registry().get("sum").map(|d| d.name), Some("SUM"));
        assert_eq!(registry().get("CountIf").map(|d| d.name), Some("COUNTIF"));
        assert!(registry().get("NOPE").is_none());
    }

    #[test]
    fn test_find_in_earliest_then_longest() {
        let text = "1+countif(A1:A2,1)+SUM(B1)";
        let (pos, def) = registry().find_in(text, 0).unwrap();
        assert_eq!((pos, def.name), (2, "COUNTIF"));
        let (pos, def) = registry().find_in(text, 3).unwrap();
        assert_eq!((pos, def.name), (19, "SUM"));

        let (pos, def) = registry().find_in("A1*ROUNDDOWN(B1)", 0).unwrap();
        assert_eq!((pos, def.name), (3, "ROUNDDOWN"));

        assert!(registry().find_in("A1+B2", 0).is_none());
        assert!(registry().find_in("XSUM(1)+A1", 0).is_none());
        assert!(registry().find_in("LEN", 9).is_none());
    }

    #[test]
    fn test_contract_bounds() {
        let round = registry().get("ROUND").unwrap();
        assert_eq!(round.min_args(), 1);
        assert_eq!(round.max_args(), Some(2));

        let sum = registry().get("SUM").unwrap();
        assert_eq!(sum.min_args(), 1);
        assert_eq!(sum.max_args(), None);
        assert_eq!(sum.slot(5).map(|s| s.kinds), Some(ArgKinds::ANY));
        assert!(round.slot(2).is_none());
    }

    #[test]
    fn test_validate_kinds() {
        let countif = registry().get("COUNTIF").unwrap();
        let literal = Argument::Expr(FormulaExpr::Number(1.0));
        assert_eq!(literal.kind(), ArgKind::Literal);
        assert!(matches!(
            countif.validate(&[literal.clone(), literal.clone()]),
            Err(FormulaError::Validation(_))
        ));
        assert!(matches!(
            countif.validate(&[literal]),
            Err(FormulaError::ArgumentCount { actual: 1, .. })
        ));
    }

    #[test]
    fn test_return_type_admits() {
        assert!(ReturnType::Number.admits(&FormulaValue::Number(1.0)));
        assert!(!ReturnType::Number.admits(&FormulaValue::Text("1".into())));
        assert!(ReturnType::Any.admits(&FormulaValue::Empty));
    }
}
