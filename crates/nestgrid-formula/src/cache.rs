//! Parsed-expression cache
//!
//! Formulas are parsed once per distinct text. The cached AST carries no cell
//! context, so cells sharing a formula text share its parse.

use crate::ast::ParsedFormula;
use crate::error::FormulaResult;
use crate::functions::FunctionRegistry;
use crate::parser::parse_formula_with;
use ahash::AHashMap;
use log::trace;
use std::sync::Arc;

/// Cache of parse outcomes keyed by literal formula text
///
/// Parse failures are cached as well so a broken formula shared by many cells
/// is reported without being re-parsed.
#[derive(Debug, Default)]
pub struct ExpressionCache {
    entries: AHashMap<String, FormulaResult<Arc<ParsedFormula>>>,
    hits: u64,
    misses: u64,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The parse of `text`, parsing and storing it on first use
    pub fn get_or_parse(
        &mut self,
        text: &str,
        registry: &FunctionRegistry,
    ) -> FormulaResult<Arc<ParsedFormula>> {
        if let Some(entry) = self.entries.get(text) {
            self.hits += 1;
            return entry.clone();
        }

        self.misses += 1;
        trace!("parsing formula {:?}", text);
        let entry = parse_formula_with(text, registry).map(Arc::new);
        self.entries.insert(text.to_string(), entry.clone());
        entry
    }

    pub fn contains(&self, text: &str) -> bool {
        self.entries.contains_key(text)
    }

    /// Number of distinct formula texts cached
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cached parse, keeping the counters
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
