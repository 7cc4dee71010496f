//! Table recompute pass
//!
//! Evaluates every bound formula of a table in dependency order, coerces each
//! result to its cell's declared type and stores it. Failures stay local to
//! their cell: it keeps its previous value and is reported invalid.
//!
//! # Example
//!
//! ```rust
//! use nestgrid::prelude::*;
//!
//! let mut table = Table::new(3, 1);
//! table.set_value(1, 1, 10.0).unwrap();
//!
//! let mut bindings = FormulaBindings::new();
//! bindings.set(table.cell_at(2, 1).unwrap().id(), "=A1+5");
//! bindings.set(table.cell_at(3, 1).unwrap().id(), "=B1*2");
//!
//! let report = table.recalculate(&bindings);
//! assert!(report.is_clean());
//! assert_eq!(table.cell_at(3, 1).unwrap().value(), Some(&CellValue::Number(30.0)));
//! ```

use crate::{
    coerce, evaluate_formula, registry, resolve_reference, CellId, Error, EvaluationContext,
    ExpressionCache, FormulaBindings, FormulaError, ParsedFormula, ScheduleMode, Table,
};
use ahash::{AHashMap, AHashSet};
use log::{debug, trace, warn};
use nestgrid_formula::dependency::{DependencyGraph, NodeId};
use nestgrid_formula::schedule;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Options for a recompute pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculationOptions {
    /// Evaluation order (default: in-degree counting)
    pub schedule: ScheduleMode,
    /// Keep parsed formulas between passes of the same [`Calculator`]
    pub reuse_cache: bool,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self {
            schedule: ScheduleMode::Kahn,
            reuse_cache: true,
        }
    }
}

/// Statistics from a recompute pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationStats {
    /// Number of non-empty formula bindings
    pub formula_count: usize,
    /// Number of successful evaluations
    pub cells_calculated: usize,
    /// Number of formulas left out for reading themselves, directly or through
    /// other formulas
    pub circular_references: usize,
    /// Number of cells reported invalid
    pub errors: usize,
}

/// Outcome of a recompute pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalculationReport {
    pub stats: CalculationStats,
    /// Diagnostic of every cell whose formula could not be stored
    pub invalid: BTreeMap<CellId, FormulaError>,
}

impl CalculationReport {
    /// Whether every formula was evaluated and stored
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty()
    }

    pub fn is_invalid(&self, cell: CellId) -> bool {
        self.invalid.contains_key(&cell)
    }

    /// The diagnostic for a cell, if it was reported invalid
    pub fn error(&self, cell: CellId) -> Option<&FormulaError> {
        self.invalid.get(&cell)
    }
}

/// Extension trait for Table to add recompute methods
pub trait TableCalculationExt {
    /// Recompute all bound formulas with default options
    fn recalculate(&mut self, bindings: &FormulaBindings) -> CalculationReport;

    /// Recompute all bound formulas with custom options
    fn recalculate_with_options(
        &mut self,
        bindings: &FormulaBindings,
        options: &CalculationOptions,
    ) -> CalculationReport;
}

impl TableCalculationExt for Table {
    fn recalculate(&mut self, bindings: &FormulaBindings) -> CalculationReport {
        self.recalculate_with_options(bindings, &CalculationOptions::default())
    }

    fn recalculate_with_options(
        &mut self,
        bindings: &FormulaBindings,
        options: &CalculationOptions,
    ) -> CalculationReport {
        Calculator::new(options.clone()).recalculate(self, bindings)
    }
}

/// Runs recompute passes, keeping parsed formulas between them
#[derive(Debug, Default)]
pub struct Calculator {
    options: CalculationOptions,
    cache: ExpressionCache,
}

impl Calculator {
    pub fn new(options: CalculationOptions) -> Self {
        Self {
            options,
            cache: ExpressionCache::new(),
        }
    }

    pub fn options(&self) -> &CalculationOptions {
        &self.options
    }

    /// The parsed-formula cache shared by this calculator's passes
    pub fn cache(&self) -> &ExpressionCache {
        &self.cache
    }

    /// Run one full pass over `bindings`, writing results into `table`
    pub fn recalculate(&mut self, table: &mut Table, bindings: &FormulaBindings) -> CalculationReport {
        if !self.options.reuse_cache {
            self.cache.clear();
        }

        let mut pass = Pass::default();
        debug!("recalculating {} formula bindings", bindings.len());

        // Phase 1: parse every formula, one graph node per parsed formula
        for (cell, text) in bindings.iter() {
            if text.trim().is_empty() {
                continue;
            }
            pass.report.stats.formula_count += 1;

            match table.cell(cell) {
                None => {
                    pass.fail(cell, Error::CellNotFound(cell).into());
                    continue;
                }
                Some(target) if target.is_sub_table() => {
                    pass.fail(
                        cell,
                        FormulaError::Resolution(format!("cell {} holds a sub-table, not a value", cell)),
                    );
                    continue;
                }
                Some(_) => {}
            }

            match self.cache.get_or_parse(text, registry()) {
                Ok(parsed) => {
                    let node = pass.graph.add_node(cell);
                    pass.formulas.insert(node, parsed);
                }
                Err(err) => pass.fail(cell, err),
            }
        }

        // Phase 2: link formulas to the formulas they read
        pass.link(table);

        // Phase 3: order and evaluate
        pass.graph.compute_depths();
        let order = schedule::order(&pass.graph, &pass.excluded, self.options.schedule);
        for node in order {
            pass.evaluate(table, node);
        }

        pass.report.stats.errors = pass.report.invalid.len();
        debug!(
            "recalculated {} of {} formulas, {} invalid",
            pass.report.stats.cells_calculated,
            pass.report.stats.formula_count,
            pass.report.stats.errors
        );
        pass.report
    }
}

/// State of a single recompute pass
#[derive(Default)]
struct Pass {
    graph: DependencyGraph,
    formulas: AHashMap<NodeId, Arc<ParsedFormula>>,
    excluded: AHashSet<NodeId>,
    report: CalculationReport,
}

impl Pass {
    fn fail(&mut self, cell: CellId, err: FormulaError) {
        warn!("cell {} is invalid: {}", cell, err);
        self.report.invalid.insert(cell, err);
    }

    /// Add an edge for every reference that lands on another formula cell,
    /// then leave out each formula that would read itself along with
    /// everything that depends on it
    fn link(&mut self, table: &Table) {
        let mut circular = Vec::new();

        for node in self.graph.ids().collect::<Vec<_>>() {
            let Some(parsed) = self.formulas.get(&node).cloned() else {
                continue;
            };

            'references: for reference in parsed.references() {
                // unresolvable references surface when the formula is evaluated
                let Ok(cells) = resolve_reference(&reference, table) else {
                    continue;
                };
                for cell in cells {
                    let Some(parent) = self.graph.node_for(cell.id()) else {
                        continue;
                    };
                    if let Err(err) = self.graph.add_parent(node, parent) {
                        circular.push(err);
                        break 'references;
                    }
                }
            }
        }

        for err in circular {
            for node in self.graph.dependents_closure(err.child) {
                if self.excluded.insert(node) {
                    let cell = self.graph.node(node).cell;
                    let diagnostic = if node == err.child {
                        FormulaError::CircularDependency(err.to_string())
                    } else {
                        FormulaError::CircularDependency(format!(
                            "cell {} depends on circular cell {}",
                            cell, err.child_cell
                        ))
                    };
                    self.fail(cell, diagnostic);
                }
            }
        }
        self.report.stats.circular_references = self.excluded.len();
    }

    /// Evaluate one node and store its result, or record why it failed
    fn evaluate(&mut self, table: &mut Table, node: NodeId) {
        let cell = self.graph.node(node).cell;
        let Some(parsed) = self.formulas.get(&node) else {
            return;
        };
        let Some(value_type) = table.cell(cell).map(|c| c.value_type()) else {
            self.fail(cell, Error::CellNotFound(cell).into());
            return;
        };

        let outcome = {
            let ctx = EvaluationContext::new(table, cell);
            evaluate_formula(parsed, &ctx).and_then(|value| coerce(value, value_type))
        };

        match outcome {
            Ok(value) => {
                trace!("cell {} = {}", cell, value);
                if let Some(target) = table.cell_mut(cell) {
                    target.set_value(value);
                }
                self.report.invalid.remove(&cell);
                self.report.stats.cells_calculated += 1;
            }
            Err(err) => self.fail(cell, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CellValue, ErrorKind, ValueType};
    use pretty_assertions::assert_eq;

    fn id(table: &Table, column: u32, row: u32) -> CellId {
        table.cell_at(column, row).unwrap().id()
    }

    fn value(table: &Table, column: u32, row: u32) -> Option<&CellValue> {
        table.cell_at(column, row).unwrap().value()
    }

    #[test]
    fn test_results_are_coerced_to_declared_type() {
        let mut table = Table::new(3, 1);
        table.set_value_type(1, 1, ValueType::Text).unwrap();
        table.set_value_type(2, 1, ValueType::Number).unwrap();

        let mut bindings = FormulaBindings::new();
        bindings.set(id(&table, 1, 1), "=2*21");
        bindings.set(id(&table, 2, 1), "=\"abc\"");

        let report = table.recalculate(&bindings);
        assert_eq!(value(&table, 1, 1), Some(&CellValue::Text("42".into())));
        assert_eq!(
            report.error(id(&table, 2, 1)).map(FormulaError::kind),
            Some(ErrorKind::TypeCoercion)
        );
    }

    #[test]
    fn test_parse_failure_keeps_previous_value() {
        let mut table = Table::new(2, 1);
        table.set_value(1, 1, 7.0).unwrap();
        let mut bindings = FormulaBindings::new();
        bindings.set(id(&table, 1, 1), "=1+");
        bindings.set(id(&table, 2, 1), "=A1*2");

        let report = table.recalculate(&bindings);
        assert_eq!(value(&table, 1, 1), Some(&CellValue::Number(7.0)));
        assert_eq!(value(&table, 2, 1), Some(&CellValue::Number(14.0)));
        assert_eq!(report.stats.formula_count, 2);
        assert_eq!(report.stats.errors, 1);
    }

    #[test]
    fn test_calculator_reuses_parses_across_passes() {
        let mut table = Table::new(2, 2);
        let mut bindings = FormulaBindings::new();
        bindings.set(id(&table, 1, 1), "=1+1");
        bindings.set(id(&table, 2, 2), "=1+1");

        let mut calculator = Calculator::default();
        calculator.recalculate(&mut table, &bindings);
        calculator.recalculate(&mut table, &bindings);
        assert_eq!(calculator.cache().len(), 1);
        assert_eq!(calculator.cache().misses(), 1);
        assert_eq!(calculator.cache().hits(), 3);

        let mut fresh = Calculator::new(CalculationOptions {
            reuse_cache: false,
            ..CalculationOptions::default()
        });
        fresh.recalculate(&mut table, &bindings);
        fresh.recalculate(&mut table, &bindings);
        assert_eq!(fresh.cache().misses(), 2);
    }

    #[test]
    fn test_empty_bindings_are_skipped() {
        let mut table = Table::new(1, 1);
        let mut bindings = FormulaBindings::new();
        bindings.set(id(&table, 1, 1), "  ");

        let report = table.recalculate(&bindings);
        assert_eq!(report, CalculationReport::default());
    }

    #[test]
    fn test_binding_for_foreign_cell_is_not_found() {
        let other = Table::new(1, 1);
        let foreign = other.cell_at(1, 1).unwrap().id();
        let mut table = Table::new(1, 1);
        let mut bindings = FormulaBindings::new();
        bindings.set(foreign, "=1+1");
        bindings.set(id(&table, 1, 1), "=2+2");

        let report = table.recalculate(&bindings);
        let err = report.error(foreign).unwrap();
        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert!(err.to_string().contains("not found"));
        assert_eq!(report.stats.cells_calculated, 1);
        assert_eq!(value(&table, 1, 1), Some(&CellValue::Number(4.0)));
    }
}
