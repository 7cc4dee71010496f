//! Formula bindings
//!
//! Formulas are not stored in cells. A table's owner keeps a separate map from
//! cell id to formula text and hands it to each recompute pass, which reads it
//! and never writes it.
//!
//! # Example
//!
//! ```text
//! bindings.set(b1, "=A1*2");
//! bindings.set(c1, "=B1+1");
//! ```

use crate::table::CellId;
use std::collections::BTreeMap;

/// Map from cell id to formula text, iterated in id order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FormulaBindings {
    formulas: BTreeMap<CellId, String>,
}

impl FormulaBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind formula text to a cell, returning the text it replaces
    pub fn set(&mut self, cell: CellId, formula: impl Into<String>) -> Option<String> {
        self.formulas.insert(cell, formula.into())
    }

    pub fn remove(&mut self, cell: CellId) -> Option<String> {
        self.formulas.remove(&cell)
    }

    pub fn get(&self, cell: CellId) -> Option<&str> {
        self.formulas.get(&cell).map(String::as_str)
    }

    pub fn contains(&self, cell: CellId) -> bool {
        self.formulas.contains_key(&cell)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellId, &str)> {
        self.formulas.iter().map(|(id, text)| (*id, text.as_str()))
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(CellId, S)> for FormulaBindings {
    fn from_iter<I: IntoIterator<Item = (CellId, S)>>(iter: I) -> Self {
        Self {
            formulas: iter.into_iter().map(|(id, f)| (id, f.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;
    use pretty_assertions::assert_eq;

    fn fixture(count: u32) -> (Table, Vec<CellId>) {
        let table = Table::new(count, 1);
        let ids = (1..=count).map(|c| table.cell_at(c, 1).unwrap().id()).collect();
        (table, ids)
    }

    #[test]
    fn test_set_replaces_and_remove_unbinds() {
        let (_table, ids) = fixture(2);
        let mut bindings = FormulaBindings::new();
        assert!(bindings.is_empty());

        assert_eq!(bindings.set(ids[0], "=1"), None);
        assert_eq!(bindings.set(ids[0], String::from("=2")), Some("=1".to_string()));
        assert_eq!(bindings.get(ids[0]), Some("=2"));
        assert!(bindings.contains(ids[0]));
        assert!(!bindings.contains(ids[1]));
        assert_eq!(bindings.get(ids[1]), None);
        assert_eq!(bindings.len(), 1);

        assert_eq!(bindings.remove(ids[0]), Some("=2".to_string()));
        assert_eq!(bindings.remove(ids[0]), None);
        assert!(bindings.is_empty());
    }

    #[test]
    fn test_iteration_is_in_id_order() {
        let (_table, mut ids) = fixture(4);
        let bindings: FormulaBindings = ids
            .iter()
            .rev()
            .enumerate()
            .map(|(i, id)| (*id, format!("={}", i)))
            .collect();

        ids.sort();
        let seen: Vec<CellId> = bindings.iter().map(|(id, _)| id).collect();
        assert_eq!(seen, ids);
        assert_eq!(bindings.len(), 4);
    }
}
