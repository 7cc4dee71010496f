//! Copying formulas and recomputing the copies

use nestgrid::prelude::*;
use pretty_assertions::assert_eq;

fn addr(text: &str) -> Address {
    Address::parse(text).unwrap()
}

#[test]
fn test_fill_down_running_total() {
    let mut table = Table::new(2, 4);
    for row in 1..=4 {
        table.set_value(1, row, f64::from(row)).unwrap();
    }

    let mut bindings = FormulaBindings::new();
    bindings.set(table.cell_at(2, 1).unwrap().id(), "=SUM($A$1:A1)");
    for row in 2..=4 {
        copy_formula(&table, &mut bindings, &addr("B1"), &addr(&format!("B{}", row))).unwrap();
    }
    assert_eq!(bindings.get(table.cell_at(2, 4).unwrap().id()), Some("=SUM($A$1:A4)"));

    let report = table.recalculate(&bindings);
    assert!(report.is_clean());
    let totals: Vec<_> = (1..=4)
        .map(|row| table.cell_at(2, row).unwrap().value().cloned())
        .collect();
    assert_eq!(
        totals,
        [1.0, 3.0, 6.0, 10.0].map(|n| Some(CellValue::Number(n))).to_vec()
    );
}

#[test]
fn test_copy_between_sub_tables() {
    let mut table = Table::new(2, 1);
    for column in 1..=2 {
        let mut inner = Table::new(2, 1);
        inner.set_value(1, 1, f64::from(column) * 100.0).unwrap();
        table.set_sub_table(column, 1, SubTableKind::Fields, inner).unwrap();
    }

    let mut bindings = FormulaBindings::new();
    let source = table.cell_at(1, 1).unwrap().sub_table().unwrap().cell_at(2, 1).unwrap().id();
    bindings.set(source, "=A1.A1+1");
    let copied = copy_formula(&table, &mut bindings, &addr("A1.B1"), &addr("B1.B1")).unwrap();
    assert_eq!(bindings.get(copied), Some("=B1.A1+1"));

    let report = table.recalculate(&bindings);
    assert!(report.is_clean());
    let value = |column| {
        table.cell_at(column, 1).unwrap().sub_table().unwrap().cell_at(2, 1).unwrap().value().cloned()
    };
    assert_eq!(value(1), Some(CellValue::Number(101.0)));
    assert_eq!(value(2), Some(CellValue::Number(201.0)));
}
