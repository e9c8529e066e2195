use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::output::{cell, columns, Sections};

/// Render a command result as terminal tables: one field/value table, then
/// one table per row set (schedule periods, ledger entries).
pub fn print_table(value: &Value) {
    let sections = Sections::of(value);

    if !sections.fields.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in &sections.fields {
            builder.push_record([key.to_string(), cell(val)]);
        }
        println!("{}", builder.build().with(Style::rounded()));
    }

    for (name, rows) in &sections.tables {
        if !sections.fields.is_empty() {
            println!("\n{}:", name);
        }
        print_rows(rows);
    }

    if !sections.warnings.is_empty() {
        println!("\nWarnings:");
        for w in &sections.warnings {
            println!("  - {}", w);
        }
    }
    if let Some(m) = sections.methodology {
        println!("\nMethodology: {}", m);
    }
}

fn print_rows(rows: &[Value]) {
    let cols = columns(rows);
    if cols.is_empty() {
        println!("(no rows)");
        return;
    }

    let mut builder = Builder::default();
    builder.push_record(cols.iter().copied());
    for row in rows {
        builder.push_record(cols.iter().map(|c| row.get(*c).map(cell).unwrap_or_default()));
    }
    println!("{}", builder.build().with(Style::rounded()));
}
