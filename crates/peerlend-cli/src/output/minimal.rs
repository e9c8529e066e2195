use serde_json::Value;

use crate::output::{cell, Sections};

/// Headline field of each command, most specific first.
const HEADLINE_KEYS: &[&str] = &[
    "emi_rounded",
    "outstanding",
    "total_outstanding",
    "remaining_payments",
    "emi",
    "status",
    "id",
];

/// Print one value: the command's headline figure, or the row count for
/// row-shaped results such as a payment history.
pub fn print_minimal(value: &Value) {
    let sections = Sections::of(value);

    for key in HEADLINE_KEYS {
        let hit = sections
            .fields
            .iter()
            .find(|(k, v)| k == key && !v.is_null());
        if let Some((_, v)) = hit {
            println!("{}", cell(v));
            return;
        }
    }

    match (sections.fields.first(), sections.tables.first()) {
        (Some((key, val)), _) => println!("{}: {}", key, cell(val)),
        (None, Some((_, rows))) => println!("{}", rows.len()),
        (None, None) => println!(),
    }
}
