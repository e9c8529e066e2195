use std::io;

use serde_json::Value;

use crate::output::{cell, columns, Sections};

/// Write a command result as CSV.
///
/// A result that carries a row set (schedule, ledger history) is written as
/// that row set with a header line; anything else becomes `field,value` pairs.
pub fn print_csv(value: &Value) {
    let sections = Sections::of(value);
    let mut wtr = csv::Writer::from_writer(io::stdout().lock());

    let written = match sections.tables.first() {
        Some((_, rows)) => write_rows(&mut wtr, rows),
        None => write_fields(&mut wtr, &sections.fields),
    };
    if let Err(e) = written.and_then(|_| wtr.flush().map_err(csv::Error::from)) {
        eprintln!("CSV write error: {}", e);
    }
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) -> csv::Result<()> {
    let cols = columns(rows);
    wtr.write_record(&cols)?;
    for row in rows {
        wtr.write_record(cols.iter().map(|c| row.get(*c).map(cell).unwrap_or_default()))?;
    }
    Ok(())
}

fn write_fields<W: io::Write>(
    wtr: &mut csv::Writer<W>,
    fields: &[(&str, &Value)],
) -> csv::Result<()> {
    wtr.write_record(["field", "value"])?;
    for (key, val) in fields {
        wtr.write_record([key.to_string(), cell(val)])?;
    }
    Ok(())
}
