pub mod csv_out;
pub mod minimal;
pub mod table;

use serde_json::{Map, Value};

use crate::OutputFormat;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("JSON serialization error: {}", e),
        },
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// A command result with the envelope peeled off.
///
/// Scalar fields go in `fields`; arrays of objects (schedule periods, ledger
/// rows) are pulled out into `tables` so formatters can print them as rows.
pub(crate) struct Sections<'a> {
    pub fields: Vec<(&'a str, &'a Value)>,
    pub tables: Vec<(&'a str, &'a [Value])>,
    pub warnings: Vec<&'a str>,
    pub methodology: Option<&'a str>,
}

impl<'a> Sections<'a> {
    pub fn of(value: &'a Value) -> Self {
        let mut sections = Sections {
            fields: Vec::new(),
            tables: Vec::new(),
            warnings: Vec::new(),
            methodology: None,
        };

        match value {
            Value::Object(map) => match map.get("result") {
                Some(result) => {
                    sections.methodology = map.get("methodology").and_then(Value::as_str);
                    if let Some(Value::Array(ws)) = map.get("warnings") {
                        sections.warnings = ws.iter().filter_map(Value::as_str).collect();
                    }
                    match result {
                        Value::Object(inner) => sections.split(inner),
                        Value::Array(rows) => sections.tables.push(("result", rows)),
                        other => sections.fields.push(("result", other)),
                    }
                }
                None => sections.split(map),
            },
            Value::Array(rows) => sections.tables.push(("rows", rows)),
            other => sections.fields.push(("value", other)),
        }
        sections
    }

    fn split(&mut self, map: &'a Map<String, Value>) {
        for (key, val) in map {
            match val {
                Value::Array(rows) if rows.first().map_or(false, Value::is_object) => {
                    self.tables.push((key.as_str(), rows.as_slice()))
                }
                _ => self.fields.push((key.as_str(), val)),
            }
        }
    }
}

/// Render a leaf value as plain text. Decimals already arrive as strings.
pub(crate) fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(cell).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Column names of a row set, in first-seen order across all rows.
pub(crate) fn columns(rows: &[Value]) -> Vec<&str> {
    let mut cols: Vec<&str> = Vec::new();
    for row in rows {
        if let Value::Object(map) = row {
            for key in map.keys() {
                if !cols.contains(&key.as_str()) {
                    cols.push(key.as_str());
                }
            }
        }
    }
    cols
}
