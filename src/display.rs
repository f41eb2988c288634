//! Table rendering for records and free-form JSON responses.

use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use serde_json::Value;

use crate::api::types::Record;

/// Columns shown first, in this order, when present.
const PREFERRED_COLUMNS: &[&str] = &["id", "email", "display_name", "create_via", "created_at"];

/// Never rendered, even if a server echoes it back.
const HIDDEN_COLUMNS: &[&str] = &["password"];

/// Render a list of records as a table, or a notice when there are none.
pub fn records_table(records: &[&Record]) -> String {
    if records.is_empty() {
        return "No records found.".to_string();
    }

    let columns = column_order(records);
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        columns
            .iter()
            .map(|c| Cell::new(c).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );

    for record in records {
        let row: Vec<String> = columns
            .iter()
            .map(|column| record.get(column).map(cell_text).unwrap_or_default())
            .collect();
        table.add_row(row);
    }

    format!("{table}\n{} record(s)", records.len())
}

/// Render a single JSON object as a two-column field/value table. Anything
/// that is not an object is pretty-printed instead.
pub fn value_table(value: &Value) -> String {
    let Some(obj) = value.as_object() else {
        return pretty(value);
    };

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("field").add_attribute(Attribute::Bold),
        Cell::new("value").add_attribute(Attribute::Bold),
    ]);
    for (key, val) in obj {
        if HIDDEN_COLUMNS.contains(&key.as_str()) {
            continue;
        }
        table.add_row(vec![key.clone(), cell_text(val)]);
    }
    table.to_string()
}

/// Pretty JSON, falling back to compact form.
pub fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn column_order(records: &[&Record]) -> Vec<String> {
    let mut columns: Vec<String> = PREFERRED_COLUMNS
        .iter()
        .filter(|c| records.iter().any(|r| r.contains_key(**c)))
        .map(|c| c.to_string())
        .collect();

    for record in records {
        for key in record.keys() {
            if !columns.contains(key) && !HIDDEN_COLUMNS.contains(&key.as_str()) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
