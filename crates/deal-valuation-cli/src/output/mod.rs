pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("JSON serialization error: {}", e),
    }
}

/// The `result` of an envelope, or the value itself.
pub(crate) fn result_of(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// A sensitivity table: `rows`, `cols` and a `data` matrix.
pub(crate) struct Grid<'a> {
    pub rows: Vec<String>,
    pub cols: Vec<String>,
    pub data: &'a [Value],
}

pub(crate) fn as_grid(value: &Value) -> Option<Grid<'_>> {
    let map = value.as_object()?;
    let labels = |key: &str| -> Option<Vec<String>> {
        Some(map.get(key)?.as_array()?.iter().map(format_value).collect())
    };
    Some(Grid {
        rows: labels("rows")?,
        cols: labels("cols")?,
        data: map.get("data")?.as_array()?,
    })
}

/// Scalar fields of a nested object as `(dotted.key, value)` pairs, and the
/// arrays of objects found along the way as `(key, rows)`.
pub(crate) fn flatten<'a>(
    map: &'a Map<String, Value>,
) -> (Vec<(String, &'a Value)>, Vec<(String, &'a [Value])>) {
    let mut scalars = Vec::new();
    let mut tables = Vec::new();
    flatten_into(None, map, &mut scalars, &mut tables);
    (scalars, tables)
}

fn flatten_into<'a>(
    prefix: Option<&str>,
    map: &'a Map<String, Value>,
    scalars: &mut Vec<(String, &'a Value)>,
    tables: &mut Vec<(String, &'a [Value])>,
) {
    for (key, val) in map {
        let name = match prefix {
            Some(p) => format!("{}.{}", p, key),
            None => key.clone(),
        };
        match val {
            Value::Object(inner) => flatten_into(Some(&name), inner, scalars, tables),
            Value::Array(items) if items.first().is_some_and(Value::is_object) => {
                tables.push((name, items.as_slice()))
            }
            _ => scalars.push((name, val)),
        }
    }
}

pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
