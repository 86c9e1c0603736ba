use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{as_grid, flatten, format_value, Grid};

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_object(map);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    if let Some(grid) = as_grid(result) {
        print_grid(&grid);
    } else if let Value::Object(res_map) = result {
        print_object(res_map);
    } else {
        println!("{}", cell(result));
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

/// Scalars as a Field/Value table, then one table per nested row set
/// (projection years, amortization periods).
fn print_object(map: &Map<String, Value>) {
    let (scalars, tables) = flatten(map);

    if !scalars.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in &scalars {
            builder.push_record([key.clone(), cell(val)]);
        }
        println!("{}", Table::from(builder));
    }

    for (name, rows) in tables {
        println!("\n{}:", name);
        print_array_table(rows);
    }
}

fn print_grid(grid: &Grid<'_>) {
    let mut builder = Builder::default();
    let mut header = vec![String::new()];
    header.extend(grid.cols.iter().cloned());
    builder.push_record(header);

    for (label, row) in grid.rows.iter().zip(grid.data) {
        let mut record = vec![label.clone()];
        if let Value::Array(cells) = row {
            record.extend(cells.iter().map(cell));
        }
        builder.push_record(record);
    }

    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(headers.clone());

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(cell).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", cell(item));
        }
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => "n/a".to_string(),
        other => format_value(other),
    }
}
