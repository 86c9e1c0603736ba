use serde_json::Value;
use std::io;

use super::{as_grid, flatten, format_value, result_of};

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let _ = write_csv(stdout.lock(), value);
}

/// Grids are written as a matrix. Objects are written as field,value pairs
/// followed by each row set they carry (projection, amortization periods),
/// every row set preceded by a record holding its name.
fn write_csv<W: io::Write>(out: W, value: &Value) -> csv::Result<()> {
    // Sections differ in width.
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(out);

    let result = result_of(value);
    if let Some(grid) = as_grid(result) {
        let mut header = vec![String::new()];
        header.extend(grid.cols.iter().cloned());
        wtr.write_record(&header)?;
        for (label, row) in grid.rows.iter().zip(grid.data) {
            let mut record = vec![label.clone()];
            if let Value::Array(cells) = row {
                record.extend(cells.iter().map(format_value));
            }
            wtr.write_record(&record)?;
        }
    } else {
        match result {
            Value::Object(map) => {
                let (scalars, tables) = flatten(map);
                if !scalars.is_empty() {
                    wtr.write_record(["field", "value"])?;
                    for (key, val) in scalars {
                        wtr.write_record([key.as_str(), &format_value(val)])?;
                    }
                }
                for (name, rows) in tables {
                    wtr.write_record([name.as_str()])?;
                    write_array_csv(&mut wtr, rows)?;
                }
            }
            Value::Array(arr) => write_array_csv(&mut wtr, arr)?,
            _ => wtr.write_record([&format_value(result)])?,
        }
    }

    wtr.flush()?;
    Ok(())
}

fn write_array_csv<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) -> csv::Result<()> {
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        wtr.write_record(&headers)?;

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_value).unwrap_or_default())
                    .collect();
                wtr.write_record(&row)?;
            }
        }
    } else {
        for item in arr {
            wtr.write_record([&format_value(item)])?;
        }
    }
    Ok(())
}
