use serde_json::Value;

use super::{as_grid, format_value, result_of};

/// Headline figure per result shape, in order of priority.
const PRIORITY_PATHS: [&str; 6] = [
    "exit.irr",
    "exit.moic",
    "basis.purchase_price",
    "monthly_payment",
    "deal.enterprise_value",
    "inputs.target_ebitda",
];

/// Print just the key answer value from the output.
///
/// Grids print their base-case cell when the unperturbed inputs lie on
/// both axes, otherwise the whole matrix as JSON.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);

    if let Some(grid) = as_grid(result) {
        let base = result
            .get("base_case")
            .and_then(Value::as_array)
            .and_then(|ij| Some((ij.first()?.as_u64()?, ij.get(1)?.as_u64()?)));
        match base.and_then(|(i, j)| grid.data.get(i as usize)?.get(j as usize)) {
            Some(cell) => println!("{}", format_minimal(cell)),
            None => println!("{}", format_minimal(&Value::Array(grid.data.to_vec()))),
        }
        return;
    }

    for path in PRIORITY_PATHS {
        if let Some(val) = lookup(result, path) {
            if !val.is_null() {
                println!("{}", format_minimal(val));
                return;
            }
        }
    }

    if let Value::Object(map) = result {
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result));
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |v, key| v.get(key))
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Array(_) => serde_json::to_string(value).unwrap_or_default(),
        other => format_value(other),
    }
}
