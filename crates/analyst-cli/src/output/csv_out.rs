use serde_json::Value;
use std::io;

use super::scalar_text;

/// Write the result as `field,value` rows. Nested objects flatten to dotted
/// paths (`base_case.price_per_share`) and arrays to indexed paths
/// (`projection.0.revenue`), so every number in the model gets one row.
pub fn print_csv(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let mut rows = Vec::new();
    flatten("", result, &mut rows);

    if let Err(e) = write_rows(&rows) {
        tracing::error!(error = %e, "failed to write CSV output");
    }
}

fn write_rows(rows: &[(String, String)]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(io::stdout().lock());
    wtr.write_record(["field", "value"])?;
    for (field, val) in rows {
        wtr.write_record([field, val])?;
    }
    wtr.flush()?;
    Ok(())
}

fn flatten(prefix: &str, value: &Value, rows: &mut Vec<(String, String)>) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        }
    };
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                flatten(&join(key), val, rows);
            }
        }
        Value::Array(items) if items.iter().any(|v| v.is_object() || v.is_array()) => {
            for (i, val) in items.iter().enumerate() {
                flatten(&join(&i.to_string()), val, rows);
            }
        }
        _ => rows.push((prefix.to_string(), scalar_text(value))),
    }
}
