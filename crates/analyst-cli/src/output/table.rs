use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::scalar_text;

/// Render the envelope as tables: the scalar fields of `result` first, then one
/// table per nested section (cases, projections, schedules, summaries), then
/// warnings and methodology.
pub fn print_table(value: &Value) {
    let Some(envelope) = value.as_object() else {
        println!("{}", scalar_text(value));
        return;
    };
    match envelope.get("result") {
        Some(Value::Object(result)) => print_sections(None, result),
        Some(other) => println!("{}", scalar_text(other)),
        None => print_sections(None, envelope),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {w}");
            }
        }
    }
    if let Some(Value::String(methodology)) = envelope.get("methodology") {
        println!("\nMethodology: {methodology}");
    }
    if let Some(us) = value.pointer("/metadata/computation_time_us") {
        println!("Computed in {} µs", scalar_text(us));
    }
}

fn print_sections(title: Option<&str>, map: &Map<String, Value>) {
    let scalars: Vec<(&String, &Value)> = map
        .iter()
        .filter(|(_, v)| !v.is_object() && !is_record_list(v))
        .collect();
    if !scalars.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in scalars {
            builder.push_record([key.clone(), scalar_text(val)]);
        }
        print_titled(title, builder);
    }

    for (key, val) in map {
        let path = match title {
            Some(parent) => format!("{parent}.{key}"),
            None => key.clone(),
        };
        match val {
            Value::Object(child) => print_sections(Some(&path), child),
            Value::Array(rows) if is_record_list(val) => print_records(&path, rows),
            _ => {}
        }
    }
}

/// Arrays of objects (projection years, debt periods, trials) become row tables.
fn is_record_list(value: &Value) -> bool {
    matches!(value, Value::Array(rows) if rows.first().is_some_and(Value::is_object))
}

fn print_records(title: &str, rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        return;
    };
    let headers: Vec<String> = first
        .iter()
        .filter(|(_, v)| !v.is_object() && !v.is_array())
        .map(|(k, _)| k.clone())
        .collect();
    let mut builder = Builder::default();
    builder.push_record(headers.clone());
    for row in rows.iter().filter_map(Value::as_object) {
        builder.push_record(
            headers
                .iter()
                .map(|h| row.get(h).map(scalar_text).unwrap_or_default()),
        );
    }
    print_titled(Some(title), builder);
}

fn print_titled(title: Option<&str>, builder: Builder) {
    if let Some(title) = title {
        println!("\n{title}");
    }
    println!("{}", Table::from(builder));
}
