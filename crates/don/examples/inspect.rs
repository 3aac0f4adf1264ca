//! Simple decoder to inspect DON files.
//!
//! Decodes without a schema and prints a structural summary followed by the
//! JSON rendering of the root value.

use std::fs;

use don::canonical::ContentHash;
use don::codec::{decode_dynamic, peek_header};
use don::json::to_json_dynamic;
use don::Value;

fn describe(value: &Value, indent: usize, out: &mut Vec<String>) {
    let pad = "  ".repeat(indent);
    match value {
        Value::Object(object) => {
            out.push(format!("{}object ({} keys)", pad, object.len()));
            for (key, child) in object.iter() {
                out.push(format!("{}  {}:", pad, key));
                describe(child, indent + 2, out);
            }
        }
        Value::Array(items) => {
            out.push(format!("{}array ({} items)", pad, items.len()));
            if let Some(first) = items.first() {
                describe(first, indent + 1, out);
            }
        }
        Value::Frame(frame) => {
            out.push(format!(
                "{}frame ({} rows x {} columns)",
                pad,
                frame.row_count(),
                frame.column_count()
            ));
            for column in frame.columns() {
                let first = column.values().iter().find(|v| !v.is_null());
                let nulls = column.values().iter().filter(|v| v.is_null()).count();
                out.push(format!(
                    "{}  {}: {} ({} nulls)",
                    pad,
                    column.name(),
                    first.map(Value::type_name).unwrap_or("null"),
                    nulls
                ));
            }
        }
        scalar => out.push(format!("{}{}", pad, scalar)),
    }
}

fn main() {
    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: inspect <file.don>");
        std::process::exit(2);
    };

    println!("Reading: {}", path);

    let data = fs::read(&path).expect("Failed to read file");
    println!("File size: {} bytes", data.len());

    let header = peek_header(&data).expect("Failed to read header");
    println!("\n=== Header ===");
    println!("Version: {}", header.version);
    println!("Deterministic: {}", header.deterministic);
    if header.deterministic {
        println!("Content hash: {}", ContentHash::of_bytes(&data));
    }

    let value = match decode_dynamic(&data) {
        Ok(value) => value,
        Err(err) => {
            eprintln!("Failed to decode: {} ({})", err, err.code().code());
            std::process::exit(1);
        }
    };

    println!("\n=== Structure ===");
    let mut lines = Vec::new();
    describe(&value, 0, &mut lines);
    for line in lines {
        println!("{}", line);
    }

    println!("\n=== JSON ===");
    let json = to_json_dynamic(&value);
    println!(
        "{}",
        serde_json::to_string_pretty(&json).expect("Failed to render JSON")
    );
}
