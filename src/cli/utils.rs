use std::io::Read;

use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(Value::Object(extra)), Some(target)) = (data, response.as_object_mut()) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Print an API payload; text mode falls back to pretty JSON for nested values
pub fn output_value(output_format: &OutputFormat, value: &Value) -> anyhow::Result<()> {
    match (output_format, value) {
        (OutputFormat::Text, Value::Object(map)) => {
            for (key, field) in map {
                match field {
                    Value::Object(_) | Value::Array(_) => println!("{}: {}", key, field),
                    Value::String(s) => println!("{}: {}", key, s),
                    other => println!("{}: {}", key, other),
                }
            }
        }
        _ => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

/// Print a list of records as `id  label` lines, or raw JSON
pub fn output_records(output_format: &OutputFormat, collection: &str, records: &Value) -> anyhow::Result<()> {
    let rows = records.as_array().map(Vec::as_slice).unwrap_or_default();
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ collection: records }))?);
        }
        OutputFormat::Text if rows.is_empty() => {
            println!("No {} found", collection);
        }
        OutputFormat::Text => {
            println!("{:<38} {}", "ID", "SUMMARY");
            println!("{}", "-".repeat(70));
            for row in rows {
                let id = row.get("id").and_then(Value::as_str).unwrap_or("-");
                println!("{:<38} {}", id, record_label(row));
            }
        }
    }
    Ok(())
}

/// Human label for a record: its first present descriptive field
pub fn record_label(record: &Value) -> String {
    const LABEL_FIELDS: [&str; 7] = ["name", "title", "subject", "suite_number", "floor_number", "status", "email"];
    LABEL_FIELDS
        .iter()
        .find_map(|field| match record.get(*field) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

/// Reads a JSON object from stdin
pub fn read_json_stdin() -> anyhow::Result<Value> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    parse_json_object(&input)
}

pub fn parse_json_object(input: &str) -> anyhow::Result<Value> {
    let value: Value = serde_json::from_str(input.trim())?;
    if !value.is_object() {
        anyhow::bail!("Expected a JSON object");
    }
    Ok(value)
}

/// Prompts on stderr and reads one line from stdin when `provided` is empty
pub fn resolve_password(provided: Option<String>) -> anyhow::Result<String> {
    if let Some(password) = provided {
        return Ok(password);
    }
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("Password is required");
    }
    Ok(password)
}
