use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;

use schemagate_core::ValidationError;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Print one compact JSON line.
pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_table<H, R>(header: H, rows: R)
where
    H: IntoIterator<Item = &'static str>,
    R: IntoIterator<Item = Vec<String>>,
{
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.into_iter().collect::<Vec<_>>());
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
}

/// Render a document value: strings unquoted in raw mode, indented JSON in
/// pretty and table mode.
pub fn print_value(value: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table | OutputFormat::Pretty => println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
        ),
        OutputFormat::Raw => match value {
            Value::String(text) => println!("{text}"),
            other => print_json(other),
        },
    }
}

#[derive(Serialize)]
struct ValidationOutput<'a> {
    schema_id: &'static str,
    schema: &'a str,
    version: &'a str,
    valid: bool,
    violations: &'a [ValidationError],
}

pub fn print_violations(
    schema: &str,
    version: &str,
    violations: &[ValidationError],
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => print_json(&ValidationOutput {
            schema_id: "https://schemas.3leaps.dev/schemagate/cli/v1/validation-report.schema.json",
            schema,
            version,
            valid: violations.is_empty(),
            violations,
        }),
        OutputFormat::Table => {
            if violations.is_empty() {
                println!("{schema}@{version}: valid");
                return;
            }
            print_table(
                ["INSTANCE", "KIND", "SCHEMA PATH", "DETAIL"],
                violations.iter().map(|violation| {
                    vec![
                        instance_label(violation),
                        violation.kind.to_string(),
                        violation.schema_path.to_string(),
                        violation.detail.clone(),
                    ]
                }),
            );
        }
        OutputFormat::Pretty => {
            if violations.is_empty() {
                println!("{schema}@{version}: valid");
            } else {
                println!("{schema}@{version}: {} violation(s)", violations.len());
                for violation in violations {
                    println!("  - {violation}");
                }
            }
        }
        OutputFormat::Raw => {
            println!("{}", if violations.is_empty() { "valid" } else { "invalid" });
        }
    }
}

fn instance_label(violation: &ValidationError) -> String {
    if violation.instance_path.is_root() {
        "(root)".to_string()
    } else {
        violation.instance_path.to_string()
    }
}

/// First `len` characters of a content hash, for table cells.
pub fn short_hash(hash: &str, len: usize) -> &str {
    hash.char_indices()
        .nth(len)
        .map_or(hash, |(end, _)| &hash[..end])
}
