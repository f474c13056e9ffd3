use serde::Serialize;

use schemagate_registry::Snapshot;

use crate::cmd::{open_registry, ListArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, print_table, short_hash, OutputFormat};

#[derive(Debug, Serialize)]
struct SchemaRow {
    name: String,
    id: String,
    version: String,
    properties: usize,
    content_hash: String,
}

#[derive(Debug, Serialize)]
struct ListOutput {
    schema_id: &'static str,
    generation: u64,
    schemas: Vec<SchemaRow>,
}

pub fn run(args: ListArgs, format: OutputFormat) -> CliResult<i32> {
    let registry = open_registry(&args.dir, false)?;
    let output = list_output(&registry.snapshot());

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table => print_table(
            ["NAME", "VERSION", "PROPERTIES", "HASH"],
            output.schemas.iter().map(|row| {
                vec![
                    row.name.clone(),
                    row.version.clone(),
                    row.properties.to_string(),
                    short_hash(&row.content_hash, 12).to_string(),
                ]
            }),
        ),
        OutputFormat::Pretty => {
            for row in &output.schemas {
                println!(
                    "{:<24} {:<10} {:>3} properties  {}",
                    row.name,
                    row.version,
                    row.properties,
                    short_hash(&row.content_hash, 12)
                );
            }
        }
        OutputFormat::Raw => {
            for row in &output.schemas {
                println!("{}", row.name);
            }
        }
    }

    Ok(SUCCESS)
}

fn list_output(snapshot: &Snapshot) -> ListOutput {
    ListOutput {
        schema_id: "https://schemas.3leaps.dev/schemagate/cli/v1/schema-list.schema.json",
        generation: snapshot.generation(),
        schemas: snapshot
            .iter()
            .map(|(name, schema)| SchemaRow {
                name: name.to_string(),
                id: schema.id().to_string(),
                version: schema.version().to_string(),
                properties: schema.properties().len(),
                content_hash: schema.content_hash().to_string(),
            })
            .collect(),
    }
}
