use serde::Serialize;

use crate::cmd::{open_registry, SchemaArgs};
use crate::exit::{registry_error, CliResult, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Debug, Serialize)]
struct PropsOutput<'a> {
    schema: &'a str,
    properties: Vec<String>,
    required: Vec<String>,
}

pub fn run(args: SchemaArgs, format: OutputFormat) -> CliResult<i32> {
    let registry = open_registry(&args.dir, false)?;
    let properties = registry
        .properties(&args.name)
        .map_err(|err| registry_error("reading properties", err))?;
    let required: Vec<String> = registry
        .get(&args.name)
        .map(|schema| schema.required_paths().map(str::to_string).collect())
        .unwrap_or_default();

    let output = PropsOutput {
        schema: &args.name,
        properties,
        required,
    };

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table => print_table(
            ["PROPERTY", "REQUIRED"],
            output.properties.iter().map(|property| {
                let required = output.required.iter().any(|path| path == property);
                vec![property.clone(), if required { "yes" } else { "no" }.to_string()]
            }),
        ),
        OutputFormat::Pretty | OutputFormat::Raw => {
            for property in &output.properties {
                println!("{property}");
            }
        }
    }

    Ok(SUCCESS)
}
