use serde_json::Value;

use crate::cmd::{open_registry, SchemaArgs};
use crate::exit::{registry_error, CliResult, SUCCESS};
use crate::output::{print_json, print_value, OutputFormat};

pub fn run(args: SchemaArgs, format: OutputFormat) -> CliResult<i32> {
    let registry = open_registry(&args.dir, false)?;
    let examples = registry
        .examples(&args.name)
        .map_err(|err| registry_error("reading examples", err))?;

    match format {
        OutputFormat::Json => print_json(&Value::Array(examples)),
        // One document per line so the output can be piped back into `validate`.
        OutputFormat::Raw => {
            for example in &examples {
                print_json(example);
            }
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            for (index, example) in examples.iter().enumerate() {
                println!("# example {index}");
                print_value(example, OutputFormat::Pretty);
            }
        }
    }

    Ok(SUCCESS)
}
