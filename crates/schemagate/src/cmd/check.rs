use serde::Serialize;

use schemagate_registry::LoadReport;

use crate::cmd::{open_registry, CheckArgs};
use crate::exit::{CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Debug, Serialize)]
struct FailureOutput {
    name: String,
    origin: String,
    error: String,
}

#[derive(Debug, Serialize)]
struct CheckOutput {
    schema_id: &'static str,
    source: String,
    strict: bool,
    loaded: Vec<String>,
    failures: Vec<FailureOutput>,
    overall: &'static str,
}

pub fn run(args: CheckArgs, format: OutputFormat) -> CliResult<i32> {
    let registry = open_registry(&args.dir, args.strict)?;
    let output = check_output(registry.source_label(), args.strict, registry.report());
    let clean = output.failures.is_empty();

    print_check(&output, format);

    if clean {
        Ok(SUCCESS)
    } else {
        Ok(DATA_INVALID)
    }
}

fn check_output(source: &str, strict: bool, report: LoadReport) -> CheckOutput {
    let overall = if report.is_clean() { "pass" } else { "fail" };
    CheckOutput {
        schema_id: "https://schemas.3leaps.dev/schemagate/cli/v1/check-report.schema.json",
        source: source.to_string(),
        strict,
        loaded: report.loaded,
        failures: report
            .failures
            .into_iter()
            .map(|failure| FailureOutput {
                name: failure.name,
                origin: failure.origin,
                error: failure.error.to_string(),
            })
            .collect(),
        overall,
    }
}

fn print_check(output: &CheckOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(output),
        OutputFormat::Table => {
            let loaded = output
                .loaded
                .iter()
                .map(|name| vec![name.clone(), "loaded".to_string(), String::new()]);
            let failed = output.failures.iter().map(|failure| {
                vec![
                    failure.name.clone(),
                    "failed".to_string(),
                    failure.error.clone(),
                ]
            });
            print_table(["SCHEMA", "STATUS", "DETAIL"], loaded.chain(failed));
        }
        OutputFormat::Pretty => {
            println!("schemagate check {}\n", output.source);
            for name in &output.loaded {
                println!("  [  OK] {name}");
            }
            for failure in &output.failures {
                println!("  [FAIL] {:<22} {}", failure.name, failure.error);
            }
            println!(
                "\n  Result: {} loaded, {} failed",
                output.loaded.len(),
                output.failures.len()
            );
        }
        OutputFormat::Raw => println!("{}", output.overall),
    }
}
