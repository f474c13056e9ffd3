use serde::Serialize;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

#[derive(Debug, Serialize)]
struct BuildInfo {
    schema_id: &'static str,
    version: &'static str,
    target: &'static str,
    profile: &'static str,
    features: Vec<&'static str>,
    /// How `schemagate watch` notices schema edits.
    reload_trigger: &'static str,
}

impl BuildInfo {
    fn current() -> Self {
        Self {
            schema_id: "https://schemas.3leaps.dev/schemagate/cli/v1/build-info.schema.json",
            version: env!("CARGO_PKG_VERSION"),
            target: env!("SCHEMAGATE_BUILD_TARGET"),
            profile: env!("SCHEMAGATE_BUILD_PROFILE"),
            features: build_features(),
            reload_trigger: reload_trigger(),
        }
    }
}

/// Cargo features this binary was compiled with.
pub(crate) fn build_features() -> Vec<&'static str> {
    env!("SCHEMAGATE_BUILD_FEATURES")
        .split(',')
        .filter(|feature| !feature.is_empty())
        .collect()
}

pub(crate) fn reload_trigger() -> &'static str {
    if cfg!(feature = "watch") {
        "filesystem events"
    } else {
        "polling"
    }
}

pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    if !args.extended {
        println!("schemagate {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    let info = BuildInfo::current();
    match format {
        OutputFormat::Json => print_json(&info),
        OutputFormat::Table => print_table(
            ["Field", "Value"],
            [
                vec!["version".to_string(), info.version.to_string()],
                vec!["target".to_string(), info.target.to_string()],
                vec!["profile".to_string(), info.profile.to_string()],
                vec!["features".to_string(), info.features.join(", ")],
                vec!["reload".to_string(), info.reload_trigger.to_string()],
            ],
        ),
        OutputFormat::Pretty | OutputFormat::Raw => {
            println!("schemagate {} ({}, {})", info.version, info.target, info.profile);
            println!("features: {}", info.features.join(", "));
            println!("reload: {}", info.reload_trigger);
        }
    }
    Ok(SUCCESS)
}
