use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use schemagate_registry::Registry;

use crate::cmd::version::build_features;
use crate::cmd::{DoctorArgs, SCHEMA_DIR_ENV};
use crate::exit::{CliResult, FAILURE, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat};

const SELF_TEST_NAME: &str = "doctor-probe";

const SELF_TEST_SCHEMA: &str = r#"{
    "$id": "doctor-probe",
    "type": "object",
    "properties": {
        "name": { "type": "string", "minLength": 1 },
        "tags": { "type": "array", "items": { "type": "string" } }
    },
    "required": ["name"],
    "examples": [{ "name": "probe", "tags": ["a"] }]
}"#;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Pass,
    Warn,
    Fail,
    Skip,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Warn => "WARN",
            Status::Fail => "FAIL",
            Status::Skip => "SKIP",
        }
    }
}

#[derive(Debug, Serialize)]
struct Check {
    name: &'static str,
    status: Status,
    detail: String,
}

impl Check {
    fn new(name: &'static str, status: Status, detail: impl Into<String>) -> Self {
        Self {
            name,
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    schema_id: &'static str,
    features: Vec<&'static str>,
    checks: Vec<Check>,
    overall: Status,
}

impl DoctorReport {
    fn new(checks: Vec<Check>) -> Self {
        let overall = if checks.iter().any(|check| check.status == Status::Fail) {
            Status::Fail
        } else {
            Status::Pass
        };
        Self {
            schema_id: "https://schemas.3leaps.dev/schemagate/cli/v1/doctor-report.schema.json",
            features: build_features(),
            checks,
            overall,
        }
    }
}

pub fn run(_args: DoctorArgs, format: OutputFormat) -> CliResult<i32> {
    let report = DoctorReport::new(vec![engine_check(), reload_check(), schema_dir_check()]);

    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Table => print_table(
            ["Check", "Status", "Detail"],
            report.checks.iter().map(|check| {
                vec![
                    check.name.to_string(),
                    check.status.label().to_string(),
                    check.detail.clone(),
                ]
            }),
        ),
        OutputFormat::Pretty => {
            for check in &report.checks {
                println!("[{}] {}: {}", check.status.label(), check.name, check.detail);
            }
        }
        OutputFormat::Raw => println!("{}", report.overall.label().to_ascii_lowercase()),
    }

    Ok(if report.overall == Status::Fail {
        FAILURE
    } else {
        SUCCESS
    })
}

/// Compile an embedded schema, then make sure it rejects a bad document.
fn engine_check() -> Check {
    let probe = || -> Result<(), String> {
        let registry = Registry::from_embedded(&[(SELF_TEST_NAME, SELF_TEST_SCHEMA)])
            .map_err(|err| err.to_string())?;
        if let Some(failure) = registry.report().failures.first() {
            return Err(failure.error.to_string());
        }
        let accepted = registry
            .is_valid(SELF_TEST_NAME, &serde_json::json!({ "name": "" }))
            .map_err(|err| err.to_string())?;
        if accepted {
            return Err("probe schema accepted an empty name".to_string());
        }
        Ok(())
    };

    match probe() {
        Ok(()) => Check::new("engine", Status::Pass, "compiler and validator operational"),
        Err(detail) => Check::new("engine", Status::Fail, detail),
    }
}

/// Start a watcher on a scratch schema directory to learn how reloads will
/// be triggered on this host.
fn reload_check() -> Check {
    let dir = std::env::temp_dir().join(format!("schemagate-doctor-{}", std::process::id()));
    let result = watch_scratch_dir(&dir);
    let _ = std::fs::remove_dir_all(&dir);

    match result {
        Ok(true) => Check::new("reload", Status::Pass, "filesystem events"),
        Ok(false) => Check::new("reload", Status::Warn, "polling (no filesystem events)"),
        Err(detail) => Check::new("reload", Status::Warn, detail),
    }
}

fn watch_scratch_dir(dir: &Path) -> Result<bool, String> {
    std::fs::create_dir_all(dir).map_err(|err| format!("{}: {err}", dir.display()))?;
    std::fs::write(
        dir.join(format!("{SELF_TEST_NAME}.schema.json")),
        SELF_TEST_SCHEMA,
    )
    .map_err(|err| format!("{}: {err}", dir.display()))?;

    let registry = Registry::from_directory(dir).map_err(|err| err.to_string())?;
    let handle = registry
        .watch(Duration::from_millis(50))
        .map_err(|err| err.to_string())?;
    Ok(handle.is_event_driven())
}

fn schema_dir_check() -> Check {
    let Some(path) = std::env::var_os(SCHEMA_DIR_ENV).map(PathBuf::from) else {
        return Check::new("schema_dir", Status::Skip, format!("{SCHEMA_DIR_ENV} not set"));
    };
    if !path.is_dir() {
        return Check::new(
            "schema_dir",
            Status::Fail,
            format!("{} is not a directory", path.display()),
        );
    }

    match Registry::from_directory(&path) {
        Ok(registry) => {
            let report = registry.report();
            let loaded = format!("{} loaded {} schemas", path.display(), report.loaded.len());
            if report.is_clean() {
                Check::new("schema_dir", Status::Pass, loaded)
            } else {
                Check::new(
                    "schema_dir",
                    Status::Warn,
                    format!(
                        "{loaded}, {} failed (run `schemagate check`)",
                        report.failures.len()
                    ),
                )
            }
        }
        Err(err) => Check::new(
            "schema_dir",
            Status::Fail,
            format!("{} failed schema load: {err}", path.display()),
        ),
    }
}
