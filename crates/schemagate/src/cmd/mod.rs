use clap::{Args, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::{Path, PathBuf};

use schemagate_registry::{Registry, RegistryConfig};

use crate::exit::{io_error, json_error, registry_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod check;
pub mod doctor;
pub mod examples;
pub mod get;
pub mod list;
pub mod props;
pub mod validate;
pub mod version;
pub mod watch;

pub const SCHEMA_DIR_ENV: &str = "SCHEMAGATE_SCHEMA_DIR";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a schema directory and report every load failure.
    Check(CheckArgs),
    /// List loaded schemas with versions, property counts and hashes.
    List(ListArgs),
    /// Validate a document against a named schema.
    Validate(ValidateArgs),
    /// Print the top-level properties of a schema.
    Props(SchemaArgs),
    /// Print the examples declared by a schema.
    Examples(SchemaArgs),
    /// Look up a path in a JSON document.
    Get(GetArgs),
    /// Reload a schema directory whenever it changes.
    Watch(WatchArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Run local environment health checks.
    Doctor(DoctorArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Check(args) => check::run(args, format),
        Command::List(args) => list::run(args, format),
        Command::Validate(args) => validate::run(args, format),
        Command::Props(args) => props::run(args, format),
        Command::Examples(args) => examples::run(args, format),
        Command::Get(args) => get::run(args, format),
        Command::Watch(args) => watch::run(args, format),
        Command::Version(args) => version::run(args, format),
        Command::Doctor(args) => doctor::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Schema directory.
    #[arg(value_name = "DIR", env = SCHEMA_DIR_ENV)]
    pub dir: PathBuf,
    /// Reject properties that object schemas do not declare.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Schema directory.
    #[arg(value_name = "DIR", env = SCHEMA_DIR_ENV)]
    pub dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Schema directory.
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,
    /// Schema name.
    pub name: String,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub schema: SchemaArgs,
    #[command(flatten)]
    pub document: DocumentArgs,
    /// Reject properties that object schemas do not declare.
    #[arg(long)]
    pub strict: bool,
}

/// Where a JSON document is read from.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct DocumentArgs {
    /// Inline JSON document.
    #[arg(long)]
    pub json: Option<String>,
    /// Read the document from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub enum ValueKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    #[default]
    Any,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[command(flatten)]
    pub document: DocumentArgs,
    /// Dotted path with optional indices, e.g. `a.b[0].c`.
    pub path: String,
    /// Required kind of the value at the path.
    #[arg(long, value_enum, default_value_t = ValueKind::Any)]
    pub kind: ValueKind,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Schema directory.
    #[arg(value_name = "DIR", env = SCHEMA_DIR_ENV)]
    pub dir: PathBuf,
    /// Quiet period after a file change before reloading (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s")]
    pub interval: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {}

/// Load a directory registry, surfacing unreadable directories with their
/// I/O exit code.
pub fn open_registry(dir: &Path, strict: bool) -> CliResult<Registry> {
    std::fs::read_dir(dir).map_err(|err| io_error(&format!("opening {}", dir.display()), err))?;
    let config = RegistryConfig {
        strict_mode: strict,
        ..RegistryConfig::default()
    };
    Registry::from_directory_with_config(dir, config)
        .map_err(|err| registry_error("loading schemas", err))
}

impl DocumentArgs {
    pub fn read(&self) -> CliResult<Value> {
        match (&self.json, &self.file) {
            (Some(text), _) => {
                serde_json::from_str(text).map_err(|err| json_error("parsing --json", err))
            }
            (None, Some(path)) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|err| io_error(&format!("reading {}", path.display()), err))?;
                serde_json::from_str(&text)
                    .map_err(|err| json_error(&format!("parsing {}", path.display()), err))
            }
            (None, None) => Err(CliError::new(USAGE, "one of --json or --file is required")),
        }
    }
}
