use tracing::debug;

use crate::cmd::{open_registry, ValidateArgs};
use crate::exit::{registry_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_violations, OutputFormat};

pub fn run(args: ValidateArgs, format: OutputFormat) -> CliResult<i32> {
    let document = args.document.read()?;
    let registry = open_registry(&args.schema.dir, args.strict)?;
    let name = &args.schema.name;

    let schema = registry.get(name).ok_or_else(|| {
        CliError::new(
            USAGE,
            format!(
                "unknown schema: {name} (available: {})",
                registry.names().join(", ")
            ),
        )
    })?;
    let violations = registry
        .validate(name, &document)
        .map_err(|err| registry_error("validating", err))?;
    debug!(
        schema = name.as_str(),
        violations = violations.len(),
        "document checked"
    );

    print_violations(name, schema.version(), &violations, format);

    if violations.is_empty() {
        Ok(SUCCESS)
    } else {
        Ok(DATA_INVALID)
    }
}
