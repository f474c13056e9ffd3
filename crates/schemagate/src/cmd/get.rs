use serde_json::Value;

use schemagate_access::{AccessPath, DocumentAccess};

use crate::cmd::{GetArgs, ValueKind};
use crate::exit::{CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{print_value, OutputFormat};

pub fn run(args: GetArgs, format: OutputFormat) -> CliResult<i32> {
    AccessPath::parse(&args.path)
        .map_err(|err| CliError::new(USAGE, format!("invalid path `{}`: {err}", args.path)))?;
    let document = args.document.read()?;

    let value = lookup(&document, &args.path, args.kind).ok_or_else(|| {
        CliError::new(
            FAILURE,
            format!("no {} value at `{}`", kind_name(args.kind), args.path),
        )
    })?;

    print_value(&value, format);
    Ok(SUCCESS)
}

/// Typed lookup through the accessor getters.
fn lookup(document: &Value, path: &str, kind: ValueKind) -> Option<Value> {
    match kind {
        ValueKind::String => document.get_string(path).map(Value::from),
        ValueKind::Integer => document.get_integer(path).map(Value::from),
        ValueKind::Number => document.get_number(path).map(Value::from),
        ValueKind::Boolean => document.get_boolean(path).map(Value::from),
        ValueKind::Array => document.get_array(path).map(|items| Value::Array(items.to_vec())),
        ValueKind::Object => document.get_object(path).cloned().map(Value::Object),
        ValueKind::Any => document.lookup(path).cloned(),
    }
}

fn kind_name(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::String => "string",
        ValueKind::Integer => "integer",
        ValueKind::Number => "number",
        ValueKind::Boolean => "boolean",
        ValueKind::Array => "array",
        ValueKind::Object => "object",
        ValueKind::Any => "JSON",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn lookup_applies_the_requested_kind() {
        let document = json!({ "a": { "b": [{ "c": "x" }] }, "n": 4.0 });

        assert_eq!(lookup(&document, "a.b[0].c", ValueKind::String), Some(json!("x")));
        assert_eq!(lookup(&document, "a.b[0].c", ValueKind::Integer), None);
        assert_eq!(lookup(&document, "n", ValueKind::Integer), Some(json!(4)));
        assert_eq!(
            lookup(&document, "a.b", ValueKind::Array),
            Some(json!([{ "c": "x" }]))
        );
        assert_eq!(lookup(&document, "a.b[5].c", ValueKind::Any), None);
    }
}
