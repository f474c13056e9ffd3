use std::fmt;
use std::io;

use schemagate_registry::RegistryError;

// Process exit codes shared by every subcommand.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => FAILURE,
        io::ErrorKind::InvalidData => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn json_error(context: &str, err: serde_json::Error) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn registry_error(context: &str, err: RegistryError) -> CliError {
    let code = match &err {
        RegistryError::LoadFailed(message) if message.contains("Permission denied") => {
            PERMISSION_DENIED
        }
        RegistryError::LoadFailed(_) | RegistryError::Unreadable(_) => FAILURE,
        RegistryError::UnknownSchema(_) | RegistryError::UnknownVersion(_) => USAGE,
        RegistryError::Compile { .. }
        | RegistryError::DependencyFailed { .. }
        | RegistryError::DuplicateSchema(_)
        | RegistryError::Validation { .. } => DATA_INVALID,
        RegistryError::VersionExists(_) | RegistryError::NoVersions => FAILURE,
        RegistryError::Watch(_) => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_maps_to_50() {
        let err = io_error(
            "reading document",
            io::Error::new(io::ErrorKind::PermissionDenied, "nope"),
        );
        assert_eq!(err.code, PERMISSION_DENIED);
        assert_eq!(err.to_string(), "reading document: nope");
    }

    #[test]
    fn registry_errors_map_to_exit_codes() {
        let unknown = registry_error(
            "lookup",
            RegistryError::UnknownSchema("user".to_string()),
        );
        assert_eq!(unknown.code, USAGE);

        let denied = registry_error(
            "load",
            RegistryError::LoadFailed(
                "failed opening schema a.json: Permission denied (os error 13)".to_string(),
            ),
        );
        assert_eq!(denied.code, PERMISSION_DENIED);

        let missing = registry_error("load", RegistryError::LoadFailed("gone".to_string()));
        assert_eq!(missing.code, FAILURE);
    }
}
