use schemagate_core::CompileOptions;

/// Controls how a registry loads and compiles its schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// When true, object schemas reject properties they do not declare.
    pub strict_mode: bool,
    /// When true, a schema whose own examples fail validation is not loaded.
    pub verify_examples: bool,
    /// Maximum number of schemas loaded from a directory.
    pub max_schemas_from_directory: usize,
    /// Maximum bytes allowed per schema file loaded from a directory.
    pub max_schema_file_size: usize,
}

impl RegistryConfig {
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            strict_mode: self.strict_mode,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            strict_mode: false,
            verify_examples: true,
            max_schemas_from_directory: 256,
            max_schema_file_size: 256 * 1024,
        }
    }
}
