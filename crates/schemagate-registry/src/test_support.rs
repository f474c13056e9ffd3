use std::path::{Path, PathBuf};

pub(crate) const OBJECT_SCHEMA: &str = r#"{
    "type": "object",
    "properties": {
        "id": { "type": "integer" },
        "name": { "type": "string" }
    },
    "required": ["id", "name"]
}"#;

pub(crate) fn make_temp_schema_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "schemagate-registry-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub(crate) fn write_schema(dir: &Path, file_name: &str, contents: &str) {
    std::fs::write(dir.join(file_name), contents.as_bytes()).unwrap();
}
