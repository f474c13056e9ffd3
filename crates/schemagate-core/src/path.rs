//! Instance and schema paths attached to validation errors.

use std::fmt;

use serde::{Serialize, Serializer};

/// One step from a container into a child value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of a value inside the validated document.
///
/// Displays as a JSON pointer (`/a/b/0`); the document root is the empty
/// pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct InstancePath(Vec<PathSegment>);

impl InstancePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Render in accessor syntax (`a.b[0].c`), the form accepted by the
    /// path accessor. The root renders as an empty string.
    pub fn to_dotted(&self) -> String {
        let mut out = String::new();
        for segment in &self.0 {
            match segment {
                PathSegment::Key(key) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(key);
                }
                PathSegment::Index(index) => {
                    out.push('[');
                    out.push_str(&index.to_string());
                    out.push(']');
                }
            }
        }
        out
    }
}

impl From<Vec<PathSegment>> for InstancePath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for InstancePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            match segment {
                PathSegment::Key(key) => write!(f, "/{}", escape_pointer(key))?,
                PathSegment::Index(index) => write!(f, "/{index}")?,
            }
        }
        Ok(())
    }
}

impl Serialize for InstancePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Location of the violated constraint inside the compiled schema, as the
/// sequence of keywords and names walked from the schema root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SchemaPath(Vec<String>);

impl SchemaPath {
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The last keyword on the path, if any.
    pub fn keyword(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }
}

impl From<Vec<String>> for SchemaPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "#");
        }
        write!(f, "#")?;
        for segment in &self.0 {
            write!(f, "/{}", escape_pointer(segment))?;
        }
        Ok(())
    }
}

impl Serialize for SchemaPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub(crate) fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Append an escaped segment to a JSON pointer.
pub(crate) fn join_pointer(base: &str, segment: &str) -> String {
    format!("{base}/{}", escape_pointer(segment))
}
