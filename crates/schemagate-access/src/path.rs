use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{PathError, Result};

/// One `name[i][j]` step of an accessor path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    name: String,
    indices: Vec<usize>,
}

impl Segment {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Parse one dot-free segment starting at byte `offset` of the full path.
    fn parse(raw: &str, offset: usize) -> Result<Self> {
        let name_end = raw.find(['[', ']']).unwrap_or(raw.len());
        if name_end == 0 {
            return Err(PathError::EmptySegment { position: offset });
        }

        let mut indices = Vec::new();
        let mut rest = &raw[name_end..];
        let mut position = offset + name_end;
        while let Some(found) = rest.chars().next() {
            if found != '[' {
                return Err(PathError::UnexpectedCharacter { found, position });
            }
            let close = rest
                .find(']')
                .ok_or(PathError::UnclosedBracket { position })?;
            let digits = &rest[1..close];
            let invalid = || PathError::InvalidIndex {
                index: digits.to_string(),
                position: position + 1,
            };
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            indices.push(digits.parse().map_err(|_| invalid())?);

            position += close + 1;
            rest = &rest[close + 1..];
        }

        Ok(Self {
            name: raw[..name_end].to_string(),
            indices,
        })
    }

    fn step<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        let member = value.as_object()?.get(&self.name)?;
        self.indices
            .iter()
            .try_fold(member, |node, index| node.as_array()?.get(*index))
    }
}

/// A parsed accessor path such as `a.b[0].c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPath {
    segments: Vec<Segment>,
}

impl AccessPath {
    pub fn parse(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        let mut offset = 0;
        for raw in path.split('.') {
            segments.push(Segment::parse(raw, offset)?);
            offset += raw.len() + 1;
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Walk `document`; `None` as soon as a step is missing or of the wrong kind.
    pub fn resolve<'v>(&self, document: &'v Value) -> Option<&'v Value> {
        self.segments
            .iter()
            .try_fold(document, |node, segment| segment.step(node))
    }
}

impl FromStr for AccessPath {
    type Err = PathError;

    fn from_str(path: &str) -> Result<Self> {
        Self::parse(path)
    }
}

impl fmt::Display for AccessPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            if position > 0 {
                f.write_str(".")?;
            }
            f.write_str(&segment.name)?;
            for index in &segment.indices {
                write!(f, "[{index}]")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_names_and_indices() {
        let path = AccessPath::parse("a.b[0].c").unwrap();
        let names: Vec<&str> = path.segments().iter().map(Segment::name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(path.segments()[1].indices(), &[0]);
        assert_eq!(path.to_string(), "a.b[0].c");

        let nested: AccessPath = "m[1][0]".parse().unwrap();
        assert_eq!(nested.segments()[0].indices(), &[1, 0]);
    }

    #[test]
    fn reports_malformed_paths_with_offsets() {
        assert_eq!(AccessPath::parse(""), Err(PathError::Empty));
        assert_eq!(
            AccessPath::parse("a..b"),
            Err(PathError::EmptySegment { position: 2 })
        );
        assert_eq!(
            AccessPath::parse("[0]"),
            Err(PathError::EmptySegment { position: 0 })
        );
        assert_eq!(
            AccessPath::parse("a.b[0"),
            Err(PathError::UnclosedBracket { position: 3 })
        );
        assert_eq!(
            AccessPath::parse("a[x]"),
            Err(PathError::InvalidIndex {
                index: "x".to_string(),
                position: 2
            })
        );
        assert_eq!(
            AccessPath::parse("a[-1]"),
            Err(PathError::InvalidIndex {
                index: "-1".to_string(),
                position: 2
            })
        );
        assert_eq!(
            AccessPath::parse("a[0]b"),
            Err(PathError::UnexpectedCharacter {
                found: 'b',
                position: 4
            })
        );
        assert_eq!(
            AccessPath::parse("a]"),
            Err(PathError::UnexpectedCharacter {
                found: ']',
                position: 1
            })
        );
    }

    #[test]
    fn index_overflow_is_invalid() {
        let path = format!("a[{}0]", usize::MAX);
        assert!(matches!(
            AccessPath::parse(&path),
            Err(PathError::InvalidIndex { .. })
        ));
    }

    #[test]
    fn resolve_fails_softly() {
        let document = json!({ "a": { "b": [{ "c": "x" }], "s": "text" } });
        let found = |path: &str| AccessPath::parse(path).unwrap().resolve(&document).cloned();

        assert_eq!(found("a.b[0].c"), Some(json!("x")));
        assert_eq!(found("a.b[5].c"), None);
        assert_eq!(found("a.s[0]"), None);
        assert_eq!(found("a.s.len"), None);
        assert_eq!(found("a.missing"), None);
    }
}
