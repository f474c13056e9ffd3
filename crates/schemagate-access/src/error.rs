/// Why a path string is not valid accessor syntax.
///
/// Positions are byte offsets into the path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("empty property name at offset {position}")]
    EmptySegment { position: usize },

    #[error("unclosed `[` at offset {position}")]
    UnclosedBracket { position: usize },

    #[error("invalid array index `{index}` at offset {position}")]
    InvalidIndex { index: String, position: usize },

    #[error("unexpected `{found}` at offset {position}")]
    UnexpectedCharacter { found: char, position: usize },
}

pub type Result<T> = std::result::Result<T, PathError>;
