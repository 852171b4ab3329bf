use std::fmt;

/// Positional parse failure raised by the text tokenizer and the format loaders.
///
/// `line` and `column` are 1-based and point at the start of the offending token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} line: {} column: {}", self.message, self.line, self.column)
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, thiserror::Error)]
pub enum SithError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("invalid {format} file magic: expected {expected:?}, found {found:?}")]
    InvalidMagic {
        format: &'static str,
        expected: String,
        found: String,
    },

    #[error("unsupported {format} file version: {version}")]
    UnsupportedVersion { format: &'static str, version: String },

    #[error("invalid {format} file: {message}")]
    InvalidFormat {
        format: &'static str,
        message: String,
    },

    #[error("binary decode error: {0}")]
    Binary(#[from] binrw::Error),

    #[error("name error: {0}")]
    InvalidName(String),

    #[error("invalid hierarchy: {0}")]
    InvalidHierarchy(String),
}

impl SithError {
    pub fn invalid_format(format: &'static str, message: impl Into<String>) -> Self {
        SithError::InvalidFormat {
            format,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SithError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display_carries_position() {
        let err = ParseError::new("Expected identifier 'FACES', found 'VERTICES'!", 12, 5);
        insta::assert_snapshot!(
            err.to_string(),
            @"Expected identifier 'FACES', found 'VERTICES'! line: 12 column: 5"
        );
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.3do");
        let err: SithError = io.into();
        assert!(matches!(err, SithError::Io(_)));
        assert!(err.to_string().contains("missing.3do"));
    }
}
