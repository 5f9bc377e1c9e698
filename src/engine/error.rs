//! Structured errors
//!
//! Every problem the engine reports is a [`ParseError`] carrying an
//! [`ErrorCode`], a human-readable message and the position it refers to.
//! Configuration problems are reported separately as [`ConfigError`] before
//! any input is touched.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Machine-readable error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A quoted field reached end of input without its closing quote
    UnclosedQuote,
    /// A row's field count differs from the header count
    ColumnMismatch,
    /// The schema validator rejected a row
    ValidationError,
    /// The document structure is unusable (e.g. missing header row)
    SchemaError,
    /// A cast hook could not convert a field
    InvalidType,
    /// The byte source failed
    IoError,
    /// Input bytes are not valid in the configured encoding
    EncodingError,
    /// The byte source timed out
    TimeoutError,
    /// A buffer limit was exceeded
    MemoryError,
}

impl ErrorCode {
    /// The canonical upper-case name of this code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::UnclosedQuote => "UNCLOSED_QUOTE",
            ErrorCode::ColumnMismatch => "COLUMN_MISMATCH",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::SchemaError => "SCHEMA_ERROR",
            ErrorCode::InvalidType => "INVALID_TYPE",
            ErrorCode::IoError => "IO_ERROR",
            ErrorCode::EncodingError => "ENCODING_ERROR",
            ErrorCode::TimeoutError => "TIMEOUT_ERROR",
            ErrorCode::MemoryError => "MEMORY_ERROR",
        }
    }

    /// Whether errors of this kind end the parse regardless of error mode
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorCode::MemoryError | ErrorCode::IoError)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured parse error
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{code} at line {line}, column {column}: {message}")]
pub struct ParseError {
    /// Error category
    pub code: ErrorCode,
    /// Human-readable description
    pub message: String,
    /// Physical line (1-based)
    pub line: usize,
    /// Column (1-based, in chars)
    pub column: usize,
    /// Data row ordinal (1-based), once one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    /// Header of the offending field, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ParseError {
    /// Create an error at a line/column
    pub fn new(code: ErrorCode, message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            code,
            message: message.into(),
            line,
            column,
            row: None,
            field: None,
        }
    }

    /// Attach the row ordinal
    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    /// Attach the field name
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// An unclosed quote starting at `line`/`column`
    pub fn unclosed_quote(line: usize, column: usize) -> Self {
        Self::new(
            ErrorCode::UnclosedQuote,
            "quoted field is not terminated before end of input",
            line,
            column,
        )
    }

    /// A field-count mismatch against the header
    pub fn column_mismatch(expected: usize, found: usize, line: usize) -> Self {
        Self::new(
            ErrorCode::ColumnMismatch,
            format!("expected {} fields, found {}", expected, found),
            line,
            1,
        )
    }

    /// An I/O failure from the byte source
    pub fn io(err: &std::io::Error, line: usize) -> Self {
        Self::new(ErrorCode::IoError, err.to_string(), line, 1)
    }
}

/// Invalid configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A dialect byte is unusable
    #[error("invalid {name}: {reason}")]
    InvalidDialect {
        /// Which dialect option
        name: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Two dialect options use the same byte
    #[error("{first} and {second} must differ (both are {byte:?})")]
    Conflict {
        /// First option
        first: &'static str,
        /// Second option
        second: &'static str,
        /// The shared byte as a char
        byte: char,
    },

    /// The encoding label is not recognized
    #[error("unknown encoding label '{0}'")]
    UnknownEncoding(String),

    /// A non-dialect option is out of range
    #[error("invalid option {name}: {reason}")]
    InvalidOption {
        /// Option name
        name: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// JSON option document could not be read
    #[error("could not read options: {0}")]
    Json(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Json(err.to_string())
    }
}

/// Any failure returned by the one-shot entry points
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The input could not be parsed (`throw` mode or handler abort)
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The options were rejected before parsing
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// The parse error, if this is one
    pub fn as_parse(&self) -> Option<&ParseError> {
        match self {
            Error::Parse(err) => Some(err),
            Error::Config(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ParseError::unclosed_quote(3, 7);
        assert_eq!(
            err.to_string(),
            "UNCLOSED_QUOTE at line 3, column 7: quoted field is not terminated before end of input"
        );
    }

    #[test]
    fn test_column_mismatch_message() {
        let err = ParseError::column_mismatch(3, 2, 5).with_row(4);
        assert_eq!(err.code, ErrorCode::ColumnMismatch);
        assert!(err.message.contains('3'));
        assert!(err.message.contains('2'));
        assert_eq!(err.line, 5);
        assert_eq!(err.row, Some(4));
    }

    #[test]
    fn test_error_code_serializes_upper_snake() {
        let json = serde_json::to_string(&ErrorCode::ColumnMismatch).unwrap();
        assert_eq!(json, "\"COLUMN_MISMATCH\"");
        for code in [ErrorCode::UnclosedQuote, ErrorCode::MemoryError, ErrorCode::InvalidType] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json.trim_matches('"'), code.as_str());
        }
    }

    #[test]
    fn test_parse_error_serialization_skips_empty_fields() {
        let err = ParseError::new(ErrorCode::SchemaError, "no header row", 1, 1);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "SCHEMA_ERROR");
        assert!(json.get("row").is_none());
        assert!(json.get("field").is_none());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Conflict {
            first: "delimiter",
            second: "quote",
            byte: '"',
        };
        assert!(err.to_string().contains("delimiter and quote must differ"));
    }

    #[test]
    fn test_error_wraps_transparently() {
        let err: Error = ParseError::unclosed_quote(1, 1).into();
        assert_eq!(err.as_parse().map(|e| e.code), Some(ErrorCode::UnclosedQuote));
        assert!(err.to_string().starts_with("UNCLOSED_QUOTE"));

        let err: Error = ConfigError::UnknownEncoding("klingon".into()).into();
        assert!(err.as_parse().is_none());
        assert_eq!(err.to_string(), "unknown encoding label 'klingon'");
    }
}
