use std::path::PathBuf;

use thiserror::Error;

/// Centralized error type for the dbf reader
#[derive(Error, Debug)]
pub enum DbfError {
    #[error("I/O error ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported dBase version: 0x{0:02x}")]
    UnsupportedVersion(u8),

    #[error("Memo file not found for {0}")]
    MissingMemoFile(PathBuf),

    #[error("Invalid field name: {0:?}")]
    InvalidFieldName(String),

    #[error("{field}: unsupported field type {code:?}")]
    UnsupportedFieldType { field: String, code: char },

    #[error("{field}: invalid size {size} for {field_type} field (expected {expected})")]
    InvalidFieldSize {
        field: String,
        field_type: String,
        size: u8,
        expected: String,
    },

    #[error("Duplicate field name: {0}")]
    DuplicateField(String),

    #[error("Inconsistent record length: header={header} computed={computed}")]
    RecordLengthMismatch { header: u16, computed: usize },

    #[error("Truncated record: need {expected} bytes, got {actual}")]
    TruncatedRecord { expected: usize, actual: usize },

    #[error("{field}: invalid number {text:?}")]
    InvalidNumber { field: String, text: String },

    #[error("{0}: memo fields are not supported yet")]
    MemoUnsupported(String),

    #[error("JSON (de)serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DbfError {
    /// Wrap an I/O error with the path or operation it came from
    pub fn io<S: Into<String>>(context: S, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Short read where the format requires more bytes
    pub fn unexpected_eof<S: Into<String>>(context: S) -> Self {
        Self::io(
            context,
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "unexpected end of data"),
        )
    }

    /// True for malformed-input errors, false for I/O and serialization failures
    pub fn is_format_error(&self) -> bool {
        !matches!(self, Self::Io { .. } | Self::Json(_))
    }
}

/// Alias for fallible operations in the dbf reader
pub type DbfResult<T> = Result<T, DbfError>;
