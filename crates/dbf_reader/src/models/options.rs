use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DbfResult;
use crate::models::codepage::{DEFAULT_ENCODING, EncodingConfig};

/// Error tolerance policy applied while opening and decoding a table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadMode {
    /// Any malformed input fails the enclosing operation
    #[default]
    Strict,
    /// Malformed values decode as absent and malformed records are skipped
    Loose,
}

impl ReadMode {
    pub fn is_strict(&self) -> bool {
        matches!(self, ReadMode::Strict)
    }
}

impl fmt::Display for ReadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadMode::Strict => write!(f, "strict"),
            ReadMode::Loose => write!(f, "loose"),
        }
    }
}

impl FromStr for ReadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(ReadMode::Strict),
            "loose" => Ok(ReadMode::Loose),
            other => Err(format!("unknown read mode: {other}")),
        }
    }
}

/// Configuration for opening a dBase table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenOptions {
    /// Strict or loose error handling
    pub read_mode: ReadMode,
    /// Default and per-field text encodings
    pub encoding: EncodingConfig,
    /// Whether deletion-marked records are returned (tagged with `_deleted`)
    pub include_deleted: bool,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON document; missing keys take their defaults
    pub fn from_json(json: &str) -> DbfResult<Self> {
        let options: OpenOptions = serde_json::from_str(json)?;
        Ok(options.normalized())
    }

    pub fn with_read_mode(mut self, read_mode: ReadMode) -> Self {
        self.read_mode = read_mode;
        self
    }

    pub fn with_default_encoding<S: Into<String>>(mut self, name: S) -> Self {
        self.encoding.default = name.into();
        self
    }

    pub fn with_field_encoding<F: Into<String>, S: Into<String>>(mut self, field: F, name: S) -> Self {
        self.encoding.per_field.insert(field.into(), name.into());
        self
    }

    pub fn with_include_deleted(mut self, include_deleted: bool) -> Self {
        self.include_deleted = include_deleted;
        self
    }

    /// Fill in defaults for anything left blank
    pub fn normalized(mut self) -> Self {
        if self.encoding.default.trim().is_empty() {
            self.encoding.default = DEFAULT_ENCODING.to_string();
        }
        self
    }
}
