use std::collections::HashMap;
use std::fmt;

use encoding::all::{ISO_8859_1, WINDOWS_1252};
use encoding::{DecoderTrap, Encoding as _};
use oem_cp::code_table::{DECODING_TABLE_CP437, DECODING_TABLE_CP850};
use oem_cp::decode_string_complete_table;
use serde::{Deserialize, Serialize};

/// Name used when no default encoding is configured
pub const DEFAULT_ENCODING: &str = "ISO-8859-1";

/// Text encodings understood by the decoder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Encoding {
    Cp850,
    Cp437,
    Cp1252,
    #[default]
    Iso8859_1,
    Utf8,
}

impl Encoding {
    /// Resolve an encoding name. Matching is case-insensitive and ignores
    /// surrounding whitespace; unknown names fall back to ISO-8859-1.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "CP850" => Encoding::Cp850,
            "CP437" => Encoding::Cp437,
            "CP1252" | "WINDOWS-1252" => Encoding::Cp1252,
            "ISO-8859-1" | "ISO8859-1" | "LATIN1" => Encoding::Iso8859_1,
            "UTF-8" | "UTF8" => Encoding::Utf8,
            _ => Encoding::Iso8859_1,
        }
    }

    /// Canonical name of the encoding
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Cp850 => "CP850",
            Encoding::Cp437 => "CP437",
            Encoding::Cp1252 => "CP1252",
            Encoding::Iso8859_1 => "ISO-8859-1",
            Encoding::Utf8 => "UTF-8",
        }
    }

    /// Decode raw field bytes into text, replacing anything unmappable
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Encoding::Cp850 => decode_string_complete_table(bytes, &DECODING_TABLE_CP850),
            Encoding::Cp437 => decode_string_complete_table(bytes, &DECODING_TABLE_CP437),
            Encoding::Cp1252 => WINDOWS_1252
                .decode(bytes, DecoderTrap::Replace)
                .unwrap_or_else(|_| String::from_utf8_lossy(bytes).to_string()),
            Encoding::Iso8859_1 => ISO_8859_1
                .decode(bytes, DecoderTrap::Replace)
                .unwrap_or_else(|_| String::from_utf8_lossy(bytes).to_string()),
            Encoding::Utf8 => String::from_utf8_lossy(bytes).to_string(),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Table-wide encoding plus optional per-field overrides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// Encoding used for field names and any field without an override
    pub default: String,
    /// Field name -> encoding name
    pub per_field: HashMap<String, String>,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            default: DEFAULT_ENCODING.to_string(),
            per_field: HashMap::new(),
        }
    }
}

impl EncodingConfig {
    /// Encoding name for `field`: a non-empty override wins, otherwise the default
    pub fn encoding_name_for(&self, field: &str) -> &str {
        match self.per_field.get(field) {
            Some(name) if !name.is_empty() => name,
            _ => &self.default,
        }
    }

    /// Resolve the encoding that applies to `field`
    pub fn resolve(&self, field: &str) -> Encoding {
        Encoding::from_name(self.encoding_name_for(field))
    }

    /// Resolve the table default, used for descriptor names
    pub fn default_encoding(&self) -> Encoding {
        Encoding::from_name(&self.default)
    }
}
