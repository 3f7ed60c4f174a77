use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::errors::DbfResult;
use crate::models::field::FieldType;
use crate::models::header::LastUpdate;
use crate::models::table::Table;
use crate::models::value::Record;

/// Summary information about an open table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    /// Number of columns (fields)
    pub n_columns: usize,
    /// Number of records declared in the header
    pub n_rows: u32,
    /// Raw version byte
    pub version: u8,
    /// Human-readable format name, when the version is known
    pub version_name: Option<String>,
    pub last_update: LastUpdate,
    pub memo_file: Option<PathBuf>,
    pub fields: Vec<FieldSummary>,
}

/// Per-field metadata as reported by [`TableSummary`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSummary {
    pub name: String,
    pub field_type: FieldType,
    /// Single-letter type code
    pub code: char,
    pub length: u8,
    pub decimal_places: u8,
    /// Encoding applied to this field's text
    pub encoding: String,
}

impl<S> Table<S> {
    /// Describe the schema and header of this table
    pub fn summary(&self) -> TableSummary {
        let fields = self
            .fields()
            .iter()
            .map(|field| FieldSummary {
                name: field.name.clone(),
                field_type: field.field_type,
                code: char::from(field.field_type.code()),
                length: field.size,
                decimal_places: field.decimal_places,
                encoding: self.options().encoding.resolve(&field.name).to_string(),
            })
            .collect::<Vec<_>>();

        TableSummary {
            n_columns: fields.len(),
            n_rows: self.record_count(),
            version: self.version(),
            version_name: self.dbase_version().map(|v| v.to_string()),
            last_update: self.last_update(),
            memo_file: self.memo_path().map(Path::to_path_buf),
            fields,
        }
    }
}

/// Convert a summary to a JSON string
pub fn summary_to_json(summary: &TableSummary) -> DbfResult<String> {
    Ok(serde_json::to_string(summary)?)
}

/// Convert records to a JSON array string
pub fn records_to_json(records: &[Record]) -> DbfResult<String> {
    Ok(serde_json::to_string(records)?)
}

/// Convert records to a pretty-printed JSON array string
pub fn records_to_json_pretty(records: &[Record]) -> DbfResult<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Check if a path is an existing regular file with a `.dbf` extension
pub fn dbf_file_exists<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("dbf"))
}
