//! Decoding of fixed-length record buffers
//!
//! Each decode step reports one of three results: an `Err` that is fatal
//! to the read (strict mode only), a recoverable skip of the whole record,
//! or a recoverable `Null` for a single value.

use crate::errors::{DbfError, DbfResult};
use crate::models::datetime::{julian_to_datetime, parse_dbase_date};
use crate::models::codepage::Encoding;
use crate::models::field::{Field, FieldType};
use crate::models::options::{OpenOptions, ReadMode};
use crate::models::value::{DELETED_KEY, FieldValue, Record};

/// Marker byte for a logically deleted record
pub const DELETED_MARKER: u8 = b'*';

/// Currency fields are fixed-point with four implied decimals
pub const CURRENCY_SCALE: f64 = 10_000.0;

/// Result of decoding one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome {
    /// Store this value under the field name
    Value(FieldValue),
    /// Leave the field out of the record (unknown type in loose mode)
    Omit,
}

/// Result of decoding one record buffer
#[derive(Debug)]
pub enum RecordOutcome {
    Record(Record),
    /// Deletion-marked and deleted records were not requested
    Dropped,
    /// Loose mode gave up on this record; scanning continues
    Skipped(DbfError),
}

/// Decodes record buffers against a fixed schema
#[derive(Debug)]
pub struct RecordDecoder<'a> {
    fields: &'a [Field],
    encodings: Vec<Encoding>,
    mode: ReadMode,
    include_deleted: bool,
}

impl<'a> RecordDecoder<'a> {
    pub fn new(fields: &'a [Field], options: &OpenOptions) -> Self {
        let encodings = fields
            .iter()
            .map(|field| options.encoding.resolve(&field.name))
            .collect();

        Self {
            fields,
            encodings,
            mode: options.read_mode,
            include_deleted: options.include_deleted,
        }
    }

    /// Decode one `record_length`-byte buffer
    pub fn decode(&self, buf: &[u8]) -> DbfResult<RecordOutcome> {
        let Some((&marker, data)) = buf.split_first() else {
            return Ok(RecordOutcome::Dropped);
        };

        let deleted = marker == DELETED_MARKER;
        if deleted && !self.include_deleted {
            return Ok(RecordOutcome::Dropped);
        }

        let mut record = Record::with_capacity(self.fields.len() + usize::from(deleted));
        let mut offset = 0;

        for (field, encoding) in self.fields.iter().zip(&self.encodings) {
            let end = offset + usize::from(field.size);
            if end > data.len() {
                let err = DbfError::TruncatedRecord {
                    expected: end + 1,
                    actual: buf.len(),
                };
                return match self.mode {
                    ReadMode::Strict => Err(err),
                    ReadMode::Loose => Ok(RecordOutcome::Skipped(err)),
                };
            }

            if let FieldOutcome::Value(value) = decode_field(field, &data[offset..end], *encoding, self.mode)? {
                record.insert(field.name.as_str(), value);
            }
            offset = end;
        }

        if deleted {
            record.insert(DELETED_KEY, FieldValue::Boolean(true));
        }

        Ok(RecordOutcome::Record(record))
    }
}

/// Decode the bytes of a single field according to its type.
///
/// Errors are only returned in strict mode.
pub fn decode_field(field: &Field, bytes: &[u8], encoding: Encoding, mode: ReadMode) -> DbfResult<FieldOutcome> {
    let value = match field.field_type {
        FieldType::Character => FieldValue::Text(encoding.decode(bytes).trim_end_matches(' ').to_string()),
        FieldType::Numeric | FieldType::Float => decode_number(field, bytes, encoding, mode)?,
        FieldType::Currency => match <[u8; 8]>::try_from(bytes) {
            Ok(raw) => FieldValue::Number(i64::from_le_bytes(raw) as f64 / CURRENCY_SCALE),
            Err(_) => FieldValue::Null,
        },
        FieldType::Logical => match bytes.first().copied().unwrap_or(b' ') {
            b'T' | b't' | b'Y' | b'y' => FieldValue::Boolean(true),
            b'F' | b'f' | b'N' | b'n' => FieldValue::Boolean(false),
            _ => FieldValue::Null,
        },
        FieldType::Date => match parse_dbase_date(&encoding.decode(bytes)) {
            Some(ts) => FieldValue::Timestamp(ts),
            None => FieldValue::Null,
        },
        FieldType::Integer => match <[u8; 4]>::try_from(bytes) {
            Ok(raw) => FieldValue::Integer(i32::from_le_bytes(raw)),
            Err(_) => FieldValue::Null,
        },
        FieldType::Double => match <[u8; 8]>::try_from(bytes) {
            Ok(raw) => FieldValue::Number(f64::from_le_bytes(raw)),
            Err(_) => FieldValue::Null,
        },
        FieldType::DateTime => decode_datetime(bytes),
        FieldType::Memo => {
            if mode.is_strict() {
                return Err(DbfError::MemoUnsupported(field.name.clone()));
            }
            FieldValue::Null
        }
        FieldType::Other(code) => {
            if mode.is_strict() {
                return Err(DbfError::UnsupportedFieldType {
                    field: field.name.clone(),
                    code: char::from(code),
                });
            }
            return Ok(FieldOutcome::Omit);
        }
    };

    Ok(FieldOutcome::Value(value))
}

fn decode_number(field: &Field, bytes: &[u8], encoding: Encoding, mode: ReadMode) -> DbfResult<FieldValue> {
    let decoded = encoding.decode(bytes);
    let text = decoded.trim();
    if text.is_empty() {
        return Ok(FieldValue::Null);
    }

    // decimal comma
    let normalized = if text.contains(',') && !text.contains('.') {
        text.replace(',', ".")
    } else {
        text.to_string()
    };

    // out-of-range text parses to infinity; only an explicit literal may be infinite
    let parsed = normalized
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite() || is_infinity_literal(&normalized));

    match parsed {
        Some(number) => Ok(FieldValue::Number(number)),
        None if mode.is_strict() => Err(DbfError::InvalidNumber {
            field: field.name.clone(),
            text: text.to_string(),
        }),
        None => Ok(FieldValue::Null),
    }
}

fn is_infinity_literal(text: &str) -> bool {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}

fn decode_datetime(bytes: &[u8]) -> FieldValue {
    let Ok(raw) = <[u8; 8]>::try_from(bytes) else {
        return FieldValue::Null;
    };
    let julian_day = i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
    let ms = i32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);

    julian_to_datetime(julian_day, ms).map_or(FieldValue::Null, FieldValue::Timestamp)
}
