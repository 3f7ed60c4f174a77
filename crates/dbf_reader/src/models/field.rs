//! Field descriptors: parsing and strict-mode validation

use std::collections::HashSet;
use std::fmt;

use log::{trace, warn};
use serde::{Serialize, Serializer};

use crate::errors::{DbfError, DbfResult};
use crate::models::codepage::Encoding;
use crate::models::header::{HEADER_SIZE, TableHeader, memo_field_size};
use crate::models::options::{OpenOptions, ReadMode};
use crate::models::source::ByteSource;

/// Byte that ends the descriptor array
pub const DESCRIPTOR_TERMINATOR: u8 = 0x0D;

/// Longest field name accepted in strict mode, in UTF-8 bytes
pub const MAX_FIELD_NAME_LEN: usize = 10;

const NAME_AREA_LEN: usize = 11;
const TYPE_OFFSET: usize = 11;
const SIZE_OFFSET: usize = 16;
const DECIMALS_OFFSET: usize = 17;

/// dBase field type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Character,
    Numeric,
    Float,
    Currency,
    Logical,
    Date,
    Integer,
    Memo,
    DateTime,
    Double,
    /// A code this reader does not know; only reachable in loose mode
    Other(u8),
}

impl FieldType {
    pub fn from_code(code: u8) -> Self {
        match code {
            b'C' => FieldType::Character,
            b'N' => FieldType::Numeric,
            b'F' => FieldType::Float,
            b'Y' => FieldType::Currency,
            b'L' => FieldType::Logical,
            b'D' => FieldType::Date,
            b'I' => FieldType::Integer,
            b'M' => FieldType::Memo,
            b'T' => FieldType::DateTime,
            b'B' => FieldType::Double,
            other => FieldType::Other(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            FieldType::Character => b'C',
            FieldType::Numeric => b'N',
            FieldType::Float => b'F',
            FieldType::Currency => b'Y',
            FieldType::Logical => b'L',
            FieldType::Date => b'D',
            FieldType::Integer => b'I',
            FieldType::Memo => b'M',
            FieldType::DateTime => b'T',
            FieldType::Double => b'B',
            FieldType::Other(code) => *code,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, FieldType::Other(_))
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Character => write!(f, "Character"),
            FieldType::Numeric => write!(f, "Numeric"),
            FieldType::Float => write!(f, "Float"),
            FieldType::Currency => write!(f, "Currency"),
            FieldType::Logical => write!(f, "Logical"),
            FieldType::Date => write!(f, "Date"),
            FieldType::Integer => write!(f, "Integer"),
            FieldType::Memo => write!(f, "Memo"),
            FieldType::DateTime => write!(f, "DateTime"),
            FieldType::Double => write!(f, "Double"),
            FieldType::Other(code) => write!(f, "Unknown({:?})", char::from(*code)),
        }
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// One column of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub size: u8,
    /// Informational only
    pub decimal_places: u8,
}

impl Field {
    pub fn new<S: Into<String>>(name: S, field_type: FieldType, size: u8, decimal_places: u8) -> Self {
        Self {
            name: name.into(),
            field_type,
            size,
            decimal_places,
        }
    }

    /// Decode one 32-byte descriptor. The name is read up to the first NUL
    /// (or all 11 bytes), decoded with `name_encoding` and trimmed.
    pub fn from_descriptor(descriptor: &[u8], name_encoding: Encoding) -> DbfResult<Self> {
        if descriptor.len() < HEADER_SIZE {
            return Err(DbfError::unexpected_eof("reading field descriptor"));
        }

        let name_area = &descriptor[..NAME_AREA_LEN];
        let name_len = name_area.iter().position(|&b| b == 0).unwrap_or(NAME_AREA_LEN);
        let name = name_encoding.decode(&name_area[..name_len]).trim().to_string();

        Ok(Self {
            name,
            field_type: FieldType::from_code(descriptor[TYPE_OFFSET]),
            size: descriptor[SIZE_OFFSET],
            decimal_places: descriptor[DECIMALS_OFFSET],
        })
    }

    /// Strict-mode checks for a single field against the table version
    pub fn validate(&self, version: u8) -> DbfResult<()> {
        // measured in bytes of the decoded name
        let name_len = self.name.len();
        if name_len == 0 || name_len > MAX_FIELD_NAME_LEN {
            return Err(DbfError::InvalidFieldName(self.name.clone()));
        }

        let (ok, expected) = match self.field_type {
            FieldType::Other(code) => {
                return Err(DbfError::UnsupportedFieldType {
                    field: self.name.clone(),
                    code: char::from(code),
                });
            }
            // a u8 width already satisfies the 255-byte limit on C
            FieldType::Character | FieldType::Integer => return Ok(()),
            FieldType::Numeric | FieldType::Float => (self.size <= 20, "<= 20".to_string()),
            FieldType::Logical => (self.size == 1, "1".to_string()),
            FieldType::Currency | FieldType::Date | FieldType::DateTime | FieldType::Double => {
                (self.size == 8, "8".to_string())
            }
            FieldType::Memo => {
                let memo_size = memo_field_size(version);
                (self.size == memo_size, memo_size.to_string())
            }
        };

        if ok {
            Ok(())
        } else {
            Err(DbfError::InvalidFieldSize {
                field: self.name.clone(),
                field_type: self.field_type.to_string(),
                size: self.size,
                expected,
            })
        }
    }
}

/// Read the descriptor array that follows the table header.
///
/// Stops at the terminator byte or at the declared header length. In strict
/// mode every field is validated and names must be unique; loose mode keeps
/// whatever the bytes say.
pub fn read_field_descriptors<S: ByteSource>(
    source: &mut S,
    header: &TableHeader,
    options: &OpenOptions,
) -> DbfResult<Vec<Field>> {
    let name_encoding = options.encoding.default_encoding();
    let strict = options.read_mode.is_strict();

    let mut fields: Vec<Field> = Vec::new();
    let mut seen = HashSet::new();
    let mut pos = HEADER_SIZE as u64;

    while pos < u64::from(header.header_length) {
        let descriptor = match source
            .read_at(pos, HEADER_SIZE)
            .map_err(|e| DbfError::io("reading field descriptor", e))?
        {
            Some(bytes) => bytes,
            // a terminator in the last byte of a record-less file
            None => match source
                .read_at(pos, 1)
                .map_err(|e| DbfError::io("reading field descriptor", e))?
            {
                Some(byte) if byte[0] == DESCRIPTOR_TERMINATOR => break,
                _ => return Err(DbfError::unexpected_eof("reading field descriptor")),
            },
        };
        pos += HEADER_SIZE as u64;

        if descriptor[0] == DESCRIPTOR_TERMINATOR {
            break;
        }

        let field = Field::from_descriptor(&descriptor, name_encoding)?;
        trace!(
            "Field {} type={} size={} decimals={}",
            field.name, field.field_type, field.size, field.decimal_places
        );

        if strict {
            field.validate(header.version)?;
            if !seen.insert(field.name.clone()) {
                return Err(DbfError::DuplicateField(field.name));
            }
        }
        fields.push(field);
    }

    Ok(fields)
}

/// Deletion flag plus the sum of field widths
pub fn computed_record_length(fields: &[Field]) -> usize {
    1 + fields.iter().map(|f| usize::from(f.size)).sum::<usize>()
}

/// Compare the field widths with the header's record length
pub fn check_record_length(fields: &[Field], header: &TableHeader, mode: ReadMode) -> DbfResult<()> {
    let computed = computed_record_length(fields);
    if computed == usize::from(header.record_length) {
        return Ok(());
    }
    if mode.is_strict() {
        return Err(DbfError::RecordLengthMismatch {
            header: header.record_length,
            computed,
        });
    }
    warn!(
        "Record length mismatch accepted in loose mode: header={} computed={}",
        header.record_length, computed
    );
    Ok(())
}
