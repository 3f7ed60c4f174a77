//! Table header parsing and memo file discovery

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::{debug, warn};
use serde::Serialize;

use crate::errors::{DbfError, DbfResult};
use crate::models::options::ReadMode;

/// Size of the fixed table header and of each field descriptor
pub const HEADER_SIZE: usize = 32;

/// Years in the header are stored relative to this base
pub const DBASE_DATE_BASE_YEAR: i32 = 1900;

/// Format revisions accepted in strict mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DbaseVersion {
    /// 0x03, no memo file
    DBase3,
    /// 0x83, memo in `.dbt`
    DBase3Memo,
    /// 0x8B, memo in `.dbt`
    DBase4Memo,
    /// 0x30, memo in `.fpt`, 4-byte memo fields
    VisualFoxPro,
    /// 0xF5, memo in `.fpt`
    FoxProMemo,
}

/// Which companion file holds memo payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoFamily {
    Dbt,
    Fpt,
}

impl MemoFamily {
    fn extensions(&self) -> [&'static str; 2] {
        match self {
            MemoFamily::Dbt => ["dbt", "DBT"],
            MemoFamily::Fpt => ["fpt", "FPT"],
        }
    }
}

impl DbaseVersion {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x03 => Some(DbaseVersion::DBase3),
            0x83 => Some(DbaseVersion::DBase3Memo),
            0x8B => Some(DbaseVersion::DBase4Memo),
            0x30 => Some(DbaseVersion::VisualFoxPro),
            0xF5 => Some(DbaseVersion::FoxProMemo),
            _ => None,
        }
    }

    pub fn byte(&self) -> u8 {
        match self {
            DbaseVersion::DBase3 => 0x03,
            DbaseVersion::DBase3Memo => 0x83,
            DbaseVersion::DBase4Memo => 0x8B,
            DbaseVersion::VisualFoxPro => 0x30,
            DbaseVersion::FoxProMemo => 0xF5,
        }
    }

    pub fn memo_family(&self) -> Option<MemoFamily> {
        match self {
            DbaseVersion::DBase3 => None,
            DbaseVersion::DBase3Memo | DbaseVersion::DBase4Memo => Some(MemoFamily::Dbt),
            DbaseVersion::VisualFoxPro | DbaseVersion::FoxProMemo => Some(MemoFamily::Fpt),
        }
    }
}

impl fmt::Display for DbaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DbaseVersion::DBase3 => "dBase III",
            DbaseVersion::DBase3Memo => "dBase III with memo",
            DbaseVersion::DBase4Memo => "dBase IV with memo",
            DbaseVersion::VisualFoxPro => "Visual FoxPro",
            DbaseVersion::FoxProMemo => "FoxPro with memo",
        };
        write!(f, "{name} (0x{:02x})", self.byte())
    }
}

/// Expected byte width of a memo field for a given version byte
pub fn memo_field_size(version: u8) -> u8 {
    if version == DbaseVersion::VisualFoxPro.byte() { 4 } else { 10 }
}

/// Last-update stamp exactly as stored; no calendar validation is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LastUpdate {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}

impl LastUpdate {
    /// The stamp as a calendar date, when it names a real one
    pub fn to_naive_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, u32::from(self.month), u32::from(self.day))
    }
}

impl fmt::Display for LastUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Decoded fixed-size table header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHeader {
    pub version: u8,
    pub last_update: LastUpdate,
    pub record_count: u32,
    pub header_length: u16,
    pub record_length: u16,
}

impl TableHeader {
    /// Decode the first 32 bytes of a table file
    pub fn parse(bytes: &[u8], mode: ReadMode) -> DbfResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(DbfError::unexpected_eof("reading table header"));
        }

        let version = bytes[0];
        if DbaseVersion::from_byte(version).is_none() {
            if mode.is_strict() {
                return Err(DbfError::UnsupportedVersion(version));
            }
            warn!("Accepting unknown dBase version 0x{version:02x} in loose mode");
        }

        Ok(Self {
            version,
            last_update: LastUpdate {
                year: DBASE_DATE_BASE_YEAR + i32::from(bytes[1]),
                month: bytes[2],
                day: bytes[3],
            },
            record_count: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            header_length: u16::from_le_bytes([bytes[8], bytes[9]]),
            record_length: u16::from_le_bytes([bytes[10], bytes[11]]),
        })
    }

    pub fn dbase_version(&self) -> Option<DbaseVersion> {
        DbaseVersion::from_byte(self.version)
    }
}

/// Look for the memo file that belongs to `table_path`.
///
/// Only checks for existence. dBase memo versions without a memo file fail
/// in strict mode; a missing FoxPro memo file is tolerated.
pub fn discover_memo_file(table_path: &Path, version: u8, mode: ReadMode) -> DbfResult<Option<PathBuf>> {
    let Some(family) = DbaseVersion::from_byte(version).and_then(|v| v.memo_family()) else {
        return Ok(None);
    };

    let found = family
        .extensions()
        .iter()
        .map(|ext| table_path.with_extension(ext))
        .find(|candidate| candidate.exists());

    match (&found, family) {
        (Some(path), _) => debug!("Found memo file {}", path.display()),
        (None, MemoFamily::Dbt) if mode.is_strict() => {
            return Err(DbfError::MissingMemoFile(table_path.to_path_buf()));
        }
        (None, _) => debug!("No memo file next to {}", table_path.display()),
    }

    Ok(found)
}
