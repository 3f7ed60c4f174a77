//! Open table handle with a forward-only record cursor
//!
//! A `Table` owns its schema and a `records_read` cursor. Reads take
//! `&mut self`, so one handle serves one reader at a time; open another
//! handle for an independent scan.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::errors::{DbfError, DbfResult};
use crate::models::field::{Field, check_record_length, read_field_descriptors};
use crate::models::header::{DbaseVersion, HEADER_SIZE, LastUpdate, TableHeader, discover_memo_file};
use crate::models::options::OpenOptions;
use crate::models::record::{RecordDecoder, RecordOutcome};
use crate::models::source::{ByteSource, FileSource};
use crate::models::value::Record;

/// An open dBase table
#[derive(Debug)]
pub struct Table<S = FileSource> {
    path: PathBuf,
    header: TableHeader,
    fields: Vec<Field>,
    memo_path: Option<PathBuf>,
    options: OpenOptions,
    records_read: u32,
    source: S,
}

impl Table<FileSource> {
    /// Open a table file from disk
    pub fn open<P: AsRef<Path>>(path: P, options: OpenOptions) -> DbfResult<Self> {
        let path = path.as_ref();
        let source = FileSource::open(path).map_err(|e| DbfError::io(path.display().to_string(), e))?;
        Self::from_source(source, path, options)
    }
}

impl<S: ByteSource> Table<S> {
    /// Open a table over any byte source. `path` locates the memo file.
    pub fn from_source<P: AsRef<Path>>(mut source: S, path: P, options: OpenOptions) -> DbfResult<Self> {
        let options = options.normalized();
        let path = path.as_ref().to_path_buf();

        let header_bytes = source
            .read_at(0, HEADER_SIZE)
            .map_err(|e| DbfError::io(format!("reading header of {}", path.display()), e))?
            .ok_or_else(|| DbfError::unexpected_eof(format!("reading header of {}", path.display())))?;
        let header = TableHeader::parse(&header_bytes, options.read_mode)?;

        let memo_path = discover_memo_file(&path, header.version, options.read_mode)?;
        let fields = read_field_descriptors(&mut source, &header, &options)?;
        check_record_length(&fields, &header, options.read_mode)?;

        debug!(
            "Opened {} version=0x{:02x} records={} fields={} record_length={} memo={:?} mode={}",
            path.display(),
            header.version,
            header.record_count,
            fields.len(),
            header.record_length,
            memo_path,
            options.read_mode
        );

        Ok(Self {
            path,
            header,
            fields,
            memo_path,
            options,
            records_read: 0,
            source,
        })
    }

    /// Read up to `max_count` records from the cursor; `0` reads all that remain.
    ///
    /// Every buffer consumed advances the cursor, including dropped and
    /// skipped records. An end of data before `record_count` ends the batch
    /// without error. In strict mode the first bad record fails the batch.
    pub fn read_records(&mut self, max_count: usize) -> DbfResult<Vec<Record>> {
        let record_count = self.header.record_count;
        let count = if max_count == 0 {
            self.remaining() as usize
        } else {
            max_count
        };
        if self.records_read >= record_count || count == 0 {
            return Ok(Vec::new());
        }

        let record_length = usize::from(self.header.record_length);
        let start = u64::from(self.header.header_length) + u64::from(self.records_read) * record_length as u64;
        let mut offset = start;

        let decoder = RecordDecoder::new(&self.fields, &self.options);
        let mut records = Vec::new();
        let mut consumed = 0;

        while consumed < count && self.records_read < record_count {
            let index = self.records_read;
            let Some(buf) = self
                .source
                .read_at(offset, record_length)
                .map_err(|e| DbfError::io(format!("reading record {index} of {}", self.path.display()), e))?
            else {
                debug!("End of data at record {index} of {}", self.path.display());
                break;
            };
            offset += record_length as u64;
            self.records_read += 1;
            consumed += 1;

            match decoder.decode(&buf)? {
                RecordOutcome::Record(record) => records.push(record),
                RecordOutcome::Dropped => {}
                RecordOutcome::Skipped(err) => warn!("Skipping record {index}: {err}"),
            }
        }

        debug!(
            "Read batch at offset {start}: requested={count} consumed={consumed} returned={}",
            records.len()
        );
        Ok(records)
    }

    /// Rewind the cursor to the first record
    pub fn reset(&mut self) {
        self.records_read = 0;
    }
}

impl<S> Table<S> {
    /// Raw format version byte
    pub fn version(&self) -> u8 {
        self.header.version
    }

    /// Known format revision, if the version byte is one
    pub fn dbase_version(&self) -> Option<DbaseVersion> {
        self.header.dbase_version()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record_count(&self) -> u32 {
        self.header.record_count
    }

    pub fn last_update(&self) -> LastUpdate {
        self.header.last_update
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn header_length(&self) -> u16 {
        self.header.header_length
    }

    pub fn record_length(&self) -> u16 {
        self.header.record_length
    }

    pub fn memo_path(&self) -> Option<&Path> {
        self.memo_path.as_deref()
    }

    pub fn options(&self) -> &OpenOptions {
        &self.options
    }

    /// Records consumed since open or the last reset
    pub fn records_read(&self) -> u32 {
        self.records_read
    }

    pub fn remaining(&self) -> u32 {
        self.header.record_count.saturating_sub(self.records_read)
    }
}
