pub mod source;
pub mod codepage;
pub mod datetime;
pub mod options;
pub mod header;
pub mod field;
pub mod value;
pub mod record;
pub mod table;
pub mod describe;
mod integration_tests;

pub use source::{ByteSource, FileSource, MemorySource};
pub use codepage::{DEFAULT_ENCODING, Encoding, EncodingConfig};
pub use datetime::{datetime_to_julian, julian_day_number, julian_to_datetime, parse_dbase_date};
pub use options::{OpenOptions, ReadMode};
pub use header::{DbaseVersion, LastUpdate, MemoFamily, TableHeader, discover_memo_file};
pub use field::{Field, FieldType, read_field_descriptors};
pub use value::{DELETED_KEY, FieldValue, Record};
pub use record::{FieldOutcome, RecordDecoder, RecordOutcome, decode_field};
pub use table::Table;
pub use describe::{
    FieldSummary, TableSummary, dbf_file_exists, records_to_json, records_to_json_pretty,
    summary_to_json,
};
