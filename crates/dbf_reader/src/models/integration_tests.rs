//! End-to-end tests against a three-record table that uses every field type.
//!
//! Fields: NAME(C,10) AGE(N,5) BALANCE(F,10,2) CURR(Y,8,4) ACTIVE(L,1)
//! BIRTH(D,8) COUNT(I,4) RATIO(B,8) STAMP(T,8) MEMO(M,10). The third
//! record carries a deletion marker.

#[cfg(test)]
mod integration_tests {
    use std::path::PathBuf;

    use chrono::{DateTime, TimeZone, Utc};
    use tempfile::TempDir;

    use crate::errors::DbfError;
    use crate::models::describe::records_to_json;
    use crate::models::field::{Field, FieldType};
    use crate::models::header::{DbaseVersion, LastUpdate};
    use crate::models::options::{OpenOptions, ReadMode};
    use crate::models::table::Table;
    use crate::models::value::{DELETED_KEY, FieldValue, Record};

    const ALL_FIELDS_DBF: [u8; 573] = [
        0x03, 0x7c, 0x01, 0x01, 0x03, 0x00, 0x00, 0x00, 0x61, 0x01, 0x49, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x4e, 0x41, 0x4d, 0x45,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x43, 0x00, 0x00, 0x00, 0x00,
        0x0a, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x41, 0x47, 0x45, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x4e, 0x00, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x42, 0x41, 0x4c, 0x41, 0x4e, 0x43, 0x45, 0x00, 0x00, 0x00, 0x00, 0x46,
        0x00, 0x00, 0x00, 0x00, 0x0a, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x43, 0x55, 0x52, 0x52,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x59, 0x00, 0x00, 0x00, 0x00,
        0x08, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x41, 0x43, 0x54, 0x49, 0x56, 0x45, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x4c, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x42, 0x49, 0x52, 0x54, 0x48, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x44,
        0x00, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x43, 0x4f, 0x55, 0x4e,
        0x54, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x49, 0x00, 0x00, 0x00, 0x00,
        0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x52, 0x41, 0x54, 0x49, 0x4f, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x42, 0x00, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x53, 0x54, 0x41, 0x4d, 0x50, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x54,
        0x00, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x4d, 0x45, 0x4d, 0x4f,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x4d, 0x00, 0x00, 0x00, 0x00,
        0x0a, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x0d, 0x20, 0x4a, 0x6f, 0x73, 0xe9, 0x20, 0x20,
        0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x34, 0x32, 0x20, 0x20, 0x20,
        0x20, 0x31, 0x32, 0x33, 0x2e, 0x34, 0x35, 0x08, 0xe2, 0x01, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x54, 0x31, 0x39, 0x39, 0x30, 0x30, 0x31, 0x30, 0x31,
        0x40, 0xe2, 0x01, 0x00, 0x6e, 0x86, 0x1b, 0xf0, 0xf9, 0x21, 0x09, 0x40,
        0x0c, 0x8a, 0x25, 0x00, 0x18, 0x58, 0x26, 0x05, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20,
        0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20,
        0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x88, 0xf5, 0x1c, 0xfa,
        0xff, 0xff, 0xff, 0xff, 0x46, 0x32, 0x30, 0x32, 0x31, 0x31, 0x32, 0x33,
        0x31, 0xce, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0x00, 0x40, 0x45,
        0xc0, 0x27, 0x85, 0x25, 0x00, 0xd8, 0x25, 0xd3, 0x01, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2a, 0x44, 0x65, 0x6c, 0x65,
        0x74, 0x65, 0x64, 0x20, 0x20, 0x20, 0x20, 0x20, 0x20, 0x39, 0x39, 0x20,
        0x20, 0x20, 0x20, 0x20, 0x20, 0x31, 0x2e, 0x32, 0x33, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x3f, 0x32, 0x30, 0x30, 0x30, 0x30, 0x31,
        0x30, 0x31, 0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x04, 0x40, 0xe1, 0x84, 0x25, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1a,
    ];

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn write_fixture(dir: &TempDir, name: &str, patch: impl FnOnce(&mut Vec<u8>)) -> PathBuf {
        init_logger();
        let mut bytes = ALL_FIELDS_DBF.to_vec();
        patch(&mut bytes);
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).expect("failed to write fixture");
        path
    }

    fn all_fields_fixture(dir: &TempDir) -> PathBuf {
        write_fixture(dir, "all_fields.dbf", |_| {})
    }

    fn loose() -> OpenOptions {
        OpenOptions::default().with_read_mode(ReadMode::Loose)
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn number(record: &Record, name: &str) -> f64 {
        record
            .get(name)
            .and_then(FieldValue::as_f64)
            .unwrap_or_else(|| panic!("{name} = {:?}, want a number", record.get(name)))
    }

    fn assert_absent(record: &Record, name: &str) {
        assert_eq!(record.get(name), Some(&FieldValue::Null), "{name} should be present and absent-valued");
    }

    #[test]
    fn test_open_reads_header_and_fields() {
        let dir = TempDir::new().unwrap();
        let path = all_fields_fixture(&dir);

        let table = Table::open(&path, OpenOptions::default()).unwrap();
        assert_eq!(table.record_count(), 3);
        assert_eq!(table.version(), 0x03);
        assert_eq!(table.dbase_version(), Some(DbaseVersion::DBase3));
        assert_eq!(table.last_update(), LastUpdate { year: 2024, month: 1, day: 1 });
        assert_eq!(table.header_length(), 353);
        assert_eq!(table.record_length(), 73);
        assert_eq!(table.memo_path(), None);
        assert_eq!(table.path(), path.as_path());

        let expected = vec![
            Field::new("NAME", FieldType::Character, 10, 0),
            Field::new("AGE", FieldType::Numeric, 5, 0),
            Field::new("BALANCE", FieldType::Float, 10, 2),
            Field::new("CURR", FieldType::Currency, 8, 4),
            Field::new("ACTIVE", FieldType::Logical, 1, 0),
            Field::new("BIRTH", FieldType::Date, 8, 0),
            Field::new("COUNT", FieldType::Integer, 4, 0),
            Field::new("RATIO", FieldType::Double, 8, 0),
            Field::new("STAMP", FieldType::DateTime, 8, 0),
            Field::new("MEMO", FieldType::Memo, 10, 0),
        ];
        assert_eq!(table.fields(), expected.as_slice());
    }

    #[test]
    fn test_read_records_parses_all_field_types() {
        let dir = TempDir::new().unwrap();
        let mut table = Table::open(all_fields_fixture(&dir), loose()).unwrap();

        let records = table.read_records(0).unwrap();
        assert_eq!(records.len(), 2);

        let rec1 = &records[0];
        assert_eq!(rec1.get("NAME"), Some(&FieldValue::Text("José".into())));
        assert_eq!(number(rec1, "AGE"), 42.0);
        assert!((number(rec1, "BALANCE") - 123.45).abs() < 1e-6);
        assert!((number(rec1, "CURR") - 12.34).abs() < 1e-6);
        assert_eq!(rec1.get("ACTIVE"), Some(&FieldValue::Boolean(true)));
        assert_eq!(rec1.get("BIRTH"), Some(&FieldValue::Timestamp(utc(1990, 1, 1, 0, 0, 0))));
        assert_eq!(rec1.get("COUNT"), Some(&FieldValue::Integer(123_456)));
        assert!((number(rec1, "RATIO") - 3.14159).abs() < 1e-9);
        assert_eq!(rec1.get("STAMP"), Some(&FieldValue::Timestamp(utc(2023, 8, 15, 23, 59, 59))));
        assert_absent(rec1, "MEMO");
        assert!(!rec1.contains_key(DELETED_KEY));
        assert_eq!(rec1.len(), 10);

        let rec2 = &records[1];
        assert_eq!(rec2.get("NAME"), Some(&FieldValue::Text(String::new())));
        assert_absent(rec2, "AGE");
        assert_absent(rec2, "BALANCE");
        assert!((number(rec2, "CURR") + 9876.5432).abs() < 1e-6);
        assert_eq!(rec2.get("ACTIVE"), Some(&FieldValue::Boolean(false)));
        assert_eq!(rec2.get("BIRTH"), Some(&FieldValue::Timestamp(utc(2021, 12, 31, 0, 0, 0))));
        assert_eq!(rec2.get("COUNT"), Some(&FieldValue::Integer(-50)));
        assert!((number(rec2, "RATIO") + 42.5).abs() < 1e-9);
        assert_eq!(rec2.get("STAMP"), Some(&FieldValue::Timestamp(utc(2020, 3, 10, 8, 30, 15))));
        assert_absent(rec2, "MEMO");

        // exhausted cursor keeps returning nothing
        for _ in 0..3 {
            assert!(table.read_records(0).unwrap().is_empty());
        }
        assert_eq!(table.records_read(), 3);
    }

    #[test]
    fn test_read_records_include_deleted() {
        let dir = TempDir::new().unwrap();
        let mut table = Table::open(all_fields_fixture(&dir), loose().with_include_deleted(true)).unwrap();

        let records = table.read_records(0).unwrap();
        assert_eq!(records.len(), 3);
        assert!(!records[0].is_deleted());
        assert!(!records[1].is_deleted());

        let del = &records[2];
        assert!(del.is_deleted());
        assert_eq!(del.get(DELETED_KEY), Some(&FieldValue::Boolean(true)));
        assert_eq!(del.keys().last(), Some(DELETED_KEY));
        assert_eq!(del.get("NAME"), Some(&FieldValue::Text("Deleted".into())));
        assert_eq!(number(del, "AGE"), 99.0);
        assert!((number(del, "BALANCE") - 1.23).abs() < 1e-6);
        assert!(number(del, "CURR").abs() < 1e-9);
        assert_absent(del, "ACTIVE");
        assert_eq!(del.get("BIRTH"), Some(&FieldValue::Timestamp(utc(2000, 1, 1, 0, 0, 0))));
        assert_eq!(del.get("COUNT"), Some(&FieldValue::Integer(7)));
        assert!((number(del, "RATIO") - 2.5).abs() < 1e-9);
        assert_eq!(del.get("STAMP"), Some(&FieldValue::Timestamp(utc(2019, 12, 31, 0, 0, 0))));
        assert_absent(del, "MEMO");
    }

    #[test]
    fn test_reset_reproduces_first_scan() {
        let dir = TempDir::new().unwrap();
        let mut table = Table::open(all_fields_fixture(&dir), loose().with_include_deleted(true)).unwrap();

        let first = table.read_records(0).unwrap();
        assert!(table.read_records(0).unwrap().is_empty());

        table.reset();
        assert_eq!(table.records_read(), 0);
        let second = table.read_records(0).unwrap();

        assert_eq!(first, second);
        assert_eq!(records_to_json(&first).unwrap(), records_to_json(&second).unwrap());
    }

    #[test]
    fn test_read_in_batches() {
        let dir = TempDir::new().unwrap();
        let mut table = Table::open(all_fields_fixture(&dir), loose()).unwrap();

        let batch = table.read_records(1).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(table.records_read(), 1);
        assert_eq!(table.remaining(), 2);

        // second record is kept, third is dropped as deleted
        let batch = table.read_records(5).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].get("COUNT"), Some(&FieldValue::Integer(-50)));
        assert_eq!(table.remaining(), 0);
    }

    #[test]
    fn test_strict_read_fails_on_memo_field() {
        let dir = TempDir::new().unwrap();
        let mut table = Table::open(all_fields_fixture(&dir), OpenOptions::default()).unwrap();

        let err = table.read_records(0).unwrap_err();
        assert!(matches!(err, DbfError::MemoUnsupported(ref name) if name == "MEMO"));
        assert!(err.is_format_error());
    }

    #[test]
    fn test_strict_record_length_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "bad_len.dbf", |bytes| bytes[10] = 0x4a);

        let err = Table::open(&path, OpenOptions::default()).unwrap_err();
        assert!(matches!(err, DbfError::RecordLengthMismatch { header: 74, computed: 73 }));

        let table = Table::open(&path, loose()).unwrap();
        assert_eq!(table.record_length(), 74);
    }

    #[test]
    fn test_dbase_memo_file_discovery() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "memo.dbf", |bytes| bytes[0] = 0x83);

        let err = Table::open(&path, OpenOptions::default()).unwrap_err();
        assert!(matches!(err, DbfError::MissingMemoFile(_)));

        let table = Table::open(&path, loose()).unwrap();
        assert_eq!(table.memo_path(), None);

        let memo = dir.path().join("memo.dbt");
        std::fs::write(&memo, b"").unwrap();
        let table = Table::open(&path, OpenOptions::default()).unwrap();
        assert_eq!(table.memo_path(), Some(memo.as_path()));
        assert_eq!(table.dbase_version(), Some(DbaseVersion::DBase3Memo));
    }

    #[test]
    fn test_visual_foxpro_memo_width() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "vfp.dbf", |bytes| bytes[0] = 0x30);

        // MEMO is 10 bytes wide but Visual FoxPro memo fields are 4
        let err = Table::open(&path, OpenOptions::default()).unwrap_err();
        assert!(matches!(err, DbfError::InvalidFieldSize { ref field, size: 10, .. } if field == "MEMO"));

        let mut table = Table::open(&path, loose()).unwrap();
        assert_eq!(table.memo_path(), None);
        assert_eq!(table.read_records(0).unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_version_in_file() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "odd.dbf", |bytes| bytes[0] = 0x04);

        assert!(matches!(
            Table::open(&path, OpenOptions::default()),
            Err(DbfError::UnsupportedVersion(0x04))
        ));
        assert_eq!(Table::open(&path, loose()).unwrap().version(), 0x04);
    }

    #[test]
    fn test_unknown_field_type_is_omitted_in_loose_mode() {
        let dir = TempDir::new().unwrap();
        // retype ACTIVE (fifth descriptor) from 'L' to 'Q'
        let path = write_fixture(&dir, "odd_type.dbf", |bytes| bytes[32 + 4 * 32 + 11] = b'Q');

        let err = Table::open(&path, OpenOptions::default()).unwrap_err();
        assert!(matches!(err, DbfError::UnsupportedFieldType { code: 'Q', .. }));

        let mut table = Table::open(&path, loose()).unwrap();
        let records = table.read_records(0).unwrap();
        assert_eq!(records.len(), 2);
        assert!(!records[0].contains_key("ACTIVE"));
        assert_eq!(records[0].len(), 9);
        assert_eq!(records[0].get("BIRTH"), Some(&FieldValue::Timestamp(utc(1990, 1, 1, 0, 0, 0))));
    }

    #[test]
    fn test_per_field_encoding_override() {
        let dir = TempDir::new().unwrap();
        let options = loose().with_field_encoding("NAME", "UTF-8");
        let mut table = Table::open(all_fields_fixture(&dir), options).unwrap();

        // field names still decode with the table default
        assert_eq!(table.fields()[0].name, "NAME");
        let records = table.read_records(1).unwrap();
        assert_eq!(records[0].get("NAME"), Some(&FieldValue::Text("Jos\u{fffd}".into())));
    }

    #[test]
    fn test_options_from_json() {
        let dir = TempDir::new().unwrap();
        let options = OpenOptions::from_json(r#"{"read_mode": "loose", "include_deleted": true}"#).unwrap();
        let mut table = Table::open(all_fields_fixture(&dir), options).unwrap();
        assert_eq!(table.read_records(0).unwrap().len(), 3);
    }

    #[test]
    fn test_summary() {
        let dir = TempDir::new().unwrap();
        let options = OpenOptions::default().with_field_encoding("NAME", "cp850");
        let table = Table::open(all_fields_fixture(&dir), options).unwrap();

        let summary = table.summary();
        assert_eq!(summary.n_columns, 10);
        assert_eq!(summary.n_rows, 3);
        assert_eq!(summary.version, 0x03);
        assert_eq!(summary.version_name.as_deref(), Some("dBase III (0x03)"));
        assert_eq!(summary.memo_file, None);
        assert_eq!(summary.fields[0].encoding, "CP850");
        assert_eq!(summary.fields[1].encoding, "ISO-8859-1");
        assert_eq!(summary.fields[3].code, 'Y');
        assert_eq!(summary.fields[3].decimal_places, 4);

        let json = crate::models::describe::summary_to_json(&summary).unwrap();
        assert!(json.contains(r#""field_type":"Currency""#));
    }

    #[test]
    fn test_records_to_json() {
        let dir = TempDir::new().unwrap();
        let mut table = Table::open(all_fields_fixture(&dir), loose()).unwrap();
        let records = table.read_records(1).unwrap();

        let json = records_to_json(&records).unwrap();
        assert!(json.starts_with(r#"[{"NAME":"José","AGE":42.0,"#));
        assert!(json.contains(r#""STAMP":"2023-08-15T23:59:59Z""#));
        assert!(json.contains(r#""MEMO":null"#));
    }

    #[test]
    fn test_independent_handles_keep_own_cursor() {
        let dir = TempDir::new().unwrap();
        let path = all_fields_fixture(&dir);
        let mut a = Table::open(&path, loose()).unwrap();
        let mut b = Table::open(&path, loose()).unwrap();

        a.read_records(0).unwrap();
        assert_eq!(a.records_read(), 3);
        assert_eq!(b.records_read(), 0);
        assert_eq!(b.read_records(0).unwrap().len(), 2);
    }

    #[test]
    fn test_truncated_file_stops_without_error() {
        let dir = TempDir::new().unwrap();
        // keep the header and the first record plus half of the second
        let path = write_fixture(&dir, "short.dbf", |bytes| bytes.truncate(353 + 73 + 30));

        let mut table = Table::open(&path, loose()).unwrap();
        let records = table.read_records(0).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(table.records_read(), 1);
        assert!(table.path().exists());
    }
}
