mod common;

use common::record;
use crane_sinks::DatabaseSink;
use crane_traits::{FailurePolicy, Sink};
use rusqlite::Connection;

#[test]
fn rows_land_in_per_crane_tables() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("telemetry.db");
    let mut sink = DatabaseSink::open(&path).unwrap();
    assert_eq!(sink.failure_policy(), FailurePolicy::LogAndContinue);

    sink.persist(&record(3, 1639, 0)).unwrap();
    sink.persist(&record(3, 1700, 1)).unwrap();
    sink.persist(&record(17, 900, 2)).unwrap();
    assert_eq!(sink.row_count(3).unwrap(), 2);
    assert_eq!(sink.row_count(17).unwrap(), 1);
    assert_eq!(sink.row_count(99).unwrap(), 0);
    sink.close().unwrap();

    let conn = Connection::open(&path).unwrap();
    let (time, adc, x, y): (String, i64, i32, i32) = conn
        .query_row(
            "SELECT time, raw_adc, x, y FROM crane3 ORDER BY rowid LIMIT 1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .unwrap();
    assert_eq!(time, "2024-05-02T07:30:00.000000");
    assert_eq!((adc, x, y), (1639, 120, 45));
}

#[test]
fn reopening_appends_to_existing_tables() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("t.db");
    for seq in 0..2 {
        let mut sink = DatabaseSink::open(&path).unwrap();
        sink.persist(&record(3, 1000, seq)).unwrap();
        sink.close().unwrap();
    }
    let sink = DatabaseSink::open(&path).unwrap();
    assert_eq!(sink.row_count(3).unwrap(), 2);
}

#[test]
fn persist_after_close_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = DatabaseSink::open(dir.path().join("t.db")).unwrap();
    sink.close().unwrap();
    let err = sink.persist(&record(3, 1, 0)).unwrap_err();
    assert!(err.to_string().contains("closed"));
}
