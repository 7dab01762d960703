use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

const CAPTURE: &[u8] = b"i3 m1639 x120 y45\r\ni3 m1700 x121 y45\r\ni3 k\r\ni17 m900 x5 y6\r\ni3 mXX x1 y1\r\n";

fn write_capture(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("capture.bin");
    fs::write(&path, CAPTURE).unwrap();
    path
}

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("crane-telemetry").unwrap();
    cmd.arg("--log-level").arg("error");
    cmd
}

fn rows(db: &Path, table: &str) -> i64 {
    let conn = rusqlite::Connection::open(db).unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
        .unwrap()
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["-p", "sim"], 2, "required", "stderr")]
#[case(&["-p", "sim", "-d", "a.db", "-t", "cranes"], 2, "cannot be used with", "stderr")]
#[case(&["-d", "a.db"], 2, "--port", "stderr")]
#[case(&["-d", "a.db"], 2, "serial.port", "stderr")]
#[case(&["-p", "/no/such/port", "-t", "cranes"], 3, "telemetry link failed", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let mut cmd = bin();
    cmd.current_dir(dir.path());
    for a in args {
        cmd.arg(a);
    }
    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn capture_file_into_database() {
    let dir = tempdir().unwrap();
    let capture = write_capture(&dir);
    let db = dir.path().join("telemetry.db");

    bin()
        .arg("-p")
        .arg(&capture)
        .arg("-d")
        .arg(&db)
        .assert()
        .success()
        .stderr(predicate::str::contains("4 emitted"));

    assert_eq!(rows(&db, "crane3"), 3);
    assert_eq!(rows(&db, "crane17"), 1);
}

#[test]
fn crane_allow_list_limits_tables() {
    let dir = tempdir().unwrap();
    let capture = write_capture(&dir);
    let db = dir.path().join("t.db");

    bin()
        .arg("-p")
        .arg(&capture)
        .arg("-d")
        .arg(&db)
        .arg("--crane")
        .arg("17")
        .arg("--direct")
        .assert()
        .success();

    assert_eq!(rows(&db, "crane17"), 1);
    let conn = rusqlite::Connection::open(&db).unwrap();
    let has_crane3: bool = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE name = 'crane3')",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert!(!has_crane3);
}

#[test]
fn capture_file_into_spreadsheet() {
    let dir = tempdir().unwrap();
    let capture = write_capture(&dir);
    let book = dir.path().join("book");

    bin()
        .arg("-p")
        .arg(&capture)
        .arg("-e")
        .arg(&book)
        .assert()
        .success();

    let sheet = fs::read_to_string(book.join("Crane 3.csv")).unwrap();
    let lines: Vec<&str> = sheet.lines().collect();
    assert_eq!(lines[0], "Time,Raw ADC,Mass,X Position,Y Position");
    assert_eq!(lines.len(), 4);
    // Heartbeat row: last known ADC, sentinel position
    let heartbeat: Vec<&str> = lines[3].split(',').collect();
    assert_eq!(heartbeat[1], "1700");
    assert_eq!(heartbeat[3..], ["-1", "-1"]);
    assert!(book.join("Crane 17.csv").exists());
}

#[test]
fn topic_publishes_json_lines_on_stdout() {
    let dir = tempdir().unwrap();
    let capture = write_capture(&dir);

    let out = bin()
        .arg("-p")
        .arg(&capture)
        .arg("-t")
        .arg("site/cranes")
        .arg("--json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8_lossy(&out);
    let messages: Vec<serde_json::Value> = stdout
        .lines()
        .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
        .filter(|v| v.get("topic").is_some())
        .collect();
    // Partial batches are flushed at end of stream
    assert_eq!(messages.len(), 2, "stdout was: {stdout}");
    assert!(messages.iter().all(|m| m["topic"] == "site/cranes"));
    let crane3 = messages.iter().find(|m| m["payload"]["id"] == 3).unwrap();
    let updates = crane3["payload"]["updates"].as_array().unwrap();
    assert_eq!(updates.len(), 3);
    assert_eq!(updates[0]["a"], 1639);
    assert_eq!(updates[2]["x"], -1);

    let summary = stdout
        .lines()
        .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
        .find(|v| v.get("summary").is_some())
        .expect("summary line");
    assert_eq!(summary["summary"]["emitted"], 4);
    assert_eq!(summary["summary"]["dropped"]["malformed"], 1);
}

#[test]
fn simulator_stops_at_max_records() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("sim.db");
    bin()
        .args(["-p", "sim", "--max-records", "3", "-d"])
        .arg(&db)
        .assert()
        .success();
    assert_eq!(rows(&db, "crane3"), 3);
}

#[test]
fn cli_reports_bad_calibration_header() {
    let dir = tempdir().unwrap();
    let capture = write_capture(&dir);

    let bad_csv = dir.path().join("calib.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "raw,value").unwrap();
    writeln!(f, "100,0.0").unwrap();
    writeln!(f, "200,1.0").unwrap();

    bin()
        .arg("-p")
        .arg(&capture)
        .arg("-t")
        .arg("cranes")
        .arg("--calibration")
        .arg(&bad_csv)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Invalid headers"));
}

#[test]
fn calibration_csv_is_applied() {
    let dir = tempdir().unwrap();
    let capture = write_capture(&dir);
    let csv = dir.path().join("calib.csv");
    fs::write(&csv, "ADC,Mass\n0,0\n1000,2\n").unwrap();
    let db = dir.path().join("t.db");

    bin()
        .arg("-p")
        .arg(&capture)
        .arg("-d")
        .arg(&db)
        .arg("--calibration")
        .arg(&csv)
        .assert()
        .success();

    let conn = rusqlite::Connection::open(&db).unwrap();
    let mass: f64 = conn
        .query_row("SELECT instant_mass FROM crane3 ORDER BY rowid LIMIT 1", [], |r| r.get(0))
        .unwrap();
    assert!((mass - 3.278).abs() < 1e-9);
}

#[test]
fn json_mode_prints_structured_errors() {
    let dir = tempdir().unwrap();
    let out = bin()
        .args(["--json", "-p", "/no/such/port", "-t", "cranes"])
        .current_dir(dir.path())
        .assert()
        .code(3)
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8_lossy(&out);
    let err = stderr
        .lines()
        .filter_map(|l| serde_json::from_str::<serde_json::Value>(l).ok())
        .find(|v| v.get("reason").is_some())
        .expect("json error line");
    assert_eq!(err["reason"], "Connection");
    assert_eq!(err["exit_code"], 3);
}

#[test]
fn invalid_config_is_rejected() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, "[smoothing]\nwindow = 0\n").unwrap();
    bin()
        .arg("--config")
        .arg(&cfg)
        .args(["-p", "sim", "-t", "cranes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("smoothing.window"));
}

#[test]
fn config_file_supplies_smoothing_and_filter() {
    let dir = tempdir().unwrap();
    let capture = write_capture(&dir);
    let cfg = dir.path().join("cfg.toml");
    fs::write(
        &cfg,
        r#"
[smoothing]
window = 1

[filter]
cranes = [3]

[dispatch]
mode = "direct"

[calibration]
slope = 0.002
intercept = 0.0
"#,
    )
    .unwrap();
    let db = dir.path().join("t.db");

    bin()
        .arg("--config")
        .arg(&cfg)
        .arg("-p")
        .arg(&capture)
        .arg("-d")
        .arg(&db)
        .assert()
        .success();

    let conn = rusqlite::Connection::open(&db).unwrap();
    let (avg, inst): (f64, f64) = conn
        .query_row(
            "SELECT average_mass, instant_mass FROM crane3 ORDER BY rowid LIMIT 1 OFFSET 1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(avg, inst);
    assert!((inst - 3.4).abs() < 1e-9);
}

#[test]
fn config_supplies_the_port() {
    let dir = tempdir().unwrap();
    let capture = write_capture(&dir);
    let cfg = dir.path().join("cfg.toml");
    fs::write(
        &cfg,
        format!("[serial]\nport = {:?}\n", capture.display().to_string()),
    )
    .unwrap();
    let db = dir.path().join("t.db");

    bin()
        .arg("--config")
        .arg(&cfg)
        .arg("-d")
        .arg(&db)
        .assert()
        .success()
        .stderr(predicate::str::contains("4 emitted"));
    assert_eq!(rows(&db, "crane3"), 3);
}

#[test]
fn cli_port_overrides_config_port() {
    let dir = tempdir().unwrap();
    let capture = write_capture(&dir);
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, "[serial]\nport = \"/no/such/port\"\n").unwrap();
    let db = dir.path().join("t.db");

    bin()
        .arg("--config")
        .arg(&cfg)
        .arg("-p")
        .arg(&capture)
        .arg("-d")
        .arg(&db)
        .assert()
        .success();
    assert_eq!(rows(&db, "crane17"), 1);
}
