use std::fs::File;
use std::io::Write;

use crane_config::{CalibrationRow, load_calibration_csv};
use rstest::rstest;
use tempfile::tempdir;

fn write_csv(lines: &[&str]) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("calib.csv");
    let mut f = File::create(&path).unwrap();
    for l in lines {
        writeln!(f, "{l}").unwrap();
    }
    (dir, path)
}

#[rstest]
fn loads_lowercase_headers() {
    let (_dir, path) = write_csv(&["adc,mass", "657,0.0", "1639,2.466"]);
    let rows = load_calibration_csv(&path).unwrap();
    assert_eq!(
        rows,
        vec![
            CalibrationRow { adc: 657, mass: 0.0 },
            CalibrationRow {
                adc: 1639,
                mass: 2.466
            },
        ]
    );
}

#[rstest]
fn loads_capitalised_headers_from_training_logger() {
    let (_dir, path) = write_csv(&["ADC,Mass", "657, 0.0", "3808, 6.9"]);
    let rows = load_calibration_csv(&path).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].adc, 3808);
}

#[rstest]
#[case(&["raw,grams", "1,0.0"], "must have headers 'adc,mass'")]
#[case(&["adc,mass"], "no data rows")]
#[case(&["adc,mass", "657,zero"], "invalid csv row 2")]
fn rejects_bad_files(#[case] lines: &[&str], #[case] needle: &str) {
    let (_dir, path) = write_csv(lines);
    let err = load_calibration_csv(&path).expect_err("should fail");
    assert!(
        format!("{err}").to_lowercase().contains(needle),
        "expected '{needle}' in '{err}'"
    );
}

#[rstest]
fn missing_file_names_the_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.csv");
    let err = load_calibration_csv(&path).expect_err("missing file");
    assert!(format!("{err}").contains("absent.csv"));
}
