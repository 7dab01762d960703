//! Human-readable error descriptions and structured JSON error formatting.

use crane_core::{CalibrationError, TelemetryError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    // Calibration CSV header special-case
    if lower.contains("calibration csv must have headers") {
        return "Invalid headers in calibration CSV. Expected 'adc,mass'.".to_string();
    }

    if let Some(te) = err.downcast_ref::<TelemetryError>() {
        return match te {
            TelemetryError::Connection(m) => format!(
                "What happened: The telemetry link failed ({m}).\nLikely causes: Wrong --port, radio coordinator unplugged, or missing permission on the device.\nHow to fix: Check the device path and cable, make sure your user can read it (e.g. dialout group), then rerun."
            ),
            TelemetryError::CalibrationFit(CalibrationError::Table(m)) => format!(
                "What happened: The calibration table could not be read ({m}).\nLikely causes: Wrong path or a CSV that is not 'adc,mass' rows.\nHow to fix: Point --calibration (or calibration.csv) at a CSV with headers 'adc,mass'."
            ),
            TelemetryError::CalibrationFit(ce) => format!(
                "What happened: Calibration failed ({ce}).\nLikely causes: Fewer than two distinct ADC values, or non-numeric masses.\nHow to fix: Add more reference weights to the table, or set calibration.slope/intercept in the config."
            ),
            TelemetryError::SinkWrite { sink, message } => format!(
                "What happened: The {sink} destination failed ({message}).\nLikely causes: Disk full, read-only location, or the file is locked by another program.\nHow to fix: Check free space and permissions of the destination, close other programs using it, then rerun."
            ),
            TelemetryError::Config(m) => format!(
                "What happened: Invalid configuration ({m}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
            TelemetryError::State(m) => format!(
                "What happened: Internal state error ({m}).\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    if lower.contains("read config") || lower.contains("parse config") || lower.contains("must be") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: A typo or out-of-range value in the TOML.\nHow to fix: Edit the config file and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable name of the error kind, used in JSON output.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<TelemetryError>() {
        Some(TelemetryError::Connection(_)) => "Connection",
        Some(TelemetryError::CalibrationFit(_)) => "Calibration",
        Some(TelemetryError::SinkWrite { .. }) => "SinkWrite",
        Some(TelemetryError::Config(_)) => "Config",
        Some(TelemetryError::State(_)) => "State",
        None => "Error",
    }
}

/// 3 connection, 4 calibration, 5 sink, 1 anything else (clap uses 2).
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<TelemetryError>() {
        Some(TelemetryError::Connection(_)) => 3,
        Some(TelemetryError::CalibrationFit(_)) => 4,
        Some(TelemetryError::SinkWrite { .. }) => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_errors_map_to_exit_codes() {
        let cases = [
            (TelemetryError::Connection("gone".into()), 3, "Connection"),
            (CalibrationError::Degenerate.into(), 4, "Calibration"),
            (
                TelemetryError::SinkWrite {
                    sink: "spreadsheet",
                    message: "disk full".into(),
                },
                5,
                "SinkWrite",
            ),
            (TelemetryError::State("x".into()), 1, "State"),
        ];
        for (te, code, name) in cases {
            let report = eyre::Report::new(te);
            assert_eq!(exit_code_for_error(&report), code);
            assert_eq!(reason_name(&report), name);
        }
        assert_eq!(exit_code_for_error(&eyre::eyre!("boom")), 1);
    }

    #[test]
    fn json_error_has_reason_and_message() {
        let report = eyre::Report::new(TelemetryError::Connection("no such device".into()));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&report)).unwrap();
        assert_eq!(v["reason"], "Connection");
        assert_eq!(v["exit_code"], 3);
        assert!(v["message"].as_str().unwrap().contains("no such device"));
    }

    #[test]
    fn header_error_is_short() {
        let report = eyre::Report::new(TelemetryError::CalibrationFit(CalibrationError::Table(
            "calibration CSV must have headers 'adc,mass', got: raw,value".into(),
        )));
        assert_eq!(
            humanize(&report),
            "Invalid headers in calibration CSV. Expected 'adc,mass'."
        );
    }
}
