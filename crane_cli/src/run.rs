//! Ingest run: config mapping, source and sink assembly, summary output.

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crane_config::Config;
use crane_core::conversions::calibration_from_config;
use crane_core::error::Result as CoreResult;
use crane_core::{
    CalibrationError, CalibrationModel, DispatchMode, PipelineCfg, RunParams, RunSummary,
    SourceCfg, TelemetryError,
};
use crane_sinks::{Destination, SinkOptions};

/// Calibration precedence: `--calibration` CSV, then the config
/// (`csv`, `points`, `slope`/`intercept`), then the factory table.
pub fn resolve_calibration(cli_csv: Option<&Path>, cfg: &Config) -> CoreResult<CalibrationModel> {
    let csv_path = cli_csv.or(cfg.calibration.csv.as_deref());
    let rows = match csv_path {
        Some(path) => {
            let rows = crane_config::load_calibration_csv(path)
                .map_err(|e| TelemetryError::CalibrationFit(CalibrationError::Table(e.to_string())))?;
            tracing::info!(path = %path.display(), rows = rows.len(), "calibration CSV loaded");
            Some(rows)
        }
        None => None,
    };
    Ok(calibration_from_config(&cfg.calibration, rows.as_deref())?)
}

/// Effective run parameters: config values with CLI overrides applied.
pub fn run_params(cfg: &Config, direct: bool, cranes: &[u32], max_records: Option<u64>) -> RunParams {
    let mut pipeline = PipelineCfg::from(cfg);
    if !cranes.is_empty() {
        pipeline.cranes = cranes.to_vec();
    }
    let dispatch = if direct {
        DispatchMode::Direct
    } else {
        DispatchMode::from(&cfg.dispatch)
    };
    RunParams {
        pipeline,
        source: SourceCfg::from(&cfg.serial),
        dispatch,
        max_records,
    }
}

pub struct IngestArgs<'a> {
    pub port: &'a str,
    pub baud: u32,
    pub destination: Destination,
    pub calibration: Option<&'a Path>,
    pub params: RunParams,
}

pub fn run_ingest(cfg: &Config, args: IngestArgs<'_>, shutdown: &AtomicBool) -> CoreResult<RunSummary> {
    let model = resolve_calibration(args.calibration, cfg)?;

    let timeout = Duration::from_millis(args.params.source.read_timeout_ms);
    let source = crane_io::open_port(args.port, args.baud, timeout).map_err(|e| {
        TelemetryError::Connection(format!("could not open {}: {e}", args.port))
    })?;
    tracing::info!(port = args.port, baud = args.baud, "byte source open");

    let opts = SinkOptions {
        commit_every: cfg.spreadsheet.commit_every,
        batch_size: cfg.publish.batch_size,
    };
    let sink = crane_sinks::open_sink(&args.destination, opts).map_err(|e| {
        TelemetryError::SinkWrite {
            sink: args.destination.label(),
            message: e.to_string(),
        }
    })?;

    crane_core::run(source, sink, model, args.params, shutdown)
}

/// Summary printed when the run ends normally.
pub fn summary_json(s: &RunSummary) -> serde_json::Value {
    serde_json::json!({
        "summary": {
            "bytes": s.bytes,
            "lines": s.lines,
            "emitted": s.emitted,
            "dropped": {
                "incomplete": s.incomplete,
                "malformed": s.malformed,
                "overflowed": s.overflowed,
                "ignored": s.ignored,
            },
            "undecodable": s.undecodable,
            "sink_failures": s.sink_failures,
            "queue_overflows": s.queue_overflows,
        }
    })
}

pub fn print_summary(s: &RunSummary) {
    eprintln!("\n--- Ingest Summary ---");
    eprintln!("Bytes read: {}", s.bytes);
    eprintln!("Lines: {} ({} emitted, {} dropped)", s.lines, s.emitted, s.dropped());
    eprintln!(
        "Dropped: {} incomplete / {} malformed / {} overflowed / {} ignored",
        s.incomplete, s.malformed, s.overflowed, s.ignored
    );
    eprintln!("Undecodable bytes: {}", s.undecodable);
    eprintln!("Sink failures: {}  Queue overflows: {}", s.sink_failures, s.queue_overflows);
    eprintln!("----------------------\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_crane_list_overrides_config() {
        let mut cfg = Config::default();
        cfg.filter.cranes = vec![3];
        let p = run_params(&cfg, false, &[17, 42], None);
        assert_eq!(p.pipeline.cranes, vec![17, 42]);
        assert_eq!(p.dispatch, DispatchMode::Queued { depth: 64 });
        let p = run_params(&cfg, true, &[], Some(5));
        assert_eq!(p.pipeline.cranes, vec![3]);
        assert_eq!(p.dispatch, DispatchMode::Direct);
        assert_eq!(p.max_records, Some(5));
    }

    #[test]
    fn default_calibration_is_the_factory_fit() {
        let m = resolve_calibration(None, &Config::default()).unwrap();
        assert_eq!(m, CalibrationModel::factory().unwrap());
    }

    #[test]
    fn unreadable_csv_is_a_calibration_error() {
        let err = resolve_calibration(Some(Path::new("/no/such/calib.csv")), &Config::default())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TelemetryError>(),
            Some(TelemetryError::CalibrationFit(CalibrationError::Table(_)))
        ));
    }
}
