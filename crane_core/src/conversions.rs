//! `From` implementations bridging `crane_config` types to `crane_core` types.

use crate::calibration::{CalibrationModel, DEFAULT_TABLE};
use crate::config::{DispatchMode, PipelineCfg, SourceCfg};
use crate::error::{CalibrationError, TelemetryError};

// ── PipelineCfg ──────────────────────────────────────────────────────────────

impl From<&crane_config::Config> for PipelineCfg {
    fn from(c: &crane_config::Config) -> Self {
        Self {
            max_line_len: c.framing.max_line_len,
            window: c.smoothing.window,
            cranes: c.filter.cranes.clone(),
        }
    }
}

// ── SourceCfg ────────────────────────────────────────────────────────────────

impl From<&crane_config::SerialCfg> for SourceCfg {
    fn from(c: &crane_config::SerialCfg) -> Self {
        Self {
            read_timeout_ms: c.read_timeout_ms,
            max_consecutive_errors: c.max_consecutive_errors,
        }
    }
}

// ── DispatchMode ─────────────────────────────────────────────────────────────

impl From<&crane_config::DispatchCfg> for DispatchMode {
    fn from(c: &crane_config::DispatchCfg) -> Self {
        match c.mode {
            crane_config::DispatchMode::Direct => DispatchMode::Direct,
            crane_config::DispatchMode::Queued => DispatchMode::Queued {
                depth: c.queue_depth.max(2),
            },
        }
    }
}

// ── Calibration ──────────────────────────────────────────────────────────────

impl TryFrom<&[crane_config::CalibrationRow]> for CalibrationModel {
    type Error = CalibrationError;
    fn try_from(rows: &[crane_config::CalibrationRow]) -> Result<Self, Self::Error> {
        let points: Vec<(i64, f64)> = rows.iter().copied().map(Into::into).collect();
        CalibrationModel::fit(&points)
    }
}

/// Resolve the calibration from config: `csv` rows (already loaded by the caller),
/// then inline `points`, then persisted `slope`/`intercept`, then the factory table.
pub fn calibration_from_config(
    cfg: &crane_config::CalibrationCfg,
    csv_rows: Option<&[crane_config::CalibrationRow]>,
) -> Result<CalibrationModel, TelemetryError> {
    let model = if let Some(rows) = csv_rows {
        CalibrationModel::try_from(rows)?
    } else if let Some(points) = &cfg.points {
        CalibrationModel::fit(points)?
    } else if let (Some(slope), Some(intercept)) = (cfg.slope, cfg.intercept) {
        CalibrationModel::from_coefficients(slope, intercept)?
    } else {
        CalibrationModel::fit(&DEFAULT_TABLE)?
    };
    tracing::info!(
        slope = model.slope(),
        intercept = model.intercept(),
        "calibration ready"
    );
    Ok(model)
}
