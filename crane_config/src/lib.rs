#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and calibration table parsing for the crane telemetry ingest.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//!   Every section is optional; defaults match the field deployment.
//! - Calibration CSV loader enforces headers and returns the raw
//!   `(adc, mass)` table; fitting happens in `crane_core`.
use serde::Deserialize;
use serde::de::Deserializer;
use std::path::PathBuf;

/// Calibration CSV schema.
///
/// Expected headers (case-insensitive):
/// adc,mass
///
/// Example:
/// adc,mass
/// 657,0.0
/// 1639,2.466
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct CalibrationRow {
    pub adc: i64,
    pub mass: f64,
}

impl From<CalibrationRow> for (i64, f64) {
    fn from(r: CalibrationRow) -> Self {
        (r.adc, r.mass)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SerialCfg {
    /// Device path of the radio coordinator (e.g. /dev/ttyUSB0). `-p` on the CLI overrides it.
    pub port: Option<String>,
    pub baud: u32,
    /// Per-read timeout; an expired read is an idle tick, not an error.
    pub read_timeout_ms: u64,
    /// Give up after this many consecutive failed reads (0 = never give up).
    pub max_consecutive_errors: u32,
}

impl Default for SerialCfg {
    fn default() -> Self {
        Self {
            port: None,
            baud: 38_400,
            read_timeout_ms: 1000,
            max_consecutive_errors: 50,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FramingCfg {
    /// Longest accepted line in bytes; longer lines are discarded up to their terminator.
    pub max_line_len: usize,
}

impl Default for FramingCfg {
    fn default() -> Self {
        Self { max_line_len: 512 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SmoothingCfg {
    /// Number of most recent mass samples averaged per crane.
    pub window: usize,
}

impl Default for SmoothingCfg {
    fn default() -> Self {
        Self { window: 15 }
    }
}

/// Calibration sources, in order of precedence: `csv`, `points`, `slope`/`intercept`.
/// When none is set the built-in factory table is fitted.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct CalibrationCfg {
    pub csv: Option<PathBuf>,
    /// Inline table. Accepts either:
    /// - array of tables: [{ adc = 657, mass = 0.0 }, ...]
    /// - array of tuples: [[657, 0.0], [1282, 1.488], ...]
    #[serde(deserialize_with = "de_points")]
    pub points: Option<Vec<(i64, f64)>>,
    /// Persisted fit (mass per ADC count).
    pub slope: Option<f64>,
    pub intercept: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FilterCfg {
    /// Accept only these crane ids. Empty accepts every crane.
    pub cranes: Vec<u32>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Sink runs on its own thread behind a bounded queue.
    #[default]
    Queued,
    /// Sink is called inline from the read loop.
    Direct,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DispatchCfg {
    pub mode: DispatchMode,
    /// Capacity of the record queue between parser and sink (queued mode only).
    pub queue_depth: usize,
}

impl Default for DispatchCfg {
    fn default() -> Self {
        Self {
            mode: DispatchMode::Queued,
            queue_depth: 64,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SpreadsheetCfg {
    /// Rows buffered before the sheet is reopened, appended and synced. 1 = every record.
    pub commit_every: usize,
}

impl Default for SpreadsheetCfg {
    fn default() -> Self {
        Self { commit_every: 1 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PublishCfg {
    /// Records per crane collected before one message is published.
    pub batch_size: usize,
}

impl Default for PublishCfg {
    fn default() -> Self {
        Self { batch_size: 10 }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub serial: SerialCfg,
    pub framing: FramingCfg,
    pub smoothing: SmoothingCfg,
    pub calibration: CalibrationCfg,
    pub filter: FilterCfg,
    pub dispatch: DispatchCfg,
    pub spreadsheet: SpreadsheetCfg,
    pub publish: PublishCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PointToml {
    Tuple((i64, f64)),
    Table { adc: i64, mass: f64 },
}

fn de_points<'de, D>(deserializer: D) -> Result<Option<Vec<(i64, f64)>>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<Vec<PointToml>> = Option::deserialize(deserializer)?;
    Ok(opt.map(|items| {
        items
            .into_iter()
            .map(|p| match p {
                PointToml::Tuple(t) => t,
                PointToml::Table { adc, mass } => (adc, mass),
            })
            .collect()
    }))
}

pub fn load_calibration_csv(path: &std::path::Path) -> eyre::Result<Vec<CalibrationRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open calibration CSV {:?}: {}", path, e))?;

    // Enforce headers; the training logger writes them capitalised
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let actual: Vec<String> = headers.iter().map(str::to_ascii_lowercase).collect();
    if actual != ["adc", "mass"] {
        eyre::bail!(
            "calibration CSV must have headers 'adc,mass', got: {}",
            headers.iter().collect::<Vec<_>>().join(",")
        );
    }
    rdr.set_headers(csv::StringRecord::from(vec!["adc", "mass"]));

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CalibrationRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    if rows.is_empty() {
        eyre::bail!("calibration CSV {:?} has no data rows", path);
    }
    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Serial
        if self.serial.baud == 0 {
            eyre::bail!("serial.baud must be > 0");
        }
        if self.serial.read_timeout_ms == 0 {
            eyre::bail!("serial.read_timeout_ms must be >= 1");
        }
        if self.serial.read_timeout_ms > 60 * 1000 {
            eyre::bail!("serial.read_timeout_ms is unreasonably large (>60s)");
        }

        // Framing
        if self.framing.max_line_len < 8 {
            eyre::bail!("framing.max_line_len must be >= 8");
        }

        // Smoothing
        if self.smoothing.window == 0 {
            eyre::bail!("smoothing.window must be >= 1");
        }

        // Calibration
        if self.calibration.slope.is_some() != self.calibration.intercept.is_some() {
            eyre::bail!("calibration.slope and calibration.intercept must be set together");
        }
        if let Some(slope) = self.calibration.slope
            && !slope.is_finite()
        {
            eyre::bail!("calibration.slope must be finite");
        }
        if let Some(intercept) = self.calibration.intercept
            && !intercept.is_finite()
        {
            eyre::bail!("calibration.intercept must be finite");
        }
        if let Some(points) = &self.calibration.points
            && points.len() < 2
        {
            eyre::bail!("calibration.points requires at least two rows");
        }

        // Dispatch
        if self.dispatch.mode == DispatchMode::Queued && self.dispatch.queue_depth < 2 {
            eyre::bail!("dispatch.queue_depth must be >= 2");
        }

        // Sinks
        if self.spreadsheet.commit_every == 0 {
            eyre::bail!("spreadsheet.commit_every must be >= 1");
        }
        if self.publish.batch_size == 0 {
            eyre::bail!("publish.batch_size must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
