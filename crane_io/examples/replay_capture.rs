//! Replay Capture Example
//!
//! Drives a [`Pipeline`] by hand from two byte sources: the built-in crane
//! simulator (radio framing on) and a recorded capture read through
//! [`ReaderSource`]. Run with `cargo run -p crane_io --example replay_capture`.

use std::time::Duration;

use crane_core::{CalibrationModel, LineOutcome, Pipeline, PipelineCfg};
use crane_io::{ReaderSource, SimulatedCrane};
use crane_traits::ByteSource;

const CAPTURE: &[u8] = b"i3 m1639 x120 y45\r\ni3 m1700 x121 y45\r\ni3 k\r\ni3 mXX x1 y1\r\n";

/// Pull bytes until the source ends, printing each finished line.
fn replay(name: &str, source: &mut dyn ByteSource, model: CalibrationModel) -> eyre::Result<()> {
    let mut pipeline = Pipeline::open(model, &PipelineCfg::default());
    let mut buf = [0u8; 64];
    loop {
        let n = source
            .read(&mut buf, Duration::from_millis(100))
            .map_err(|e| eyre::eyre!("{name}: read failed: {e}"))?;
        if n == 0 {
            break;
        }
        for outcome in pipeline.feed(&buf[..n]) {
            match outcome {
                LineOutcome::Emitted(r) => println!(
                    "[{name}] crane {} adc {} mass {:.3} t (avg {:.3}) at ({}, {})",
                    r.crane_id, r.raw_adc, r.instant_mass, r.average_mass, r.x, r.y
                ),
                LineOutcome::Dropped(reason) => println!("[{name}] dropped: {reason:?}"),
            }
        }
    }
    let summary = pipeline.close();
    println!(
        "[{name}] {} lines, {} emitted, {} dropped",
        summary.lines,
        summary.emitted,
        summary.dropped()
    );
    Ok(())
}

fn main() -> eyre::Result<()> {
    let model = CalibrationModel::factory()?;

    let mut sim = SimulatedCrane::new(17)
        .with_interval(Duration::ZERO)
        .with_radio_header(true)
        .with_limit(12);
    replay("sim", &mut sim, model)?;

    let mut capture = ReaderSource::new(CAPTURE);
    replay("capture", &mut capture, model)?;
    Ok(())
}
