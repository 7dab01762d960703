#![no_main]
use chrono::TimeZone;
use crane_core::frame::Framed;
use crane_core::{CalibrationModel, FrameAssembler, Pipeline, PipelineCfg, parse};
use crane_traits::ManualClock;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut frames = FrameAssembler::new(64);
    for &b in data {
        if let Framed::Line(line) = frames.push(b) {
            assert!(!line.contains(['\r', '\n']));
            let _ = parse(&line);
        }
    }

    let Ok(model) = CalibrationModel::from_coefficients(0.002, 0.0) else {
        return;
    };
    let Some(origin) = chrono::Local.timestamp_opt(0, 0).single() else {
        return;
    };
    let mut pipeline = Pipeline::with_clock(model, &PipelineCfg::default(), ManualClock::new(origin));
    for outcome in pipeline.feed(data) {
        if let Some(r) = outcome.record() {
            assert!(r.instant_mass.is_finite() && r.average_mass.is_finite());
        }
    }
    let summary = pipeline.close();
    assert_eq!(summary.lines, summary.emitted + summary.dropped());
});
