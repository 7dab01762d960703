use chrono::TimeZone;
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use crane_core::{CalibrationModel, Pipeline, PipelineCfg, parse};
use crane_traits::ManualClock;

// Synthetic capture: full frames for a few cranes with a heartbeat every tenth line
fn synth_capture(lines: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.max(1);
    let mut next = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        x
    };
    let mut out = Vec::with_capacity(lines * 24);
    for i in 0..lines {
        let id = [3, 17, 42][i % 3];
        if i % 10 == 9 {
            out.extend_from_slice(format!("i{id} k\r\n").as_bytes());
        } else {
            let adc = 1000 + next() % 4000;
            let x = next() % 500;
            let y = next() % 500;
            out.extend_from_slice(format!("i{id} m{adc} x{x} y{y}\r\n").as_bytes());
        }
    }
    out
}

pub fn bench_parse(c: &mut Criterion) {
    let mut g = c.benchmark_group("parse");
    // BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p crane_core --bench parser
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }

    for line in ["i3 m1639 x120 y45", "y45 x120 m1639 i3", "i17 k"] {
        g.bench_function(format!("line_{}", line.replace(' ', "_")), |b| {
            b.iter(|| black_box(parse(black_box(line))))
        });
    }

    let capture = synth_capture(10_000, 0xC0FFEE);
    let model = CalibrationModel::factory().expect("factory table fits");
    g.bench_function("pipeline_10k_lines", |b| {
        b.iter_batched(
            || {
                let clock = ManualClock::new(chrono::Local.timestamp_opt(0, 0).unwrap());
                Pipeline::with_clock(model, &PipelineCfg::default(), clock)
            },
            |mut p| {
                let emitted = p.feed(black_box(&capture)).len();
                black_box(emitted);
            },
            BatchSize::SmallInput,
        )
    });
    g.finish();
}

criterion_group!(parser, bench_parse);
criterion_main!(parser);
