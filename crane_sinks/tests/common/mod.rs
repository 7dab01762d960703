use chrono::{Local, TimeZone};
use crane_traits::Record;

pub fn record(crane_id: u32, raw_adc: i64, seq: u32) -> Record {
    Record {
        time: Local.with_ymd_and_hms(2024, 5, 2, 7, 30, seq).unwrap(),
        crane_id,
        raw_adc,
        average_mass: raw_adc as f64 * 0.002,
        instant_mass: raw_adc as f64 * 0.002,
        x: 120,
        y: 45,
    }
}
