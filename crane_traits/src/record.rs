use chrono::{DateTime, Local};

/// Position reported while the hook carries no load (`k` marker on the wire).
/// Distinct from a real `(0, 0)` reading.
pub const NO_LOAD_POSITION: i32 = -1;

/// A fully resolved, timestamped measurement ready for output.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub time: DateTime<Local>,
    pub crane_id: u32,
    pub raw_adc: i64,
    /// Rolling mean over the crane's smoothing window, including this sample.
    pub average_mass: f64,
    /// Calibrated mass for this sample alone.
    pub instant_mass: f64,
    pub x: i32,
    pub y: i32,
}

impl Record {
    /// True when the position carries the no-load sentinel.
    pub fn is_no_load(&self) -> bool {
        self.x == NO_LOAD_POSITION && self.y == NO_LOAD_POSITION
    }

    /// ISO-8601 local timestamp with microsecond precision, e.g.
    /// `2024-03-01T09:15:02.123456`.
    pub fn iso_time(&self) -> String {
        self.time.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(x: i32, y: i32) -> Record {
        Record {
            time: Local.with_ymd_and_hms(2024, 3, 1, 9, 15, 2).unwrap(),
            crane_id: 3,
            raw_adc: 1639,
            average_mass: 2.4,
            instant_mass: 2.5,
            x,
            y,
        }
    }

    #[test]
    fn sentinel_is_not_origin() {
        assert!(record(-1, -1).is_no_load());
        assert!(!record(0, 0).is_no_load());
        assert!(!record(-1, 0).is_no_load());
    }

    #[test]
    fn iso_time_has_micros() {
        assert_eq!(record(1, 1).iso_time(), "2024-03-01T09:15:02.000000");
    }
}
