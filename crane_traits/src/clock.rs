use chrono::{DateTime, Local};

/// Wall-clock abstraction used to stamp records.
///
/// - now(): current local time
/// - elapsed_ms(): helper to compute milliseconds since an earlier reading
pub trait Clock {
    fn now(&self) -> DateTime<Local>;

    /// Milliseconds elapsed since `epoch`, saturating at 0 when the clock stepped backwards.
    fn elapsed_ms(&self, epoch: DateTime<Local>) -> u64 {
        let ms = (self.now() - epoch).num_milliseconds();
        u64::try_from(ms).unwrap_or(0)
    }
}

/// Default clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> DateTime<Local> {
        (**self).now()
    }
}

/// Deterministic clock whose time only moves when told to.
///
/// now() = origin + offset
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: DateTime<Local>,
    offset: std::sync::Arc<std::sync::Mutex<chrono::Duration>>,
}

impl ManualClock {
    pub fn new(origin: DateTime<Local>) -> Self {
        Self {
            origin,
            offset: std::sync::Arc::new(std::sync::Mutex::new(chrono::Duration::zero())),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, d: std::time::Duration) {
        let step = chrono::Duration::from_std(d).unwrap_or(chrono::Duration::zero());
        if let Ok(mut off) = self.offset.lock() {
            *off += step;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        let off = self
            .offset
            .lock()
            .map(|g| *g)
            .unwrap_or(chrono::Duration::zero());
        self.origin + off
    }
}
