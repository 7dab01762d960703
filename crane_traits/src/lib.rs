pub mod clock;
pub mod record;

pub use clock::{Clock, ManualClock, SystemClock};
pub use record::{NO_LOAD_POSITION, Record};

/// Boxed error used at every trait boundary of the workspace.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error returned by [`Sink::persist`] and [`Sink::close`].
pub type SinkError = BoxError;

/// Supplies raw bytes from the telemetry link (serial port, capture file, ...).
pub trait ByteSource {
    /// Read up to `buf.len()` bytes, waiting at most `timeout`.
    ///
    /// `Ok(0)` means the stream has ended. A read that times out without data
    /// should report an `io::ErrorKind::TimedOut` error so the caller can treat
    /// it as an idle tick.
    fn read(&mut self, buf: &mut [u8], timeout: std::time::Duration) -> Result<usize, BoxError>;
}

/// What the pipeline does when a sink rejects a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure and keep consuming the stream. The record is not redelivered.
    #[default]
    LogAndContinue,
    /// Stop the run; the error is reported to the caller.
    Fatal,
}

/// Output destination for assembled records.
pub trait Sink {
    /// Persist (or stage) a single record.
    fn persist(&mut self, record: &Record) -> Result<(), SinkError>;

    /// Flush anything staged and release the backing resource.
    fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::LogAndContinue
    }

    /// Short label used in logs.
    fn name(&self) -> &'static str {
        "sink"
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn persist(&mut self, record: &Record) -> Result<(), SinkError> {
        (**self).persist(record)
    }
    fn close(&mut self) -> Result<(), SinkError> {
        (**self).close()
    }
    fn failure_policy(&self) -> FailurePolicy {
        (**self).failure_policy()
    }
    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<B: ByteSource + ?Sized> ByteSource for Box<B> {
    fn read(&mut self, buf: &mut [u8], timeout: std::time::Duration) -> Result<usize, BoxError> {
        (**self).read(buf, timeout)
    }
}
