//! Maps `Box<dyn Error>` from trait boundaries to typed outcomes.
//!
//! The traits in `crane_traits` use `Box<dyn Error + Send + Sync>` so any
//! serial or sink backend can plug in; this module classifies those errors
//! for the read loop and converts sink failures to `TelemetryError`.

use crate::error::TelemetryError;

/// How the read loop should treat a failed `ByteSource::read`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadFault {
    /// No data within the timeout (or an interrupted syscall); not a failure.
    Idle,
    /// Link hiccup; retried until the consecutive-error budget runs out.
    Transient(String),
}

/// Classify a byte source error.
///
/// Downcasts `std::io::Error` first, then falls back to string heuristics.
pub fn classify_read_error(e: &(dyn std::error::Error + 'static)) -> ReadFault {
    if let Some(io) = e.downcast_ref::<std::io::Error>() {
        use std::io::ErrorKind::*;
        return match io.kind() {
            TimedOut | WouldBlock | Interrupted => ReadFault::Idle,
            _ => ReadFault::Transient(io.to_string()),
        };
    }

    // Fallback: string-based detection
    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("timed out") || lower.contains("timeout") {
        ReadFault::Idle
    } else {
        ReadFault::Transient(s)
    }
}

/// Map a sink-boundary error to a typed `TelemetryError`.
pub fn map_sink_error(sink: &'static str, e: &(dyn std::error::Error + 'static)) -> TelemetryError {
    TelemetryError::SinkWrite {
        sink,
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn io_timeouts_are_idle() {
        for kind in [io::ErrorKind::TimedOut, io::ErrorKind::WouldBlock, io::ErrorKind::Interrupted] {
            let e: Box<dyn std::error::Error + Send + Sync> = Box::new(io::Error::from(kind));
            assert_eq!(classify_read_error(&*e), ReadFault::Idle);
        }
    }

    #[test]
    fn other_io_errors_are_transient() {
        let e: Box<dyn std::error::Error + Send + Sync> =
            Box::new(io::Error::new(io::ErrorKind::BrokenPipe, "cable pulled"));
        assert_eq!(
            classify_read_error(&*e),
            ReadFault::Transient("cable pulled".into())
        );
    }

    #[test]
    fn string_errors_use_heuristics() {
        let idle: Box<dyn std::error::Error + Send + Sync> = "read timeout".into();
        let hard: Box<dyn std::error::Error + Send + Sync> = "framing error".into();
        assert_eq!(classify_read_error(&*idle), ReadFault::Idle);
        assert_eq!(
            classify_read_error(&*hard),
            ReadFault::Transient("framing error".into())
        );
    }
}
