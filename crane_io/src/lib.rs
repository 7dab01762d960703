//! Byte sources for the ingest loop.
//!
//! Everything here implements [`crane_traits::ByteSource`]: a plain
//! [`ReaderSource`] over any `Read` (captures, pipes, stdin), a termios
//! configured [`serial::SerialPort`] on unix, and a [`SimulatedCrane`] that
//! speaks the radio's wire format without hardware.
pub mod error;
pub mod reader;
#[cfg(all(unix, feature = "serial"))]
pub mod serial;
pub mod sim;

pub use error::SourceError;
pub use reader::ReaderSource;
#[cfg(all(unix, feature = "serial"))]
pub use serial::SerialPort;
pub use sim::SimulatedCrane;

/// Port name that selects the simulator instead of a device.
pub const SIMULATED_PORT: &str = "sim";

/// Open the source named by `port`: the simulator for [`SIMULATED_PORT`],
/// a configured serial line where supported, a plain file otherwise.
pub fn open_port(
    port: &str,
    baud: u32,
    timeout: std::time::Duration,
) -> error::Result<Box<dyn crane_traits::ByteSource + Send>> {
    if port == SIMULATED_PORT {
        tracing::info!("using simulated crane source");
        return Ok(Box::new(SimulatedCrane::new(3)));
    }
    #[cfg(all(unix, feature = "serial"))]
    {
        Ok(Box::new(SerialPort::open(port, baud, timeout)?))
    }
    #[cfg(not(all(unix, feature = "serial")))]
    {
        let _ = (baud, timeout);
        let file = std::fs::File::open(port).map_err(|source| SourceError::Open {
            path: port.to_string(),
            source,
        })?;
        tracing::info!(port, "serial support disabled, reading port as a plain file");
        Ok(Box::new(ReaderSource::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn missing_port_is_an_open_error() {
        let err = open_port("/definitely/not/a/port", 38400, Duration::from_millis(10))
            .err()
            .expect("open should fail");
        match err {
            SourceError::Open { path, .. } => assert_eq!(path, "/definitely/not/a/port"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn sim_port_reads_frames() {
        let mut src = open_port(SIMULATED_PORT, 38400, Duration::from_millis(10)).unwrap();
        let mut buf = [0u8; 128];
        let n = src.read(&mut buf, Duration::from_millis(10)).unwrap();
        assert!(n > 0);
    }
}
