use std::time::Duration;

use crane_traits::{BoxError, ByteSource};

/// Stands in for a crane node on the radio link.
///
/// Produces full frames with a slowly drifting load and position, plus a
/// no-load heartbeat every `heartbeat_every` frames. With the radio header
/// enabled each frame is wrapped the way the coordinator relays it
/// (`0xFD <len> 0xFF 0xFF`, NUL after each token).
#[derive(Debug, Clone)]
pub struct SimulatedCrane {
    crane_id: u32,
    rng: u32,
    adc: i64,
    x: i32,
    y: i32,
    sent: u64,
    limit: Option<u64>,
    heartbeat_every: u64,
    radio_header: bool,
    interval: Duration,
    pending: Vec<u8>,
}

impl SimulatedCrane {
    pub fn new(crane_id: u32) -> Self {
        Self {
            crane_id,
            rng: 0x2545_F491 ^ crane_id.wrapping_mul(0x9E37_79B9),
            adc: 1639,
            x: 120,
            y: 45,
            sent: 0,
            limit: None,
            heartbeat_every: 5,
            radio_header: false,
            interval: Duration::from_millis(100),
            pending: Vec::new(),
        }
    }

    /// End the stream after `frames` frames.
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.limit = Some(frames);
        self
    }

    /// 0 disables heartbeats.
    pub fn with_heartbeat_every(mut self, n: u64) -> Self {
        self.heartbeat_every = n;
        self
    }

    pub fn with_radio_header(mut self, on: bool) -> Self {
        self.radio_header = on;
        self
    }

    /// Delay before each frame; zero for tests.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        x
    }

    fn step(&mut self) -> i32 {
        (self.next_u32() % 7) as i32 - 3
    }

    fn next_frame(&mut self) -> Vec<u8> {
        self.sent += 1;
        let heartbeat = self.heartbeat_every > 0 && self.sent % self.heartbeat_every == 0;
        let tokens: Vec<String> = if heartbeat {
            vec![format!("i{}", self.crane_id), "k".into()]
        } else {
            self.adc = (self.adc + i64::from(self.step()) * 4).clamp(0, 0x00FF_FFFF);
            self.x = (self.x + self.step()).max(0);
            self.y = (self.y + self.step()).max(0);
            vec![
                format!("i{}", self.crane_id),
                format!("m{}", self.adc),
                format!("x{}", self.x),
                format!("y{}", self.y),
            ]
        };

        if !self.radio_header {
            return format!("{}\r\n", tokens.join(" ")).into_bytes();
        }
        let mut body = Vec::new();
        for t in &tokens {
            body.extend_from_slice(t.as_bytes());
            body.extend_from_slice(b" \0");
        }
        body.extend_from_slice(b"\r\n\0");
        // The length byte is sent as-is, like the radio does. A 10-byte body
        // (`i3 k` through `i9 k`) puts a `\n` on the wire, which frames an
        // empty line that the pipeline drops as incomplete.
        let mut frame = vec![0xFD, body.len().min(0xFF) as u8, 0xFF, 0xFF];
        frame.extend(body);
        frame
    }
}

impl ByteSource for SimulatedCrane {
    fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, BoxError> {
        if self.pending.is_empty() {
            if self.limit.is_some_and(|l| self.sent >= l) {
                return Ok(0);
            }
            if !self.interval.is_zero() {
                std::thread::sleep(self.interval);
            }
            self.pending = self.next_frame();
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(mut src: SimulatedCrane) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buf = [0u8; 7];
        loop {
            let n = src.read(&mut buf, Duration::ZERO).unwrap();
            if n == 0 {
                return out;
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    #[test]
    fn emits_frames_and_heartbeats() {
        let src = SimulatedCrane::new(17)
            .with_interval(Duration::ZERO)
            .with_heartbeat_every(3)
            .with_limit(6);
        let text = String::from_utf8(drain(src)).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[2], "i17 k");
        assert_eq!(lines[5], "i17 k");
        assert!(lines[0].starts_with("i17 m"));
        assert_eq!(lines[0].split(' ').count(), 4);
    }

    #[test]
    fn radio_header_wraps_each_frame() {
        let src = SimulatedCrane::new(3)
            .with_interval(Duration::ZERO)
            .with_radio_header(true)
            .with_limit(1);
        let bytes = drain(src);
        assert_eq!(&bytes[..1], &[0xFD]);
        assert_eq!(&bytes[2..4], &[0xFF, 0xFF]);
        assert_eq!(bytes[1] as usize, bytes.len() - 4);
        assert!(bytes.contains(&0));
    }
}
