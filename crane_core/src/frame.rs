//! Byte-to-line framing for the ASCII telemetry protocol.
//!
//! Lines end at `\n`; `\r` is dropped wherever it appears. The wire is plain
//! ASCII, so any byte >= 0x80 (radio header residue such as `0xFD 0xFF 0xFF`)
//! fails to decode and is discarded without touching the line buffer.

/// Default upper bound on a single line, in bytes.
pub const DEFAULT_MAX_LINE_LEN: usize = 512;

/// Framing state, as observed between two bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Buffer empty, waiting for the first character of a line.
    Idle,
    /// Characters accumulated, waiting for the terminator.
    Buffering,
    /// Current line overflowed; skipping to the next terminator.
    Discarding,
}

/// Outcome of feeding one byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Framed {
    /// Byte consumed, no line finished.
    Pending,
    /// A terminator completed this line.
    Line(String),
    /// A terminator ended a line that had overflowed `max_line_len`.
    Overflowed { len: usize },
    /// Byte could not be decoded as ASCII and was dropped.
    Undecodable(u8),
}

#[derive(Debug)]
pub struct FrameAssembler {
    buf: String,
    max_line_len: usize,
    discarding: bool,
    discarded: usize,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LEN)
    }
}

impl FrameAssembler {
    pub fn new(max_line_len: usize) -> Self {
        Self {
            buf: String::with_capacity(64),
            max_line_len: max_line_len.max(1),
            discarding: false,
            discarded: 0,
        }
    }

    pub fn state(&self) -> FrameState {
        if self.discarding {
            FrameState::Discarding
        } else if self.buf.is_empty() {
            FrameState::Idle
        } else {
            FrameState::Buffering
        }
    }

    /// Characters buffered for the line in progress.
    pub fn pending(&self) -> &str {
        &self.buf
    }

    /// Feed one byte from the link.
    pub fn push(&mut self, byte: u8) -> Framed {
        match byte {
            b'\n' => {
                if self.discarding {
                    let len = self.discarded;
                    self.discarding = false;
                    self.discarded = 0;
                    self.buf.clear();
                    return Framed::Overflowed { len };
                }
                Framed::Line(std::mem::take(&mut self.buf))
            }
            b'\r' => Framed::Pending,
            b if !b.is_ascii() => Framed::Undecodable(b),
            b => {
                if self.discarding {
                    self.discarded += 1;
                } else if self.buf.len() >= self.max_line_len {
                    self.discarding = true;
                    self.discarded = self.buf.len() + 1;
                    self.buf.clear();
                } else {
                    self.buf.push(char::from(b));
                }
                Framed::Pending
            }
        }
    }
}
