//! Raw-mode serial line via termios.
//!
//! The device is opened read-only with `O_NOCTTY`, switched to raw 8N1 at
//! the requested baud, and reads are bounded with `VMIN = 0` / `VTIME`. A
//! path that is not a terminal (a capture file, a FIFO) is read as-is.
use std::fs::{File, OpenOptions};
use std::io::Read;
use std::os::unix::fs::OpenOptionsExt;
use std::time::Duration;

use crane_traits::{BoxError, ByteSource};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::termios::{self, BaudRate, ControlFlags, SetArg, SpecialCharacterIndices};

use crate::error::{Result, SourceError};

#[derive(Debug)]
pub struct SerialPort {
    file: File,
    path: String,
    /// Current `VTIME` in deciseconds; `None` when the path is not a tty.
    vtime: Option<u8>,
}

fn baud_rate(baud: u32) -> Result<BaudRate> {
    Ok(match baud {
        1200 => BaudRate::B1200,
        2400 => BaudRate::B2400,
        4800 => BaudRate::B4800,
        9600 => BaudRate::B9600,
        19200 => BaudRate::B19200,
        38400 => BaudRate::B38400,
        57600 => BaudRate::B57600,
        115200 => BaudRate::B115200,
        230400 => BaudRate::B230400,
        other => return Err(SourceError::UnsupportedBaud(other)),
    })
}

/// `VTIME` counts tenths of a second in a `u8`.
fn deciseconds(timeout: Duration) -> u8 {
    let ds = timeout.as_millis().div_ceil(100);
    ds.clamp(1, u8::MAX as u128) as u8
}

impl SerialPort {
    pub fn open(path: &str, baud: u32, timeout: Duration) -> Result<Self> {
        let rate = baud_rate(baud)?;
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(OFlag::O_NOCTTY.bits())
            .open(path)
            .map_err(|source| SourceError::Open {
                path: path.to_string(),
                source,
            })?;

        let vtime = match termios::tcgetattr(&file) {
            Ok(mut t) => {
                termios::cfmakeraw(&mut t);
                termios::cfsetspeed(&mut t, rate)?;
                t.control_flags |= ControlFlags::CLOCAL | ControlFlags::CREAD;
                let vtime = deciseconds(timeout);
                t.control_chars[SpecialCharacterIndices::VMIN as usize] = 0;
                t.control_chars[SpecialCharacterIndices::VTIME as usize] = vtime;
                termios::tcsetattr(&file, SetArg::TCSANOW, &t)?;
                tracing::info!(path, baud, vtime_ds = vtime, "serial port configured");
                Some(vtime)
            }
            Err(Errno::ENOTTY) => {
                tracing::info!(path, "not a terminal, reading as a plain stream");
                None
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            file,
            path: path.to_string(),
            vtime,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_tty(&self) -> bool {
        self.vtime.is_some()
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        let want = deciseconds(timeout);
        if self.vtime.is_some_and(|cur| cur != want) {
            let mut t = termios::tcgetattr(&self.file)?;
            t.control_chars[SpecialCharacterIndices::VTIME as usize] = want;
            termios::tcsetattr(&self.file, SetArg::TCSANOW, &t)?;
            self.vtime = Some(want);
        }
        Ok(())
    }
}

impl ByteSource for SerialPort {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> std::result::Result<usize, BoxError> {
        self.set_timeout(timeout)?;
        let n = loop {
            match self.file.read(buf) {
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                other => break other?,
            }
        };
        // On a tty with VMIN = 0 an empty read is the VTIME expiring
        if n == 0 && self.is_tty() && !buf.is_empty() {
            return Err(std::io::Error::from(std::io::ErrorKind::TimedOut).into());
        }
        Ok(n)
    }
}
