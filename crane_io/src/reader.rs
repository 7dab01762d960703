use std::io::Read;
use std::time::Duration;

use crane_traits::{BoxError, ByteSource};

/// Adapts any blocking reader (capture file, pipe, stdin) to a byte source.
///
/// The read timeout is ignored; the reader blocks until data or end of file.
#[derive(Debug)]
pub struct ReaderSource<R> {
    inner: R,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, BoxError> {
        loop {
            match self.inner.read(buf) {
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                other => return other.map_err(Into::into),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_until_eof() {
        let mut src = ReaderSource::new(&b"i3 k\n"[..]);
        let mut buf = [0u8; 3];
        let t = Duration::from_millis(1);
        assert_eq!(src.read(&mut buf, t).unwrap(), 3);
        assert_eq!(src.read(&mut buf, t).unwrap(), 2);
        assert_eq!(src.read(&mut buf, t).unwrap(), 0);
    }
}
