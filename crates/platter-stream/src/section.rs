//! Bounded window over an inner stream

use std::io::{self, Read, Seek, SeekFrom};

/// A seekable view of the byte range `[offset, offset + len)` of an inner
/// stream.
///
/// The inner stream's position is shared with everyone else holding it, so
/// every read re-seeks the inner stream to the window-relative position
/// before reading. Reads clamp at the end of the window; seeking outside
/// the window is an error.
pub struct SectionReader<R> {
    inner: R,
    offset: u64,
    len: u64,
    pos: u64,
}

impl<R: Read + Seek> SectionReader<R> {
    /// Create a window of `len` bytes starting at `offset`.
    ///
    /// Seeks the inner stream to `offset` up front, so a window that starts
    /// beyond what the inner stream can address fails here rather than on
    /// the first read.
    pub fn new(mut inner: R, offset: u64, len: u64) -> io::Result<Self> {
        offset.checked_add(len).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "section extent overflows u64")
        })?;
        inner.seek(SeekFrom::Start(offset))?;

        Ok(Self {
            inner,
            offset,
            len,
            pos: 0,
        })
    }

    /// Absolute byte offset of the window within the inner stream.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Length of the window in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// True if the window is zero-length.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current position relative to the start of the window.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Bytes left between the current position and the end of the window.
    pub fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.pos)
    }

    /// Give the inner stream back.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> Read for SectionReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining();
        if remaining == 0 {
            return Ok(0);
        }
        let want = buf.len().min(remaining.min(usize::MAX as u64) as usize);

        // The inner position may have been moved by another window.
        self.inner.seek(SeekFrom::Start(self.offset + self.pos))?;
        let n = self.inner.read(&mut buf[..want])?;
        self.pos += n as u64;

        Ok(n)
    }
}

impl<R: Read + Seek> Seek for SectionReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::End(n) => i128::from(self.len) + i128::from(n),
            SeekFrom::Current(n) => i128::from(self.pos) + i128::from(n),
        };

        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of section",
            ));
        }
        if target > i128::from(self.len) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek past end of section",
            ));
        }

        self.pos = target as u64;
        Ok(self.pos)
    }
}
