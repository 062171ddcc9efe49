//! Read-only memory-mapped file access

use memmap2::Mmap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// A `Read + Seek` stream backed by a read-only memory map.
///
/// Reads are plain slice copies with no per-read syscall, which suits the
/// decode pattern here: many small seeks and 512-byte reads scattered over
/// a large image.
pub struct MmapStream {
    map: Mmap,
    pos: u64,
}

impl MmapStream {
    /// Map a file at `path` read-only.
    ///
    /// Only regular files are accepted; mapping a device node or pipe is
    /// refused up front. The file must not be truncated while the map is
    /// alive (caller responsibility).
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Self::from_file(&file)
    }

    /// Map an already-open file read-only.
    pub fn from_file(file: &File) -> io::Result<Self> {
        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "only regular files can be memory-mapped",
            ));
        }

        // SAFETY: the descriptor is valid (metadata() just succeeded), the
        // mapping is read-only, and the regular-file check above rules out
        // devices and pipes.
        let map = unsafe { Mmap::map(file)? };

        Ok(Self { map, pos: 0 })
    }

    /// Length of the mapped file in bytes.
    pub fn len(&self) -> u64 {
        self.map.len() as u64
    }

    /// True if the mapped file is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Read for MmapStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let start = self.pos.min(self.len()) as usize;
        let slice = &self.map[start..];
        let n = buf.len().min(slice.len());
        buf[..n].copy_from_slice(&slice[..n]);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for MmapStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::End(n) => i128::from(self.len()) + i128::from(n),
            SeekFrom::Current(n) => i128::from(self.pos) + i128::from(n),
        };

        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of mapped file",
            ));
        }

        // Seeking past the end is allowed, as with a regular file;
        // subsequent reads just return 0.
        self.pos = target as u64;
        Ok(self.pos)
    }
}
