//! Scheme-agnostic partition surface

use crate::traits::ReadSeek;
use platter_stream::SectionReader;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};

/// Bytes per sector. All LBA arithmetic in this workspace is in 512-byte
/// sectors.
pub const SECTOR_SIZE: u64 = 512;

/// Decoded metadata for one partition, independent of the scheme that
/// produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionMeta {
    /// Scheme-dependent identifier: the slot index for MBR, the embedded
    /// UTF-16 label for GPT, "0" for a direct filesystem
    pub name: String,

    /// Raw type identifier bytes as stored on disk: one type-code byte for
    /// MBR, sixteen GUID bytes for GPT, empty for a direct filesystem
    pub type_id: Vec<u8>,

    /// First sector of the partition (LBA)
    pub start_sector: u64,

    /// Length of the partition in sectors
    pub sector_count: u64,

    /// Whether the partition is flagged bootable
    pub bootable: bool,

    /// Whether this implementation can further interpret the partition
    pub supported: bool,
}

impl fmt::Display for PartitionMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "partition {} [LBA {} +{} sectors]",
            self.name, self.start_sector, self.sector_count
        )
    }
}

/// One enumerated partition: its metadata plus a bounded reader over
/// exactly its byte extent.
///
/// The handle mutably borrows the driver that produced it, which is what
/// keeps the shared seek cursor of the underlying source single-owner:
/// requesting the next partition statically ends this handle's life.
pub struct PartitionHandle<'a> {
    meta: PartitionMeta,
    reader: SectionReader<&'a mut dyn ReadSeek>,
}

impl<'a> PartitionHandle<'a> {
    /// Pair decoded metadata with its bounded reader.
    pub fn new(meta: PartitionMeta, reader: SectionReader<&'a mut dyn ReadSeek>) -> Self {
        Self { meta, reader }
    }

    /// Scheme-dependent partition name.
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    /// Raw type identifier bytes.
    pub fn type_id(&self) -> &[u8] {
        &self.meta.type_id
    }

    /// First sector (LBA).
    pub fn start_sector(&self) -> u64 {
        self.meta.start_sector
    }

    /// Length in sectors.
    pub fn sector_count(&self) -> u64 {
        self.meta.sector_count
    }

    /// Whether the partition is flagged bootable.
    pub fn bootable(&self) -> bool {
        self.meta.bootable
    }

    /// Whether this implementation can further interpret the partition.
    pub fn is_supported(&self) -> bool {
        self.meta.supported
    }

    /// The full metadata record.
    pub fn meta(&self) -> &PartitionMeta {
        &self.meta
    }

    /// Bounded reader over `[start_sector * 512, (start_sector + sector_count) * 512)`.
    pub fn reader(&mut self) -> &mut SectionReader<&'a mut dyn ReadSeek> {
        &mut self.reader
    }
}

impl Read for PartitionHandle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Seek for PartitionHandle<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.reader.seek(pos)
    }
}
