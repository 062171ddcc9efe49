//! GUID Partition Table decoding and enumeration
//!
//! # On-disk layout
//!
//! ```text
//! LBA 0:  Protective MBR
//! LBA 1:  GPT header ("EFI PART", CRC32-checked)
//! LBA 2+: Partition entry array (location and geometry declared
//!         by the header, CRC32-checked as a whole)
//! ```

pub mod types;

use platter_core::{
    Driver, Error, PartitionHandle, PartitionMeta, ReadSeek, Result, SECTOR_SIZE,
};
use platter_stream::SectionReader;
use std::io::SeekFrom;
use self::types::{GptHeader, GptPartitionEntry};
use uuid::Uuid;

/// A decoded GUID Partition Table: the validated header plus the non-empty
/// entries in on-disk order.
#[derive(Debug, Clone)]
pub struct GuidPartitionTable {
    header: GptHeader,
    entries: Vec<GptPartitionEntry>,
}

impl GuidPartitionTable {
    /// The header always lives at LBA 1.
    pub const HEADER_LBA: u64 = 1;

    /// Upper bound on the declared entry count; anything larger is treated
    /// as a corrupt header rather than an allocation request.
    pub const MAX_ENTRY_COUNT: u32 = 4096;

    /// Upper bound on the declared per-entry size, for the same reason.
    pub const MAX_ENTRY_SIZE: u32 = 4096;

    /// Decode a GPT from the start of a disk image.
    ///
    /// Seeks to LBA 1, validates the header signature and CRC32 (computed
    /// over the declared header size with the checksum field zeroed), then
    /// reads and CRC32-checks the entry array. Entries with an all-zero
    /// type GUID are dropped here, so enumeration only sees real
    /// partitions.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidHeader`] for signature or geometry problems
    /// - [`Error::ChecksumMismatch`] for CRC32 failures
    /// - [`Error::Io`] if the source cannot be read
    pub fn decode(stream: &mut dyn ReadSeek) -> Result<Self> {
        stream.seek(SeekFrom::Start(Self::HEADER_LBA * SECTOR_SIZE))?;
        let mut sector = [0u8; SECTOR_SIZE as usize];
        stream.read_exact(&mut sector)?;

        let header = GptHeader::decode(&sector)?;
        if !header.verify_crc32(&sector) {
            return Err(Error::checksum_mismatch(format!(
                "GPT header CRC32 0x{:08X} does not match contents",
                header.header_crc32
            )));
        }

        if header.entry_size < GptPartitionEntry::MIN_ENTRY_SIZE {
            return Err(Error::invalid_header(format!(
                "partition entry size {} below minimum {}",
                header.entry_size,
                GptPartitionEntry::MIN_ENTRY_SIZE
            )));
        }
        if header.entry_size > Self::MAX_ENTRY_SIZE {
            return Err(Error::invalid_header(format!(
                "partition entry size {} above limit {}",
                header.entry_size,
                Self::MAX_ENTRY_SIZE
            )));
        }
        if header.entry_count > Self::MAX_ENTRY_COUNT {
            return Err(Error::invalid_header(format!(
                "partition entry count {} above limit {}",
                header.entry_count,
                Self::MAX_ENTRY_COUNT
            )));
        }

        let array_offset = header
            .entry_array_lba
            .checked_mul(SECTOR_SIZE)
            .ok_or_else(|| Error::invalid_header("entry array LBA overflows byte offset"))?;
        stream.seek(SeekFrom::Start(array_offset))?;

        let array_len = header.entry_count as usize * header.entry_size as usize;
        let mut array = vec![0u8; array_len];
        stream.read_exact(&mut array)?;

        if !header.verify_entry_array_crc32(&array) {
            return Err(Error::checksum_mismatch(format!(
                "entry array CRC32 0x{:08X} does not match contents",
                header.entry_array_crc32
            )));
        }

        let entries = array
            .chunks_exact(header.entry_size as usize)
            .map(GptPartitionEntry::decode)
            .filter(|entry| !entry.is_unused())
            .collect();

        Ok(Self { header, entries })
    }

    /// The validated header.
    pub fn header(&self) -> &GptHeader {
        &self.header
    }

    /// The non-empty partition entries, in on-disk order.
    pub fn entries(&self) -> &[GptPartitionEntry] {
        &self.entries
    }

    /// The disk's GUID.
    pub fn disk_guid(&self) -> Uuid {
        self.header.disk_guid
    }
}

/// Enumerates decoded GPT entries over an owned source.
pub struct GptDriver {
    table: GuidPartitionTable,
    source: Box<dyn ReadSeek>,
    cursor: usize,
}

impl GptDriver {
    /// Pair a decoded table with the source it was decoded from.
    pub fn new(table: GuidPartitionTable, source: Box<dyn ReadSeek>) -> Self {
        Self {
            table,
            source,
            cursor: 0,
        }
    }

    /// The decoded table backing this driver.
    pub fn table(&self) -> &GuidPartitionTable {
        &self.table
    }
}

impl Driver for GptDriver {
    fn next_partition(&mut self) -> Result<Option<PartitionHandle<'_>>> {
        let Some(entry) = self.table.entries.get(self.cursor) else {
            return Ok(None);
        };
        let ordinal = self.cursor;
        self.cursor += 1;

        // A CRC-valid entry can still carry LBAs near u64::MAX.
        let offset = entry
            .first_lba
            .checked_mul(SECTOR_SIZE)
            .ok_or_else(|| Error::invalid_header("partition start overflows byte offset"))?;
        let length = entry
            .sector_count()
            .checked_mul(SECTOR_SIZE)
            .ok_or_else(|| Error::invalid_header("partition extent overflows byte length"))?;

        let meta = PartitionMeta {
            name: if entry.name.is_empty() {
                ordinal.to_string()
            } else {
                entry.name.clone()
            },
            type_id: entry.type_guid_bytes().to_vec(),
            start_sector: entry.first_lba,
            sector_count: entry.sector_count(),
            bootable: entry.is_bootable(),
            supported: entry.is_supported(),
        };
        let reader = SectionReader::new(&mut *self.source as &mut dyn ReadSeek, offset, length)?;

        Ok(Some(PartitionHandle::new(meta, reader)))
    }
}
