//! Master Boot Record decoding and enumeration
//!
//! # On-disk layout
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0x000   4     Unique disk signature
//! 0x004   2     Reserved
//! 0x006   440   Bootstrap code (opaque)
//! 0x1BE   16    Partition record 1
//! 0x1CE   16    Partition record 2
//! 0x1DE   16    Partition record 3
//! 0x1EE   16    Partition record 4
//! 0x1FE   2     Boot signature (0xAA55)
//! ```

pub mod types;

use platter_core::{
    Driver, Error, PartitionHandle, PartitionMeta, ReadSeek, Result, SECTOR_SIZE,
};
use platter_stream::SectionReader;
use std::io::{self, SeekFrom};
use self::types::{ChsAddress, PartitionType};

/// One of the four 16-byte partition records in a boot sector.
///
/// `start_sector` and `sector_count` are the raw on-disk values except for
/// Extended/Extended-LBA slots that terminate an EBR chain, where both are
/// adjusted by the two sectors occupied by the nested table itself.
#[derive(Debug, Clone, Copy)]
pub struct PartitionRecord {
    pub bootable: bool,
    pub start_chs: ChsAddress,
    pub type_code: u8,
    pub end_chs: ChsAddress,
    pub start_sector: u32,
    pub sector_count: u32,
    slot: usize,
}

impl PartitionRecord {
    /// 0-based position among the four slots.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// The type code, wrapped for naming and classification.
    pub fn kind(&self) -> PartitionType {
        PartitionType(self.type_code)
    }

    fn decode(raw: &[u8], slot: usize) -> Self {
        Self {
            bootable: raw[0] != 0,
            start_chs: ChsAddress::from_bytes([raw[1], raw[2], raw[3]]),
            type_code: raw[4],
            end_chs: ChsAddress::from_bytes([raw[5], raw[6], raw[7]]),
            start_sector: u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]),
            sector_count: u32::from_le_bytes([raw[12], raw[13], raw[14], raw[15]]),
            slot,
        }
    }
}

/// A decoded Master Boot Record.
///
/// Immutable once decoded; enumeration state lives in [`MbrDriver`].
#[derive(Debug, Clone)]
pub struct MasterBootRecord {
    disk_signature: [u8; 4],
    reserved: [u8; 2],
    bootstrap: [u8; 440],
    partitions: [PartitionRecord; 4],
    boot_signature: u16,
}

impl MasterBootRecord {
    /// The value the last two bytes of a valid boot sector decode to.
    pub const BOOT_SIGNATURE: u16 = 0xAA55;

    /// Size of a boot record in bytes.
    pub const RECORD_SIZE: usize = 512;

    /// Number of primary partition slots.
    pub const NUM_SLOTS: usize = 4;

    /// Size of one partition record.
    pub const ENTRY_SIZE: usize = 16;

    /// Offset of the partition record table within the sector.
    pub const ENTRY_TABLE_OFFSET: usize = 0x1BE;

    /// Decode a Master Boot Record from the stream's current position and
    /// resolve any Extended Boot Record chains it references.
    ///
    /// Callers must position the stream at the start of the candidate boot
    /// sector first; the scheme selector rewinds to offset 0 before the
    /// top-level decode.
    ///
    /// # Errors
    ///
    /// - [`Error::TruncatedRead`] if fewer than 512 bytes are available
    /// - [`Error::InvalidSignature`] if the boot signature is not 0xAA55
    /// - [`Error::UnsupportedExtendedChain`] if an extended slot chains to
    ///   a further valid boot record
    pub fn decode(stream: &mut dyn ReadSeek) -> Result<Self> {
        let mut record = Self::decode_sector(stream)?;
        record.resolve_extended(stream)?;
        Ok(record)
    }

    /// Decode a single 512-byte boot sector, without chain resolution.
    fn decode_sector(stream: &mut dyn ReadSeek) -> Result<Self> {
        let mut raw = [0u8; Self::RECORD_SIZE];
        stream.read_exact(&mut raw).map_err(|err| {
            if err.kind() == io::ErrorKind::UnexpectedEof {
                Error::truncated(format!(
                    "boot record requires {} bytes",
                    Self::RECORD_SIZE
                ))
            } else {
                Error::Io(err)
            }
        })?;

        let disk_signature = [raw[0], raw[1], raw[2], raw[3]];
        let reserved = [raw[4], raw[5]];
        let mut bootstrap = [0u8; 440];
        bootstrap.copy_from_slice(&raw[6..446]);

        let decode_slot = |slot: usize| {
            let offset = Self::ENTRY_TABLE_OFFSET + slot * Self::ENTRY_SIZE;
            PartitionRecord::decode(&raw[offset..offset + Self::ENTRY_SIZE], slot)
        };
        let partitions = [
            decode_slot(0),
            decode_slot(1),
            decode_slot(2),
            decode_slot(3),
        ];

        let boot_signature = u16::from_le_bytes([raw[510], raw[511]]);
        if boot_signature != Self::BOOT_SIGNATURE {
            return Err(Error::InvalidSignature(boot_signature));
        }

        Ok(Self {
            disk_signature,
            reserved,
            bootstrap,
            partitions,
            boot_signature,
        })
    }

    /// Walk the four slots and fix up Extended/Extended-LBA containers.
    ///
    /// An explicit loop rather than recursion: the nested sector is decoded
    /// once and never followed further, so chain depth cannot be driven by
    /// on-disk data.
    ///
    /// The signature check is reversed for nested records. A nested decode
    /// failing with `InvalidSignature` is the conventional chain terminator:
    /// the slot's usable data starts after the two sectors holding the
    /// nested table, so the record is adjusted by that much. A nested decode
    /// that *succeeds* means the chain continues, which this implementation
    /// deliberately does not support.
    fn resolve_extended(&mut self, stream: &mut dyn ReadSeek) -> Result<()> {
        for slot in 0..Self::NUM_SLOTS {
            if !self.partitions[slot].kind().is_extended() {
                continue;
            }

            let offset = u64::from(self.partitions[slot].start_sector) * SECTOR_SIZE;
            stream.seek(SeekFrom::Start(offset))?;

            match Self::decode_sector(stream) {
                Err(Error::InvalidSignature(_)) => {
                    let record = &mut self.partitions[slot];
                    record.start_sector = record.start_sector.saturating_add(2);
                    record.sector_count = record.sector_count.saturating_sub(2);
                }
                Ok(_) => {
                    return Err(Error::unsupported_chain(format!(
                        "slot {} chains to a further extended boot record",
                        slot
                    )));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// The 4-byte unique disk signature.
    pub fn disk_signature(&self) -> [u8; 4] {
        self.disk_signature
    }

    /// True if the disk signature is the all-zero sentinel, meaning this
    /// MBR is not authoritative and GPT was expected.
    pub fn has_zero_disk_signature(&self) -> bool {
        self.disk_signature == [0u8; 4]
    }

    /// The reserved bytes following the disk signature.
    pub fn reserved(&self) -> [u8; 2] {
        self.reserved
    }

    /// The opaque 440-byte bootstrap code area.
    pub fn bootstrap_code(&self) -> &[u8] {
        &self.bootstrap
    }

    /// All four partition slots, including empty ones.
    pub fn partitions(&self) -> &[PartitionRecord; 4] {
        &self.partitions
    }

    /// The boot signature (0xAA55 for any decoded record).
    pub fn boot_signature(&self) -> u16 {
        self.boot_signature
    }
}

/// Enumerates the four MBR slots over an owned source.
pub struct MbrDriver {
    record: MasterBootRecord,
    source: Box<dyn ReadSeek>,
    cursor: usize,
}

impl MbrDriver {
    /// Pair a decoded record with the source it was decoded from.
    pub fn new(record: MasterBootRecord, source: Box<dyn ReadSeek>) -> Self {
        Self {
            record,
            source,
            cursor: 0,
        }
    }

    /// The decoded record backing this driver.
    pub fn record(&self) -> &MasterBootRecord {
        &self.record
    }
}

impl Driver for MbrDriver {
    fn next_partition(&mut self) -> Result<Option<PartitionHandle<'_>>> {
        if self.cursor >= MasterBootRecord::NUM_SLOTS {
            return Ok(None);
        }
        let entry = self.record.partitions[self.cursor];
        self.cursor += 1;

        let offset = u64::from(entry.start_sector) * SECTOR_SIZE;
        let length = u64::from(entry.sector_count) * SECTOR_SIZE;
        let reader = SectionReader::new(&mut *self.source as &mut dyn ReadSeek, offset, length)?;

        let meta = PartitionMeta {
            name: entry.slot().to_string(),
            type_id: vec![entry.type_code],
            start_sector: u64::from(entry.start_sector),
            sector_count: u64::from(entry.sector_count),
            bootable: entry.bootable,
            supported: true,
        };

        Ok(Some(PartitionHandle::new(meta, reader)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read, Seek};

    /// A slot to place in a synthetic boot sector.
    struct TestSlot {
        bootable: bool,
        type_code: u8,
        start_sector: u32,
        sector_count: u32,
    }

    /// Build one 512-byte boot sector with the given slots and signature.
    fn build_boot_sector(slots: &[TestSlot], signature: u16) -> [u8; 512] {
        let mut sector = [0u8; 512];

        // Disk signature
        sector[0..4].copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);

        for (i, slot) in slots.iter().enumerate() {
            let off = 0x1BE + i * 16;
            sector[off] = if slot.bootable { 0x80 } else { 0x00 };
            sector[off + 4] = slot.type_code;
            sector[off + 8..off + 12].copy_from_slice(&slot.start_sector.to_le_bytes());
            sector[off + 12..off + 16].copy_from_slice(&slot.sector_count.to_le_bytes());
        }

        sector[510..512].copy_from_slice(&signature.to_le_bytes());
        sector
    }

    /// Lay a boot sector into sector 0 of an image of `total_sectors`.
    fn build_image(boot_sector: [u8; 512], total_sectors: usize) -> Vec<u8> {
        let mut image = vec![0u8; total_sectors * 512];
        image[..512].copy_from_slice(&boot_sector);
        image
    }

    fn two_data_slots() -> Vec<TestSlot> {
        vec![
            TestSlot {
                bootable: true,
                type_code: 0xAB,
                start_sector: 63,
                sector_count: 16384,
            },
            TestSlot {
                bootable: false,
                type_code: 0xAF,
                start_sector: 16447,
                sector_count: 16322,
            },
        ]
    }

    #[test]
    fn decode_preserves_literal_field_values() {
        let image = build_image(build_boot_sector(&two_data_slots(), 0xAA55), 64);
        let mut cursor = Cursor::new(image);

        let record = MasterBootRecord::decode(&mut cursor).unwrap();

        assert_eq!(record.boot_signature(), 0xAA55);
        assert_eq!(record.disk_signature(), [0xDE, 0xAD, 0xBE, 0xEF]);
        assert!(!record.has_zero_disk_signature());

        let parts = record.partitions();
        assert!(parts[0].bootable);
        assert_eq!(parts[0].type_code, 0xAB);
        assert_eq!(parts[0].start_sector, 63);
        assert_eq!(parts[0].sector_count, 16384);
        assert!(!parts[1].bootable);
        assert_eq!(parts[1].start_sector, 16447);
        assert_eq!(parts[1].sector_count, 16322);
        // Untouched slots decode as empty
        assert_eq!(parts[2].type_code, 0x00);
        assert_eq!(parts[3].sector_count, 0);
        assert_eq!(parts[3].slot(), 3);
    }

    #[test]
    fn invalid_boot_signature_is_rejected() {
        let image = build_image(build_boot_sector(&two_data_slots(), 0x1337), 64);
        let mut cursor = Cursor::new(image);

        let err = MasterBootRecord::decode(&mut cursor).unwrap_err();
        assert!(matches!(err, Error::InvalidSignature(0x1337)));
    }

    #[test]
    fn short_buffer_is_truncated_read() {
        // The last two bytes spell a valid signature, but the sector is
        // still short of 512 bytes.
        let mut short = vec![0u8; 256];
        short[254] = 0x55;
        short[255] = 0xAA;
        let mut cursor = Cursor::new(short);

        let err = MasterBootRecord::decode(&mut cursor).unwrap_err();
        assert!(matches!(err, Error::TruncatedRead(_)));
    }

    #[test]
    fn decode_reads_from_current_position() {
        // Valid boot sector at sector 4, garbage before it.
        let boot = build_boot_sector(&two_data_slots(), 0xAA55);
        let mut image = vec![0x5A; 8 * 512];
        image[4 * 512..5 * 512].copy_from_slice(&boot);
        let mut cursor = Cursor::new(image);

        cursor.seek(SeekFrom::Start(4 * 512)).unwrap();
        let record = MasterBootRecord::decode(&mut cursor).unwrap();
        assert_eq!(record.partitions()[0].start_sector, 63);
    }

    #[test]
    fn extended_chain_terminator_adjusts_slot() {
        let slots = vec![TestSlot {
            bootable: false,
            type_code: 0x05,
            start_sector: 100,
            sector_count: 500,
        }];
        // Sector 100 holds no valid nested signature: that terminates the
        // chain, and the slot skips the two sectors of the nested table.
        let image = build_image(build_boot_sector(&slots, 0xAA55), 1024);
        let mut cursor = Cursor::new(image);

        let record = MasterBootRecord::decode(&mut cursor).unwrap();
        assert_eq!(record.partitions()[0].start_sector, 102);
        assert_eq!(record.partitions()[0].sector_count, 498);
    }

    #[test]
    fn extended_lba_type_gets_same_adjustment() {
        let slots = vec![TestSlot {
            bootable: false,
            type_code: 0x0F,
            start_sector: 64,
            sector_count: 128,
        }];
        let image = build_image(build_boot_sector(&slots, 0xAA55), 256);
        let mut cursor = Cursor::new(image);

        let record = MasterBootRecord::decode(&mut cursor).unwrap();
        assert_eq!(record.partitions()[0].start_sector, 66);
        assert_eq!(record.partitions()[0].sector_count, 126);
    }

    #[test]
    fn chained_extended_record_is_unsupported() {
        let slots = vec![TestSlot {
            bootable: false,
            type_code: 0x05,
            start_sector: 100,
            sector_count: 500,
        }];
        let mut image = build_image(build_boot_sector(&slots, 0xAA55), 1024);
        // A further valid boot record at sector 100
        let nested = build_boot_sector(&[], 0xAA55);
        image[100 * 512..101 * 512].copy_from_slice(&nested);
        let mut cursor = Cursor::new(image);

        let err = MasterBootRecord::decode(&mut cursor).unwrap_err();
        assert!(matches!(err, Error::UnsupportedExtendedChain(_)));
    }

    #[test]
    fn driver_visits_all_four_slots_then_stays_exhausted() {
        let image = build_image(build_boot_sector(&two_data_slots(), 0xAA55), 64);
        let mut cursor = Cursor::new(image);
        let record = MasterBootRecord::decode(&mut cursor).unwrap();
        let mut driver = MbrDriver::new(record, Box::new(cursor));

        let mut names = Vec::new();
        while let Some(partition) = driver.next_partition().unwrap() {
            names.push(partition.name().to_string());
        }
        assert_eq!(names, ["0", "1", "2", "3"]);

        assert!(driver.next_partition().unwrap().is_none());
        assert!(driver.next_partition().unwrap().is_none());
    }

    #[test]
    fn driver_hands_out_bounded_readers() {
        let boot = build_boot_sector(
            &[TestSlot {
                bootable: false,
                type_code: 0x83,
                start_sector: 2,
                sector_count: 3,
            }],
            0xAA55,
        );
        let mut image = build_image(boot, 16);
        // Mark the partition's first byte so we can recognize it
        image[2 * 512] = 0x7E;
        let mut cursor = Cursor::new(image);

        let record = MasterBootRecord::decode(&mut cursor).unwrap();
        let mut driver = MbrDriver::new(record, Box::new(cursor));

        let mut partition = driver.next_partition().unwrap().unwrap();
        assert_eq!(partition.start_sector(), 2);
        assert_eq!(partition.sector_count(), 3);
        assert_eq!(partition.type_id(), &[0x83]);

        let mut contents = Vec::new();
        partition.read_to_end(&mut contents).unwrap();
        assert_eq!(contents.len(), 3 * 512);
        assert_eq!(contents[0], 0x7E);
    }
}
