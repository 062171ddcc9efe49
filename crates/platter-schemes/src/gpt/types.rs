//! GPT header and partition entry structures

use platter_core::{Error, Result};
use uuid::Uuid;

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
        bytes[offset + 4],
        bytes[offset + 5],
        bytes[offset + 6],
        bytes[offset + 7],
    ])
}

fn read_guid(bytes: &[u8], offset: usize) -> Uuid {
    let mut raw = [0u8; 16];
    raw.copy_from_slice(&bytes[offset..offset + 16]);
    // GPT stores GUIDs with the first three fields little-endian
    Uuid::from_bytes_le(raw)
}

/// Well-known partition type GUIDs.
pub mod type_guids {
    use uuid::{uuid, Uuid};

    /// EFI System Partition
    pub const EFI_SYSTEM: Uuid = uuid!("c12a7328-f81f-11d2-ba4b-00a0c93ec93b");
    /// Microsoft Basic Data (FAT, NTFS, exFAT)
    pub const MICROSOFT_BASIC_DATA: Uuid = uuid!("ebd0a0a2-b9e5-4433-87c0-68b6b72699c7");
    /// Linux filesystem
    pub const LINUX_FILESYSTEM: Uuid = uuid!("0fc63daf-8483-4772-8e79-3d69d8477de4");
    /// Linux swap
    pub const LINUX_SWAP: Uuid = uuid!("0657fd6d-a4ab-43c4-84e5-0933c84b4f4f");

    /// Human-readable name for a type GUID.
    pub fn name(guid: &Uuid) -> &'static str {
        if guid.is_nil() {
            "Unused"
        } else if *guid == EFI_SYSTEM {
            "EFI System"
        } else if *guid == MICROSOFT_BASIC_DATA {
            "Microsoft Basic Data"
        } else if *guid == LINUX_FILESYSTEM {
            "Linux filesystem"
        } else if *guid == LINUX_SWAP {
            "Linux swap"
        } else {
            "Unknown"
        }
    }
}

/// The GPT header at LBA 1.
#[derive(Debug, Clone)]
pub struct GptHeader {
    pub revision: u32,
    pub header_size: u32,
    pub header_crc32: u32,
    pub current_lba: u64,
    pub backup_lba: u64,
    pub first_usable_lba: u64,
    pub last_usable_lba: u64,
    pub disk_guid: Uuid,
    pub entry_array_lba: u64,
    pub entry_count: u32,
    pub entry_size: u32,
    pub entry_array_crc32: u32,
}

impl GptHeader {
    /// Magic bytes at the start of the header.
    pub const SIGNATURE: &'static [u8; 8] = b"EFI PART";

    /// Minimum (and common) declared header size.
    pub const MIN_SIZE: u32 = 92;

    /// Decode the header from the sector read at LBA 1.
    ///
    /// Validates the magic signature and the declared header size, but not
    /// the checksum; call [`GptHeader::verify_crc32`] with the same sector
    /// afterwards.
    pub fn decode(sector: &[u8]) -> Result<Self> {
        if sector.len() < Self::MIN_SIZE as usize {
            return Err(Error::invalid_header(format!(
                "header sector is {} bytes, need at least {}",
                sector.len(),
                Self::MIN_SIZE
            )));
        }
        if &sector[0..8] != Self::SIGNATURE {
            return Err(Error::invalid_header(
                "signature \"EFI PART\" not found at LBA 1",
            ));
        }

        let header_size = read_u32(sector, 12);
        if header_size < Self::MIN_SIZE || header_size as usize > sector.len() {
            return Err(Error::invalid_header(format!(
                "declared header size {} outside {}..={}",
                header_size,
                Self::MIN_SIZE,
                sector.len()
            )));
        }

        Ok(Self {
            revision: read_u32(sector, 8),
            header_size,
            header_crc32: read_u32(sector, 16),
            current_lba: read_u64(sector, 24),
            backup_lba: read_u64(sector, 32),
            first_usable_lba: read_u64(sector, 40),
            last_usable_lba: read_u64(sector, 48),
            disk_guid: read_guid(sector, 56),
            entry_array_lba: read_u64(sector, 72),
            entry_count: read_u32(sector, 80),
            entry_size: read_u32(sector, 84),
            entry_array_crc32: read_u32(sector, 88),
        })
    }

    /// Check the header CRC32 against the raw sector it was decoded from.
    ///
    /// The checksum covers the first `header_size` bytes with the checksum
    /// field itself zeroed.
    pub fn verify_crc32(&self, sector: &[u8]) -> bool {
        if sector.len() < self.header_size as usize {
            return false;
        }
        let mut covered = sector[..self.header_size as usize].to_vec();
        covered[16..20].fill(0);

        crc32fast::hash(&covered) == self.header_crc32
    }

    /// Check the entry-array CRC32 against the raw array bytes.
    pub fn verify_entry_array_crc32(&self, array: &[u8]) -> bool {
        let covered = self.entry_count as usize * self.entry_size as usize;
        if array.len() < covered {
            return false;
        }

        crc32fast::hash(&array[..covered]) == self.entry_array_crc32
    }
}

/// One 128-byte partition entry.
#[derive(Debug, Clone)]
pub struct GptPartitionEntry {
    /// Partition type GUID; nil marks the entry unused
    pub type_guid: Uuid,
    /// Unique per-partition GUID
    pub unique_guid: Uuid,
    /// First sector (inclusive)
    pub first_lba: u64,
    /// Last sector (inclusive)
    pub last_lba: u64,
    /// Attribute flags
    pub attributes: u64,
    /// Embedded name, decoded from its 36-unit UTF-16LE field
    pub name: String,
}

impl GptPartitionEntry {
    /// Minimum entry size; headers may declare larger (power-of-two) sizes,
    /// with the extra bytes reserved.
    pub const MIN_ENTRY_SIZE: u32 = 128;

    /// Attribute bit 2: bootable by legacy BIOS.
    pub const ATTR_LEGACY_BIOS_BOOTABLE: u64 = 1 << 2;

    /// Decode one entry. `raw` must hold at least
    /// [`GptPartitionEntry::MIN_ENTRY_SIZE`] bytes.
    pub fn decode(raw: &[u8]) -> Self {
        debug_assert!(raw.len() >= Self::MIN_ENTRY_SIZE as usize);

        Self {
            type_guid: read_guid(raw, 0),
            unique_guid: read_guid(raw, 16),
            first_lba: read_u64(raw, 32),
            last_lba: read_u64(raw, 40),
            attributes: read_u64(raw, 48),
            name: decode_utf16le_name(&raw[56..128]),
        }
    }

    /// True if the type GUID is all-zero; such entries are skipped, not
    /// errors.
    pub fn is_unused(&self) -> bool {
        self.type_guid.is_nil()
    }

    /// Number of sectors covered by the inclusive LBA range. An all-zero
    /// extent reports 0 sectors, not a phantom sector at LBA 0.
    pub fn sector_count(&self) -> u64 {
        if self.last_lba < self.first_lba || self.last_lba == 0 {
            0
        } else {
            (self.last_lba - self.first_lba).saturating_add(1)
        }
    }

    /// Bootable either as an EFI System partition or via the legacy BIOS
    /// attribute bit.
    pub fn is_bootable(&self) -> bool {
        self.type_guid == type_guids::EFI_SYSTEM
            || self.attributes & Self::ATTR_LEGACY_BIOS_BOOTABLE != 0
    }

    /// Whether the type GUID belongs to the set of filesystem-bearing
    /// types this implementation knows how to interpret further.
    pub fn is_supported(&self) -> bool {
        self.type_guid == type_guids::EFI_SYSTEM
            || self.type_guid == type_guids::MICROSOFT_BASIC_DATA
            || self.type_guid == type_guids::LINUX_FILESYSTEM
    }

    /// The type GUID in its on-disk byte order.
    pub fn type_guid_bytes(&self) -> [u8; 16] {
        self.type_guid.to_bytes_le()
    }
}

/// Decode a fixed-width UTF-16LE name field, stopping at the first NUL.
fn decode_utf16le_name(raw: &[u8]) -> String {
    let mut units = Vec::with_capacity(raw.len() / 2);
    for pair in raw.chunks_exact(2) {
        let unit = u16::from_le_bytes([pair[0], pair[1]]);
        if unit == 0 {
            break;
        }
        units.push(unit);
    }

    String::from_utf16_lossy(&units)
}
