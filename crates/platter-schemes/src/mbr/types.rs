//! MBR partition type codes and CHS addressing

use std::fmt;

/// One-byte MBR partition type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionType(pub u8);

impl PartitionType {
    pub const EMPTY: Self = Self(0x00);
    pub const EXTENDED: Self = Self(0x05);
    pub const EXTENDED_LBA: Self = Self(0x0F);
    pub const GPT_PROTECTIVE: Self = Self(0xEE);

    /// True for the Extended/Extended-LBA container types, whose start
    /// sector holds a nested boot record rather than filesystem data.
    pub fn is_extended(self) -> bool {
        self == Self::EXTENDED || self == Self::EXTENDED_LBA
    }

    /// Human-readable name for the common type codes.
    pub fn name(self) -> &'static str {
        match self.0 {
            0x00 => "Empty",
            0x01 => "FAT12",
            0x04 => "FAT16 (<32MB)",
            0x05 => "Extended",
            0x06 => "FAT16",
            0x07 => "NTFS/exFAT",
            0x0B => "FAT32 (CHS)",
            0x0C => "FAT32 (LBA)",
            0x0E => "FAT16 (LBA)",
            0x0F => "Extended (LBA)",
            0x82 => "Linux swap",
            0x83 => "Linux",
            0xAB => "Apple boot",
            0xAF => "Apple HFS/HFS+",
            0xEE => "GPT Protective",
            0xEF => "EFI System",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for PartitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.0)
    }
}

/// CHS (Cylinder-Head-Sector) address as stored in an MBR partition record.
///
/// Retained for completeness only; all offset computation uses the LBA
/// fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChsAddress {
    pub cylinder: u16,
    pub head: u8,
    pub sector: u8,
}

impl ChsAddress {
    /// Decode the packed 3-byte on-disk form: head, then sector in the low
    /// 6 bits of the second byte with the cylinder's top 2 bits above it,
    /// then the cylinder's low 8 bits.
    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        let head = bytes[0];
        let sector = bytes[1] & 0x3F;
        let cylinder = (u16::from(bytes[1] & 0xC0) << 2) | u16::from(bytes[2]);

        Self {
            cylinder,
            head,
            sector,
        }
    }

    /// Re-encode into the packed 3-byte form.
    pub fn to_bytes(self) -> [u8; 3] {
        [
            self.head,
            (self.sector & 0x3F) | (((self.cylinder >> 8) & 0x03) as u8) << 6,
            (self.cylinder & 0xFF) as u8,
        ]
    }
}

impl fmt::Display for ChsAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C:{}/H:{}/S:{}", self.cylinder, self.head, self.sector)
    }
}
