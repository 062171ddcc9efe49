//! Scheme selection
//!
//! Decides, from the MBR's validity and signature bytes, whether an image
//! is MBR-partitioned, GPT-partitioned, or a bare filesystem, and returns
//! the matching driver.

use crate::direct::DirectDriver;
use crate::gpt::{GptDriver, GuidPartitionTable};
use crate::mbr::{MasterBootRecord, MbrDriver};
use platter_core::{Driver, Error, FilesystemProbe, ReadSeek, Result};
use std::io::SeekFrom;

/// Detect the partitioning scheme of `source` and open a driver for it.
///
/// The decision procedure runs in a fixed order:
///
/// 1. Decode the MBR at offset 0.
/// 2. If that failed with `InvalidSignature`, run the registered
///    filesystem probes in order (each against the source rewound to 0);
///    the first match selects the direct driver. No match re-raises the
///    original `InvalidSignature`.
/// 3. Any other MBR failure is fatal; probing is not attempted.
/// 4. With a valid MBR in hand, try GPT. A valid GPT takes precedence
///    (the MBR is commonly only protective).
/// 5. If GPT failed and the MBR's disk signature is all-zero, the MBR is
///    not authoritative: fail with the GPT error.
/// 6. Otherwise fall back to the MBR itself.
pub fn open(mut source: Box<dyn ReadSeek>, probes: &[FilesystemProbe]) -> Result<Box<dyn Driver>> {
    source.seek(SeekFrom::Start(0))?;

    let record = match MasterBootRecord::decode(&mut *source) {
        Ok(record) => record,
        Err(Error::InvalidSignature(found)) => {
            tracing::debug!(
                "no valid MBR (signature 0x{:04X}), trying {} filesystem probe(s)",
                found,
                probes.len()
            );
            for (i, probe) in probes.iter().enumerate() {
                source.seek(SeekFrom::Start(0))?;
                if probe(&mut *source) {
                    tracing::debug!("filesystem probe {} matched, using direct driver", i);
                    return Ok(Box::new(DirectDriver::new(source)?));
                }
            }
            return Err(Error::InvalidSignature(found));
        }
        Err(err) => return Err(err),
    };

    match GuidPartitionTable::decode(&mut *source) {
        Ok(table) => {
            tracing::debug!(
                "GPT decoded with {} partition(s), taking precedence over MBR",
                table.entries().len()
            );
            Ok(Box::new(GptDriver::new(table, source)))
        }
        Err(gpt_err) => {
            if record.has_zero_disk_signature() {
                // A zeroed disk signature promises a GPT; its absence is
                // the real failure, not something to paper over.
                Err(gpt_err)
            } else {
                tracing::debug!("no usable GPT ({}), falling back to MBR", gpt_err);
                Ok(Box::new(MbrDriver::new(record, source)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const SECTOR: usize = 512;

    fn mbr_sector(disk_signature: [u8; 4], boot_signature: u16) -> [u8; 512] {
        let mut sector = [0u8; 512];
        sector[0..4].copy_from_slice(&disk_signature);
        // Four data slots so the MBR enumeration is recognizable
        for slot in 0..4 {
            let off = 0x1BE + slot * 16;
            sector[off + 4] = 0x83;
            sector[off + 8..off + 12].copy_from_slice(&(64 + slot as u32).to_le_bytes());
            sector[off + 12..off + 16].copy_from_slice(&1u32.to_le_bytes());
        }
        sector[510..512].copy_from_slice(&boot_signature.to_le_bytes());
        sector
    }

    fn image_with_mbr(disk_signature: [u8; 4], total_sectors: usize) -> Vec<u8> {
        let mut image = vec![0u8; total_sectors * SECTOR];
        image[..SECTOR].copy_from_slice(&mbr_sector(disk_signature, 0xAA55));
        image
    }

    /// Overlay a minimal valid GPT (header at LBA 1, one entry at LBA 2)
    /// onto an image.
    fn add_gpt(image: &mut [u8]) {
        let header = SECTOR;
        image[header..header + 8].copy_from_slice(b"EFI PART");
        image[header + 12..header + 16].copy_from_slice(&92u32.to_le_bytes());
        image[header + 24..header + 32].copy_from_slice(&1u64.to_le_bytes());
        image[header + 40..header + 48].copy_from_slice(&34u64.to_le_bytes());
        image[header + 48..header + 56].copy_from_slice(&500u64.to_le_bytes());
        image[header + 72..header + 80].copy_from_slice(&2u64.to_le_bytes());
        image[header + 80..header + 84].copy_from_slice(&1u32.to_le_bytes());
        image[header + 84..header + 88].copy_from_slice(&128u32.to_le_bytes());

        let array = 2 * SECTOR;
        image[array..array + 16].copy_from_slice(
            &uuid::uuid!("0fc63daf-8483-4772-8e79-3d69d8477de4").to_bytes_le(),
        );
        image[array + 32..array + 40].copy_from_slice(&40u64.to_le_bytes());
        image[array + 40..array + 48].copy_from_slice(&49u64.to_le_bytes());

        let array_crc = crc32fast::hash(&image[array..array + 128]);
        image[header + 88..header + 92].copy_from_slice(&array_crc.to_le_bytes());

        let mut covered = image[header..header + 92].to_vec();
        covered[16..20].fill(0);
        let header_crc = crc32fast::hash(&covered);
        image[header + 16..header + 20].copy_from_slice(&header_crc.to_le_bytes());
    }

    fn magic_probe(magic: &'static [u8]) -> FilesystemProbe {
        Box::new(move |stream: &mut dyn ReadSeek| {
            let mut buf = vec![0u8; magic.len()];
            stream.read_exact(&mut buf).is_ok() && buf == magic
        })
    }

    #[test]
    fn gpt_takes_precedence_over_valid_mbr() {
        let mut image = image_with_mbr([0x11, 0x22, 0x33, 0x44], 600);
        add_gpt(&mut image);

        let mut driver = open(Box::new(Cursor::new(image)), &[]).unwrap();

        // The GPT declares exactly one partition at LBA 40
        let partition = driver.next_partition().unwrap().unwrap();
        assert_eq!(partition.start_sector(), 40);
        assert_eq!(partition.sector_count(), 10);
        assert!(driver.next_partition().unwrap().is_none());
    }

    #[test]
    fn broken_gpt_with_nonzero_disk_signature_falls_back_to_mbr() {
        let image = image_with_mbr([0x11, 0x22, 0x33, 0x44], 600);

        let mut driver = open(Box::new(Cursor::new(image)), &[]).unwrap();

        // The MBR enumeration always visits its four slots
        let mut start_sectors = Vec::new();
        while let Some(partition) = driver.next_partition().unwrap() {
            start_sectors.push(partition.start_sector());
        }
        assert_eq!(start_sectors, [64, 65, 66, 67]);
    }

    #[test]
    fn broken_gpt_with_zero_disk_signature_is_fatal() {
        let image = image_with_mbr([0, 0, 0, 0], 600);

        let Err(err) = open(Box::new(Cursor::new(image)), &[]) else {
            panic!("expected GPT failure to be fatal");
        };
        assert!(matches!(err, Error::InvalidHeader(_)));
    }

    #[test]
    fn probe_match_selects_direct_driver() {
        // 1024 sectors, no valid MBR, recognizable magic at offset 0
        let mut image = vec![0u8; 1024 * SECTOR];
        image[0..4].copy_from_slice(b"TSTF");

        let probes = vec![magic_probe(b"NOPE"), magic_probe(b"TSTF")];
        let mut driver = open(Box::new(Cursor::new(image)), &probes).unwrap();

        let partition = driver.next_partition().unwrap().unwrap();
        assert_eq!(partition.start_sector(), 0);
        assert_eq!(partition.sector_count(), 1024);
        assert!(driver.next_partition().unwrap().is_none());
    }

    #[test]
    fn first_matching_probe_short_circuits() {
        let mut image = vec![0u8; 64 * SECTOR];
        image[0..4].copy_from_slice(b"TSTF");

        let calls = Arc::new(AtomicUsize::new(0));
        let later_calls = Arc::clone(&calls);
        let probes: Vec<FilesystemProbe> = vec![
            magic_probe(b"TSTF"),
            Box::new(move |_stream: &mut dyn ReadSeek| {
                later_calls.fetch_add(1, Ordering::SeqCst);
                true
            }),
        ];

        open(Box::new(Cursor::new(image)), &probes).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn no_probe_match_reports_original_signature_error() {
        let mut image = vec![0u8; 64 * SECTOR];
        image[510] = 0x12;
        image[511] = 0x34;

        let probes = vec![magic_probe(b"NOPE")];
        let Err(err) = open(Box::new(Cursor::new(image)), &probes) else {
            panic!("expected a signature error");
        };
        assert!(matches!(err, Error::InvalidSignature(0x3412)));
    }

    #[test]
    fn truncated_image_fails_without_probing() {
        let image = vec![0u8; 100];

        let calls = Arc::new(AtomicUsize::new(0));
        let probe_calls = Arc::clone(&calls);
        let probes: Vec<FilesystemProbe> = vec![Box::new(move |_stream: &mut dyn ReadSeek| {
            probe_calls.fetch_add(1, Ordering::SeqCst);
            true
        })];

        let Err(err) = open(Box::new(Cursor::new(image)), &probes) else {
            panic!("expected a truncated read error");
        };
        assert!(matches!(err, Error::TruncatedRead(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn probes_see_the_stream_rewound() {
        let mut image = vec![0u8; 64 * SECTOR];
        image[0..4].copy_from_slice(b"TSTF");

        // Both probes read from offset 0; the first consumes bytes and
        // misses, the second must still see the magic.
        let probes = vec![magic_probe(b"XXXX"), magic_probe(b"TSTF")];
        let driver = open(Box::new(Cursor::new(image)), &probes);
        assert!(driver.is_ok());
    }
}
