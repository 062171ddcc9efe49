//! Direct filesystem wrapper
//!
//! Used when an image carries no partition table at all but a registered
//! filesystem probe recognizes its first bytes: the whole image is exposed
//! as one synthetic partition starting at sector 0.

use platter_core::{
    Driver, PartitionHandle, PartitionMeta, ReadSeek, Result, SECTOR_SIZE,
};
use platter_stream::SectionReader;
use std::io::SeekFrom;

/// Driver that yields the entire source as a single pseudo-partition,
/// then is exhausted.
pub struct DirectDriver {
    source: Box<dyn ReadSeek>,
    length: u64,
    emitted: bool,
}

impl DirectDriver {
    /// Wrap a source whose content is a bare filesystem.
    ///
    /// Measures the total length and rewinds to offset 0; a source that
    /// cannot seek back to the start is unusable, so that failure is fatal
    /// here rather than deferred to the first read.
    pub fn new(mut source: Box<dyn ReadSeek>) -> Result<Self> {
        let length = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;

        Ok(Self {
            source,
            length,
            emitted: false,
        })
    }

    /// Total length of the wrapped source in bytes.
    pub fn length(&self) -> u64 {
        self.length
    }
}

impl Driver for DirectDriver {
    fn next_partition(&mut self) -> Result<Option<PartitionHandle<'_>>> {
        if self.emitted {
            return Ok(None);
        }
        self.emitted = true;

        let meta = PartitionMeta {
            name: "0".to_string(),
            type_id: Vec::new(),
            start_sector: 0,
            sector_count: self.length.div_ceil(SECTOR_SIZE),
            bootable: false,
            supported: true,
        };
        let reader = SectionReader::new(&mut *self.source as &mut dyn ReadSeek, 0, self.length)?;

        Ok(Some(PartitionHandle::new(meta, reader)))
    }
}
