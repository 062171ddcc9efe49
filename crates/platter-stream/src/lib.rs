//! # Platter Stream
//!
//! Stream utilities for the platter disk-image reader:
//! - **SectionReader**: bounded, seekable window over an inner stream
//!   (used to hand out partitions as independent byte ranges)
//! - **MmapStream**: read-only memory-mapped file access
//!
//! ## Example
//!
//! ```rust
//! use platter_stream::SectionReader;
//! use std::io::{Cursor, Read};
//!
//! let image = Cursor::new(vec![0u8; 4096]);
//!
//! // A window over bytes 512..1024
//! let mut section = SectionReader::new(image, 512, 512).unwrap();
//! let mut sector = [0u8; 512];
//! section.read_exact(&mut sector).unwrap();
//! ```

pub mod mmap;
pub mod section;

pub use mmap::MmapStream;
pub use section::SectionReader;
