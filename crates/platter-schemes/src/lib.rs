//! # Platter Schemes
//!
//! Partition-table detection and decoding for raw disk images:
//!
//! - **MBR**: Master Boot Record, including Extended Boot Record handling
//! - **GPT**: GUID Partition Table with CRC32-validated header and entries
//! - **Direct**: no partition table, the whole image is one filesystem
//!
//! [`open`] picks the scheme for an image and returns a uniform
//! [`platter_core::Driver`] over its partitions.
//!
//! ## Example
//!
//! ```rust,no_run
//! use platter_schemes::open;
//! use std::fs::File;
//!
//! let file = File::open("disk.img").unwrap();
//! let mut driver = open(Box::new(file), &[]).unwrap();
//!
//! while let Some(partition) = driver.next_partition().unwrap() {
//!     println!(
//!         "{}: LBA {} + {} sectors",
//!         partition.name(),
//!         partition.start_sector(),
//!         partition.sector_count()
//!     );
//! }
//! ```

pub mod detect;
pub mod direct;
pub mod gpt;
pub mod mbr;

pub use detect::open;
pub use direct::DirectDriver;
pub use gpt::{GptDriver, GuidPartitionTable};
pub use mbr::{MasterBootRecord, MbrDriver};
