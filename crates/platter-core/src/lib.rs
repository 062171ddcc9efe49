//! # Platter Core
//!
//! Shared contracts for the platter disk-image partitioning reader:
//!
//! - [`Driver`]: scheme-agnostic "next partition" enumeration
//! - [`PartitionHandle`] / [`PartitionMeta`]: one partition's metadata and
//!   its bounded byte range
//! - [`ReadSeek`]: the random-access-source capability all decoders consume
//! - [`FilesystemProbe`]: caller-supplied signature predicates used when no
//!   partition table is present
//! - [`Error`] / [`Result`]: decode errors, including the recoverable kinds
//!   the scheme selector reinterprets as fallback triggers
//!
//! ## Example
//!
//! ```rust,no_run
//! use platter_core::{Driver, Result};
//!
//! fn dump_names(driver: &mut dyn Driver) -> Result<()> {
//!     while let Some(partition) = driver.next_partition()? {
//!         println!("{} ({} sectors)", partition.name(), partition.sector_count());
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod partition;
pub mod traits;

// Re-export commonly used items
pub use error::{Error, Result};
pub use partition::{PartitionHandle, PartitionMeta, SECTOR_SIZE};
pub use traits::{Driver, FilesystemProbe, ReadSeek};
