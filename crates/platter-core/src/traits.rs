//! Core traits for disk-image partition enumeration

use crate::{error::Result, partition::PartitionHandle};
use std::io::{Read, Seek};

/// Combined trait for Read + Seek
pub trait ReadSeek: Read + Seek + Send {}

/// Blanket implementation for any type that implements Read + Seek
impl<T: Read + Seek + Send> ReadSeek for T {}

/// Uniform enumeration over the partitions of one decoded disk image.
///
/// There is one implementation per partitioning scheme (MBR, GPT, direct
/// filesystem); the scheme is selected once at open time and never changes
/// afterwards.
///
/// All implementations share and reposition the seek cursor of a single
/// underlying source, so a driver must not be used from more than one
/// thread at a time; callers needing concurrency must serialize access or
/// open one driver per session.
pub trait Driver: Send {
    /// Yield the next partition, or `Ok(None)` once the table is exhausted.
    ///
    /// The returned handle borrows the driver, so the handle for a prior
    /// partition (and its bounded reader) is invalidated as soon as the
    /// cursor advances. After exhaustion, every further call returns
    /// `Ok(None)`.
    fn next_partition(&mut self) -> Result<Option<PartitionHandle<'_>>>;
}

/// A caller-supplied filesystem-signature predicate.
///
/// Probes are invoked against the source rewound to offset 0 and return
/// whether the stream begins with a recognizable filesystem signature.
/// They are only consulted when no valid partition table is present.
pub type FilesystemProbe = Box<dyn Fn(&mut dyn ReadSeek) -> bool + Send + Sync>;
