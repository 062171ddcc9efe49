//! Error types for partition-table decoding

use thiserror::Error;

/// The error type for all platter decode operations.
///
/// Two variants double as control-flow signals for the scheme selector and
/// are matched on by kind rather than treated as opaque failures:
/// [`Error::InvalidSignature`] triggers the filesystem-probe fallback, and
/// any GPT failure on a disk whose MBR carries a non-zero disk signature
/// falls back to the MBR itself. Everything else is surfaced verbatim.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error from the underlying source
    #[error("source I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A fixed-size on-disk structure could not be read in full
    #[error("truncated read: {0}")]
    TruncatedRead(String),

    /// The MBR boot signature was not 0xAA55
    #[error("invalid boot record signature: expected 0xAA55, got 0x{0:04X}")]
    InvalidSignature(u16),

    /// An extended partition chained into a further valid boot record
    #[error("unsupported extended boot record chain: {0}")]
    UnsupportedExtendedChain(String),

    /// The GPT header failed structural validation
    #[error("invalid GPT header: {0}")]
    InvalidHeader(String),

    /// A CRC32 check over the GPT header or entry array failed
    #[error("checksum mismatch: {0}")]
    ChecksumMismatch(String),
}

/// Result type alias for platter operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a truncated read error
    pub fn truncated(msg: impl Into<String>) -> Self {
        Error::TruncatedRead(msg.into())
    }

    /// Create an unsupported extended chain error
    pub fn unsupported_chain(msg: impl Into<String>) -> Self {
        Error::UnsupportedExtendedChain(msg.into())
    }

    /// Create an invalid GPT header error
    pub fn invalid_header(msg: impl Into<String>) -> Self {
        Error::InvalidHeader(msg.into())
    }

    /// Create a checksum mismatch error
    pub fn checksum_mismatch(msg: impl Into<String>) -> Self {
        Error::ChecksumMismatch(msg.into())
    }
}
