use thiserror::Error;

/// Everything that can stop a read pass
#[derive(Debug, Error)]
pub enum Error {
    /// The file could not be opened or a read failed mid-stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream does not follow the word/frame layout.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Stored checksum differs from the one computed over the payload.
    #[error("Checksum mismatch: expected {expected:#06x}, computed {actual:#06x}")]
    Integrity { expected: u16, actual: u16 },

    /// The reader already failed and does not resume.
    #[error("Read pass already halted by a previous error")]
    Halted,

    /// The payload decoder rejected a validated frame.
    #[error("Payload decoder failed: {0}")]
    Decode(Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("File size {len} is not a multiple of the word size")]
    UnalignedLength { len: u64 },

    /// Counts are in words
    #[error("Truncated read: expected {expected} words, found {found}")]
    Truncated { expected: usize, found: usize },

    /// Counts are in bytes
    #[error("Payload length mismatch: expected {expected} bytes, found {found}")]
    PayloadLength { expected: usize, found: usize },

    #[error("Frame starts with the end-of-data sentinel")]
    SentinelCollision,
}

pub type Result<T> = std::result::Result<T, Error>;
