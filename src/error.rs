use std::io;
use thiserror::Error;

use crate::magic::Magic;

pub type Result<T> = std::result::Result<T, Error>;

fn expected_note(expected: &Option<Magic>) -> String {
    match expected {
        Some(m) => format!(", expected [{}]", hex::encode(m)),
        None => String::new(),
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// Underlying source or sink failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The source reported end of file where more bytes were required.
    #[error("unexpected end of stream: wanted {wanted} bytes, read {got}")]
    UnexpectedEof { wanted: usize, got: usize },

    /// Block or chunk magic did not match an acceptable value.
    #[error("bad block magic [{}]{}", hex::encode(.found), expected_note(.expected))]
    BadMagic {
        found: Magic,
        expected: Option<Magic>,
    },

    /// The magic changed in the middle of a chunk sequence.
    #[error("magic changed mid-sequence: got [{}], expected [{}]", hex::encode(.found), hex::encode(.expected))]
    MagicChanged { found: Magic, expected: Magic },

    /// A chunk arrived out of order within its block.
    #[error("wrong chunk index {found}, expected {expected}")]
    IndexMismatch { found: u32, expected: u32 },

    /// The declared chunk total changed within a block.
    #[error("wrong total chunk count {found}, expected {expected}")]
    TotalMismatch { found: u32, expected: u32 },

    /// CRC32 mismatch on a chunk, a legacy block header, or a packed item
    /// list.
    #[error("checksum mismatch: expected {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// A varint ran past ten bytes or set the continuation bit on the tenth.
    #[error("invalid varint encoding")]
    InvalidVarint,

    /// A fixed-size field extended past the end of its buffer.
    #[error("truncated input while reading {0}")]
    Truncated(&'static str),

    /// Unknown or misplaced header value type tag.
    #[error("invalid header value type {0}")]
    InvalidValueType(u8),

    /// A declared size is outside the permitted range.
    #[error("invalid size: {0}")]
    InvalidSize(String),

    /// Decoded bytes are inconsistent with the declared item sizes, or the
    /// decoder left input unconsumed.
    #[error("trailing junk: {0}")]
    TrailingJunk(&'static str),

    /// Seek is unavailable for this reader or location.
    #[error("seek not supported: {0}")]
    SeekUnsupported(&'static str),

    /// Outside of what this implementation supports.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The indexer callback reported a failure.
    #[error("indexer error: {0}")]
    IndexerFailure(String),

    /// A single record is larger than the packed block byte bound.
    #[error("item of {size} bytes exceeds the block byte bound {max}")]
    ItemTooLarge { size: u64, max: u64 },

    /// A transformer rejected its input.
    #[error("transform failed: {0}")]
    Transform(String),
}

/// First-error accumulator. Once an error is recorded, later ones are
/// dropped; the stored error stays readable after the owner goes terminal.
#[derive(Default)]
pub(crate) struct ErrorCell {
    err: Option<Error>,
}

impl ErrorCell {
    pub fn set(&mut self, err: Error) {
        if self.err.is_none() {
            self.err = Some(err);
        }
    }

    pub fn ok(&self) -> bool {
        self.err.is_none()
    }

    pub fn get(&self) -> Option<&Error> {
        self.err.as_ref()
    }
}
