//! One-shot zstd and lz4 transformers, registered as `"zstd"` and `"lz4"`.
//!
//! These are not part of the legacy wire contract; chunked files reach them
//! through the header's `transformer` entry.

use super::Transformer;
use crate::error::{Error, Result};
use crate::iovec::IoVec;

pub const DEFAULT_ZSTD_LEVEL: i32 = 3;

pub struct ZstdEncode {
    level: i32,
    out: Vec<u8>,
}

impl ZstdEncode {
    pub fn new(level: i32) -> Self {
        Self {
            level,
            out: Vec::new(),
        }
    }
}

impl Transformer for ZstdEncode {
    fn transform(&mut self, input: IoVec<'_>) -> Result<&[u8]> {
        let flat = input.flatten();
        self.out = zstd::encode_all(&flat[..], self.level)
            .map_err(|e| Error::Transform(format!("zstd encode: {e}")))?;
        Ok(&self.out)
    }
}

#[derive(Default)]
pub struct ZstdDecode {
    out: Vec<u8>,
}

impl Transformer for ZstdDecode {
    fn transform(&mut self, input: IoVec<'_>) -> Result<&[u8]> {
        let flat = input.flatten();
        self.out = zstd::decode_all(&flat[..])
            .map_err(|e| Error::Transform(format!("zstd decode: {e}")))?;
        Ok(&self.out)
    }
}

#[derive(Default)]
pub struct Lz4Encode {
    out: Vec<u8>,
}

impl Transformer for Lz4Encode {
    fn transform(&mut self, input: IoVec<'_>) -> Result<&[u8]> {
        let flat = input.flatten();
        self.out = lz4_flex::compress_prepend_size(&flat);
        Ok(&self.out)
    }
}

#[derive(Default)]
pub struct Lz4Decode {
    out: Vec<u8>,
}

impl Transformer for Lz4Decode {
    fn transform(&mut self, input: IoVec<'_>) -> Result<&[u8]> {
        let flat = input.flatten();
        self.out = lz4_flex::decompress_size_prepended(&flat)
            .map_err(|e| Error::Transform(format!("lz4 decode: {e}")))?;
        Ok(&self.out)
    }
}
