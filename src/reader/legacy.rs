//! Legacy (v1) framing readers: unpacked and packed.

use std::io::Read;

use crate::block::{self, BLOCK_HEADER_LEN};
use crate::error::{Error, Result};
use crate::iovec::IoVec;
use crate::magic::Magic;
use crate::stream::read_full;
use crate::transform::Transformer;

/// Reads raw legacy blocks framed by the fixed 20-byte header.
struct BaseReader<R> {
    src: R,
    magic: Magic,
    buf: Vec<u8>,
}

impl<R: Read> BaseReader<R> {
    fn new(src: R, magic: Magic) -> Self {
        Self {
            src,
            magic,
            buf: Vec::new(),
        }
    }

    /// Read the next block payload into the internal buffer. `Ok(false)` at
    /// a clean end of file.
    fn scan(&mut self) -> Result<bool> {
        let mut header = [0u8; BLOCK_HEADER_LEN];
        let n = read_full(&mut self.src, &mut header)?;
        if n == 0 {
            return Ok(false);
        }
        if n != BLOCK_HEADER_LEN {
            return Err(Error::UnexpectedEof {
                wanted: BLOCK_HEADER_LEN,
                got: n,
            });
        }
        let size = block::parse_block_header(&header, &self.magic)? as usize;
        self.buf.resize(size, 0);
        let n = read_full(&mut self.src, &mut self.buf)?;
        if n != size {
            return Err(Error::UnexpectedEof {
                wanted: size,
                got: n,
            });
        }
        Ok(true)
    }
}

/// One record per block, optionally behind a decode transformer.
pub(crate) struct UnpackedReader<R> {
    base: BaseReader<R>,
    transformer: Option<Box<dyn Transformer + Send>>,
    record: Vec<u8>,
}

impl<R: Read> UnpackedReader<R> {
    pub fn new(src: R, magic: Magic, transformer: Option<Box<dyn Transformer + Send>>) -> Self {
        Self {
            base: BaseReader::new(src, magic),
            transformer,
            record: Vec::new(),
        }
    }

    pub fn scan(&mut self) -> Result<bool> {
        if !self.base.scan()? {
            return Ok(false);
        }
        std::mem::swap(&mut self.record, &mut self.base.buf);
        if let Some(t) = &mut self.transformer {
            let out = t.transform(IoVec::new(&[self.record.as_slice()]))?;
            self.record = out.to_vec();
        }
        Ok(true)
    }

    pub fn get(&self) -> &[u8] {
        &self.record
    }

    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.record)
    }
}

/// Packed blocks: each block payload is a CRC-guarded item list, with the
/// transform applied to the items region only.
pub(crate) struct PackedReader<R> {
    base: BaseReader<R>,
    transformer: Option<Box<dyn Transformer + Send>>,
    /// Item bytes of the current block (decoded when a transformer is set).
    block: Vec<u8>,
    items_start: usize,
    spans: Vec<(usize, usize)>,
    cur: usize,
}

impl<R: Read> PackedReader<R> {
    pub fn new(src: R, magic: Magic, transformer: Option<Box<dyn Transformer + Send>>) -> Self {
        Self {
            base: BaseReader::new(src, magic),
            transformer,
            block: Vec::new(),
            items_start: 0,
            spans: Vec::new(),
            cur: 0,
        }
    }

    pub fn scan(&mut self) -> Result<bool> {
        self.cur += 1;
        while self.cur >= self.spans.len() {
            if !self.read_block()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn read_block(&mut self) -> Result<bool> {
        self.cur = 0;
        self.spans.clear();
        if !self.base.scan()? {
            return Ok(false);
        }
        let payload = std::mem::take(&mut self.base.buf);
        // The CRC is verified against the payload as stored, before any
        // untransform of the items region.
        let parsed = block::parse_packed_sizes(&payload)?;
        let want = parsed.items_len();
        self.spans = parsed.spans;
        if let Some(t) = &mut self.transformer {
            let items = &payload[parsed.items_start..];
            let out = t.transform(IoVec::new(&[items]))?;
            self.block = out.to_vec();
            self.items_start = 0;
        } else {
            self.block = payload;
            self.items_start = parsed.items_start;
        }
        if self.block.len() - self.items_start != want {
            return Err(Error::TrailingJunk(
                "decoded block length does not match the item size vector",
            ));
        }
        Ok(true)
    }

    pub fn get(&self) -> &[u8] {
        let (off, len) = self.spans[self.cur];
        &self.block[self.items_start + off..self.items_start + off + len]
    }

    pub fn take(&mut self) -> Vec<u8> {
        self.get().to_vec()
    }
}
