//! Chunked (v2) framing reader: header, data, and trailer blocks carried
//! over the 32 KiB chunk codec.

use std::io::{Read, Seek};

use super::ItemLocation;
use crate::block;
use crate::chunk::{ChunkReader, CHUNK_SIZE};
use crate::error::{Error, Result};
use crate::header::{self, HeaderEntry};
use crate::iovec::IoVec;
use crate::magic::{Magic, MAGIC_HEADER, MAGIC_PACKED, MAGIC_TRAILER};
use crate::transform::{self, Transformer};

pub(crate) struct V2Reader<R> {
    chunks: ChunkReader<R>,
    header: Vec<HeaderEntry>,
    trailer: Vec<u8>,
    untransform: Option<Box<dyn Transformer + Send>>,
    /// Recycled per-item buffers of the current block.
    items: Vec<Vec<u8>>,
    n_items: usize,
    next_item: usize,
    cur: usize,
    /// Items to skip in the next block, armed by `seek`.
    skip: u32,
}

impl<R: Read + Seek> V2Reader<R> {
    /// Open sequence: parse the header block, capture the trailer when the
    /// header declares one, return to the first data block, and build the
    /// decode transformer the header names.
    pub fn new(src: R) -> Result<Self> {
        let mut rd = Self {
            chunks: ChunkReader::new(src),
            header: Vec::new(),
            trailer: Vec::new(),
            untransform: None,
            items: Vec::new(),
            n_items: 0,
            next_item: 0,
            cur: 0,
            skip: 0,
        };
        let payload = rd.read_special_block(&MAGIC_HEADER)?;
        rd.header = header::decode_header(&payload)?;
        let resume = rd.chunks.tell()?;
        if header::has_trailer(&rd.header)? {
            rd.chunks.seek_last_block()?;
            rd.trailer = rd.read_special_block(&MAGIC_TRAILER)?;
            rd.chunks.seek_to(resume)?;
        }
        let configs = header::transformer_configs(&rd.header)?;
        if !configs.is_empty() {
            rd.untransform = Some(transform::decoder_pipeline(&configs)?);
        }
        Ok(rd)
    }

    /// Advance to the next data item. `Ok(false)` at the trailer or EOF.
    pub fn scan(&mut self) -> Result<bool> {
        while self.next_item >= self.n_items {
            if !self.read_data_block()? {
                return Ok(false);
            }
        }
        self.cur = self.next_item;
        self.next_item += 1;
        Ok(true)
    }

    fn read_data_block(&mut self) -> Result<bool> {
        self.n_items = 0;
        self.next_item = 0;
        if !self.chunks.scan()? {
            return Ok(false);
        }
        let magic = *self.chunks.magic();
        if magic == MAGIC_TRAILER {
            // The trailer is the last block; data ends here.
            return Ok(false);
        }
        if magic != MAGIC_PACKED {
            return Err(Error::BadMagic {
                found: magic,
                expected: None,
            });
        }
        self.n_items = self.parse_block_items(true)?;
        if self.skip > 0 {
            if self.skip as usize >= self.n_items {
                return Err(Error::InvalidSize(format!(
                    "item index {} outside block of {} items",
                    self.skip, self.n_items
                )));
            }
            self.next_item = self.skip as usize;
            self.skip = 0;
        }
        Ok(true)
    }

    /// Read one block that must carry `magic` and exactly one packed item;
    /// return that item's bytes.
    fn read_special_block(&mut self, magic: &Magic) -> Result<Vec<u8>> {
        if !self.chunks.scan()? {
            return Err(Error::UnexpectedEof {
                wanted: CHUNK_SIZE,
                got: 0,
            });
        }
        if self.chunks.magic() != magic {
            return Err(Error::BadMagic {
                found: *self.chunks.magic(),
                expected: Some(*magic),
            });
        }
        let n = self.parse_block_items(false)?;
        if n != 1 {
            return Err(Error::InvalidSize(format!(
                "special block holds {n} items, expected 1"
            )));
        }
        Ok(std::mem::take(&mut self.items[0]))
    }

    /// Decode the current block's packed item list into the recycled item
    /// buffers and return the item count. Header and trailer blocks are
    /// stored untransformed; data blocks are untransformed as a whole,
    /// checksum included.
    fn parse_block_items(&mut self, transform: bool) -> Result<usize> {
        let slices = self.chunks.chunks();
        let iov = IoVec::new(&slices);
        let flat: Vec<u8>;
        let data: &[u8] = if transform {
            match &mut self.untransform {
                Some(t) => t.transform(iov)?,
                None => {
                    flat = iov.flatten();
                    &flat
                }
            }
        } else if slices.len() == 1 {
            slices[0]
        } else {
            flat = iov.flatten();
            &flat
        };

        let parsed = block::parse_packed_sizes(data)?;
        if data.len() - parsed.items_start != parsed.items_len() {
            return Err(Error::TrailingJunk(
                "decoded block length does not match the item size vector",
            ));
        }
        let n = parsed.spans.len();
        if self.items.len() < n {
            self.items.resize_with(n, Vec::new);
        }
        for (i, &(off, len)) in parsed.spans.iter().enumerate() {
            let start = parsed.items_start + off;
            self.items[i].clear();
            self.items[i].extend_from_slice(&data[start..start + len]);
        }
        Ok(n)
    }

    /// Arm the reader so the next `scan` yields item `loc.item` of the block
    /// at byte offset `loc.block`. Blocks start on chunk boundaries.
    pub fn seek(&mut self, loc: ItemLocation) -> Result<()> {
        if loc.block % CHUNK_SIZE as u64 != 0 {
            return Err(Error::SeekUnsupported(
                "location does not point at a block boundary",
            ));
        }
        self.chunks.seek_to(loc.block)?;
        self.n_items = 0;
        self.next_item = 0;
        self.cur = 0;
        self.skip = loc.item;
        Ok(())
    }

    pub fn get(&self) -> &[u8] {
        &self.items[self.cur]
    }

    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.items[self.cur])
    }

    pub fn header(&self) -> &[HeaderEntry] {
        &self.header
    }

    pub fn trailer(&self) -> &[u8] {
        &self.trailer
    }
}
