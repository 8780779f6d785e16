//! Legacy block framing and the packed item list shared with v2 blocks.

use byteorder::{ByteOrder, LittleEndian};
use crc32fast::Hasher;

use crate::error::{Error, Result};
use crate::magic::{Magic, MAGIC_LEN};
use crate::wire;

/// Byte length of a legacy block header: magic, payload size, size CRC.
pub const BLOCK_HEADER_LEN: usize = MAGIC_LEN + 8 + 4;

/// Upper bound on a legacy block payload.
pub const MAX_BLOCK_PAYLOAD: u64 = 1 << 29;

/// Encode a legacy block header. The CRC covers the size field only.
pub fn encode_block_header(magic: &Magic, payload_len: u64) -> [u8; BLOCK_HEADER_LEN] {
    let mut header = [0u8; BLOCK_HEADER_LEN];
    header[..MAGIC_LEN].copy_from_slice(magic);
    LittleEndian::write_u64(&mut header[MAGIC_LEN..MAGIC_LEN + 8], payload_len);
    let crc = wire::crc32(&header[MAGIC_LEN..MAGIC_LEN + 8]);
    LittleEndian::write_u32(&mut header[MAGIC_LEN + 8..], crc);
    header
}

/// Parse a legacy block header and return the payload length.
pub fn parse_block_header(header: &[u8; BLOCK_HEADER_LEN], expected: &Magic) -> Result<u64> {
    if &header[..MAGIC_LEN] != expected {
        let mut found: Magic = [0u8; MAGIC_LEN];
        found.copy_from_slice(&header[..MAGIC_LEN]);
        return Err(Error::BadMagic {
            found,
            expected: Some(*expected),
        });
    }
    let mut p = wire::Parser::new(&header[MAGIC_LEN..]);
    let size = p.read_u64_le()?;
    let expected_crc = p.read_u32_le()?;
    let actual = wire::crc32(&header[MAGIC_LEN..MAGIC_LEN + 8]);
    if actual != expected_crc {
        return Err(Error::ChecksumMismatch {
            expected: expected_crc,
            actual,
        });
    }
    if size > MAX_BLOCK_PAYLOAD {
        return Err(Error::InvalidSize(format!(
            "block payload of {size} bytes exceeds {MAX_BLOCK_PAYLOAD}"
        )));
    }
    Ok(size)
}

/// Accumulates item sizes for one packed block and renders the CRC-guarded
/// prefix (checksum, item count, size vector).
#[derive(Default)]
pub struct PackedListBuilder {
    count: u64,
    sizes: Vec<u8>, // uvarint-encoded
}

impl PackedListBuilder {
    /// Record one item's size. Returns false once the item count would no
    /// longer fit in 32 bits.
    pub fn add_item_size(&mut self, size: u64) -> bool {
        if self.count == u64::from(u32::MAX) {
            return false;
        }
        self.count += 1;
        wire::put_uvarint(&mut self.sizes, size);
        true
    }

    pub fn item_count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Render `checksum || n_items || sizes`. The checksum covers the varint
    /// region and the item bytes that will follow it on disk, so `items`
    /// must be the bytes as they are about to be written.
    pub fn encode_prefix(&self, items: &[u8]) -> Vec<u8> {
        let mut varints = Vec::with_capacity(self.sizes.len() + wire::MAX_VARINT_LEN);
        wire::put_uvarint(&mut varints, self.count);
        varints.extend_from_slice(&self.sizes);

        let mut hasher = Hasher::new();
        hasher.update(&varints);
        hasher.update(items);
        let checksum = hasher.finalize();

        let mut prefix = Vec::with_capacity(4 + varints.len());
        prefix.extend_from_slice(&checksum.to_le_bytes());
        prefix.extend_from_slice(&varints);
        prefix
    }

    pub fn clear(&mut self) {
        self.count = 0;
        self.sizes.clear();
    }
}

/// Size table parsed from a packed item list prefix.
pub struct PackedSizes {
    /// `(offset, length)` spans relative to the start of the items region.
    pub spans: Vec<(usize, usize)>,
    /// Byte offset of the items region from the start of the list.
    pub items_start: usize,
}

impl PackedSizes {
    /// Total item bytes the size vector accounts for.
    pub fn items_len(&self) -> usize {
        self.spans.last().map(|&(off, len)| off + len).unwrap_or(0)
    }
}

/// Parse and CRC-check a packed item list prefix. `data` is the whole list
/// starting at the checksum; the CRC covers everything after it.
pub fn parse_packed_sizes(data: &[u8]) -> Result<PackedSizes> {
    let mut p = wire::Parser::new(data);
    let expected = p.read_u32_le()?;
    let actual = wire::crc32(&data[4..]);
    if expected != actual {
        return Err(Error::ChecksumMismatch { expected, actual });
    }
    let n_items = p.read_uvarint()?;
    if n_items == 0 || n_items >= data.len() as u64 {
        return Err(Error::InvalidSize(format!(
            "invalid packed item count {n_items}"
        )));
    }
    let mut spans = Vec::with_capacity(n_items as usize);
    let mut offset = 0usize;
    for _ in 0..n_items {
        let size = p.read_uvarint()? as usize;
        spans.push((offset, size));
        offset = offset
            .checked_add(size)
            .ok_or_else(|| Error::InvalidSize("item sizes overflow".to_string()))?;
    }
    let items_start = data.len() - p.remaining();
    Ok(PackedSizes { spans, items_start })
}
