//! Fixed 32 KiB chunk codec for the chunked (v2) framing.

use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::iovec::ByteSlice;
use crate::magic::{Magic, MAGIC_INVALID, MAGIC_LEN, MAGIC_TRAILER};
use crate::stream::read_full;
use crate::wire;

/// On-disk size of every chunk.
pub const CHUNK_SIZE: usize = 32 << 10;

/// Chunk header: magic, checksum, flag, payload size, total, index.
pub const CHUNK_HEADER_LEN: usize = 28;

/// Largest payload one chunk can carry.
pub const MAX_CHUNK_PAYLOAD: usize = CHUNK_SIZE - CHUNK_HEADER_LEN;

/// Split `payload` into chunks under `magic` and write them to `out`,
/// zero-padding each chunk to the fixed size. A zero-length payload still
/// produces one chunk.
pub fn write_chunks<W: Write>(out: &mut W, magic: &Magic, payload: &[u8]) -> Result<()> {
    let total = payload.len().div_ceil(MAX_CHUNK_PAYLOAD).max(1) as u32;
    let mut chunk = [0u8; CHUNK_SIZE];
    for index in 0..total {
        let start = index as usize * MAX_CHUNK_PAYLOAD;
        let piece = &payload[start..payload.len().min(start + MAX_CHUNK_PAYLOAD)];
        chunk[..MAGIC_LEN].copy_from_slice(magic);
        LittleEndian::write_u32(&mut chunk[12..16], 0); // flag, reserved
        LittleEndian::write_u32(&mut chunk[16..20], piece.len() as u32);
        LittleEndian::write_u32(&mut chunk[20..24], total);
        LittleEndian::write_u32(&mut chunk[24..28], index);
        chunk[CHUNK_HEADER_LEN..CHUNK_HEADER_LEN + piece.len()].copy_from_slice(piece);
        chunk[CHUNK_HEADER_LEN + piece.len()..].fill(0);
        let crc = wire::crc32(&chunk[12..CHUNK_HEADER_LEN + piece.len()]);
        LittleEndian::write_u32(&mut chunk[MAGIC_LEN..12], crc);
        out.write_all(&chunk)?;
    }
    Ok(())
}

/// Reads raw chunks and reassembles them into one block per [`scan`] call.
///
/// Chunk buffers come from a free list owned by the reader and reused
/// cyclically: payload slices handed out through [`chunks`] stay valid until
/// the next `scan`, which reclaims the whole list.
///
/// [`scan`]: ChunkReader::scan
/// [`chunks`]: ChunkReader::chunks
pub struct ChunkReader<R> {
    src: R,
    magic: Magic,
    /// (free-list index, payload length) per chunk of the current block.
    spans: Vec<(usize, usize)>,
    bufs: Vec<Box<[u8; CHUNK_SIZE]>>,
    next_free: usize,
}

impl<R: Read + Seek> ChunkReader<R> {
    pub fn new(src: R) -> Self {
        Self {
            src,
            magic: MAGIC_INVALID,
            spans: Vec::new(),
            bufs: Vec::new(),
            next_free: 0,
        }
    }

    /// Magic of the current block.
    pub fn magic(&self) -> &Magic {
        &self.magic
    }

    /// Payload slices of the current block, in order.
    pub fn chunks(&self) -> Vec<ByteSlice<'_>> {
        self.spans
            .iter()
            .map(|&(buf, len)| &self.bufs[buf][CHUNK_HEADER_LEN..CHUNK_HEADER_LEN + len])
            .collect()
    }

    /// Current read offset of the source.
    pub fn tell(&mut self) -> Result<u64> {
        Ok(self.src.stream_position()?)
    }

    /// Read the next block, validating the chunk sequence invariants.
    /// `Ok(false)` means a clean end of file.
    pub fn scan(&mut self) -> Result<bool> {
        self.magic = MAGIC_INVALID;
        self.spans.clear();
        self.next_free = 0;
        let mut total_chunks = 0u32;
        loop {
            let (magic, index, total, len) = match self.read_chunk()? {
                Some(hdr) => hdr,
                None => {
                    // EOF between blocks is a clean end; inside one it is not.
                    if self.spans.is_empty() {
                        return Ok(false);
                    }
                    return Err(Error::UnexpectedEof {
                        wanted: CHUNK_SIZE,
                        got: 0,
                    });
                }
            };
            if self.spans.is_empty() {
                self.magic = magic;
                total_chunks = total;
            }
            if magic != self.magic {
                return Err(Error::MagicChanged {
                    found: magic,
                    expected: self.magic,
                });
            }
            if index as usize != self.spans.len() {
                return Err(Error::IndexMismatch {
                    found: index,
                    expected: self.spans.len() as u32,
                });
            }
            if total != total_chunks {
                return Err(Error::TotalMismatch {
                    found: total,
                    expected: total_chunks,
                });
            }
            self.spans.push((self.next_free - 1, len));
            if index + 1 == total {
                break;
            }
        }
        Ok(true)
    }

    /// Position so the next `scan` reads the block at `offset`.
    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.src.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Position so the next `scan` reads the trailer block, which owns the
    /// final chunk of the file.
    pub fn seek_last_block(&mut self) -> Result<()> {
        self.src.seek(SeekFrom::End(-(CHUNK_SIZE as i64)))?;
        let (magic, index, _total, _len) = match self.read_chunk()? {
            Some(hdr) => hdr,
            None => {
                return Err(Error::UnexpectedEof {
                    wanted: CHUNK_SIZE,
                    got: 0,
                })
            }
        };
        if magic != MAGIC_TRAILER {
            return Err(Error::BadMagic {
                found: magic,
                expected: Some(MAGIC_TRAILER),
            });
        }
        let back = (u64::from(index) + 1) * CHUNK_SIZE as u64;
        self.src.seek(SeekFrom::End(-(back as i64)))?;
        Ok(())
    }

    /// Read one chunk into the next free buffer. `Ok(None)` at EOF before
    /// the first byte.
    fn read_chunk(&mut self) -> Result<Option<(Magic, u32, u32, usize)>> {
        let idx = self.next_free;
        if idx >= self.bufs.len() {
            self.bufs.push(Box::new([0u8; CHUNK_SIZE]));
        }
        let n = read_full(&mut self.src, &mut self.bufs[idx][..])?;
        if n == 0 {
            return Ok(None);
        }
        if n != CHUNK_SIZE {
            return Err(Error::UnexpectedEof {
                wanted: CHUNK_SIZE,
                got: n,
            });
        }
        self.next_free = idx + 1;

        let buf = &self.bufs[idx];
        let mut p = wire::Parser::new(&buf[..CHUNK_HEADER_LEN]);
        let magic = p.read_magic()?;
        let expected_csum = p.read_u32_le()?;
        let _flag = p.read_u32_le()?;
        let size = p.read_u32_le()? as usize;
        let total = p.read_u32_le()?;
        let index = p.read_u32_le()?;
        if size > MAX_CHUNK_PAYLOAD {
            return Err(Error::InvalidSize(format!(
                "chunk payload of {size} bytes exceeds {MAX_CHUNK_PAYLOAD}"
            )));
        }
        let actual = wire::crc32(&buf[12..CHUNK_HEADER_LEN + size]);
        if actual != expected_csum {
            return Err(Error::ChecksumMismatch {
                expected: expected_csum,
                actual,
            });
        }
        Ok(Some((magic, index, total, size)))
    }
}
