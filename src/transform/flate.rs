//! Raw DEFLATE (RFC 1951) transformers over flate2's streaming state.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use super::Transformer;
use crate::error::{Error, Result};
use crate::iovec::IoVec;

/// Upper bound on deflate output for `len` input bytes, mirroring zlib's
/// deflateBound for a raw stream at the default memory level.
fn deflate_bound(len: usize) -> usize {
    len + (len >> 12) + (len >> 14) + (len >> 25) + 13
}

/// Raw-DEFLATE compressor at the default level. Input slices are fed
/// sequentially; the stream is finished on the last one.
#[derive(Default)]
pub struct Deflate {
    out: Vec<u8>,
}

impl Transformer for Deflate {
    fn transform(&mut self, input: IoVec<'_>) -> Result<&[u8]> {
        let mut z = Compress::new(Compression::default(), false);
        self.out.clear();
        self.out.reserve(deflate_bound(input.len()));

        let slices = input.slices();
        for (i, slice) in slices.iter().enumerate() {
            let flush = if i + 1 == slices.len() {
                FlushCompress::Finish
            } else {
                FlushCompress::None
            };
            let mut pos = 0;
            loop {
                let before = z.total_in();
                let status = z
                    .compress_vec(&slice[pos..], &mut self.out, flush)
                    .map_err(|e| Error::Transform(format!("deflate failed: {e}")))?;
                pos += (z.total_in() - before) as usize;
                match status {
                    Status::StreamEnd => break,
                    Status::Ok | Status::BufError => {
                        if pos == slice.len() && matches!(flush, FlushCompress::None) {
                            break;
                        }
                        if self.out.len() == self.out.capacity() {
                            self.out.reserve(self.out.capacity().max(64));
                        }
                    }
                }
            }
        }
        Ok(&self.out)
    }
}

/// Raw-DEFLATE decompressor. The output buffer is retained across calls and
/// doubles whenever it fills before the stream ends. Input left over after
/// the end of the stream is an error.
#[derive(Default)]
pub struct Inflate {
    out: Vec<u8>,
}

impl Transformer for Inflate {
    fn transform(&mut self, input: IoVec<'_>) -> Result<&[u8]> {
        let mut z = Decompress::new(false);
        self.out.clear();
        let total_in = input.len();
        if self.out.capacity() < total_in {
            self.out.reserve(total_in);
        }

        let slices = input.slices();
        let mut idx = 0;
        let mut stream_end = false;
        while idx < slices.len() {
            let slice = slices[idx];
            let mut pos = 0;
            loop {
                let before = z.total_in();
                let status = z
                    .decompress_vec(&slice[pos..], &mut self.out, FlushDecompress::None)
                    .map_err(|e| Error::Transform(format!("inflate failed: {e}")))?;
                pos += (z.total_in() - before) as usize;
                match status {
                    Status::StreamEnd => {
                        stream_end = true;
                        break;
                    }
                    Status::Ok | Status::BufError => {
                        if pos == slice.len() {
                            break;
                        }
                        if self.out.len() == self.out.capacity() {
                            self.out.reserve(self.out.capacity().max(64));
                        }
                    }
                }
            }
            idx += 1;
            if stream_end {
                if pos != slice.len() {
                    return Err(Error::TrailingJunk("inflate left unconsumed input"));
                }
                break;
            }
        }
        if idx != slices.len() {
            return Err(Error::TrailingJunk("inflate left unconsumed input"));
        }
        Ok(&self.out)
    }
}
