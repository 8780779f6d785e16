//! Reading facade: framing auto-detection and the public scan/get surface.

mod legacy;
mod v2;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{Error, ErrorCell, Result};
use crate::header::HeaderEntry;
use crate::magic::{MAGIC_LEN, MAGIC_PACKED, MAGIC_UNPACKED};
use crate::names;
use crate::stream::read_full;
use crate::transform::Transformer;

/// Coarse location of an item: the absolute byte offset of its block's first
/// byte, and the item's index within the block's packed list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemLocation {
    pub block: u64,
    pub item: u32,
}

/// Options for [`Reader::new`].
#[derive(Default)]
pub struct ReaderOpts {
    /// Decode transformer for legacy files, which carry no header naming
    /// one. Chunked files build theirs from the header block instead, and
    /// ignore this field.
    pub legacy_transformer: Option<Box<dyn Transformer + Send>>,
}

enum Inner<R> {
    Unpacked(legacy::UnpackedReader<R>),
    Packed(legacy::PackedReader<R>),
    V2(v2::V2Reader<R>),
    /// Construction failed or the source was empty; the cell on the facade
    /// tells the two apart.
    None,
}

/// A recordio reader over any seekable byte source.
///
/// Construction never fails: problems surface as [`scan`] returning false
/// with [`error`] set. The first error is sticky, and after `scan` has
/// returned false the reader stays terminal until a successful [`seek`].
///
/// [`scan`]: Reader::scan
/// [`error`]: Reader::error
/// [`seek`]: Reader::seek
pub struct Reader<R> {
    inner: Inner<R>,
    err: ErrorCell,
    done: bool,
}

impl<R: Read + Seek> Reader<R> {
    /// Create a reader over `src`, auto-detecting the framing from the
    /// leading magic at the source's current offset.
    pub fn new(src: R, opts: ReaderOpts) -> Self {
        match Self::dispatch(src, opts) {
            Ok(Some(inner)) => Self {
                inner,
                err: ErrorCell::default(),
                done: false,
            },
            // An empty source scans false with no error.
            Ok(None) => Self {
                inner: Inner::None,
                err: ErrorCell::default(),
                done: true,
            },
            Err(e) => Self::failed(e),
        }
    }

    fn failed(e: Error) -> Self {
        let mut err = ErrorCell::default();
        err.set(e);
        Self {
            inner: Inner::None,
            err,
            done: true,
        }
    }

    fn dispatch(mut src: R, opts: ReaderOpts) -> Result<Option<Inner<R>>> {
        let start = src.stream_position()?;
        let mut magic = [0u8; MAGIC_LEN];
        let n = read_full(&mut src, &mut magic)?;
        if n == 0 {
            return Ok(None);
        }
        if n != MAGIC_LEN {
            return Err(Error::UnexpectedEof {
                wanted: MAGIC_LEN,
                got: n,
            });
        }
        src.seek(SeekFrom::Start(start))?;
        Ok(Some(match magic {
            MAGIC_PACKED => Inner::Packed(legacy::PackedReader::new(
                src,
                MAGIC_PACKED,
                opts.legacy_transformer,
            )),
            MAGIC_UNPACKED => Inner::Unpacked(legacy::UnpackedReader::new(
                src,
                MAGIC_UNPACKED,
                opts.legacy_transformer,
            )),
            _ => Inner::V2(v2::V2Reader::new(src)?),
        }))
    }

    /// Advance to the next record. Returns false at a clean end of file or
    /// on the first error; check [`error`](Reader::error) to tell the two
    /// apart.
    pub fn scan(&mut self) -> bool {
        if self.done || !self.err.ok() {
            return false;
        }
        let scanned = match &mut self.inner {
            Inner::Unpacked(r) => r.scan(),
            Inner::Packed(r) => r.scan(),
            Inner::V2(r) => r.scan(),
            Inner::None => Ok(false),
        };
        match scanned {
            Ok(true) => true,
            Ok(false) => {
                self.done = true;
                false
            }
            Err(e) => {
                self.err.set(e);
                false
            }
        }
    }

    /// Borrow the current record. Valid until the next `scan`.
    pub fn get(&self) -> &[u8] {
        match &self.inner {
            Inner::Unpacked(r) => r.get(),
            Inner::Packed(r) => r.get(),
            Inner::V2(r) => r.get(),
            Inner::None => &[],
        }
    }

    /// Move the current record's buffer out of the reader.
    pub fn take(&mut self) -> Vec<u8> {
        match &mut self.inner {
            Inner::Unpacked(r) => r.take(),
            Inner::Packed(r) => r.take(),
            Inner::V2(r) => r.take(),
            Inner::None => Vec::new(),
        }
    }

    /// Re-position a chunked reader at a location previously handed to a
    /// writer's indexer; the next `scan` yields item `loc.item` of that
    /// block. Legacy framings report `SeekUnsupported`; their block
    /// offsets are consumed by building a fresh reader on a pre-seeked
    /// source instead.
    pub fn seek(&mut self, loc: ItemLocation) -> bool {
        if !self.err.ok() {
            return false;
        }
        let sought = match &mut self.inner {
            Inner::V2(r) => r.seek(loc),
            Inner::None => return false,
            _ => Err(Error::SeekUnsupported("legacy files have no block index")),
        };
        match sought {
            Ok(()) => {
                self.done = false;
                true
            }
            Err(e) => {
                self.err.set(e);
                false
            }
        }
    }

    /// The parsed header dictionary; empty for legacy files.
    pub fn header(&self) -> &[HeaderEntry] {
        match &self.inner {
            Inner::V2(r) => r.header(),
            _ => &[],
        }
    }

    /// The trailer payload; empty when absent.
    pub fn trailer(&self) -> &[u8] {
        match &self.inner {
            Inner::V2(r) => r.trailer(),
            _ => &[],
        }
    }

    /// The first error seen, if any. Sticky.
    pub fn error(&self) -> Option<&Error> {
        self.err.get()
    }
}

impl Reader<File> {
    /// Open a file, deriving a default legacy transformer from its name.
    /// A missing file yields a reader whose first `scan` returns false with
    /// the underlying I/O error.
    pub fn open<P: AsRef<Path>>(path: P) -> Reader<File> {
        let opts = names::default_reader_opts(path.as_ref());
        match File::open(path) {
            Ok(f) => Reader::new(f, opts),
            Err(e) => Reader::failed(Error::Io(e)),
        }
    }
}
