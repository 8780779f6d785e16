//! Writing facade: legacy framing emitters, block batching, and the block
//! offset indexer hook.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::block::{encode_block_header, PackedListBuilder, BLOCK_HEADER_LEN};
use crate::error::{Error, ErrorCell, Result};
use crate::iovec::IoVec;
use crate::magic::{Magic, MAGIC_PACKED, MAGIC_UNPACKED};
use crate::names;
use crate::transform::Transformer;

/// Receives the absolute byte offset of every flushed block, in flush order.
/// Offsets are relative to the sink's position at writer construction.
pub trait Indexer {
    /// A returned message becomes the writer's sticky `IndexerFailure`.
    fn index_block(&mut self, block_offset: u64) -> std::result::Result<(), String>;
}

/// Options for [`Writer::new`].
pub struct WriterOpts {
    /// Batch records into packed blocks instead of one block per record.
    pub packed: bool,
    /// Flush the pending packed block at this many items.
    pub max_items: u64,
    /// Flush the pending packed block at this many buffered bytes, measured
    /// before the transform.
    pub max_bytes: u64,
    /// Encode transformer applied to every block payload.
    pub transformer: Option<Box<dyn Transformer + Send>>,
    /// Callback invoked with each flushed block's starting offset.
    pub indexer: Option<Box<dyn Indexer>>,
}

impl Default for WriterOpts {
    fn default() -> Self {
        Self {
            packed: false,
            max_items: 16 * 1024,
            max_bytes: 16 << 20,
            transformer: None,
            indexer: None,
        }
    }
}

/// Writes raw legacy blocks and tracks offsets for the indexer.
struct BaseWriter<W> {
    sink: W,
    magic: Magic,
    /// Bytes written since construction; block offsets derive from it.
    pos: u64,
    indexer: Option<Box<dyn Indexer>>,
}

impl<W: Write> BaseWriter<W> {
    fn new(sink: W, magic: Magic, indexer: Option<Box<dyn Indexer>>) -> Self {
        Self {
            sink,
            magic,
            pos: 0,
            indexer,
        }
    }

    /// Write one block from two contiguous spans. Two spans spare the packed
    /// writer a copy of the transformed items.
    fn write_block(&mut self, one: &[u8], two: &[u8]) -> Result<()> {
        let block_start = self.pos;
        let header = encode_block_header(&self.magic, (one.len() + two.len()) as u64);
        self.sink.write_all(&header)?;
        self.sink.write_all(one)?;
        if !two.is_empty() {
            self.sink.write_all(two)?;
        }
        self.pos = block_start + (BLOCK_HEADER_LEN + one.len() + two.len()) as u64;
        if let Some(ix) = &mut self.indexer {
            ix.index_block(block_start).map_err(Error::IndexerFailure)?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }
}

/// One block per record.
struct UnpackedWriter<W> {
    base: BaseWriter<W>,
    transformer: Option<Box<dyn Transformer + Send>>,
}

impl<W: Write> UnpackedWriter<W> {
    fn write(&mut self, record: &[u8]) -> Result<()> {
        match &mut self.transformer {
            Some(t) => {
                let out = t.transform(IoVec::new(&[record]))?;
                self.base.write_block(out, &[])
            }
            None => self.base.write_block(record, &[]),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.base.close()
    }
}

/// Buffers items and emits a packed block when either bound would be
/// exceeded.
struct PackedWriter<W> {
    base: BaseWriter<W>,
    transformer: Option<Box<dyn Transformer + Send>>,
    builder: PackedListBuilder,
    buffered: Vec<u8>,
    max_items: u64,
    max_bytes: u64,
}

impl<W: Write> PackedWriter<W> {
    fn write(&mut self, item: &[u8]) -> Result<()> {
        if item.len() as u64 > self.max_bytes {
            return Err(Error::ItemTooLarge {
                size: item.len() as u64,
                max: self.max_bytes,
            });
        }
        if self.builder.item_count() + 1 > self.max_items
            || (self.buffered.len() + item.len()) as u64 > self.max_bytes
        {
            self.flush()?;
        }
        if !self.builder.add_item_size(item.len() as u64) {
            return Err(Error::InvalidSize(
                "packed block already holds the maximum item count".to_string(),
            ));
        }
        self.buffered.extend_from_slice(item);
        Ok(())
    }

    /// Emit the pending block, if any. The items region is transformed
    /// first; the list checksum covers the bytes as written.
    fn flush(&mut self) -> Result<()> {
        if self.builder.is_empty() {
            return Ok(());
        }
        match &mut self.transformer {
            Some(t) => {
                let out = t.transform(IoVec::new(&[self.buffered.as_slice()]))?;
                let prefix = self.builder.encode_prefix(out);
                self.base.write_block(&prefix, out)?;
            }
            None => {
                let prefix = self.builder.encode_prefix(&self.buffered);
                self.base.write_block(&prefix, &self.buffered)?;
            }
        }
        self.builder.clear();
        self.buffered.clear();
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.flush()?;
        self.base.close()
    }
}

enum Inner<W> {
    Unpacked(UnpackedWriter<W>),
    Packed(PackedWriter<W>),
}

/// A recordio writer emitting the legacy framing.
///
/// Methods return false once an error is sticky; [`error`](Writer::error)
/// exposes it.
pub struct Writer<W: Write> {
    inner: Inner<W>,
    err: ErrorCell,
}

impl<W: Write> Writer<W> {
    pub fn new(sink: W, opts: WriterOpts) -> Self {
        let inner = if opts.packed {
            Inner::Packed(PackedWriter {
                base: BaseWriter::new(sink, MAGIC_PACKED, opts.indexer),
                transformer: opts.transformer,
                builder: PackedListBuilder::default(),
                buffered: Vec::new(),
                max_items: opts.max_items,
                max_bytes: opts.max_bytes,
            })
        } else {
            Inner::Unpacked(UnpackedWriter {
                base: BaseWriter::new(sink, MAGIC_UNPACKED, opts.indexer),
                transformer: opts.transformer,
            })
        };
        Self {
            inner,
            err: ErrorCell::default(),
        }
    }

    /// Append one record. Unpacked mode emits a block immediately; packed
    /// mode buffers until a bound is reached.
    pub fn write(&mut self, record: &[u8]) -> bool {
        if !self.err.ok() {
            return false;
        }
        let written = match &mut self.inner {
            Inner::Unpacked(w) => w.write(record),
            Inner::Packed(w) => w.write(record),
        };
        match written {
            Ok(()) => true,
            Err(e) => {
                self.err.set(e);
                false
            }
        }
    }

    /// Flush any pending packed block, then flush the sink.
    pub fn close(&mut self) -> bool {
        if !self.err.ok() {
            return false;
        }
        let closed = match &mut self.inner {
            Inner::Unpacked(w) => w.close(),
            Inner::Packed(w) => w.close(),
        };
        match closed {
            Ok(()) => true,
            Err(e) => {
                self.err.set(e);
                false
            }
        }
    }

    /// The first error seen, if any. Sticky.
    pub fn error(&self) -> Option<&Error> {
        self.err.get()
    }
}

impl Writer<BufWriter<File>> {
    /// Create a file, choosing framing defaults from its name suffix.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Writer<BufWriter<File>>> {
        let opts = names::default_writer_opts(path.as_ref());
        Ok(Writer::new(BufWriter::new(File::create(path)?), opts))
    }
}
