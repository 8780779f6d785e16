//! File-name classification and the framing defaults derived from it.

use std::path::Path;

use crate::reader::ReaderOpts;
use crate::transform;
use crate::writer::WriterOpts;

/// Framing variant implied by a file name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `.grail-rio`: legacy, one record per block.
    Unpacked,
    /// `.grail-rpk`: legacy, packed blocks.
    Packed,
    /// `.grail-rpk-gz`: legacy, packed blocks behind the flate transformer.
    PackedCompressed,
    Unknown,
}

pub fn classify(path: &Path) -> FileKind {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if name.ends_with(".grail-rpk-gz") {
        FileKind::PackedCompressed
    } else if name.ends_with(".grail-rpk") {
        FileKind::Packed
    } else if name.ends_with(".grail-rio") {
        FileKind::Unpacked
    } else {
        FileKind::Unknown
    }
}

/// Writer defaults for a path. Unknown suffixes get the unpacked framing.
pub fn default_writer_opts(path: &Path) -> WriterOpts {
    let mut opts = WriterOpts::default();
    match classify(path) {
        FileKind::Unpacked | FileKind::Unknown => {}
        FileKind::Packed => opts.packed = true,
        FileKind::PackedCompressed => {
            opts.packed = true;
            opts.transformer = Some(transform::flate_encoder());
        }
    }
    opts
}

/// Reader defaults for a path. Legacy compressed files need the flate
/// decoder picked ahead of time, since the v1 framing has no header naming
/// it; chunked files derive theirs from the header block.
pub fn default_reader_opts(path: &Path) -> ReaderOpts {
    let mut opts = ReaderOpts::default();
    if classify(path) == FileKind::PackedCompressed {
        opts.legacy_transformer = Some(transform::flate_decoder());
    }
    opts
}
