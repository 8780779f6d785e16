#![allow(dead_code)]

use recordio::block::PackedListBuilder;
use recordio::chunk::write_chunks;
use recordio::header::{encode_header, HeaderEntry};
use recordio::magic::{MAGIC_HEADER, MAGIC_PACKED, MAGIC_TRAILER};
use recordio::transform;
use recordio::IoVec;

/// The record corpus: the i-th record is an 8-byte window into this
/// alphabet, starting at `i % 44`.
pub const TEMPLATE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

pub fn record(i: usize) -> &'static [u8] {
    let start = i % 44;
    &TEMPLATE[start..start + 8]
}

/// Encode a complete packed item list: checksum, count, sizes, items.
pub fn packed_item_list(items: &[&[u8]]) -> Vec<u8> {
    let mut builder = PackedListBuilder::default();
    let mut body = Vec::new();
    for item in items {
        assert!(builder.add_item_size(item.len() as u64));
        body.extend_from_slice(item);
    }
    let mut out = builder.encode_prefix(&body);
    out.extend_from_slice(&body);
    out
}

/// Build a complete v2 file: header block, data blocks, optional trailer.
/// When `transformer` is set, each data block's item list is encoded with it
/// (the header should then carry a matching `transformer` entry).
pub fn v2_file(
    entries: &[HeaderEntry],
    blocks: &[Vec<Vec<u8>>],
    trailer: Option<&[u8]>,
    transformer: Option<&str>,
) -> Vec<u8> {
    let mut out = Vec::new();
    let header_item = encode_header(entries);
    write_chunks(&mut out, &MAGIC_HEADER, &packed_item_list(&[&header_item])).unwrap();
    for block in blocks {
        let refs: Vec<&[u8]> = block.iter().map(|v| v.as_slice()).collect();
        let mut list = packed_item_list(&refs);
        if let Some(config) = transformer {
            let mut enc = transform::encoder(config).unwrap();
            list = enc
                .transform(IoVec::new(&[list.as_slice()]))
                .unwrap()
                .to_vec();
        }
        write_chunks(&mut out, &MAGIC_PACKED, &list).unwrap();
    }
    if let Some(t) = trailer {
        write_chunks(&mut out, &MAGIC_TRAILER, &packed_item_list(&[t])).unwrap();
    }
    out
}
