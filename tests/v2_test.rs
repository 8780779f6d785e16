mod common;

use std::fs::{self, File};
use std::io::Cursor;

use tempfile::tempdir;

use recordio::chunk::{write_chunks, ChunkReader, CHUNK_SIZE, MAX_CHUNK_PAYLOAD};
use recordio::header::{HeaderEntry, KEY_TRAILER, KEY_TRANSFORMER};
use recordio::magic::MAGIC_PACKED;
use recordio::{Error, ItemLocation, Reader, ReaderOpts, Value, Writer};

use common::{record, v2_file};

fn standard_header(trailer: bool) -> Vec<HeaderEntry> {
    let mut entries = vec![
        HeaderEntry {
            key: "intflag".to_string(),
            value: Value::Int(12345),
        },
        HeaderEntry {
            key: "uintflag".to_string(),
            value: Value::Uint(12345),
        },
        HeaderEntry {
            key: "strflag".to_string(),
            value: Value::String("Hello".to_string()),
        },
        HeaderEntry {
            key: "boolflag".to_string(),
            value: Value::Bool(true),
        },
    ];
    if trailer {
        entries.push(HeaderEntry {
            key: KEY_TRAILER.to_string(),
            value: Value::Bool(true),
        });
    }
    entries
}

fn records(range: std::ops::Range<usize>) -> Vec<Vec<u8>> {
    range.map(|i| record(i).to_vec()).collect()
}

#[test]
fn chunk_split_sizes() {
    // (payload length, expected per-chunk payload sizes)
    let cases: [(usize, &[usize]); 5] = [
        (0, &[0]),
        (1, &[1]),
        (32740, &[32740]),
        (32741, &[32740, 1]),
        (65481, &[32740, 32740, 1]),
    ];
    for (len, sizes) in cases {
        let payload: Vec<u8> = (0..len).map(|i| i as u8).collect();
        let mut encoded = Vec::new();
        write_chunks(&mut encoded, &MAGIC_PACKED, &payload).unwrap();
        assert_eq!(encoded.len(), sizes.len() * CHUNK_SIZE, "len {len}");

        let mut cr = ChunkReader::new(Cursor::new(encoded));
        assert!(cr.scan().unwrap());
        let chunks = cr.chunks();
        let got: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(got, sizes, "len {len}");
        assert_eq!(chunks.concat(), payload);
        assert!(!cr.scan().unwrap());
    }
}

#[test]
fn every_chunk_but_last_is_full() {
    for len in [1usize, 32740, 65480, 65481, 100_000] {
        let payload = vec![7u8; len];
        let mut encoded = Vec::new();
        write_chunks(&mut encoded, &MAGIC_PACKED, &payload).unwrap();
        let n = len.div_ceil(MAX_CHUNK_PAYLOAD).max(1);
        assert_eq!(encoded.len(), n * CHUNK_SIZE);

        let mut cr = ChunkReader::new(Cursor::new(encoded));
        assert!(cr.scan().unwrap());
        let chunks = cr.chunks();
        for c in &chunks[..chunks.len() - 1] {
            assert_eq!(c.len(), MAX_CHUNK_PAYLOAD);
        }
        assert_eq!(chunks.concat(), payload);
    }
}

#[test]
fn unpacked_single_block_stays_legacy_framed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("one.grail-rio");
    let data = vec![b'x'; 65481];
    {
        let mut writer = Writer::create(&path).unwrap();
        assert!(writer.write(&data));
        assert!(writer.close());
    }
    assert_eq!(fs::metadata(&path).unwrap().len(), 20 + 65481);
    let mut reader = Reader::open(&path);
    assert!(reader.scan());
    assert_eq!(reader.get(), &data[..]);
}

#[test]
fn header_trailer_and_items() {
    let bytes = v2_file(
        &standard_header(true),
        &[records(0..128)],
        Some(b"Trailer"),
        None,
    );
    let mut reader = Reader::new(Cursor::new(bytes), ReaderOpts::default());

    let header = reader.header();
    assert_eq!(header.len(), 5);
    assert_eq!(header[0].key, "intflag");
    assert_eq!(header[0].value, Value::Int(12345));
    assert_eq!(header[1].key, "uintflag");
    assert_eq!(header[1].value, Value::Uint(12345));
    assert_eq!(header[2].key, "strflag");
    assert_eq!(header[2].value, Value::String("Hello".to_string()));
    assert_eq!(header[3].key, "boolflag");
    assert_eq!(header[3].value, Value::Bool(true));
    assert_eq!(header[4].key, KEY_TRAILER);
    assert_eq!(header[4].value, Value::Bool(true));

    assert_eq!(reader.trailer(), b"Trailer");

    for i in 0..128 {
        assert!(reader.scan(), "record {i}");
        assert_eq!(reader.get(), record(i));
    }
    assert!(!reader.scan());
    assert!(reader.error().is_none());
}

#[test]
fn trailer_survives_many_data_blocks() {
    let blocks: Vec<Vec<Vec<u8>>> = (0..8).map(|b| records(b * 16..(b + 1) * 16)).collect();
    let bytes = v2_file(&standard_header(true), &blocks, Some(b"Trailer"), None);
    let mut reader = Reader::new(Cursor::new(bytes), ReaderOpts::default());
    assert_eq!(reader.trailer(), b"Trailer");
    for i in 0..128 {
        assert!(reader.scan());
        assert_eq!(reader.get(), record(i));
    }
    assert!(!reader.scan());
    assert!(reader.error().is_none());
}

#[test]
fn multi_chunk_trailer_round_trips() {
    // A trailer larger than one chunk payload: seek_last_block must walk
    // back from the final chunk to the block's first chunk.
    let trailer: Vec<u8> = (0..40_000u32).map(|i| (i % 251) as u8).collect();
    let bytes = v2_file(
        &standard_header(true),
        &[records(0..16)],
        Some(&trailer),
        None,
    );
    let mut reader = Reader::new(Cursor::new(bytes), ReaderOpts::default());
    assert_eq!(reader.trailer(), &trailer[..]);
    for i in 0..16 {
        assert!(reader.scan());
        assert_eq!(reader.get(), record(i));
    }
    assert!(!reader.scan());
    assert!(reader.error().is_none());
}

#[test]
fn flate_data_blocks() {
    let mut entries = standard_header(false);
    entries.push(HeaderEntry {
        key: KEY_TRANSFORMER.to_string(),
        value: Value::String("flate".to_string()),
    });
    let bytes = v2_file(&entries, &[records(0..128)], None, Some("flate"));
    let mut reader = Reader::new(Cursor::new(bytes), ReaderOpts::default());
    for i in 0..128 {
        assert!(reader.scan(), "record {i}");
        assert_eq!(reader.get(), record(i));
    }
    assert!(!reader.scan());
    assert!(reader.error().is_none());
}

#[test]
fn seek_by_block_offset() {
    // Header block in one chunk, then two single-chunk data blocks.
    let bytes = v2_file(
        &standard_header(false),
        &[records(0..64), records(64..128)],
        None,
        None,
    );
    let mut reader = Reader::new(Cursor::new(bytes), ReaderOpts::default());
    while reader.scan() {}
    assert!(reader.error().is_none());

    // Seek re-arms a drained reader at a block boundary.
    assert!(reader.seek(ItemLocation {
        block: CHUNK_SIZE as u64,
        item: 0,
    }));
    assert!(reader.scan());
    assert_eq!(reader.get(), record(0));

    // The item index selects within the sought block.
    assert!(reader.seek(ItemLocation {
        block: 2 * CHUNK_SIZE as u64,
        item: 26,
    }));
    assert!(reader.scan());
    assert_eq!(reader.get(), record(90));

    // Advancing after a block-start seek walks the items in order.
    assert!(reader.seek(ItemLocation {
        block: 2 * CHUNK_SIZE as u64,
        item: 0,
    }));
    for i in 64..128 {
        assert!(reader.scan());
        assert_eq!(reader.get(), record(i));
    }
    assert!(!reader.scan());
    assert!(reader.error().is_none());
}

#[test]
fn seek_past_block_items_is_an_error() {
    let bytes = v2_file(
        &standard_header(false),
        &[records(0..64), records(64..128)],
        None,
        None,
    );
    let mut reader = Reader::new(Cursor::new(bytes), ReaderOpts::default());
    // Item 64 does not exist in a 64-item block; the cursor must not slide
    // into the next block.
    assert!(reader.seek(ItemLocation {
        block: CHUNK_SIZE as u64,
        item: 64,
    }));
    assert!(!reader.scan());
    assert!(matches!(reader.error(), Some(Error::InvalidSize(_))));
}

#[test]
fn seek_off_boundary_is_unsupported() {
    let bytes = v2_file(&standard_header(false), &[records(0..16)], None, None);
    let mut reader = Reader::new(Cursor::new(bytes), ReaderOpts::default());
    assert!(!reader.seek(ItemLocation {
        block: 1000,
        item: 0,
    }));
    assert!(matches!(reader.error(), Some(Error::SeekUnsupported(_))));
}

#[test]
fn multiple_transformers_rejected() {
    let mut entries = standard_header(false);
    for _ in 0..2 {
        entries.push(HeaderEntry {
            key: KEY_TRANSFORMER.to_string(),
            value: Value::String("flate".to_string()),
        });
    }
    let bytes = v2_file(&entries, &[], None, None);
    let mut reader = Reader::new(Cursor::new(bytes), ReaderOpts::default());
    assert!(!reader.scan());
    assert!(matches!(reader.error(), Some(Error::Unsupported(_))));
}

#[test]
fn unknown_transformer_rejected() {
    let mut entries = standard_header(false);
    entries.push(HeaderEntry {
        key: KEY_TRANSFORMER.to_string(),
        value: Value::String("no-such-codec".to_string()),
    });
    let bytes = v2_file(&entries, &[], None, None);
    let mut reader = Reader::new(Cursor::new(bytes), ReaderOpts::default());
    assert!(!reader.scan());
    assert!(matches!(reader.error(), Some(Error::Unsupported(_))));
}

#[test]
fn header_only_file_is_clean_eof() {
    let bytes = v2_file(&standard_header(false), &[], None, None);
    let mut reader = Reader::new(Cursor::new(bytes), ReaderOpts::default());
    assert_eq!(reader.header().len(), 4);
    assert!(!reader.scan());
    assert!(reader.error().is_none());
    assert!(reader.trailer().is_empty());
}

#[test]
fn multi_chunk_data_block_round_trips() {
    // 6000 items of 8 bytes: the item list spans two chunks.
    let bytes = v2_file(&standard_header(false), &[records(0..6000)], None, None);
    let mut reader = Reader::new(Cursor::new(bytes), ReaderOpts::default());
    for i in 0..6000 {
        assert!(reader.scan(), "record {i}");
        assert_eq!(reader.get(), record(i));
    }
    assert!(!reader.scan());
    assert!(reader.error().is_none());
}

#[test]
fn open_file_v2_dispatch() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("file.grail-rio2");
    let bytes = v2_file(&standard_header(true), &[records(0..32)], Some(b"T"), None);
    fs::write(&path, &bytes).unwrap();

    let mut reader = Reader::new(File::open(&path).unwrap(), ReaderOpts::default());
    assert_eq!(reader.trailer(), b"T");
    for i in 0..32 {
        assert!(reader.scan());
        assert_eq!(reader.get(), record(i));
    }
    assert!(!reader.scan());
    assert!(reader.error().is_none());
}
