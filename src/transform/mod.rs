//! Pluggable block transformers and the process-wide registry.
//!
//! The registry maps a short name to a factory pair. Writers build encode
//! transformers to compress (or otherwise rewrite) block payloads; the name
//! is recorded in the chunked framing's header block, and readers consult
//! the registry to build the reverse direction. Legacy files carry no
//! header, so their decode transformer is chosen from the file name instead.

use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::error::{Error, Result};
use crate::iovec::IoVec;

mod flate;
mod modern;

pub use flate::{Deflate, Inflate};
pub use modern::{Lz4Decode, Lz4Encode, ZstdDecode, ZstdEncode};

/// A byte-to-byte block transformation.
///
/// The returned slice is owned by the transformer instance and is
/// invalidated by its next `transform` call; consume or copy it first.
/// Encode and decode are separate instances built from the factory pair
/// registered under one name.
pub trait Transformer {
    fn transform(&mut self, input: IoVec<'_>) -> Result<&[u8]>;
}

/// Returns its input unchanged, flattening multi-slice input.
#[derive(Default)]
pub struct Identity {
    out: Vec<u8>,
}

impl Transformer for Identity {
    fn transform(&mut self, input: IoVec<'_>) -> Result<&[u8]> {
        self.out.clear();
        for s in input.iter() {
            self.out.extend_from_slice(s);
        }
        Ok(&self.out)
    }
}

/// Builds one transformer instance from the args part of a config string.
pub type TransformerFactory =
    Box<dyn Fn(&str) -> Result<Box<dyn Transformer + Send>> + Send + Sync>;

struct Entry {
    encode: TransformerFactory,
    decode: TransformerFactory,
}

static REGISTRY: Lazy<Mutex<HashMap<String, Entry>>> = Lazy::new(|| {
    let mut map = HashMap::new();
    insert(&mut map, "flate", |_| Ok(flate_encoder()), |_| {
        Ok(flate_decoder())
    });
    insert(
        &mut map,
        "zstd",
        |args: &str| -> Result<Box<dyn Transformer + Send>> {
            Ok(Box::new(ZstdEncode::new(zstd_level(args)?)))
        },
        |_| Ok(Box::new(ZstdDecode::default()) as Box<dyn Transformer + Send>),
    );
    insert(
        &mut map,
        "lz4",
        |_| Ok(Box::new(Lz4Encode::default()) as Box<dyn Transformer + Send>),
        |_| Ok(Box::new(Lz4Decode::default()) as Box<dyn Transformer + Send>),
    );
    Mutex::new(map)
});

fn insert<E, D>(map: &mut HashMap<String, Entry>, name: &str, encode: E, decode: D)
where
    E: Fn(&str) -> Result<Box<dyn Transformer + Send>> + Send + Sync + 'static,
    D: Fn(&str) -> Result<Box<dyn Transformer + Send>> + Send + Sync + 'static,
{
    map.insert(
        name.to_string(),
        Entry {
            encode: Box::new(encode),
            decode: Box::new(decode),
        },
    );
}

fn zstd_level(args: &str) -> Result<i32> {
    if args.is_empty() {
        return Ok(modern::DEFAULT_ZSTD_LEVEL);
    }
    args.parse()
        .map_err(|_| Error::Transform(format!("bad zstd level {args:?}")))
}

/// Build a raw-DEFLATE encode transformer without going through the registry.
pub fn flate_encoder() -> Box<dyn Transformer + Send> {
    Box::new(Deflate::default())
}

/// Build a raw-DEFLATE decode transformer without going through the registry.
pub fn flate_decoder() -> Box<dyn Transformer + Send> {
    Box::new(Inflate::default())
}

/// Register a named transformer factory pair.
///
/// # Panics
///
/// Registering a name twice is a programming error and panics.
pub fn register_transformer(name: &str, encode: TransformerFactory, decode: TransformerFactory) {
    let mut map = REGISTRY.lock().unwrap();
    if map.contains_key(name) {
        // Panicking while locked would poison the registry.
        drop(map);
        panic!("transformer {name:?} registered twice");
    }
    map.insert(name.to_string(), Entry { encode, decode });
}

/// Split a config of the form `"name"` or `"name args"` at the first
/// whitespace run.
fn split_config(config: &str) -> Result<(&str, &str)> {
    match config.find(char::is_whitespace) {
        None if config.is_empty() => Err(Error::Unsupported(
            "empty transformer config".to_string(),
        )),
        None => Ok((config, "")),
        Some(0) => Err(Error::Unsupported(format!(
            "failed to extract transformer name from {config:?}"
        ))),
        Some(i) => Ok((&config[..i], config[i..].trim_start())),
    }
}

enum Direction {
    Encode,
    Decode,
}

fn lookup(config: &str, dir: Direction) -> Result<Box<dyn Transformer + Send>> {
    let (name, args) = split_config(config)?;
    let map = REGISTRY.lock().unwrap();
    let entry = map
        .get(name)
        .ok_or_else(|| Error::Unsupported(format!("transformer {name:?} not found")))?;
    match dir {
        Direction::Encode => (entry.encode)(args),
        Direction::Decode => (entry.decode)(args),
    }
}

/// Build the encode transformer named by `config`.
pub fn encoder(config: &str) -> Result<Box<dyn Transformer + Send>> {
    lookup(config, Direction::Encode)
}

/// Build the decode transformer named by `config`.
pub fn decoder(config: &str) -> Result<Box<dyn Transformer + Send>> {
    lookup(config, Direction::Decode)
}

/// Resolve an encode pipeline: empty is the identity, one stage looks up the
/// registry, more than one is not supported.
pub fn encoder_pipeline(configs: &[String]) -> Result<Box<dyn Transformer + Send>> {
    match configs {
        [] => Ok(Box::new(Identity::default())),
        [one] => encoder(one),
        _ => Err(Error::Unsupported(
            "multiple transformers".to_string(),
        )),
    }
}

/// Resolve a decode pipeline; see [`encoder_pipeline`].
pub fn decoder_pipeline(configs: &[String]) -> Result<Box<dyn Transformer + Send>> {
    match configs {
        [] => Ok(Box::new(Identity::default())),
        [one] => decoder(one),
        _ => Err(Error::Unsupported(
            "multiple transformers".to_string(),
        )),
    }
}
