pub mod block;
pub mod chunk;
pub mod error;
pub mod header;
pub mod iovec;
pub mod magic;
pub mod names;
pub mod reader;
pub mod stream;
pub mod transform;
pub mod wire;
pub mod writer;

pub use error::{Error, Result};
pub use header::HeaderEntry;
pub use iovec::{ByteSlice, IoVec};
pub use reader::{ItemLocation, Reader, ReaderOpts};
pub use transform::{register_transformer, Transformer};
pub use wire::Value;
pub use writer::{Indexer, Writer, WriterOpts};
