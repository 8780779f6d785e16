//! Blocking byte-stream helpers shared by the framing readers.

use std::io::{self, Read};

/// Read until `buf` is full or the source reports end of file. Short reads
/// from the source are retried; the return value is the number of bytes
/// actually placed in `buf`.
pub fn read_full<R: Read + ?Sized>(src: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
