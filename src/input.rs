//! Blocking reads that ride out `EINTR`

use std::io::{self, ErrorKind, Read};

/// `read` that retries on [`ErrorKind::Interrupted`]
pub fn read_retrying<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Fill `buf` unless EOF comes first; returns the number of bytes read
///
/// Pipes and sockets hand back short reads, so a single `read` is not enough
/// to tell a full block from the tail of the input.
pub fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match read_retrying(reader, &mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
