//! Byte-level I/O on the backing image (C1).
//!
//! A single positioned transfer primitive everything else in the engine is built on: seek to an
//! absolute offset, then read or write the requested number of bytes. There is no caching layer
//! above the OS page cache, and a short read or write other than a clean EOF is fatal.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Reads exactly `buf.len()` bytes starting at absolute byte `offset`.
///
/// A short read (other than a clean end-of-stream, which is also an error here: callers never
/// read past the image) is reported as [`io::ErrorKind::UnexpectedEof`].
pub fn read_bytes(dev: &mut File, offset: u64, buf: &mut [u8]) -> io::Result<()> {
	dev.seek(SeekFrom::Start(offset))?;
	dev.read_exact(buf)
}

/// Writes exactly `buf.len()` bytes starting at absolute byte `offset`.
pub fn write_bytes(dev: &mut File, offset: u64, buf: &[u8]) -> io::Result<()> {
	dev.seek(SeekFrom::Start(offset))?;
	dev.write_all(buf)
}
