//! I/O utilities.
use std::io;
use std::io::prelude::*;

/// Hands out at most `chunk` bytes per read from the inner stream, the way a
/// socket delivers a request in several segments.
pub struct Trickle<R> {
    inner: R,
    chunk: usize,
    reads: usize,
}

impl<R> Trickle<R> {
    pub fn new(inner: R, chunk: usize) -> Self {
        Self {
            inner,
            chunk: chunk.max(1),
            reads: 0,
        }
    }
    /// Number of `read` calls made so far.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl<R: Read> Read for Trickle<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads += 1;
        let len = buf.len().min(self.chunk);
        self.inner.read(&mut buf[..len])
    }
}

/// Combine a read-only stream and a write-only stream into one read-write stream.
pub struct ReadWriteAdapter<R: Read, W: Write> {
    reader: R,
    writer: W,
}

impl<R: Read, W: Write> ReadWriteAdapter<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
    pub fn reader(&self) -> &R {
        &self.reader
    }
}

impl<R: Read, W: Write> Read for ReadWriteAdapter<R, W> {
    fn read(&mut self, buf: &mut [u8]) -> std::result::Result<usize, std::io::Error> {
        self.reader.read(buf)
    }
}
impl<R: Read, W: Write> Write for ReadWriteAdapter<R, W> {
    fn write(&mut self, buf: &[u8]) -> std::result::Result<usize, std::io::Error> {
        self.writer.write(buf)
    }
    fn flush(&mut self) -> std::result::Result<(), std::io::Error> {
        self.writer.flush()
    }
}
