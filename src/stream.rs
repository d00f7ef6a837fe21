//! Random-access byte storage used by the key dictionary.
//!
//! [`Stream`] is the capability the dictionary consumes; it is implemented for an
//! in-memory buffer ([`MemoryStream`]) and, with `std`, for files ([`FileStream`]).
//! The provided line, insert and delete helpers move data through a fixed-size chunk
//! buffer, so no operation needs memory proportional to the stream size.

use alloc::vec::Vec;

use crate::error::StreamError;

type Result<T> = core::result::Result<T, StreamError>;

/// Chunk used when reading lines and shifting data.
const CHUNK_SIZE: usize = 64;

/// Origin of a [`Stream::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOffset {
    FromStart,
    FromCurrent,
    FromEnd,
}

pub trait Stream {
    /// Reads up to `buf.len()` bytes at the cursor; 0 at end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Writes at the cursor, overwriting existing bytes and growing the stream past its end.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Moves the cursor and returns its new absolute position. Positions outside
    /// `0..=size` are rejected.
    fn seek(&mut self, offset: i64, origin: StreamOffset) -> Result<usize>;

    fn tell(&mut self) -> Result<usize>;

    fn size(&mut self) -> Result<usize>;

    /// Drops every byte from the cursor to the end.
    fn truncate(&mut self) -> Result<()>;

    fn rewind(&mut self) -> Result<()> {
        self.seek(0, StreamOffset::FromStart).map(|_| ())
    }

    fn eof(&mut self) -> Result<bool> {
        Ok(self.tell()? >= self.size()?)
    }

    fn read_exact(&mut self, mut buf: &mut [u8]) -> Result<()> {
        while !buf.is_empty() {
            match self.read(buf)? {
                0 => return Err(StreamError::UnexpectedEof),
                n => buf = &mut buf[n..],
            }
        }
        Ok(())
    }

    fn write_all(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            match self.write(data)? {
                0 => return Err(StreamError::WriteZero),
                n => data = &data[n..],
            }
        }
        Ok(())
    }

    /// Reads one line, terminator included, leaving the cursor at the start of the next.
    ///
    /// At most `max` bytes of the line are stored in `line` (which is cleared first);
    /// the rest is skipped. Returns the full length of the line in the stream, or
    /// `None` at end of stream.
    fn read_line(&mut self, line: &mut Vec<u8>, max: usize) -> Result<Option<usize>> {
        line.clear();
        let mut chunk = [0u8; CHUNK_SIZE];
        let mut consumed = 0;

        loop {
            let n = self.read(&mut chunk)?;
            if n == 0 {
                return Ok((consumed > 0).then_some(consumed));
            }
            let (take, found) = match chunk[..n].iter().position(|&b| b == b'\n') {
                Some(idx) => (idx + 1, true),
                None => (n, false),
            };

            let room = max.saturating_sub(line.len()).min(take);
            line.extend_from_slice(&chunk[..room]);
            consumed += take;

            if found {
                let excess = n - take;
                if excess > 0 {
                    self.seek(-(excess as i64), StreamOffset::FromCurrent)?;
                }
                return Ok(Some(consumed));
            }
        }
    }

    /// Inserts `data` at the cursor, shifting the tail forward. The cursor ends up
    /// right after the inserted bytes.
    fn insert(&mut self, data: &[u8]) -> Result<()> {
        let pos = self.tell()?;
        let size = self.size()?;
        let mut chunk = [0u8; CHUNK_SIZE];

        // Move the tail back to front so no byte is overwritten before it is copied.
        let mut remaining = size - pos;
        while remaining > 0 {
            let step = remaining.min(CHUNK_SIZE);
            let src = pos + remaining - step;
            self.seek(src as i64, StreamOffset::FromStart)?;
            self.read_exact(&mut chunk[..step])?;
            self.seek((src + data.len()) as i64, StreamOffset::FromStart)?;
            self.write_all(&chunk[..step])?;
            remaining -= step;
        }

        self.seek(pos as i64, StreamOffset::FromStart)?;
        self.write_all(data)
    }

    /// Removes `len` bytes at the cursor, shifting the tail back. The cursor stays put.
    fn delete(&mut self, len: usize) -> Result<()> {
        let pos = self.tell()?;
        let size = self.size()?;
        if pos + len > size {
            return Err(StreamError::SeekOutOfBounds);
        }
        let mut chunk = [0u8; CHUNK_SIZE];

        let mut src = pos + len;
        let mut dst = pos;
        while src < size {
            let step = (size - src).min(CHUNK_SIZE);
            self.seek(src as i64, StreamOffset::FromStart)?;
            self.read_exact(&mut chunk[..step])?;
            self.seek(dst as i64, StreamOffset::FromStart)?;
            self.write_all(&chunk[..step])?;
            src += step;
            dst += step;
        }

        self.seek((size - len) as i64, StreamOffset::FromStart)?;
        self.truncate()?;
        self.seek(pos as i64, StreamOffset::FromStart).map(|_| ())
    }
}

/// Resolves a seek request against the current position and size.
fn resolve_seek(offset: i64, origin: StreamOffset, current: usize, size: usize) -> Result<usize> {
    let base = match origin {
        StreamOffset::FromStart => 0,
        StreamOffset::FromCurrent => current as i64,
        StreamOffset::FromEnd => size as i64,
    };
    match base.checked_add(offset) {
        Some(target) if (0..=size as i64).contains(&target) => Ok(target as usize),
        _ => Err(StreamError::SeekOutOfBounds),
    }
}

/// Growable in-memory stream.
#[derive(Debug, Default, Clone)]
pub struct MemoryStream {
    data: Vec<u8>,
    pos: usize,
}

impl MemoryStream {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for MemoryStream {
    fn from(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }
}

impl From<&[u8]> for MemoryStream {
    fn from(data: &[u8]) -> Self {
        Self::from(data.to_vec())
    }
}

impl Stream for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let overlap = data.len().min(self.data.len() - self.pos);
        self.data[self.pos..self.pos + overlap].copy_from_slice(&data[..overlap]);
        self.data.extend_from_slice(&data[overlap..]);
        self.pos += data.len();
        Ok(data.len())
    }

    fn seek(&mut self, offset: i64, origin: StreamOffset) -> Result<usize> {
        self.pos = resolve_seek(offset, origin, self.pos, self.data.len())?;
        Ok(self.pos)
    }

    fn tell(&mut self) -> Result<usize> {
        Ok(self.pos)
    }

    fn size(&mut self) -> Result<usize> {
        Ok(self.data.len())
    }

    fn truncate(&mut self) -> Result<()> {
        self.data.truncate(self.pos);
        Ok(())
    }
}

#[cfg(feature = "std")]
pub use file::FileStream;

#[cfg(feature = "std")]
mod file {
    use std::fs::{File, OpenOptions};
    use std::io::{Read, Seek, SeekFrom, Write};
    use std::path::Path;

    use super::{Result, Stream, StreamOffset, resolve_seek};

    /// Read-write stream over a file on disk.
    #[derive(Debug)]
    pub struct FileStream {
        file: File,
    }

    impl FileStream {
        /// Opens `path` for reading and writing, creating it first when `create` is set.
        pub fn open(path: impl AsRef<Path>, create: bool) -> Result<Self> {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(create)
                .truncate(false)
                .open(path)?;
            Ok(Self { file })
        }

        /// Pushes buffered data down to the storage device.
        pub fn sync(&mut self) -> Result<()> {
            self.file.sync_data()?;
            Ok(())
        }
    }

    impl Stream for FileStream {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            Ok(self.file.read(buf)?)
        }

        fn write(&mut self, data: &[u8]) -> Result<usize> {
            Ok(self.file.write(data)?)
        }

        fn seek(&mut self, offset: i64, origin: StreamOffset) -> Result<usize> {
            let current = self.tell()?;
            let size = self.size()?;
            let target = resolve_seek(offset, origin, current, size)?;
            Ok(self.file.seek(SeekFrom::Start(target as u64))? as usize)
        }

        fn tell(&mut self) -> Result<usize> {
            Ok(self.file.stream_position()? as usize)
        }

        fn size(&mut self) -> Result<usize> {
            Ok(self.file.metadata()?.len() as usize)
        }

        fn truncate(&mut self) -> Result<()> {
            let pos = self.file.stream_position()?;
            self.file.set_len(pos)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(text: &str) -> MemoryStream {
        MemoryStream::from(text.as_bytes())
    }

    #[test]
    fn read_line_keeps_cursor_on_next_line() {
        let mut s = stream("first\nsecond\nlast");
        let mut line = Vec::new();
        assert_eq!(s.read_line(&mut line, 32).unwrap(), Some(6));
        assert_eq!(line, b"first\n");
        assert_eq!(s.tell().unwrap(), 6);
        assert_eq!(s.read_line(&mut line, 32).unwrap(), Some(7));
        assert_eq!(line, b"second\n");
        assert_eq!(s.read_line(&mut line, 32).unwrap(), Some(4));
        assert_eq!(line, b"last");
        assert_eq!(s.read_line(&mut line, 32).unwrap(), None);
    }

    #[test]
    fn read_line_caps_stored_bytes() {
        let long = "x".repeat(200) + "\nnext\n";
        let mut s = stream(&long);
        let mut line = Vec::new();
        assert_eq!(s.read_line(&mut line, 8).unwrap(), Some(201));
        assert_eq!(line.len(), 8);
        assert_eq!(s.read_line(&mut line, 8).unwrap(), Some(5));
        assert_eq!(line, b"next\n");
    }

    #[test]
    fn insert_shifts_tail() {
        let tail = "t".repeat(150);
        let mut s = stream(&format!("head{tail}"));
        s.seek(4, StreamOffset::FromStart).unwrap();
        s.insert(b"--").unwrap();
        assert_eq!(s.tell().unwrap(), 6);
        assert_eq!(s.as_slice(), format!("head--{tail}").as_bytes());
    }

    #[test]
    fn delete_splices_in_place() {
        let tail = "z".repeat(130);
        let mut s = stream(&format!("keep\ndrop\n{tail}"));
        s.seek(5, StreamOffset::FromStart).unwrap();
        s.delete(5).unwrap();
        assert_eq!(s.tell().unwrap(), 5);
        assert_eq!(s.as_slice(), format!("keep\n{tail}").as_bytes());
        assert!(matches!(s.delete(1000), Err(StreamError::SeekOutOfBounds)));
    }

    #[test]
    fn seek_bounds() {
        let mut s = stream("abc");
        assert_eq!(s.seek(-1, StreamOffset::FromEnd).unwrap(), 2);
        assert!(matches!(
            s.seek(2, StreamOffset::FromCurrent),
            Err(StreamError::SeekOutOfBounds)
        ));
        assert!(matches!(
            s.seek(-1, StreamOffset::FromStart),
            Err(StreamError::SeekOutOfBounds)
        ));
        assert!(s.eof().is_ok_and(|eof| !eof));
    }
}
