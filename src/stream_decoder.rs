//! Pull-side decoding of a raw LZSS stream.
//!
//! [`StreamDecoder`] wraps a reader callback and hands out decoded bytes on demand,
//! which suits consumers that parse a compressed file piece by piece (archive
//! headers, then member data) instead of unpacking it in one pass.

use alloc::vec;
use alloc::vec::Vec;

use crate::config::CompressConfig;
use crate::decoder::Decoder;
use crate::encoder::PollStatus;
use crate::error::CompressError;

type Result<T> = core::result::Result<T, CompressError>;

/// Scratch size used while skipping forward.
const SKIP_CHUNK: usize = 64;

/// Decoder over a pull-based source of compressed bytes.
///
/// `R` fills the given buffer and returns the byte count, 0 meaning end of input.
pub struct StreamDecoder<R> {
    decoder: Decoder,
    reader: R,
    input: Vec<u8>,
    input_len: usize,
    input_pos: usize,
    position: usize,
    eof: bool,
}

impl<R> StreamDecoder<R>
where
    R: FnMut(&mut [u8]) -> usize,
{
    #[must_use]
    pub fn new(config: &CompressConfig, reader: R) -> Self {
        Self {
            decoder: Decoder::new(config, config.input_buffer_sz()),
            reader,
            input: vec![0; config.input_buffer_sz()],
            input_len: 0,
            input_pos: 0,
            position: 0,
            eof: false,
        }
    }

    /// Fills `out` completely with the next decoded bytes.
    ///
    /// # Errors
    /// [`CompressError::UnexpectedEof`] if the source runs dry first. Bytes decoded
    /// before the failure are consumed and counted by [`StreamDecoder::tell`].
    pub fn read(&mut self, out: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < out.len() {
            let (_, n) = self.decoder.poll(&mut out[filled..])?;
            filled += n;
            self.position += n;
            if filled == out.len() {
                break;
            }

            if self.input_pos == self.input_len {
                if self.eof {
                    return Err(CompressError::UnexpectedEof);
                }
                self.input_len = (self.reader)(&mut self.input).min(self.input.len());
                self.input_pos = 0;
                if self.input_len == 0 {
                    self.eof = true;
                    continue;
                }
            }
            self.input_pos += self
                .decoder
                .sink(&self.input[self.input_pos..self.input_len])?;
        }
        Ok(())
    }

    /// Number of decoded bytes handed out so far.
    #[must_use]
    pub const fn tell(&self) -> usize {
        self.position
    }

    /// Moves forward to decoded offset `position`, discarding the bytes in between.
    ///
    /// # Errors
    /// [`CompressError::Decoder`] for a position behind the current one (use
    /// [`StreamDecoder::rewind`] first), or any error of [`StreamDecoder::read`].
    pub fn seek(&mut self, position: usize) -> Result<()> {
        if position < self.position {
            return Err(CompressError::Decoder);
        }
        let mut skip = [0u8; SKIP_CHUNK];
        while self.position < position {
            let step = (position - self.position).min(SKIP_CHUNK);
            self.read(&mut skip[..step])?;
        }
        Ok(())
    }

    /// Restarts decoding from offset 0.
    ///
    /// Staged input is dropped; the caller repositions the source at the start of the
    /// compressed stream before the next read.
    pub fn rewind(&mut self) {
        self.decoder.reset();
        self.input_len = 0;
        self.input_pos = 0;
        self.position = 0;
        self.eof = false;
    }

    /// `true` once the source is exhausted and no decoded bytes remain.
    pub fn is_finished(&mut self) -> Result<bool> {
        if !self.eof || self.input_pos < self.input_len {
            return Ok(false);
        }
        let (status, _) = self.decoder.poll(&mut [])?;
        Ok(status == PollStatus::Empty)
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;
    use crate::Compress;

    fn compress_raw(data: &[u8]) -> Vec<u8> {
        let mut compress = Compress::default();
        let mut out = Vec::new();
        let mut offset = 0;
        compress
            .encode_streamed(
                |buf: &mut [u8]| {
                    let n = buf.len().min(data.len() - offset);
                    buf[..n].copy_from_slice(&data[offset..offset + n]);
                    offset += n;
                    n
                },
                |buf: &[u8]| {
                    out.extend_from_slice(buf);
                    buf.len()
                },
            )
            .unwrap();
        out
    }

    #[test]
    fn reads_in_arbitrary_pieces() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 13) as u8).collect();
        let compressed = compress_raw(&data);
        let mut offset = 0;
        let mut decoder = StreamDecoder::new(&CompressConfig::DEFAULT, |buf: &mut [u8]| {
            let n = buf.len().min(compressed.len() - offset).min(5);
            buf[..n].copy_from_slice(&compressed[offset..offset + n]);
            offset += n;
            n
        });

        let mut head = [0u8; 10];
        decoder.read(&mut head).unwrap();
        assert_eq!(&head, &data[..10]);

        decoder.seek(500).unwrap();
        assert_eq!(decoder.tell(), 500);
        let mut tail = [0u8; 500];
        decoder.read(&mut tail).unwrap();
        assert_eq!(&tail[..], &data[500..]);

        assert_eq!(decoder.read(&mut [0u8; 1]), Err(CompressError::UnexpectedEof));
        assert!(decoder.is_finished().unwrap());
    }

    #[test]
    fn backward_seek_requires_rewind() {
        let compressed = compress_raw(b"abcdefabcdefabcdef");
        let offset = Cell::new(0usize);
        let mut decoder = StreamDecoder::new(&CompressConfig::DEFAULT, |buf: &mut [u8]| {
            let start = offset.get();
            let n = buf.len().min(compressed.len() - start);
            buf[..n].copy_from_slice(&compressed[start..start + n]);
            offset.set(start + n);
            n
        });

        decoder.seek(6).unwrap();
        assert_eq!(decoder.seek(2), Err(CompressError::Decoder));

        offset.set(0);
        decoder.rewind();
        assert_eq!(decoder.tell(), 0);
        decoder.seek(2).unwrap();
        let mut out = [0u8; 4];
        decoder.read(&mut out).unwrap();
        assert_eq!(&out, b"cdef");
    }
}
