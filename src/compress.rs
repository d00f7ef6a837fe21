use alloc::vec;

use log::{debug, trace};

use crate::config::CompressConfig;
use crate::decoder::Decoder;
use crate::encoder::{Encoder, FinishStatus, PollStatus};
use crate::error::CompressError;
use crate::header::{CompressHeader, HEADER_SIZE, RAW_FLAG_SIZE};

type Result<T> = core::result::Result<T, CompressError>;

/// Block and stream codec owning one encoder and one decoder.
///
/// Every call starts and ends with both state machines reset, so one instance can
/// process any number of independent buffers, one at a time.
pub struct Compress {
    pub(crate) config: CompressConfig,
    pub(crate) encoder: Encoder,
    pub(crate) decoder: Decoder,
}

impl Default for Compress {
    fn default() -> Self {
        Self::new(CompressConfig::DEFAULT)
    }
}

impl Compress {
    #[must_use]
    pub fn new(config: CompressConfig) -> Self {
        Self {
            encoder: Encoder::new(&config),
            decoder: Decoder::new(&config, config.input_buffer_sz()),
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &CompressConfig {
        &self.config
    }

    /// Encodes `input` into a self-describing frame in `output`.
    ///
    /// The frame is compressed (4-byte header + LZSS payload) only when that is smaller
    /// than `input.len() + 1`; otherwise it is a 1-byte flag followed by the raw input.
    /// Returns the number of bytes written.
    ///
    /// # Errors
    /// * [`CompressError::EmptyInput`] for an empty `input`.
    /// * [`CompressError::OutputTooSmall`] when neither the compressed frame nor the
    ///   verbatim fallback fits in `output`. The header slot is left untouched, but bytes
    ///   after it may hold scratch payload from the abandoned attempt.
    pub fn encode(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        if input.is_empty() {
            return Err(CompressError::EmptyInput);
        }

        self.encoder.reset();
        let compressed = self.encode_block(input, output);
        self.encoder.reset();

        match compressed {
            Some(total) if total < input.len() + RAW_FLAG_SIZE => {
                let header = CompressHeader::compressed((total - HEADER_SIZE) as u16);
                output[..HEADER_SIZE].copy_from_slice(&header.to_bytes());
                trace!("encoded {} bytes into {} byte frame", input.len(), total);
                Ok(total)
            }
            _ if output.len() > input.len() => {
                debug!("storing {} bytes verbatim", input.len());
                output[0] = CompressHeader::raw().to_bytes()[0];
                output[RAW_FLAG_SIZE..=input.len()].copy_from_slice(input);
                Ok(input.len() + RAW_FLAG_SIZE)
            }
            _ => Err(CompressError::OutputTooSmall),
        }
    }

    /// Runs the encoder over `input` writing the payload after the header slot.
    /// `None` when the payload does not fit in `output` or in the 16-bit size field.
    fn encode_block(&mut self, input: &[u8], output: &mut [u8]) -> Option<usize> {
        if output.len() < HEADER_SIZE {
            return None;
        }
        let limit = output.len().min(HEADER_SIZE + u16::MAX as usize);
        let output = &mut output[..limit];
        let mut res_size = HEADER_SIZE;
        let mut sunk = 0;

        while sunk < input.len() {
            sunk += self.encoder.sink(&input[sunk..]).ok()?;
            let (status, n) = self.encoder.poll(&mut output[res_size..]).ok()?;
            res_size += n;
            if status == PollStatus::More {
                return None;
            }
        }

        while self.encoder.finish() == FinishStatus::More {
            let (status, n) = self.encoder.poll(&mut output[res_size..]).ok()?;
            res_size += n;
            if status == PollStatus::More || (n == 0 && self.encoder.finish() == FinishStatus::More) {
                return None;
            }
        }
        Some(res_size)
    }

    /// Compresses a stream pulled from `read` and pushes the raw LZSS bytes (no frame
    /// header) to `write`. Returns the number of compressed bytes written.
    ///
    /// `read` fills the given buffer and returns the byte count, 0 meaning end of
    /// input. `write` must accept the whole chunk; any shorter count aborts with
    /// [`CompressError::ShortWrite`]. Chunks handed to `write` are at most
    /// `input_buffer_sz` bytes.
    pub fn encode_streamed<R, W>(&mut self, mut read: R, mut write: W) -> Result<usize>
    where
        R: FnMut(&mut [u8]) -> usize,
        W: FnMut(&[u8]) -> usize,
    {
        self.encoder.reset();
        let result = self.encode_streamed_inner(&mut read, &mut write);
        self.encoder.reset();
        result
    }

    fn encode_streamed_inner<R, W>(&mut self, read: &mut R, write: &mut W) -> Result<usize>
    where
        R: FnMut(&mut [u8]) -> usize,
        W: FnMut(&[u8]) -> usize,
    {
        let mut input = vec![0u8; self.config.window_size()];
        let mut scratch = vec![0u8; self.config.input_buffer_sz()];
        let mut filled = 0;
        let mut total = 0;

        loop {
            let read_size = read(&mut input).min(input.len());
            if read_size == 0 {
                break;
            }
            let mut sunk = 0;
            while sunk < read_size {
                sunk += self.encoder.sink(&input[sunk..read_size])?;
                loop {
                    let (status, n) = self.encoder.poll(&mut scratch[filled..])?;
                    filled += n;
                    if filled == scratch.len() {
                        total += flush_chunk(write, &scratch[..filled])?;
                        filled = 0;
                    }
                    if status == PollStatus::Empty {
                        break;
                    }
                }
            }
        }

        while self.encoder.finish() == FinishStatus::More {
            let (status, n) = self.encoder.poll(&mut scratch[filled..])?;
            filled += n;
            if filled == scratch.len() {
                total += flush_chunk(write, &scratch[..filled])?;
                filled = 0;
            } else if status == PollStatus::Empty && n == 0 && self.encoder.finish() == FinishStatus::More {
                return Err(CompressError::Encoder);
            }
        }

        if filled > 0 {
            total += flush_chunk(write, &scratch[..filled])?;
        }
        Ok(total)
    }
}

/// Hands one chunk to an all-or-nothing writer.
pub(crate) fn flush_chunk<W>(write: &mut W, chunk: &[u8]) -> Result<usize>
where
    W: FnMut(&[u8]) -> usize,
{
    let written = write(chunk);
    if written < chunk.len() {
        return Err(CompressError::ShortWrite {
            requested: chunk.len(),
            written,
        });
    }
    Ok(chunk.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_is_compressed() {
        let mut compress = Compress::default();
        let mut out = [0u8; 64];
        let size = compress.encode(&[b'A'; 32], &mut out).unwrap();
        let header = CompressHeader::parse(&out[..size]).unwrap();
        assert!(header.is_compressed);
        assert!(header.compressed_buff_size < 8);
        assert_eq!(header.frame_len(), Some(size));
    }

    #[test]
    fn four_byte_run_cannot_beat_the_header() {
        // Literal + one back-reference is 3 bytes, so the framed size (7) is not below 4 + 1.
        let mut compress = Compress::default();
        let mut out = [0u8; 64];
        assert_eq!(compress.encode(b"AAAA", &mut out), Ok(5));
        assert_eq!(&out[..5], b"\0AAAA");
    }

    #[test]
    fn short_text_falls_back_to_verbatim() {
        let mut compress = Compress::default();
        let mut out = [0u8; 16];
        let size = compress.encode(b"abc", &mut out).unwrap();
        assert_eq!(size, 4);
        assert_eq!(&out[..4], b"\0abc");
    }

    #[test]
    fn empty_input_rejected() {
        let mut compress = Compress::default();
        assert_eq!(compress.encode(b"", &mut [0u8; 8]), Err(CompressError::EmptyInput));
    }

    #[test]
    fn short_writer_aborts() {
        let mut compress = Compress::default();
        let data = [7u8; 600];
        let mut offset = 0;
        let result = compress.encode_streamed(
            |buf: &mut [u8]| {
                let n = buf.len().min(data.len() - offset);
                buf[..n].copy_from_slice(&data[offset..offset + n]);
                offset += n;
                n
            },
            |buf: &[u8]| buf.len() / 2,
        );
        assert!(matches!(result, Err(CompressError::ShortWrite { .. })));
    }
}
