use alloc::vec;

use log::warn;

use crate::compress::{Compress, flush_chunk};
use crate::decoder::Decoder;
use crate::encoder::{FinishStatus, PollStatus};
use crate::error::CompressError;
use crate::header::{CompressHeader, HEADER_SIZE, RAW_FLAG_SIZE};

type Result<T> = core::result::Result<T, CompressError>;

impl Compress {
    /// Decodes a frame produced by [`Compress::encode`] into `output`.
    ///
    /// Returns the exact length of the original data.
    ///
    /// # Errors
    /// * [`CompressError::OutputTooSmall`] as soon as `output` fills while decoded
    ///   bytes are still owed; nothing is silently truncated.
    /// * [`CompressError::InputTooShort`] / [`CompressError::InvalidHeader`] for a
    ///   malformed frame, [`CompressError::UnexpectedEof`] for a payload that stops
    ///   inside a token.
    pub fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<usize> {
        decode_frame(&mut self.decoder, input, output)
    }

    /// Decodes a raw LZSS stream pulled from `read`, pushing the result to `write`.
    ///
    /// `read` fills the given buffer (at most `input_buffer_sz` bytes) and returns the
    /// count, 0 meaning end of input. Decoded bytes are collected in a scratch buffer of
    /// `input_buffer_sz` bytes and handed to `write` whenever it fills and once more at
    /// the end; `write` must accept the whole chunk. Returns the decoded length.
    ///
    /// # Errors
    /// * [`CompressError::ShortWrite`] when `write` accepts fewer bytes than offered.
    /// * [`CompressError::UnexpectedEof`] when input ends inside a token.
    pub fn decode_streamed<R, W>(&mut self, mut read: R, mut write: W) -> Result<usize>
    where
        R: FnMut(&mut [u8]) -> usize,
        W: FnMut(&[u8]) -> usize,
    {
        self.decoder.reset();
        let result = decode_streamed_inner(
            &mut self.decoder,
            self.config.input_buffer_sz(),
            &mut read,
            &mut write,
        );
        self.decoder.reset();
        if let Err(e) = &result {
            warn!("streamed decode failed: {e}");
        }
        result
    }
}

/// Shared frame decoder for [`Compress`] and [`crate::CompressIcon`].
/// The decoder is reset on entry and on every exit path.
pub(crate) fn decode_frame(decoder: &mut Decoder, input: &[u8], output: &mut [u8]) -> Result<usize> {
    decoder.reset();
    let result = decode_frame_inner(decoder, input, output);
    decoder.reset();
    result
}

fn decode_frame_inner(decoder: &mut Decoder, input: &[u8], output: &mut [u8]) -> Result<usize> {
    let header = CompressHeader::parse(input)?;

    let Some(frame_len) = header.frame_len() else {
        let raw = &input[RAW_FLAG_SIZE..];
        if output.len() < raw.len() {
            return Err(CompressError::OutputTooSmall);
        }
        output[..raw.len()].copy_from_slice(raw);
        return Ok(raw.len());
    };

    if input.len() < frame_len {
        return Err(CompressError::InputTooShort);
    }
    let payload = &input[HEADER_SIZE..frame_len];

    let mut res_size = 0;
    let mut sunk = 0;
    while sunk < payload.len() {
        sunk += decoder.sink(&payload[sunk..])?;
        let (status, n) = decoder.poll(&mut output[res_size..])?;
        res_size += n;
        if status == PollStatus::More {
            return Err(CompressError::OutputTooSmall);
        }
    }

    while decoder.finish() == FinishStatus::More {
        let (status, n) = decoder.poll(&mut output[res_size..])?;
        res_size += n;
        if status == PollStatus::More {
            return Err(CompressError::OutputTooSmall);
        }
        if n == 0 {
            return Err(CompressError::Decoder);
        }
    }

    if decoder.is_truncated() {
        return Err(CompressError::UnexpectedEof);
    }
    Ok(res_size)
}

fn decode_streamed_inner<R, W>(
    decoder: &mut Decoder,
    buffer_sz: usize,
    read: &mut R,
    write: &mut W,
) -> Result<usize>
where
    R: FnMut(&mut [u8]) -> usize,
    W: FnMut(&[u8]) -> usize,
{
    let mut input = vec![0u8; buffer_sz];
    let mut scratch = vec![0u8; buffer_sz];
    let mut filled = 0;
    let mut total = 0;

    loop {
        let read_size = read(&mut input).min(input.len());
        if read_size == 0 {
            break;
        }

        let mut sunk = 0;
        while sunk < read_size {
            sunk += decoder.sink(&input[sunk..read_size])?;
            loop {
                let (status, n) = decoder.poll(&mut scratch[filled..])?;
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

    while decoder.finish() == FinishStatus::More {
        let (_, n) = decoder.poll(&mut scratch[filled..])?;
        filled += n;
        if filled == scratch.len() {
            total += flush_chunk(write, &scratch[..filled])?;
            filled = 0;
        } else if n == 0 {
            return Err(CompressError::Decoder);
        }
    }

    if decoder.is_truncated() {
        return Err(CompressError::UnexpectedEof);
    }
    if filled > 0 {
        total += flush_chunk(write, &scratch[..filled])?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbatim_frame_copies_payload() {
        let mut compress = Compress::default();
        let mut out = [0u8; 3];
        assert_eq!(compress.decode(b"\0xyz", &mut out), Ok(3));
        assert_eq!(&out, b"xyz");
        assert_eq!(
            compress.decode(b"\0xyz", &mut [0u8; 2]),
            Err(CompressError::OutputTooSmall)
        );
    }

    #[test]
    fn compressed_frame_with_missing_payload() {
        let mut compress = Compress::default();
        let frame = [0x01, 0x00, 0x10, 0x00, 0xA0];
        assert_eq!(
            compress.decode(&frame, &mut [0u8; 32]),
            Err(CompressError::InputTooShort)
        );
    }

    #[test]
    fn rejects_unknown_flag() {
        let mut compress = Compress::default();
        assert_eq!(
            compress.decode(&[0x05, 0, 0, 0], &mut [0u8; 4]),
            Err(CompressError::InvalidHeader(0x05))
        );
    }

    #[test]
    fn exact_output_size_is_enough() {
        let mut compress = Compress::default();
        let data = [b'z'; 100];
        let mut frame = [0u8; 128];
        let size = compress.encode(&data, &mut frame).unwrap();
        let mut out = [0u8; 100];
        assert_eq!(compress.decode(&frame[..size], &mut out), Ok(100));
        assert_eq!(
            compress.decode(&frame[..size], &mut out[..99]),
            Err(CompressError::OutputTooSmall)
        );
    }
}
