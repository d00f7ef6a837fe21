use alloc::vec;
use alloc::vec::Vec;

use crate::config::CompressConfig;
use crate::decoder::Decoder;
use crate::decompress::decode_frame;
use crate::error::CompressError;
use crate::header::{CompressHeader, RAW_FLAG_SIZE};

/// Staging buffer of the icon decoder; icon payloads are small.
pub const ICON_ENCODED_BUFF_SIZE: usize = 256;

/// Extra room past the expected decoded size.
const DECODE_HEADROOM: usize = 4;

/// Decode-only engine for small, immutable assets such as bitmaps.
///
/// The instance owns one output buffer that every compressed decode reuses. The slice
/// returned by [`CompressIcon::decode`] borrows the instance, so it must be consumed
/// (or copied) before the next decode; the borrow checker enforces this.
pub struct CompressIcon {
    decoder: Decoder,
    buffer: Vec<u8>,
}

impl CompressIcon {
    /// `decode_buf_size` is the largest decoded asset this instance will handle.
    #[must_use]
    pub fn new(decode_buf_size: usize) -> Self {
        Self {
            decoder: Decoder::new(&CompressConfig::DEFAULT, ICON_ENCODED_BUFF_SIZE),
            buffer: vec![0; decode_buf_size + DECODE_HEADROOM],
        }
    }

    /// Returns the decoded bytes of `icon_data`.
    ///
    /// A verbatim asset is returned in place (everything after the flag byte, no copy).
    /// A compressed asset is decoded into the shared buffer.
    ///
    /// # Errors
    /// Any frame error of [`crate::Compress::decode`], including
    /// [`CompressError::OutputTooSmall`] for assets larger than the instance was sized for.
    pub fn decode<'a>(&'a mut self, icon_data: &'a [u8]) -> Result<&'a [u8], CompressError> {
        let header = CompressHeader::parse(icon_data)?;
        if !header.is_compressed {
            return Ok(&icon_data[RAW_FLAG_SIZE..]);
        }
        let size = decode_frame(&mut self.decoder, icon_data, &mut self.buffer)?;
        Ok(&self.buffer[..size])
    }

    /// Capacity of the shared output buffer.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }
}
