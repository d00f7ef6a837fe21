//! Framing for encoded blocks.
//!
//! ```text
//! compressed:  [0x01] [0x00] [size lo] [size hi] [size bytes of LZSS data]
//! verbatim:    [0x00] [original bytes...]
//! ```
//!
//! Only compressed frames carry the full 4-byte header. A verbatim frame is a single
//! flag byte followed by the raw input, so its total length is `input + 1`.

use crate::error::CompressError;

/// Length of the header in front of a compressed frame.
pub const HEADER_SIZE: usize = 4;

/// Length of the flag in front of a verbatim frame.
pub const RAW_FLAG_SIZE: usize = 1;

const FLAG_RAW: u8 = 0;
const FLAG_COMPRESSED: u8 = 1;

/// Decoded frame prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressHeader {
    /// `false` for verbatim frames.
    pub is_compressed: bool,
    /// Length of the LZSS payload after the header, header excluded.
    /// Always zero for verbatim frames.
    pub compressed_buff_size: u16,
}

impl CompressHeader {
    #[must_use]
    pub const fn compressed(compressed_buff_size: u16) -> Self {
        Self {
            is_compressed: true,
            compressed_buff_size,
        }
    }

    #[must_use]
    pub const fn raw() -> Self {
        Self {
            is_compressed: false,
            compressed_buff_size: 0,
        }
    }

    /// Wire form of a compressed frame header.
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let size = self.compressed_buff_size.to_le_bytes();
        let flag = if self.is_compressed {
            FLAG_COMPRESSED
        } else {
            FLAG_RAW
        };
        [flag, 0, size[0], size[1]]
    }

    /// Reads the prefix of an encoded frame.
    ///
    /// # Errors
    /// * [`CompressError::InputTooShort`] if `data` is empty, or a compressed flag is not
    ///   followed by the rest of the header.
    /// * [`CompressError::InvalidHeader`] if the flag byte is neither 0 nor 1.
    pub fn parse(data: &[u8]) -> Result<Self, CompressError> {
        let Some(&flag) = data.first() else {
            return Err(CompressError::InputTooShort);
        };
        match flag {
            FLAG_RAW => Ok(Self::raw()),
            FLAG_COMPRESSED => {
                if data.len() < HEADER_SIZE {
                    return Err(CompressError::InputTooShort);
                }
                Ok(Self::compressed(u16::from_le_bytes([data[2], data[3]])))
            }
            other => Err(CompressError::InvalidHeader(other)),
        }
    }

    /// Total frame length implied by this header, header included.
    /// `None` for verbatim frames, whose length is only known from the buffer.
    #[must_use]
    pub const fn frame_len(&self) -> Option<usize> {
        if self.is_compressed {
            Some(HEADER_SIZE + self.compressed_buff_size as usize)
        } else {
            None
        }
    }
}
