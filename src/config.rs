use crate::error::CompressError;

/// Smallest window accepted by the engine (16 bytes).
pub const MIN_WINDOW_BITS: u8 = 4;

/// Largest window accepted by the engine (32 KiB).
pub const MAX_WINDOW_BITS: u8 = 15;

/// Smallest lookahead accepted by the engine (8 bytes).
pub const MIN_LOOKAHEAD_BITS: u8 = 3;

/// Engine parameters shared by the encoder and the decoder.
///
/// Both sides of a stream must agree on `window_sz2` and `lookahead_sz2`; they are not
/// recorded inside block frames. `input_buffer_sz` only sizes the decoder's staging
/// buffer and the scratch buffer of the streaming paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressConfig {
    pub(crate) window_sz2: u8,
    pub(crate) lookahead_sz2: u8,
    pub(crate) input_buffer_sz: u16,
}

impl CompressConfig {
    /// 256-byte window, 16-byte lookahead, 128-byte staging buffer.
    pub const DEFAULT: Self = Self {
        window_sz2: 8,
        lookahead_sz2: 4,
        input_buffer_sz: 128,
    };

    /// Builds a validated configuration.
    ///
    /// # Errors
    /// [`CompressError::InvalidConfig`] when the window is outside `4..=15` bits, the
    /// lookahead is below 3 bits or not strictly smaller than the window, or the staging
    /// buffer is empty.
    pub const fn new(
        window_sz2: u8,
        lookahead_sz2: u8,
        input_buffer_sz: u16,
    ) -> Result<Self, CompressError> {
        if window_sz2 < MIN_WINDOW_BITS
            || window_sz2 > MAX_WINDOW_BITS
            || lookahead_sz2 < MIN_LOOKAHEAD_BITS
            || lookahead_sz2 >= window_sz2
            || input_buffer_sz == 0
        {
            return Err(CompressError::InvalidConfig);
        }
        Ok(Self {
            window_sz2,
            lookahead_sz2,
            input_buffer_sz,
        })
    }

    #[must_use]
    pub const fn window_sz2(&self) -> u8 {
        self.window_sz2
    }

    #[must_use]
    pub const fn lookahead_sz2(&self) -> u8 {
        self.lookahead_sz2
    }

    #[must_use]
    pub const fn input_buffer_sz(&self) -> usize {
        self.input_buffer_sz as usize
    }

    pub(crate) const fn window_size(&self) -> usize {
        1 << self.window_sz2
    }
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
