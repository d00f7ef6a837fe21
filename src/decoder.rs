//! Incremental LZSS decoder (heatshrink bitstream).
//!
//! Compressed bytes are staged in a fixed input buffer with [`Decoder::sink`]; decoded
//! bytes are produced by [`Decoder::poll`]. The sliding window starts zero-filled, the
//! same as the encoder's backlog, so early back-references may point before the
//! first decoded byte.

use alloc::vec;
use alloc::vec::Vec;

use crate::config::CompressConfig;
use crate::encoder::{FinishStatus, OutputCursor, PollStatus};
use crate::error::CompressError;

/// Padding after the last token is always shorter than one byte.
const MAX_PADDING_BITS: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    TagBit,
    YieldLiteral,
    BackrefIndexMsb,
    BackrefIndexLsb,
    BackrefCountMsb,
    BackrefCountLsb,
    YieldBackref,
}

/// Streaming LZSS decoder with a fixed window and lookahead.
pub struct Decoder {
    window_sz2: u8,
    lookahead_sz2: u8,
    input: Vec<u8>,
    window: Vec<u8>,
    input_size: usize,
    input_index: usize,
    output_count: usize,
    output_index: usize,
    head_index: usize,
    state: State,
    current_byte: u8,
    bit_index: u8,
    // Bits consumed by the token currently being read.
    token_bits: u8,
}

impl Decoder {
    /// Allocates a decoder whose staging buffer holds `input_buffer_sz` compressed bytes.
    #[must_use]
    pub fn new(config: &CompressConfig, input_buffer_sz: usize) -> Self {
        Self {
            window_sz2: config.window_sz2,
            lookahead_sz2: config.lookahead_sz2,
            input: vec![0; input_buffer_sz.max(1)],
            window: vec![0; config.window_size()],
            input_size: 0,
            input_index: 0,
            output_count: 0,
            output_index: 0,
            head_index: 0,
            state: State::TagBit,
            current_byte: 0,
            bit_index: 0,
            token_bits: 0,
        }
    }

    /// Drops any staged input and clears the window.
    pub fn reset(&mut self) {
        self.window.fill(0);
        self.input_size = 0;
        self.input_index = 0;
        self.output_count = 0;
        self.output_index = 0;
        self.head_index = 0;
        self.state = State::TagBit;
        self.current_byte = 0;
        self.bit_index = 0;
        self.token_bits = 0;
    }

    /// Stages as much of `data` as fits. Returns 0 when the staging buffer is full.
    pub fn sink(&mut self, data: &[u8]) -> Result<usize, CompressError> {
        let rem = self.input.len() - self.input_size;
        let size = rem.min(data.len());
        self.input[self.input_size..self.input_size + size].copy_from_slice(&data[..size]);
        self.input_size += size;
        Ok(size)
    }

    /// Decodes into `out`, returning the status and the byte count written.
    ///
    /// [`PollStatus::More`] means `out` filled up while decoded bytes are still owed;
    /// an empty `out` can be used to ask exactly that.
    pub fn poll(&mut self, out: &mut [u8]) -> Result<(PollStatus, usize), CompressError> {
        let mut oi = OutputCursor::new(out);

        loop {
            let in_state = self.state;
            self.state = match in_state {
                State::TagBit => self.tag_bit(),
                State::YieldLiteral => self.yield_literal(&mut oi),
                State::BackrefIndexMsb => self.backref_index_msb(),
                State::BackrefIndexLsb => self.backref_index_lsb(),
                State::BackrefCountMsb => self.backref_count_msb(),
                State::BackrefCountLsb => self.backref_count_lsb(),
                State::YieldBackref => self.yield_backref(&mut oi),
            };

            if self.state == in_state {
                let owes_output = matches!(in_state, State::YieldLiteral | State::YieldBackref);
                let status = if owes_output && !oi.can_take_byte() {
                    PollStatus::More
                } else {
                    PollStatus::Empty
                };
                return Ok((status, oi.len()));
            }
        }
    }

    /// Reports whether staged input or owed output remains.
    pub fn finish(&self) -> FinishStatus {
        match self.state {
            State::YieldBackref => FinishStatus::More,
            _ if self.input_size == 0 => FinishStatus::Done,
            _ => FinishStatus::More,
        }
    }

    /// `true` when the input ended in the middle of a token rather than in the
    /// zero padding of the final byte.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        matches!(self.state, State::YieldLiteral | State::YieldBackref)
            || self.token_bits > MAX_PADDING_BITS
    }

    fn tag_bit(&mut self) -> State {
        self.token_bits = 0;
        match self.get_bits(1) {
            None => State::TagBit,
            Some(0) if self.window_sz2 > 8 => State::BackrefIndexMsb,
            Some(0) => {
                self.output_index = 0;
                State::BackrefIndexLsb
            }
            Some(_) => State::YieldLiteral,
        }
    }

    fn yield_literal(&mut self, oi: &mut OutputCursor<'_>) -> State {
        if !oi.can_take_byte() {
            return State::YieldLiteral;
        }
        let Some(byte) = self.get_bits(8) else {
            return State::YieldLiteral;
        };
        let c = byte as u8;
        let mask = self.window.len() - 1;
        self.window[self.head_index & mask] = c;
        self.head_index = self.head_index.wrapping_add(1);
        oi.push(c);
        State::TagBit
    }

    fn backref_index_msb(&mut self) -> State {
        match self.get_bits(self.window_sz2 - 8) {
            None => State::BackrefIndexMsb,
            Some(bits) => {
                self.output_index = (bits as usize) << 8;
                State::BackrefIndexLsb
            }
        }
    }

    fn backref_index_lsb(&mut self) -> State {
        match self.get_bits(self.window_sz2.min(8)) {
            None => State::BackrefIndexLsb,
            Some(bits) => {
                self.output_index |= bits as usize;
                self.output_index += 1;
                self.output_count = 0;
                if self.lookahead_sz2 > 8 {
                    State::BackrefCountMsb
                } else {
                    State::BackrefCountLsb
                }
            }
        }
    }

    fn backref_count_msb(&mut self) -> State {
        match self.get_bits(self.lookahead_sz2 - 8) {
            None => State::BackrefCountMsb,
            Some(bits) => {
                self.output_count = (bits as usize) << 8;
                State::BackrefCountLsb
            }
        }
    }

    fn backref_count_lsb(&mut self) -> State {
        match self.get_bits(self.lookahead_sz2.min(8)) {
            None => State::BackrefCountLsb,
            Some(bits) => {
                self.output_count |= bits as usize;
                self.output_count += 1;
                State::YieldBackref
            }
        }
    }

    fn yield_backref(&mut self, oi: &mut OutputCursor<'_>) -> State {
        let count = oi.remaining().min(self.output_count);
        if count == 0 {
            return State::YieldBackref;
        }

        let mask = self.window.len() - 1;
        let neg_offset = self.output_index;
        for _ in 0..count {
            let c = self.window[self.head_index.wrapping_sub(neg_offset) & mask];
            oi.push(c);
            self.window[self.head_index & mask] = c;
            self.head_index = self.head_index.wrapping_add(1);
        }
        self.output_count -= count;

        if self.output_count == 0 {
            State::TagBit
        } else {
            State::YieldBackref
        }
    }

    /// Reads `count` (1..=8) bits, most significant first, or `None` if the staged
    /// input cannot supply all of them. Never consumes a partial read.
    fn get_bits(&mut self, count: u8) -> Option<u16> {
        if self.input_size == 0 && u16::from(self.bit_index) < (1 << (count - 1)) {
            return None;
        }

        let mut accumulator: u16 = 0;
        for _ in 0..count {
            if self.bit_index == 0 {
                if self.input_size == 0 {
                    return None;
                }
                self.current_byte = self.input[self.input_index];
                self.input_index += 1;
                if self.input_index == self.input_size {
                    self.input_index = 0;
                    self.input_size = 0;
                }
                self.bit_index = 0x80;
            }
            accumulator <<= 1;
            if self.current_byte & self.bit_index != 0 {
                accumulator |= 0x01;
            }
            self.bit_index >>= 1;
        }
        self.token_bits = self.token_bits.saturating_add(count);
        Some(accumulator)
    }
}
