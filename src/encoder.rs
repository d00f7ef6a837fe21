//! Incremental LZSS encoder (heatshrink bitstream).
//!
//! The encoder owns a buffer of `2 * window` bytes: the lower half holds the backlog
//! already emitted (searched for back-references), the upper half the input still
//! being scanned. Input is pushed with [`Encoder::sink`], output drained with
//! [`Encoder::poll`], and [`Encoder::finish`] marks the end of the stream.

use alloc::vec;
use alloc::vec::Vec;

use crate::config::CompressConfig;
use crate::error::CompressError;

/// Tag bit announcing a literal byte.
const LITERAL_MARKER: u8 = 0x01;

/// Tag bit announcing a back-reference.
const BACKREF_MARKER: u8 = 0x00;

/// End of a byte chain in the match index.
const NO_POSITION: u32 = u32::MAX;

/// Result of draining a state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// Nothing more can be produced until more input is sunk (or the stream is done).
    Empty,
    /// The output buffer filled up while output is still pending.
    More,
}

/// Result of signalling end of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishStatus {
    Done,
    /// Pending output remains; keep polling.
    More,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NotFull,
    Filled,
    Search,
    YieldTagBit,
    YieldLiteral,
    YieldBackrefIndex,
    YieldBackrefLength,
    SaveBacklog,
    FlushBits,
    Done,
}

/// Output slice plus the number of bytes written into it so far.
pub(crate) struct OutputCursor<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> OutputCursor<'a> {
    pub(crate) fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, len: 0 }
    }

    #[inline]
    pub(crate) fn can_take_byte(&self) -> bool {
        self.len < self.buf.len()
    }

    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.len
    }

    #[inline]
    pub(crate) fn push(&mut self, byte: u8) {
        self.buf[self.len] = byte;
        self.len += 1;
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }
}

/// Streaming LZSS encoder with a fixed window and lookahead.
pub struct Encoder {
    window_sz2: u8,
    lookahead_sz2: u8,
    buffer: Vec<u8>,
    // Previous position holding the same byte value, per buffer position.
    index: Vec<u32>,
    input_size: usize,
    match_scan_index: usize,
    match_length: usize,
    match_pos: usize,
    outgoing_bits: u16,
    outgoing_bits_count: u8,
    finishing: bool,
    state: State,
    current_byte: u8,
    bit_index: u8,
}

impl Encoder {
    #[must_use]
    pub fn new(config: &CompressConfig) -> Self {
        let buf_sz = 2 * config.window_size();
        Self {
            window_sz2: config.window_sz2,
            lookahead_sz2: config.lookahead_sz2,
            buffer: vec![0; buf_sz],
            index: vec![NO_POSITION; buf_sz],
            input_size: 0,
            match_scan_index: 0,
            match_length: 0,
            match_pos: 0,
            outgoing_bits: 0,
            outgoing_bits_count: 0,
            finishing: false,
            state: State::NotFull,
            current_byte: 0,
            bit_index: 0x80,
        }
    }

    /// Returns the encoder to its freshly allocated state, clearing the backlog.
    pub fn reset(&mut self) {
        self.buffer.fill(0);
        self.input_size = 0;
        self.match_scan_index = 0;
        self.match_length = 0;
        self.match_pos = 0;
        self.outgoing_bits = 0;
        self.outgoing_bits_count = 0;
        self.finishing = false;
        self.state = State::NotFull;
        self.current_byte = 0;
        self.bit_index = 0x80;
    }

    /// Copies as much of `data` as fits into the input half of the buffer.
    ///
    /// # Errors
    /// [`CompressError::Encoder`] after [`Encoder::finish`] was called, or while the
    /// previous input has not been fully drained with [`Encoder::poll`].
    pub fn sink(&mut self, data: &[u8]) -> Result<usize, CompressError> {
        if self.finishing || self.state != State::NotFull {
            return Err(CompressError::Encoder);
        }

        let ibs = self.input_buffer_size();
        let write_offset = ibs + self.input_size;
        let rem = ibs - self.input_size;
        let cp_sz = rem.min(data.len());

        self.buffer[write_offset..write_offset + cp_sz].copy_from_slice(&data[..cp_sz]);
        self.input_size += cp_sz;

        if cp_sz == rem {
            self.state = State::Filled;
        }
        Ok(cp_sz)
    }

    /// Drains encoded bytes into `out`, returning the status and the byte count written.
    ///
    /// An empty `out` is allowed; the status then tells whether output is pending.
    pub fn poll(&mut self, out: &mut [u8]) -> Result<(PollStatus, usize), CompressError> {
        let mut oi = OutputCursor::new(out);

        loop {
            let in_state = self.state;
            match in_state {
                State::NotFull | State::Done => return Ok((PollStatus::Empty, oi.len())),
                State::Filled => {
                    self.do_indexing();
                    self.state = State::Search;
                }
                State::Search => self.state = self.step_search(),
                State::YieldTagBit => self.state = self.yield_tag_bit(&mut oi),
                State::YieldLiteral => self.state = self.yield_literal(&mut oi),
                State::YieldBackrefIndex => self.state = self.yield_backref_index(&mut oi),
                State::YieldBackrefLength => self.state = self.yield_backref_length(&mut oi),
                State::SaveBacklog => {
                    self.save_backlog();
                    self.state = State::NotFull;
                }
                State::FlushBits => {
                    self.state = self.flush_bit_buffer(&mut oi);
                    if self.state == State::Done {
                        return Ok((PollStatus::Empty, oi.len()));
                    }
                }
            }

            if self.state == in_state && !oi.can_take_byte() {
                return Ok((PollStatus::More, oi.len()));
            }
        }
    }

    /// Marks the end of input. Keep polling until this reports [`FinishStatus::Done`].
    pub fn finish(&mut self) -> FinishStatus {
        self.finishing = true;
        if self.state == State::NotFull {
            self.state = State::Filled;
        }
        if self.state == State::Done {
            FinishStatus::Done
        } else {
            FinishStatus::More
        }
    }

    #[inline]
    const fn input_buffer_size(&self) -> usize {
        1 << self.window_sz2
    }

    #[inline]
    const fn lookahead_size(&self) -> usize {
        1 << self.lookahead_sz2
    }

    /// Chains every position of the live buffer to the previous occurrence of its byte.
    fn do_indexing(&mut self) {
        let mut last = [NO_POSITION; 256];
        let end = self.input_buffer_size() + self.input_size;
        for i in 0..end {
            let v = self.buffer[i] as usize;
            self.index[i] = last[v];
            last[v] = i as u32;
        }
    }

    fn step_search(&mut self) -> State {
        let window_length = self.input_buffer_size();
        let lookahead_sz = self.lookahead_size();
        let msi = self.match_scan_index;

        let reserve = if self.finishing { 1 } else { lookahead_sz };
        if msi as isize > self.input_size as isize - reserve as isize {
            // Scan window exhausted: either wait for more input or flush.
            return if self.finishing {
                State::FlushBits
            } else {
                State::SaveBacklog
            };
        }

        let end = window_length + msi;
        let start = end - window_length;
        let max_possible = lookahead_sz.min(self.input_size - msi);

        match self.find_longest_match(start, end, max_possible) {
            Some((distance, length)) => {
                self.match_pos = distance;
                self.match_length = length;
            }
            None => {
                self.match_scan_index += 1;
                self.match_length = 0;
            }
        }
        State::YieldTagBit
    }

    /// Longest match for `buffer[end..end + maxlen]` starting in `start..end`, as
    /// `(distance, length)`. Only matches that beat a literal are reported.
    fn find_longest_match(&self, start: usize, end: usize, maxlen: usize) -> Option<(usize, usize)> {
        let buf = &self.buffer;
        let mut match_maxlen = 0;
        let mut match_index = 0;

        let mut pos = self.index[end];
        while pos != NO_POSITION && pos as usize >= start {
            let candidate = pos as usize;
            pos = self.index[candidate];

            // Cannot beat the current best unless this byte agrees.
            if buf[candidate + match_maxlen] != buf[end + match_maxlen] {
                continue;
            }

            let mut len = 1;
            while len < maxlen && buf[candidate + len] == buf[end + len] {
                len += 1;
            }

            if len > match_maxlen {
                match_maxlen = len;
                match_index = candidate;
                if len == maxlen {
                    break;
                }
            }
        }

        let break_even_point = 1 + self.window_sz2 as usize + self.lookahead_sz2 as usize;
        if match_maxlen > break_even_point / 8 {
            Some((end - match_index, match_maxlen))
        } else {
            None
        }
    }

    fn yield_tag_bit(&mut self, oi: &mut OutputCursor<'_>) -> State {
        if !oi.can_take_byte() {
            return State::YieldTagBit;
        }
        if self.match_length == 0 {
            self.push_bits(1, LITERAL_MARKER, oi);
            State::YieldLiteral
        } else {
            self.push_bits(1, BACKREF_MARKER, oi);
            self.outgoing_bits = (self.match_pos - 1) as u16;
            self.outgoing_bits_count = self.window_sz2;
            State::YieldBackrefIndex
        }
    }

    fn yield_literal(&mut self, oi: &mut OutputCursor<'_>) -> State {
        if !oi.can_take_byte() {
            return State::YieldLiteral;
        }
        let processed_offset = self.match_scan_index - 1;
        let c = self.buffer[self.input_buffer_size() + processed_offset];
        self.push_bits(8, c, oi);
        State::Search
    }

    fn yield_backref_index(&mut self, oi: &mut OutputCursor<'_>) -> State {
        if !oi.can_take_byte() {
            return State::YieldBackrefIndex;
        }
        if self.push_outgoing_bits(oi) > 0 {
            State::YieldBackrefIndex
        } else {
            self.outgoing_bits = (self.match_length - 1) as u16;
            self.outgoing_bits_count = self.lookahead_sz2;
            State::YieldBackrefLength
        }
    }

    fn yield_backref_length(&mut self, oi: &mut OutputCursor<'_>) -> State {
        if !oi.can_take_byte() {
            return State::YieldBackrefLength;
        }
        if self.push_outgoing_bits(oi) > 0 {
            State::YieldBackrefLength
        } else {
            self.match_scan_index += self.match_length;
            self.match_length = 0;
            State::Search
        }
    }

    fn flush_bit_buffer(&mut self, oi: &mut OutputCursor<'_>) -> State {
        if self.bit_index == 0x80 {
            State::Done
        } else if oi.can_take_byte() {
            oi.push(self.current_byte);
            State::Done
        } else {
            State::FlushBits
        }
    }

    /// Moves the scanned input down into the backlog half.
    fn save_backlog(&mut self) {
        let input_buf_sz = self.input_buffer_size();
        let rem = input_buf_sz - self.match_scan_index;
        let shift_sz = input_buf_sz + rem;

        self.buffer
            .copy_within(input_buf_sz - rem..input_buf_sz - rem + shift_sz, 0);

        self.match_scan_index = 0;
        self.input_size -= input_buf_sz - rem;
    }

    /// Pushes up to 8 of the pending index/length bits, most significant first.
    fn push_outgoing_bits(&mut self, oi: &mut OutputCursor<'_>) -> u8 {
        let (count, bits) = if self.outgoing_bits_count > 8 {
            (8, (self.outgoing_bits >> (self.outgoing_bits_count - 8)) as u8)
        } else {
            (self.outgoing_bits_count, self.outgoing_bits as u8)
        };

        if count > 0 {
            self.push_bits(count, bits, oi);
            self.outgoing_bits_count -= count;
        }
        count
    }

    /// Appends the low `count` bits of `bits` (max 8). The caller guarantees room
    /// for one output byte.
    fn push_bits(&mut self, count: u8, bits: u8, oi: &mut OutputCursor<'_>) {
        if count == 8 && self.bit_index == 0x80 {
            oi.push(bits);
            return;
        }
        for i in (0..count).rev() {
            if bits & (1 << i) != 0 {
                self.current_byte |= self.bit_index;
            }
            self.bit_index >>= 1;
            if self.bit_index == 0 {
                self.bit_index = 0x80;
                oi.push(self.current_byte);
                self.current_byte = 0;
            }
        }
    }
}
