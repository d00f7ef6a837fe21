//! Flat-file dictionary of fixed-width binary keys.
//!
//! Keys live one per line as uppercase big-endian hex. A record is exactly
//! `key_size * 2` hex digits followed by `\n`; comment lines (`#`), blank lines and
//! anything else, including `\r\n` terminated lines, are skipped by every operation.
//!
//! The dictionary never loads the file: lookups and iteration read one line at a time,
//! additions append at the end and deletions splice the line out in place.

use alloc::string::String;
use alloc::vec::Vec;

use log::{debug, trace};

use crate::error::DictError;
use crate::stream::{Stream, StreamOffset};

type Result<T> = core::result::Result<T, DictError>;

/// Widest key the dictionary stores, in bytes.
pub const MAX_KEY_SIZE: usize = 8;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// How [`KeysDict::open`] treats a missing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictMode {
    /// Fail with [`DictError::NotFound`].
    OpenExisting,
    /// Create an empty dictionary.
    OpenAlways,
}

pub struct KeysDict<S> {
    stream: S,
    key_size: usize,
    key_size_symbols: usize,
    total_keys: usize,
    line: Vec<u8>,
}

impl<S: Stream> KeysDict<S> {
    /// Takes ownership of `stream`, appends a final line feed when one is missing and
    /// counts the valid records. The cursor is left at the first line.
    ///
    /// # Errors
    /// [`DictError::InvalidKeySize`] for a `key_size` outside `1..=8`, or any stream failure.
    pub fn from_stream(stream: S, key_size: usize) -> Result<Self> {
        check_key_size(key_size)?;
        let mut dict = Self {
            stream,
            key_size,
            key_size_symbols: key_size * 2 + 1,
            total_keys: 0,
            line: Vec::with_capacity(key_size * 2 + 1),
        };
        dict.repair_ending()?;
        dict.total_keys = dict.count_keys()?;
        dict.stream.rewind()?;
        debug!("Loaded dictionary with {} keys", dict.total_keys);
        Ok(dict)
    }

    /// Number of valid records, maintained by [`KeysDict::add_key`] and
    /// [`KeysDict::delete_key`]. Edits made to the file behind the dictionary's back
    /// are not seen until it is reopened.
    #[must_use]
    pub const fn total_keys(&self) -> usize {
        self.total_keys
    }

    #[must_use]
    pub const fn key_size(&self) -> usize {
        self.key_size
    }

    /// Restarts iteration at the first line.
    pub fn rewind(&mut self) -> Result<()> {
        Ok(self.stream.rewind()?)
    }

    /// Scans the whole dictionary for `key`. The iteration cursor is left where it was.
    pub fn is_key_present(&mut self, key: &[u8]) -> Result<bool> {
        self.check_key(key)?;
        let pos = self.stream.tell()?;
        let found = self.find_key(key);
        self.stream.seek(pos as i64, StreamOffset::FromStart)?;
        found
    }

    pub fn is_key_present_str(&mut self, key: &str) -> Result<bool> {
        let (bytes, len) = self.parse_key_str(key)?;
        self.is_key_present(&bytes[..len])
    }

    /// Decodes the next valid record after the cursor into `key`.
    /// Returns `false` at the end of the file; call [`KeysDict::rewind`] to start over.
    pub fn get_next_key(&mut self, key: &mut [u8]) -> Result<bool> {
        self.check_key(key)?;
        if !self.next_record()? {
            return Ok(false);
        }
        let symbols = record_symbols(&self.line);
        Ok(decode_hex(symbols, key))
    }

    /// String flavour of [`KeysDict::get_next_key`]; `key` receives the uppercase hex text.
    pub fn get_next_key_str(&mut self, key: &mut String) -> Result<bool> {
        let mut bytes = [0u8; MAX_KEY_SIZE];
        let found = self.get_next_key(&mut bytes[..self.key_size])?;
        key.clear();
        if found {
            for &b in &bytes[..self.key_size] {
                key.push(char::from(HEX_DIGITS[usize::from(b >> 4)]));
                key.push(char::from(HEX_DIGITS[usize::from(b & 0x0F)]));
            }
        }
        Ok(found)
    }

    /// Appends `key` as a new last line. The iteration cursor is left where it was,
    /// so a key added mid-iteration is still visited. The count only changes once the
    /// line is written.
    pub fn add_key(&mut self, key: &[u8]) -> Result<()> {
        self.check_key(key)?;
        let mut record = Vec::with_capacity(self.key_size_symbols);
        encode_hex(key, &mut record);
        record.push(b'\n');

        let pos = self.stream.tell()?;
        let written = self
            .stream
            .seek(0, StreamOffset::FromEnd)
            .and_then(|_| self.stream.write_all(&record));
        self.stream.seek(pos as i64, StreamOffset::FromStart)?;
        written?;

        self.total_keys += 1;
        Ok(())
    }

    pub fn add_key_str(&mut self, key: &str) -> Result<()> {
        let (bytes, len) = self.parse_key_str(key)?;
        self.add_key(&bytes[..len])
    }

    /// Removes the first record holding `key` and rewinds. Returns `false`, without
    /// touching the file, when the key is absent.
    pub fn delete_key(&mut self, key: &[u8]) -> Result<bool> {
        self.check_key(key)?;
        if !self.find_key(key)? {
            self.stream.rewind()?;
            return Ok(false);
        }

        self.stream
            .seek(-(self.key_size_symbols as i64), StreamOffset::FromCurrent)?;
        self.stream.delete(self.key_size_symbols)?;
        self.total_keys -= 1;
        self.stream.rewind()?;
        Ok(true)
    }

    pub fn delete_key_str(&mut self, key: &str) -> Result<bool> {
        let (bytes, len) = self.parse_key_str(key)?;
        self.delete_key(&bytes[..len])
    }

    /// Closes the dictionary and hands the stream back.
    #[must_use]
    pub fn into_inner(self) -> S {
        self.stream
    }

    fn repair_ending(&mut self) -> Result<()> {
        if self.stream.size()? == 0 {
            return Ok(());
        }
        let mut last = [0u8; 1];
        self.stream.seek(-1, StreamOffset::FromEnd)?;
        self.stream.read_exact(&mut last)?;
        if last[0] != b'\n' {
            self.stream.write_all(b"\n")?;
            debug!("Added new line to the end of the dictionary");
        }
        Ok(())
    }

    fn count_keys(&mut self) -> Result<usize> {
        self.stream.rewind()?;
        let mut count = 0;
        while self.next_record()? {
            count += 1;
        }
        Ok(count)
    }

    /// Rewinds and stops right after the first record equal to `key`.
    fn find_key(&mut self, key: &[u8]) -> Result<bool> {
        self.stream.rewind()?;
        let mut buf = [0u8; MAX_KEY_SIZE];
        while self.next_record()? {
            let candidate = &mut buf[..self.key_size];
            if decode_hex(record_symbols(&self.line), candidate) && candidate == key {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Advances past the next valid record, leaving it in `self.line`.
    fn next_record(&mut self) -> Result<bool> {
        // Longer lines come back cut short and fail the length check.
        let max = self.key_size_symbols;
        while let Some(line_len) = self.stream.read_line(&mut self.line, max)? {
            if line_len == self.key_size_symbols && self.is_record() {
                return Ok(true);
            }
            trace!("Skipped {line_len} byte line");
        }
        Ok(false)
    }

    /// Exactly `key_size * 2` symbols and a line feed. Symbols must also be hex
    /// digits, which rules out `#` comments of record width.
    fn is_record(&self) -> bool {
        match self.line.split_last() {
            Some((b'\n', symbols)) => {
                symbols.len() == self.key_size_symbols - 1
                    && symbols.iter().all(u8::is_ascii_hexdigit)
            }
            _ => false,
        }
    }

    fn check_key(&self, key: &[u8]) -> Result<()> {
        if key.len() == self.key_size {
            Ok(())
        } else {
            Err(DictError::KeySizeMismatch {
                expected: self.key_size,
                actual: key.len(),
            })
        }
    }

    fn parse_key_str(&self, key: &str) -> Result<([u8; MAX_KEY_SIZE], usize)> {
        let text = key.as_bytes();
        if text.len() % 2 != 0 || !text.iter().all(u8::is_ascii_hexdigit) {
            return Err(DictError::InvalidKey);
        }
        let len = text.len() / 2;
        if len != self.key_size {
            return Err(DictError::KeySizeMismatch {
                expected: self.key_size,
                actual: len,
            });
        }
        let mut bytes = [0u8; MAX_KEY_SIZE];
        if !decode_hex(text, &mut bytes[..len]) {
            return Err(DictError::InvalidKey);
        }
        Ok((bytes, len))
    }
}

#[cfg(feature = "std")]
mod file {
    use std::path::Path;

    use super::{DictMode, KeysDict, Result, check_key_size};
    use crate::error::DictError;
    use crate::stream::FileStream;

    impl KeysDict<FileStream> {
        /// Opens the dictionary file at `path`.
        ///
        /// # Errors
        /// [`DictError::NotFound`] for a missing file in [`DictMode::OpenExisting`],
        /// plus everything [`KeysDict::from_stream`] reports.
        pub fn open(path: impl AsRef<Path>, mode: DictMode, key_size: usize) -> Result<Self> {
            check_key_size(key_size)?;
            let path = path.as_ref();
            if mode == DictMode::OpenExisting && !path.is_file() {
                return Err(DictError::NotFound);
            }
            let stream = FileStream::open(path, mode == DictMode::OpenAlways)?;
            Self::from_stream(stream, key_size)
        }

        /// `true` when a dictionary file exists at `path`.
        #[must_use]
        pub fn check_presence(path: impl AsRef<Path>) -> bool {
            path.as_ref().is_file()
        }
    }
}

fn check_key_size(key_size: usize) -> Result<()> {
    if (1..=MAX_KEY_SIZE).contains(&key_size) {
        Ok(())
    } else {
        Err(DictError::InvalidKeySize(key_size))
    }
}

/// The record without its line feed.
fn record_symbols(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\n").unwrap_or(line)
}

fn encode_hex(key: &[u8], out: &mut Vec<u8>) {
    for &b in key {
        out.push(HEX_DIGITS[usize::from(b >> 4)]);
        out.push(HEX_DIGITS[usize::from(b & 0x0F)]);
    }
}

const fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Decodes `text` into `out`; `false` unless it is exactly `out.len() * 2` hex digits.
fn decode_hex(text: &[u8], out: &mut [u8]) -> bool {
    if text.len() != out.len() * 2 {
        return false;
    }
    for (byte, pair) in out.iter_mut().zip(text.chunks_exact(2)) {
        match (hex_value(pair[0]), hex_value(pair[1])) {
            (Some(hi), Some(lo)) => *byte = (hi << 4) | lo,
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemoryStream;

    fn dict(text: &str, key_size: usize) -> KeysDict<MemoryStream> {
        KeysDict::from_stream(MemoryStream::from(text.as_bytes()), key_size).unwrap()
    }

    #[test]
    fn hex_helpers() {
        let mut text = Vec::new();
        encode_hex(&[0x00, 0xAB, 0x7F], &mut text);
        assert_eq!(text, b"00AB7F");

        let mut out = [0u8; 3];
        assert!(decode_hex(b"00ab7F", &mut out));
        assert_eq!(out, [0x00, 0xAB, 0x7F]);
        assert!(!decode_hex(b"00AB7G", &mut out));
        assert!(!decode_hex(b"00AB", &mut out));
    }

    #[test]
    fn counts_only_valid_records() {
        let d = dict(
            "# header\nA0A1A2A3A4A5\n\nnot a key!!!\nB0B1B2B3B4\nC0C1C2C3C4C5\r\nD0D1D2D3D4D5\n",
            6,
        );
        assert_eq!(d.total_keys(), 2);
    }

    #[test]
    fn crlf_lines_are_not_records() {
        let mut d = dict("0001\r\n0002\n", 2);
        assert_eq!(d.total_keys(), 1);
        assert!(!d.is_key_present(&[0, 1]).unwrap());
        assert!(!d.delete_key(&[0, 1]).unwrap());

        let mut key = [0u8; 2];
        assert!(d.get_next_key(&mut key).unwrap());
        assert_eq!(key, [0, 2]);
        assert!(!d.get_next_key(&mut key).unwrap());
    }

    #[test]
    fn non_hex_lines_are_skipped() {
        let d = dict("ZZZZ\n#000\n0001\n", 2);
        assert_eq!(d.total_keys(), 1);
    }

    #[test]
    fn repairs_missing_final_newline() {
        let mut d = dict("A0A1A2A3A4A5", 6);
        assert_eq!(d.total_keys(), 1);
        d.add_key(&[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(d.into_inner().as_slice(), b"A0A1A2A3A4A5\n010203040506\n");
    }

    #[test]
    fn presence_check_keeps_iteration_position() {
        let mut d = dict("0001\n0002\n0003\n", 2);
        let mut key = [0u8; 2];
        assert!(d.get_next_key(&mut key).unwrap());
        assert_eq!(key, [0, 1]);

        assert!(d.is_key_present(&[0, 3]).unwrap());
        assert!(!d.is_key_present(&[0, 4]).unwrap());
        assert!(d.is_key_present_str("0002").unwrap());

        assert!(d.get_next_key(&mut key).unwrap());
        assert_eq!(key, [0, 2]);
    }

    #[test]
    fn delete_splices_whole_line() {
        let mut d = dict("00AA\n# note\n00BB\n00CC\n", 2);
        assert!(d.delete_key_str("00aa").unwrap());
        assert!(!d.delete_key(&[0xDE, 0xAD]).unwrap());
        assert_eq!(d.total_keys(), 2);
        assert_eq!(d.into_inner().as_slice(), b"# note\n00BB\n00CC\n");
    }

    #[test]
    fn next_key_as_string() {
        let mut d = dict("0a0b\n", 2);
        let mut key = String::new();
        assert!(d.get_next_key_str(&mut key).unwrap());
        assert_eq!(key, "0A0B");
        assert!(!d.get_next_key_str(&mut key).unwrap());
        assert!(key.is_empty());
    }

    #[test]
    fn rejects_bad_keys() {
        let mut d = dict("", 4);
        assert!(matches!(
            d.add_key(&[1, 2]),
            Err(DictError::KeySizeMismatch { expected: 4, actual: 2 })
        ));
        assert!(matches!(d.add_key_str("0102030"), Err(DictError::InvalidKey)));
        assert!(matches!(d.add_key_str("0102030Z"), Err(DictError::InvalidKey)));
        assert!(matches!(
            KeysDict::from_stream(MemoryStream::new(), 9),
            Err(DictError::InvalidKeySize(9))
        ));
        assert_eq!(d.total_keys(), 0);
    }
}
