//! # LZSS Toolbox
//!
//! `lzss_toolbox` is a safe, pure-Rust LZSS codec with bounded memory, compatible with the
//! heatshrink bitstream, plus a flat-file dictionary of fixed-width hex keys.
//!
//! * [`Compress`] encodes whole buffers into self-describing frames (compressed, or a
//!   verbatim fallback that never grows the data by more than one byte) and decodes
//!   them back. It also streams raw LZSS through reader/writer callbacks.
//! * [`CompressIcon`] is a decode-only engine for small immutable assets.
//! * [`StreamDecoder`] pulls decoded bytes out of a compressed source on demand.
//! * [`KeysDict`] keeps a set of binary keys in a text file without ever loading it.
//!
//! ## Example
//!
//! ```rust
//! use lzss_toolbox::Compress;
//!
//! let mut compress = Compress::default();
//! let data = [b'A'; 32];
//!
//! let mut frame = [0u8; 64];
//! let size = compress.encode(&data, &mut frame)?;
//! assert_eq!(frame[0], 1, "runs compress");
//! assert!(size < data.len());
//!
//! let mut restored = [0u8; 32];
//! assert_eq!(compress.decode(&frame[..size], &mut restored)?, 32);
//! assert_eq!(restored, data);
//! # Ok::<(), lzss_toolbox::CompressError>(())
//! ```
//!
//! ## Features
//!
//! * `std` (default): file-backed dictionaries and the container file helpers. Without
//!   it the crate is `no_std` and only needs `alloc`.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

pub mod compress;
pub mod config;
pub mod container;
pub mod decoder;
pub mod decompress;
pub mod dict;
pub mod encoder;
pub mod error;
pub mod header;
pub mod icon;
pub mod stream;
pub mod stream_decoder;

pub use compress::Compress;
pub use config::CompressConfig;
pub use container::ContainerHeader;
#[cfg(feature = "std")]
pub use container::{pack_file, unpack_file};
pub use decoder::Decoder;
pub use dict::{DictMode, KeysDict};
pub use encoder::{Encoder, FinishStatus, PollStatus};
pub use error::{CompressError, DictError, StreamError};
pub use header::CompressHeader;
pub use icon::CompressIcon;
#[cfg(feature = "std")]
pub use stream::FileStream;
pub use stream::{MemoryStream, Stream, StreamOffset};
pub use stream_decoder::StreamDecoder;

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::{Compress, KeysDict, MemoryStream};

    #[test]
    fn test_round_trip() {
        let original = b"Hello world repeated Hello world repeated Hello world repeated";
        let mut compress = Compress::default();
        let mut frame = vec![0u8; original.len() + 1];
        let size = compress.encode(original, &mut frame).unwrap();
        assert!(size < original.len());

        let mut decoded = vec![0u8; original.len()];
        assert_eq!(compress.decode(&frame[..size], &mut decoded), Ok(original.len()));
        assert_eq!(&decoded[..], &original[..]);
    }

    #[test]
    fn test_incompressible_stays_verbatim() {
        // Distinct bytes leave nothing to match.
        let original: Vec<u8> = (0..200).map(|i| (i * 7) as u8).collect();
        let mut compress = Compress::default();
        let mut frame = vec![0u8; 201];
        assert_eq!(compress.encode(&original, &mut frame), Ok(201));
        assert_eq!(frame[0], 0);
        assert_eq!(&frame[1..], &original[..]);
    }

    #[test]
    fn test_dict_in_memory() {
        let mut dict = KeysDict::from_stream(MemoryStream::new(), 4).unwrap();
        dict.add_key(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        assert!(dict.is_key_present_str("deadbeef").unwrap());
        assert_eq!(dict.into_inner().into_inner(), b"DEADBEEF\n");
    }
}
