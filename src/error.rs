use thiserror::Error;

/// Failures of the block codec, the streaming paths and engine configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompressError {
    #[error("Input buffer is empty")]
    EmptyInput,

    #[error("Output buffer too small for the result")]
    OutputTooSmall,

    #[error("Input buffer too short for the declared frame")]
    InputTooShort,

    #[error("Invalid frame header flag {0:#04x}")]
    InvalidHeader(u8),

    #[error("Encoder state machine misuse")]
    Encoder,

    #[error("Decoder state machine misuse")]
    Decoder,

    #[error("Unexpected end of compressed stream")]
    UnexpectedEof,

    #[error("Short write: {written} of {requested} bytes accepted")]
    ShortWrite { requested: usize, written: usize },

    #[error("Invalid window/lookahead configuration")]
    InvalidConfig,

    #[error("Invalid container header")]
    InvalidContainer,

    #[cfg(feature = "std")]
    #[error("I/O error: {0}")]
    Io(std::io::ErrorKind),
}

/// Failures of the storage capability behind a dictionary.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Seek outside of stream bounds")]
    SeekOutOfBounds,

    #[error("Stream ended before the requested bytes were read")]
    UnexpectedEof,

    #[error("Stream accepted zero bytes")]
    WriteZero,

    #[cfg(feature = "std")]
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the flat-file key dictionary.
#[derive(Error, Debug)]
pub enum DictError {
    #[error("Dictionary file does not exist")]
    NotFound,

    #[error("Key size {0} is outside 1..=8 bytes")]
    InvalidKeySize(usize),

    #[error("Key size mismatch: dictionary holds {expected}-byte keys, got {actual}")]
    KeySizeMismatch { expected: usize, actual: usize },

    #[error("Key is not a valid hex string of the dictionary width")]
    InvalidKey,

    #[error(transparent)]
    Stream(#[from] StreamError),
}
