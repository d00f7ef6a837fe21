//! Self-describing header for standalone compressed files.
//!
//! ```text
//! bytes 0-3: magic "HSDS"
//! byte  4:   version (1)
//! byte  5:   window_sz2
//! byte  6:   lookahead_sz2
//! bytes 7..: raw LZSS stream
//! ```

use crate::config::CompressConfig;
use crate::error::CompressError;

pub const CONTAINER_MAGIC: [u8; 4] = *b"HSDS";
pub const CONTAINER_VERSION: u8 = 1;
pub const CONTAINER_HEADER_SIZE: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    pub window_sz2: u8,
    pub lookahead_sz2: u8,
}

impl ContainerHeader {
    #[must_use]
    pub const fn from_config(config: &CompressConfig) -> Self {
        Self {
            window_sz2: config.window_sz2,
            lookahead_sz2: config.lookahead_sz2,
        }
    }

    #[must_use]
    pub const fn to_bytes(&self) -> [u8; CONTAINER_HEADER_SIZE] {
        let m = CONTAINER_MAGIC;
        [
            m[0],
            m[1],
            m[2],
            m[3],
            CONTAINER_VERSION,
            self.window_sz2,
            self.lookahead_sz2,
        ]
    }

    /// # Errors
    /// [`CompressError::InvalidContainer`] for a short buffer, wrong magic or version,
    /// or window parameters the engine does not support.
    pub fn parse(data: &[u8]) -> Result<Self, CompressError> {
        if data.len() < CONTAINER_HEADER_SIZE
            || data[..4] != CONTAINER_MAGIC
            || data[4] != CONTAINER_VERSION
        {
            return Err(CompressError::InvalidContainer);
        }
        let header = Self {
            window_sz2: data[5],
            lookahead_sz2: data[6],
        };
        header.config()?;
        Ok(header)
    }

    /// Engine configuration matching this header, with the default staging size.
    pub fn config(&self) -> Result<CompressConfig, CompressError> {
        CompressConfig::new(
            self.window_sz2,
            self.lookahead_sz2,
            CompressConfig::DEFAULT.input_buffer_sz,
        )
        .map_err(|_| CompressError::InvalidContainer)
    }
}

#[cfg(feature = "std")]
mod io {
    use std::io::{ErrorKind, Read, Write};

    use super::{CONTAINER_HEADER_SIZE, ContainerHeader};
    use crate::Compress;
    use crate::config::CompressConfig;
    use crate::error::CompressError;

    /// Records the first I/O failure seen inside a callback.
    #[derive(Default)]
    struct IoFault(Option<ErrorKind>);

    impl IoFault {
        fn read_from<R: Read>(&mut self, reader: &mut R, buf: &mut [u8]) -> usize {
            loop {
                match reader.read(buf) {
                    Ok(n) => return n,
                    Err(e) if e.kind() == ErrorKind::Interrupted => {}
                    Err(e) => {
                        self.0.get_or_insert(e.kind());
                        return 0;
                    }
                }
            }
        }

        fn write_to<W: Write>(&mut self, writer: &mut W, buf: &[u8]) -> usize {
            match writer.write_all(buf) {
                Ok(()) => buf.len(),
                Err(e) => {
                    self.0.get_or_insert(e.kind());
                    0
                }
            }
        }

        /// An I/O failure takes precedence over the codec error it caused.
        fn resolve<T>(self, result: Result<T, CompressError>) -> Result<T, CompressError> {
            match self.0 {
                Some(kind) => Err(CompressError::Io(kind)),
                None => result,
            }
        }
    }

    /// Writes a container header followed by the compressed contents of `reader`.
    /// Returns the total number of bytes written.
    pub fn pack_file<R: Read, W: Write>(
        config: &CompressConfig,
        mut reader: R,
        mut writer: W,
    ) -> Result<usize, CompressError> {
        let header = ContainerHeader::from_config(config).to_bytes();
        writer
            .write_all(&header)
            .map_err(|e| CompressError::Io(e.kind()))?;

        let mut read_fault = IoFault::default();
        let mut write_fault = IoFault::default();
        let result = Compress::new(*config).encode_streamed(
            |buf: &mut [u8]| read_fault.read_from(&mut reader, buf),
            |buf: &[u8]| write_fault.write_to(&mut writer, buf),
        );
        let written = write_fault.resolve(read_fault.resolve(result))?;
        writer.flush().map_err(|e| CompressError::Io(e.kind()))?;
        Ok(CONTAINER_HEADER_SIZE + written)
    }

    /// Reads a container from `reader` and writes the decoded contents to `writer`.
    /// Returns the decoded length.
    pub fn unpack_file<R: Read, W: Write>(
        mut reader: R,
        mut writer: W,
    ) -> Result<usize, CompressError> {
        let mut header = [0u8; CONTAINER_HEADER_SIZE];
        reader.read_exact(&mut header).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => CompressError::InvalidContainer,
            kind => CompressError::Io(kind),
        })?;
        let config = ContainerHeader::parse(&header)?.config()?;

        let mut read_fault = IoFault::default();
        let mut write_fault = IoFault::default();
        let result = Compress::new(config).decode_streamed(
            |buf: &mut [u8]| read_fault.read_from(&mut reader, buf),
            |buf: &[u8]| write_fault.write_to(&mut writer, buf),
        );
        let decoded = write_fault.resolve(read_fault.resolve(result))?;
        writer.flush().map_err(|e| CompressError::Io(e.kind()))?;
        Ok(decoded)
    }
}

#[cfg(feature = "std")]
pub use io::{pack_file, unpack_file};
