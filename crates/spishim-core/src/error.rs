//! Error types for SPI device operations

use core::fmt;
use std::io;
use thiserror::Error;

/// Device parameter written by a control call during open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigParam {
    /// Clock polarity/phase mode byte
    Mode,
    /// Word width in bits
    BitsPerWord,
    /// Maximum clock speed in Hz
    Speed,
}

impl fmt::Display for ConfigParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigParam::Mode => "mode",
            ConfigParam::BitsPerWord => "bits",
            ConfigParam::Speed => "speed",
        };
        f.write_str(name)
    }
}

/// SPI device errors
#[derive(Debug, Error)]
pub enum Error {
    /// The device node could not be opened
    #[error("Failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A configuration control call was rejected by the driver
    #[error("Failed to set SPI {param} to {value}: {source}")]
    Config {
        param: ConfigParam,
        value: u32,
        #[source]
        source: io::Error,
    },

    /// Caller supplied an empty buffer or an out-of-range setting
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The batched SPI_IOC_MESSAGE call failed
    #[error("SPI transfer failed: {0}")]
    Transfer(#[source] io::Error),

    /// A plain write(2) failed or wrote an unexpected number of bytes
    #[error("SPI write failed: {0}")]
    Io(#[source] io::Error),

    /// The device has already been closed
    #[error("SPI device is closed")]
    Closed,
}

/// Discriminant of [`Error`], convenient for matching in callers and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Open,
    Config(ConfigParam),
    InvalidArgument,
    Transfer,
    Io,
    Closed,
}

impl Error {
    /// Get the kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Open { .. } => ErrorKind::Open,
            Error::Config { param, .. } => ErrorKind::Config(*param),
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Transfer(_) => ErrorKind::Transfer,
            Error::Io(_) => ErrorKind::Io,
            Error::Closed => ErrorKind::Closed,
        }
    }

    /// Raw OS error code reported by the kernel, if any
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Error::Open { source, .. } | Error::Config { source, .. } => source.raw_os_error(),
            Error::Transfer(e) | Error::Io(e) => e.raw_os_error(),
            Error::InvalidArgument(_) | Error::Closed => None,
        }
    }
}

/// Result type for SPI device operations
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    // Same value on every Linux architecture
    const EINVAL: i32 = 22;

    #[test]
    fn test_config_param_names() {
        assert_eq!(ConfigParam::Mode.to_string(), "mode");
        assert_eq!(ConfigParam::BitsPerWord.to_string(), "bits");
        assert_eq!(ConfigParam::Speed.to_string(), "speed");
    }

    #[test]
    fn test_error_message_and_kind() {
        let err = Error::Config {
            param: ConfigParam::Speed,
            value: 8_000_000,
            source: io::Error::from_raw_os_error(EINVAL),
        };
        assert_eq!(err.kind(), ErrorKind::Config(ConfigParam::Speed));
        assert_eq!(err.raw_os_error(), Some(EINVAL));
        assert!(err.to_string().starts_with("Failed to set SPI speed to 8000000"));
    }
}
