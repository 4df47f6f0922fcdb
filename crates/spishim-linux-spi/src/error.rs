//! Error types for spidev option parsing

use thiserror::Error;

/// Errors from parsing `key=value` device options
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OptionError {
    /// Device not specified
    #[error("No device specified. Use dev=/dev/spidevX.Y")]
    NoDevice,

    /// Option value could not be parsed or is out of range
    #[error("Invalid {key} value: {value} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },

    /// Option not in `key=value` form
    #[error("Invalid option format: '{0}' (expected key=value)")]
    Malformed(String),
}
