//! spishim-linux-spi - Linux spidev support
//!
//! This crate provides the spidev backend for `spishim-core`, talking to
//! `/dev/spidevX.Y` through the `SPI_IOC_*` ioctls.
//!
//! # Overview
//!
//! The Linux SPI driver exposes SPI controllers through character devices
//! at `/dev/spidevX.Y` where X is the bus number and Y is the chip select.
//!
//! # Example
//!
//! ```no_run
//! use spishim_core::{SpiConfig, SpiMode, SpiSpeed};
//!
//! // Open with default settings (8 MHz, mode 0, 8 bits per word)
//! let mut spi = spishim_linux_spi::open("/dev/spidev0.0")?;
//! spi.close();
//!
//! // Or with custom settings
//! let config = SpiConfig::new()
//!     .with_speed(SpiSpeed::S1M)
//!     .with_mode(SpiMode::Mode3);
//! let mut spi = spishim_linux_spi::open_with_config("/dev/spidev0.0", &config)?;
//!
//! // Send a command byte, then read a two byte reply
//! let mut reply = [0u8; 2];
//! spi.transfer_full_duplex(&[0x9F], &mut reply)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with spidev support enabled (`CONFIG_SPI_SPIDEV`)
//! - Read/write access to `/dev/spidevX.Y` device
//! - May require adding user to `spi` group or using udev rules

pub mod device;
pub mod error;

// Re-exports
pub use device::{parse_device_string, parse_options, Spidev, SpidevOpener, SpidevOptions};
pub use error::OptionError;

use spishim_core::{SpiConfig, SpiDevice};

/// Open a spidev node with the default configuration
pub fn open(path: &str) -> spishim_core::Result<SpiDevice<Spidev>> {
    open_with_config(path, &SpiConfig::default())
}

/// Open a spidev node with the given configuration
pub fn open_with_config(path: &str, config: &SpiConfig) -> spishim_core::Result<SpiDevice<Spidev>> {
    SpiDevice::open_with(&SpidevOpener, path, config)
}

/// Open a spidev node described by a device string
///
/// This is a convenience function for the CLI.
///
/// # Example Strings
///
/// - `/dev/spidev0.0` - device path, default settings
/// - `dev=/dev/spidev0.0,spispeed=1000,mode=3` - speed in kHz, mode 0-3
pub fn open_device_string(
    s: &str,
) -> std::result::Result<SpiDevice<Spidev>, Box<dyn std::error::Error>> {
    let options = parse_device_string(s)?;
    let spi = open_with_config(&options.device, &options.config)?;
    Ok(spi)
}
