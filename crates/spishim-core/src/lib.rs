//! spishim-core - SPI device lifecycle and transfer layer
//!
//! This crate maps the logical operations on an SPI peripheral (open,
//! exchange bytes, close) onto the primitives a character-device backend
//! offers: three configuration control calls, a batched multi-message
//! transfer and a plain write.
//!
//! Backends implement [`SpiOpener`] and [`SpiBus`]. The Linux spidev backend
//! lives in `spishim-linux-spi`, an in-memory emulator in `spishim-dummy`.
//!
//! # Example
//!
//! ```ignore
//! use spishim_core::{SpiConfig, SpiDevice, SpiSpeed};
//! use spishim_linux_spi::SpidevOpener;
//!
//! let config = SpiConfig::new().with_speed(SpiSpeed::S1M);
//! let mut dev = SpiDevice::open_with(&SpidevOpener, "/dev/spidev0.0", &config)?;
//!
//! // Read a register: send the address, then clock in one byte
//! let mut value = [0u8; 1];
//! dev.transfer_full_duplex(&[0x80 | 0x0F], &mut value)?;
//!
//! dev.close();
//! ```

pub mod bus;
pub mod config;
pub mod device;
pub mod error;

// Re-exports
pub use bus::{Segment, SpiBus, SpiOpener};
pub use config::{ModeFlags, SpiConfig, SpiMode, SpiSpeed};
pub use device::SpiDevice;
pub use error::{ConfigParam, Error, ErrorKind, Result};
