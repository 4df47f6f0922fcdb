//! SPI device handle
//!
//! [`SpiDevice`] owns an opened backend handle and maps the caller's logical
//! operations onto the backend's transfer primitives.

use crate::bus::{Segment, SpiBus, SpiOpener};
use crate::config::SpiConfig;
use crate::error::{ConfigParam, Error, Result};
use std::io;

/// An SPI device opened with a fixed configuration
///
/// The device is either open or closed. Once closed every I/O operation
/// returns [`Error::Closed`]; there is no re-open. Dropping an open device
/// closes it.
pub struct SpiDevice<B: SpiBus> {
    bus: Option<B>,
    config: SpiConfig,
    path: String,
}

impl<B: SpiBus> SpiDevice<B> {
    /// Open `path` through `opener` and apply `config`
    ///
    /// Mode, bits per word and speed are written in that order. If any of
    /// them is rejected the node is closed again before the error is
    /// returned.
    pub fn open_with<O>(opener: &O, path: &str, config: &SpiConfig) -> Result<Self>
    where
        O: SpiOpener<Bus = B>,
    {
        config.validate()?;

        log::debug!("spi: Opening device {}", path);

        let mut bus = opener.open(path).map_err(|e| Error::Open {
            path: path.to_string(),
            source: e,
        })?;

        if let Err(e) = configure(&mut bus, config) {
            if let Err(close_err) = bus.release() {
                log::warn!("spi: Failed to close {} after error: {}", path, close_err);
            }
            return Err(e);
        }

        log::info!(
            "spi: Opened {} (mode={}, bits={}, speed={} kHz)",
            path,
            config.mode.number(),
            config.bits_per_word,
            config.speed_hz / 1000
        );

        Ok(Self {
            bus: Some(bus),
            config: config.clone(),
            path: path.to_string(),
        })
    }

    /// Write `send`, then read `recv.len()` bytes into `recv`
    ///
    /// Both phases run as one two-message transaction, so chip select stays
    /// asserted between them. Nothing meaningful is transmitted while
    /// reading.
    pub fn transfer_full_duplex(&mut self, send: &[u8], recv: &mut [u8]) -> Result<()> {
        if send.is_empty() {
            return Err(Error::InvalidArgument("send buffer is empty"));
        }
        if recv.is_empty() {
            return Err(Error::InvalidArgument("receive buffer is empty"));
        }

        let bus = self.bus_mut()?;
        log::trace!(
            "spi: write {} bytes then read {} bytes",
            send.len(),
            recv.len()
        );

        let mut segments = [Segment::write(send), Segment::read(recv)];
        bus.transfer(&mut segments).map_err(transfer_error)
    }

    /// Clock out `send` in a single message, discarding the bytes clocked in
    pub fn transfer_half_duplex(&mut self, send: &[u8]) -> Result<()> {
        if send.is_empty() {
            return Err(Error::InvalidArgument("send buffer is empty"));
        }

        let bus = self.bus_mut()?;
        log::trace!("spi: exchange {} bytes", send.len());

        let mut scratch = vec![0u8; send.len()];
        let mut segments = [Segment::exchange(send, &mut scratch)?];
        bus.transfer(&mut segments).map_err(transfer_error)
    }

    /// Write a single byte with a plain write call
    ///
    /// Returns the number of bytes written, which is always 1 on success.
    pub fn write_byte(&mut self, value: u8) -> Result<usize> {
        let bus = self.bus_mut()?;
        match bus.write(&[value]) {
            Ok(1) => Ok(1),
            Ok(n) => Err(Error::Io(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("wrote {} bytes, expected 1", n),
            ))),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Close the device
    ///
    /// Closing an already closed device does nothing. Errors from the
    /// underlying close are logged and otherwise ignored.
    pub fn close(&mut self) {
        match self.bus.take() {
            Some(bus) => {
                log::debug!("spi: Closing {}", self.path);
                if let Err(e) = bus.release() {
                    log::warn!("spi: Failed to close {}: {}", self.path, e);
                }
            }
            None => log::debug!("spi: {} already closed", self.path),
        }
    }

    /// Whether the device is still open
    pub fn is_open(&self) -> bool {
        self.bus.is_some()
    }

    /// Configuration applied at open time
    pub fn config(&self) -> &SpiConfig {
        &self.config
    }

    /// Path the device was opened from
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Largest single transaction the backend accepts, if open
    pub fn max_transfer_len(&self) -> Option<usize> {
        self.bus.as_ref().map(SpiBus::max_transfer_len)
    }

    fn bus_mut(&mut self) -> Result<&mut B> {
        self.bus.as_mut().ok_or(Error::Closed)
    }
}

impl<B: SpiBus> Drop for SpiDevice<B> {
    fn drop(&mut self) {
        if self.bus.is_some() {
            self.close();
        }
    }
}

impl<B: SpiBus> core::fmt::Debug for SpiDevice<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpiDevice")
            .field("path", &self.path)
            .field("config", &self.config)
            .field("open", &self.is_open())
            .finish()
    }
}

fn configure<B: SpiBus>(bus: &mut B, config: &SpiConfig) -> Result<()> {
    let mode = config.mode.flags();
    bus.set_mode(mode).map_err(|e| Error::Config {
        param: ConfigParam::Mode,
        value: mode.bits() as u32,
        source: e,
    })?;

    bus.set_bits_per_word(config.bits_per_word)
        .map_err(|e| Error::Config {
            param: ConfigParam::BitsPerWord,
            value: config.bits_per_word as u32,
            source: e,
        })?;

    bus.set_max_speed_hz(config.speed_hz)
        .map_err(|e| Error::Config {
            param: ConfigParam::Speed,
            value: config.speed_hz,
            source: e,
        })?;

    Ok(())
}

fn transfer_error(e: io::Error) -> Error {
    log::error!("spi: SPI_IOC_MESSAGE failed: {}", e);
    Error::Transfer(e)
}
