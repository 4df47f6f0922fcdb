//! Backend traits
//!
//! A backend provides the raw primitives a [`SpiDevice`](crate::SpiDevice)
//! is built on: opening a node, the three configuration control calls, a
//! batched multi-message transfer and a plain write. The Linux spidev
//! backend issues ioctls; the dummy backend emulates them in memory.

use crate::config::ModeFlags;
use crate::error::{Error, Result};
use std::io;

/// One message of a batched SPI transfer
///
/// A segment transmits, receives, or both. When both sides are present they
/// cover the same number of bytes. Segments of one batch are clocked out
/// back to back with chip select held asserted.
#[derive(Debug)]
pub struct Segment<'a> {
    tx: Option<&'a [u8]>,
    rx: Option<&'a mut [u8]>,
}

impl<'a> Segment<'a> {
    /// Transmit `tx`, ignore whatever is clocked in
    pub fn write(tx: &'a [u8]) -> Self {
        Self { tx: Some(tx), rx: None }
    }

    /// Clock in `rx.len()` bytes without meaningful transmit data
    pub fn read(rx: &'a mut [u8]) -> Self {
        Self { tx: None, rx: Some(rx) }
    }

    /// Transmit `tx` and capture the bytes clocked in at the same time
    pub fn exchange(tx: &'a [u8], rx: &'a mut [u8]) -> Result<Self> {
        if tx.len() != rx.len() {
            return Err(Error::InvalidArgument(
                "transmit and receive buffers differ in length",
            ));
        }
        Ok(Self {
            tx: Some(tx),
            rx: Some(rx),
        })
    }

    /// Number of bytes clocked by this segment
    pub fn len(&self) -> usize {
        match (&self.tx, &self.rx) {
            (Some(tx), _) => tx.len(),
            (None, Some(rx)) => rx.len(),
            (None, None) => 0,
        }
    }

    /// Whether the segment clocks no bytes at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Transmit side, if any
    pub fn tx(&self) -> Option<&[u8]> {
        self.tx
    }

    /// Receive side, if any
    pub fn rx_mut(&mut self) -> Option<&mut [u8]> {
        self.rx.as_deref_mut()
    }
}

/// An opened SPI device node
///
/// Methods report the raw OS error; [`SpiDevice`](crate::SpiDevice) maps
/// them onto [`Error`] variants.
pub trait SpiBus: Sized {
    /// Write the mode byte (SPI_IOC_WR_MODE)
    fn set_mode(&mut self, mode: ModeFlags) -> io::Result<()>;

    /// Write the word width (SPI_IOC_WR_BITS_PER_WORD)
    fn set_bits_per_word(&mut self, bits: u8) -> io::Result<()>;

    /// Write the maximum clock speed (SPI_IOC_WR_MAX_SPEED_HZ)
    fn set_max_speed_hz(&mut self, speed_hz: u32) -> io::Result<()>;

    /// Run all segments as one transaction (SPI_IOC_MESSAGE(n))
    fn transfer(&mut self, segments: &mut [Segment<'_>]) -> io::Result<()>;

    /// Plain write(2) using the configured defaults
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Largest number of bytes a single transaction may carry
    fn max_transfer_len(&self) -> usize {
        usize::MAX
    }

    /// Close the underlying descriptor
    fn release(self) -> io::Result<()>;
}

/// Opens device nodes for a particular backend
pub trait SpiOpener {
    /// Handle type produced by this opener
    type Bus: SpiBus;

    /// Open `path` for reading and writing
    fn open(&self, path: &str) -> io::Result<Self::Bus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_lengths() {
        let tx = [1u8, 2, 3];
        let mut rx = [0u8; 5];
        assert_eq!(Segment::write(&tx).len(), 3);
        assert_eq!(Segment::read(&mut rx).len(), 5);
        assert!(Segment::write(&[]).is_empty());
    }

    #[test]
    fn test_exchange_requires_equal_lengths() {
        let tx = [0xAAu8, 0x55];
        let mut rx = [0u8; 3];
        assert!(Segment::exchange(&tx, &mut rx).is_err());

        let mut rx = [0u8; 2];
        let mut seg = Segment::exchange(&tx, &mut rx).unwrap();
        assert_eq!(seg.len(), 2);
        assert_eq!(seg.tx(), Some(&tx[..]));
        seg.rx_mut().unwrap().copy_from_slice(&[7, 8]);
        assert_eq!(rx, [7, 8]);
    }
}
