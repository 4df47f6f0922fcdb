//! SPI device configuration
//!
//! A [`SpiConfig`] is applied once when a device is opened. The defaults
//! (mode 0, 8 bits per word, 8 MHz) match what most spidev peripherals on
//! Raspberry Pi class boards expect.

use crate::error::{Error, Result};
use bitflags::bitflags;

/// Smallest and largest word width accepted by the spidev driver
pub const BITS_PER_WORD_RANGE: core::ops::RangeInclusive<u8> = 1..=32;

/// Default word width
pub const DEFAULT_BITS_PER_WORD: u8 = 8;

bitflags! {
    /// Bits of the spidev mode byte
    ///
    /// Values follow `<linux/spi/spi.h>`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModeFlags: u8 {
        /// Clock phase: sample on trailing edge
        const CPHA      = 0x01;
        /// Clock polarity: clock idles high
        const CPOL      = 0x02;
        /// Chip select is active high
        const CS_HIGH   = 0x04;
        /// Shift out least significant bit first
        const LSB_FIRST = 0x08;
        /// Shared SI/SO signal
        const THREE_WIRE = 0x10;
        /// Loopback mode
        const LOOP      = 0x20;
        /// No chip select
        const NO_CS     = 0x40;
        /// Slave pulls low to pause
        const READY     = 0x80;
    }
}

/// SPI clock mode (CPOL/CPHA combination)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpiMode {
    /// CPOL=0, CPHA=0: clock idles low, data sampled on leading edge
    #[default]
    Mode0,
    /// CPOL=0, CPHA=1
    Mode1,
    /// CPOL=1, CPHA=0
    Mode2,
    /// CPOL=1, CPHA=1
    Mode3,
}

impl SpiMode {
    /// Mode byte flags for this mode
    pub fn flags(self) -> ModeFlags {
        match self {
            SpiMode::Mode0 => ModeFlags::empty(),
            SpiMode::Mode1 => ModeFlags::CPHA,
            SpiMode::Mode2 => ModeFlags::CPOL,
            SpiMode::Mode3 => ModeFlags::CPOL | ModeFlags::CPHA,
        }
    }

    /// Mode from its number (0-3)
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            0 => Some(SpiMode::Mode0),
            1 => Some(SpiMode::Mode1),
            2 => Some(SpiMode::Mode2),
            3 => Some(SpiMode::Mode3),
            _ => None,
        }
    }

    /// Mode number (0-3)
    pub fn number(self) -> u8 {
        self.flags().bits()
    }
}

/// Named clock speeds commonly used with spidev peripherals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpiSpeed {
    /// 1 MHz
    S1M,
    /// 6.75 MHz
    S6_75M,
    /// 8 MHz
    #[default]
    S8M,
    /// 13.5 MHz
    S13_5M,
    /// 27 MHz
    S27M,
}

impl SpiSpeed {
    /// All named speeds, slowest first
    pub const ALL: [SpiSpeed; 5] = [
        SpiSpeed::S1M,
        SpiSpeed::S6_75M,
        SpiSpeed::S8M,
        SpiSpeed::S13_5M,
        SpiSpeed::S27M,
    ];

    /// Clock rate in Hz
    pub const fn hz(self) -> u32 {
        match self {
            SpiSpeed::S1M => 1_000_000,
            SpiSpeed::S6_75M => 6_750_000,
            SpiSpeed::S8M => 8_000_000,
            SpiSpeed::S13_5M => 13_500_000,
            SpiSpeed::S27M => 27_000_000,
        }
    }
}

impl From<SpiSpeed> for u32 {
    fn from(speed: SpiSpeed) -> u32 {
        speed.hz()
    }
}

/// Parameters written to the device when it is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpiConfig {
    /// Clock mode (default: mode 0)
    pub mode: SpiMode,
    /// Word width, 1-32 bits (default: 8)
    pub bits_per_word: u8,
    /// Maximum clock speed in Hz, non-zero (default: 8 MHz)
    pub speed_hz: u32,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            mode: SpiMode::default(),
            bits_per_word: DEFAULT_BITS_PER_WORD,
            speed_hz: SpiSpeed::default().hz(),
        }
    }
}

impl SpiConfig {
    /// Create a configuration with the default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the clock mode
    pub fn with_mode(mut self, mode: SpiMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the word width in bits
    pub fn with_bits_per_word(mut self, bits: u8) -> Self {
        self.bits_per_word = bits;
        self
    }

    /// Set the clock speed from the named set
    pub fn with_speed(mut self, speed: SpiSpeed) -> Self {
        self.speed_hz = speed.hz();
        self
    }

    /// Set an arbitrary clock speed in Hz
    pub fn with_speed_hz(mut self, speed_hz: u32) -> Self {
        self.speed_hz = speed_hz;
        self
    }

    /// Check that every field is within the range the driver accepts
    pub fn validate(&self) -> Result<()> {
        if !BITS_PER_WORD_RANGE.contains(&self.bits_per_word) {
            return Err(Error::InvalidArgument("bits per word must be 1-32"));
        }
        if self.speed_hz == 0 {
            return Err(Error::InvalidArgument("speed must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_defaults() {
        let config = SpiConfig::default();
        assert_eq!(config.mode, SpiMode::Mode0);
        assert_eq!(config.bits_per_word, 8);
        assert_eq!(config.speed_hz, 8_000_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_mode_flags() {
        assert_eq!(SpiMode::Mode0.flags().bits(), 0);
        assert_eq!(SpiMode::Mode1.flags(), ModeFlags::CPHA);
        assert_eq!(SpiMode::Mode2.flags(), ModeFlags::CPOL);
        assert_eq!(SpiMode::Mode3.number(), 3);
        for n in 0..4 {
            assert_eq!(SpiMode::from_number(n).unwrap().number(), n);
        }
        assert_eq!(SpiMode::from_number(4), None);
    }

    #[test]
    fn test_speed_set() {
        let hz: Vec<u32> = SpiSpeed::ALL.iter().map(|s| s.hz()).collect();
        assert_eq!(
            hz,
            [1_000_000, 6_750_000, 8_000_000, 13_500_000, 27_000_000]
        );
        assert_eq!(u32::from(SpiSpeed::S13_5M), 13_500_000);
    }

    #[test]
    fn test_builder_and_validate() {
        let config = SpiConfig::new()
            .with_mode(SpiMode::Mode3)
            .with_speed(SpiSpeed::S27M)
            .with_bits_per_word(16);
        assert_eq!(config.speed_hz, 27_000_000);
        assert!(config.validate().is_ok());

        let err = SpiConfig::new().with_speed_hz(0).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = SpiConfig::new().with_bits_per_word(0).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = SpiConfig::new().with_bits_per_word(33).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
