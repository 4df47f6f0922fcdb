//! Linux spidev backend
//!
//! This module provides [`Spidev`], an implementation of [`SpiBus`] on top
//! of the `/dev/spidevX.Y` character device interface.

use crate::error::OptionError;

use spishim_core::{ModeFlags, Segment, SpiBus, SpiConfig, SpiMode, SpiOpener};

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::io::{AsRawFd, IntoRawFd};

/// Path to kernel spidev buffer size parameter
const BUF_SIZE_SYSFS: &str = "/sys/module/spidev/parameters/bufsiz";

/// Linux spidev ioctl constants
mod ioctl {
    use nix::ioctl_write_ptr;

    // SPI ioctl magic number
    pub const SPI_IOC_MAGIC: u8 = b'k';

    // SPI ioctl type numbers
    const SPI_IOC_TYPE_MODE: u8 = 1;
    const SPI_IOC_TYPE_BITS_PER_WORD: u8 = 3;
    const SPI_IOC_TYPE_MAX_SPEED_HZ: u8 = 4;

    ioctl_write_ptr!(spi_ioc_wr_mode, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, u8);
    ioctl_write_ptr!(
        spi_ioc_wr_bits_per_word,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_BITS_PER_WORD,
        u8
    );
    ioctl_write_ptr!(
        spi_ioc_wr_max_speed_hz,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_MAX_SPEED_HZ,
        u32
    );

    /// Size of struct spi_ioc_transfer (identical on 32- and 64-bit)
    pub const SPI_IOC_TRANSFER_SIZE: usize = 32;

    /// The size field of an ioctl number is 14 bits wide
    pub const MAX_MESSAGES: usize = ((1 << 14) - 1) / SPI_IOC_TRANSFER_SIZE;

    /// Calculate ioctl number for SPI_IOC_MESSAGE(n)
    ///
    /// SPI_IOC_MESSAGE(n) = _IOW(SPI_IOC_MAGIC, 0, char[n * sizeof(struct spi_ioc_transfer)])
    pub fn spi_ioc_message(n: usize) -> libc::c_ulong {
        let size = n * SPI_IOC_TRANSFER_SIZE;
        // _IOC(dir, type, nr, size) = (dir << 30) | (size << 16) | (type << 8) | nr
        ((1u32 << 30) | ((size as u32) << 16) | ((SPI_IOC_MAGIC as u32) << 8)) as libc::c_ulong
    }
}

/// SPI transfer structure for ioctl
/// This must match the kernel's struct spi_ioc_transfer layout
#[repr(C)]
#[derive(Debug, Default, Clone)]
struct SpiIocTransfer {
    tx_buf: u64,          // __u64 tx_buf
    rx_buf: u64,          // __u64 rx_buf
    len: u32,             // __u32 len
    speed_hz: u32,        // __u32 speed_hz
    delay_usecs: u16,     // __u16 delay_usecs
    bits_per_word: u8,    // __u8 bits_per_word
    cs_change: u8,        // __u8 cs_change
    tx_nbits: u8,         // __u8 tx_nbits
    rx_nbits: u8,         // __u8 rx_nbits
    word_delay_usecs: u8, // __u8 word_delay_usecs
    _pad: u8,             // padding
}

/// Opens `/dev/spidevX.Y` nodes
#[derive(Debug, Clone, Copy, Default)]
pub struct SpidevOpener;

impl SpiOpener for SpidevOpener {
    type Bus = Spidev;

    fn open(&self, path: &str) -> io::Result<Spidev> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        let max_kernel_buf_size = get_max_kernel_buf_size();
        log::debug!(
            "linux_spi: Max kernel buffer size: {} bytes",
            max_kernel_buf_size
        );

        Ok(Spidev {
            file,
            max_kernel_buf_size,
            speed_hz: 0,
            bits_per_word: 0,
        })
    }
}

/// An opened spidev character device
pub struct Spidev {
    /// File handle for spidev device
    file: File,
    /// Maximum kernel buffer size
    max_kernel_buf_size: usize,
    /// Speed last written with SPI_IOC_WR_MAX_SPEED_HZ (0 = driver default)
    speed_hz: u32,
    /// Word width last written with SPI_IOC_WR_BITS_PER_WORD (0 = driver default)
    bits_per_word: u8,
}

impl SpiBus for Spidev {
    fn set_mode(&mut self, mode: ModeFlags) -> io::Result<()> {
        let mode = mode.bits();
        unsafe { ioctl::spi_ioc_wr_mode(self.file.as_raw_fd(), &mode) }
            .map_err(|e| io::Error::from_raw_os_error(e as i32))?;
        Ok(())
    }

    fn set_bits_per_word(&mut self, bits: u8) -> io::Result<()> {
        unsafe { ioctl::spi_ioc_wr_bits_per_word(self.file.as_raw_fd(), &bits) }
            .map_err(|e| io::Error::from_raw_os_error(e as i32))?;
        self.bits_per_word = bits;
        Ok(())
    }

    fn set_max_speed_hz(&mut self, speed_hz: u32) -> io::Result<()> {
        unsafe { ioctl::spi_ioc_wr_max_speed_hz(self.file.as_raw_fd(), &speed_hz) }
            .map_err(|e| io::Error::from_raw_os_error(e as i32))?;
        self.speed_hz = speed_hz;
        log::debug!("linux_spi: Set speed to {} Hz", speed_hz);
        Ok(())
    }

    fn transfer(&mut self, segments: &mut [Segment<'_>]) -> io::Result<()> {
        if segments.is_empty() || segments.len() > ioctl::MAX_MESSAGES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot batch {} SPI messages", segments.len()),
            ));
        }

        // The kernel reads tx_buf/rx_buf as plain addresses; a null pointer
        // means that direction is not used by the message
        let mut transfers = Vec::with_capacity(segments.len());
        for segment in segments.iter_mut() {
            let len = u32::try_from(segment.len()).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidInput, "SPI message too long")
            })?;
            let tx_buf = segment.tx().map_or(0, |tx| tx.as_ptr() as u64);
            let rx_buf = segment.rx_mut().map_or(0, |rx| rx.as_mut_ptr() as u64);
            transfers.push(SpiIocTransfer {
                tx_buf,
                rx_buf,
                len,
                speed_hz: self.speed_hz,
                bits_per_word: self.bits_per_word,
                ..Default::default()
            });
        }

        let ioctl_num = ioctl::spi_ioc_message(transfers.len());
        let ret = unsafe { libc::ioctl(self.file.as_raw_fd(), ioctl_num, transfers.as_ptr()) };

        if ret < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.file.write(data)
    }

    fn max_transfer_len(&self) -> usize {
        self.max_kernel_buf_size
    }

    fn release(self) -> io::Result<()> {
        let fd = self.file.into_raw_fd();
        let ret = unsafe { libc::close(fd) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

/// Read the maximum kernel buffer size from sysfs, or use page size as fallback
fn get_max_kernel_buf_size() -> usize {
    if let Ok(content) = std::fs::read_to_string(BUF_SIZE_SYSFS) {
        if let Ok(size) = content.trim().parse::<usize>() {
            if size > 0 {
                return size;
            }
        }
        log::warn!("linux_spi: Invalid buffer size in {}", BUF_SIZE_SYSFS);
    } else {
        log::debug!("linux_spi: Cannot read {}, using page size", BUF_SIZE_SYSFS);
    }

    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if page_size > 0 {
        page_size as usize
    } else {
        4096
    }
}

/// Device path plus the configuration to apply to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpidevOptions {
    /// Device path (e.g., "/dev/spidev0.0")
    pub device: String,
    /// Settings written at open time
    pub config: SpiConfig,
}

/// Parse device options from a list of key-value pairs
///
/// Recognised keys: `dev`, `spispeed` (kHz), `mode` (0-3), `bits` (1-32).
pub fn parse_options(options: &[(&str, &str)]) -> Result<SpidevOptions, OptionError> {
    let mut device = String::new();
    let mut config = SpiConfig::default();

    for (key, value) in options {
        match *key {
            "dev" => {
                device = value.to_string();
            }
            "spispeed" => {
                let speed_hz = value
                    .parse::<u32>()
                    .ok()
                    .and_then(|khz| khz.checked_mul(1000))
                    .filter(|&hz| hz > 0)
                    .ok_or_else(|| OptionError::InvalidValue {
                        key: "spispeed",
                        value: value.to_string(),
                        reason: "expected a non-zero speed in kHz",
                    })?;
                config.speed_hz = speed_hz;
            }
            "mode" => {
                config.mode = value
                    .parse::<u8>()
                    .ok()
                    .and_then(SpiMode::from_number)
                    .ok_or_else(|| OptionError::InvalidValue {
                        key: "mode",
                        value: value.to_string(),
                        reason: "must be 0-3",
                    })?;
            }
            "bits" => {
                config.bits_per_word = value
                    .parse::<u8>()
                    .ok()
                    .filter(|b| spishim_core::config::BITS_PER_WORD_RANGE.contains(b))
                    .ok_or_else(|| OptionError::InvalidValue {
                        key: "bits",
                        value: value.to_string(),
                        reason: "must be 1-32",
                    })?;
            }
            _ => {
                log::warn!("linux_spi: Unknown option: {}={}", key, value);
            }
        }
    }

    if device.is_empty() {
        return Err(OptionError::NoDevice);
    }

    Ok(SpidevOptions { device, config })
}

/// Parse a device string
///
/// Accepts either a bare path (`/dev/spidev0.0`) or comma-separated options
/// (`dev=/dev/spidev0.0,spispeed=8000,mode=0`).
pub fn parse_device_string(s: &str) -> Result<SpidevOptions, OptionError> {
    if !s.contains('=') {
        return parse_options(&[("dev", s)]);
    }

    let mut options = Vec::new();
    for opt in s.split(',').filter(|opt| !opt.is_empty()) {
        let pair = opt
            .split_once('=')
            .ok_or_else(|| OptionError::Malformed(opt.to_string()))?;
        options.push(pair);
    }
    parse_options(&options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spishim_core::{ConfigParam, ErrorKind, SpiDevice};

    #[test]
    fn test_transfer_struct_layout() {
        assert_eq!(
            std::mem::size_of::<SpiIocTransfer>(),
            ioctl::SPI_IOC_TRANSFER_SIZE
        );
    }

    #[test]
    fn test_spi_ioc_message_numbers() {
        assert_eq!(ioctl::spi_ioc_message(1), 0x4020_6b00);
        assert_eq!(ioctl::spi_ioc_message(2), 0x4040_6b00);
        assert_eq!(ioctl::MAX_MESSAGES, 511);
    }

    #[test]
    fn test_open_missing_node() {
        let err = SpiDevice::open_with(
            &SpidevOpener,
            "/dev/spidev-does-not-exist.0",
            &SpiConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Open);
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
    }

    #[test]
    fn test_open_non_spi_node() {
        // /dev/null opens fine but rejects every spidev ioctl
        let err = SpiDevice::open_with(&SpidevOpener, "/dev/null", &SpiConfig::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config(ConfigParam::Mode));
    }

    #[test]
    fn test_parse_options() {
        let opts = parse_options(&[
            ("dev", "/dev/spidev1.2"),
            ("spispeed", "1000"),
            ("mode", "3"),
            ("bits", "16"),
        ])
        .unwrap();
        assert_eq!(opts.device, "/dev/spidev1.2");
        assert_eq!(opts.config.speed_hz, 1_000_000);
        assert_eq!(opts.config.mode, SpiMode::Mode3);
        assert_eq!(opts.config.bits_per_word, 16);
    }

    #[test]
    fn test_parse_options_errors() {
        assert_eq!(parse_options(&[]), Err(OptionError::NoDevice));
        assert!(matches!(
            parse_options(&[("dev", "/dev/spidev0.0"), ("mode", "4")]),
            Err(OptionError::InvalidValue { key: "mode", .. })
        ));
        assert!(matches!(
            parse_options(&[("dev", "/dev/spidev0.0"), ("spispeed", "0")]),
            Err(OptionError::InvalidValue { key: "spispeed", .. })
        ));
        assert!(matches!(
            parse_options(&[("dev", "/dev/spidev0.0"), ("bits", "0")]),
            Err(OptionError::InvalidValue { key: "bits", .. })
        ));
    }

    #[test]
    fn test_parse_device_string() {
        let opts = parse_device_string("/dev/spidev0.0").unwrap();
        assert_eq!(opts.device, "/dev/spidev0.0");
        assert_eq!(opts.config, SpiConfig::default());

        let opts = parse_device_string("dev=/dev/spidev0.1,spispeed=27000").unwrap();
        assert_eq!(opts.device, "/dev/spidev0.1");
        assert_eq!(opts.config.speed_hz, 27_000_000);

        assert_eq!(
            parse_device_string("dev=/dev/spidev0.0,fast"),
            Err(OptionError::Malformed("fast".to_string()))
        );
    }
}
