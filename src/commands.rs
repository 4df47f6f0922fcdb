//! CLI command implementations
//!
//! Commands work on any [`SpiDevice`], so they can be exercised against the
//! dummy backend as well as a real spidev node.

use crate::cli::format_hex;
use spishim_core::{SpiBus, SpiDevice};

/// Report the configuration of an opened device
pub fn run_probe<B: SpiBus>(dev: &SpiDevice<B>) -> String {
    let config = dev.config();
    let mut report = format!(
        "{}: mode {}, {} bits per word, {} Hz",
        dev.path(),
        config.mode.number(),
        config.bits_per_word,
        config.speed_hz
    );
    if let Some(max) = dev.max_transfer_len() {
        report.push_str(&format!(", max transfer {} bytes", max));
    }
    report
}

/// Send `tx`, then read `rx_len` bytes, returning them as hex
pub fn run_xfer<B: SpiBus>(
    dev: &mut SpiDevice<B>,
    tx: &[u8],
    rx_len: usize,
) -> spishim_core::Result<String> {
    let mut rx = vec![0u8; rx_len];
    dev.transfer_full_duplex(tx, &mut rx)?;
    log::debug!("Sent {}, received {} bytes", format_hex(tx), rx.len());
    Ok(format_hex(&rx))
}

/// Clock out `tx` in a single message
pub fn run_write<B: SpiBus>(dev: &mut SpiDevice<B>, tx: &[u8]) -> spishim_core::Result<()> {
    dev.transfer_half_duplex(tx)?;
    log::info!("Wrote {} bytes", tx.len());
    Ok(())
}

/// Write one byte with a plain write call
pub fn run_write_byte<B: SpiBus>(dev: &mut SpiDevice<B>, value: u8) -> spishim_core::Result<()> {
    let n = dev.write_byte(value)?;
    log::info!("Wrote {} byte: {:02X}", n, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spishim_core::{ErrorKind, SpiConfig};
    use spishim_dummy::{DummyConfig, DummyOpener, Responder};

    fn open(opener: &DummyOpener) -> SpiDevice<spishim_dummy::DummyBus> {
        SpiDevice::open_with(opener, "/dev/spidev0.0", &SpiConfig::default()).unwrap()
    }

    #[test]
    fn test_probe_report() {
        let opener = DummyOpener::default();
        let dev = open(&opener);
        assert_eq!(
            run_probe(&dev),
            "/dev/spidev0.0: mode 0, 8 bits per word, 8000000 Hz, max transfer 4096 bytes"
        );
    }

    #[test]
    fn test_xfer_formats_reply() {
        let opener = DummyOpener::new(
            DummyConfig::default().with_responder(Responder::Reply(vec![0xEF, 0x40, 0x18])),
        );
        let mut dev = open(&opener);
        assert_eq!(run_xfer(&mut dev, &[0x9F], 3).unwrap(), "EF 40 18");
    }

    #[test]
    fn test_xfer_zero_length_read() {
        let opener = DummyOpener::default();
        let mut dev = open(&opener);
        let err = run_xfer(&mut dev, &[0x9F], 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_write_commands() {
        let opener = DummyOpener::default();
        let mut dev = open(&opener);
        run_write(&mut dev, &[0xAA, 0x55]).unwrap();
        run_write_byte(&mut dev, 0x5A).unwrap();

        let log = opener.log();
        assert_eq!(log.transactions[0][0].tx, Some(vec![0xAA, 0x55]));
        assert_eq!(log.written, vec![0x5A]);
    }
}
