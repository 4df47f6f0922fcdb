//! CLI argument parsing

use clap::{Parser, Subcommand};

/// Parse a string as a hex or decimal byte
pub fn parse_hex_u8(s: &str) -> Result<u8, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u8>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a hex byte string such as "9f", "0x9f00" or "9f 00 01"
pub fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, String> {
    let digits: String = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();

    if !digits.is_ascii() {
        return Err(format!("Invalid hex digits in '{}'", s));
    }
    if digits.is_empty() {
        return Err("Empty byte string".to_string());
    }
    if digits.len() % 2 != 0 {
        return Err(format!("Odd number of hex digits in '{}'", s));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| format!("Invalid hex byte '{}'", &digits[i..i + 2]))
        })
        .collect()
}

/// Byte string argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

fn parse_hex_arg(s: &str) -> Result<HexBytes, String> {
    parse_hex_bytes(s).map(HexBytes)
}

/// Format bytes as space separated hex
pub fn format_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Parser)]
#[command(name = "spishim")]
#[command(author, version, about = "Linux spidev access tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Device path or options (dev=/dev/spidevX.Y,spispeed=<kHz>,mode=<0-3>,bits=<1-32>)
    #[arg(short, long, global = true, default_value = "/dev/spidev0.0")]
    pub device: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open and configure the device, then close it
    Probe,

    /// Write bytes, then read bytes under one chip select
    Xfer {
        /// Bytes to send, in hex
        #[arg(short, long, value_parser = parse_hex_arg)]
        tx: HexBytes,

        /// Number of bytes to read after sending
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        rx_len: u32,
    },

    /// Clock out bytes in a single message, discarding the reply
    Write {
        /// Bytes to send, in hex
        #[arg(short, long, value_parser = parse_hex_arg)]
        tx: HexBytes,
    },

    /// Write a single byte with a plain write call
    WriteByte {
        /// Byte value (hex with 0x prefix, or decimal)
        #[arg(value_parser = parse_hex_u8)]
        value: u8,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_u8() {
        assert_eq!(parse_hex_u8("0xAA"), Ok(0xAA));
        assert_eq!(parse_hex_u8("85"), Ok(85));
        assert!(parse_hex_u8("0x100").is_err());
        assert!(parse_hex_u8("256").is_err());
    }

    #[test]
    fn test_parse_hex_bytes() {
        assert_eq!(parse_hex_bytes("aa55"), Ok(vec![0xAA, 0x55]));
        assert_eq!(parse_hex_bytes("0x9F 00:01"), Ok(vec![0x9F, 0x00, 0x01]));
        assert!(parse_hex_bytes("").is_err());
        assert!(parse_hex_bytes("abc").is_err());
        assert!(parse_hex_bytes("zz").is_err());
        assert!(parse_hex_bytes("aé").is_err());
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0xEF, 0x40, 0x18]), "EF 40 18");
        assert_eq!(format_hex(&[]), "");
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "spishim",
            "-d",
            "dev=/dev/spidev1.0,spispeed=1000",
            "xfer",
            "--tx",
            "9f",
            "--rx-len",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.device, "dev=/dev/spidev1.0,spispeed=1000");
        match cli.command {
            Commands::Xfer { tx, rx_len } => {
                assert_eq!(tx, HexBytes(vec![0x9F]));
                assert_eq!(rx_len, 3);
            }
            _ => panic!("expected xfer"),
        }

        assert!(Cli::try_parse_from(["spishim", "xfer", "--tx", "9f", "--rx-len", "0"]).is_err());
    }
}
