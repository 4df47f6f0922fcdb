//! spishim-dummy - In-memory SPI bus emulator for testing
//!
//! This crate provides a dummy backend that emulates a spidev node in
//! memory. It records every control call, message and write, and can be
//! told to fail any of them. It's useful for testing without real hardware.
//!
//! The opener and every bus it hands out share one state, so a test can keep
//! the opener around and inspect the traffic after the device is closed.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use spishim_core::{ConfigParam, ModeFlags, Segment, SpiBus, SpiOpener};

/// EINVAL, as returned by spidev for unsupported settings
const EINVAL: i32 = 22;

/// How the emulated peripheral answers during a transfer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Responder {
    /// Loopback: a message receives its own transmit bytes, zeros if it
    /// transmits nothing
    #[default]
    Echo,
    /// Every received byte has this value
    Fill(u8),
    /// Receive-only messages get these bytes (zero padded); messages that
    /// also transmit are echoed
    Reply(Vec<u8>),
}

/// Configuration for the dummy bus
#[derive(Debug, Clone, Default)]
pub struct DummyConfig {
    /// Paths that exist; empty means any path can be opened
    pub nodes: Vec<String>,
    /// Control call to reject with EINVAL
    pub reject: Option<ConfigParam>,
    /// Fail every transfer with this errno
    pub transfer_errno: Option<i32>,
    /// Fail every write with this errno
    pub write_errno: Option<i32>,
    /// Report this many bytes written instead of the real count
    pub write_count: Option<usize>,
    /// Fail release with this errno (the handle is still gone afterwards)
    pub close_errno: Option<i32>,
    /// Peripheral behaviour on the receive side
    pub responder: Responder,
}

impl DummyConfig {
    /// Accept only the given node path
    pub fn with_node(mut self, path: impl Into<String>) -> Self {
        self.nodes.push(path.into());
        self
    }

    /// Reject the given control call
    pub fn rejecting(mut self, param: ConfigParam) -> Self {
        self.reject = Some(param);
        self
    }

    /// Set the responder
    pub fn with_responder(mut self, responder: Responder) -> Self {
        self.responder = responder;
        self
    }
}

/// One message of a recorded transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Bytes transmitted, if the message had a transmit side
    pub tx: Option<Vec<u8>>,
    /// Whether the message had a receive side
    pub rx: bool,
    /// Bytes clocked
    pub len: usize,
}

/// Everything the emulated device has seen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DummyLog {
    /// Successful opens
    pub opens: usize,
    /// Handles closed through release
    pub releases: usize,
    /// Handles dropped without being released
    pub unreleased_drops: usize,
    /// Last mode byte written
    pub mode: Option<u8>,
    /// Last word width written
    pub bits_per_word: Option<u8>,
    /// Last speed written
    pub speed_hz: Option<u32>,
    /// Completed transactions, one entry per SPI_IOC_MESSAGE call
    pub transactions: Vec<Vec<Message>>,
    /// Bytes passed to write(2)
    pub written: Vec<u8>,
}

#[derive(Debug, Default)]
struct Shared {
    config: DummyConfig,
    log: DummyLog,
}

/// Opener for the dummy bus
#[derive(Debug, Clone, Default)]
pub struct DummyOpener {
    shared: Rc<RefCell<Shared>>,
}

impl DummyOpener {
    /// Create a new dummy opener with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared {
                config,
                log: DummyLog::default(),
            })),
        }
    }

    /// Snapshot of the traffic seen so far
    pub fn log(&self) -> DummyLog {
        self.shared.borrow().log.clone()
    }

    /// Change the configuration for subsequent operations
    pub fn reconfigure(&self, f: impl FnOnce(&mut DummyConfig)) {
        f(&mut self.shared.borrow_mut().config);
    }
}

impl SpiOpener for DummyOpener {
    type Bus = DummyBus;

    fn open(&self, path: &str) -> io::Result<DummyBus> {
        let mut shared = self.shared.borrow_mut();
        if !shared.config.nodes.is_empty() && !shared.config.nodes.iter().any(|n| n == path) {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        shared.log.opens += 1;
        log::trace!("dummy: opened {}", path);
        Ok(DummyBus {
            shared: Rc::clone(&self.shared),
            released: false,
        })
    }
}

/// Emulated open spidev node
#[derive(Debug)]
pub struct DummyBus {
    shared: Rc<RefCell<Shared>>,
    released: bool,
}

impl DummyBus {
    fn control(&mut self, param: ConfigParam) -> io::Result<()> {
        if self.shared.borrow().config.reject == Some(param) {
            log::trace!("dummy: rejecting {}", param);
            return Err(io::Error::from_raw_os_error(EINVAL));
        }
        Ok(())
    }
}

impl SpiBus for DummyBus {
    fn set_mode(&mut self, mode: ModeFlags) -> io::Result<()> {
        self.control(ConfigParam::Mode)?;
        self.shared.borrow_mut().log.mode = Some(mode.bits());
        Ok(())
    }

    fn set_bits_per_word(&mut self, bits: u8) -> io::Result<()> {
        self.control(ConfigParam::BitsPerWord)?;
        self.shared.borrow_mut().log.bits_per_word = Some(bits);
        Ok(())
    }

    fn set_max_speed_hz(&mut self, speed_hz: u32) -> io::Result<()> {
        self.control(ConfigParam::Speed)?;
        self.shared.borrow_mut().log.speed_hz = Some(speed_hz);
        Ok(())
    }

    fn transfer(&mut self, segments: &mut [Segment<'_>]) -> io::Result<()> {
        let mut shared = self.shared.borrow_mut();
        if let Some(errno) = shared.config.transfer_errno {
            return Err(io::Error::from_raw_os_error(errno));
        }

        let responder = shared.config.responder.clone();
        let reply_bytes: &[u8] = match &responder {
            Responder::Reply(bytes) => bytes,
            _ => &[],
        };
        let mut reply = reply_bytes.iter().copied();

        let mut messages = Vec::with_capacity(segments.len());
        for segment in segments.iter_mut() {
            let tx = segment.tx().map(<[u8]>::to_vec);
            let len = segment.len();
            let has_rx = segment.rx_mut().is_some();

            if let Some(rx) = segment.rx_mut() {
                match (&responder, &tx) {
                    (Responder::Fill(value), _) => rx.fill(*value),
                    (_, Some(tx)) => rx.copy_from_slice(tx),
                    (Responder::Reply(_), None) => {
                        for byte in rx.iter_mut() {
                            *byte = reply.next().unwrap_or(0);
                        }
                    }
                    (Responder::Echo, None) => rx.fill(0),
                }
            }

            messages.push(Message {
                tx,
                rx: has_rx,
                len,
            });
        }

        shared.log.transactions.push(messages);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut shared = self.shared.borrow_mut();
        if let Some(errno) = shared.config.write_errno {
            return Err(io::Error::from_raw_os_error(errno));
        }
        shared.log.written.extend_from_slice(data);
        Ok(shared.config.write_count.unwrap_or(data.len()))
    }

    fn max_transfer_len(&self) -> usize {
        4096
    }

    fn release(mut self) -> io::Result<()> {
        self.released = true;
        let mut shared = self.shared.borrow_mut();
        shared.log.releases += 1;
        match shared.config.close_errno {
            Some(errno) => Err(io::Error::from_raw_os_error(errno)),
            None => Ok(()),
        }
    }
}

impl Drop for DummyBus {
    fn drop(&mut self) {
        if !self.released {
            self.shared.borrow_mut().log.unreleased_drops += 1;
        }
    }
}
