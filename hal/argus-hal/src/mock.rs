//! Scripted mock bus for host-side driver tests
//!
//! Tests script the exact transaction sequence a driver is expected to
//! issue; the mock verifies order, addresses and payloads, and feeds back
//! canned responses. Any unexpected transaction panics, which makes
//! "issues zero bus I/O" assertions trivial: hand the driver an empty
//! script.

use heapless::Vec;

use crate::delay::DelayMs;
use crate::i2c::I2cBus;

/// Longest single mock payload (BME280 calibration burst is 26 bytes)
pub const MAX_DATA: usize = 40;

/// Longest mock script
pub const MAX_SCRIPT: usize = 64;

/// Error returned by a scripted NACK
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

#[derive(Debug)]
enum Kind {
    Write { data: Vec<u8, MAX_DATA> },
    Read { response: Vec<u8, MAX_DATA> },
    WriteRead {
        data: Vec<u8, MAX_DATA>,
        response: Vec<u8, MAX_DATA>,
    },
}

/// One expected bus transaction
#[derive(Debug)]
pub struct Expect {
    addr: u8,
    kind: Kind,
    /// Scripted failure: the transaction matches but is not acknowledged
    nack: bool,
}

fn to_vec(data: &[u8]) -> Vec<u8, MAX_DATA> {
    Vec::from_slice(data).expect("mock payload too long")
}

impl Expect {
    /// Expect a write of exactly `data`
    pub fn write(addr: u8, data: &[u8]) -> Self {
        Self {
            addr,
            kind: Kind::Write { data: to_vec(data) },
            nack: false,
        }
    }

    /// Expect a write of exactly `data`, answered with NACK
    pub fn write_nack(addr: u8, data: &[u8]) -> Self {
        Self {
            nack: true,
            ..Self::write(addr, data)
        }
    }

    /// Expect a read, answered with `response`
    pub fn read(addr: u8, response: &[u8]) -> Self {
        Self {
            addr,
            kind: Kind::Read {
                response: to_vec(response),
            },
            nack: false,
        }
    }

    /// Expect a read, answered with NACK
    pub fn read_nack(addr: u8, len: usize) -> Self {
        Self {
            addr,
            kind: Kind::Read {
                response: to_vec(&[0u8; MAX_DATA][..len]),
            },
            nack: true,
        }
    }

    /// Expect a write-then-read transaction
    pub fn write_read(addr: u8, data: &[u8], response: &[u8]) -> Self {
        Self {
            addr,
            kind: Kind::WriteRead {
                data: to_vec(data),
                response: to_vec(response),
            },
            nack: false,
        }
    }

    /// Expect a write-then-read transaction, answered with NACK
    pub fn write_read_nack(addr: u8, data: &[u8], len: usize) -> Self {
        Self {
            addr,
            kind: Kind::WriteRead {
                data: to_vec(data),
                response: to_vec(&[0u8; MAX_DATA][..len]),
            },
            nack: true,
        }
    }
}

/// Scripted I2C bus
///
/// Consumes its script front to back; [`MockBus::done`] asserts the
/// whole script was used.
pub struct MockBus {
    script: Vec<Expect, MAX_SCRIPT>,
    pos: usize,
}

impl MockBus {
    /// Bus with an empty script - every transaction panics
    pub fn empty() -> Self {
        Self::new(core::iter::empty())
    }

    /// Bus preloaded with the given transaction script
    pub fn new(script: impl IntoIterator<Item = Expect>) -> Self {
        let mut v = Vec::new();
        for e in script {
            v.push(e).expect("mock script too long");
        }
        Self { script: v, pos: 0 }
    }

    fn next(&mut self, what: &str, addr: u8) -> &Expect {
        assert!(
            self.pos < self.script.len(),
            "unexpected {} to 0x{:02x}: script exhausted",
            what,
            addr
        );
        let e = &self.script[self.pos];
        self.pos += 1;
        assert_eq!(e.addr, addr, "{} sent to wrong address", what);
        e
    }

    /// Number of transactions consumed so far
    pub fn transactions(&self) -> usize {
        self.pos
    }

    /// Assert that the whole script has been consumed
    pub fn done(&self) {
        assert_eq!(
            self.pos,
            self.script.len(),
            "mock script not fully consumed"
        );
    }
}

impl I2cBus for MockBus {
    type Error = MockError;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        let e = self.next("write", address);
        match &e.kind {
            Kind::Write { data: expected } => {
                assert_eq!(expected.as_slice(), data, "write payload mismatch");
            }
            other => panic!("expected {:?}, driver issued write", other),
        }
        if e.nack {
            Err(MockError)
        } else {
            Ok(())
        }
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        let e = self.next("read", address);
        match &e.kind {
            Kind::Read { response } => {
                assert_eq!(response.len(), buf.len(), "read length mismatch");
                if e.nack {
                    return Err(MockError);
                }
                buf.copy_from_slice(response);
                Ok(())
            }
            other => panic!("expected {:?}, driver issued read", other),
        }
    }

    fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        let e = self.next("write_read", address);
        match &e.kind {
            Kind::WriteRead { data, response } => {
                assert_eq!(data.as_slice(), write_data, "write_read payload mismatch");
                assert_eq!(response.len(), read_buf.len(), "write_read length mismatch");
                if e.nack {
                    return Err(MockError);
                }
                read_buf.copy_from_slice(response);
                Ok(())
            }
            other => panic!("expected {:?}, driver issued write_read", other),
        }
    }
}

/// Delay that only records the total milliseconds requested
#[derive(Debug, Default)]
pub struct MockDelay {
    /// Accumulated delay in milliseconds
    pub total_ms: u32,
}

impl DelayMs for MockDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.total_ms += ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_write_read_round() {
        let mut bus = MockBus::new([
            Expect::write(0x40, &[0x01, 0x02]),
            Expect::write_read(0x40, &[0x10], &[0xAA, 0xBB]),
        ]);
        bus.write(0x40, &[0x01, 0x02]).unwrap();
        let mut buf = [0u8; 2];
        bus.write_read(0x40, &[0x10], &mut buf).unwrap();
        assert_eq!(buf, [0xAA, 0xBB]);
        bus.done();
    }

    #[test]
    fn scripted_nack_reports_error() {
        let mut bus = MockBus::new([Expect::write_nack(0x40, &[0x01])]);
        assert_eq!(bus.write(0x40, &[0x01]), Err(MockError));
        bus.done();
    }

    #[test]
    #[should_panic(expected = "script exhausted")]
    fn empty_script_rejects_traffic() {
        let mut bus = MockBus::empty();
        let _ = bus.write(0x40, &[0x00]);
    }
}
