//! Register descriptor model and access-checked facade
//!
//! Each driver that opts into register access publishes a static table
//! of [`RegisterDesc`] records. The facade rides on top of that
//! metadata: reads and writes are addressed by register address or by
//! (case-insensitive) name, and the access class and width are enforced
//! *before* any bus transaction.
//!
//! Command-style chips - those whose "registers" are really opcodes -
//! describe each command as a descriptor whose width is the response
//! length; their raw hooks map a facade read to "issue command, absorb
//! the fixed delay, read the response".
//!
//! Tables are small (around 20 entries at most), so lookups are linear
//! scans over shared immutable statics.

use argus_hal::{DelayMs, I2cBus};

use crate::driver::Driver;
use crate::error::Error;

/// Register access class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Access {
    /// Read-only
    ReadOnly,
    /// Write-only
    WriteOnly,
    /// Read-write
    ReadWrite,
}

impl Access {
    /// True for RO and RW
    pub fn is_readable(self) -> bool {
        matches!(self, Access::ReadOnly | Access::ReadWrite)
    }

    /// True for WO and RW
    pub fn is_writable(self) -> bool {
        matches!(self, Access::WriteOnly | Access::ReadWrite)
    }
}

/// Immutable description of one register
///
/// Lives in per-driver static tables; shared, never owned by driver
/// instances. The address is up to 16 bits because command-style chips
/// use 16-bit opcodes. A width of 0 denotes a write-only command with
/// no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterDesc {
    /// Register address or command opcode
    pub addr: u16,
    /// Symbolic name, unique within a table (case-insensitively)
    pub name: &'static str,
    /// Width in bytes; for command-style entries, the response length
    pub width: u8,
    /// Access class
    pub access: Access,
    /// Documented reset value
    pub reset: u16,
}

impl RegisterDesc {
    /// Shorthand for table literals
    pub const fn new(addr: u16, name: &'static str, width: u8, access: Access, reset: u16) -> Self {
        Self {
            addr,
            name,
            width,
            access,
            reset,
        }
    }
}

/// Find a descriptor by register address
pub fn find_by_addr(table: &[RegisterDesc], addr: u16) -> Option<&RegisterDesc> {
    table.iter().find(|d| d.addr == addr)
}

/// Find a descriptor by name, ASCII case-insensitively
pub fn find_by_name<'a>(table: &'a [RegisterDesc], name: &str) -> Option<&'a RegisterDesc> {
    table.iter().find(|d| d.name.eq_ignore_ascii_case(name))
}

/// Check the table invariants: unique addresses, unique names
/// (case-insensitively)
///
/// Driver test suites assert this for every published table.
pub fn table_is_wellformed(table: &[RegisterDesc]) -> bool {
    for (i, a) in table.iter().enumerate() {
        for b in &table[i + 1..] {
            if a.addr == b.addr || a.name.eq_ignore_ascii_case(b.name) {
                return false;
            }
        }
    }
    true
}

/// Access-checked register facade
///
/// Drivers implement the two raw hooks; the provided methods perform
/// all table, state, access-class and width checks before any bus
/// traffic happens.
pub trait RegisterAccess: Driver {
    /// Read-only view of this driver's descriptor table
    fn registers(&self) -> &'static [RegisterDesc];

    /// Chip-specific read of an already-validated descriptor
    ///
    /// `buf.len()` equals the descriptor width. Command-style chips
    /// issue the opcode, wait their documented measurement delay, then
    /// read the response.
    fn reg_read_raw<B: I2cBus, D: DelayMs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        desc: &RegisterDesc,
        buf: &mut [u8],
    ) -> Result<(), Error<B::Error>>;

    /// Chip-specific write of an already-validated descriptor
    fn reg_write_raw<B: I2cBus, D: DelayMs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        desc: &RegisterDesc,
        data: &[u8],
    ) -> Result<(), Error<B::Error>>;

    /// Read `buf.len()` bytes from the register at `addr`
    ///
    /// Fails without bus I/O when the driver is uninitialized, the
    /// address is unknown, the register is not readable, or the length
    /// does not match the descriptor width.
    fn reg_read<B: I2cBus, D: DelayMs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        addr: u16,
        buf: &mut [u8],
    ) -> Result<(), Error<B::Error>> {
        if !self.is_initialized() {
            return Err(Error::Uninitialized);
        }
        let desc = *find_by_addr(self.registers(), addr).ok_or(Error::UnknownRegister(addr))?;
        if !desc.access.is_readable() {
            return Err(Error::AccessViolation);
        }
        if buf.len() != desc.width as usize {
            return Err(Error::LengthMismatch {
                expected: desc.width as usize,
                got: buf.len(),
            });
        }
        self.reg_read_raw(bus, delay, &desc, buf)
    }

    /// Write `data` to the register at `addr`
    ///
    /// Mirror image of [`reg_read`](RegisterAccess::reg_read) with the
    /// writability check.
    fn reg_write<B: I2cBus, D: DelayMs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        addr: u16,
        data: &[u8],
    ) -> Result<(), Error<B::Error>> {
        if !self.is_initialized() {
            return Err(Error::Uninitialized);
        }
        let desc = *find_by_addr(self.registers(), addr).ok_or(Error::UnknownRegister(addr))?;
        if !desc.access.is_writable() {
            return Err(Error::AccessViolation);
        }
        if data.len() != desc.width as usize {
            return Err(Error::LengthMismatch {
                expected: desc.width as usize,
                got: data.len(),
            });
        }
        self.reg_write_raw(bus, delay, &desc, data)
    }

    /// Find a descriptor by name, ASCII case-insensitively
    fn register_by_name(&self, name: &str) -> Option<&'static RegisterDesc> {
        find_by_name(self.registers(), name)
    }
}
