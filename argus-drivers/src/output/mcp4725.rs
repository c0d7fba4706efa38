//! MCP4725 12-bit DAC
//!
//! Write-mostly device: the fast-mode frame carries power-down bits and
//! the 12-bit code in two bytes. Reading returns the live DAC state and
//! the EEPROM copy; the driver surfaces both so a host can tell whether
//! a power-cycle default differs from the current output.

use argus_core::driver::{Driver, Reading};
use argus_core::error::Error;
use argus_core::schema::{Schema, ValueType};
use argus_hal::{DelayMs, I2cBus};

/// I2C addresses (A2-A0, factory variants included)
pub const ADDRESSES: &[u8] = &[0x60, 0x61, 0x62, 0x63, 0x64, 0x65, 0x66, 0x67];

/// The MCP4725 compiles as a single tier
pub const TIER: &str = "minimal";

pub const MAX_CODE: u16 = 0x0FFF;

/// Fast-mode power-down field, 1 kΩ to ground
const PD_1K: u8 = 0x10;

/// Latest MCP4725 state
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mcp4725Reading {
    /// Live DAC code
    pub code: u16,
    /// Code stored in EEPROM, loaded on power-up
    pub eeprom_code: u16,
    /// Output is switched off through the power-down circuit
    pub powered_down: bool,
    /// An EEPROM write is still in flight
    pub eeprom_busy: bool,
    pub valid: bool,
}

impl Reading for Mcp4725Reading {
    fn valid(&self) -> bool {
        self.valid
    }
}

/// MCP4725 driver
#[derive(Default)]
pub struct Mcp4725 {
    address: u8,
    initialized: bool,
}

impl Mcp4725 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output code through a fast-mode write
    pub fn write_code<B: I2cBus>(&mut self, bus: &mut B, code: u16) -> Result<(), Error<B::Error>> {
        if !self.initialized {
            return Err(Error::Uninitialized);
        }
        if code > MAX_CODE {
            return Err(Error::InvalidData);
        }
        bus.write(self.address, &[(code >> 8) as u8, code as u8])?;
        Ok(())
    }
}

impl Driver for Mcp4725 {
    type Reading = Mcp4725Reading;

    fn driver_id(&self) -> &'static str {
        "mcp4725"
    }

    fn tier(&self) -> &'static str {
        TIER
    }

    fn category(&self) -> &'static str {
        "output"
    }

    fn valid_addresses(&self) -> &'static [u8] {
        ADDRESSES
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn init<B: I2cBus, D: DelayMs>(
        &mut self,
        bus: &mut B,
        _delay: &mut D,
        address: u8,
    ) -> Result<(), Error<B::Error>> {
        self.initialized = false;
        self.address = address;

        // No identity register; an acknowledged 5-byte status read is
        // the presence check
        let mut buf = [0u8; 5];
        bus.read(address, &mut buf)?;

        self.initialized = true;
        Ok(())
    }

    fn deinit<B: I2cBus>(&mut self, bus: &mut B) -> Result<(), Error<B::Error>> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;
        // Park the output through the 1 kΩ power-down path
        bus.write(self.address, &[PD_1K, 0x00])?;
        Ok(())
    }

    fn read<B: I2cBus, D: DelayMs>(&mut self, bus: &mut B, _delay: &mut D) -> Mcp4725Reading {
        if !self.initialized {
            return Mcp4725Reading::default();
        }

        // Status byte, live DAC code (12 bits left-justified across two
        // bytes), then the EEPROM word
        let mut buf = [0u8; 5];
        if bus.read(self.address, &mut buf).is_err() {
            return Mcp4725Reading::default();
        }

        Mcp4725Reading {
            code: (buf[1] as u16) << 4 | (buf[2] >> 4) as u16,
            eeprom_code: ((buf[3] & 0x0F) as u16) << 8 | buf[4] as u16,
            powered_down: buf[0] & 0x06 != 0,
            eeprom_busy: buf[0] & 0x80 == 0,
            valid: true,
        }
    }

    fn schema(&self) -> Schema {
        Schema::new("mcp4725", TIER, "output")
            .add_signal("code", ValueType::Int, true, "counts")
            .add_command("set", "DAC code 0-4095")
            .add_output(
                "code",
                ValueType::Int,
                "12-bit DAC output code",
                "counts",
                "0..4095",
            )
    }
}
