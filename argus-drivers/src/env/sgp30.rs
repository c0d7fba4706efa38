//! SGP30 air quality sensor
//!
//! Sensirion command-style gas sensor reporting equivalent CO2 and total
//! VOC. The chip needs `init_air_quality` once after power-up and then
//! expects one measurement per second; during its 15 s warm-up it
//! reports the fixed baseline values (400 ppm, 0 ppb), which are
//! perfectly valid readings as far as the driver is concerned.

use argus_core::driver::{Driver, Reading};
use argus_core::error::Error;
use argus_core::schema::{Schema, ValueType};
use argus_hal::{DelayMs, I2cBus};

use super::sensirion_crc8;

#[cfg(feature = "sgp30-regs")]
use argus_core::register::{Access, RegisterAccess, RegisterDesc};

/// The SGP30 has no address straps
pub const ADDRESSES: &[u8] = &[0x58];

/// Compile-time capability tier
pub const TIER: &str = if cfg!(feature = "sgp30-regs") {
    "full"
} else {
    "minimal"
};

/// Command opcodes
mod cmd {
    pub const INIT_AIR_QUALITY: u16 = 0x2003;
    pub const MEASURE_AIR_QUALITY: u16 = 0x2008;
    pub const GET_BASELINE: u16 = 0x2015;
    pub const SET_BASELINE: u16 = 0x201E;
    pub const GET_FEATURE_SET: u16 = 0x202F;
    pub const GET_SERIAL_ID: u16 = 0x3682;
}

/// Worst-case command durations (datasheet "measurement duration, max")
const INIT_DELAY_MS: u32 = 10;
const MEASURE_DELAY_MS: u32 = 12;
const FEATURE_SET_DELAY_MS: u32 = 10;
const BASELINE_DELAY_MS: u32 = 10;

/// Latest SGP30 measurement
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sgp30Reading {
    /// Equivalent CO2 in ppm
    pub eco2: u16,
    /// Total volatile organic compounds in ppb
    pub tvoc: u16,
    pub valid: bool,
}

impl Reading for Sgp30Reading {
    fn valid(&self) -> bool {
        self.valid
    }
}

/// SGP30 driver
#[derive(Default)]
pub struct Sgp30 {
    address: u8,
    initialized: bool,
}

impl Sgp30 {
    pub fn new() -> Self {
        Self::default()
    }

    fn command<B: I2cBus>(&self, bus: &mut B, opcode: u16) -> Result<(), Error<B::Error>> {
        bus.write(self.address, &opcode.to_be_bytes())?;
        Ok(())
    }

    fn checked_word<E>(bytes: &[u8]) -> Result<u16, Error<E>> {
        if sensirion_crc8(&bytes[..2]) != bytes[2] {
            return Err(Error::InvalidData);
        }
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }
}

impl Driver for Sgp30 {
    type Reading = Sgp30Reading;

    fn driver_id(&self) -> &'static str {
        "sgp30"
    }

    fn tier(&self) -> &'static str {
        TIER
    }

    fn category(&self) -> &'static str {
        "environmental"
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
        delay: &mut D,
        address: u8,
    ) -> Result<(), Error<B::Error>> {
        self.initialized = false;
        self.address = address;

        // Feature set doubles as the presence check: the product type
        // nibble of an SGP30 is always 0
        self.command(bus, cmd::GET_FEATURE_SET)?;
        delay.delay_ms(FEATURE_SET_DELAY_MS);
        let mut buf = [0u8; 3];
        bus.read(address, &mut buf)?;
        let feature_set = Self::checked_word::<B::Error>(&buf)?;
        if feature_set >> 12 != 0 {
            #[cfg(feature = "sgp30-log")]
            defmt::warn!("sgp30: feature set 0x{:04x} is not an SGP30", feature_set);
            return Err(Error::IdMismatch {
                expected: 0x00,
                found: (feature_set >> 8) as u8,
            });
        }

        self.command(bus, cmd::INIT_AIR_QUALITY)?;
        delay.delay_ms(INIT_DELAY_MS);

        self.initialized = true;
        Ok(())
    }

    fn deinit<B: I2cBus>(&mut self, _bus: &mut B) -> Result<(), Error<B::Error>> {
        // No stop or sleep opcode; the chip just stops being polled
        self.initialized = false;
        Ok(())
    }

    fn read<B: I2cBus, D: DelayMs>(&mut self, bus: &mut B, delay: &mut D) -> Sgp30Reading {
        if !self.initialized {
            return Sgp30Reading::default();
        }

        if self.command(bus, cmd::MEASURE_AIR_QUALITY).is_err() {
            return Sgp30Reading::default();
        }
        delay.delay_ms(MEASURE_DELAY_MS);

        let mut buf = [0u8; 6];
        if bus.read(self.address, &mut buf).is_err() {
            return Sgp30Reading::default();
        }

        let eco2 = match Self::checked_word::<B::Error>(&buf[0..3]) {
            Ok(w) => w,
            Err(_) => return Sgp30Reading::default(),
        };
        let tvoc = match Self::checked_word::<B::Error>(&buf[3..6]) {
            Ok(w) => w,
            Err(_) => return Sgp30Reading::default(),
        };

        Sgp30Reading {
            eco2,
            tvoc,
            valid: true,
        }
    }

    fn schema(&self) -> Schema {
        Schema::new("sgp30", TIER, "environmental")
            .add_signal("eco2", ValueType::Int, true, "ppm")
            .add_signal("tvoc", ValueType::Int, true, "ppb")
            .add_command("init_air_quality", "")
            .add_output(
                "eco2",
                ValueType::Int,
                "equivalent CO2 concentration",
                "ppm",
                "400..60000",
            )
            .add_output(
                "tvoc",
                ValueType::Int,
                "total volatile organic compounds",
                "ppb",
                "0..60000",
            )
    }
}

/// Command map exposed through the facade
///
/// Baseline words travel with their CRCs in both directions, so the
/// baseline entries are 6 bytes wide and a host driving the facade is
/// responsible for CRC generation on writes.
#[cfg(feature = "sgp30-regs")]
pub const REGISTERS: &[RegisterDesc] = &[
    RegisterDesc::new(cmd::INIT_AIR_QUALITY, "INIT_AIR_QUALITY", 0, Access::WriteOnly, 0x0000),
    RegisterDesc::new(cmd::MEASURE_AIR_QUALITY, "MEASURE", 6, Access::ReadOnly, 0x0000),
    RegisterDesc::new(cmd::GET_BASELINE, "GET_BASELINE", 6, Access::ReadOnly, 0x0000),
    RegisterDesc::new(cmd::SET_BASELINE, "SET_BASELINE", 6, Access::WriteOnly, 0x0000),
    RegisterDesc::new(cmd::GET_FEATURE_SET, "FEATURE_SET", 3, Access::ReadOnly, 0x0020),
    RegisterDesc::new(cmd::GET_SERIAL_ID, "SERIAL_ID", 9, Access::ReadOnly, 0x0000),
];

#[cfg(feature = "sgp30-regs")]
impl RegisterAccess for Sgp30 {
    fn registers(&self) -> &'static [RegisterDesc] {
        REGISTERS
    }

    fn reg_read_raw<B: I2cBus, D: DelayMs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        desc: &RegisterDesc,
        buf: &mut [u8],
    ) -> Result<(), Error<B::Error>> {
        self.command(bus, desc.addr)?;
        let wait = match desc.addr {
            cmd::MEASURE_AIR_QUALITY => MEASURE_DELAY_MS,
            cmd::GET_BASELINE => BASELINE_DELAY_MS,
            cmd::GET_FEATURE_SET => FEATURE_SET_DELAY_MS,
            _ => 1,
        };
        delay.delay_ms(wait);
        bus.read(self.address, buf)?;
        Ok(())
    }

    fn reg_write_raw<B: I2cBus, D: DelayMs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        desc: &RegisterDesc,
        data: &[u8],
    ) -> Result<(), Error<B::Error>> {
        let mut frame = [0u8; 8];
        let opcode = desc.addr.to_be_bytes();
        frame[..2].copy_from_slice(&opcode);
        frame[2..2 + data.len()].copy_from_slice(data);
        bus.write(self.address, &frame[..2 + data.len()])?;
        delay.delay_ms(if desc.addr == cmd::INIT_AIR_QUALITY {
            INIT_DELAY_MS
        } else {
            BASELINE_DELAY_MS
        });
        Ok(())
    }
}
