//! SHT31 temperature and humidity sensor
//!
//! Sensirion command-style protocol: 16-bit opcodes, big-endian on the
//! wire, every 16-bit result followed by a CRC-8 byte. The driver uses
//! single-shot high-repeatability measurements without clock stretching,
//! so a read is "issue opcode, wait, fetch six bytes".

use argus_core::driver::{Driver, Reading};
use argus_core::error::Error;
use argus_core::schema::{Schema, ValueType};
use argus_hal::{DelayMs, I2cBus};

use super::sensirion_crc8;

#[cfg(feature = "sht31-regs")]
use argus_core::register::{Access, RegisterAccess, RegisterDesc};

/// I2C addresses (ADDR pin low / high)
pub const ADDRESSES: &[u8] = &[0x44, 0x45];

/// Compile-time capability tier
pub const TIER: &str = if cfg!(feature = "sht31-regs") {
    "full"
} else {
    "minimal"
};

/// Command opcodes
mod cmd {
    /// Single shot, high repeatability, no clock stretching
    pub const MEASURE_HIGH: u16 = 0x2400;
    pub const SOFT_RESET: u16 = 0x30A2;
    pub const HEATER_ON: u16 = 0x306D;
    pub const HEATER_OFF: u16 = 0x3066;
    pub const CLEAR_STATUS: u16 = 0x3041;
    pub const READ_STATUS: u16 = 0xF32D;
}

/// Soft reset settling time (datasheet: 1.5 ms)
const RESET_DELAY_MS: u32 = 2;

/// High-repeatability measurement duration (datasheet: 15 ms max)
const MEASURE_DELAY_MS: u32 = 15;

/// Latest SHT31 measurement
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sht31Reading {
    /// Temperature in °C
    pub temperature: f32,
    /// Relative humidity in %RH
    pub humidity: f32,
    pub valid: bool,
}

impl Reading for Sht31Reading {
    fn valid(&self) -> bool {
        self.valid
    }
}

/// SHT31 driver
#[derive(Default)]
pub struct Sht31 {
    address: u8,
    initialized: bool,
}

impl Sht31 {
    pub fn new() -> Self {
        Self::default()
    }

    fn command<B: I2cBus>(&self, bus: &mut B, opcode: u16) -> Result<(), Error<B::Error>> {
        bus.write(self.address, &opcode.to_be_bytes())?;
        Ok(())
    }

    /// Word + CRC triplet check
    fn checked_word<E>(bytes: &[u8]) -> Result<u16, Error<E>> {
        if sensirion_crc8(&bytes[..2]) != bytes[2] {
            return Err(Error::InvalidData);
        }
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }
}

impl Driver for Sht31 {
    type Reading = Sht31Reading;

    fn driver_id(&self) -> &'static str {
        "sht31"
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

        self.command(bus, cmd::SOFT_RESET)?;
        delay.delay_ms(RESET_DELAY_MS);

        // No identity register; a CRC-valid status word is the presence
        // check
        let mut status = [0u8; 3];
        bus.write_read(address, &cmd::READ_STATUS.to_be_bytes(), &mut status)?;
        if sensirion_crc8(&status[..2]) != status[2] {
            #[cfg(feature = "sht31-log")]
            defmt::warn!("sht31: status CRC bad, chip absent or unreliable");
            return Err(Error::InvalidData);
        }

        self.initialized = true;
        Ok(())
    }

    fn deinit<B: I2cBus>(&mut self, _bus: &mut B) -> Result<(), Error<B::Error>> {
        // Single-shot mode idles between commands, nothing to quiesce
        self.initialized = false;
        Ok(())
    }

    fn read<B: I2cBus, D: DelayMs>(&mut self, bus: &mut B, delay: &mut D) -> Sht31Reading {
        if !self.initialized {
            return Sht31Reading::default();
        }

        if self.command(bus, cmd::MEASURE_HIGH).is_err() {
            return Sht31Reading::default();
        }
        delay.delay_ms(MEASURE_DELAY_MS);

        let mut buf = [0u8; 6];
        if bus.read(self.address, &mut buf).is_err() {
            return Sht31Reading::default();
        }

        let raw_t = match Self::checked_word::<B::Error>(&buf[0..3]) {
            Ok(w) => w,
            Err(_) => return Sht31Reading::default(),
        };
        let raw_rh = match Self::checked_word::<B::Error>(&buf[3..6]) {
            Ok(w) => w,
            Err(_) => return Sht31Reading::default(),
        };

        Sht31Reading {
            temperature: -45.0 + 175.0 * raw_t as f32 / 65535.0,
            humidity: 100.0 * raw_rh as f32 / 65535.0,
            valid: true,
        }
    }

    fn schema(&self) -> Schema {
        Schema::new("sht31", TIER, "environmental")
            .add_signal("temperature", ValueType::Float, true, "°C")
            .add_signal("humidity", ValueType::Float, true, "%RH")
            .add_command("reset", "")
            .add_command("heater", "on|off")
            .add_output(
                "temperature",
                ValueType::Float,
                "ambient temperature",
                "°C",
                "-40..125",
            )
            .add_output(
                "humidity",
                ValueType::Float,
                "relative humidity",
                "%RH",
                "0..100",
            )
    }
}

/// Command map exposed through the facade
///
/// Widths are response lengths; payload-less opcodes are write-only with
/// width 0. A facade read of MEASURE issues the opcode, absorbs the
/// measurement time and fetches the raw six-byte frame.
#[cfg(feature = "sht31-regs")]
pub const REGISTERS: &[RegisterDesc] = &[
    RegisterDesc::new(cmd::MEASURE_HIGH, "MEASURE", 6, Access::ReadOnly, 0x0000),
    RegisterDesc::new(cmd::SOFT_RESET, "SOFT_RESET", 0, Access::WriteOnly, 0x0000),
    RegisterDesc::new(cmd::HEATER_ON, "HEATER_ON", 0, Access::WriteOnly, 0x0000),
    RegisterDesc::new(cmd::HEATER_OFF, "HEATER_OFF", 0, Access::WriteOnly, 0x0000),
    RegisterDesc::new(cmd::CLEAR_STATUS, "CLEAR_STATUS", 0, Access::WriteOnly, 0x0000),
    RegisterDesc::new(cmd::READ_STATUS, "STATUS", 3, Access::ReadOnly, 0x8010),
];

#[cfg(feature = "sht31-regs")]
impl RegisterAccess for Sht31 {
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
        if desc.addr == cmd::MEASURE_HIGH {
            delay.delay_ms(MEASURE_DELAY_MS);
        }
        bus.read(self.address, buf)?;
        Ok(())
    }

    fn reg_write_raw<B: I2cBus, D: DelayMs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        desc: &RegisterDesc,
        _data: &[u8],
    ) -> Result<(), Error<B::Error>> {
        self.command(bus, desc.addr)?;
        if desc.addr == cmd::SOFT_RESET {
            delay.delay_ms(RESET_DELAY_MS);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(feature = "sht31-regs")]
    use argus_core::register::table_is_wellformed;
    use argus_hal::mock::{Expect, MockBus, MockDelay};

    // Status word 0x8010 ("reset detected") with its CRC
    const STATUS_FRAME: [u8; 3] = [0x80, 0x10, 0xE1];

    fn init_script(addr: u8) -> [Expect; 2] {
        [
            Expect::write(addr, &[0x30, 0xA2]),
            Expect::write_read(addr, &[0xF3, 0x2D], &STATUS_FRAME),
        ]
    }

    fn operational(addr: u8) -> Sht31 {
        let mut drv = Sht31::new();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new(init_script(addr));
        drv.init(&mut bus, &mut delay, addr).unwrap();
        bus.done();
        drv
    }

    #[test]
    fn init_resets_and_checks_status_crc() {
        let drv = operational(0x44);
        assert!(drv.is_initialized());
        assert_eq!(drv.tier(), TIER);
    }

    #[test]
    fn corrupt_status_crc_refuses_init() {
        let mut drv = Sht31::new();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new([
            Expect::write(0x45, &[0x30, 0xA2]),
            Expect::write_read(0x45, &[0xF3, 0x2D], &[0x80, 0x10, 0x00]),
        ]);
        assert_eq!(
            drv.init(&mut bus, &mut delay, 0x45),
            Err(Error::InvalidData)
        );
        assert!(!drv.is_initialized());
    }

    #[test]
    fn read_converts_datasheet_scale() {
        let mut drv = operational(0x44);
        let mut delay = MockDelay::default();

        // Raw 0x6666 is exactly 25.00 °C; raw 0x8000 is 50 %RH
        let mut bus = MockBus::new([
            Expect::write(0x44, &[0x24, 0x00]),
            Expect::read(0x44, &[0x66, 0x66, 0x93, 0x80, 0x00, 0xA2]),
        ]);
        let r = drv.read(&mut bus, &mut delay);
        assert!(r.valid);
        assert!((r.temperature - 25.0).abs() < 0.01);
        assert!((r.humidity - 50.0).abs() < 0.01);
        assert!(delay.total_ms >= MEASURE_DELAY_MS);
        bus.done();
    }

    #[test]
    fn corrupt_measurement_crc_yields_invalid_reading() {
        let mut drv = operational(0x44);
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new([
            Expect::write(0x44, &[0x24, 0x00]),
            Expect::read(0x44, &[0x66, 0x66, 0xFF, 0x80, 0x00, 0xA2]),
        ]);
        assert!(!drv.read(&mut bus, &mut delay).valid);
        bus.done();
    }

    #[test]
    fn uninitialized_read_touches_no_bus() {
        let mut drv = Sht31::new();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::empty();
        assert!(!drv.read(&mut bus, &mut delay).valid);
        assert_eq!(bus.transactions(), 0);
    }

    #[test]
    fn schema_lists_both_signals() {
        let s = Sht31::new().schema();
        assert_eq!(s.driver_id, "sht31");
        assert_eq!(s.category, "environmental");
        assert_eq!(s.signals.len(), 2);
        assert!(!s.incomplete);
    }

    #[cfg(feature = "sht31-regs")]
    #[test]
    fn command_facade_measures_and_resets() {
        assert!(table_is_wellformed(REGISTERS));

        let mut drv = operational(0x44);
        let mut delay = MockDelay::default();

        // Facade read of MEASURE yields the raw frame, CRCs included
        let mut bus = MockBus::new([
            Expect::write(0x44, &[0x24, 0x00]),
            Expect::read(0x44, &[0x66, 0x66, 0x93, 0x80, 0x00, 0xA2]),
        ]);
        let mut buf = [0u8; 6];
        drv.reg_read(&mut bus, &mut delay, cmd::MEASURE_HIGH, &mut buf)
            .unwrap();
        assert_eq!(buf[..2], [0x66, 0x66]);
        assert!(delay.total_ms >= MEASURE_DELAY_MS);
        bus.done();

        // Heater-off by name, payload-less
        let desc = drv.register_by_name("heater_off").unwrap();
        let mut bus = MockBus::new([Expect::write(0x44, &[0x30, 0x66])]);
        drv.reg_write(&mut bus, &mut delay, desc.addr, &[]).unwrap();
        bus.done();

        // MEASURE is an opcode, not a writable register
        let mut bus = MockBus::empty();
        assert_eq!(
            drv.reg_write(&mut bus, &mut delay, cmd::MEASURE_HIGH, &[]),
            Err(Error::AccessViolation)
        );
        assert_eq!(bus.transactions(), 0);
    }
}
