//! HTU21D temperature and humidity sensor
//!
//! SHT21-compatible part at a single fixed address. Measurements use the
//! no-hold-master commands so the bus stays free during conversion; each
//! result is a 16-bit word with two status bits in the LSB position and
//! a CRC-8 byte (polynomial 0x31, zero init, unlike the Sensirion
//! command protocol's 0xFF).

use argus_core::driver::{Driver, ParamString, Reading};
use argus_core::error::Error;
use argus_core::schema::{Schema, ValueType};
use argus_hal::{DelayMs, I2cBus};

/// The HTU21D has no address straps
pub const ADDRESSES: &[u8] = &[0x40];

/// Compile-time capability tier
pub const TIER: &str = if cfg!(feature = "htu21d-config") {
    "config"
} else {
    "minimal"
};

/// Command opcodes
mod cmd {
    pub const TRIGGER_TEMP_NOHOLD: u8 = 0xF3;
    pub const TRIGGER_HUM_NOHOLD: u8 = 0xF5;
    #[cfg(feature = "htu21d-config")]
    pub const WRITE_USER_REG: u8 = 0xE6;
    pub const READ_USER_REG: u8 = 0xE7;
    pub const SOFT_RESET: u8 = 0xFE;
}

/// User register value after reset
const USER_REG_DEFAULT: u8 = 0x02;

/// Soft reset settling time (datasheet: 15 ms)
const RESET_DELAY_MS: u32 = 15;

/// 14-bit temperature conversion time, also enough for any humidity
/// resolution
const MEASURE_DELAY_MS: u32 = 50;

/// CRC-8, polynomial 0x31, zero init
fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0x00u8;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Measurement resolution (user register bits 7 and 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    /// RH 12 bit, temperature 14 bit
    #[default]
    High,
    /// RH 11 bit, temperature 11 bit
    Low,
}

#[cfg(feature = "htu21d-config")]
impl Resolution {
    fn user_reg_bits(self) -> u8 {
        match self {
            Resolution::High => 0x00,
            Resolution::Low => 0x81,
        }
    }
}

/// Latest HTU21D measurement
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Htu21dReading {
    /// Temperature in °C
    pub temperature: f32,
    /// Relative humidity in %RH
    pub humidity: f32,
    pub valid: bool,
}

impl Reading for Htu21dReading {
    fn valid(&self) -> bool {
        self.valid
    }
}

/// HTU21D driver
#[derive(Default)]
pub struct Htu21d {
    address: u8,
    initialized: bool,
    #[cfg(feature = "htu21d-config")]
    resolution: Resolution,
}

impl Htu21d {
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver with a fixed measurement resolution, applied during `init`
    #[cfg(feature = "htu21d-config")]
    pub fn with_resolution(resolution: Resolution) -> Self {
        Self {
            resolution,
            ..Self::default()
        }
    }

    /// Trigger one conversion and fetch the CRC-checked raw word with
    /// the status bits masked off
    fn measure<B: I2cBus, D: DelayMs>(
        &self,
        bus: &mut B,
        delay: &mut D,
        trigger: u8,
    ) -> Result<u16, Error<B::Error>> {
        bus.write(self.address, &[trigger])?;
        delay.delay_ms(MEASURE_DELAY_MS);
        let mut buf = [0u8; 3];
        bus.read(self.address, &mut buf)?;
        if crc8(&buf[..2]) != buf[2] {
            return Err(Error::InvalidData);
        }
        Ok(u16::from_be_bytes([buf[0], buf[1]]) & 0xFFFC)
    }
}

impl Driver for Htu21d {
    type Reading = Htu21dReading;

    fn driver_id(&self) -> &'static str {
        "htu21d"
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

        bus.write(address, &[cmd::SOFT_RESET])?;
        delay.delay_ms(RESET_DELAY_MS);

        // The user register reads back its reset value right after a
        // soft reset; that doubles as the presence check
        let mut user = [0u8; 1];
        bus.write_read(address, &[cmd::READ_USER_REG], &mut user)?;
        if user[0] != USER_REG_DEFAULT {
            #[cfg(feature = "htu21d-log")]
            defmt::warn!(
                "htu21d: user register 0x{:02x} after reset, expected 0x{:02x}",
                user[0],
                USER_REG_DEFAULT
            );
            return Err(Error::IdMismatch {
                expected: USER_REG_DEFAULT,
                found: user[0],
            });
        }

        #[cfg(feature = "htu21d-config")]
        if self.resolution != Resolution::High {
            let value = USER_REG_DEFAULT | self.resolution.user_reg_bits();
            bus.write(address, &[cmd::WRITE_USER_REG, value])?;
        }

        self.initialized = true;
        Ok(())
    }

    fn deinit<B: I2cBus>(&mut self, _bus: &mut B) -> Result<(), Error<B::Error>> {
        // Idles between conversions, nothing to power down
        self.initialized = false;
        Ok(())
    }

    fn read<B: I2cBus, D: DelayMs>(&mut self, bus: &mut B, delay: &mut D) -> Htu21dReading {
        if !self.initialized {
            return Htu21dReading::default();
        }

        let raw_t = match self.measure(bus, delay, cmd::TRIGGER_TEMP_NOHOLD) {
            Ok(w) => w,
            Err(_) => return Htu21dReading::default(),
        };
        let raw_rh = match self.measure(bus, delay, cmd::TRIGGER_HUM_NOHOLD) {
            Ok(w) => w,
            Err(_) => return Htu21dReading::default(),
        };

        Htu21dReading {
            temperature: -46.85 + 175.72 * raw_t as f32 / 65536.0,
            humidity: -6.0 + 125.0 * raw_rh as f32 / 65536.0,
            valid: true,
        }
    }

    fn schema(&self) -> Schema {
        Schema::new("htu21d", TIER, "environmental")
            .add_setting(
                "resolution",
                ValueType::Enum(&["high", "low"]),
                false,
                "high",
                "",
                None,
                None,
            )
            .add_signal("temperature", ValueType::Float, true, "°C")
            .add_signal("humidity", ValueType::Float, true, "%RH")
            .add_command("reset", "")
            .add_output(
                "humidity",
                ValueType::Float,
                "relative humidity",
                "%RH",
                "0..100",
            )
    }

    fn get_parameter(&self, name: &str) -> ParamString {
        let mut out = ParamString::new();
        if name.eq_ignore_ascii_case("resolution") {
            #[cfg(feature = "htu21d-config")]
            let label = match self.resolution {
                Resolution::High => "high",
                Resolution::Low => "low",
            };
            #[cfg(not(feature = "htu21d-config"))]
            let label = "high";
            let _ = out.push_str(label);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_hal::mock::{Expect, MockBus, MockDelay};

    fn init_script() -> [Expect; 2] {
        [
            Expect::write(0x40, &[cmd::SOFT_RESET]),
            Expect::write_read(0x40, &[cmd::READ_USER_REG], &[USER_REG_DEFAULT]),
        ]
    }

    fn operational() -> Htu21d {
        let mut drv = Htu21d::new();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new(init_script());
        drv.init(&mut bus, &mut delay, 0x40).unwrap();
        bus.done();
        drv
    }

    #[test]
    fn crc_is_zero_initialized() {
        assert_eq!(crc8(&[]), 0x00);
        assert_eq!(crc8(&[0x68, 0x3A]), 0x7C);
        assert_eq!(crc8(&[0x4E, 0x85]), 0x6B);
    }

    #[test]
    fn init_verifies_user_register_default() {
        let drv = operational();
        assert!(drv.is_initialized());
    }

    #[test]
    fn wrong_user_register_refuses_init() {
        let mut drv = Htu21d::new();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new([
            Expect::write(0x40, &[cmd::SOFT_RESET]),
            Expect::write_read(0x40, &[cmd::READ_USER_REG], &[0xFF]),
        ]);
        assert_eq!(
            drv.init(&mut bus, &mut delay, 0x40),
            Err(Error::IdMismatch {
                expected: 0x02,
                found: 0xFF
            })
        );
        assert!(!drv.is_initialized());
    }

    #[test]
    fn read_converts_and_masks_status_bits() {
        let mut drv = operational();
        let mut delay = MockDelay::default();

        // Raw temp 0x683A (status bits set) is 24.7 °C after masking;
        // raw humidity 0x4E85 is 32.3 %RH
        let mut bus = MockBus::new([
            Expect::write(0x40, &[cmd::TRIGGER_TEMP_NOHOLD]),
            Expect::read(0x40, &[0x68, 0x3A, 0x7C]),
            Expect::write(0x40, &[cmd::TRIGGER_HUM_NOHOLD]),
            Expect::read(0x40, &[0x4E, 0x85, 0x6B]),
        ]);
        let r = drv.read(&mut bus, &mut delay);
        assert!(r.valid);
        assert!((r.temperature - 24.7).abs() < 0.05);
        assert!((r.humidity - 32.3).abs() < 0.05);
        assert_eq!(delay.total_ms, 2 * MEASURE_DELAY_MS);
        bus.done();
    }

    #[test]
    fn corrupt_crc_yields_invalid_reading() {
        let mut drv = operational();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new([
            Expect::write(0x40, &[cmd::TRIGGER_TEMP_NOHOLD]),
            Expect::read(0x40, &[0x68, 0x3A, 0x00]),
        ]);
        assert!(!drv.read(&mut bus, &mut delay).valid);
        bus.done();
    }

    #[test]
    fn uninitialized_read_touches_no_bus() {
        let mut drv = Htu21d::new();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::empty();
        assert!(!drv.read(&mut bus, &mut delay).valid);
        assert_eq!(bus.transactions(), 0);
    }

    #[cfg(feature = "htu21d-config")]
    #[test]
    fn low_resolution_writes_user_register() {
        let mut drv = Htu21d::with_resolution(Resolution::Low);
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new([
            Expect::write(0x40, &[cmd::SOFT_RESET]),
            Expect::write_read(0x40, &[cmd::READ_USER_REG], &[USER_REG_DEFAULT]),
            Expect::write(0x40, &[cmd::WRITE_USER_REG, 0x83]),
        ]);
        drv.init(&mut bus, &mut delay, 0x40).unwrap();
        bus.done();
        assert_eq!(drv.get_parameter("resolution").as_str(), "low");
    }
}
