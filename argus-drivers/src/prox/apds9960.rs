//! APDS9960 proximity, ambient light and color sensor
//!
//! The gesture engine is not driven here; the driver runs the ALS and
//! proximity engines and reports clear/red/green/blue counts plus the
//! 8-bit proximity value. Data validity comes from the STATUS register,
//! so a read issued before the first integration completes reports not
//! ready rather than stale counts.

use argus_core::driver::{Driver, ParamString, Reading};
use argus_core::error::Error;
use argus_core::schema::{Schema, ValueType};
use argus_hal::{DelayMs, I2cBus};

/// The APDS9960 has no address straps
pub const ADDRESSES: &[u8] = &[0x39];

/// Compile-time capability tier
pub const TIER: &str = if cfg!(feature = "apds9960-config") {
    "config"
} else {
    "minimal"
};

/// Register map
pub mod reg {
    pub const ENABLE: u8 = 0x80;
    pub const ATIME: u8 = 0x81;
    pub const CONTROL: u8 = 0x8F;
    pub const ID: u8 = 0x92;
    pub const STATUS: u8 = 0x93;
    pub const CDATAL: u8 = 0x94;
    pub const PDATA: u8 = 0x9C;
}

/// ID register value
const CHIP_ID: u8 = 0xAB;

// ENABLE bits
const PON: u8 = 0x01;
const AEN: u8 = 0x02;
const PEN: u8 = 0x04;

// STATUS bits
const AVALID: u8 = 0x01;
const PVALID: u8 = 0x02;

/// Power-on settling time (datasheet: 5.7 ms exit from sleep)
const WAKE_DELAY_MS: u32 = 7;

/// ALS gain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AlsGain {
    X1,
    #[default]
    X4,
    X16,
    X64,
}

impl AlsGain {
    #[cfg(feature = "apds9960-config")]
    fn control_bits(self) -> u8 {
        match self {
            AlsGain::X1 => 0x00,
            AlsGain::X4 => 0x01,
            AlsGain::X16 => 0x02,
            AlsGain::X64 => 0x03,
        }
    }

    fn label(self) -> &'static str {
        match self {
            AlsGain::X1 => "1x",
            AlsGain::X4 => "4x",
            AlsGain::X16 => "16x",
            AlsGain::X64 => "64x",
        }
    }
}

/// Latest APDS9960 measurement
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Apds9960Reading {
    pub clear: u16,
    pub red: u16,
    pub green: u16,
    pub blue: u16,
    /// 8-bit proximity, larger is closer
    pub proximity: u8,
    pub valid: bool,
}

impl Reading for Apds9960Reading {
    fn valid(&self) -> bool {
        self.valid
    }
}

/// APDS9960 driver
#[derive(Default)]
pub struct Apds9960 {
    address: u8,
    initialized: bool,
    gain: AlsGain,
}

impl Apds9960 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver with a fixed ALS gain, applied during `init`
    #[cfg(feature = "apds9960-config")]
    pub fn with_gain(gain: AlsGain) -> Self {
        Self {
            gain,
            ..Self::default()
        }
    }

    fn write_reg<B: I2cBus>(&self, bus: &mut B, reg: u8, value: u8) -> Result<(), Error<B::Error>> {
        bus.write(self.address, &[reg, value])?;
        Ok(())
    }

    fn read_reg<B: I2cBus>(&self, bus: &mut B, reg: u8) -> Result<u8, Error<B::Error>> {
        let mut buf = [0u8; 1];
        bus.write_read(self.address, &[reg], &mut buf)?;
        Ok(buf[0])
    }

    /// Have both engines completed an integration cycle?
    ///
    /// `Err(Error::NotReady)` means the chip is healthy but still
    /// integrating; polling hosts treat it as "try again later".
    pub fn data_ready<B: I2cBus>(&self, bus: &mut B) -> Result<(), Error<B::Error>> {
        if !self.initialized {
            return Err(Error::Uninitialized);
        }
        let status = self.read_reg(bus, reg::STATUS)?;
        if status & (AVALID | PVALID) != (AVALID | PVALID) {
            return Err(Error::NotReady);
        }
        Ok(())
    }
}

impl Driver for Apds9960 {
    type Reading = Apds9960Reading;

    fn driver_id(&self) -> &'static str {
        "apds9960"
    }

    fn tier(&self) -> &'static str {
        TIER
    }

    fn category(&self) -> &'static str {
        "proximity"
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

        let id = self.read_reg(bus, reg::ID)?;
        if id != CHIP_ID {
            #[cfg(feature = "apds9960-log")]
            defmt::warn!("apds9960: ID 0x{:02x}, expected 0x{:02x}", id, CHIP_ID);
            return Err(Error::IdMismatch {
                expected: CHIP_ID,
                found: id,
            });
        }

        // All engines off before reconfiguring
        self.write_reg(bus, reg::ENABLE, 0x00)?;

        #[cfg(feature = "apds9960-config")]
        self.write_reg(bus, reg::CONTROL, self.gain.control_bits())?;

        self.write_reg(bus, reg::ENABLE, PON)?;
        delay.delay_ms(WAKE_DELAY_MS);
        self.write_reg(bus, reg::ENABLE, PON | AEN | PEN)?;

        self.initialized = true;
        Ok(())
    }

    fn deinit<B: I2cBus>(&mut self, bus: &mut B) -> Result<(), Error<B::Error>> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;
        self.write_reg(bus, reg::ENABLE, 0x00)?;
        Ok(())
    }

    fn read<B: I2cBus, D: DelayMs>(&mut self, bus: &mut B, _delay: &mut D) -> Apds9960Reading {
        if !self.initialized {
            return Apds9960Reading::default();
        }

        if self.data_ready(bus).is_err() {
            return Apds9960Reading::default();
        }

        // Clear/red/green/blue, 16-bit little-endian each
        let mut rgbc = [0u8; 8];
        if bus
            .write_read(self.address, &[reg::CDATAL], &mut rgbc)
            .is_err()
        {
            return Apds9960Reading::default();
        }
        let proximity = match self.read_reg(bus, reg::PDATA) {
            Ok(p) => p,
            Err(_) => return Apds9960Reading::default(),
        };

        Apds9960Reading {
            clear: u16::from_le_bytes([rgbc[0], rgbc[1]]),
            red: u16::from_le_bytes([rgbc[2], rgbc[3]]),
            green: u16::from_le_bytes([rgbc[4], rgbc[5]]),
            blue: u16::from_le_bytes([rgbc[6], rgbc[7]]),
            proximity,
            valid: true,
        }
    }

    fn schema(&self) -> Schema {
        Schema::new("apds9960", TIER, "proximity")
            .add_setting(
                "gain",
                ValueType::Enum(&["1x", "4x", "16x", "64x"]),
                false,
                "4x",
                "",
                None,
                None,
            )
            .add_signal("proximity", ValueType::Int, true, "counts")
            .add_signal("clear", ValueType::Int, true, "counts")
            .add_signal("red", ValueType::Int, true, "counts")
            .add_signal("green", ValueType::Int, true, "counts")
            .add_signal("blue", ValueType::Int, true, "counts")
            .add_output(
                "proximity",
                ValueType::Int,
                "relative proximity, larger is closer",
                "counts",
                "0..255",
            )
    }

    fn get_parameter(&self, name: &str) -> ParamString {
        let mut out = ParamString::new();
        if name.eq_ignore_ascii_case("gain") {
            let _ = out.push_str(self.gain.label());
        }
        out
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> bool {
        if !name.eq_ignore_ascii_case("gain") {
            return false;
        }
        self.gain = match value {
            "1x" => AlsGain::X1,
            "4x" => AlsGain::X4,
            "16x" => AlsGain::X16,
            "64x" => AlsGain::X64,
            _ => return false,
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_hal::mock::{Expect, MockBus, MockDelay};

    fn init_script() -> heapless::Vec<Expect, 6> {
        let mut v = heapless::Vec::new();
        v.push(Expect::write_read(0x39, &[reg::ID], &[CHIP_ID])).ok();
        v.push(Expect::write(0x39, &[reg::ENABLE, 0x00])).ok();
        if cfg!(feature = "apds9960-config") {
            v.push(Expect::write(0x39, &[reg::CONTROL, 0x01])).ok();
        }
        v.push(Expect::write(0x39, &[reg::ENABLE, 0x01])).ok();
        v.push(Expect::write(0x39, &[reg::ENABLE, 0x07])).ok();
        v
    }

    fn operational() -> Apds9960 {
        let mut drv = Apds9960::new();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new(init_script());
        drv.init(&mut bus, &mut delay, 0x39).unwrap();
        assert!(delay.total_ms >= WAKE_DELAY_MS);
        bus.done();
        drv
    }

    #[test]
    fn init_checks_id_then_enables_engines() {
        let drv = operational();
        assert!(drv.is_initialized());
    }

    #[test]
    fn foreign_id_refuses_init() {
        let mut drv = Apds9960::new();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new([Expect::write_read(0x39, &[reg::ID], &[0x60])]);
        assert_eq!(
            drv.init(&mut bus, &mut delay, 0x39),
            Err(Error::IdMismatch {
                expected: 0xAB,
                found: 0x60
            })
        );
        assert!(!drv.is_initialized());
    }

    #[test]
    fn read_requires_both_valid_bits() {
        let mut drv = operational();
        let mut delay = MockDelay::default();

        // ALS done but proximity still integrating
        let mut bus = MockBus::new([Expect::write_read(0x39, &[reg::STATUS], &[AVALID])]);
        assert!(!drv.read(&mut bus, &mut delay).valid);
        bus.done();
    }

    #[test]
    fn data_ready_distinguishes_integrating_from_done() {
        let drv = Apds9960::new();
        let mut bus = MockBus::empty();
        assert_eq!(drv.data_ready(&mut bus), Err(Error::Uninitialized));
        assert_eq!(bus.transactions(), 0);

        let drv = operational();
        let mut bus = MockBus::new([Expect::write_read(0x39, &[reg::STATUS], &[PVALID])]);
        assert_eq!(drv.data_ready(&mut bus), Err(Error::NotReady));
        bus.done();

        let mut bus =
            MockBus::new([Expect::write_read(0x39, &[reg::STATUS], &[AVALID | PVALID])]);
        drv.data_ready(&mut bus).unwrap();
        bus.done();
    }

    #[test]
    fn read_parses_rgbc_and_proximity() {
        let mut drv = operational();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new([
            Expect::write_read(0x39, &[reg::STATUS], &[AVALID | PVALID]),
            Expect::write_read(
                0x39,
                &[reg::CDATAL],
                &[0x10, 0x02, 0x20, 0x01, 0x30, 0x00, 0x40, 0x00],
            ),
            Expect::write_read(0x39, &[reg::PDATA], &[0x7F]),
        ]);
        let r = drv.read(&mut bus, &mut delay);
        assert!(r.valid);
        assert_eq!(r.clear, 0x0210);
        assert_eq!(r.red, 0x0120);
        assert_eq!(r.green, 0x0030);
        assert_eq!(r.blue, 0x0040);
        assert_eq!(r.proximity, 0x7F);
        bus.done();
    }

    #[test]
    fn deinit_disables_engines_exactly_once() {
        let mut drv = operational();
        let mut bus = MockBus::new([Expect::write(0x39, &[reg::ENABLE, 0x00])]);
        drv.deinit(&mut bus).unwrap();
        bus.done();

        let mut bus = MockBus::empty();
        drv.deinit(&mut bus).unwrap();
        assert_eq!(bus.transactions(), 0);
    }

    #[test]
    fn uninitialized_read_touches_no_bus() {
        let mut drv = Apds9960::new();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::empty();
        assert!(!drv.read(&mut bus, &mut delay).valid);
        assert_eq!(bus.transactions(), 0);
    }
}
