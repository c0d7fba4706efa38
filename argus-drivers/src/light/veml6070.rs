//! VEML6070 UV-A sensor
//!
//! Unusual bus footprint: the chip claims two addresses, 0x38 for the
//! command register and the result LSB, 0x39 for the result MSB. The
//! driver is addressed by the primary (0x38); the companion address is
//! derived. There is no identity register, so presence is the command
//! write being acknowledged.

use argus_core::driver::{Driver, ParamString, Reading};
use argus_core::error::Error;
use argus_core::schema::{Schema, ValueType};
use argus_hal::{DelayMs, I2cBus};

/// Primary (command + LSB) address; the MSB lives one above
pub const ADDRESSES: &[u8] = &[0x38];

const MSB_ADDRESS: u8 = 0x39;

/// Compile-time capability tier
pub const TIER: &str = if cfg!(feature = "veml6070-config") {
    "config"
} else {
    "minimal"
};

/// Command register reserved bit, always set
const CMD_RESERVED: u8 = 0x02;
/// Shutdown bit
const CMD_SD: u8 = 0x01;

/// Integration time (multiples of the RSET-determined base period)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Integration {
    Half,
    #[default]
    T1,
    T2,
    T4,
}

impl Integration {
    fn command_bits(self) -> u8 {
        match self {
            Integration::Half => 0x00,
            Integration::T1 => 0x04,
            Integration::T2 => 0x08,
            Integration::T4 => 0x0C,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Integration::Half => "0.5t",
            Integration::T1 => "1t",
            Integration::T2 => "2t",
            Integration::T4 => "4t",
        }
    }
}

/// Latest VEML6070 measurement
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Veml6070Reading {
    /// Raw UV-A counts
    pub uv: u16,
    pub valid: bool,
}

impl Reading for Veml6070Reading {
    fn valid(&self) -> bool {
        self.valid
    }
}

/// VEML6070 driver
#[derive(Default)]
pub struct Veml6070 {
    address: u8,
    initialized: bool,
    integration: Integration,
}

impl Veml6070 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver with a fixed integration time, applied during `init`
    #[cfg(feature = "veml6070-config")]
    pub fn with_integration(integration: Integration) -> Self {
        Self {
            integration,
            ..Self::default()
        }
    }

    fn command_byte(&self) -> u8 {
        CMD_RESERVED | self.integration.command_bits()
    }
}

impl Driver for Veml6070 {
    type Reading = Veml6070Reading;

    fn driver_id(&self) -> &'static str {
        "veml6070"
    }

    fn tier(&self) -> &'static str {
        TIER
    }

    fn category(&self) -> &'static str {
        "light"
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

        bus.write(address, &[self.command_byte()])?;
        // One integration period before the first result is meaningful;
        // 1T with the typical 270 kΩ RSET is about 125 ms
        delay.delay_ms(125);

        self.initialized = true;
        Ok(())
    }

    fn deinit<B: I2cBus>(&mut self, bus: &mut B) -> Result<(), Error<B::Error>> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;
        bus.write(self.address, &[self.command_byte() | CMD_SD])?;
        Ok(())
    }

    fn read<B: I2cBus, D: DelayMs>(&mut self, bus: &mut B, _delay: &mut D) -> Veml6070Reading {
        if !self.initialized {
            return Veml6070Reading::default();
        }

        let mut msb = [0u8; 1];
        let mut lsb = [0u8; 1];
        if bus.read(MSB_ADDRESS, &mut msb).is_err() {
            return Veml6070Reading::default();
        }
        if bus.read(self.address, &mut lsb).is_err() {
            return Veml6070Reading::default();
        }

        Veml6070Reading {
            uv: u16::from_be_bytes([msb[0], lsb[0]]),
            valid: true,
        }
    }

    fn schema(&self) -> Schema {
        Schema::new("veml6070", TIER, "light")
            .add_setting(
                "integration",
                ValueType::Enum(&["0.5t", "1t", "2t", "4t"]),
                false,
                "1t",
                "",
                None,
                None,
            )
            .add_signal("uv", ValueType::Int, true, "counts")
            .add_output(
                "uv",
                ValueType::Int,
                "raw UV-A light level",
                "counts",
                "0..65535",
            )
    }

    fn get_parameter(&self, name: &str) -> ParamString {
        let mut out = ParamString::new();
        if name.eq_ignore_ascii_case("integration") {
            let _ = out.push_str(self.integration.label());
        }
        out
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> bool {
        if !name.eq_ignore_ascii_case("integration") {
            return false;
        }
        self.integration = match value {
            "0.5t" => Integration::Half,
            "1t" => Integration::T1,
            "2t" => Integration::T2,
            "4t" => Integration::T4,
            _ => return false,
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_hal::mock::{Expect, MockBus, MockDelay};

    fn operational() -> Veml6070 {
        let mut drv = Veml6070::new();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new([Expect::write(0x38, &[0x06])]);
        drv.init(&mut bus, &mut delay, 0x38).unwrap();
        bus.done();
        drv
    }

    #[test]
    fn init_writes_command_register() {
        let drv = operational();
        assert!(drv.is_initialized());
        assert_eq!(drv.get_parameter("integration").as_str(), "1t");
    }

    #[test]
    fn read_joins_split_addresses_msb_first() {
        let mut drv = operational();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new([
            Expect::read(0x39, &[0x12]),
            Expect::read(0x38, &[0x34]),
        ]);
        let r = drv.read(&mut bus, &mut delay);
        assert!(r.valid);
        assert_eq!(r.uv, 0x1234);
        bus.done();
    }

    #[test]
    fn deinit_sets_shutdown_bit_exactly_once() {
        let mut drv = operational();
        let mut bus = MockBus::new([Expect::write(0x38, &[0x07])]);
        drv.deinit(&mut bus).unwrap();
        bus.done();

        let mut bus = MockBus::empty();
        drv.deinit(&mut bus).unwrap();
        assert_eq!(bus.transactions(), 0);
    }

    #[cfg(feature = "veml6070-config")]
    #[test]
    fn four_t_integration_command_byte() {
        let mut drv = Veml6070::with_integration(Integration::T4);
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new([Expect::write(0x38, &[0x0E])]);
        drv.init(&mut bus, &mut delay, 0x38).unwrap();
        assert_eq!(drv.get_parameter("integration").as_str(), "4t");
        bus.done();
    }

    #[test]
    fn uninitialized_read_touches_no_bus() {
        let mut drv = Veml6070::new();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::empty();
        assert!(!drv.read(&mut bus, &mut delay).valid);
        assert_eq!(bus.transactions(), 0);
    }
}
