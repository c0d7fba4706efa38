//! BH1750 ambient light sensor
//!
//! Opcode-driven chip with no identity register: presence is "the
//! power-on and mode opcodes were acknowledged". Results are a single
//! big-endian word read straight off the bus, scaled by the datasheet
//! factor of 1.2 counts per lux.

use argus_core::driver::{Driver, ParamString, Reading};
use argus_core::error::Error;
use argus_core::schema::{Schema, ValueType};
use argus_hal::{DelayMs, I2cBus};

#[cfg(feature = "bh1750-regs")]
use argus_core::register::{Access, RegisterAccess, RegisterDesc};

/// I2C addresses (ADDR pin low / high)
pub const ADDRESSES: &[u8] = &[0x23, 0x5C];

/// Compile-time capability tier
pub const TIER: &str = if cfg!(feature = "bh1750-regs") {
    "full"
} else if cfg!(feature = "bh1750-config") {
    "config"
} else {
    "minimal"
};

/// Opcodes
mod cmd {
    pub const POWER_DOWN: u8 = 0x00;
    pub const POWER_ON: u8 = 0x01;
    pub const RESET: u8 = 0x07;
    pub const CONT_HIGH_RES: u8 = 0x10;
    pub const CONT_HIGH_RES2: u8 = 0x11;
    pub const CONT_LOW_RES: u8 = 0x13;
}

/// Measurement mode (continuous; one-shot modes are not used)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// 1 lx resolution, 180 ms
    #[default]
    HighRes,
    /// 0.5 lx resolution, 180 ms
    HighRes2,
    /// 4 lx resolution, 24 ms
    LowRes,
}

impl Mode {
    fn opcode(self) -> u8 {
        match self {
            Mode::HighRes => cmd::CONT_HIGH_RES,
            Mode::HighRes2 => cmd::CONT_HIGH_RES2,
            Mode::LowRes => cmd::CONT_LOW_RES,
        }
    }

    /// Worst-case first-conversion time
    fn settle_ms(self) -> u32 {
        match self {
            Mode::HighRes | Mode::HighRes2 => 180,
            Mode::LowRes => 24,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Mode::HighRes => "high",
            Mode::HighRes2 => "high2",
            Mode::LowRes => "low",
        }
    }
}

/// Latest BH1750 measurement
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Bh1750Reading {
    /// Illuminance in lux
    pub lux: f32,
    /// Raw counts
    pub raw: u16,
    pub valid: bool,
}

impl Reading for Bh1750Reading {
    fn valid(&self) -> bool {
        self.valid
    }
}

/// BH1750 driver
#[derive(Default)]
pub struct Bh1750 {
    address: u8,
    initialized: bool,
    mode: Mode,
}

impl Bh1750 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver with a fixed continuous mode, entered during `init`
    #[cfg(feature = "bh1750-config")]
    pub fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

impl Driver for Bh1750 {
    type Reading = Bh1750Reading;

    fn driver_id(&self) -> &'static str {
        "bh1750"
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

        bus.write(address, &[cmd::POWER_ON])?;
        bus.write(address, &[cmd::RESET])?;
        bus.write(address, &[self.mode.opcode()])?;
        delay.delay_ms(self.mode.settle_ms());

        self.initialized = true;
        Ok(())
    }

    fn deinit<B: I2cBus>(&mut self, bus: &mut B) -> Result<(), Error<B::Error>> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;
        bus.write(self.address, &[cmd::POWER_DOWN])?;
        Ok(())
    }

    fn read<B: I2cBus, D: DelayMs>(&mut self, bus: &mut B, _delay: &mut D) -> Bh1750Reading {
        if !self.initialized {
            return Bh1750Reading::default();
        }

        let mut buf = [0u8; 2];
        if bus.read(self.address, &mut buf).is_err() {
            return Bh1750Reading::default();
        }
        let raw = u16::from_be_bytes(buf);

        Bh1750Reading {
            lux: raw as f32 / 1.2,
            raw,
            valid: true,
        }
    }

    fn schema(&self) -> Schema {
        Schema::new("bh1750", TIER, "light")
            .add_setting(
                "mode",
                ValueType::Enum(&["high", "high2", "low"]),
                false,
                "high",
                "",
                None,
                None,
            )
            .add_signal("lux", ValueType::Float, true, "lux")
            .add_command("power", "on|off")
            .add_output(
                "lux",
                ValueType::Float,
                "illuminance",
                "lux",
                "0..54612",
            )
    }

    fn get_parameter(&self, name: &str) -> ParamString {
        let mut out = ParamString::new();
        if name.eq_ignore_ascii_case("mode") {
            let _ = out.push_str(self.mode.label());
        }
        out
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> bool {
        if !name.eq_ignore_ascii_case("mode") {
            return false;
        }
        self.mode = match value {
            "high" => Mode::HighRes,
            "high2" => Mode::HighRes2,
            "low" => Mode::LowRes,
            _ => return false,
        };
        true
    }
}

/// Opcode map exposed through the facade
///
/// The measurement word has no opcode of its own (it is a plain read),
/// so it gets the out-of-band address 0xFF and the raw hook maps it to
/// a bare bus read.
#[cfg(feature = "bh1750-regs")]
pub const REGISTERS: &[RegisterDesc] = &[
    RegisterDesc::new(cmd::POWER_DOWN as u16, "POWER_DOWN", 0, Access::WriteOnly, 0x0000),
    RegisterDesc::new(cmd::POWER_ON as u16, "POWER_ON", 0, Access::WriteOnly, 0x0000),
    RegisterDesc::new(cmd::RESET as u16, "RESET", 0, Access::WriteOnly, 0x0000),
    RegisterDesc::new(cmd::CONT_HIGH_RES as u16, "CONT_HIGH_RES", 0, Access::WriteOnly, 0x0000),
    RegisterDesc::new(cmd::CONT_LOW_RES as u16, "CONT_LOW_RES", 0, Access::WriteOnly, 0x0000),
    RegisterDesc::new(0x00FF, "DATA", 2, Access::ReadOnly, 0x0000),
];

#[cfg(feature = "bh1750-regs")]
impl RegisterAccess for Bh1750 {
    fn registers(&self) -> &'static [RegisterDesc] {
        REGISTERS
    }

    fn reg_read_raw<B: I2cBus, D: DelayMs>(
        &mut self,
        bus: &mut B,
        _delay: &mut D,
        _desc: &RegisterDesc,
        buf: &mut [u8],
    ) -> Result<(), Error<B::Error>> {
        bus.read(self.address, buf)?;
        Ok(())
    }

    fn reg_write_raw<B: I2cBus, D: DelayMs>(
        &mut self,
        bus: &mut B,
        _delay: &mut D,
        desc: &RegisterDesc,
        _data: &[u8],
    ) -> Result<(), Error<B::Error>> {
        bus.write(self.address, &[desc.addr as u8])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(feature = "bh1750-regs")]
    use argus_core::register::table_is_wellformed;
    use argus_hal::mock::{Expect, MockBus, MockDelay};

    fn init_script(addr: u8, mode: u8) -> [Expect; 3] {
        [
            Expect::write(addr, &[cmd::POWER_ON]),
            Expect::write(addr, &[cmd::RESET]),
            Expect::write(addr, &[mode]),
        ]
    }

    fn operational(addr: u8) -> Bh1750 {
        let mut drv = Bh1750::new();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new(init_script(addr, cmd::CONT_HIGH_RES));
        drv.init(&mut bus, &mut delay, addr).unwrap();
        assert_eq!(delay.total_ms, 180);
        bus.done();
        drv
    }

    #[test]
    fn init_powers_on_and_enters_mode() {
        let drv = operational(0x23);
        assert!(drv.is_initialized());
    }

    #[test]
    fn nack_during_init_leaves_unconfigured() {
        let mut drv = Bh1750::new();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new([Expect::write_nack(0x5C, &[cmd::POWER_ON])]);
        assert!(drv.init(&mut bus, &mut delay, 0x5C).is_err());
        assert!(!drv.is_initialized());
    }

    #[test]
    fn read_scales_by_datasheet_factor() {
        let mut drv = operational(0x23);
        let mut delay = MockDelay::default();
        // 120 counts is exactly 100 lux
        let mut bus = MockBus::new([Expect::read(0x23, &[0x00, 0x78])]);
        let r = drv.read(&mut bus, &mut delay);
        assert!(r.valid);
        assert_eq!(r.raw, 120);
        assert!((r.lux - 100.0).abs() < 0.01);
        bus.done();
    }

    #[test]
    fn deinit_powers_down_exactly_once() {
        let mut drv = operational(0x23);
        let mut bus = MockBus::new([Expect::write(0x23, &[cmd::POWER_DOWN])]);
        drv.deinit(&mut bus).unwrap();
        bus.done();

        let mut bus = MockBus::empty();
        drv.deinit(&mut bus).unwrap();
        assert_eq!(bus.transactions(), 0);
    }

    #[test]
    fn uninitialized_read_touches_no_bus() {
        let mut drv = Bh1750::new();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::empty();
        assert!(!drv.read(&mut bus, &mut delay).valid);
        assert_eq!(bus.transactions(), 0);
    }

    #[cfg(feature = "bh1750-config")]
    #[test]
    fn low_res_mode_config() {
        let mut drv = Bh1750::with_mode(Mode::LowRes);
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new(init_script(0x23, cmd::CONT_LOW_RES));
        drv.init(&mut bus, &mut delay, 0x23).unwrap();
        assert_eq!(delay.total_ms, 24);
        assert_eq!(drv.get_parameter("mode").as_str(), "low");
        bus.done();
    }

    #[cfg(feature = "bh1750-regs")]
    #[test]
    fn facade_reads_data_and_issues_opcodes() {
        assert!(table_is_wellformed(REGISTERS));

        let mut drv = operational(0x23);
        let mut delay = MockDelay::default();

        let mut bus = MockBus::new([Expect::read(0x23, &[0x00, 0x78])]);
        let mut buf = [0u8; 2];
        drv.reg_read(&mut bus, &mut delay, 0x00FF, &mut buf).unwrap();
        assert_eq!(u16::from_be_bytes(buf), 120);
        bus.done();

        let mut bus = MockBus::new([Expect::write(0x23, &[cmd::RESET])]);
        drv.reg_write(&mut bus, &mut delay, cmd::RESET as u16, &[])
            .unwrap();
        bus.done();
    }
}
