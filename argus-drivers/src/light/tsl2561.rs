//! TSL2561 ambient light sensor
//!
//! Two photodiode channels (broadband and infrared) behind a command
//! protocol where every register access sets the CMD bit. Lux is derived
//! with the manufacturer's fixed-point piecewise-linear approximation
//! for the T/FN/CL package, so the driver needs no floating point.

use argus_core::driver::{Driver, ParamString, Reading};
use argus_core::error::Error;
use argus_core::schema::{Schema, ValueType};
use argus_hal::{DelayMs, I2cBus};

#[cfg(feature = "tsl2561-regs")]
use argus_core::register::{Access, RegisterAccess, RegisterDesc};

/// I2C addresses (ADDR-SEL low / floating / high)
pub const ADDRESSES: &[u8] = &[0x29, 0x39, 0x49];

/// Compile-time capability tier
pub const TIER: &str = if cfg!(feature = "tsl2561-regs") {
    "full"
} else if cfg!(feature = "tsl2561-config") {
    "config"
} else {
    "minimal"
};

/// Register map (raw addresses; the CMD bit is applied on the wire)
pub mod reg {
    pub const CONTROL: u8 = 0x00;
    pub const TIMING: u8 = 0x01;
    pub const INTERRUPT: u8 = 0x06;
    pub const ID: u8 = 0x0A;
    pub const DATA0LOW: u8 = 0x0C;
    pub const DATA0HIGH: u8 = 0x0D;
    pub const DATA1LOW: u8 = 0x0E;
    pub const DATA1HIGH: u8 = 0x0F;
}

/// Command field: select a register
const CMD: u8 = 0x80;
/// Command field: word protocol (two-byte transaction)
const CMD_WORD: u8 = 0x20;

const POWER_ON: u8 = 0x03;
const POWER_OFF: u8 = 0x00;

/// Part number nibbles of the ID register (CS and T/FN/CL variants)
const PARTNO_CS: u8 = 0x1;
const PARTNO_T: u8 = 0x5;

/// Analog gain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gain {
    #[default]
    X1,
    X16,
}

/// Integration time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Integration {
    Ms13,
    Ms101,
    #[default]
    Ms402,
}

impl Integration {
    fn timing_bits(self) -> u8 {
        match self {
            Integration::Ms13 => 0x00,
            Integration::Ms101 => 0x01,
            Integration::Ms402 => 0x02,
        }
    }

    fn duration_ms(self) -> u32 {
        match self {
            Integration::Ms13 => 14,
            Integration::Ms101 => 102,
            Integration::Ms402 => 403,
        }
    }
}

/// Configuration applied during `init`
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tsl2561Config {
    pub gain: Gain,
    pub integration: Integration,
}

impl Tsl2561Config {
    fn timing_value(self) -> u8 {
        let gain = match self.gain {
            Gain::X1 => 0x00,
            Gain::X16 => 0x10,
        };
        gain | self.integration.timing_bits()
    }
}

// Fixed-point lux approximation scales
const LUX_SCALE: u32 = 14;
const RATIO_SCALE: u32 = 9;
const CH_SCALE: u32 = 10;

/// Channel scaling for the two short integration windows
const CHSCALE_TINT0: u32 = 0x7517;
const CHSCALE_TINT1: u32 = 0x0FE7;

/// Piecewise segments for the T/FN/CL package: (ratio threshold, B, M)
const SEGMENTS_T: &[(u32, u32, u32)] = &[
    (0x0040, 0x01F2, 0x01BE),
    (0x0080, 0x0214, 0x02D1),
    (0x00C0, 0x023F, 0x037B),
    (0x0100, 0x0270, 0x03FE),
    (0x0138, 0x016F, 0x01FC),
    (0x019A, 0x00D2, 0x00FB),
    (0x029A, 0x0018, 0x0012),
];

/// Manufacturer integer lux calculation for the T/FN/CL package
pub fn calculate_lux(ch0: u16, ch1: u16, gain: Gain, integration: Integration) -> u32 {
    let mut ch_scale = match integration {
        Integration::Ms13 => CHSCALE_TINT0,
        Integration::Ms101 => CHSCALE_TINT1,
        Integration::Ms402 => 1 << CH_SCALE,
    };
    if gain == Gain::X1 {
        ch_scale <<= 4;
    }

    let channel0 = (ch0 as u32 * ch_scale) >> CH_SCALE;
    let channel1 = (ch1 as u32 * ch_scale) >> CH_SCALE;

    let ratio = if channel0 != 0 {
        let r = (channel1 << (RATIO_SCALE + 1)) / channel0;
        (r + 1) >> 1
    } else {
        0
    };

    let (b, m) = SEGMENTS_T
        .iter()
        .find(|(threshold, _, _)| ratio <= *threshold)
        .map(|&(_, b, m)| (b, m))
        .unwrap_or((0, 0));

    let mut temp = (channel0 as i64 * b as i64) - (channel1 as i64 * m as i64);
    if temp < 0 {
        temp = 0;
    }
    temp += 1 << (LUX_SCALE - 1);
    (temp >> LUX_SCALE) as u32
}

/// Latest TSL2561 measurement
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tsl2561Reading {
    /// Derived illuminance in lux
    pub lux: u32,
    /// Raw broadband channel
    pub broadband: u16,
    /// Raw infrared channel
    pub infrared: u16,
    pub valid: bool,
}

impl Reading for Tsl2561Reading {
    fn valid(&self) -> bool {
        self.valid
    }
}

/// TSL2561 driver
#[derive(Default)]
pub struct Tsl2561 {
    address: u8,
    initialized: bool,
    config: Tsl2561Config,
}

impl Tsl2561 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver with gain and integration applied during `init`
    #[cfg(feature = "tsl2561-config")]
    pub fn with_config(config: Tsl2561Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    fn read_word<B: I2cBus>(&self, bus: &mut B, reg: u8) -> Result<u16, Error<B::Error>> {
        let mut buf = [0u8; 2];
        bus.write_read(self.address, &[CMD | CMD_WORD | reg], &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }
}

impl Driver for Tsl2561 {
    type Reading = Tsl2561Reading;

    fn driver_id(&self) -> &'static str {
        "tsl2561"
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

        let mut id = [0u8; 1];
        bus.write_read(address, &[CMD | reg::ID], &mut id)?;
        let partno = id[0] >> 4;
        if partno != PARTNO_T && partno != PARTNO_CS {
            #[cfg(feature = "tsl2561-log")]
            defmt::warn!("tsl2561: unexpected ID 0x{:02x}", id[0]);
            return Err(Error::IdMismatch {
                expected: PARTNO_T << 4,
                found: id[0],
            });
        }

        bus.write(address, &[CMD | reg::CONTROL, POWER_ON])?;
        #[cfg(feature = "tsl2561-config")]
        bus.write(address, &[CMD | reg::TIMING, self.config.timing_value()])?;

        // First conversion completes one integration window after
        // power-up
        delay.delay_ms(self.config.integration.duration_ms());

        self.initialized = true;
        Ok(())
    }

    fn deinit<B: I2cBus>(&mut self, bus: &mut B) -> Result<(), Error<B::Error>> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;
        bus.write(self.address, &[CMD | reg::CONTROL, POWER_OFF])?;
        Ok(())
    }

    fn read<B: I2cBus, D: DelayMs>(&mut self, bus: &mut B, _delay: &mut D) -> Tsl2561Reading {
        if !self.initialized {
            return Tsl2561Reading::default();
        }

        let ch0 = match self.read_word(bus, reg::DATA0LOW) {
            Ok(w) => w,
            Err(_) => return Tsl2561Reading::default(),
        };
        let ch1 = match self.read_word(bus, reg::DATA1LOW) {
            Ok(w) => w,
            Err(_) => return Tsl2561Reading::default(),
        };

        // Saturated ADC, lux would be meaningless
        if ch0 == 0xFFFF || ch1 == 0xFFFF {
            return Tsl2561Reading::default();
        }

        Tsl2561Reading {
            lux: calculate_lux(ch0, ch1, self.config.gain, self.config.integration),
            broadband: ch0,
            infrared: ch1,
            valid: true,
        }
    }

    fn schema(&self) -> Schema {
        Schema::new("tsl2561", TIER, "light")
            .add_setting(
                "gain",
                ValueType::Enum(&["1x", "16x"]),
                false,
                "1x",
                "",
                None,
                None,
            )
            .add_setting(
                "integration",
                ValueType::Enum(&["13ms", "101ms", "402ms"]),
                false,
                "402ms",
                "ms",
                None,
                None,
            )
            .add_signal("lux", ValueType::Int, true, "lux")
            .add_command("power", "on|off")
            .add_output(
                "lux",
                ValueType::Int,
                "illuminance",
                "lux",
                "0..40000",
            )
    }

    fn get_parameter(&self, name: &str) -> ParamString {
        let mut out = ParamString::new();
        if name.eq_ignore_ascii_case("gain") {
            let _ = out.push_str(match self.config.gain {
                Gain::X1 => "1x",
                Gain::X16 => "16x",
            });
        } else if name.eq_ignore_ascii_case("integration") {
            let _ = out.push_str(match self.config.integration {
                Integration::Ms13 => "13ms",
                Integration::Ms101 => "101ms",
                Integration::Ms402 => "402ms",
            });
        }
        out
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> bool {
        if name.eq_ignore_ascii_case("gain") {
            self.config.gain = match value {
                "1x" => Gain::X1,
                "16x" => Gain::X16,
                _ => return false,
            };
            return true;
        }
        if name.eq_ignore_ascii_case("integration") {
            self.config.integration = match value {
                "13ms" => Integration::Ms13,
                "101ms" => Integration::Ms101,
                "402ms" => Integration::Ms402,
                _ => return false,
            };
            return true;
        }
        false
    }
}

/// Register table exposed through the facade (raw addresses; the facade
/// hooks apply the CMD bit on the wire)
#[cfg(feature = "tsl2561-regs")]
pub const REGISTERS: &[RegisterDesc] = &[
    RegisterDesc::new(reg::CONTROL as u16, "CONTROL", 1, Access::ReadWrite, 0x0000),
    RegisterDesc::new(reg::TIMING as u16, "TIMING", 1, Access::ReadWrite, 0x0002),
    RegisterDesc::new(reg::INTERRUPT as u16, "INTERRUPT", 1, Access::ReadWrite, 0x0000),
    RegisterDesc::new(reg::ID as u16, "ID", 1, Access::ReadOnly, 0x0050),
    RegisterDesc::new(reg::DATA0LOW as u16, "DATA0LOW", 1, Access::ReadOnly, 0x0000),
    RegisterDesc::new(reg::DATA0HIGH as u16, "DATA0HIGH", 1, Access::ReadOnly, 0x0000),
    RegisterDesc::new(reg::DATA1LOW as u16, "DATA1LOW", 1, Access::ReadOnly, 0x0000),
    RegisterDesc::new(reg::DATA1HIGH as u16, "DATA1HIGH", 1, Access::ReadOnly, 0x0000),
];

#[cfg(feature = "tsl2561-regs")]
impl RegisterAccess for Tsl2561 {
    fn registers(&self) -> &'static [RegisterDesc] {
        REGISTERS
    }

    fn reg_read_raw<B: I2cBus, D: DelayMs>(
        &mut self,
        bus: &mut B,
        _delay: &mut D,
        desc: &RegisterDesc,
        buf: &mut [u8],
    ) -> Result<(), Error<B::Error>> {
        bus.write_read(self.address, &[CMD | desc.addr as u8], buf)?;
        Ok(())
    }

    fn reg_write_raw<B: I2cBus, D: DelayMs>(
        &mut self,
        bus: &mut B,
        _delay: &mut D,
        desc: &RegisterDesc,
        data: &[u8],
    ) -> Result<(), Error<B::Error>> {
        bus.write(self.address, &[CMD | desc.addr as u8, data[0]])?;
        Ok(())
    }
}
