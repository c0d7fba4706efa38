//! BME280 combined temperature / humidity / pressure sensor
//!
//! Bosch's environmental workhorse. The driver runs the chip in normal
//! mode and reads all three channels in one 8-byte burst, then applies
//! the datasheet compensation: 32-bit integer for temperature, 64-bit
//! integer for pressure, double precision for humidity. Intermediate
//! widths follow the datasheet exactly so results match the published
//! example vectors bit for bit.
//!
//! Data registers are read most-significant byte first, as the chip
//! transmits them.

use argus_core::driver::{Driver, Reading};
use argus_core::error::Error;
use argus_core::schema::{Schema, ValueType};
use argus_hal::{DelayMs, I2cBus};

#[cfg(feature = "bme280-regs")]
use argus_core::register::{Access, RegisterAccess, RegisterDesc};

/// I2C addresses the BME280 can appear at (SDO strap)
pub const ADDRESSES: &[u8] = &[0x76, 0x77];

/// Fixed content of the ID register
const CHIP_ID: u8 = 0x60;

/// Compile-time capability tier
pub const TIER: &str = if cfg!(feature = "bme280-regs") {
    "full"
} else if cfg!(feature = "bme280-config") {
    "config"
} else {
    "minimal"
};

/// Register addresses
mod reg {
    pub const CALIB_00: u8 = 0x88;
    pub const ID: u8 = 0xD0;
    pub const RESET: u8 = 0xE0;
    pub const CALIB_26: u8 = 0xE1;
    pub const CTRL_HUM: u8 = 0xF2;
    pub const STATUS: u8 = 0xF3;
    pub const CTRL_MEAS: u8 = 0xF4;
    pub const CONFIG: u8 = 0xF5;
    pub const DATA: u8 = 0xF7;
}

/// Soft-reset command word
const RESET_CMD: u8 = 0xB6;
/// Start-up time after reset (datasheet: 2 ms; rounded up)
const RESET_DELAY_MS: u32 = 10;

/// Oversampling setting for one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Oversampling {
    #[default]
    X1,
    X2,
    X4,
    X8,
    X16,
}

impl Oversampling {
    fn bits(self) -> u8 {
        match self {
            Oversampling::X1 => 0b001,
            Oversampling::X2 => 0b010,
            Oversampling::X4 => 0b011,
            Oversampling::X8 => 0b100,
            Oversampling::X16 => 0b101,
        }
    }
}

/// IIR filter coefficient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Filter {
    #[default]
    Off,
    X2,
    X4,
    X8,
    X16,
}

impl Filter {
    fn bits(self) -> u8 {
        match self {
            Filter::Off => 0b000,
            Filter::X2 => 0b001,
            Filter::X4 => 0b010,
            Filter::X8 => 0b011,
            Filter::X16 => 0b100,
        }
    }
}

/// User configuration applied during `init` at the config tier
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Bme280Config {
    pub temperature_oversampling: Oversampling,
    pub pressure_oversampling: Oversampling,
    pub humidity_oversampling: Oversampling,
    pub filter: Filter,
}

/// Factory trimming coefficients, read once during `init`
#[derive(Debug, Clone, Copy, Default)]
struct Calibration {
    dig_t1: u16,
    dig_t2: i16,
    dig_t3: i16,
    dig_p1: u16,
    dig_p2: i16,
    dig_p3: i16,
    dig_p4: i16,
    dig_p5: i16,
    dig_p6: i16,
    dig_p7: i16,
    dig_p8: i16,
    dig_p9: i16,
    dig_h1: u8,
    dig_h2: i16,
    dig_h3: u8,
    dig_h4: i16,
    dig_h5: i16,
    dig_h6: i8,
}

impl Calibration {
    /// Parse the 0x88..0xA1 burst (26 bytes) and the 0xE1..0xE7 burst
    /// (7 bytes)
    fn parse(b1: &[u8; 26], b2: &[u8; 7]) -> Self {
        Self {
            dig_t1: u16::from_le_bytes([b1[0], b1[1]]),
            dig_t2: i16::from_le_bytes([b1[2], b1[3]]),
            dig_t3: i16::from_le_bytes([b1[4], b1[5]]),
            dig_p1: u16::from_le_bytes([b1[6], b1[7]]),
            dig_p2: i16::from_le_bytes([b1[8], b1[9]]),
            dig_p3: i16::from_le_bytes([b1[10], b1[11]]),
            dig_p4: i16::from_le_bytes([b1[12], b1[13]]),
            dig_p5: i16::from_le_bytes([b1[14], b1[15]]),
            dig_p6: i16::from_le_bytes([b1[16], b1[17]]),
            dig_p7: i16::from_le_bytes([b1[18], b1[19]]),
            dig_p8: i16::from_le_bytes([b1[20], b1[21]]),
            dig_p9: i16::from_le_bytes([b1[22], b1[23]]),
            dig_h1: b1[25],
            dig_h2: i16::from_le_bytes([b2[0], b2[1]]),
            dig_h3: b2[2],
            // dig_H4/dig_H5 share the nibble at 0xE5
            dig_h4: ((b2[3] as i8 as i16) << 4) | (b2[4] & 0x0F) as i16,
            dig_h5: ((b2[5] as i8 as i16) << 4) | (b2[4] >> 4) as i16,
            dig_h6: b2[6] as i8,
        }
    }

    /// Datasheet `BME280_compensate_T_int32`; returns (t_fine, 0.01 °C)
    fn compensate_temperature(&self, adc_t: i32) -> (i32, i32) {
        let var1 = (((adc_t >> 3) - ((self.dig_t1 as i32) << 1)) * self.dig_t2 as i32) >> 11;
        let var2 = (((((adc_t >> 4) - self.dig_t1 as i32)
            * ((adc_t >> 4) - self.dig_t1 as i32))
            >> 12)
            * self.dig_t3 as i32)
            >> 14;
        let t_fine = var1 + var2;
        (t_fine, (t_fine * 5 + 128) >> 8)
    }

    /// Datasheet `BME280_compensate_P_int64`; returns Pa in Q24.8
    fn compensate_pressure(&self, t_fine: i32, adc_p: i32) -> u32 {
        let var1 = t_fine as i64 - 128000;
        let mut var2 = var1 * var1 * self.dig_p6 as i64;
        var2 += (var1 * self.dig_p5 as i64) << 17;
        var2 += (self.dig_p4 as i64) << 35;
        let mut var1 = ((var1 * var1 * self.dig_p3 as i64) >> 8)
            + ((var1 * self.dig_p2 as i64) << 12);
        var1 = ((1i64 << 47) + var1) * self.dig_p1 as i64 >> 33;
        if var1 == 0 {
            // Division by zero guard from the datasheet
            return 0;
        }
        let mut p: i64 = 1048576 - adc_p as i64;
        p = (((p << 31) - var2) * 3125) / var1;
        let var1 = (self.dig_p9 as i64 * (p >> 13) * (p >> 13)) >> 25;
        let var2 = (self.dig_p8 as i64 * p) >> 19;
        p = ((p + var1 + var2) >> 8) + ((self.dig_p7 as i64) << 4);
        p as u32
    }

    /// Datasheet double-precision humidity compensation; returns %RH
    fn compensate_humidity(&self, t_fine: i32, adc_h: i32) -> f64 {
        let var_h = t_fine as f64 - 76800.0;
        let mut h = (adc_h as f64 - (self.dig_h4 as f64 * 64.0 + self.dig_h5 as f64 / 16384.0 * var_h))
            * (self.dig_h2 as f64 / 65536.0
                * (1.0
                    + self.dig_h6 as f64 / 67108864.0
                        * var_h
                        * (1.0 + self.dig_h3 as f64 / 67108864.0 * var_h)));
        h *= 1.0 - self.dig_h1 as f64 * h / 524288.0;
        h.clamp(0.0, 100.0)
    }
}

/// Latest BME280 measurement
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Bme280Reading {
    /// Temperature in °C
    pub temperature: f32,
    /// Relative humidity in %RH
    pub humidity: f32,
    /// Barometric pressure in hPa
    pub pressure: f32,
    pub valid: bool,
}

impl Reading for Bme280Reading {
    fn valid(&self) -> bool {
        self.valid
    }
}

/// BME280 driver
#[derive(Default)]
pub struct Bme280 {
    address: u8,
    initialized: bool,
    calibration: Calibration,
    #[cfg(feature = "bme280-config")]
    config: Bme280Config,
}

impl Bme280 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver with a user configuration to apply during `init`
    #[cfg(feature = "bme280-config")]
    pub fn with_config(config: Bme280Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    fn effective_config(&self) -> Bme280Config {
        #[cfg(feature = "bme280-config")]
        {
            self.config
        }
        #[cfg(not(feature = "bme280-config"))]
        {
            Bme280Config::default()
        }
    }

    fn write_reg<B: I2cBus>(&self, bus: &mut B, reg: u8, value: u8) -> Result<(), Error<B::Error>> {
        bus.write(self.address, &[reg, value])?;
        Ok(())
    }
}

impl Driver for Bme280 {
    type Reading = Bme280Reading;

    fn driver_id(&self) -> &'static str {
        "bme280"
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

        let mut id = [0u8; 1];
        bus.write_read(address, &[reg::ID], &mut id)?;
        if id[0] != CHIP_ID {
            #[cfg(feature = "bme280-log")]
            defmt::warn!("bme280: unexpected chip id 0x{:02x}", id[0]);
            return Err(Error::IdMismatch {
                expected: CHIP_ID,
                found: id[0],
            });
        }

        self.write_reg(bus, reg::RESET, RESET_CMD)?;
        delay.delay_ms(RESET_DELAY_MS);

        let mut b1 = [0u8; 26];
        bus.write_read(address, &[reg::CALIB_00], &mut b1)?;
        let mut b2 = [0u8; 7];
        bus.write_read(address, &[reg::CALIB_26], &mut b2)?;
        self.calibration = Calibration::parse(&b1, &b2);

        let cfg = self.effective_config();
        // ctrl_hum must be written before ctrl_meas to take effect
        self.write_reg(bus, reg::CTRL_HUM, cfg.humidity_oversampling.bits())?;
        self.write_reg(bus, reg::CONFIG, cfg.filter.bits() << 2)?;
        self.write_reg(
            bus,
            reg::CTRL_MEAS,
            (cfg.temperature_oversampling.bits() << 5)
                | (cfg.pressure_oversampling.bits() << 2)
                | 0b11, // normal mode
        )?;

        self.initialized = true;
        Ok(())
    }

    fn deinit<B: I2cBus>(&mut self, bus: &mut B) -> Result<(), Error<B::Error>> {
        if !self.initialized {
            return Ok(());
        }
        // Sleep mode quiesces the chip
        self.write_reg(bus, reg::CTRL_MEAS, 0x00)?;
        self.initialized = false;
        Ok(())
    }

    fn read<B: I2cBus, D: DelayMs>(&mut self, bus: &mut B, _delay: &mut D) -> Bme280Reading {
        if !self.initialized {
            return Bme280Reading::default();
        }

        let mut data = [0u8; 8];
        if bus.write_read(self.address, &[reg::DATA], &mut data).is_err() {
            #[cfg(feature = "bme280-log")]
            defmt::warn!("bme280: data burst read failed");
            return Bme280Reading::default();
        }

        let adc_p =
            ((data[0] as i32) << 12) | ((data[1] as i32) << 4) | ((data[2] as i32) >> 4);
        let adc_t =
            ((data[3] as i32) << 12) | ((data[4] as i32) << 4) | ((data[5] as i32) >> 4);
        let adc_h = ((data[6] as i32) << 8) | data[7] as i32;

        // 0x80000 is the power-on-reset value of a skipped channel
        if adc_t == 0x80000 {
            return Bme280Reading::default();
        }

        let (t_fine, t_centi) = self.calibration.compensate_temperature(adc_t);
        let pressure_q24_8 = self.calibration.compensate_pressure(t_fine, adc_p);
        let humidity = self.calibration.compensate_humidity(t_fine, adc_h);

        Bme280Reading {
            temperature: t_centi as f32 / 100.0,
            humidity: humidity as f32,
            pressure: pressure_q24_8 as f32 / 256.0 / 100.0,
            valid: true,
        }
    }

    fn schema(&self) -> Schema {
        Schema::new("bme280", TIER, "environmental")
            .add_setting(
                "temperature_oversampling",
                ValueType::Enum(&["x1", "x2", "x4", "x8", "x16"]),
                false,
                "x1",
                "",
                None,
                None,
            )
            .add_setting(
                "filter",
                ValueType::Enum(&["off", "x2", "x4", "x8", "x16"]),
                false,
                "off",
                "",
                None,
                None,
            )
            .add_signal("temperature", ValueType::Float, true, "°C")
            .add_signal("humidity", ValueType::Float, true, "%RH")
            .add_signal("pressure", ValueType::Float, true, "hPa")
            .add_command("reset", "")
            .add_output(
                "pressure",
                ValueType::Float,
                "barometric pressure",
                "hPa",
                "300..1100",
            )
    }
}

/// Register map exposed through the facade
///
/// Multi-byte data registers transmit most-significant byte first.
#[cfg(feature = "bme280-regs")]
pub const REGISTERS: &[RegisterDesc] = &[
    RegisterDesc::new(reg::CALIB_00 as u16, "CALIB00", 26, Access::ReadOnly, 0x0000),
    RegisterDesc::new(reg::ID as u16, "ID", 1, Access::ReadOnly, CHIP_ID as u16),
    RegisterDesc::new(reg::RESET as u16, "RESET", 1, Access::WriteOnly, 0x0000),
    RegisterDesc::new(reg::CALIB_26 as u16, "CALIB26", 7, Access::ReadOnly, 0x0000),
    RegisterDesc::new(reg::CTRL_HUM as u16, "CTRL_HUM", 1, Access::ReadWrite, 0x0000),
    RegisterDesc::new(reg::STATUS as u16, "STATUS", 1, Access::ReadOnly, 0x0000),
    RegisterDesc::new(reg::CTRL_MEAS as u16, "CTRL_MEAS", 1, Access::ReadWrite, 0x0000),
    RegisterDesc::new(reg::CONFIG as u16, "CONFIG", 1, Access::ReadWrite, 0x0000),
    RegisterDesc::new(reg::DATA as u16, "DATA", 8, Access::ReadOnly, 0x8000),
];

#[cfg(feature = "bme280-regs")]
impl RegisterAccess for Bme280 {
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
        bus.write_read(self.address, &[desc.addr as u8], buf)?;
        Ok(())
    }

    fn reg_write_raw<B: I2cBus, D: DelayMs>(
        &mut self,
        bus: &mut B,
        _delay: &mut D,
        desc: &RegisterDesc,
        data: &[u8],
    ) -> Result<(), Error<B::Error>> {
        bus.write(self.address, &[desc.addr as u8, data[0]])?;
        Ok(())
    }
}
