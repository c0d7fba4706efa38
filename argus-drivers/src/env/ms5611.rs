//! MS5611 barometric pressure sensor
//!
//! Command-style chip: there are no byte-addressable registers, only
//! opcodes. A measurement is "start conversion, wait the oversampling-
//! dependent time, read the 24-bit ADC result". Factory calibration
//! lives in an 8-word PROM read once during `init`.
//!
//! The second-order temperature compensation follows the datasheet with
//! 64-bit intermediates; PROM words and ADC results are big-endian on
//! the wire.

use argus_core::driver::{Driver, ParamString, Reading};
use argus_core::error::Error;
use argus_core::schema::{Schema, ValueType};
use argus_hal::{DelayMs, I2cBus};

#[cfg(feature = "ms5611-regs")]
use argus_core::register::{Access, RegisterAccess, RegisterDesc};

/// I2C addresses the MS5611 can appear at (CSB strap)
pub const ADDRESSES: &[u8] = &[0x77, 0x76];

/// Compile-time capability tier
pub const TIER: &str = if cfg!(feature = "ms5611-regs") {
    "full"
} else if cfg!(feature = "ms5611-config") {
    "config"
} else {
    "minimal"
};

/// Command opcodes
mod cmd {
    pub const ADC_READ: u8 = 0x00;
    pub const RESET: u8 = 0x1E;
    /// D1 (pressure) conversion, OSR 256; higher OSRs add 2 per step
    pub const CONVERT_D1: u8 = 0x40;
    /// D2 (temperature) conversion, OSR 256
    pub const CONVERT_D2: u8 = 0x50;
    /// PROM read base; words at 0xA0, 0xA2, ... 0xAE
    pub const PROM_READ: u8 = 0xA0;
}

/// Reset settling time (datasheet: 2.8 ms reload)
const RESET_DELAY_MS: u32 = 3;

/// Oversampling ratio for both conversions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Osr {
    Osr256,
    Osr512,
    Osr1024,
    Osr2048,
    #[default]
    Osr4096,
}

impl Osr {
    /// Opcode offset from the OSR-256 base command
    fn command_offset(self) -> u8 {
        match self {
            Osr::Osr256 => 0,
            Osr::Osr512 => 2,
            Osr::Osr1024 => 4,
            Osr::Osr2048 => 6,
            Osr::Osr4096 => 8,
        }
    }

    /// Maximum conversion time, rounded up to whole milliseconds
    fn conversion_ms(self) -> u32 {
        match self {
            Osr::Osr256 => 1,
            Osr::Osr512 => 2,
            Osr::Osr1024 => 3,
            Osr::Osr2048 => 5,
            Osr::Osr4096 => 10,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Osr::Osr256 => "256",
            Osr::Osr512 => "512",
            Osr::Osr1024 => "1024",
            Osr::Osr2048 => "2048",
            Osr::Osr4096 => "4096",
        }
    }
}

/// Factory PROM: word 0 is factory data, C1..C6 calibration, word 7 CRC
#[derive(Debug, Clone, Copy, Default)]
struct Prom {
    words: [u16; 8],
}

impl Prom {
    fn c(&self, i: usize) -> i64 {
        self.words[i] as i64
    }

    /// A chip that answers but returns a blank PROM is not an MS5611
    fn plausible(&self) -> bool {
        !self.words.iter().all(|&w| w == 0x0000) && !self.words.iter().all(|&w| w == 0xFFFF)
    }

    /// Datasheet first+second order compensation
    ///
    /// Returns (temperature in 0.01 °C, pressure in 0.01 hPa).
    fn compensate(&self, d1: u32, d2: u32) -> (i32, i32) {
        let dt = d2 as i64 - (self.c(5) << 8);
        let mut temp = 2000 + ((dt * self.c(6)) >> 23);
        let mut off = (self.c(2) << 16) + ((self.c(4) * dt) >> 7);
        let mut sens = (self.c(1) << 15) + ((self.c(3) * dt) >> 8);

        if temp < 2000 {
            let t2 = (dt * dt) >> 31;
            let sq = (temp - 2000) * (temp - 2000);
            let mut off2 = 5 * sq / 2;
            let mut sens2 = 5 * sq / 4;
            if temp < -1500 {
                let sq = (temp + 1500) * (temp + 1500);
                off2 += 7 * sq;
                sens2 += 11 * sq / 2;
            }
            temp -= t2;
            off -= off2;
            sens -= sens2;
        }

        let p = (((d1 as i64 * sens) >> 21) - off) >> 15;
        (temp as i32, p as i32)
    }
}

/// Latest MS5611 measurement
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ms5611Reading {
    /// Temperature in °C
    pub temperature: f32,
    /// Barometric pressure in hPa
    pub pressure: f32,
    pub valid: bool,
}

impl Reading for Ms5611Reading {
    fn valid(&self) -> bool {
        self.valid
    }
}

/// MS5611 driver
#[derive(Default)]
pub struct Ms5611 {
    address: u8,
    initialized: bool,
    prom: Prom,
    osr: Osr,
}

impl Ms5611 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver with a fixed oversampling ratio
    #[cfg(feature = "ms5611-config")]
    pub fn with_oversampling(osr: Osr) -> Self {
        Self {
            osr,
            ..Self::default()
        }
    }

    fn read_adc<B: I2cBus, D: DelayMs>(
        &self,
        bus: &mut B,
        delay: &mut D,
        convert: u8,
    ) -> Result<u32, Error<B::Error>> {
        bus.write(self.address, &[convert + self.osr.command_offset()])?;
        delay.delay_ms(self.osr.conversion_ms());
        let mut buf = [0u8; 3];
        bus.write_read(self.address, &[cmd::ADC_READ], &mut buf)?;
        Ok(u32::from_be_bytes([0, buf[0], buf[1], buf[2]]))
    }
}

impl Driver for Ms5611 {
    type Reading = Ms5611Reading;

    fn driver_id(&self) -> &'static str {
        "ms5611"
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

        bus.write(address, &[cmd::RESET])?;
        delay.delay_ms(RESET_DELAY_MS);

        let mut prom = Prom::default();
        for (i, word) in prom.words.iter_mut().enumerate() {
            let mut buf = [0u8; 2];
            bus.write_read(address, &[cmd::PROM_READ + (i as u8) * 2], &mut buf)?;
            *word = u16::from_be_bytes(buf);
        }
        if !prom.plausible() {
            #[cfg(feature = "ms5611-log")]
            defmt::warn!("ms5611: blank PROM, chip absent or not an MS5611");
            return Err(Error::InvalidData);
        }

        self.prom = prom;
        self.initialized = true;
        Ok(())
    }

    fn deinit<B: I2cBus>(&mut self, _bus: &mut B) -> Result<(), Error<B::Error>> {
        // Nothing to quiesce: the chip idles between commands
        self.initialized = false;
        Ok(())
    }

    fn read<B: I2cBus, D: DelayMs>(&mut self, bus: &mut B, delay: &mut D) -> Ms5611Reading {
        if !self.initialized {
            return Ms5611Reading::default();
        }

        let d1 = match self.read_adc(bus, delay, cmd::CONVERT_D1) {
            Ok(v) => v,
            Err(_) => return Ms5611Reading::default(),
        };
        let d2 = match self.read_adc(bus, delay, cmd::CONVERT_D2) {
            Ok(v) => v,
            Err(_) => return Ms5611Reading::default(),
        };
        // An ADC read issued without a conversion returns 0
        if d1 == 0 || d2 == 0 {
            return Ms5611Reading::default();
        }

        let (temp, p) = self.prom.compensate(d1, d2);
        Ms5611Reading {
            temperature: temp as f32 / 100.0,
            pressure: p as f32 / 100.0,
            valid: true,
        }
    }

    fn schema(&self) -> Schema {
        Schema::new("ms5611", TIER, "environmental")
            .add_setting(
                "oversampling",
                ValueType::Enum(&["256", "512", "1024", "2048", "4096"]),
                false,
                "4096",
                "",
                None,
                None,
            )
            .add_signal("temperature", ValueType::Float, true, "°C")
            .add_signal("pressure", ValueType::Float, true, "hPa")
            .add_command("reset", "")
            .add_output(
                "pressure",
                ValueType::Float,
                "barometric pressure",
                "hPa",
                "10..1200",
            )
    }

    fn get_parameter(&self, name: &str) -> ParamString {
        let mut out = ParamString::new();
        if name.eq_ignore_ascii_case("oversampling") {
            let _ = out.push_str(self.osr.label());
        }
        out
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> bool {
        if !name.eq_ignore_ascii_case("oversampling") {
            return false;
        }
        self.osr = match value {
            "256" => Osr::Osr256,
            "512" => Osr::Osr512,
            "1024" => Osr::Osr1024,
            "2048" => Osr::Osr2048,
            "4096" => Osr::Osr4096,
            _ => return false,
        };
        true
    }
}

/// Command map exposed through the facade
///
/// PROM words and the ADC result are big-endian. Reading a conversion
/// opcode through the facade is not meaningful, so the convert commands
/// are write-only with no payload; the ADC result is a separate
/// read-only entry.
#[cfg(feature = "ms5611-regs")]
pub const REGISTERS: &[RegisterDesc] = &[
    RegisterDesc::new(cmd::ADC_READ as u16, "ADC", 3, Access::ReadOnly, 0x0000),
    RegisterDesc::new(cmd::RESET as u16, "RESET", 0, Access::WriteOnly, 0x0000),
    RegisterDesc::new(cmd::CONVERT_D1 as u16, "CONVERT_D1", 0, Access::WriteOnly, 0x0000),
    RegisterDesc::new(cmd::CONVERT_D2 as u16, "CONVERT_D2", 0, Access::WriteOnly, 0x0000),
    RegisterDesc::new(0xA0, "PROM_FACTORY", 2, Access::ReadOnly, 0x0000),
    RegisterDesc::new(0xA2, "PROM_C1", 2, Access::ReadOnly, 0x0000),
    RegisterDesc::new(0xA4, "PROM_C2", 2, Access::ReadOnly, 0x0000),
    RegisterDesc::new(0xA6, "PROM_C3", 2, Access::ReadOnly, 0x0000),
];

#[cfg(feature = "ms5611-regs")]
impl RegisterAccess for Ms5611 {
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
        delay: &mut D,
        desc: &RegisterDesc,
        _data: &[u8],
    ) -> Result<(), Error<B::Error>> {
        bus.write(self.address, &[desc.addr as u8])?;
        if desc.addr as u8 == cmd::RESET {
            delay.delay_ms(RESET_DELAY_MS);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(feature = "ms5611-regs")]
    use argus_core::register::table_is_wellformed;
    use argus_hal::mock::{Expect, MockBus, MockDelay};

    /// Datasheet example PROM (C1..C6 in words 1..6)
    fn example_prom() -> Prom {
        Prom {
            words: [0, 40127, 36924, 23317, 23282, 33464, 28312, 0],
        }
    }

    #[test]
    fn compensation_matches_datasheet_vector() {
        let (temp, p) = example_prom().compensate(9_085_466, 8_569_150);
        assert_eq!(temp, 2007); // 20.07 °C
        assert_eq!(p, 100_009); // 1000.09 hPa
    }

    #[test]
    fn second_order_branch_below_20c() {
        // D2 below the 20 °C reference point exercises the second-order
        // correction path
        let (temp, p) = example_prom().compensate(6_465_444, 8_388_607);
        assert_eq!(temp, 1384); // 13.84 °C
        assert_eq!(p, 49_309); // 493.09 hPa
    }

    fn prom_word(w: u16) -> [u8; 2] {
        w.to_be_bytes()
    }

    fn init_script(addr: u8) -> [Expect; 9] {
        let w = example_prom().words;
        [
            Expect::write(addr, &[cmd::RESET]),
            Expect::write_read(addr, &[0xA0], &prom_word(w[0])),
            Expect::write_read(addr, &[0xA2], &prom_word(w[1])),
            Expect::write_read(addr, &[0xA4], &prom_word(w[2])),
            Expect::write_read(addr, &[0xA6], &prom_word(w[3])),
            Expect::write_read(addr, &[0xA8], &prom_word(w[4])),
            Expect::write_read(addr, &[0xAA], &prom_word(w[5])),
            Expect::write_read(addr, &[0xAC], &prom_word(w[6])),
            Expect::write_read(addr, &[0xAE], &prom_word(w[7])),
        ]
    }

    #[test]
    fn init_reads_prom_and_read_converts() {
        let mut drv = Ms5611::new();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new(init_script(0x77));
        drv.init(&mut bus, &mut delay, 0x77).unwrap();
        assert!(drv.is_initialized());
        bus.done();

        // OSR 4096 by default: D1 = 0x48, D2 = 0x58
        let mut bus = MockBus::new([
            Expect::write(0x77, &[0x48]),
            Expect::write_read(0x77, &[0x00], &9_085_466u32.to_be_bytes()[1..]),
            Expect::write(0x77, &[0x58]),
            Expect::write_read(0x77, &[0x00], &8_569_150u32.to_be_bytes()[1..]),
        ]);
        let r = drv.read(&mut bus, &mut delay);
        assert!(r.valid);
        assert!((r.temperature - 20.07).abs() < 0.001);
        assert!((r.pressure - 1000.09).abs() < 0.001);
        assert!(delay.total_ms >= RESET_DELAY_MS + 2 * 10);
        bus.done();
    }

    #[test]
    fn blank_prom_refuses_init() {
        let mut drv = Ms5611::new();
        let mut delay = MockDelay::default();
        let mut script = heapless::Vec::<Expect, 9>::new();
        script.push(Expect::write(0x76, &[cmd::RESET])).ok();
        for i in 0..8u8 {
            script
                .push(Expect::write_read(0x76, &[0xA0 + i * 2], &[0xFF, 0xFF]))
                .ok();
        }
        let mut bus = MockBus::new(script);
        assert_eq!(
            drv.init(&mut bus, &mut delay, 0x76),
            Err(Error::InvalidData)
        );
        assert!(!drv.is_initialized());

        let mut bus = MockBus::empty();
        assert!(!drv.read(&mut bus, &mut delay).valid);
        assert_eq!(bus.transactions(), 0);
    }

    #[test]
    fn oversampling_parameter_round_trip() {
        let mut drv = Ms5611::new();
        assert_eq!(drv.get_parameter("oversampling").as_str(), "4096");
        assert!(drv.set_parameter("oversampling", "256"));
        assert_eq!(drv.get_parameter("OVERSAMPLING").as_str(), "256");
        assert!(!drv.set_parameter("oversampling", "123"));
        assert!(!drv.set_parameter("nope", "1"));
        assert_eq!(drv.get_parameter("nope").as_str(), "");
    }

    #[cfg(feature = "ms5611-regs")]
    #[test]
    fn command_style_facade() {
        assert!(table_is_wellformed(REGISTERS));

        let mut drv = Ms5611::new();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new(init_script(0x77));
        drv.init(&mut bus, &mut delay, 0x77).unwrap();

        // Payload-less command: a reset through the facade
        let mut bus = MockBus::new([Expect::write(0x77, &[cmd::RESET])]);
        drv.reg_write(&mut bus, &mut delay, cmd::RESET as u16, &[])
            .unwrap();
        bus.done();

        // PROM word through the facade, big-endian as on the wire
        let mut bus = MockBus::new([Expect::write_read(0x77, &[0xA2], &[0x9C, 0xBF])]);
        let mut buf = [0u8; 2];
        drv.reg_read(&mut bus, &mut delay, 0xA2, &mut buf).unwrap();
        assert_eq!(u16::from_be_bytes(buf), 40127);
        bus.done();
    }
}
