//! PCA9685 16-channel 12-bit PWM controller
//!
//! The prescaler register only accepts writes while the oscillator is
//! asleep, so frequency changes are a sleep / write / wake / restart
//! dance. Channel updates use the auto-increment mode to set all four
//! on/off bytes in one transmission.

use argus_core::driver::{Driver, ParamString, Reading};
use argus_core::error::Error;
use argus_core::schema::{Schema, ValueType};
use argus_hal::{DelayMs, I2cBus};

#[cfg(feature = "pca9685-regs")]
use argus_core::register::{Access, RegisterAccess, RegisterDesc};

/// I2C addresses with all straps low through 0x47; higher straps exist
/// but collide with other chips in this catalog
pub const ADDRESSES: &[u8] = &[0x40, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47];

/// Compile-time capability tier
pub const TIER: &str = if cfg!(feature = "pca9685-regs") {
    "full"
} else if cfg!(feature = "pca9685-config") {
    "config"
} else {
    "minimal"
};

/// Register map
pub mod reg {
    pub const MODE1: u8 = 0x00;
    pub const MODE2: u8 = 0x01;
    /// Channel N on-low byte at LED0_ON_L + 4N
    pub const LED0_ON_L: u8 = 0x06;
    pub const PRESCALE: u8 = 0xFE;
}

// MODE1 bits
const RESTART: u8 = 0x80;
const AI: u8 = 0x20;
const SLEEP: u8 = 0x10;

/// Internal oscillator
const OSC_HZ: u32 = 25_000_000;

/// Oscillator wake-up time (datasheet: 500 µs)
const WAKE_DELAY_MS: u32 = 1;

pub const CHANNELS: u8 = 16;
pub const MAX_DUTY: u16 = 0x0FFF;

/// Prescale register value for a target update frequency
pub fn prescale_for_hz(freq_hz: u32) -> u8 {
    let steps = 4096 * freq_hz;
    let value = (OSC_HZ + steps / 2) / steps;
    (value - 1).clamp(3, 255) as u8
}

/// Latest PCA9685 state
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pca9685Reading {
    /// Live prescale register
    pub prescale: u8,
    /// Oscillator is asleep, outputs frozen
    pub sleeping: bool,
    pub valid: bool,
}

impl Reading for Pca9685Reading {
    fn valid(&self) -> bool {
        self.valid
    }
}

/// PCA9685 driver
pub struct Pca9685 {
    address: u8,
    initialized: bool,
    frequency_hz: u32,
}

impl Default for Pca9685 {
    fn default() -> Self {
        Self {
            address: 0,
            initialized: false,
            // Chip default prescale of 30 is roughly 200 Hz
            frequency_hz: 200,
        }
    }
}

impl Pca9685 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver with a PWM frequency programmed during `init`
    #[cfg(feature = "pca9685-config")]
    pub fn with_frequency(frequency_hz: u32) -> Self {
        Self {
            frequency_hz,
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

    /// Set one channel's on/off tick counts (0..4095 each)
    pub fn set_channel<B: I2cBus>(
        &mut self,
        bus: &mut B,
        channel: u8,
        on: u16,
        off: u16,
    ) -> Result<(), Error<B::Error>> {
        if !self.initialized {
            return Err(Error::Uninitialized);
        }
        if channel >= CHANNELS || on > MAX_DUTY || off > MAX_DUTY {
            return Err(Error::InvalidData);
        }
        let base = reg::LED0_ON_L + 4 * channel;
        bus.write(
            self.address,
            &[
                base,
                on as u8,
                (on >> 8) as u8,
                off as u8,
                (off >> 8) as u8,
            ],
        )?;
        Ok(())
    }

    /// Shorthand for a plain duty cycle starting at tick 0
    pub fn set_duty<B: I2cBus>(
        &mut self,
        bus: &mut B,
        channel: u8,
        duty: u16,
    ) -> Result<(), Error<B::Error>> {
        self.set_channel(bus, channel, 0, duty)
    }
}

impl Driver for Pca9685 {
    type Reading = Pca9685Reading;

    fn driver_id(&self) -> &'static str {
        "pca9685"
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
        delay: &mut D,
        address: u8,
    ) -> Result<(), Error<B::Error>> {
        self.initialized = false;
        self.address = address;

        // No identity register; the MODE1 readback is the presence check
        let _ = self.read_reg(bus, reg::MODE1)?;

        #[cfg(feature = "pca9685-config")]
        {
            // Prescale writes require SLEEP
            self.write_reg(bus, reg::MODE1, AI | SLEEP)?;
            self.write_reg(bus, reg::PRESCALE, prescale_for_hz(self.frequency_hz))?;
        }

        self.write_reg(bus, reg::MODE1, AI)?;
        delay.delay_ms(WAKE_DELAY_MS);
        self.write_reg(bus, reg::MODE1, AI | RESTART)?;

        self.initialized = true;
        Ok(())
    }

    fn deinit<B: I2cBus>(&mut self, bus: &mut B) -> Result<(), Error<B::Error>> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;
        self.write_reg(bus, reg::MODE1, SLEEP)?;
        Ok(())
    }

    fn read<B: I2cBus, D: DelayMs>(&mut self, bus: &mut B, _delay: &mut D) -> Pca9685Reading {
        if !self.initialized {
            return Pca9685Reading::default();
        }

        let mode1 = match self.read_reg(bus, reg::MODE1) {
            Ok(v) => v,
            Err(_) => return Pca9685Reading::default(),
        };
        let prescale = match self.read_reg(bus, reg::PRESCALE) {
            Ok(v) => v,
            Err(_) => return Pca9685Reading::default(),
        };

        Pca9685Reading {
            prescale,
            sleeping: mode1 & SLEEP != 0,
            valid: true,
        }
    }

    fn schema(&self) -> Schema {
        Schema::new("pca9685", TIER, "output")
            .add_setting(
                "frequency",
                ValueType::Int,
                false,
                "200",
                "Hz",
                Some(24.0),
                Some(1526.0),
            )
            .add_signal("prescale", ValueType::Int, true, "")
            .add_command("set_duty", "channel 0-15, duty 0-4095")
            .add_output(
                "duty",
                ValueType::Int,
                "per-channel PWM duty in oscillator ticks",
                "ticks",
                "0..4095",
            )
    }

    fn get_parameter(&self, name: &str) -> ParamString {
        let mut out = ParamString::new();
        if name.eq_ignore_ascii_case("frequency") {
            use core::fmt::Write;
            let _ = write!(out, "{}", self.frequency_hz);
        }
        out
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> bool {
        if !name.eq_ignore_ascii_case("frequency") {
            return false;
        }
        match value.parse::<u32>() {
            Ok(hz) if (24..=1526).contains(&hz) => {
                self.frequency_hz = hz;
                true
            }
            _ => false,
        }
    }
}

/// Register table exposed through the facade (first channel only; the
/// other fifteen follow the same 4-byte stride)
#[cfg(feature = "pca9685-regs")]
pub const REGISTERS: &[RegisterDesc] = &[
    RegisterDesc::new(reg::MODE1 as u16, "MODE1", 1, Access::ReadWrite, 0x0011),
    RegisterDesc::new(reg::MODE2 as u16, "MODE2", 1, Access::ReadWrite, 0x0004),
    RegisterDesc::new(reg::LED0_ON_L as u16, "LED0_ON_L", 1, Access::ReadWrite, 0x0000),
    RegisterDesc::new(0x07, "LED0_ON_H", 1, Access::ReadWrite, 0x0000),
    RegisterDesc::new(0x08, "LED0_OFF_L", 1, Access::ReadWrite, 0x0000),
    RegisterDesc::new(0x09, "LED0_OFF_H", 1, Access::ReadWrite, 0x0000),
    RegisterDesc::new(reg::PRESCALE as u16, "PRESCALE", 1, Access::ReadWrite, 0x001E),
];

#[cfg(feature = "pca9685-regs")]
impl RegisterAccess for Pca9685 {
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

#[cfg(test)]
mod tests {
    use super::*;
    use argus_hal::mock::{Expect, MockBus, MockDelay};

    #[test]
    fn prescale_datasheet_values() {
        // Servo rate and the chip's power-on default
        assert_eq!(prescale_for_hz(50), 121);
        assert_eq!(prescale_for_hz(200), 30);
        // Clamped at both ends
        assert_eq!(prescale_for_hz(10_000), 3);
        assert_eq!(prescale_for_hz(20), 255);
    }

    fn init_script(addr: u8, freq_hz: u32) -> heapless::Vec<Expect, 6> {
        let mut v = heapless::Vec::new();
        v.push(Expect::write_read(addr, &[reg::MODE1], &[0x11])).ok();
        if cfg!(feature = "pca9685-config") {
            v.push(Expect::write(addr, &[reg::MODE1, AI | SLEEP])).ok();
            v.push(Expect::write(addr, &[reg::PRESCALE, prescale_for_hz(freq_hz)]))
                .ok();
        }
        v.push(Expect::write(addr, &[reg::MODE1, AI])).ok();
        v.push(Expect::write(addr, &[reg::MODE1, AI | RESTART])).ok();
        v
    }

    fn operational(addr: u8) -> Pca9685 {
        let mut drv = Pca9685::new();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new(init_script(addr, 200));
        drv.init(&mut bus, &mut delay, addr).unwrap();
        assert!(delay.total_ms >= WAKE_DELAY_MS);
        bus.done();
        drv
    }

    #[test]
    fn init_wakes_and_restarts() {
        let drv = operational(0x40);
        assert!(drv.is_initialized());
    }

    #[cfg(feature = "pca9685-config")]
    #[test]
    fn servo_frequency_programs_prescaler_asleep() {
        let mut drv = Pca9685::with_frequency(50);
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new(init_script(0x41, 50));
        drv.init(&mut bus, &mut delay, 0x41).unwrap();
        bus.done();
        assert_eq!(drv.get_parameter("frequency").as_str(), "50");
    }

    #[test]
    fn set_channel_uses_auto_increment() {
        let mut drv = operational(0x40);
        // Channel 3, on at tick 0, off at tick 0x01FF
        let mut bus = MockBus::new([Expect::write(
            0x40,
            &[0x12, 0x00, 0x00, 0xFF, 0x01],
        )]);
        drv.set_channel(&mut bus, 3, 0, 0x01FF).unwrap();
        bus.done();
    }

    #[test]
    fn bad_channel_or_duty_touches_no_bus() {
        let mut drv = operational(0x40);
        let mut bus = MockBus::empty();
        assert_eq!(
            drv.set_channel(&mut bus, 16, 0, 0),
            Err(Error::InvalidData)
        );
        assert_eq!(
            drv.set_duty(&mut bus, 0, 0x1000),
            Err(Error::InvalidData)
        );
        assert_eq!(bus.transactions(), 0);
    }

    #[test]
    fn read_reports_prescale_and_sleep_state() {
        let mut drv = operational(0x40);
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new([
            Expect::write_read(0x40, &[reg::MODE1], &[AI]),
            Expect::write_read(0x40, &[reg::PRESCALE], &[30]),
        ]);
        let r = drv.read(&mut bus, &mut delay);
        assert!(r.valid);
        assert_eq!(r.prescale, 30);
        assert!(!r.sleeping);
        bus.done();
    }

    #[test]
    fn deinit_sleeps_exactly_once() {
        let mut drv = operational(0x40);
        let mut bus = MockBus::new([Expect::write(0x40, &[reg::MODE1, SLEEP])]);
        drv.deinit(&mut bus).unwrap();
        bus.done();

        let mut bus = MockBus::empty();
        drv.deinit(&mut bus).unwrap();
        assert_eq!(bus.transactions(), 0);
    }

    #[test]
    fn frequency_parameter_validates_range() {
        let mut drv = Pca9685::new();
        assert!(drv.set_parameter("frequency", "50"));
        assert!(!drv.set_parameter("frequency", "2000"));
        assert!(!drv.set_parameter("frequency", "abc"));
        assert_eq!(drv.get_parameter("frequency").as_str(), "50");
    }
}
