//! MPR121 12-channel capacitive touch controller
//!
//! Electrode configuration writes only stick in stop mode, so `init`
//! soft-resets the chip, configures thresholds while stopped and only
//! then enters run mode. The touch state is a 12-bit mask in the first
//! two registers.

use argus_core::driver::{Driver, Reading};
use argus_core::error::Error;
use argus_core::schema::{Schema, ValueType};
use argus_hal::{DelayMs, I2cBus};

#[cfg(feature = "mpr121-regs")]
use argus_core::register::{Access, RegisterAccess, RegisterDesc};

/// I2C addresses (ADDR strapped to GND / VDD / SDA / SCL)
pub const ADDRESSES: &[u8] = &[0x5A, 0x5B, 0x5C, 0x5D];

/// Compile-time capability tier
pub const TIER: &str = if cfg!(feature = "mpr121-regs") {
    "full"
} else if cfg!(feature = "mpr121-config") {
    "config"
} else {
    "minimal"
};

/// Register map
pub mod reg {
    pub const TOUCH_STATUS: u8 = 0x00;
    /// First electrode touch threshold; electrode N at 0x41 + 2N
    pub const E0_TOUCH_TH: u8 = 0x41;
    pub const CONFIG1: u8 = 0x5C;
    pub const CONFIG2: u8 = 0x5D;
    pub const ECR: u8 = 0x5E;
    pub const SOFTRESET: u8 = 0x80;
}

/// Soft reset magic value
const SOFTRESET_KEY: u8 = 0x63;

/// CONFIG2 value right after reset, used as the presence check
const CONFIG2_DEFAULT: u8 = 0x24;

/// Run mode: all 12 electrodes, baseline tracking on
const ECR_RUN: u8 = 0x8F;

/// Reset settling time
const RESET_DELAY_MS: u32 = 1;

const ELECTRODES: usize = 12;

/// Touch and release thresholds, applied per electrode during `init`
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mpr121Config {
    pub touch_threshold: u8,
    pub release_threshold: u8,
}

impl Default for Mpr121Config {
    fn default() -> Self {
        Self {
            touch_threshold: 12,
            release_threshold: 6,
        }
    }
}

/// Latest MPR121 touch state
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mpr121Reading {
    /// Bit N set when electrode N is touched
    pub touched: u16,
    pub valid: bool,
}

impl Mpr121Reading {
    pub fn is_touched(&self, electrode: u8) -> bool {
        electrode < ELECTRODES as u8 && self.touched & (1 << electrode) != 0
    }

    pub fn touch_count(&self) -> u32 {
        self.touched.count_ones()
    }
}

impl Reading for Mpr121Reading {
    fn valid(&self) -> bool {
        self.valid
    }
}

/// MPR121 driver
#[derive(Default)]
pub struct Mpr121 {
    address: u8,
    initialized: bool,
    #[cfg(feature = "mpr121-config")]
    config: Mpr121Config,
}

impl Mpr121 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver with custom thresholds, applied during `init`
    #[cfg(feature = "mpr121-config")]
    pub fn with_config(config: Mpr121Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    fn write_reg<B: I2cBus>(&self, bus: &mut B, reg: u8, value: u8) -> Result<(), Error<B::Error>> {
        bus.write(self.address, &[reg, value])?;
        Ok(())
    }
}

impl Driver for Mpr121 {
    type Reading = Mpr121Reading;

    fn driver_id(&self) -> &'static str {
        "mpr121"
    }

    fn tier(&self) -> &'static str {
        TIER
    }

    fn category(&self) -> &'static str {
        "touch"
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

        self.write_reg(bus, reg::SOFTRESET, SOFTRESET_KEY)?;
        delay.delay_ms(RESET_DELAY_MS);

        // No ID register; the post-reset CONFIG2 default is the
        // presence check
        let mut config2 = [0u8; 1];
        bus.write_read(address, &[reg::CONFIG2], &mut config2)?;
        if config2[0] != CONFIG2_DEFAULT {
            #[cfg(feature = "mpr121-log")]
            defmt::warn!(
                "mpr121: CONFIG2 0x{:02x} after reset, expected 0x{:02x}",
                config2[0],
                CONFIG2_DEFAULT
            );
            return Err(Error::IdMismatch {
                expected: CONFIG2_DEFAULT,
                found: config2[0],
            });
        }

        // Reset leaves the chip in stop mode, where thresholds may be
        // written
        #[cfg(feature = "mpr121-config")]
        for e in 0..ELECTRODES as u8 {
            self.write_reg(bus, reg::E0_TOUCH_TH + 2 * e, self.config.touch_threshold)?;
            self.write_reg(
                bus,
                reg::E0_TOUCH_TH + 2 * e + 1,
                self.config.release_threshold,
            )?;
        }

        self.write_reg(bus, reg::ECR, ECR_RUN)?;

        self.initialized = true;
        Ok(())
    }

    fn deinit<B: I2cBus>(&mut self, bus: &mut B) -> Result<(), Error<B::Error>> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;
        // Stop mode
        self.write_reg(bus, reg::ECR, 0x00)?;
        Ok(())
    }

    fn read<B: I2cBus, D: DelayMs>(&mut self, bus: &mut B, _delay: &mut D) -> Mpr121Reading {
        if !self.initialized {
            return Mpr121Reading::default();
        }

        let mut buf = [0u8; 2];
        if bus
            .write_read(self.address, &[reg::TOUCH_STATUS], &mut buf)
            .is_err()
        {
            return Mpr121Reading::default();
        }

        Mpr121Reading {
            touched: u16::from_le_bytes(buf) & 0x0FFF,
            valid: true,
        }
    }

    fn schema(&self) -> Schema {
        Schema::new("mpr121", TIER, "touch")
            .add_setting(
                "touch_threshold",
                ValueType::Int,
                false,
                "12",
                "counts",
                Some(0.0),
                Some(255.0),
            )
            .add_setting(
                "release_threshold",
                ValueType::Int,
                false,
                "6",
                "counts",
                Some(0.0),
                Some(255.0),
            )
            .add_signal("touched", ValueType::Int, true, "bitmask")
            .add_command("reset", "")
            .add_output(
                "touched",
                ValueType::Int,
                "12-bit electrode touch mask",
                "bitmask",
                "0..4095",
            )
    }
}

/// Register table exposed through the facade
#[cfg(feature = "mpr121-regs")]
pub const REGISTERS: &[RegisterDesc] = &[
    RegisterDesc::new(reg::TOUCH_STATUS as u16, "TOUCH_STATUS", 2, Access::ReadOnly, 0x0000),
    RegisterDesc::new(reg::E0_TOUCH_TH as u16, "E0_TOUCH_TH", 1, Access::ReadWrite, 0x0000),
    RegisterDesc::new(0x42, "E0_RELEASE_TH", 1, Access::ReadWrite, 0x0000),
    RegisterDesc::new(reg::CONFIG1 as u16, "CONFIG1", 1, Access::ReadWrite, 0x0010),
    RegisterDesc::new(reg::CONFIG2 as u16, "CONFIG2", 1, Access::ReadWrite, 0x0024),
    RegisterDesc::new(reg::ECR as u16, "ECR", 1, Access::ReadWrite, 0x0000),
    RegisterDesc::new(reg::SOFTRESET as u16, "SOFTRESET", 1, Access::WriteOnly, 0x0000),
];

#[cfg(feature = "mpr121-regs")]
impl RegisterAccess for Mpr121 {
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
        data: &[u8],
    ) -> Result<(), Error<B::Error>> {
        bus.write(self.address, &[desc.addr as u8, data[0]])?;
        if desc.addr as u8 == reg::SOFTRESET {
            delay.delay_ms(RESET_DELAY_MS);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(feature = "mpr121-regs")]
    use argus_core::register::table_is_wellformed;
    use argus_hal::mock::{Expect, MockBus, MockDelay};

    fn init_script(addr: u8) -> heapless::Vec<Expect, 28> {
        let mut v = heapless::Vec::new();
        v.push(Expect::write(addr, &[reg::SOFTRESET, SOFTRESET_KEY]))
            .ok();
        v.push(Expect::write_read(addr, &[reg::CONFIG2], &[CONFIG2_DEFAULT]))
            .ok();
        if cfg!(feature = "mpr121-config") {
            for e in 0..ELECTRODES as u8 {
                v.push(Expect::write(addr, &[0x41 + 2 * e, 12])).ok();
                v.push(Expect::write(addr, &[0x42 + 2 * e, 6])).ok();
            }
        }
        v.push(Expect::write(addr, &[reg::ECR, ECR_RUN])).ok();
        v
    }

    fn operational(addr: u8) -> Mpr121 {
        let mut drv = Mpr121::new();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new(init_script(addr));
        drv.init(&mut bus, &mut delay, addr).unwrap();
        bus.done();
        drv
    }

    #[test]
    fn init_resets_verifies_and_runs() {
        let drv = operational(0x5A);
        assert!(drv.is_initialized());
    }

    #[test]
    fn wrong_config2_refuses_init() {
        let mut drv = Mpr121::new();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new([
            Expect::write(0x5B, &[reg::SOFTRESET, SOFTRESET_KEY]),
            Expect::write_read(0x5B, &[reg::CONFIG2], &[0x00]),
        ]);
        assert_eq!(
            drv.init(&mut bus, &mut delay, 0x5B),
            Err(Error::IdMismatch {
                expected: 0x24,
                found: 0x00
            })
        );
        assert!(!drv.is_initialized());
    }

    #[test]
    fn read_masks_to_twelve_electrodes() {
        let mut drv = operational(0x5A);
        let mut delay = MockDelay::default();
        // Electrodes 0 and 9, upper four bits are overcurrent flags
        let mut bus = MockBus::new([Expect::write_read(
            0x5A,
            &[reg::TOUCH_STATUS],
            &[0x01, 0x82],
        )]);
        let r = drv.read(&mut bus, &mut delay);
        assert!(r.valid);
        assert_eq!(r.touched, 0x0201);
        assert!(r.is_touched(0));
        assert!(r.is_touched(9));
        assert!(!r.is_touched(1));
        assert_eq!(r.touch_count(), 2);
        bus.done();
    }

    #[test]
    fn deinit_enters_stop_mode_exactly_once() {
        let mut drv = operational(0x5A);
        let mut bus = MockBus::new([Expect::write(0x5A, &[reg::ECR, 0x00])]);
        drv.deinit(&mut bus).unwrap();
        bus.done();

        let mut bus = MockBus::empty();
        drv.deinit(&mut bus).unwrap();
        assert_eq!(bus.transactions(), 0);
    }

    #[test]
    fn uninitialized_read_touches_no_bus() {
        let mut drv = Mpr121::new();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::empty();
        assert!(!drv.read(&mut bus, &mut delay).valid);
        assert_eq!(bus.transactions(), 0);
    }

    #[cfg(feature = "mpr121-regs")]
    #[test]
    fn facade_soft_reset_is_one_transmission() {
        assert!(table_is_wellformed(REGISTERS));

        let mut drv = operational(0x5A);
        let mut delay = MockDelay::default();

        // Address and payload travel in a single write
        let mut bus = MockBus::new([Expect::write(0x5A, &[0x80, 0x63])]);
        drv.reg_write(&mut bus, &mut delay, reg::SOFTRESET as u16, &[SOFTRESET_KEY])
            .unwrap();
        bus.done();

        // SOFTRESET reads back nothing
        let mut bus = MockBus::empty();
        let mut buf = [0u8; 1];
        assert_eq!(
            drv.reg_read(&mut bus, &mut delay, reg::SOFTRESET as u16, &mut buf),
            Err(Error::AccessViolation)
        );
        assert_eq!(bus.transactions(), 0);
    }
}
