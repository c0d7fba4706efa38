//! TCA9548A 8-channel I2C multiplexer
//!
//! A single control byte selects which downstream channels are wired to
//! the upstream bus. The driver owns only channel selection; devices
//! behind the mux keep their own drivers and addresses, and the host is
//! responsible for selecting a channel before talking to them.

use argus_core::driver::{Driver, ParamString, Reading};
use argus_core::error::Error;
use argus_core::schema::{Schema, ValueType};
use argus_hal::{DelayMs, I2cBus};

#[cfg(feature = "tca9548a-regs")]
use argus_core::register::{Access, RegisterAccess, RegisterDesc};

/// I2C addresses (three address straps)
pub const ADDRESSES: &[u8] = &[0x70, 0x71, 0x72, 0x73, 0x74, 0x75, 0x76, 0x77];

/// Compile-time capability tier
pub const TIER: &str = if cfg!(feature = "tca9548a-regs") {
    "full"
} else {
    "minimal"
};

pub const CHANNELS: u8 = 8;

/// Latest mux state
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tca9548aReading {
    /// Bit N set when channel N is connected
    pub mask: u8,
    pub valid: bool,
}

impl Reading for Tca9548aReading {
    fn valid(&self) -> bool {
        self.valid
    }
}

/// TCA9548A driver
#[derive(Default)]
pub struct Tca9548a {
    address: u8,
    initialized: bool,
    mask: u8,
}

impl Tca9548a {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect exactly the channels in `mask`
    pub fn select_mask<B: I2cBus>(&mut self, bus: &mut B, mask: u8) -> Result<(), Error<B::Error>> {
        if !self.initialized {
            return Err(Error::Uninitialized);
        }
        bus.write(self.address, &[mask])?;
        self.mask = mask;
        Ok(())
    }

    /// Connect a single channel, disconnecting all others
    pub fn select_channel<B: I2cBus>(
        &mut self,
        bus: &mut B,
        channel: u8,
    ) -> Result<(), Error<B::Error>> {
        if channel >= CHANNELS {
            return Err(Error::InvalidData);
        }
        self.select_mask(bus, 1 << channel)
    }

    /// Disconnect every channel
    pub fn disconnect_all<B: I2cBus>(&mut self, bus: &mut B) -> Result<(), Error<B::Error>> {
        self.select_mask(bus, 0x00)
    }

    /// Last mask written
    pub fn selected_mask(&self) -> u8 {
        self.mask
    }
}

impl Driver for Tca9548a {
    type Reading = Tca9548aReading;

    fn driver_id(&self) -> &'static str {
        "tca9548a"
    }

    fn tier(&self) -> &'static str {
        TIER
    }

    fn category(&self) -> &'static str {
        "switch"
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
        _delay: &mut D,
        address: u8,
    ) -> Result<(), Error<B::Error>> {
        self.initialized = false;
        self.address = address;

        // All channels off; the acknowledged write doubles as the
        // presence check, there is nothing else to probe
        bus.write(address, &[0x00])?;
        let mut readback = [0u8; 1];
        bus.read(address, &mut readback)?;
        if readback[0] != 0x00 {
            #[cfg(feature = "tca9548a-log")]
            defmt::warn!("tca9548a: control readback 0x{:02x} after clear", readback[0]);
            return Err(Error::InvalidData);
        }

        self.mask = 0x00;
        self.initialized = true;
        Ok(())
    }

    fn deinit<B: I2cBus>(&mut self, bus: &mut B) -> Result<(), Error<B::Error>> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;
        // Leave the tree disconnected
        bus.write(self.address, &[0x00])?;
        self.mask = 0x00;
        Ok(())
    }

    fn read<B: I2cBus, D: DelayMs>(&mut self, bus: &mut B, _delay: &mut D) -> Tca9548aReading {
        if !self.initialized {
            return Tca9548aReading::default();
        }

        let mut buf = [0u8; 1];
        if bus.read(self.address, &mut buf).is_err() {
            return Tca9548aReading::default();
        }
        self.mask = buf[0];

        Tca9548aReading {
            mask: buf[0],
            valid: true,
        }
    }

    fn schema(&self) -> Schema {
        Schema::new("tca9548a", TIER, "switch")
            .add_signal("mask", ValueType::Int, true, "bitmask")
            .add_command("select", "channel 0-7 or mask 0x00-0xFF")
            .add_output(
                "mask",
                ValueType::Int,
                "connected downstream channels",
                "bitmask",
                "0..255",
            )
    }

    fn get_parameter(&self, name: &str) -> ParamString {
        let mut out = ParamString::new();
        if name.eq_ignore_ascii_case("channels") {
            use core::fmt::Write;
            // Bit count; the mask itself is in the reading
            let _ = write!(out, "{}", self.mask.count_ones());
        }
        out
    }
}

/// The single control register, exposed through the facade
#[cfg(feature = "tca9548a-regs")]
pub const REGISTERS: &[RegisterDesc] = &[RegisterDesc::new(
    0x00,
    "CONTROL",
    1,
    Access::ReadWrite,
    0x0000,
)];

#[cfg(feature = "tca9548a-regs")]
impl RegisterAccess for Tca9548a {
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
        _desc: &RegisterDesc,
        data: &[u8],
    ) -> Result<(), Error<B::Error>> {
        bus.write(self.address, &[data[0]])?;
        self.mask = data[0];
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_hal::mock::{Expect, MockBus, MockDelay};

    fn operational(addr: u8) -> Tca9548a {
        let mut drv = Tca9548a::new();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new([
            Expect::write(addr, &[0x00]),
            Expect::read(addr, &[0x00]),
        ]);
        drv.init(&mut bus, &mut delay, addr).unwrap();
        bus.done();
        drv
    }

    #[test]
    fn init_disconnects_all_channels() {
        let drv = operational(0x70);
        assert!(drv.is_initialized());
        assert_eq!(drv.selected_mask(), 0x00);
    }

    #[test]
    fn select_then_talk_downstream() {
        let mut mux = operational(0x70);
        // Channel 2 select followed by host traffic to a sensor behind
        // it, all on the same upstream bus
        let mut bus = MockBus::new([
            Expect::write(0x70, &[0x04]),
            Expect::write_read(0x44, &[0xF3, 0x2D], &[0x80, 0x10, 0xE1]),
        ]);
        mux.select_channel(&mut bus, 2).unwrap();
        assert_eq!(mux.selected_mask(), 0x04);

        let mut status = [0u8; 3];
        bus.write_read(0x44, &[0xF3, 0x2D], &mut status).unwrap();
        bus.done();
    }

    #[test]
    fn channel_out_of_range_touches_no_bus() {
        let mut mux = operational(0x70);
        let mut bus = MockBus::empty();
        assert_eq!(
            mux.select_channel(&mut bus, 8),
            Err(Error::InvalidData)
        );
        assert_eq!(bus.transactions(), 0);
    }

    #[test]
    fn select_requires_init() {
        let mut mux = Tca9548a::new();
        let mut bus = MockBus::empty();
        assert_eq!(mux.select_mask(&mut bus, 0xFF), Err(Error::Uninitialized));
        assert_eq!(bus.transactions(), 0);
    }

    #[test]
    fn read_reports_live_mask() {
        let mut mux = operational(0x71);
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new([Expect::read(0x71, &[0x81])]);
        let r = mux.read(&mut bus, &mut delay);
        assert!(r.valid);
        assert_eq!(r.mask, 0x81);
        assert_eq!(mux.selected_mask(), 0x81);
        bus.done();
    }

    #[test]
    fn deinit_disconnects_exactly_once() {
        let mut mux = operational(0x70);
        let mut bus = MockBus::new([Expect::write(0x70, &[0x00])]);
        mux.deinit(&mut bus).unwrap();
        bus.done();

        let mut bus = MockBus::empty();
        mux.deinit(&mut bus).unwrap();
        assert_eq!(bus.transactions(), 0);
    }

    #[cfg(feature = "tca9548a-regs")]
    #[test]
    fn facade_control_register() {
        use argus_core::register::table_is_wellformed;
        assert!(table_is_wellformed(REGISTERS));

        let mut mux = operational(0x70);
        let mut delay = MockDelay::default();
        let mut bus = MockBus::new([Expect::write(0x70, &[0x22])]);
        mux.reg_write(&mut bus, &mut delay, 0x00, &[0x22]).unwrap();
        assert_eq!(mux.selected_mask(), 0x22);
        bus.done();
    }
}
