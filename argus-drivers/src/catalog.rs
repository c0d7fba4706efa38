//! Tagged-variant dispatch over the compiled-in driver set
//!
//! The driver contract has generic methods, so it cannot sit behind a
//! trait object. The chip set is closed at compile time, which makes an
//! enum the natural dispatch vehicle: one variant per compiled-in
//! driver, with uniform methods forwarding to the inner driver.

use argus_core::driver::{Driver, ParamString, Reading as _};
use argus_core::error::Error;
use argus_core::schema::Schema;
use argus_hal::{DelayMs, I2cBus};

#[cfg(any(
    feature = "bme280-regs",
    feature = "ms5611-regs",
    feature = "sht31-regs",
    feature = "sgp30-regs",
    feature = "tsl2561-regs",
    feature = "bh1750-regs",
    feature = "mpr121-regs",
    feature = "tca9548a-regs",
    feature = "pca9685-regs",
))]
use argus_core::register::RegisterAccess as _;

/// Whichever driver the host instantiated
pub enum AnyDriver {
    #[cfg(feature = "bme280")]
    Bme280(crate::env::bme280::Bme280),
    #[cfg(feature = "ms5611")]
    Ms5611(crate::env::ms5611::Ms5611),
    #[cfg(feature = "sht31")]
    Sht31(crate::env::sht31::Sht31),
    #[cfg(feature = "htu21d")]
    Htu21d(crate::env::htu21d::Htu21d),
    #[cfg(feature = "sgp30")]
    Sgp30(crate::env::sgp30::Sgp30),
    #[cfg(feature = "tsl2561")]
    Tsl2561(crate::light::tsl2561::Tsl2561),
    #[cfg(feature = "bh1750")]
    Bh1750(crate::light::bh1750::Bh1750),
    #[cfg(feature = "veml6070")]
    Veml6070(crate::light::veml6070::Veml6070),
    #[cfg(feature = "apds9960")]
    Apds9960(crate::prox::apds9960::Apds9960),
    #[cfg(feature = "mpr121")]
    Mpr121(crate::touch::mpr121::Mpr121),
    #[cfg(feature = "tca9548a")]
    Tca9548a(crate::output::tca9548a::Tca9548a),
    #[cfg(feature = "mcp4725")]
    Mcp4725(crate::output::mcp4725::Mcp4725),
    #[cfg(feature = "pca9685")]
    Pca9685(crate::output::pca9685::Pca9685),
    #[cfg(feature = "pn532")]
    Pn532(crate::stub::pn532::Pn532),
    #[cfg(feature = "sc16is752")]
    Sc16is752(crate::stub::sc16is752::Sc16is752),
    #[cfg(feature = "amg8833")]
    Amg8833(crate::stub::amg8833::Amg8833),
}

/// Reading produced by [`AnyDriver::read`]
#[derive(Debug, Clone, Copy)]
pub enum AnyReading {
    #[cfg(feature = "bme280")]
    Bme280(crate::env::bme280::Bme280Reading),
    #[cfg(feature = "ms5611")]
    Ms5611(crate::env::ms5611::Ms5611Reading),
    #[cfg(feature = "sht31")]
    Sht31(crate::env::sht31::Sht31Reading),
    #[cfg(feature = "htu21d")]
    Htu21d(crate::env::htu21d::Htu21dReading),
    #[cfg(feature = "sgp30")]
    Sgp30(crate::env::sgp30::Sgp30Reading),
    #[cfg(feature = "tsl2561")]
    Tsl2561(crate::light::tsl2561::Tsl2561Reading),
    #[cfg(feature = "bh1750")]
    Bh1750(crate::light::bh1750::Bh1750Reading),
    #[cfg(feature = "veml6070")]
    Veml6070(crate::light::veml6070::Veml6070Reading),
    #[cfg(feature = "apds9960")]
    Apds9960(crate::prox::apds9960::Apds9960Reading),
    #[cfg(feature = "mpr121")]
    Mpr121(crate::touch::mpr121::Mpr121Reading),
    #[cfg(feature = "tca9548a")]
    Tca9548a(crate::output::tca9548a::Tca9548aReading),
    #[cfg(feature = "mcp4725")]
    Mcp4725(crate::output::mcp4725::Mcp4725Reading),
    #[cfg(feature = "pca9685")]
    Pca9685(crate::output::pca9685::Pca9685Reading),
    #[cfg(any(feature = "pn532", feature = "sc16is752", feature = "amg8833"))]
    Stub(crate::stub::StubReading),
}

impl AnyReading {
    /// Did the underlying read complete and pass the chip's checks?
    pub fn valid(&self) -> bool {
        match self {
            #[cfg(feature = "bme280")]
            AnyReading::Bme280(r) => r.valid(),
            #[cfg(feature = "ms5611")]
            AnyReading::Ms5611(r) => r.valid(),
            #[cfg(feature = "sht31")]
            AnyReading::Sht31(r) => r.valid(),
            #[cfg(feature = "htu21d")]
            AnyReading::Htu21d(r) => r.valid(),
            #[cfg(feature = "sgp30")]
            AnyReading::Sgp30(r) => r.valid(),
            #[cfg(feature = "tsl2561")]
            AnyReading::Tsl2561(r) => r.valid(),
            #[cfg(feature = "bh1750")]
            AnyReading::Bh1750(r) => r.valid(),
            #[cfg(feature = "veml6070")]
            AnyReading::Veml6070(r) => r.valid(),
            #[cfg(feature = "apds9960")]
            AnyReading::Apds9960(r) => r.valid(),
            #[cfg(feature = "mpr121")]
            AnyReading::Mpr121(r) => r.valid(),
            #[cfg(feature = "tca9548a")]
            AnyReading::Tca9548a(r) => r.valid(),
            #[cfg(feature = "mcp4725")]
            AnyReading::Mcp4725(r) => r.valid(),
            #[cfg(feature = "pca9685")]
            AnyReading::Pca9685(r) => r.valid(),
            #[cfg(any(feature = "pn532", feature = "sc16is752", feature = "amg8833"))]
            AnyReading::Stub(r) => r.valid(),
        }
    }
}

/// Forward a uniform method call to whichever driver is inside
macro_rules! dispatch {
    ($self:expr, $drv:ident => $body:expr) => {
        match $self {
            #[cfg(feature = "bme280")]
            AnyDriver::Bme280($drv) => $body,
            #[cfg(feature = "ms5611")]
            AnyDriver::Ms5611($drv) => $body,
            #[cfg(feature = "sht31")]
            AnyDriver::Sht31($drv) => $body,
            #[cfg(feature = "htu21d")]
            AnyDriver::Htu21d($drv) => $body,
            #[cfg(feature = "sgp30")]
            AnyDriver::Sgp30($drv) => $body,
            #[cfg(feature = "tsl2561")]
            AnyDriver::Tsl2561($drv) => $body,
            #[cfg(feature = "bh1750")]
            AnyDriver::Bh1750($drv) => $body,
            #[cfg(feature = "veml6070")]
            AnyDriver::Veml6070($drv) => $body,
            #[cfg(feature = "apds9960")]
            AnyDriver::Apds9960($drv) => $body,
            #[cfg(feature = "mpr121")]
            AnyDriver::Mpr121($drv) => $body,
            #[cfg(feature = "tca9548a")]
            AnyDriver::Tca9548a($drv) => $body,
            #[cfg(feature = "mcp4725")]
            AnyDriver::Mcp4725($drv) => $body,
            #[cfg(feature = "pca9685")]
            AnyDriver::Pca9685($drv) => $body,
            #[cfg(feature = "pn532")]
            AnyDriver::Pn532($drv) => $body,
            #[cfg(feature = "sc16is752")]
            AnyDriver::Sc16is752($drv) => $body,
            #[cfg(feature = "amg8833")]
            AnyDriver::Amg8833($drv) => $body,
        }
    };
}

impl AnyDriver {
    /// Driver for a catalog tag, e.g. `"bme280"`
    pub fn from_id(id: &str) -> Option<Self> {
        #[cfg(feature = "bme280")]
        if id.eq_ignore_ascii_case("bme280") {
            return Some(Self::Bme280(crate::env::bme280::Bme280::new()));
        }
        #[cfg(feature = "ms5611")]
        if id.eq_ignore_ascii_case("ms5611") {
            return Some(Self::Ms5611(crate::env::ms5611::Ms5611::new()));
        }
        #[cfg(feature = "sht31")]
        if id.eq_ignore_ascii_case("sht31") {
            return Some(Self::Sht31(crate::env::sht31::Sht31::new()));
        }
        #[cfg(feature = "htu21d")]
        if id.eq_ignore_ascii_case("htu21d") {
            return Some(Self::Htu21d(crate::env::htu21d::Htu21d::new()));
        }
        #[cfg(feature = "sgp30")]
        if id.eq_ignore_ascii_case("sgp30") {
            return Some(Self::Sgp30(crate::env::sgp30::Sgp30::new()));
        }
        #[cfg(feature = "tsl2561")]
        if id.eq_ignore_ascii_case("tsl2561") {
            return Some(Self::Tsl2561(crate::light::tsl2561::Tsl2561::new()));
        }
        #[cfg(feature = "bh1750")]
        if id.eq_ignore_ascii_case("bh1750") {
            return Some(Self::Bh1750(crate::light::bh1750::Bh1750::new()));
        }
        #[cfg(feature = "veml6070")]
        if id.eq_ignore_ascii_case("veml6070") {
            return Some(Self::Veml6070(crate::light::veml6070::Veml6070::new()));
        }
        #[cfg(feature = "apds9960")]
        if id.eq_ignore_ascii_case("apds9960") {
            return Some(Self::Apds9960(crate::prox::apds9960::Apds9960::new()));
        }
        #[cfg(feature = "mpr121")]
        if id.eq_ignore_ascii_case("mpr121") {
            return Some(Self::Mpr121(crate::touch::mpr121::Mpr121::new()));
        }
        #[cfg(feature = "tca9548a")]
        if id.eq_ignore_ascii_case("tca9548a") {
            return Some(Self::Tca9548a(crate::output::tca9548a::Tca9548a::new()));
        }
        #[cfg(feature = "mcp4725")]
        if id.eq_ignore_ascii_case("mcp4725") {
            return Some(Self::Mcp4725(crate::output::mcp4725::Mcp4725::new()));
        }
        #[cfg(feature = "pca9685")]
        if id.eq_ignore_ascii_case("pca9685") {
            return Some(Self::Pca9685(crate::output::pca9685::Pca9685::new()));
        }
        #[cfg(feature = "pn532")]
        if id.eq_ignore_ascii_case("pn532") {
            return Some(Self::Pn532(crate::stub::pn532::Pn532::new()));
        }
        #[cfg(feature = "sc16is752")]
        if id.eq_ignore_ascii_case("sc16is752") {
            return Some(Self::Sc16is752(crate::stub::sc16is752::Sc16is752::new()));
        }
        #[cfg(feature = "amg8833")]
        if id.eq_ignore_ascii_case("amg8833") {
            return Some(Self::Amg8833(crate::stub::amg8833::Amg8833::new()));
        }
        let _ = id;
        None
    }

    pub fn driver_id(&self) -> &'static str {
        dispatch!(self, d => d.driver_id())
    }

    pub fn tier(&self) -> &'static str {
        dispatch!(self, d => d.tier())
    }

    pub fn category(&self) -> &'static str {
        dispatch!(self, d => d.category())
    }

    pub fn valid_addresses(&self) -> &'static [u8] {
        dispatch!(self, d => d.valid_addresses())
    }

    pub fn supports_address(&self, address: u8) -> bool {
        dispatch!(self, d => d.supports_address(address))
    }

    pub fn is_initialized(&self) -> bool {
        dispatch!(self, d => d.is_initialized())
    }

    pub fn schema(&self) -> Schema {
        dispatch!(self, d => d.schema())
    }

    pub fn get_parameter(&self, name: &str) -> ParamString {
        dispatch!(self, d => d.get_parameter(name))
    }

    pub fn set_parameter(&mut self, name: &str, value: &str) -> bool {
        dispatch!(self, d => d.set_parameter(name, value))
    }

    pub fn init<B: I2cBus, D: DelayMs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        address: u8,
    ) -> Result<(), Error<B::Error>> {
        dispatch!(self, d => d.init(bus, delay, address))
    }

    pub fn deinit<B: I2cBus>(&mut self, bus: &mut B) -> Result<(), Error<B::Error>> {
        dispatch!(self, d => d.deinit(bus))
    }

    pub fn read<B: I2cBus, D: DelayMs>(&mut self, bus: &mut B, delay: &mut D) -> AnyReading {
        match self {
            #[cfg(feature = "bme280")]
            AnyDriver::Bme280(d) => AnyReading::Bme280(d.read(bus, delay)),
            #[cfg(feature = "ms5611")]
            AnyDriver::Ms5611(d) => AnyReading::Ms5611(d.read(bus, delay)),
            #[cfg(feature = "sht31")]
            AnyDriver::Sht31(d) => AnyReading::Sht31(d.read(bus, delay)),
            #[cfg(feature = "htu21d")]
            AnyDriver::Htu21d(d) => AnyReading::Htu21d(d.read(bus, delay)),
            #[cfg(feature = "sgp30")]
            AnyDriver::Sgp30(d) => AnyReading::Sgp30(d.read(bus, delay)),
            #[cfg(feature = "tsl2561")]
            AnyDriver::Tsl2561(d) => AnyReading::Tsl2561(d.read(bus, delay)),
            #[cfg(feature = "bh1750")]
            AnyDriver::Bh1750(d) => AnyReading::Bh1750(d.read(bus, delay)),
            #[cfg(feature = "veml6070")]
            AnyDriver::Veml6070(d) => AnyReading::Veml6070(d.read(bus, delay)),
            #[cfg(feature = "apds9960")]
            AnyDriver::Apds9960(d) => AnyReading::Apds9960(d.read(bus, delay)),
            #[cfg(feature = "mpr121")]
            AnyDriver::Mpr121(d) => AnyReading::Mpr121(d.read(bus, delay)),
            #[cfg(feature = "tca9548a")]
            AnyDriver::Tca9548a(d) => AnyReading::Tca9548a(d.read(bus, delay)),
            #[cfg(feature = "mcp4725")]
            AnyDriver::Mcp4725(d) => AnyReading::Mcp4725(d.read(bus, delay)),
            #[cfg(feature = "pca9685")]
            AnyDriver::Pca9685(d) => AnyReading::Pca9685(d.read(bus, delay)),
            #[cfg(feature = "pn532")]
            AnyDriver::Pn532(d) => AnyReading::Stub(d.read(bus, delay)),
            #[cfg(feature = "sc16is752")]
            AnyDriver::Sc16is752(d) => AnyReading::Stub(d.read(bus, delay)),
            #[cfg(feature = "amg8833")]
            AnyDriver::Amg8833(d) => AnyReading::Stub(d.read(bus, delay)),
        }
    }

    /// Access-checked register read, for drivers compiled with their
    /// register tier; [`Error::Unsupported`] otherwise
    pub fn reg_read<B: I2cBus, D: DelayMs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        addr: u16,
        buf: &mut [u8],
    ) -> Result<(), Error<B::Error>> {
        match self {
            #[cfg(feature = "bme280-regs")]
            AnyDriver::Bme280(d) => d.reg_read(bus, delay, addr, buf),
            #[cfg(feature = "ms5611-regs")]
            AnyDriver::Ms5611(d) => d.reg_read(bus, delay, addr, buf),
            #[cfg(feature = "sht31-regs")]
            AnyDriver::Sht31(d) => d.reg_read(bus, delay, addr, buf),
            #[cfg(feature = "sgp30-regs")]
            AnyDriver::Sgp30(d) => d.reg_read(bus, delay, addr, buf),
            #[cfg(feature = "tsl2561-regs")]
            AnyDriver::Tsl2561(d) => d.reg_read(bus, delay, addr, buf),
            #[cfg(feature = "bh1750-regs")]
            AnyDriver::Bh1750(d) => d.reg_read(bus, delay, addr, buf),
            #[cfg(feature = "mpr121-regs")]
            AnyDriver::Mpr121(d) => d.reg_read(bus, delay, addr, buf),
            #[cfg(feature = "tca9548a-regs")]
            AnyDriver::Tca9548a(d) => d.reg_read(bus, delay, addr, buf),
            #[cfg(feature = "pca9685-regs")]
            AnyDriver::Pca9685(d) => d.reg_read(bus, delay, addr, buf),
            _ => {
                let _ = (bus, delay, addr, buf);
                Err(Error::Unsupported)
            }
        }
    }

    /// Access-checked register write; mirror of [`AnyDriver::reg_read`]
    pub fn reg_write<B: I2cBus, D: DelayMs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        addr: u16,
        data: &[u8],
    ) -> Result<(), Error<B::Error>> {
        match self {
            #[cfg(feature = "bme280-regs")]
            AnyDriver::Bme280(d) => d.reg_write(bus, delay, addr, data),
            #[cfg(feature = "ms5611-regs")]
            AnyDriver::Ms5611(d) => d.reg_write(bus, delay, addr, data),
            #[cfg(feature = "sht31-regs")]
            AnyDriver::Sht31(d) => d.reg_write(bus, delay, addr, data),
            #[cfg(feature = "sgp30-regs")]
            AnyDriver::Sgp30(d) => d.reg_write(bus, delay, addr, data),
            #[cfg(feature = "tsl2561-regs")]
            AnyDriver::Tsl2561(d) => d.reg_write(bus, delay, addr, data),
            #[cfg(feature = "bh1750-regs")]
            AnyDriver::Bh1750(d) => d.reg_write(bus, delay, addr, data),
            #[cfg(feature = "mpr121-regs")]
            AnyDriver::Mpr121(d) => d.reg_write(bus, delay, addr, data),
            #[cfg(feature = "tca9548a-regs")]
            AnyDriver::Tca9548a(d) => d.reg_write(bus, delay, addr, data),
            #[cfg(feature = "pca9685-regs")]
            AnyDriver::Pca9685(d) => d.reg_write(bus, delay, addr, data),
            _ => {
                let _ = (bus, delay, addr, data);
                Err(Error::Unsupported)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_hal::mock::{Expect, MockBus, MockDelay};

    #[test]
    fn unknown_id_yields_none() {
        assert!(AnyDriver::from_id("nonexistent").is_none());
    }

    #[cfg(feature = "sht31")]
    #[test]
    fn dispatch_drives_a_full_lifecycle() {
        let mut drv = AnyDriver::from_id("SHT31").unwrap();
        assert_eq!(drv.driver_id(), "sht31");
        assert_eq!(drv.category(), "environmental");
        assert!(drv.supports_address(0x44));
        assert!(!drv.supports_address(0x29));
        assert!(!drv.is_initialized());

        let mut delay = MockDelay::default();
        let mut bus = MockBus::new([
            Expect::write(0x44, &[0x30, 0xA2]),
            Expect::write_read(0x44, &[0xF3, 0x2D], &[0x80, 0x10, 0xE1]),
        ]);
        drv.init(&mut bus, &mut delay, 0x44).unwrap();
        assert!(drv.is_initialized());
        bus.done();

        let mut bus = MockBus::new([
            Expect::write(0x44, &[0x24, 0x00]),
            Expect::read(0x44, &[0x66, 0x66, 0x93, 0x80, 0x00, 0xA2]),
        ]);
        let r = drv.read(&mut bus, &mut delay);
        assert!(r.valid());
        match r {
            AnyReading::Sht31(inner) => {
                assert!((inner.temperature - 25.0).abs() < 0.01);
            }
            _ => panic!("wrong reading variant"),
        }
        bus.done();

        let mut bus = MockBus::empty();
        drv.deinit(&mut bus).unwrap();
        assert!(!drv.is_initialized());
    }

    #[cfg(feature = "htu21d")]
    #[test]
    fn register_access_without_the_tier_is_unsupported() {
        let mut drv = AnyDriver::from_id("htu21d").unwrap();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::empty();
        let mut buf = [0u8; 1];
        assert_eq!(
            drv.reg_read(&mut bus, &mut delay, 0xE7, &mut buf),
            Err(Error::Unsupported)
        );
        assert_eq!(
            drv.reg_write(&mut bus, &mut delay, 0xE6, &[0]),
            Err(Error::Unsupported)
        );
        assert_eq!(bus.transactions(), 0);
    }

    #[cfg(feature = "mpr121-regs")]
    #[test]
    fn register_access_dispatches_with_the_tier() {
        let mut drv = AnyDriver::from_id("mpr121").unwrap();
        let mut delay = MockDelay::default();

        let mut bus = MockBus::empty();
        let mut buf = [0u8; 2];
        // Checks still run through the facade: uninitialized fails fast
        assert_eq!(
            drv.reg_read(&mut bus, &mut delay, 0x00, &mut buf),
            Err(Error::Uninitialized)
        );
        assert_eq!(bus.transactions(), 0);
    }

    #[cfg(feature = "pn532")]
    #[test]
    fn stub_refuses_init_through_dispatch() {
        let mut drv = AnyDriver::from_id("pn532").unwrap();
        assert!(drv.schema().incomplete);

        let mut delay = MockDelay::default();
        let mut bus = MockBus::empty();
        assert_eq!(
            drv.init(&mut bus, &mut delay, 0x24),
            Err(Error::Unsupported)
        );
        assert_eq!(bus.transactions(), 0);
    }

    #[cfg(all(feature = "tca9548a", feature = "bh1750"))]
    #[test]
    fn mux_and_sensor_share_one_bus() {
        let mut mux = AnyDriver::from_id("tca9548a").unwrap();
        let mut sensor = AnyDriver::from_id("bh1750").unwrap();
        let mut delay = MockDelay::default();

        // Bring up the mux, route channel 0, then bring up the sensor
        // behind it; the host owns the ordering, the catalog does not
        // schedule anything
        let mut bus = MockBus::new([
            Expect::write(0x70, &[0x00]),
            Expect::read(0x70, &[0x00]),
            Expect::write(0x70, &[0x01]),
            Expect::write(0x23, &[0x01]),
            Expect::write(0x23, &[0x07]),
            Expect::write(0x23, &[0x10]),
        ]);
        mux.init(&mut bus, &mut delay, 0x70).unwrap();
        match &mut mux {
            AnyDriver::Tca9548a(inner) => inner.select_channel(&mut bus, 0).unwrap(),
            _ => panic!("wrong variant"),
        }
        sensor.init(&mut bus, &mut delay, 0x23).unwrap();
        bus.done();
    }
}
