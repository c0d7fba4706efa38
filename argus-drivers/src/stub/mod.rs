//! Catalogued chips whose bring-up is not implemented yet
//!
//! These drivers keep their catalog slot, addresses and schema so hosts
//! can enumerate them, but `init` always refuses with
//! [`Error::Unsupported`] and the schema carries the incomplete marker.
//! Claiming success and then returning garbage would be worse than an
//! honest refusal.

use argus_core::driver::Reading;

#[cfg(feature = "amg8833")]
pub mod amg8833;
#[cfg(feature = "pn532")]
pub mod pn532;
#[cfg(feature = "sc16is752")]
pub mod sc16is752;

/// Reading type shared by all stubs; never valid
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StubReading;

impl Reading for StubReading {
    fn valid(&self) -> bool {
        false
    }
}

/// One stub driver per chip, differing only in identity and schema
macro_rules! stub_driver {
    (
        $(#[$meta:meta])*
        $name:ident, $id:literal, $category:literal, $addresses:expr
    ) => {
        $(#[$meta])*
        #[derive(Default)]
        pub struct $name {
            _private: (),
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }
        }

        impl argus_core::driver::Driver for $name {
            type Reading = crate::stub::StubReading;

            fn driver_id(&self) -> &'static str {
                $id
            }

            fn tier(&self) -> &'static str {
                "minimal"
            }

            fn category(&self) -> &'static str {
                $category
            }

            fn valid_addresses(&self) -> &'static [u8] {
                $addresses
            }

            fn is_initialized(&self) -> bool {
                false
            }

            fn init<B: argus_hal::I2cBus, D: argus_hal::DelayMs>(
                &mut self,
                _bus: &mut B,
                _delay: &mut D,
                _address: u8,
            ) -> Result<(), argus_core::error::Error<B::Error>> {
                Err(argus_core::error::Error::Unsupported)
            }

            fn deinit<B: argus_hal::I2cBus>(
                &mut self,
                _bus: &mut B,
            ) -> Result<(), argus_core::error::Error<B::Error>> {
                Ok(())
            }

            fn read<B: argus_hal::I2cBus, D: argus_hal::DelayMs>(
                &mut self,
                _bus: &mut B,
                _delay: &mut D,
            ) -> Self::Reading {
                crate::stub::StubReading
            }

            fn schema(&self) -> argus_core::schema::Schema {
                argus_core::schema::Schema::new($id, "minimal", $category).incomplete()
            }
        }
    };
}

pub(crate) use stub_driver;

#[cfg(all(test, feature = "pn532"))]
mod tests {
    use super::pn532::Pn532;
    use argus_core::driver::{Driver, Reading};
    use argus_core::error::Error;
    use argus_hal::mock::{MockBus, MockDelay};

    #[test]
    fn stub_refuses_init_without_bus_io() {
        let mut drv = Pn532::new();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::empty();
        assert_eq!(
            drv.init(&mut bus, &mut delay, 0x24),
            Err(Error::Unsupported)
        );
        assert!(!drv.is_initialized());
        assert_eq!(bus.transactions(), 0);
    }

    #[test]
    fn stub_schema_is_marked_incomplete() {
        let s = Pn532::new().schema();
        assert!(s.incomplete);
        assert_eq!(s.driver_id, "pn532");
    }

    #[test]
    fn stub_read_is_never_valid() {
        let mut drv = Pn532::new();
        let mut delay = MockDelay::default();
        let mut bus = MockBus::empty();
        assert!(!drv.read(&mut bus, &mut delay).valid());
        assert_eq!(bus.transactions(), 0);
    }
}
