//! The uniform driver contract
//!
//! Every chip driver in the catalog presents this same surface so hosts
//! can treat drivers polymorphically. A driver instance owns its bus
//! address, an initialized flag and any chip-specific calibration state;
//! the transport and delay are borrowed per operation because the bus is
//! shared property of the host.
//!
//! # State machine
//!
//! ```text
//! Unconfigured --init ok--> Operational
//! Unconfigured <--init err-- (unchanged)
//! Operational --deinit--> Unconfigured
//! ```
//!
//! In Unconfigured state every data and register operation fails fast
//! without touching the bus.

use argus_hal::{DelayMs, I2cBus};

use crate::error::Error;
use crate::schema::Schema;

/// Maximum length of a parameter-bag value
pub const MAX_PARAM_LEN: usize = 32;

/// String value returned by the parameter bag
pub type ParamString = heapless::String<MAX_PARAM_LEN>;

/// Chip-specific measurement record
///
/// Created fresh on each read, owned by the caller, never retained by
/// the driver. `Default` must produce a record with `valid() == false`.
pub trait Reading: Default {
    /// Did the read complete and pass the chip's own validity checks?
    fn valid(&self) -> bool;
}

/// Uniform contract implemented by every chip driver
pub trait Driver {
    /// Measurement record produced by [`Driver::read`]
    type Reading: Reading;

    /// Short ASCII driver tag, e.g. `"bme280"`
    fn driver_id(&self) -> &'static str;

    /// Compile-time capability tier label, surfaced verbatim in the schema
    fn tier(&self) -> &'static str;

    /// Broad chip class: `"environmental"`, `"light"`, `"touch"`, ...
    fn category(&self) -> &'static str;

    /// I2C addresses this chip can appear at
    fn valid_addresses(&self) -> &'static [u8];

    /// Is `address` one this chip can appear at?
    fn supports_address(&self, address: u8) -> bool {
        self.valid_addresses().contains(&address)
    }

    /// True iff `init` has completed successfully and `deinit` has not
    /// since been called
    fn is_initialized(&self) -> bool;

    /// Bring the chip up at `address`
    ///
    /// Verifies chip presence (identity register where the chip has
    /// one), performs any datasheet reset sequence with its mandated
    /// delay, reads factory calibration, and applies configuration when
    /// the driver is compiled with its configuration tier. On failure
    /// the driver stays Unconfigured.
    fn init<B: I2cBus, D: DelayMs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
        address: u8,
    ) -> Result<(), Error<B::Error>>;

    /// Quiesce the chip and return to Unconfigured
    ///
    /// Issues the chip's power-down/stop write exactly once; calling
    /// `deinit` on an uninitialized driver is a no-op that touches no
    /// bus.
    fn deinit<B: I2cBus>(&mut self, bus: &mut B) -> Result<(), Error<B::Error>>;

    /// Read the latest measurement
    ///
    /// Returns an invalid record whenever the driver is uninitialized
    /// (zero bus I/O in that case), any transport step fails, or the
    /// chip reports no new data.
    fn read<B: I2cBus, D: DelayMs>(&mut self, bus: &mut B, delay: &mut D) -> Self::Reading;

    /// Capability schema for host introspection
    ///
    /// Content is a pure function of the compile-time tier.
    fn schema(&self) -> Schema;

    /// String-keyed knob surface for rarely tuned options
    ///
    /// Unknown names yield the empty string. Most drivers leave this
    /// default in place.
    fn get_parameter(&self, _name: &str) -> ParamString {
        ParamString::new()
    }

    /// Set a string-keyed knob; `false` for unknown names or bad values
    fn set_parameter(&mut self, _name: &str, _value: &str) -> bool {
        false
    }
}
