//! I2C chip driver catalog
//!
//! One driver per supported chip, each implementing the uniform
//! [`argus_core::Driver`] contract (and, where compiled in, the
//! [`argus_core::RegisterAccess`] facade):
//!
//! - Environmental: BME280, MS5611, SHT31, HTU21D, SGP30
//! - Optical/UV: TSL2561, BH1750, VEML6070
//! - Proximity: APDS9960
//! - Touch: MPR121
//! - Switch/output: TCA9548A, MCP4725, PCA9685
//! - Stubs awaiting real bring-up: PN532, SC16IS752, AMG8833
//!
//! Drivers are compiled in per chip through cargo features; see the
//! crate manifest for the tier scheme. [`AnyDriver`] wraps whichever
//! set is compiled in behind a single tagged-variant type for generic
//! dispatch.
//!
//! Drivers never own the bus: every operation borrows the transport and
//! delay. When a TCA9548A multiplexer sits between the controller and a
//! sensor, the host must select the channel before calling into the
//! sensor's driver; the catalog provides the mux as a first-class
//! driver but never schedules channel switching.

#![no_std]
#![deny(unsafe_code)]

pub mod env;
pub mod light;
pub mod output;
pub mod prox;
#[cfg(any(feature = "pn532", feature = "sc16is752", feature = "amg8833"))]
pub mod stub;
pub mod touch;

mod catalog;

pub use catalog::{AnyDriver, AnyReading};
