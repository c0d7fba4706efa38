//! Optical sensors: ambient light and UV

#[cfg(feature = "bh1750")]
pub mod bh1750;
#[cfg(feature = "tsl2561")]
pub mod tsl2561;
#[cfg(feature = "veml6070")]
pub mod veml6070;
