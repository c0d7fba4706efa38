//! Output and bus-switch devices

#[cfg(feature = "mcp4725")]
pub mod mcp4725;
#[cfg(feature = "pca9685")]
pub mod pca9685;
#[cfg(feature = "tca9548a")]
pub mod tca9548a;
