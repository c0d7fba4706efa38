//! Proximity and gesture sensors

#[cfg(feature = "apds9960")]
pub mod apds9960;
