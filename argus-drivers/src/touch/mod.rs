//! Capacitive touch controllers

#[cfg(feature = "mpr121")]
pub mod mpr121;
