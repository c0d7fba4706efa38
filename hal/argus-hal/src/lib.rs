//! Argus Hardware Abstraction Layer
//!
//! This crate defines the narrow hardware surface the Argus driver catalog
//! consumes: an I2C master, a millisecond delay, and a platform pack that
//! describes the host microcontroller. Chip-specific HALs (or the
//! `embedded-hal` adapters in [`i2c`] and [`delay`]) provide the
//! implementations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Host firmware                          │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  argus-drivers (chip catalog)           │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  argus-hal (this crate - traits)        │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ embedded-hal  │       │  board HAL    │
//! │   adapters    │       │  (custom)     │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`i2c::I2cBus`] - I2C master transactions
//! - [`delay::DelayMs`] - coarse blocking delay
//! - [`platform::Platform`] - host capabilities, pin policy, sleep/reset

#![no_std]
#![deny(unsafe_code)]

pub mod delay;
pub mod i2c;
pub mod platform;

#[cfg(feature = "mock")]
pub mod mock;

// Re-export key traits at crate root for convenience
pub use delay::DelayMs;
pub use i2c::I2cBus;
pub use platform::{Platform, PlatformKind, ResetReason};
