//! Board-agnostic driver infrastructure for the Argus catalog
//!
//! Everything a chip driver needs that is not chip-specific lives here:
//!
//! - [`error::Error`] - the shared failure enumeration
//! - [`register`] - register descriptors, table lookups and the
//!   access-checked register facade
//! - [`schema`] - the capability schema drivers publish for host
//!   introspection
//! - [`driver`] - the uniform contract every chip driver implements
//!
//! The design is strictly request/response: a driver operation issues
//! its transport calls synchronously and returns. No callbacks, no
//! interrupts, no background tasks.

#![no_std]
#![deny(unsafe_code)]

pub mod driver;
pub mod error;
pub mod register;
pub mod schema;

// Re-export key types at crate root for convenience
pub use driver::{Driver, ParamString, Reading};
pub use error::Error;
pub use register::{Access, RegisterAccess, RegisterDesc};
pub use schema::{Schema, ValueType};
