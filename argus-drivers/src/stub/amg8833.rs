//! AMG8833 8x8 thermal camera (stub)
//!
//! The 64-pixel frame exceeds the fixed reading record sizes used by
//! this catalog; until a frame-sized reading lands the driver refuses
//! `init`.

use crate::stub::stub_driver;

stub_driver!(
    /// AMG8833 stub driver
    Amg8833,
    "amg8833",
    "thermal",
    &[0x68, 0x69]
);
