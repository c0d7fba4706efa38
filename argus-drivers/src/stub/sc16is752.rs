//! SC16IS752 dual UART bridge (stub)
//!
//! Bridged UART traffic needs a streaming surface the one-shot reading
//! model does not offer; until that exists the driver refuses `init`.

use crate::stub::stub_driver;

stub_driver!(
    /// SC16IS752 stub driver
    Sc16is752,
    "sc16is752",
    "bridge",
    &[0x48, 0x49, 0x4A, 0x4B, 0x4C, 0x4D]
);
