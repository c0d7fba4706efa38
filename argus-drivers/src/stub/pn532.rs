//! PN532 NFC controller (stub)
//!
//! The PN532's frame protocol with host-ready handshaking does not fit
//! the plain register model yet; until a real bring-up lands the driver
//! refuses `init`.

use crate::stub::stub_driver;

stub_driver!(
    /// PN532 stub driver
    Pn532,
    "pn532",
    "nfc",
    &[0x24]
);
