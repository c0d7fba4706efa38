//! Shared error enumeration
//!
//! Every fallible driver operation reports one of these kinds. There is
//! deliberately no transient/permanent distinction and no retry state -
//! retry policy belongs to the caller, and a failed operation leaves the
//! driver exactly where it was.

/// Driver operation failure, generic over the transport error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Operation invoked before `init` or after `deinit`
    Uninitialized,
    /// Identity register returned an unexpected value
    IdMismatch {
        /// Value the datasheet promises
        expected: u8,
        /// Value the chip answered with
        found: u8,
    },
    /// Transport failure: no acknowledgement or short read
    Bus(E),
    /// Register operation disallowed by the descriptor's access class
    AccessViolation,
    /// Address not present in the driver's register table
    UnknownRegister(u16),
    /// Buffer length does not match the descriptor width
    LengthMismatch {
        /// Descriptor width in bytes
        expected: usize,
        /// Caller-supplied length
        got: usize,
    },
    /// Chip status reports no new data; benign, not a fault
    NotReady,
    /// Payload failed its checksum
    InvalidData,
    /// Operation not available on this driver or at this tier
    Unsupported,
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::Bus(e)
    }
}
