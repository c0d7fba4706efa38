//! Blocking delay abstraction
//!
//! Drivers use millisecond delays to honour datasheet reset and
//! conversion times (typically 10 ms for a reset, 10-30 ms for a
//! conversion, up to 402 ms for slow light sensors).

/// Coarse blocking millisecond delay
pub trait DelayMs {
    /// Block for at least `ms` milliseconds
    fn delay_ms(&mut self, ms: u32);
}

/// Adapter exposing any `embedded-hal` 1.0 delay as a [`DelayMs`]
pub struct EhalDelay<T>(pub T);

impl<T> EhalDelay<T> {
    /// Wrap an `embedded-hal` delay provider
    pub fn new(inner: T) -> Self {
        Self(inner)
    }
}

impl<T: embedded_hal::delay::DelayNs> DelayMs for EhalDelay<T> {
    fn delay_ms(&mut self, ms: u32) {
        self.0.delay_ms(ms);
    }
}

/// Delay that does nothing
///
/// Useful on hosts where driver timing is handled elsewhere, and in
/// tests where wall-clock waits are pointless.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDelay;

impl DelayMs for NoopDelay {
    fn delay_ms(&mut self, _ms: u32) {}
}
