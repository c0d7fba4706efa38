//! I2C bus abstractions
//!
//! Provides the transport trait the driver catalog is written against,
//! plus an adapter for any `embedded-hal` 1.0 I2C implementation.
//!
//! A [`I2cBus::write`] call is one committed transmission (start, payload,
//! stop); [`I2cBus::write_read`] is a write followed by a repeated-start
//! read. Drivers never hold the bus across operations - sharing and
//! serialization are the host's responsibility.

/// I2C bus master
///
/// Provides basic I2C read/write operations for communicating with
/// peripheral devices.
pub trait I2cBus {
    /// Error type for I2C operations
    type Error;

    /// Write data to a device at the given address
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `data` - Bytes to write
    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error>;

    /// Read data from a device at the given address
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `buf` - Buffer to read into
    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write then read in a single transaction (repeated start)
    ///
    /// This is commonly used to write a register address then read data.
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `write_data` - Bytes to write (typically register address)
    /// * `read_buf` - Buffer to read into
    fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Self::Error>;
}

/// Adapter exposing any `embedded-hal` 1.0 blocking I2C as an [`I2cBus`]
pub struct EhalBus<T>(pub T);

impl<T> EhalBus<T> {
    /// Wrap an `embedded-hal` I2C peripheral
    pub fn new(inner: T) -> Self {
        Self(inner)
    }

    /// Release the wrapped peripheral
    pub fn release(self) -> T {
        self.0
    }
}

impl<T: embedded_hal::i2c::I2c> I2cBus for EhalBus<T> {
    type Error = T::Error;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        self.0.write(address, data)
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.0.read(address, buf)
    }

    fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.0.write_read(address, write_data, read_buf)
    }
}
