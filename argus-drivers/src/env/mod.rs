//! Environmental sensors: temperature, humidity, pressure, gas

#[cfg(feature = "bme280")]
pub mod bme280;
#[cfg(feature = "htu21d")]
pub mod htu21d;
#[cfg(feature = "ms5611")]
pub mod ms5611;
#[cfg(feature = "sgp30")]
pub mod sgp30;
#[cfg(feature = "sht31")]
pub mod sht31;

/// CRC-8 used by the Sensirion command protocol (SHT3x, SGP30)
///
/// Polynomial 0x31, init 0xFF, no reflection. The datasheet check
/// value is CRC(0xBEEF) = 0x92.
#[cfg(any(feature = "sht31", feature = "sgp30"))]
pub(crate) fn sensirion_crc8(data: &[u8]) -> u8 {
    let mut crc = 0xFFu8;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}
