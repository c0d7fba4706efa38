//! Platform packs
//!
//! A platform pack hides the host microcontroller behind a capability and
//! policy surface: what peripherals exist, which GPIO pins are safe to
//! hand out, what persistence is available, and how to sleep or reset.
//!
//! Exactly one pack is selected at build time through a `platform-*`
//! feature; [`active`] returns it as a process-wide singleton. Firmware
//! built without a platform feature gets `None` and is expected to cope.
//!
//! Pin-validity queries are advisory - the drivers never enforce pin
//! usage themselves.

/// Host microcontroller family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlatformKind {
    Esp32,
    Esp8266,
    Rp2040,
}

/// Cause of the most recent reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResetReason {
    PowerOn,
    External,
    Software,
    Watchdog,
    DeepSleepWake,
    Brownout,
    #[default]
    Unknown,
}

/// Capability and policy surface of the host microcontroller
///
/// Implementations are cheap value-less singletons; all answers are
/// compile-time facts about the host family. Sleep and reset entry
/// points have no-op defaults so packs for hosts without an attached
/// SDK (or without sleep support at all) stay honest: they return
/// `false` rather than pretending to have slept.
pub trait Platform {
    /// Host family
    fn kind(&self) -> PlatformKind;

    /// Human-readable platform name
    fn name(&self) -> &'static str;

    /// Platform pack revision string
    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Wi-Fi radio present
    fn has_wifi(&self) -> bool;
    /// Bluetooth radio present
    fn has_bluetooth(&self) -> bool;
    /// I2C controller present
    fn has_i2c(&self) -> bool {
        true
    }
    /// SPI controller present
    fn has_spi(&self) -> bool {
        true
    }
    /// ADC present
    fn has_adc(&self) -> bool;
    /// Hardware PWM present
    fn has_pwm(&self) -> bool;

    /// Heap free for the application, in bytes
    ///
    /// Packs without an attached SDK cannot ask the allocator, so they
    /// answer with the family's on-chip RAM as the upper bound; board
    /// support crates override this with a live figure.
    fn heap_free(&self) -> u32;
    /// Typical flash size for the family, in bytes
    fn flash_size(&self) -> u32;

    /// Number of GPIO pins (valid pin numbers are `0..count`)
    fn gpio_count(&self) -> u8;

    /// Is `pin` a pin number that exists on this host?
    fn is_valid_pin(&self, pin: u8) -> bool {
        pin < self.gpio_count()
    }

    /// Is `pin` safe for general use?
    ///
    /// Excludes pins wired to the flash chip and strapping pins whose
    /// level at reset selects a boot mode. Always implies
    /// [`is_valid_pin`](Platform::is_valid_pin).
    fn is_safe_pin(&self, pin: u8) -> bool;

    /// Key-value NVS partition available
    fn has_nvs(&self) -> bool;
    /// EEPROM (or emulation) available
    fn has_eeprom(&self) -> bool;
    /// Mountable filesystem available
    fn has_filesystem(&self) -> bool;

    /// Any sleep mode supported
    fn supports_sleep(&self) -> bool;

    /// Enter light sleep for `ms` milliseconds
    ///
    /// Returns `false` when the host (or this pack) cannot sleep.
    fn enter_light_sleep(&self, _ms: u32) -> bool {
        false
    }

    /// Enter deep sleep for `ms` milliseconds
    ///
    /// Returns `false` when the host (or this pack) cannot sleep.
    fn enter_deep_sleep(&self, _ms: u32) -> bool {
        false
    }

    /// Request a software reset
    ///
    /// Default is a no-op for packs without an attached SDK; board
    /// support crates override this with the real reset call.
    fn soft_reset(&self) {}

    /// Cause of the most recent reset, where the host exposes it
    fn reset_reason(&self) -> ResetReason {
        ResetReason::Unknown
    }
}

/// ESP32 platform pack
///
/// GPIO 6-11 are wired to the embedded flash; GPIO 0, 2, 5, 12 and 15
/// are strapping pins. Neither group is safe for general use.
pub struct Esp32;

impl Platform for Esp32 {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Esp32
    }

    fn name(&self) -> &'static str {
        "ESP32"
    }

    fn has_wifi(&self) -> bool {
        true
    }

    fn has_bluetooth(&self) -> bool {
        true
    }

    fn has_adc(&self) -> bool {
        true
    }

    fn has_pwm(&self) -> bool {
        true
    }

    fn heap_free(&self) -> u32 {
        320 * 1024
    }

    fn flash_size(&self) -> u32 {
        4 * 1024 * 1024
    }

    fn gpio_count(&self) -> u8 {
        40
    }

    fn is_safe_pin(&self, pin: u8) -> bool {
        if !self.is_valid_pin(pin) {
            return false;
        }
        // Flash pins
        if (6..=11).contains(&pin) {
            return false;
        }
        // Strapping pins
        !matches!(pin, 0 | 2 | 5 | 12 | 15)
    }

    fn has_nvs(&self) -> bool {
        true
    }

    fn has_eeprom(&self) -> bool {
        // NVS-backed emulation
        true
    }

    fn has_filesystem(&self) -> bool {
        true
    }

    fn supports_sleep(&self) -> bool {
        true
    }
}

/// ESP8266 platform pack
///
/// GPIO 6-11 are wired to the flash chip; GPIO 0, 2 and 15 are
/// strapping pins.
pub struct Esp8266;

impl Platform for Esp8266 {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Esp8266
    }

    fn name(&self) -> &'static str {
        "ESP8266"
    }

    fn has_wifi(&self) -> bool {
        true
    }

    fn has_bluetooth(&self) -> bool {
        false
    }

    fn has_adc(&self) -> bool {
        // Single ADC channel (TOUT)
        true
    }

    fn has_pwm(&self) -> bool {
        // Software PWM only, but present as a capability
        true
    }

    fn heap_free(&self) -> u32 {
        80 * 1024
    }

    fn flash_size(&self) -> u32 {
        4 * 1024 * 1024
    }

    fn gpio_count(&self) -> u8 {
        17
    }

    fn is_safe_pin(&self, pin: u8) -> bool {
        if !self.is_valid_pin(pin) {
            return false;
        }
        if (6..=11).contains(&pin) {
            return false;
        }
        !matches!(pin, 0 | 2 | 15)
    }

    fn has_nvs(&self) -> bool {
        false
    }

    fn has_eeprom(&self) -> bool {
        true
    }

    fn has_filesystem(&self) -> bool {
        true
    }

    fn supports_sleep(&self) -> bool {
        // Deep sleep only, and only with GPIO16 wired to RST
        true
    }
}

/// RP2040 platform pack
///
/// All 30 user GPIOs are general purpose; the QSPI flash pins are not
/// part of the GPIO numbering.
pub struct Rp2040;

impl Platform for Rp2040 {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Rp2040
    }

    fn name(&self) -> &'static str {
        "RP2040"
    }

    fn has_wifi(&self) -> bool {
        false
    }

    fn has_bluetooth(&self) -> bool {
        false
    }

    fn has_adc(&self) -> bool {
        true
    }

    fn has_pwm(&self) -> bool {
        true
    }

    fn heap_free(&self) -> u32 {
        264 * 1024
    }

    fn flash_size(&self) -> u32 {
        2 * 1024 * 1024
    }

    fn gpio_count(&self) -> u8 {
        30
    }

    fn is_safe_pin(&self, pin: u8) -> bool {
        self.is_valid_pin(pin)
    }

    fn has_nvs(&self) -> bool {
        false
    }

    fn has_eeprom(&self) -> bool {
        false
    }

    fn has_filesystem(&self) -> bool {
        false
    }

    fn supports_sleep(&self) -> bool {
        false
    }
}

#[cfg(feature = "platform-esp32")]
static ACTIVE: Esp32 = Esp32;
#[cfg(all(feature = "platform-esp8266", not(feature = "platform-esp32")))]
static ACTIVE: Esp8266 = Esp8266;
#[cfg(all(
    feature = "platform-rp2040",
    not(any(feature = "platform-esp32", feature = "platform-esp8266"))
))]
static ACTIVE: Rp2040 = Rp2040;

/// The platform pack selected at build time
///
/// Returns `None` when the firmware was built without a `platform-*`
/// feature. The pack is a process-wide singleton; it is never
/// reconstructed.
pub fn active() -> Option<&'static dyn Platform> {
    #[cfg(any(
        feature = "platform-esp32",
        feature = "platform-esp8266",
        feature = "platform-rp2040"
    ))]
    {
        Some(&ACTIVE)
    }
    #[cfg(not(any(
        feature = "platform-esp32",
        feature = "platform-esp8266",
        feature = "platform-rp2040"
    )))]
    {
        None
    }
}
