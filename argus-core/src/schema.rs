//! Capability schema
//!
//! A structured, machine-readable description of what one driver offers,
//! independent of its chip: configuration settings, measurement signals,
//! side-effecting commands and structured outputs, plus the driver tag,
//! compile-time tier label and broad category.
//!
//! The schema is a value object an external collaborator can walk;
//! serialization is a host concern and out of scope here. Content is a
//! pure function of the compile-time tier and never changes at runtime.

use heapless::Vec;

/// Maximum entries per schema list
pub const MAX_ENTRIES: usize = 8;

/// Value type of a setting or signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ValueType {
    Bool,
    Int,
    Float,
    Str,
    /// Enumeration with its allowed value set
    Enum(&'static [&'static str]),
}

/// Named, typed configuration slot (read-only at runtime)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Setting {
    pub name: &'static str,
    pub ty: ValueType,
    pub required: bool,
    /// Build-time default, rendered as a string
    pub default: &'static str,
    /// Free-form short unit string ("°C", "hPa", "lux", ...)
    pub unit: &'static str,
    pub min: Option<f32>,
    pub max: Option<f32>,
}

/// Named measurement output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Signal {
    pub name: &'static str,
    pub ty: ValueType,
    pub readable: bool,
    pub unit: &'static str,
}

/// Named side-effecting action with zero or one string argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Command {
    pub name: &'static str,
    /// Hint describing the optional argument; empty for none
    pub arg_hint: &'static str,
}

/// Named structured output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Output {
    pub name: &'static str,
    pub ty: ValueType,
    pub description: &'static str,
    pub unit: &'static str,
    /// Documented range, rendered as a string ("0..4095", "-40..85")
    pub range: &'static str,
}

/// One driver's external contract
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Schema {
    /// Short ASCII driver tag
    pub driver_id: &'static str,
    /// Compile-time tier label ("minimal", "config", "full")
    pub tier: &'static str,
    /// Broad chip class
    pub category: &'static str,
    /// Driver is a stub that refuses `init`
    pub incomplete: bool,
    pub settings: Vec<Setting, MAX_ENTRIES>,
    pub signals: Vec<Signal, MAX_ENTRIES>,
    pub commands: Vec<Command, MAX_ENTRIES>,
    pub outputs: Vec<Output, MAX_ENTRIES>,
}

impl Schema {
    /// Empty schema for one driver
    pub fn new(driver_id: &'static str, tier: &'static str, category: &'static str) -> Self {
        Self {
            driver_id,
            tier,
            category,
            ..Self::default()
        }
    }

    /// Mark this driver as a stub that refuses `init`
    pub fn incomplete(mut self) -> Self {
        self.incomplete = true;
        self
    }

    /// Add a configuration slot
    ///
    /// Entries past capacity are silently dropped; tables are small by
    /// construction.
    #[allow(clippy::too_many_arguments)]
    pub fn add_setting(
        mut self,
        name: &'static str,
        ty: ValueType,
        required: bool,
        default: &'static str,
        unit: &'static str,
        min: Option<f32>,
        max: Option<f32>,
    ) -> Self {
        let _ = self.settings.push(Setting {
            name,
            ty,
            required,
            default,
            unit,
            min,
            max,
        });
        self
    }

    /// Add a measurement signal
    pub fn add_signal(
        mut self,
        name: &'static str,
        ty: ValueType,
        readable: bool,
        unit: &'static str,
    ) -> Self {
        let _ = self.signals.push(Signal {
            name,
            ty,
            readable,
            unit,
        });
        self
    }

    /// Add a command
    pub fn add_command(mut self, name: &'static str, arg_hint: &'static str) -> Self {
        let _ = self.commands.push(Command { name, arg_hint });
        self
    }

    /// Add a structured output
    pub fn add_output(
        mut self,
        name: &'static str,
        ty: ValueType,
        description: &'static str,
        unit: &'static str,
        range: &'static str,
    ) -> Self {
        let _ = self.outputs.push(Output {
            name,
            ty,
            description,
            unit,
            range,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_assembles_all_lists() {
        let s = Schema::new("bme280", "full", "environmental")
            .add_setting(
                "oversampling",
                ValueType::Enum(&["x1", "x2", "x4", "x8", "x16"]),
                false,
                "x1",
                "",
                None,
                None,
            )
            .add_signal("temperature", ValueType::Float, true, "°C")
            .add_signal("humidity", ValueType::Float, true, "%RH")
            .add_command("reset", "")
            .add_output("pressure", ValueType::Float, "barometric pressure", "hPa", "300..1100");

        assert_eq!(s.driver_id, "bme280");
        assert_eq!(s.tier, "full");
        assert_eq!(s.category, "environmental");
        assert!(!s.incomplete);
        assert_eq!(s.settings.len(), 1);
        assert_eq!(s.signals.len(), 2);
        assert_eq!(s.commands.len(), 1);
        assert_eq!(s.outputs.len(), 1);
        assert_eq!(s.signals[1].unit, "%RH");
    }

    #[test]
    fn overflow_is_dropped_not_panicking() {
        let mut s = Schema::new("x", "minimal", "test");
        for _ in 0..(MAX_ENTRIES + 4) {
            s = s.add_command("cmd", "");
        }
        assert_eq!(s.commands.len(), MAX_ENTRIES);
    }

    #[test]
    fn incomplete_marker() {
        let s = Schema::new("pn532", "minimal", "nfc").incomplete();
        assert!(s.incomplete);
    }
}
