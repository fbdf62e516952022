//! Life support settings — consumption rates, grace periods, thresholds.
//!
//! Settings are a flat document of `KEY = number` pairs, loaded once at
//! startup. Loading is tolerant: a missing or unparseable required key is
//! logged and left at zero, an unknown key is logged and ignored, and the
//! simulation carries on in a degraded state rather than refusing to start.
//! Only a document that is not TOML at all is an error.
//!
//! All rates are per second, and are scaled by elapsed simulation time and
//! by crew count or seat count, never by frame count.

use serde::{Deserialize, Serialize};

use crate::error::LifeSupportResult;

/// Requests at or below this amount are treated as no-ops.
pub const EPSILON: f64 = 1e-8;

/// Built-in values for the optional keys, and the shipped required rates.
pub mod defaults {
    /// Liters of cabin air per seat.
    pub const AIR_PER_SEAT: f64 = 2000.0;
    /// CO2 fraction of cabin air that triggers a warning.
    pub const CO2_WARNING: f64 = 0.03;
    /// CO2 fraction of cabin air that kills the crew outright.
    pub const CO2_FATAL: f64 = 0.10;
    /// Coldest survivable cabin temperature (°C).
    pub const MIN_SAFE_TEMP: f64 = 5.0;
    /// Hottest survivable cabin temperature (°C).
    pub const MAX_SAFE_TEMP: f64 = 45.0;

    /// Hull ↔ air exchange rate (1/s). A tuning knob, not a physical constant.
    pub const WALL_COUPLING: f64 = 0.003;
    /// kg per liter of cabin air.
    pub const AIR_DENSITY: f64 = 0.001225;
    /// J/(kg·K).
    pub const AIR_SPECIFIC_HEAT: f64 = 1005.0;
    /// Smallest thermal mass a habitat's air may have (kg).
    pub const AIR_MASS_FLOOR: f64 = 5.0;
    /// kW released per L/s of CO2 absorbed by LiOH (21.4 kcal/mol).
    pub const REACTION_HEAT: f64 = 4.0;
    /// Total thermostat deadband width (°C).
    pub const THERMOSTAT_DEADBAND: f64 = 2.0;
    /// Time acceleration above which thermal runs on rails.
    pub const ON_RAILS_WARP: f64 = 100.0;
    /// Minimum elapsed seconds before a background vessel is processed.
    pub const BACKGROUND_INTERVAL: f64 = 1.0;
    /// Fraction of a power request that must be met for a device to run.
    pub const POWER_THRESHOLD: f64 = 0.99;

    pub const OXYGEN_RATE: f64 = 0.0068;
    pub const CO2_RATE: f64 = 0.0058;
    pub const FOOD_RATE: f64 = 0.000017;
    pub const WASTE_RATE: f64 = 0.0000017;
    pub const WATER_RATE: f64 = 0.000035;
    pub const WASTEWATER_RATE: f64 = 0.000038;
    pub const SCRUBBER_RATE: f64 = 0.0065;
    pub const LITHIUMHYDROXIDE_RATE: f64 = 0.0065;
    pub const SCRUBBER_EC_RATE: f64 = 0.01;
    pub const GRACE_OXYGEN: f64 = 120.0;
    pub const GRACE_WATER: f64 = 259_200.0;
    pub const GRACE_FOOD: f64 = 2_592_000.0;
    pub const GRACE_CLIMATE: f64 = 3600.0;
    pub const GRACE_TEMP: f64 = 1800.0;
    /// Metabolic heat per crew member (kW).
    pub const CREW_HEAT: f64 = 0.1;
}

/// Per-crew-member consumption and production rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionRates {
    pub oxygen: f64,
    pub co2: f64,
    pub food: f64,
    pub waste: f64,
    pub water: f64,
    pub wastewater: f64,
}

/// Per-seat scrubber rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrubberRates {
    /// Mechanical CO2 removal per seat.
    pub scrub_per_seat: f64,
    /// Reactant consumed per seat at full scrub rate.
    pub reactant_per_seat: f64,
    /// Electric charge per seat to run the fans.
    pub ec_per_seat: f64,
}

impl ScrubberRates {
    /// Reactant consumed per unit of CO2 removed (the stoichiometric ratio).
    ///
    /// Zero when the scrub rate is not configured.
    pub fn reactant_per_co2(&self) -> f64 {
        if self.scrub_per_seat > 0.0 {
            self.reactant_per_seat / self.scrub_per_seat
        } else {
            0.0
        }
    }
}

/// Seconds each hazard may persist before it is fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GracePeriods {
    pub oxygen: f64,
    pub water: f64,
    pub food: f64,
    pub climate: f64,
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CabinLimits {
    pub air_per_seat: f64,
    pub co2_warning: f64,
    pub co2_fatal: f64,
    pub min_safe_temp: f64,
    pub max_safe_temp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalConstants {
    pub wall_coupling: f64,
    pub air_density: f64,
    pub air_specific_heat: f64,
    pub air_mass_floor: f64,
    pub reaction_heat_per_unit: f64,
    pub thermostat_deadband: f64,
    pub on_rails_warp: f64,
}

/// Complete life support configuration. Read-only once the simulation starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifeSupportConfig {
    pub consumption: ConsumptionRates,
    pub scrubber: ScrubberRates,
    pub grace: GracePeriods,
    pub cabin: CabinLimits,
    pub thermal: ThermalConstants,
    /// Metabolic heat per crew member (kW).
    pub crew_heat_kw: f64,
    pub background_interval: f64,
    pub power_threshold: f64,
}

impl Default for LifeSupportConfig {
    fn default() -> Self {
        use defaults::*;
        Self {
            consumption: ConsumptionRates {
                oxygen: OXYGEN_RATE,
                co2: CO2_RATE,
                food: FOOD_RATE,
                waste: WASTE_RATE,
                water: WATER_RATE,
                wastewater: WASTEWATER_RATE,
            },
            scrubber: ScrubberRates {
                scrub_per_seat: SCRUBBER_RATE,
                reactant_per_seat: LITHIUMHYDROXIDE_RATE,
                ec_per_seat: SCRUBBER_EC_RATE,
            },
            grace: GracePeriods {
                oxygen: GRACE_OXYGEN,
                water: GRACE_WATER,
                food: GRACE_FOOD,
                climate: GRACE_CLIMATE,
                temperature: GRACE_TEMP,
            },
            cabin: CabinLimits {
                air_per_seat: AIR_PER_SEAT,
                co2_warning: CO2_WARNING,
                co2_fatal: CO2_FATAL,
                min_safe_temp: MIN_SAFE_TEMP,
                max_safe_temp: MAX_SAFE_TEMP,
            },
            thermal: ThermalConstants {
                wall_coupling: WALL_COUPLING,
                air_density: AIR_DENSITY,
                air_specific_heat: AIR_SPECIFIC_HEAT,
                air_mass_floor: AIR_MASS_FLOOR,
                reaction_heat_per_unit: REACTION_HEAT,
                thermostat_deadband: THERMOSTAT_DEADBAND,
                on_rails_warp: ON_RAILS_WARP,
            },
            crew_heat_kw: CREW_HEAT,
            background_interval: BACKGROUND_INTERVAL,
            power_threshold: POWER_THRESHOLD,
        }
    }
}

/// Keys that must be present in a settings document.
pub const REQUIRED_KEYS: [&str; 15] = [
    "OXYGEN_RATE",
    "CO2_RATE",
    "SCRUBBER_RATE",
    "FOOD_RATE",
    "WATER_RATE",
    "WASTE_RATE",
    "WASTEWATER_RATE",
    "LITHIUMHYDROXIDE_RATE",
    "SCRUBBER_EC_RATE",
    "GRACE_OXYGEN",
    "GRACE_WATER",
    "GRACE_FOOD",
    "GRACE_CLIMATE",
    "GRACE_TEMP",
    "CREW_HEAT",
];

/// Keys that fall back to a built-in default when absent.
pub const OPTIONAL_KEYS: [&str; 14] = [
    "AIR_PER_SEAT",
    "CO2_WARNING",
    "CO2_FATAL",
    "MIN_SAFE_TEMP",
    "MAX_SAFE_TEMP",
    "WALL_COUPLING",
    "AIR_DENSITY",
    "AIR_SPECIFIC_HEAT",
    "AIR_MASS_FLOOR",
    "REACTION_HEAT",
    "THERMOSTAT_DEADBAND",
    "ON_RAILS_WARP",
    "BACKGROUND_INTERVAL",
    "POWER_THRESHOLD",
];

/// A problem found while loading settings. Never fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingIssue {
    /// A required key was absent; it was set to zero.
    Missing(String),
    /// A key's value was not a finite number. Required keys drop to zero,
    /// optional keys keep their default.
    Invalid { key: String, value: String },
    /// A key nobody reads.
    Unknown(String),
}

/// One table of `KEY => field.path` pairs drives both settings accessors.
macro_rules! settings_fields {
    ($($key:literal => $($field:ident).+),* $(,)?) => {
        impl LifeSupportConfig {
            /// Mutable access to the value behind a settings key.
            fn slot_mut(&mut self, key: &str) -> Option<&mut f64> {
                match key {
                    $($key => Some(&mut self.$($field).+),)*
                    _ => None,
                }
            }

            /// Read the value behind a settings key.
            pub fn get(&self, key: &str) -> Option<f64> {
                match key {
                    $($key => Some(self.$($field).+),)*
                    _ => None,
                }
            }
        }
    };
}

settings_fields! {
    "OXYGEN_RATE" => consumption.oxygen,
    "CO2_RATE" => consumption.co2,
    "FOOD_RATE" => consumption.food,
    "WASTE_RATE" => consumption.waste,
    "WATER_RATE" => consumption.water,
    "WASTEWATER_RATE" => consumption.wastewater,
    "SCRUBBER_RATE" => scrubber.scrub_per_seat,
    "LITHIUMHYDROXIDE_RATE" => scrubber.reactant_per_seat,
    "SCRUBBER_EC_RATE" => scrubber.ec_per_seat,
    "GRACE_OXYGEN" => grace.oxygen,
    "GRACE_WATER" => grace.water,
    "GRACE_FOOD" => grace.food,
    "GRACE_CLIMATE" => grace.climate,
    "GRACE_TEMP" => grace.temperature,
    "CREW_HEAT" => crew_heat_kw,
    "AIR_PER_SEAT" => cabin.air_per_seat,
    "CO2_WARNING" => cabin.co2_warning,
    "CO2_FATAL" => cabin.co2_fatal,
    "MIN_SAFE_TEMP" => cabin.min_safe_temp,
    "MAX_SAFE_TEMP" => cabin.max_safe_temp,
    "WALL_COUPLING" => thermal.wall_coupling,
    "AIR_DENSITY" => thermal.air_density,
    "AIR_SPECIFIC_HEAT" => thermal.air_specific_heat,
    "AIR_MASS_FLOOR" => thermal.air_mass_floor,
    "REACTION_HEAT" => thermal.reaction_heat_per_unit,
    "THERMOSTAT_DEADBAND" => thermal.thermostat_deadband,
    "ON_RAILS_WARP" => thermal.on_rails_warp,
    "BACKGROUND_INTERVAL" => background_interval,
    "POWER_THRESHOLD" => power_threshold,
}

impl LifeSupportConfig {
    /// Parse a settings document, logging every issue.
    ///
    /// See [`parse_settings`] for the issue list itself.
    pub fn from_settings_str(text: &str) -> LifeSupportResult<Self> {
        parse_settings(text).map(|(config, _)| config)
    }
}

/// Interpret a TOML value as a finite number.
fn numeric(value: &toml::Value) -> Option<f64> {
    let v = match value {
        toml::Value::Float(f) => *f,
        toml::Value::Integer(i) => *i as f64,
        toml::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

/// Parse a flat `KEY = number` settings document.
///
/// Returns the config together with every issue encountered. Each issue is
/// also logged: missing required keys at error level, the rest as warnings.
pub fn parse_settings(text: &str) -> LifeSupportResult<(LifeSupportConfig, Vec<SettingIssue>)> {
    let table: toml::Table = text.parse()?;
    let mut config = LifeSupportConfig::default();
    let mut issues = Vec::new();

    for key in REQUIRED_KEYS {
        if let Some(slot) = config.slot_mut(key) {
            *slot = 0.0;
        }
    }

    for (key, value) in &table {
        let required = REQUIRED_KEYS.contains(&key.as_str());
        let Some(slot) = config.slot_mut(key) else {
            log::warn!("Unknown life support setting '{}' ignored", key);
            issues.push(SettingIssue::Unknown(key.clone()));
            continue;
        };
        match numeric(value) {
            Some(v) => *slot = v,
            None => {
                if required {
                    log::error!("Invalid value for {}: {} (using 0)", key, value);
                } else {
                    log::warn!("Invalid value for {}: {} (using default)", key, value);
                }
                issues.push(SettingIssue::Invalid {
                    key: key.clone(),
                    value: value.to_string(),
                });
            }
        }
    }

    for key in REQUIRED_KEYS {
        if !table.contains_key(key) {
            log::error!("Missing life support setting {} (using 0)", key);
            issues.push(SettingIssue::Missing(key.to_string()));
        }
    }

    if config.consumption.oxygen <= 0.0 {
        log::error!("Oxygen rate is 0; crews will never consume oxygen");
    }
    if config.scrubber.reactant_per_co2() <= 0.0 {
        log::warn!("Scrubber stoichiometry is 0; scrubbers will remove no CO2");
    }

    log::info!(
        "Loaded life support settings ({} keys, {} issues)",
        table.len(),
        issues.len()
    );
    Ok((config, issues))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = include_str!("../../../data/life_support.toml");

    #[test]
    fn test_shipped_settings_parse_cleanly() {
        let (config, issues) = parse_settings(FULL).unwrap();
        assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
        assert_eq!(config, LifeSupportConfig::default());
    }

    #[test]
    fn test_missing_required_key_defaults_to_zero() {
        let (config, issues) = parse_settings("CO2_RATE = 0.005").unwrap();
        assert_eq!(config.consumption.co2, 0.005);
        assert_eq!(config.consumption.oxygen, 0.0);
        assert_eq!(config.grace.oxygen, 0.0);
        assert!(issues.contains(&SettingIssue::Missing("OXYGEN_RATE".into())));
        assert!(!issues.contains(&SettingIssue::Missing("CO2_RATE".into())));
    }

    #[test]
    fn test_optional_keys_keep_defaults() {
        let (config, _) = parse_settings("").unwrap();
        assert_eq!(config.cabin.air_per_seat, defaults::AIR_PER_SEAT);
        assert_eq!(config.cabin.co2_fatal, defaults::CO2_FATAL);
        assert_eq!(config.thermal.on_rails_warp, defaults::ON_RAILS_WARP);
    }

    #[test]
    fn test_unparseable_value_is_zero_not_fatal() {
        let (config, issues) = parse_settings("OXYGEN_RATE = \"lots\"").unwrap();
        assert_eq!(config.consumption.oxygen, 0.0);
        assert!(issues
            .iter()
            .any(|i| matches!(i, SettingIssue::Invalid { key, .. } if key == "OXYGEN_RATE")));
    }

    #[test]
    fn test_invalid_optional_value_keeps_default() {
        let (config, _) = parse_settings("CO2_FATAL = true").unwrap();
        assert_eq!(config.cabin.co2_fatal, defaults::CO2_FATAL);
    }

    #[test]
    fn test_integer_and_string_numbers_accepted() {
        let (config, _) = parse_settings("GRACE_OXYGEN = 90\nGRACE_FOOD = \" 12.5 \"").unwrap();
        assert_eq!(config.grace.oxygen, 90.0);
        assert_eq!(config.grace.food, 12.5);
    }

    #[test]
    fn test_unknown_key_reported() {
        let (_, issues) = parse_settings("MONOPROP_RATE = 1.0").unwrap();
        assert!(issues.contains(&SettingIssue::Unknown("MONOPROP_RATE".into())));
    }

    #[test]
    fn test_garbage_document_is_error() {
        assert!(parse_settings("OXYGEN_RATE = = =").is_err());
    }

    #[test]
    fn test_stoichiometric_ratio() {
        let rates = ScrubberRates {
            scrub_per_seat: 0.04,
            reactant_per_seat: 0.02,
            ec_per_seat: 0.0,
        };
        assert!((rates.reactant_per_co2() - 0.5).abs() < 1e-12);
        let unset = ScrubberRates {
            scrub_per_seat: 0.0,
            ..rates
        };
        assert_eq!(unset.reactant_per_co2(), 0.0);
    }

    #[test]
    fn test_get_reads_keys() {
        let config = LifeSupportConfig::default();
        assert_eq!(config.get("CREW_HEAT"), Some(defaults::CREW_HEAT));
        assert_eq!(config.get("OXYGEN_RATE"), Some(defaults::OXYGEN_RATE));
        assert_eq!(config.get("POWER_THRESHOLD"), Some(defaults::POWER_THRESHOLD));
        assert_eq!(config.get("NOPE"), None);
    }

    #[test]
    fn test_get_sees_every_written_key() {
        let mut config = LifeSupportConfig::default();
        for (i, key) in REQUIRED_KEYS.iter().chain(OPTIONAL_KEYS.iter()).enumerate() {
            let value = 1000.0 + i as f64;
            *config.slot_mut(key).unwrap() = value;
            assert_eq!(config.get(key), Some(value), "{key}");
        }
        // No later write clobbered an earlier key.
        for (i, key) in REQUIRED_KEYS.iter().chain(OPTIONAL_KEYS.iter()).enumerate() {
            assert_eq!(config.get(key), Some(1000.0 + i as f64), "{key}");
        }
        assert_eq!(config.scrubber.reactant_per_seat, 1007.0);
        assert_eq!(config.power_threshold, 1028.0);
    }
}
