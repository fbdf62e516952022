//! Habitats — crew-capable compartments and their local life support state.
//!
//! A habitat owns its toggles (scrubber, climate control, avionics,
//! radiator auto-deploy, thermostat setpoint), its per-device rates, its
//! seated crew, and the display readouts the simulation writes back each
//! tick. The host owns the habitats; the simulation only mutates their
//! simulation fields, never their structure.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::host::{CrewMember, RosterStatus};

/// Thermostat and device defaults.
pub mod habitat_constants {
    /// Default thermostat setpoint (°C).
    pub const DEFAULT_SETPOINT: f64 = 22.0;
    /// Lowest selectable setpoint (°C).
    pub const MIN_SETPOINT: f64 = 10.0;
    /// Highest selectable setpoint (°C).
    pub const MAX_SETPOINT: f64 = 30.0;
    /// Cabin air temperature of a freshly built habitat (°C).
    pub const INITIAL_CABIN_TEMP: f64 = 20.0;

    pub const AVIONICS_EC_RATE: f64 = 0.2;
    pub const AVIONICS_HEAT: f64 = 0.2;
    pub const SAS_EC_RATE: f64 = 0.1;
    pub const SAS_HEAT: f64 = 0.1;
    pub const RCS_EC_RATE: f64 = 0.1;
    pub const RCS_HEAT: f64 = 0.1;
    pub const SYSTEM_EC_RATE: f64 = 0.03;
    pub const SYSTEM_HEAT: f64 = 0.03;
    /// Heater output (kW). The heater draws the same figure in EC per second.
    pub const HEATER_HEAT: f64 = 0.5;
}

/// Player-facing switches on a habitat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitatControls {
    pub scrubber_enabled: bool,
    pub climate_control_enabled: bool,
    pub avionics_enabled: bool,
    pub auto_deploy_radiators: bool,
    thermostat_setpoint: f64,
}

impl Default for HabitatControls {
    fn default() -> Self {
        Self {
            scrubber_enabled: true,
            climate_control_enabled: true,
            avionics_enabled: true,
            auto_deploy_radiators: true,
            thermostat_setpoint: habitat_constants::DEFAULT_SETPOINT,
        }
    }
}

impl HabitatControls {
    pub fn setpoint(&self) -> f64 {
        self.thermostat_setpoint
    }

    /// Set the thermostat, clamped to the selectable range.
    pub fn set_setpoint(&mut self, celsius: f64) {
        use habitat_constants::{DEFAULT_SETPOINT, MAX_SETPOINT, MIN_SETPOINT};
        self.thermostat_setpoint = if celsius.is_finite() {
            celsius.clamp(MIN_SETPOINT, MAX_SETPOINT)
        } else {
            DEFAULT_SETPOINT
        };
    }
}

/// Per-device electrical draw (EC/s) and heat output (kW).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitatRates {
    pub avionics_ec: f64,
    pub avionics_heat: f64,
    pub sas_ec: f64,
    pub sas_heat: f64,
    pub rcs_ec: f64,
    pub rcs_heat: f64,
    pub system_ec: f64,
    pub system_heat: f64,
    pub heater_heat: f64,
}

impl Default for HabitatRates {
    fn default() -> Self {
        use habitat_constants::*;
        Self {
            avionics_ec: AVIONICS_EC_RATE,
            avionics_heat: AVIONICS_HEAT,
            sas_ec: SAS_EC_RATE,
            sas_heat: SAS_HEAT,
            rcs_ec: RCS_EC_RATE,
            rcs_heat: RCS_HEAT,
            system_ec: SYSTEM_EC_RATE,
            system_heat: SYSTEM_HEAT,
            heater_heat: HEATER_HEAT,
        }
    }
}

/// Thermostat hysteresis state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThermostatMode {
    #[default]
    Standby,
    /// Heating.
    Active,
    /// Far above setpoint; radiators may deploy.
    StandbyExcessive,
}

/// Cabin air thermal state carried between ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalState {
    /// Cabin air temperature (°C).
    pub cabin_temp: f64,
    pub mode: ThermostatMode,
    pub radiators_eligible: bool,
}

impl Default for ThermalState {
    fn default() -> Self {
        Self {
            cabin_temp: habitat_constants::INITIAL_CABIN_TEMP,
            mode: ThermostatMode::Standby,
            radiators_eligible: false,
        }
    }
}

impl ThermalState {
    pub fn heater_active(&self) -> bool {
        self.mode == ThermostatMode::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScrubberStatus {
    #[default]
    Off,
    NoPower,
    Standby,
    Active,
    /// Ran out of reactant mid-tick.
    NoReactant,
}

impl fmt::Display for ScrubberStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScrubberStatus::Off => "Off",
            ScrubberStatus::NoPower => "No Power",
            ScrubberStatus::Standby => "Standby",
            ScrubberStatus::Active => "Active",
            ScrubberStatus::NoReactant => "No LiOH",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClimateStatus {
    Off,
    NoPower,
    #[default]
    Nominal,
}

impl fmt::Display for ClimateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClimateStatus::Off => "Off",
            ClimateStatus::NoPower => "No Power",
            ClimateStatus::Nominal => "Nominal",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HeaterStatus {
    Active,
    #[default]
    Standby,
    NoPower,
    Disabled,
}

impl fmt::Display for HeaterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HeaterStatus::Active => "Active",
            HeaterStatus::Standby => "Standby",
            HeaterStatus::NoPower => "No Power",
            HeaterStatus::Disabled => "Disabled",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RadiatorStatus {
    Active,
    #[default]
    Standby,
    Disabled,
}

impl fmt::Display for RadiatorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RadiatorStatus::Active => "Active",
            RadiatorStatus::Standby => "Standby",
            RadiatorStatus::Disabled => "Disabled",
        })
    }
}

/// Read-only display values, written by the simulation for loaded vessels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HabitatReadout {
    pub scrubber: ScrubberStatus,
    pub climate: ClimateStatus,
    pub heater: HeaterStatus,
    pub radiator: RadiatorStatus,
    /// CO2 as a fraction of the vessel's cabin air volume.
    pub co2_level: f64,
    /// Cabin air temperature (°C).
    pub cabin_temp: f64,
    /// Net active heat flux last tick (kW).
    pub heat_flux_kw: f64,
    /// Hull exchange last tick, as kW into the cabin air.
    pub passive_flux_kw: f64,
    /// CO2 removed per second last tick.
    pub last_scrub_rate: f64,
}

/// A crew-capable compartment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habitat {
    pub name: String,
    pub crew_capacity: u32,
    /// Crew currently seated here.
    pub crew: Vec<CrewMember>,
    pub controls: HabitatControls,
    pub rates: HabitatRates,
    /// This habitat's share of the vessel's cabin CO2.
    pub cabin_co2: f64,
    pub thermal: ThermalState,
    pub readout: HabitatReadout,
}

impl Habitat {
    pub fn new(name: impl Into<String>, crew_capacity: u32) -> Self {
        Self {
            name: name.into(),
            crew_capacity,
            crew: Vec::new(),
            controls: HabitatControls::default(),
            rates: HabitatRates::default(),
            cabin_co2: 0.0,
            thermal: ThermalState::default(),
            readout: HabitatReadout::default(),
        }
    }

    /// Seat named crew members, up to capacity.
    pub fn with_crew<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            if !self.seat(CrewMember::new(name)) {
                break;
            }
        }
        self
    }

    /// Seat a crew member. Returns `false` if the habitat is full.
    pub fn seat(&mut self, member: CrewMember) -> bool {
        if self.crew.len() >= self.crew_capacity as usize {
            return false;
        }
        self.crew.push(CrewMember {
            status: RosterStatus::Assigned,
            ..member
        });
        true
    }

    pub fn crew_count(&self) -> u32 {
        self.crew.len() as u32
    }

    pub fn is_crewed(&self) -> bool {
        !self.crew.is_empty()
    }
}
