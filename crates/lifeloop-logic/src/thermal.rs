//! Cabin climate — air thermal mass, thermostat, heater, radiators.
//!
//! Each habitat's cabin air is a lumped thermal mass. Per tick, for loaded
//! vessels:
//!
//! 1. The air relaxes toward the hull temperature (passive exchange).
//! 2. Heat sources are summed: avionics, SAS and RCS (each only if its own
//!    power request succeeds), crew metabolism, scrubber reaction heat,
//!    climate system draw, and the heater when the thermostat calls for it.
//! 3. The net flux warms or cools the air.
//! 4. The air pushes back on the hull through the same coupling.
//!
//! Under heavy time acceleration the integration is skipped ("on rails")
//! and a powered climate system simply holds the setpoint.
//!
//! Background vessels run no physics. They only pay for climate control
//! and report whether it failed for a crewed habitat.

use serde::{Deserialize, Serialize};

use crate::config::LifeSupportConfig;
use crate::habitat::{ClimateStatus, HeaterStatus, RadiatorStatus, ThermostatMode};
use crate::host::VesselHost;
use crate::ledger;
use crate::substance::Substance;

/// Net flux below this (kW) leaves the air temperature alone.
pub const ACTIVE_FLUX_FLOOR: f64 = 1e-5;

/// Outcome of a thermostat comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThermostatDecision {
    pub mode: ThermostatMode,
    pub radiators_eligible: bool,
}

/// Compare cabin air against the setpoint with hysteresis.
///
/// Below `setpoint - deadband/2` the heater runs. Above
/// `setpoint + 4·deadband` radiators may deploy. Between the upper band
/// edge and that excessive threshold everything is off. Inside the
/// deadband the heater keeps whatever state it had.
pub fn thermostat(
    air: f64,
    setpoint: f64,
    deadband: f64,
    previous: ThermostatMode,
) -> ThermostatDecision {
    let low = setpoint - deadband / 2.0;
    let high = setpoint + deadband / 2.0;
    let excessive = setpoint + 4.0 * deadband;

    let (mode, radiators_eligible) = if air < low {
        (ThermostatMode::Active, false)
    } else if air > excessive {
        (ThermostatMode::StandbyExcessive, true)
    } else if air > high {
        (ThermostatMode::Standby, false)
    } else if previous == ThermostatMode::Active {
        (ThermostatMode::Active, false)
    } else {
        (ThermostatMode::Standby, false)
    };
    ThermostatDecision {
        mode,
        radiators_eligible,
    }
}

/// Fraction of the air-hull gap closed over `elapsed` seconds.
pub fn passive_blend(wall_coupling: f64, elapsed: f64) -> f64 {
    (1.0 - (-wall_coupling.max(0.0) * elapsed.max(0.0)).exp()).clamp(0.0, 1.0)
}

/// Cabin air mass (kg), floored so tiny habitats stay stable.
pub fn air_mass(crew_capacity: u32, config: &LifeSupportConfig) -> f64 {
    let mass = f64::from(crew_capacity) * config.cabin.air_per_seat * config.thermal.air_density;
    mass.max(config.thermal.air_mass_floor)
}

/// Temperature change (K) from `flux_kw` applied for `elapsed` seconds to
/// air with the given heat capacity (J/K).
pub fn temperature_change(flux_kw: f64, elapsed: f64, heat_capacity: f64) -> f64 {
    if heat_capacity <= 0.0 {
        return 0.0;
    }
    flux_kw * 1000.0 * elapsed / heat_capacity
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HabitatClimate {
    pub status: ClimateStatus,
    /// Climate control is off or unpowered while crew are aboard.
    pub failed: bool,
    pub heat_flux_kw: f64,
    pub passive_flux_kw: f64,
    pub cabin_temp: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClimateReport {
    /// Vessel-wide: any crewed habitat lost climate control.
    pub climate_failed: bool,
    pub on_rails: bool,
    /// Radiator command issued this tick, if any habitat opted in.
    pub radiators_deployed: Option<bool>,
    pub habitats: Vec<HabitatClimate>,
}

/// Run climate control for every habitat.
///
/// `scrub_rates` are this tick's per-habitat CO2 removal rates from the
/// scrubber pass.
pub fn run_climate<V: VesselHost + ?Sized>(
    host: &mut V,
    config: &LifeSupportConfig,
    elapsed: f64,
    scrub_rates: &[f64],
) -> ClimateReport {
    let loaded = host.is_loaded();
    let on_rails = loaded && host.warp_rate() > config.thermal.on_rails_warp;
    let mut report = ClimateReport {
        on_rails,
        ..Default::default()
    };

    for i in 0..host.habitats().len() {
        let scrub_rate = scrub_rates.get(i).copied().unwrap_or(0.0);
        let result = if loaded {
            simulate_habitat(host, config, i, elapsed, scrub_rate, on_rails)
        } else {
            gate_background(host, config, i, elapsed)
        };
        report.climate_failed |= result.failed;
        report.habitats.push(result);
    }

    if loaded {
        report.radiators_deployed = command_radiators(host);
    }
    report
}

/// Draw `ec_rate × elapsed`; true if the draw was met.
fn powered<V: VesselHost + ?Sized>(
    host: &mut V,
    config: &LifeSupportConfig,
    ec_rate: f64,
    elapsed: f64,
) -> bool {
    ledger::consume(host, Substance::ElectricCharge, ec_rate * elapsed).ratio
        >= config.power_threshold
}

/// Heat from a device that only runs on full power.
fn powered_heat<V: VesselHost + ?Sized>(
    host: &mut V,
    config: &LifeSupportConfig,
    ec_rate: f64,
    heat_kw: f64,
    elapsed: f64,
) -> f64 {
    if powered(host, config, ec_rate, elapsed) {
        heat_kw
    } else {
        0.0
    }
}

fn gate_background<V: VesselHost + ?Sized>(
    host: &mut V,
    config: &LifeSupportConfig,
    index: usize,
    elapsed: f64,
) -> HabitatClimate {
    let habitat = &host.habitats()[index];
    let crewed = habitat.is_crewed();
    let enabled = habitat.controls.climate_control_enabled;
    let system_ec = habitat.rates.system_ec;
    let cabin_temp = habitat.thermal.cabin_temp;

    let status = if !enabled {
        ClimateStatus::Off
    } else if !powered(host, config, system_ec, elapsed) {
        ClimateStatus::NoPower
    } else {
        ClimateStatus::Nominal
    };
    HabitatClimate {
        status,
        failed: crewed && status != ClimateStatus::Nominal,
        heat_flux_kw: 0.0,
        passive_flux_kw: 0.0,
        cabin_temp,
    }
}

fn simulate_habitat<V: VesselHost + ?Sized>(
    host: &mut V,
    config: &LifeSupportConfig,
    index: usize,
    elapsed: f64,
    scrub_rate: f64,
    on_rails: bool,
) -> HabitatClimate {
    let thermal = &config.thermal;
    let hull = host.hull_temperature(index);
    let sas = host.sas_engaged();
    let rcs = host.rcs_engaged();
    let habitat = &host.habitats()[index];
    let controls = habitat.controls.clone();
    let rates = habitat.rates.clone();
    let crew = habitat.crew_count();
    let previous = habitat.thermal.mode;
    let mut air = habitat.thermal.cabin_temp;
    let heat_capacity = air_mass(habitat.crew_capacity, config) * thermal.air_specific_heat;

    let before = air;
    air += (hull - air) * passive_blend(thermal.wall_coupling, elapsed);
    let passive_flux_kw = if elapsed > 0.0 {
        (air - before) * heat_capacity / (1000.0 * elapsed)
    } else {
        0.0
    };

    let mut flux = 0.0;
    if controls.avionics_enabled {
        flux += powered_heat(host, config, rates.avionics_ec, rates.avionics_heat, elapsed);
        if sas {
            flux += powered_heat(host, config, rates.sas_ec, rates.sas_heat, elapsed);
        }
        if rcs {
            flux += powered_heat(host, config, rates.rcs_ec, rates.rcs_heat, elapsed);
        }
    }
    flux += config.crew_heat_kw * f64::from(crew);
    flux += scrub_rate * thermal.reaction_heat_per_unit;

    let mut mode = ThermostatMode::Standby;
    let mut radiators_eligible = false;
    let (status, heater) = if !controls.climate_control_enabled {
        (ClimateStatus::Off, HeaterStatus::Disabled)
    } else if !powered(host, config, rates.system_ec, elapsed) {
        (ClimateStatus::NoPower, HeaterStatus::NoPower)
    } else {
        flux += rates.system_heat;
        if on_rails {
            (ClimateStatus::Nominal, HeaterStatus::Standby)
        } else {
            let decision = thermostat(air, controls.setpoint(), thermal.thermostat_deadband, previous);
            mode = decision.mode;
            radiators_eligible = decision.radiators_eligible;
            let heater = if mode != ThermostatMode::Active {
                HeaterStatus::Standby
            } else if powered(host, config, rates.heater_heat, elapsed) {
                flux += rates.heater_heat;
                HeaterStatus::Active
            } else {
                HeaterStatus::NoPower
            };
            (ClimateStatus::Nominal, heater)
        }
    };

    if on_rails {
        if status == ClimateStatus::Nominal {
            air = controls.setpoint();
        }
    } else if flux.abs() > ACTIVE_FLUX_FLOOR {
        air += temperature_change(flux, elapsed, heat_capacity);
    }

    host.add_hull_flux(index, (air - hull) * thermal.wall_coupling);

    log::trace!(
        "habitat {}: air {:.2} C, hull {:.2} C, flux {:.3} kW, passive {:.3} kW",
        index,
        air,
        hull,
        flux,
        passive_flux_kw
    );

    let habitat = &mut host.habitats_mut()[index];
    habitat.thermal.cabin_temp = air;
    habitat.thermal.mode = mode;
    habitat.thermal.radiators_eligible = radiators_eligible;
    habitat.readout.climate = status;
    habitat.readout.heater = heater;
    habitat.readout.cabin_temp = air;
    habitat.readout.heat_flux_kw = flux;
    habitat.readout.passive_flux_kw = passive_flux_kw;

    HabitatClimate {
        status,
        failed: crew > 0 && status != ClimateStatus::Nominal,
        heat_flux_kw: flux,
        passive_flux_kw,
        cabin_temp: air,
    }
}

/// Issue one vessel-wide radiator command: deploy if any opted-in habitat
/// is eligible, otherwise retract. Returns `None` when no habitat opted in.
fn command_radiators<V: VesselHost + ?Sized>(host: &mut V) -> Option<bool> {
    let habitats = host.habitats();
    let opted_in = habitats.iter().any(|h| h.controls.auto_deploy_radiators);
    let deploy = habitats
        .iter()
        .any(|h| h.controls.auto_deploy_radiators && h.thermal.radiators_eligible);

    if opted_in {
        for radiator in host.radiators_mut() {
            radiator.command(deploy);
        }
    }

    for habitat in host.habitats_mut() {
        habitat.readout.radiator = if !habitat.controls.auto_deploy_radiators
            || habitat.readout.climate != ClimateStatus::Nominal
        {
            RadiatorStatus::Disabled
        } else if deploy {
            RadiatorStatus::Active
        } else {
            RadiatorStatus::Standby
        };
    }

    opted_in.then_some(deploy)
}

/// Whether any crewed habitat's cabin air is outside the safe range.
/// Background vessels never report a violation.
pub fn temperature_out_of_range<V: VesselHost + ?Sized>(host: &V, config: &LifeSupportConfig) -> bool {
    if !host.is_loaded() {
        return false;
    }
    host.habitats().iter().filter(|h| h.is_crewed()).any(|h| {
        let t = h.thermal.cabin_temp;
        t < config.cabin.min_safe_temp || t > config.cabin.max_safe_temp
    })
}
