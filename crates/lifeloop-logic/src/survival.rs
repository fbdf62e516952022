//! Crew survival — hazard timers, priority status, crew death.
//!
//! Every hazard has a timer that grows by elapsed time while the hazard
//! holds and snaps back to zero the moment it clears. A timer that
//! outlasts its grace period kills the crew.
//!
//! Status evaluation is strictly ordered; the first match wins:
//!
//! | # | Check | Fatal |
//! |---|-------|-------|
//! | 1 | CO2 ≥ fatal concentration | yes |
//! | 2 | CO2 ≥ warning concentration | no |
//! | 3 | Oxygen | past grace |
//! | 4 | Air circulation (climate control) | past grace |
//! | 5 | Cabin temperature | past grace |
//! | 6 | Water | past grace |
//! | 7 | Food | past grace |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::LifeSupportConfig;
use crate::host::{CrewMember, RosterStatus, VesselHost};

/// Seconds each hazard has persisted without a break.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HazardTimers {
    pub low_o2: f64,
    pub low_water: f64,
    pub low_food: f64,
    pub low_climate: f64,
    pub temp_range: f64,
}

/// Which hazards held during a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HazardConditions {
    pub oxygen_short: bool,
    pub water_short: bool,
    pub food_short: bool,
    pub climate_failed: bool,
    pub temp_out_of_range: bool,
}

/// Grow a timer while its hazard holds, otherwise reset it.
pub fn advance_timer(timer: &mut f64, holds: bool, elapsed: f64) {
    if holds {
        *timer = timer.max(0.0) + elapsed.max(0.0);
    } else {
        *timer = 0.0;
    }
}

impl HazardTimers {
    pub fn advance(&mut self, conditions: &HazardConditions, elapsed: f64) {
        advance_timer(&mut self.low_o2, conditions.oxygen_short, elapsed);
        advance_timer(&mut self.low_water, conditions.water_short, elapsed);
        advance_timer(&mut self.low_food, conditions.food_short, elapsed);
        advance_timer(&mut self.low_climate, conditions.climate_failed, elapsed);
        advance_timer(&mut self.temp_range, conditions.temp_out_of_range, elapsed);
    }
}

/// Vessel-level life support status. Countdown variants carry the
/// seconds left before the hazard turns fatal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum StatusLabel {
    FatalCo2,
    DangerousCo2,
    Suffocated,
    Suffocating(f64),
    StagnantAir,
    CirculationFailed(f64),
    FatalTemperature,
    TemperatureCritical(f64),
    Dehydrated,
    Thirsty(f64),
    Starved,
    Starving(f64),
    #[default]
    Nominal,
}

impl StatusLabel {
    /// Whether this status means the crew has just died.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StatusLabel::FatalCo2
                | StatusLabel::Suffocated
                | StatusLabel::StagnantAir
                | StatusLabel::FatalTemperature
                | StatusLabel::Dehydrated
                | StatusLabel::Starved
        )
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLabel::FatalCo2 => f.write_str("Fatal CO2 Levels"),
            StatusLabel::DangerousCo2 => f.write_str("Dangerous CO2 Levels"),
            StatusLabel::Suffocated => f.write_str("Crew suffocated"),
            StatusLabel::Suffocating(s) => write!(f, "Suffocating ({:.0}s)", s),
            StatusLabel::StagnantAir => f.write_str("Crew suffocated from stagnant air"),
            StatusLabel::CirculationFailed(s) => write!(f, "Air Circulation Failed ({:.0}s)", s),
            StatusLabel::FatalTemperature => f.write_str("Fatal temperature"),
            StatusLabel::TemperatureCritical(s) => write!(f, "Cabin Temp Critical ({:.0}s)", s),
            StatusLabel::Dehydrated => f.write_str("Crew dehydrated"),
            StatusLabel::Thirsty(s) => write!(f, "Thirsty ({:.0}s)", s),
            StatusLabel::Starved => f.write_str("Crew starved"),
            StatusLabel::Starving(s) => write!(f, "Starving ({:.0}s)", s),
            StatusLabel::Nominal => f.write_str("Nominal"),
        }
    }
}

/// Everything carried for one vessel between ticks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurvivalState {
    /// Cabin CO2 summed over the vessel's habitats.
    pub cabin_co2: f64,
    pub timers: HazardTimers,
    pub status: StatusLabel,
    /// Simulation time this vessel was last processed. `None` until the
    /// first observation.
    pub last_update_time: Option<f64>,
}

/// CO2 as a fraction of the vessel's cabin air volume.
/// Zero for a vessel with no seats.
pub fn co2_concentration(cabin_co2: f64, crew_capacity: u32, air_per_seat: f64) -> f64 {
    let volume = f64::from(crew_capacity) * air_per_seat;
    if volume <= 0.0 {
        return 0.0;
    }
    cabin_co2.max(0.0) / volume
}

fn timed(
    timer: f64,
    grace: f64,
    fatal: StatusLabel,
    countdown: fn(f64) -> StatusLabel,
) -> Option<StatusLabel> {
    if timer > grace {
        Some(fatal)
    } else if timer > 0.0 {
        Some(countdown((grace - timer).max(0.0)))
    } else {
        None
    }
}

/// Pick the vessel status from the timers and CO2 concentration.
pub fn evaluate(timers: &HazardTimers, co2_level: f64, config: &LifeSupportConfig) -> StatusLabel {
    let cabin = &config.cabin;
    let grace = &config.grace;

    if co2_level >= cabin.co2_fatal {
        return StatusLabel::FatalCo2;
    }
    if co2_level >= cabin.co2_warning {
        return StatusLabel::DangerousCo2;
    }

    timed(
        timers.low_o2,
        grace.oxygen,
        StatusLabel::Suffocated,
        StatusLabel::Suffocating,
    )
    .or_else(|| {
        timed(
            timers.low_climate,
            grace.climate,
            StatusLabel::StagnantAir,
            StatusLabel::CirculationFailed,
        )
    })
    .or_else(|| {
        timed(
            timers.temp_range,
            grace.temperature,
            StatusLabel::FatalTemperature,
            StatusLabel::TemperatureCritical,
        )
    })
    .or_else(|| {
        timed(
            timers.low_water,
            grace.water,
            StatusLabel::Dehydrated,
            StatusLabel::Thirsty,
        )
    })
    .or_else(|| {
        timed(
            timers.low_food,
            grace.food,
            StatusLabel::Starved,
            StatusLabel::Starving,
        )
    })
    .unwrap_or(StatusLabel::Nominal)
}

/// Remove every seated crew member, mark them dead, and tell the host.
/// Returns the casualties' names in seat order.
pub fn kill_crew<V: VesselHost + ?Sized>(host: &mut V) -> Vec<String> {
    let mut dead: Vec<CrewMember> = Vec::new();
    for habitat in host.habitats_mut() {
        dead.extend(habitat.crew.drain(..).map(|member| CrewMember {
            status: RosterStatus::Dead,
            ..member
        }));
    }
    for member in &dead {
        log::info!("{} died aboard vessel {}", member.name, host.id());
        host.on_crew_killed(member);
    }
    dead.into_iter().map(|m| m.name).collect()
}
