//! Per-tick driver and owner of the survival state store.
//!
//! Each tick, for every vessel handed in:
//!
//! 1. Skip vessels that are not real, crewed, trackable craft.
//! 2. First sighting only stamps a baseline time.
//! 3. Background vessels wait until enough time has built up.
//! 4. Respiration, eating, drinking, scrubbing, climate, survival, in
//!    that order; each stage reads the previous stages' results.
//! 5. Cabin CO2 is spread over the habitats by seat share.
//!
//! Vessels are independent of each other. A clock that moved backwards for
//! any vessel abandons the whole pass before anything is touched.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{LifeSupportConfig, EPSILON};
use crate::consumption::{self, OutputSink};
use crate::error::LifeSupportResult;
use crate::host::{EntityId, VesselHost};
use crate::lod::{self, LodStats, SimTier};
use crate::persistence::{self, SurvivalRecord};
use crate::scrubber;
use crate::survival::{self, HazardConditions, StatusLabel, SurvivalState};
use crate::thermal;

/// Why a vessel was not simulated this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Flags, asteroids and unknown objects are never tracked.
    Untracked,
    Destroyed,
    NoCrew,
    /// First sighting; the baseline time was recorded.
    Baseline,
    /// Background vessel below the batching interval.
    Batched,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::Untracked => "untracked",
            SkipReason::Destroyed => "destroyed",
            SkipReason::NoCrew => "no crew",
            SkipReason::Baseline => "baseline",
            SkipReason::Batched => "batched",
        })
    }
}

/// What happened to one simulated vessel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselTick {
    pub id: EntityId,
    pub tier: SimTier,
    pub elapsed: f64,
    pub status: StatusLabel,
    pub co2_removed: f64,
    pub climate_failed: bool,
    /// Crew killed this tick.
    pub killed: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub processed: Vec<VesselTick>,
    pub skipped: Vec<(EntityId, SkipReason)>,
    pub newly_tracked: Vec<EntityId>,
    pub pruned: Vec<EntityId>,
    /// Tier split of the vessels handed to the pass.
    pub tiers: LodStats,
}

impl TickReport {
    /// Every crew member killed this tick, with their vessel.
    pub fn deaths(&self) -> impl Iterator<Item = (EntityId, &str)> + '_ {
        self.processed
            .iter()
            .flat_map(|t| t.killed.iter().map(move |name| (t.id, name.as_str())))
    }

    pub fn vessel(&self, id: EntityId) -> Option<&VesselTick> {
        self.processed.iter().find(|t| t.id == id)
    }

    pub fn skip_reason(&self, id: EntityId) -> Option<SkipReason> {
        self.skipped.iter().find(|(s, _)| *s == id).map(|(_, r)| *r)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PassOutcome {
    Completed(TickReport),
    /// The clock went backwards for `entity`; nothing was changed.
    ClockRegressed { entity: EntityId, elapsed: f64 },
}

impl PassOutcome {
    pub fn report(&self) -> Option<&TickReport> {
        match self {
            PassOutcome::Completed(report) => Some(report),
            PassOutcome::ClockRegressed { .. } => None,
        }
    }
}

fn validity<V: VesselHost + ?Sized>(host: &V) -> Result<(), SkipReason> {
    if !host.kind().is_tracked() {
        Err(SkipReason::Untracked)
    } else if host.is_destroyed() {
        Err(SkipReason::Destroyed)
    } else if host.crew_count() == 0 {
        Err(SkipReason::NoCrew)
    } else {
        Ok(())
    }
}

/// Spread `total` cabin CO2 over the habitats by seat share and update
/// the CO2 readouts.
pub fn redistribute_co2<V: VesselHost + ?Sized>(host: &mut V, total: f64, air_per_seat: f64) {
    let capacity = host.crew_capacity();
    let level = survival::co2_concentration(total, capacity, air_per_seat);
    let loaded = host.is_loaded();
    for habitat in host.habitats_mut() {
        habitat.cabin_co2 = if capacity > 0 {
            total * f64::from(habitat.crew_capacity) / f64::from(capacity)
        } else {
            0.0
        };
        if loaded {
            habitat.readout.co2_level = level;
        }
    }
}

/// Run every stage for one vessel.
fn simulate_vessel<V: VesselHost + ?Sized>(
    config: &LifeSupportConfig,
    state: &mut SurvivalState,
    host: &mut V,
    elapsed: f64,
) -> VesselTick {
    let crew = host.crew_count();
    let short = |ratio: f64| ratio < 1.0 - EPSILON;

    let breath = consumption::convert(
        host,
        elapsed,
        &consumption::respiration(config),
        crew,
        OutputSink::Cabin,
    );
    state.cabin_co2 += breath.produced;
    let meal = consumption::convert(
        host,
        elapsed,
        &consumption::eating(config),
        crew,
        OutputSink::Storage,
    );
    let drink = consumption::convert(
        host,
        elapsed,
        &consumption::drinking(config),
        crew,
        OutputSink::Storage,
    );

    let scrub = scrubber::run_scrubbers(host, config, elapsed, state.cabin_co2);
    state.cabin_co2 = (state.cabin_co2 - scrub.removed).max(0.0);

    let climate = thermal::run_climate(host, config, elapsed, &scrub.rates());
    let conditions = HazardConditions {
        oxygen_short: short(breath.input_ratio),
        water_short: short(drink.input_ratio),
        food_short: short(meal.input_ratio),
        climate_failed: climate.climate_failed,
        temp_out_of_range: thermal::temperature_out_of_range(&*host, config),
    };
    state.timers.advance(&conditions, elapsed);

    let level =
        survival::co2_concentration(state.cabin_co2, host.crew_capacity(), config.cabin.air_per_seat);
    let status = survival::evaluate(&state.timers, level, config);
    let killed = if status.is_fatal() {
        log::info!("Vessel {}: {}", host.id(), status);
        survival::kill_crew(host)
    } else {
        Vec::new()
    };
    state.status = status;

    redistribute_co2(host, state.cabin_co2, config.cabin.air_per_seat);

    log::debug!(
        "Vessel {} (+{:.2}s): O2 {:.3}, CO2 {:.4} removed {:.4}, {}",
        host.id(),
        elapsed,
        breath.input_ratio,
        level,
        scrub.removed,
        status
    );

    VesselTick {
        id: host.id(),
        tier: lod::classify(&*host),
        elapsed,
        status,
        co2_removed: scrub.removed,
        climate_failed: climate.climate_failed,
        killed,
    }
}

/// The life support simulation. Owns per-vessel survival state.
#[derive(Debug, Clone)]
pub struct LifeSupportScheduler {
    config: LifeSupportConfig,
    states: BTreeMap<EntityId, SurvivalState>,
}

impl LifeSupportScheduler {
    pub fn new(config: LifeSupportConfig) -> Self {
        Self {
            config,
            states: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &LifeSupportConfig {
        &self.config
    }

    pub fn state(&self, id: EntityId) -> Option<&SurvivalState> {
        self.states.get(&id)
    }

    pub fn states(&self) -> &BTreeMap<EntityId, SurvivalState> {
        &self.states
    }

    pub fn tracked_count(&self) -> usize {
        self.states.len()
    }

    /// Run one pass over `vessels` at simulation time `now`.
    pub fn tick<V: VesselHost>(&mut self, now: f64, vessels: &mut [V]) -> PassOutcome {
        for vessel in vessels.iter() {
            if validity(vessel).is_err() {
                continue;
            }
            let last = self
                .states
                .get(&vessel.id())
                .and_then(|s| s.last_update_time);
            if let Some(last) = last {
                let elapsed = now - last;
                if elapsed < 0.0 {
                    log::warn!(
                        "Clock moved backwards for vessel {} ({:.3}s); skipping pass",
                        vessel.id(),
                        elapsed
                    );
                    return PassOutcome::ClockRegressed {
                        entity: vessel.id(),
                        elapsed,
                    };
                }
            }
        }

        let mut report = TickReport {
            tiers: lod::classify_batch(vessels),
            ..Default::default()
        };
        for vessel in vessels.iter_mut() {
            let id = vessel.id();
            if let Err(reason) = validity(&*vessel) {
                report.skipped.push((id, reason));
                continue;
            }

            if !self.states.contains_key(&id) {
                let seeded: f64 = vessel.habitats().iter().map(|h| h.cabin_co2).sum();
                log::info!("Tracking vessel {} ({} crew)", id, vessel.crew_count());
                report.newly_tracked.push(id);
                self.states.insert(
                    id,
                    SurvivalState {
                        cabin_co2: seeded.max(0.0),
                        ..Default::default()
                    },
                );
            }
            let Some(state) = self.states.get_mut(&id) else {
                continue;
            };

            let Some(last) = state.last_update_time else {
                state.last_update_time = Some(now);
                report.skipped.push((id, SkipReason::Baseline));
                continue;
            };
            let elapsed = now - last;
            if !lod::should_process(lod::classify(&*vessel), elapsed, self.config.background_interval) {
                report.skipped.push((id, SkipReason::Batched));
                continue;
            }

            let tick = simulate_vessel(&self.config, state, vessel, elapsed);
            state.last_update_time = Some(now);
            report.processed.push(tick);
        }

        report.pruned = self.prune(vessels);
        PassOutcome::Completed(report)
    }

    /// Drop state for vessels that are gone, destroyed, or never tracked.
    fn prune<V: VesselHost>(&mut self, vessels: &[V]) -> Vec<EntityId> {
        let keep: BTreeSet<EntityId> = vessels
            .iter()
            .filter(|v| v.kind().is_tracked() && !v.is_destroyed())
            .map(|v| v.id())
            .collect();
        let pruned: Vec<EntityId> = self
            .states
            .keys()
            .filter(|id| !keep.contains(id))
            .copied()
            .collect();
        for id in &pruned {
            log::info!("No longer tracking vessel {}", id);
            self.states.remove(id);
        }
        pruned
    }

    pub fn save_records(&self) -> Vec<SurvivalRecord> {
        persistence::to_records(&self.states)
    }

    /// Replace the state store with loaded records.
    pub fn load_records(&mut self, records: &[SurvivalRecord]) {
        self.states = persistence::from_records(records);
    }

    pub fn to_json(&self) -> LifeSupportResult<String> {
        persistence::save_json(&self.states)
    }

    /// Replace the state store from a JSON save file. On error the
    /// current store is left as it was.
    pub fn load_json(&mut self, text: &str) -> LifeSupportResult<()> {
        self.states = persistence::load_json(text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habitat::Habitat;
    use crate::host::{Container, SimVessel, VesselKind};
    use crate::substance::Substance;

    fn supplied(id: u64, crew: &[&str]) -> SimVessel {
        SimVessel::new(id, "Ship", VesselKind::Ship)
            .with_habitat(Habitat::new("Cabin", 3).with_crew(crew.iter().copied()))
            .with_container(Container::full(Substance::Oxygen, 1000.0))
            .with_container(Container::full(Substance::Food, 100.0))
            .with_container(Container::full(Substance::Water, 100.0))
            .with_container(Container::full(Substance::ElectricCharge, 10_000.0))
            .with_container(Container::full(Substance::LithiumHydroxide, 50.0).in_habitat(0))
            .with_container(Container::new(Substance::Waste, 0.0, 50.0).in_habitat(0))
    }

    fn completed(outcome: PassOutcome) -> TickReport {
        match outcome {
            PassOutcome::Completed(report) => report,
            other => panic!("expected a completed pass, got {:?}", other),
        }
    }

    #[test]
    fn test_first_sighting_is_baseline() {
        let mut scheduler = LifeSupportScheduler::new(LifeSupportConfig::default());
        let mut fleet = vec![supplied(1, &["Jeb"])];
        let report = completed(scheduler.tick(100.0, &mut fleet));
        assert_eq!(report.newly_tracked, vec![EntityId(1)]);
        assert_eq!(report.skip_reason(EntityId(1)), Some(SkipReason::Baseline));
        assert_eq!(fleet[0].stored(Substance::Oxygen), 1000.0);
        assert_eq!(scheduler.state(EntityId(1)).unwrap().last_update_time, Some(100.0));

        let report = completed(scheduler.tick(101.0, &mut fleet));
        assert_eq!(report.vessel(EntityId(1)).unwrap().elapsed, 1.0);
        assert!(fleet[0].stored(Substance::Oxygen) < 1000.0);
    }

    #[test]
    fn test_invalid_vessels_skipped() {
        let mut scheduler = LifeSupportScheduler::new(LifeSupportConfig::default());
        let mut flag = supplied(1, &["Jeb"]);
        flag.kind = VesselKind::Flag;
        let mut wreck = supplied(2, &["Bill"]);
        wreck.destroyed = true;
        let empty = supplied(3, &[]);
        let mut debris = supplied(4, &["Bob"]);
        debris.kind = VesselKind::Debris;
        let mut fleet = vec![flag, wreck, empty, debris];

        let report = completed(scheduler.tick(0.0, &mut fleet));
        assert_eq!(report.skip_reason(EntityId(1)), Some(SkipReason::Untracked));
        assert_eq!(report.skip_reason(EntityId(2)), Some(SkipReason::Destroyed));
        assert_eq!(report.skip_reason(EntityId(3)), Some(SkipReason::NoCrew));
        assert_eq!(report.newly_tracked, vec![EntityId(4)]);
    }

    #[test]
    fn test_background_batching() {
        let mut scheduler = LifeSupportScheduler::new(LifeSupportConfig::default());
        let mut fleet = vec![supplied(1, &["Jeb"]).unloaded()];
        completed(scheduler.tick(0.0, &mut fleet));
        let report = completed(scheduler.tick(0.5, &mut fleet));
        assert_eq!(report.skip_reason(EntityId(1)), Some(SkipReason::Batched));
        let report = completed(scheduler.tick(1.5, &mut fleet));
        let tick = report.vessel(EntityId(1)).unwrap();
        assert_eq!(tick.tier, SimTier::Background);
        assert_eq!(tick.elapsed, 1.5);
        assert_eq!(report.tiers.background_count, 1);
        assert_eq!(report.tiers.loaded_count, 0);
    }

    #[test]
    fn test_clock_regression_changes_nothing() {
        let mut scheduler = LifeSupportScheduler::new(LifeSupportConfig::default());
        let mut fleet = vec![supplied(1, &["Jeb"]), supplied(2, &["Bill"])];
        completed(scheduler.tick(10.0, &mut fleet));
        completed(scheduler.tick(20.0, &mut fleet));
        let before_states = scheduler.states().clone();
        let before_o2 = fleet[1].stored(Substance::Oxygen);

        let outcome = scheduler.tick(15.0, &mut fleet);
        assert!(matches!(
            outcome,
            PassOutcome::ClockRegressed { elapsed, .. } if elapsed == -5.0
        ));
        assert_eq!(scheduler.states(), &before_states);
        assert_eq!(fleet[1].stored(Substance::Oxygen), before_o2);

        let report = completed(scheduler.tick(21.0, &mut fleet));
        assert_eq!(report.vessel(EntityId(1)).unwrap().elapsed, 1.0);
    }

    #[test]
    fn test_missing_and_destroyed_vessels_pruned() {
        let mut scheduler = LifeSupportScheduler::new(LifeSupportConfig::default());
        let mut fleet = vec![supplied(1, &["Jeb"]), supplied(2, &["Bill"]), supplied(3, &["Bob"])];
        completed(scheduler.tick(0.0, &mut fleet));
        assert_eq!(scheduler.tracked_count(), 3);

        fleet[1].destroyed = true;
        fleet.remove(2);
        let report = completed(scheduler.tick(1.0, &mut fleet));
        assert_eq!(report.pruned, vec![EntityId(2), EntityId(3)]);
        assert_eq!(scheduler.tracked_count(), 1);
    }

    #[test]
    fn test_empty_vessel_keeps_its_co2() {
        let mut scheduler = LifeSupportScheduler::new(LifeSupportConfig::default());
        let mut fleet = vec![supplied(1, &["Jeb"])];
        fleet[0].habitats[0].controls.scrubber_enabled = false;
        completed(scheduler.tick(0.0, &mut fleet));
        completed(scheduler.tick(10.0, &mut fleet));
        let co2 = scheduler.state(EntityId(1)).unwrap().cabin_co2;
        assert!(co2 > 0.0);

        fleet[0].habitats[0].crew.clear();
        let report = completed(scheduler.tick(20.0, &mut fleet));
        assert_eq!(report.skip_reason(EntityId(1)), Some(SkipReason::NoCrew));
        assert!(report.pruned.is_empty());
        assert_eq!(scheduler.state(EntityId(1)).unwrap().cabin_co2, co2);
    }

    #[test]
    fn test_co2_spread_by_seat_share() {
        let mut v = SimVessel::new(1, "Station", VesselKind::Station)
            .with_habitat(Habitat::new("Big", 3))
            .with_habitat(Habitat::new("Small", 1))
            .with_habitat(Habitat::new("Lab", 0));
        v.habitats[2].cabin_co2 = 5.0;
        redistribute_co2(&mut v, 8.0, 2000.0);
        assert_eq!(v.habitats[0].cabin_co2, 6.0);
        assert_eq!(v.habitats[1].cabin_co2, 2.0);
        assert_eq!(v.habitats[2].cabin_co2, 0.0);
        assert_eq!(v.habitats[0].readout.co2_level, 0.001);
    }

    #[test]
    fn test_seeded_co2_from_habitats() {
        let mut scheduler = LifeSupportScheduler::new(LifeSupportConfig::default());
        let mut v = supplied(1, &["Jeb"]);
        v.habitats[0].cabin_co2 = 4.0;
        let mut fleet = vec![v];
        completed(scheduler.tick(0.0, &mut fleet));
        assert_eq!(scheduler.state(EntityId(1)).unwrap().cabin_co2, 4.0);
    }

    #[test]
    fn test_json_save_and_reload() {
        let mut scheduler = LifeSupportScheduler::new(LifeSupportConfig::default());
        let mut fleet = vec![supplied(1, &["Jeb"])];
        completed(scheduler.tick(0.0, &mut fleet));
        completed(scheduler.tick(5.0, &mut fleet));
        let json = scheduler.to_json().unwrap();

        let mut reloaded = LifeSupportScheduler::new(LifeSupportConfig::default());
        reloaded.load_json(&json).unwrap();
        let a = scheduler.state(EntityId(1)).unwrap();
        let b = reloaded.state(EntityId(1)).unwrap();
        assert_eq!(a.cabin_co2, b.cabin_co2);
        assert_eq!(a.timers, b.timers);
        assert_eq!(a.last_update_time, b.last_update_time);
        assert!(reloaded.load_json("[oops").is_err());
        assert_eq!(reloaded.tracked_count(), 1);
    }
}
