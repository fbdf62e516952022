//! End-to-end life support scenarios through the scheduler.
//!
//! Exercises: consumption → scrubbing → climate → survival → CO2 mixing,
//! for loaded vessels and background snapshots, across save and reload.
//!
//! All tests are pure logic — no engine, no rendering.

use lifeloop_logic::config::LifeSupportConfig;
use lifeloop_logic::habitat::{Habitat, HeaterStatus, ScrubberStatus};
use lifeloop_logic::host::{
    Container, CrewMember, EntityId, RosterStatus, SimVessel, VesselHost, VesselKind,
};
use lifeloop_logic::scheduler::{LifeSupportScheduler, PassOutcome, SkipReason, TickReport};
use lifeloop_logic::scrubber::run_scrubbers;
use lifeloop_logic::snapshot::VesselSnapshot;
use lifeloop_logic::substance::Substance;
use lifeloop_logic::survival::StatusLabel;

// ── Helpers ────────────────────────────────────────────────────────────

fn supplied_vessel(id: u64, capacity: u32, crew: &[&str]) -> SimVessel {
    SimVessel::new(id, "Kestrel", VesselKind::Ship)
        .with_habitat(Habitat::new("Command Pod", capacity).with_crew(crew.iter().copied()))
        .with_container(Container::full(Substance::Oxygen, 5000.0))
        .with_container(Container::full(Substance::Food, 100.0))
        .with_container(Container::full(Substance::Water, 100.0))
        .with_container(Container::new(Substance::Waste, 0.0, 100.0))
        .with_container(Container::new(Substance::WasteWater, 0.0, 100.0))
        .with_container(Container::full(Substance::ElectricCharge, 1_000_000.0))
        .with_container(Container::full(Substance::LithiumHydroxide, 100.0).in_habitat(0))
        .with_container(Container::new(Substance::Waste, 0.0, 100.0).in_habitat(0))
}

fn completed(outcome: PassOutcome) -> TickReport {
    match outcome {
        PassOutcome::Completed(report) => report,
        other => panic!("expected a completed pass, got {:?}", other),
    }
}

/// A loaded vessel whose oxygen plumbing only ever delivers half a request.
struct HalfOxygen {
    vessel: SimVessel,
}

impl VesselHost for HalfOxygen {
    fn id(&self) -> EntityId {
        self.vessel.id()
    }
    fn kind(&self) -> VesselKind {
        self.vessel.kind()
    }
    fn is_loaded(&self) -> bool {
        self.vessel.is_loaded()
    }
    fn habitats(&self) -> &[Habitat] {
        self.vessel.habitats()
    }
    fn habitats_mut(&mut self) -> &mut [Habitat] {
        self.vessel.habitats_mut()
    }
    fn containers(&self) -> &[Container] {
        self.vessel.containers()
    }
    fn containers_mut(&mut self) -> &mut [Container] {
        self.vessel.containers_mut()
    }
    fn network_transfer(&mut self, substance: Substance, amount: f64) -> f64 {
        if substance == Substance::Oxygen && amount > 0.0 {
            amount * 0.5
        } else {
            self.vessel.network_transfer(substance, amount)
        }
    }
    fn on_crew_killed(&mut self, member: &CrewMember) {
        self.vessel.on_crew_killed(member);
    }
}

// ── Scrubber ───────────────────────────────────────────────────────────

#[test]
fn scrubber_limited_by_fans() {
    let mut config = LifeSupportConfig::default();
    config.scrubber.scrub_per_seat = 0.04;
    config.scrubber.reactant_per_seat = 0.04;
    config.scrubber.ec_per_seat = 0.01;

    let mut vessel = SimVessel::new(1, "Scrub Test", VesselKind::Ship)
        .with_habitat(Habitat::new("Pod", 2).with_crew(["Jeb"]))
        .with_container(Container::full(Substance::LithiumHydroxide, 1.0).in_habitat(0))
        .with_container(Container::new(Substance::Waste, 0.0, 5.0).in_habitat(0))
        .with_container(Container::full(Substance::ElectricCharge, 10.0));

    let cabin_co2 = 10.0;
    let report = run_scrubbers(&mut vessel, &config, 10.0, cabin_co2);

    assert!((report.removed - 0.8).abs() < 1e-9);
    assert!((cabin_co2 - report.removed - 9.2).abs() < 1e-9);
    assert!((vessel.stored(Substance::LithiumHydroxide) - 0.2).abs() < 1e-9);
    assert_eq!(report.habitats[0].status, ScrubberStatus::Active);
}

#[test]
fn scrubbers_keep_up_with_one_crew() {
    let config = LifeSupportConfig::default();
    let mut scheduler = LifeSupportScheduler::new(config);
    let mut fleet = vec![supplied_vessel(1, 4, &["Jeb"])];

    for t in 0..=600 {
        completed(scheduler.tick(t as f64, &mut fleet));
    }
    let state = scheduler.state(EntityId(1)).unwrap();
    assert!(state.cabin_co2 < 0.01, "CO2 built up: {}", state.cabin_co2);
    assert_eq!(state.status, StatusLabel::Nominal);
    assert_eq!(fleet[0].habitats[0].readout.scrubber, ScrubberStatus::Active);
}

// ── Survival ───────────────────────────────────────────────────────────

#[test]
fn half_oxygen_suffocates_after_grace() {
    let mut config = LifeSupportConfig::default();
    config.grace.oxygen = 4.0;
    let mut scheduler = LifeSupportScheduler::new(config);
    let mut fleet = vec![HalfOxygen {
        vessel: supplied_vessel(1, 2, &["Jeb", "Bill"]),
    }];

    completed(scheduler.tick(0.0, &mut fleet));
    for t in 1..=4 {
        let report = completed(scheduler.tick(t as f64, &mut fleet));
        let tick = report.vessel(EntityId(1)).unwrap();
        assert!(
            matches!(tick.status, StatusLabel::Suffocating(_)),
            "tick {}: {}",
            t,
            tick.status
        );
        assert!(tick.killed.is_empty());
    }
    assert_eq!(scheduler.state(EntityId(1)).unwrap().timers.low_o2, 4.0);

    let report = completed(scheduler.tick(5.0, &mut fleet));
    let tick = report.vessel(EntityId(1)).unwrap();
    assert_eq!(tick.status, StatusLabel::Suffocated);
    assert_eq!(tick.status.to_string(), "Crew suffocated");
    assert_eq!(tick.killed, vec!["Jeb", "Bill"]);
    assert_eq!(fleet[0].crew_count(), 0);
    assert!(fleet[0]
        .vessel
        .casualties
        .iter()
        .all(|c| c.status == RosterStatus::Dead));

    // Dead crews are not simulated again.
    let report = completed(scheduler.tick(6.0, &mut fleet));
    assert_eq!(report.skip_reason(EntityId(1)), Some(SkipReason::NoCrew));
    assert_eq!(report.deaths().count(), 0);
}

#[test]
fn fatal_co2_outranks_suffocation() {
    let mut config = LifeSupportConfig::default();
    config.grace.oxygen = 0.0;
    let mut scheduler = LifeSupportScheduler::new(config);

    let mut vessel = SimVessel::new(1, "Stale", VesselKind::Ship)
        .with_habitat(Habitat::new("Pod", 1).with_crew(["Val"]))
        .with_container(Container::full(Substance::ElectricCharge, 1000.0));
    vessel.habitats[0].controls.scrubber_enabled = false;
    vessel.habitats[0].cabin_co2 = 400.0;
    let mut fleet = vec![vessel];

    completed(scheduler.tick(0.0, &mut fleet));
    let report = completed(scheduler.tick(1.0, &mut fleet));
    let tick = report.vessel(EntityId(1)).unwrap();
    assert_eq!(tick.status, StatusLabel::FatalCo2);
    assert_eq!(tick.killed, vec!["Val"]);
    // Both hazards were still timed.
    assert_eq!(scheduler.state(EntityId(1)).unwrap().timers.low_o2, 1.0);
}

#[test]
fn dangerous_co2_is_a_warning_only() {
    let mut scheduler = LifeSupportScheduler::new(LifeSupportConfig::default());
    let mut vessel = supplied_vessel(1, 1, &["Bob"]);
    vessel.habitats[0].controls.scrubber_enabled = false;
    vessel.habitats[0].cabin_co2 = 100.0;
    let mut fleet = vec![vessel];

    completed(scheduler.tick(0.0, &mut fleet));
    let report = completed(scheduler.tick(1.0, &mut fleet));
    let tick = report.vessel(EntityId(1)).unwrap();
    assert_eq!(tick.status, StatusLabel::DangerousCo2);
    assert!(tick.killed.is_empty());
    assert!((fleet[0].habitats[0].readout.co2_level - 0.05).abs() < 1e-3);
}

#[test]
fn unpowered_climate_kills_after_grace() {
    let mut config = LifeSupportConfig::default();
    config.grace.climate = 30.0;
    let mut scheduler = LifeSupportScheduler::new(config);
    let mut vessel = supplied_vessel(1, 1, &["Jeb"]);
    vessel.habitats[0].controls.climate_control_enabled = false;
    let mut fleet = vec![vessel];

    completed(scheduler.tick(0.0, &mut fleet));
    let report = completed(scheduler.tick(20.0, &mut fleet));
    let tick = report.vessel(EntityId(1)).unwrap();
    assert!(tick.climate_failed);
    assert_eq!(tick.status, StatusLabel::CirculationFailed(10.0));
    assert_eq!(tick.status.to_string(), "Air Circulation Failed (10s)");

    let report = completed(scheduler.tick(40.0, &mut fleet));
    assert_eq!(
        report.vessel(EntityId(1)).unwrap().status,
        StatusLabel::StagnantAir
    );
    assert_eq!(fleet[0].crew_count(), 0);
}

#[test]
fn restored_supply_clears_timer() {
    let mut scheduler = LifeSupportScheduler::new(LifeSupportConfig::default());
    let mut vessel = supplied_vessel(1, 1, &["Jeb"]);
    for c in vessel.containers.iter_mut() {
        if c.substance == Substance::Water {
            c.amount = 0.0;
        }
    }
    let mut fleet = vec![vessel];

    completed(scheduler.tick(0.0, &mut fleet));
    let report = completed(scheduler.tick(10.0, &mut fleet));
    assert_eq!(
        report.vessel(EntityId(1)).unwrap().status.to_string(),
        format!("Thirsty ({:.0}s)", LifeSupportConfig::default().grace.water - 10.0)
    );

    for c in fleet[0].containers.iter_mut() {
        if c.substance == Substance::Water {
            c.amount = c.capacity;
        }
    }
    let report = completed(scheduler.tick(20.0, &mut fleet));
    assert_eq!(report.vessel(EntityId(1)).unwrap().status, StatusLabel::Nominal);
    assert_eq!(scheduler.state(EntityId(1)).unwrap().timers.low_water, 0.0);
}

// ── Climate ────────────────────────────────────────────────────────────

#[test]
fn cold_cabin_starts_heater() {
    let mut scheduler = LifeSupportScheduler::new(LifeSupportConfig::default());
    let mut vessel = supplied_vessel(1, 2, &["Jeb"]);
    vessel.habitats[0].thermal.cabin_temp = 18.0;
    vessel.hull_temps[0] = 18.0;
    let mut fleet = vec![vessel];

    completed(scheduler.tick(0.0, &mut fleet));
    completed(scheduler.tick(1.0, &mut fleet));
    let hab = &fleet[0].habitats[0];
    assert_eq!(hab.readout.heater, HeaterStatus::Active);
    assert!(hab.thermal.heater_active());
    assert!(hab.thermal.cabin_temp > 18.0);
}

#[test]
fn background_vessel_never_accrues_temperature_time() {
    let mut scheduler = LifeSupportScheduler::new(LifeSupportConfig::default());
    let mut vessel = supplied_vessel(1, 1, &["Jeb"]);
    vessel.habitats[0].thermal.cabin_temp = 80.0;
    let mut fleet = vec![SimVessel::from_snapshot(&vessel.to_snapshot())];

    completed(scheduler.tick(0.0, &mut fleet));
    completed(scheduler.tick(3600.0, &mut fleet));
    let state = scheduler.state(EntityId(1)).unwrap();
    assert_eq!(state.timers.temp_range, 0.0);
    assert_eq!(fleet[0].habitats[0].thermal.cabin_temp, 80.0);
}

// ── Scheduling ─────────────────────────────────────────────────────────

#[test]
fn clock_regression_then_resume() {
    let mut scheduler = LifeSupportScheduler::new(LifeSupportConfig::default());
    let mut fleet = vec![supplied_vessel(1, 1, &["Jeb"])];
    completed(scheduler.tick(100.0, &mut fleet));
    completed(scheduler.tick(110.0, &mut fleet));
    let saved = scheduler.states().clone();
    let oxygen = fleet[0].stored(Substance::Oxygen);

    let outcome = scheduler.tick(105.0, &mut fleet);
    assert_eq!(
        outcome,
        PassOutcome::ClockRegressed {
            entity: EntityId(1),
            elapsed: -5.0
        }
    );
    assert_eq!(scheduler.states(), &saved);
    assert_eq!(fleet[0].stored(Substance::Oxygen), oxygen);

    let report = completed(scheduler.tick(111.0, &mut fleet));
    assert_eq!(report.vessel(EntityId(1)).unwrap().elapsed, 1.0);
}

#[test]
fn co2_mixes_across_habitats_by_capacity() {
    let mut scheduler = LifeSupportScheduler::new(LifeSupportConfig::default());
    let mut vessel = supplied_vessel(1, 3, &["Jeb"])
        .with_habitat(Habitat::new("Hab Module", 1).with_crew(["Bill"]));
    vessel.habitats[0].controls.scrubber_enabled = false;
    vessel.habitats[1].controls.scrubber_enabled = false;
    let mut fleet = vec![vessel];

    completed(scheduler.tick(0.0, &mut fleet));
    completed(scheduler.tick(60.0, &mut fleet));
    let total = scheduler.state(EntityId(1)).unwrap().cabin_co2;
    assert!(total > 0.0);
    let habs = &fleet[0].habitats;
    assert!((habs[0].cabin_co2 - total * 0.75).abs() < 1e-9);
    assert!((habs[1].cabin_co2 - total * 0.25).abs() < 1e-9);
    assert_eq!(habs[0].readout.co2_level, habs[1].readout.co2_level);
}

#[test]
fn save_and_reload_matches_continuous_run() {
    let config = LifeSupportConfig::default();
    let mut continuous = LifeSupportScheduler::new(config.clone());
    let mut interrupted = LifeSupportScheduler::new(config.clone());
    let mut vessel = supplied_vessel(1, 2, &["Jeb", "Bill"]);
    vessel.habitats[0].controls.scrubber_enabled = false;
    let mut fleet_a = vec![vessel.clone()];
    let mut fleet_b = vec![vessel];

    for t in 0..=5 {
        completed(continuous.tick(t as f64 * 10.0, &mut fleet_a));
        completed(interrupted.tick(t as f64 * 10.0, &mut fleet_b));
    }
    let json = interrupted.to_json().unwrap();
    let mut reloaded = LifeSupportScheduler::new(config);
    reloaded.load_json(&json).unwrap();

    for t in 6..=10 {
        completed(continuous.tick(t as f64 * 10.0, &mut fleet_a));
        completed(reloaded.tick(t as f64 * 10.0, &mut fleet_b));
    }
    let a = continuous.state(EntityId(1)).unwrap();
    let b = reloaded.state(EntityId(1)).unwrap();
    assert_eq!(a.cabin_co2, b.cabin_co2);
    assert_eq!(a.timers, b.timers);
    assert_eq!(a.last_update_time, b.last_update_time);
    assert_eq!(a.status, b.status);
}

#[test]
fn background_snapshot_starves_over_long_step() {
    let mut config = LifeSupportConfig::default();
    config.grace.food = 86_400.0;
    let mut scheduler = LifeSupportScheduler::new(config);

    let json = r#"{
        "version": 1,
        "id": 42,
        "name": "Relay Outpost",
        "kind": "Base",
        "habitats": [ { "name": "Hab", "crew_capacity": 2,
                        "crew": [ { "name": "Jeb" }, { "name": "Val" } ] } ],
        "containers": [
            { "substance": "Oxygen", "amount": 100000.0, "capacity": 100000.0 },
            { "substance": "Water", "amount": 100.0, "capacity": 100.0 },
            { "substance": "ElectricCharge", "amount": 100000.0, "capacity": 100000.0 },
            { "substance": "LithiumHydroxide", "amount": 5000.0, "capacity": 5000.0, "habitat": 0 },
            { "substance": "Food", "amount": 0.0, "capacity": 10.0 }
        ]
    }"#;
    let snapshot = VesselSnapshot::from_json(json).unwrap();
    let mut fleet = vec![SimVessel::from_snapshot(&snapshot)];

    completed(scheduler.tick(0.0, &mut fleet));
    let report = completed(scheduler.tick(50_000.0, &mut fleet));
    assert!(matches!(
        report.vessel(EntityId(42)).unwrap().status,
        StatusLabel::Starving(_)
    ));
    let report = completed(scheduler.tick(100_000.0, &mut fleet));
    let tick = report.vessel(EntityId(42)).unwrap();
    assert_eq!(tick.status, StatusLabel::Starved);
    assert_eq!(tick.killed.len(), 2);
}
