//! LifeLoop Headless Simulation Harness
//!
//! Validates pure life support logic and the shipped settings without a
//! host engine. Runs entirely in-process with synthetic vessels.
//!
//! Usage:
//!   cargo run -p lifeloop-simtest
//!   cargo run -p lifeloop-simtest -- --verbose
//!   RUST_LOG=lifeloop_logic=debug cargo run -p lifeloop-simtest

use lifeloop_logic::config::{
    parse_settings, LifeSupportConfig, SettingIssue, OPTIONAL_KEYS, REQUIRED_KEYS,
};
use lifeloop_logic::consumption::{self, OutputSink};
use lifeloop_logic::habitat::{Habitat, HeaterStatus, RadiatorStatus, ScrubberStatus};
use lifeloop_logic::host::{Container, EntityId, Radiator, SimVessel, VesselHost, VesselKind};
use lifeloop_logic::lod;
use lifeloop_logic::persistence;
use lifeloop_logic::scheduler::{LifeSupportScheduler, PassOutcome};
use lifeloop_logic::scrubber::{run_scrubbers, scrub_ceilings};
use lifeloop_logic::snapshot::VesselSnapshot;
use lifeloop_logic::substance::Substance;
use lifeloop_logic::survival::{self, HazardTimers, StatusLabel};
use lifeloop_logic::thermal;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ── Shipped settings (same file the host loads) ─────────────────────────
const SETTINGS_TOML: &str = include_str!("../../../data/life_support.toml");

const SWEEP_SEED: u64 = 0x11fe_100b;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    let default_filter = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    println!("=== LifeLoop Simulation Harness ===\n");

    let mut rng = StdRng::seed_from_u64(SWEEP_SEED);
    let mut results = Vec::new();

    // 1. Shipped settings
    let config = match load_settings(&mut results) {
        Some(config) => config,
        None => LifeSupportConfig::default(),
    };

    // 2. Consumption recipes
    results.extend(validate_consumption(&config));

    // 3. Scrubber ceilings
    results.extend(validate_scrubbers(&config, &mut rng));

    // 4. Climate control
    results.extend(validate_climate(&config));

    // 5. Survival status
    results.extend(validate_survival(&config));

    // 6. Irregular-step sweep over a mixed fleet
    results.extend(validate_sweep(&config, &mut rng, verbose));

    // 7. Save files and snapshots
    results.extend(validate_persistence(&config));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn stocked_vessel(id: u64, capacity: u32, crew: &[&str]) -> SimVessel {
    SimVessel::new(id, format!("Vessel {}", id), VesselKind::Ship)
        .with_habitat(Habitat::new("Crew Cabin", capacity).with_crew(crew.iter().copied()))
        .with_container(Container::full(Substance::Oxygen, 5000.0))
        .with_container(Container::full(Substance::Food, 5.0))
        .with_container(Container::full(Substance::Water, 10.0))
        .with_container(Container::new(Substance::Waste, 0.0, 5.0))
        .with_container(Container::new(Substance::WasteWater, 0.0, 10.0))
        .with_container(Container::full(Substance::ElectricCharge, 1.0e6))
        .with_container(Container::full(Substance::LithiumHydroxide, 2000.0).in_habitat(0))
        .with_container(Container::new(Substance::Waste, 0.0, 2000.0).in_habitat(0))
}

// ── 1. Settings ─────────────────────────────────────────────────────────

fn load_settings(results: &mut Vec<TestResult>) -> Option<LifeSupportConfig> {
    println!("--- Settings ---");

    let (config, issues) = match parse_settings(SETTINGS_TOML) {
        Ok(parsed) => parsed,
        Err(e) => {
            results.push(TestResult {
                name: "settings_parse".into(),
                passed: false,
                detail: format!("parse error: {}", e),
            });
            return None;
        }
    };

    results.push(TestResult {
        name: "settings_clean".into(),
        passed: issues.is_empty(),
        detail: format!("{} issues: {:?}", issues.len(), issues),
    });

    results.push(TestResult {
        name: "settings_match_builtin".into(),
        passed: config == LifeSupportConfig::default(),
        detail: "shipped file equals built-in defaults".into(),
    });

    let positive = [
        config.consumption.oxygen,
        config.consumption.co2,
        config.consumption.food,
        config.consumption.water,
        config.scrubber.scrub_per_seat,
        config.scrubber.reactant_per_seat,
        config.grace.oxygen,
        config.grace.climate,
        config.grace.temperature,
    ];
    results.push(TestResult {
        name: "settings_positive_rates".into(),
        passed: positive.iter().all(|&v| v > 0.0),
        detail: format!("{} rates checked", positive.len()),
    });

    results.push(TestResult {
        name: "settings_co2_thresholds_ordered".into(),
        passed: config.cabin.co2_warning < config.cabin.co2_fatal,
        detail: format!(
            "warning {} < fatal {}",
            config.cabin.co2_warning, config.cabin.co2_fatal
        ),
    });

    // A degraded document still loads.
    let degraded = SETTINGS_TOML.replace("OXYGEN_RATE", "OXYGEN_RAT");
    let degraded_ok = match parse_settings(&degraded) {
        Ok((c, issues)) => {
            c.consumption.oxygen == 0.0
                && issues.contains(&SettingIssue::Missing("OXYGEN_RATE".into()))
                && issues.contains(&SettingIssue::Unknown("OXYGEN_RAT".into()))
        }
        Err(_) => false,
    };
    results.push(TestResult {
        name: "settings_degraded_load".into(),
        passed: degraded_ok,
        detail: "missing key → 0, unknown key reported".into(),
    });

    results.push(TestResult {
        name: "settings_key_count".into(),
        passed: REQUIRED_KEYS.len() == 15,
        detail: format!(
            "{} required, {} optional",
            REQUIRED_KEYS.len(),
            OPTIONAL_KEYS.len()
        ),
    });

    Some(config)
}

// ── 2. Consumption ──────────────────────────────────────────────────────

fn validate_consumption(config: &LifeSupportConfig) -> Vec<TestResult> {
    println!("--- Consumption ---");
    let mut results = Vec::new();

    // One crew, one hour of breathing
    let mut v = stocked_vessel(1, 2, &["Jeb"]);
    let breath = consumption::convert(
        &mut v,
        3600.0,
        &consumption::respiration(config),
        1,
        OutputSink::Cabin,
    );
    let drawn = 5000.0 - v.stored(Substance::Oxygen);
    let expected = config.consumption.oxygen * 3600.0;
    results.push(TestResult {
        name: "consumption_hour_of_oxygen".into(),
        passed: (drawn - expected).abs() < 1e-6 && (breath.input_ratio - 1.0).abs() < 1e-9,
        detail: format!("drew {:.4} O2 (expected {:.4})", drawn, expected),
    });

    results.push(TestResult {
        name: "consumption_co2_to_cabin".into(),
        passed: (breath.produced - config.consumption.co2 * 3600.0).abs() < 1e-6
            && breath.stored == 0.0,
        detail: format!("{:.4} CO2 exhaled into the cabin", breath.produced),
    });

    // Solids come from containers in order
    let mut v = SimVessel::new(2, "Larder", VesselKind::Ship)
        .with_container(Container::full(Substance::Food, 0.01))
        .with_container(Container::full(Substance::Food, 1.0))
        .with_container(Container::new(Substance::Waste, 0.0, 1.0));
    let meal = consumption::convert(
        &mut v,
        1000.0,
        &consumption::eating(config),
        2,
        OutputSink::Storage,
    );
    let first_empty = v.containers[0].amount < 1e-12;
    results.push(TestResult {
        name: "consumption_manual_order".into(),
        passed: first_empty && (meal.input_ratio - 1.0).abs() < 1e-9,
        detail: format!(
            "first bin {:.4}, second bin {:.4}",
            v.containers[0].amount, v.containers[1].amount
        ),
    });

    // Half a supply gives half the output
    let mut v = SimVessel::new(3, "Dry", VesselKind::Ship)
        .with_container(Container::full(Substance::Water, 0.035))
        .with_container(Container::new(Substance::WasteWater, 0.0, 1.0));
    let drink = consumption::convert(
        &mut v,
        2000.0,
        &consumption::drinking(config),
        1,
        OutputSink::Storage,
    );
    results.push(TestResult {
        name: "consumption_partial_supply".into(),
        passed: (drink.input_ratio - 0.5).abs() < 1e-9,
        detail: format!("supply ratio {:.3}", drink.input_ratio),
    });

    results
}

// ── 3. Scrubbers ────────────────────────────────────────────────────────

fn validate_scrubbers(config: &LifeSupportConfig, rng: &mut StdRng) -> Vec<TestResult> {
    println!("--- Scrubbers ---");
    let mut results = Vec::new();

    // Reference case: fans are the binding ceiling
    let mut reference = config.clone();
    reference.scrubber.scrub_per_seat = 0.04;
    reference.scrubber.reactant_per_seat = 0.04;
    let mut v = SimVessel::new(10, "Pod", VesselKind::Ship)
        .with_habitat(Habitat::new("Pod", 2).with_crew(["Jeb"]))
        .with_container(Container::full(Substance::LithiumHydroxide, 1.0).in_habitat(0))
        .with_container(Container::new(Substance::Waste, 0.0, 1.0).in_habitat(0))
        .with_container(Container::full(Substance::ElectricCharge, 10.0));
    let report = run_scrubbers(&mut v, &reference, 10.0, 10.0);
    results.push(TestResult {
        name: "scrubber_reference_case".into(),
        passed: (report.removed - 0.8).abs() < 1e-9
            && report.habitats[0].status == ScrubberStatus::Active,
        detail: format!(
            "removed {:.3}, cabin left {:.3}, {}",
            report.removed,
            10.0 - report.removed,
            report.habitats[0].status
        ),
    });

    // Random sweep: never beyond the tightest ceiling
    let mut worst_excess: f64 = 0.0;
    let mut overdrawn = 0;
    for _ in 0..500 {
        let seats: u32 = rng.gen_range(0..6);
        let elapsed: f64 = rng.gen_range(0.02..600.0);
        let lioh: f64 = rng.gen_range(0.0..3.0);
        let co2: f64 = rng.gen_range(0.0..15.0);
        let mut v = SimVessel::new(11, "Sweep", VesselKind::Ship)
            .with_habitat(Habitat::new("Pod", seats).with_crew(["Val"]))
            .with_container(Container::full(Substance::LithiumHydroxide, lioh).in_habitat(0))
            .with_container(Container::full(Substance::ElectricCharge, 1.0e6));
        let ceilings = scrub_ceilings(
            config.scrubber.scrub_per_seat,
            seats.max(1),
            elapsed,
            lioh,
            config.scrubber.reactant_per_co2(),
            co2,
        );
        let report = run_scrubbers(&mut v, config, elapsed, co2);
        worst_excess = worst_excess.max(report.removed - ceilings.limit());
        if report.removed > co2 + 1e-12 || v.stored(Substance::LithiumHydroxide) < 0.0 {
            overdrawn += 1;
        }
    }
    results.push(TestResult {
        name: "scrubber_sweep_within_ceilings".into(),
        passed: worst_excess <= 1e-9,
        detail: format!("500 random cases, worst excess {:.2e}", worst_excess),
    });
    results.push(TestResult {
        name: "scrubber_sweep_no_overdraw".into(),
        passed: overdrawn == 0,
        detail: format!("{} cases overdrew CO2 or reactant", overdrawn),
    });

    // No power, no scrubbing
    let mut v = SimVessel::new(12, "Dark", VesselKind::Ship)
        .with_habitat(Habitat::new("Pod", 2).with_crew(["Bob"]))
        .with_container(Container::full(Substance::LithiumHydroxide, 1.0).in_habitat(0));
    let report = run_scrubbers(&mut v, config, 10.0, 10.0);
    results.push(TestResult {
        name: "scrubber_unpowered".into(),
        passed: report.removed == 0.0 && report.habitats[0].status == ScrubberStatus::NoPower,
        detail: format!("status {}", report.habitats[0].status),
    });

    results
}

// ── 4. Climate ──────────────────────────────────────────────────────────

fn validate_climate(config: &LifeSupportConfig) -> Vec<TestResult> {
    println!("--- Climate ---");
    let mut results = Vec::new();

    // Cold cabin starts the heater
    let mut v = stocked_vessel(20, 4, &["Jeb"]);
    v.habitats[0].thermal.cabin_temp = 18.0;
    v.hull_temps[0] = 18.0;
    let report = thermal::run_climate(&mut v, config, 1.0, &[0.0]);
    results.push(TestResult {
        name: "climate_cold_heats".into(),
        passed: v.habitats[0].readout.heater == HeaterStatus::Active
            && report.habitats[0].cabin_temp > 18.0,
        detail: format!("cabin {:.3} C", report.habitats[0].cabin_temp),
    });

    // Hot cabin deploys radiators
    let mut v = stocked_vessel(21, 4, &["Jeb"]).with_radiator(Radiator::default());
    v.habitats[0].thermal.cabin_temp = 35.0;
    v.hull_temps[0] = 35.0;
    let report = thermal::run_climate(&mut v, config, 1.0, &[0.0]);
    results.push(TestResult {
        name: "climate_hot_deploys_radiators".into(),
        passed: report.radiators_deployed == Some(true)
            && v.radiators[0].extended
            && v.habitats[0].readout.radiator == RadiatorStatus::Active,
        detail: format!("radiator command {:?}", report.radiators_deployed),
    });

    // High warp holds the setpoint
    let mut v = stocked_vessel(22, 4, &["Jeb"]);
    v.warp = 1000.0;
    v.habitats[0].thermal.cabin_temp = 3.0;
    let report = thermal::run_climate(&mut v, config, 50.0, &[0.0]);
    let setpoint = v.habitats[0].controls.setpoint();
    results.push(TestResult {
        name: "climate_on_rails".into(),
        passed: report.on_rails && (report.habitats[0].cabin_temp - setpoint).abs() < 1e-9,
        detail: format!("cabin pinned to {:.1} C", report.habitats[0].cabin_temp),
    });

    // Dead battery fails climate for a crewed cabin
    let mut v = SimVessel::new(23, "Flat", VesselKind::Ship)
        .with_habitat(Habitat::new("Pod", 1).with_crew(["Bill"]));
    let report = thermal::run_climate(&mut v, config, 1.0, &[]);
    results.push(TestResult {
        name: "climate_unpowered_fails".into(),
        passed: report.climate_failed,
        detail: format!("climate failed: {}", report.climate_failed),
    });

    results
}

// ── 5. Survival ─────────────────────────────────────────────────────────

fn validate_survival(config: &LifeSupportConfig) -> Vec<TestResult> {
    println!("--- Survival ---");
    let mut results = Vec::new();

    let clear = survival::evaluate(&HazardTimers::default(), 0.0, config);
    results.push(TestResult {
        name: "survival_nominal".into(),
        passed: clear == StatusLabel::Nominal,
        detail: clear.to_string(),
    });

    // Every hazard at once: CO2 wins, then oxygen
    let all = HazardTimers {
        low_o2: config.grace.oxygen + 1.0,
        low_water: config.grace.water + 1.0,
        low_food: config.grace.food + 1.0,
        low_climate: config.grace.climate + 1.0,
        temp_range: config.grace.temperature + 1.0,
    };
    let with_co2 = survival::evaluate(&all, config.cabin.co2_fatal, config);
    let without_co2 = survival::evaluate(&all, 0.0, config);
    results.push(TestResult {
        name: "survival_priority".into(),
        passed: with_co2 == StatusLabel::FatalCo2 && without_co2 == StatusLabel::Suffocated,
        detail: format!("{} / {}", with_co2, without_co2),
    });

    let waiting = HazardTimers {
        low_water: 10.0,
        ..Default::default()
    };
    let thirsty = survival::evaluate(&waiting, 0.0, config);
    results.push(TestResult {
        name: "survival_countdown".into(),
        passed: thirsty == StatusLabel::Thirsty(config.grace.water - 10.0) && !thirsty.is_fatal(),
        detail: thirsty.to_string(),
    });

    results
}

// ── 6. Sweep ────────────────────────────────────────────────────────────

fn validate_sweep(config: &LifeSupportConfig, rng: &mut StdRng, verbose: bool) -> Vec<TestResult> {
    println!("--- Irregular-Step Sweep ---");
    let mut results = Vec::new();

    let mut scheduler = LifeSupportScheduler::new(config.clone());
    let mut fleet = vec![
        stocked_vessel(100, 4, &["Jeb"]),
        stocked_vessel(101, 4, &["Bill", "Bob"]).unloaded(),
        stocked_vessel(102, 6, &["Val"]).unloaded(),
    ];
    let mut flag = stocked_vessel(103, 1, &["Nobody"]);
    flag.kind = VesselKind::Flag;
    fleet.push(flag);

    let stats = lod::classify_batch(&fleet);
    results.push(TestResult {
        name: "sweep_tiers".into(),
        passed: stats.loaded_count == 2 && stats.background_count == 2,
        detail: format!(
            "{} loaded, {} background",
            stats.loaded_count, stats.background_count
        ),
    });

    let mut now = 0.0;
    let mut passes = 0usize;
    let mut negative_co2 = 0usize;
    let mut negative_timers = 0usize;
    let mut clock_errors = 0usize;
    let mut regressions = 0usize;
    let mut tier_mismatches = 0usize;
    let mut deaths = Vec::new();
    let mut last_seen = std::collections::BTreeMap::<EntityId, f64>::new();

    while now < 86_400.0 {
        now += rng.gen_range(0.02..30.0);
        let report = match scheduler.tick(now, &mut fleet) {
            PassOutcome::Completed(report) => report,
            PassOutcome::ClockRegressed { .. } => {
                regressions += 1;
                continue;
            }
        };
        passes += 1;
        if report.tiers != stats {
            tier_mismatches += 1;
        }
        deaths.extend(report.deaths().map(|(id, name)| format!("{} on {}", name, id)));

        for (id, state) in scheduler.states() {
            if state.cabin_co2 < 0.0 {
                negative_co2 += 1;
            }
            let t = &state.timers;
            if [t.low_o2, t.low_water, t.low_food, t.low_climate, t.temp_range]
                .iter()
                .any(|&v| v < 0.0)
            {
                negative_timers += 1;
            }
            if let Some(stamp) = state.last_update_time {
                if let Some(&prev) = last_seen.get(id) {
                    if stamp < prev {
                        clock_errors += 1;
                    }
                }
                last_seen.insert(*id, stamp);
            }
        }
    }

    if verbose {
        for (id, state) in scheduler.states() {
            println!(
                "  {} CO2 {:.4} status {} last {:?}",
                id, state.cabin_co2, state.status, state.last_update_time
            );
        }
    }

    results.push(TestResult {
        name: "sweep_completed".into(),
        passed: regressions == 0 && passes > 1000,
        detail: format!("{} passes over one simulated day", passes),
    });
    results.push(TestResult {
        name: "sweep_tier_report".into(),
        passed: tier_mismatches == 0,
        detail: format!("{} passes reported a different tier split", tier_mismatches),
    });
    results.push(TestResult {
        name: "sweep_tracks_only_real_craft".into(),
        passed: scheduler.tracked_count() == 3 && scheduler.state(EntityId(103)).is_none(),
        detail: format!("{} vessels tracked", scheduler.tracked_count()),
    });
    results.push(TestResult {
        name: "sweep_co2_non_negative".into(),
        passed: negative_co2 == 0,
        detail: format!("{} negative CO2 readings", negative_co2),
    });
    results.push(TestResult {
        name: "sweep_timers_non_negative".into(),
        passed: negative_timers == 0,
        detail: format!("{} negative timers", negative_timers),
    });
    results.push(TestResult {
        name: "sweep_clock_monotonic".into(),
        passed: clock_errors == 0,
        detail: format!("{} backwards timestamps", clock_errors),
    });
    results.push(TestResult {
        name: "sweep_supplied_crew_survive".into(),
        passed: deaths.is_empty(),
        detail: if deaths.is_empty() {
            "no casualties with full supplies".into()
        } else {
            format!("casualties: {}", deaths.join(", "))
        },
    });

    let temps: Vec<f64> = fleet[0].habitats.iter().map(|h| h.thermal.cabin_temp).collect();
    let safe = temps
        .iter()
        .all(|&t| t >= config.cabin.min_safe_temp && t <= config.cabin.max_safe_temp);
    results.push(TestResult {
        name: "sweep_loaded_cabin_stable".into(),
        passed: safe,
        detail: format!("loaded cabin temps {:?}", temps),
    });

    // Background cabins never integrate temperature.
    let background_temp = fleet[1].habitats[0].thermal.cabin_temp;
    results.push(TestResult {
        name: "sweep_background_no_thermal".into(),
        passed: background_temp == 20.0,
        detail: format!("background cabin {:.2} C", background_temp),
    });

    let oxygen_used = 5000.0 - fleet[1].stored(Substance::Oxygen);
    let ceiling = config.consumption.oxygen * 2.0 * now;
    results.push(TestResult {
        name: "sweep_background_consumes".into(),
        passed: oxygen_used > 0.0 && oxygen_used <= ceiling + 1e-6,
        detail: format!("background used {:.2} O2 (at most {:.2})", oxygen_used, ceiling),
    });

    results
}

// ── 7. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(config: &LifeSupportConfig) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let mut results = Vec::new();

    let mut scheduler = LifeSupportScheduler::new(config.clone());
    let mut fleet = vec![stocked_vessel(200, 2, &["Jeb"])];
    fleet[0].habitats[0].controls.scrubber_enabled = false;
    for t in 0..20 {
        scheduler.tick(f64::from(t) * 3.0, &mut fleet);
    }

    let records = scheduler.save_records();
    let mut reloaded = LifeSupportScheduler::new(config.clone());
    reloaded.load_records(&records);
    let same = reloaded.states().iter().all(|(id, state)| {
        scheduler.state(*id).map_or(false, |orig| {
            orig.cabin_co2 == state.cabin_co2
                && orig.timers == state.timers
                && orig.last_update_time == state.last_update_time
        })
    });
    results.push(TestResult {
        name: "persistence_records_roundtrip".into(),
        passed: same && reloaded.tracked_count() == 1,
        detail: format!("{} records", records.len()),
    });

    let json_ok = match scheduler.to_json() {
        Ok(json) => persistence::load_json(&json).map_or(false, |states| states.len() == 1),
        Err(_) => false,
    };
    results.push(TestResult {
        name: "persistence_json_roundtrip".into(),
        passed: json_ok,
        detail: "save file reloads".into(),
    });

    let snapshot = fleet[0].to_snapshot();
    let snapshot_ok = match snapshot.to_json() {
        Ok(json) => match VesselSnapshot::from_json(&json) {
            Ok(back) => {
                let restored = SimVessel::from_snapshot(&back);
                back == snapshot && !restored.is_loaded() && restored.crew_count() == 1
            }
            Err(_) => false,
        },
        Err(_) => false,
    };
    results.push(TestResult {
        name: "persistence_snapshot_roundtrip".into(),
        passed: snapshot_ok,
        detail: format!("{} habitats, {} containers", snapshot.habitats.len(), snapshot.containers.len()),
    });

    let future = serde_json::json!({ "version": 99, "id": 1 }).to_string();
    results.push(TestResult {
        name: "persistence_rejects_newer_snapshot".into(),
        passed: VesselSnapshot::from_json(&future).is_err(),
        detail: "version 99 rejected".into(),
    });

    results
}
