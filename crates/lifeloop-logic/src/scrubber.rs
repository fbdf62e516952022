//! CO2 scrubbers — per-habitat removal bounded by three ceilings.
//!
//! Each enabled, powered scrubber removes the least of:
//! - **mechanical**: what its fans can move (`rate × seats × dt`),
//! - **chemical**: what the reactant in its own cartridges can absorb,
//! - **environmental**: what CO2 is left in the shared cabin pool.
//!
//! Spent reactant becomes waste in the same habitat. The removal rate is
//! returned per habitat because the thermal pass turns it into heat.

use serde::{Deserialize, Serialize};

use crate::config::{LifeSupportConfig, EPSILON};
use crate::habitat::ScrubberStatus;
use crate::host::VesselHost;
use crate::ledger;
use crate::substance::Substance;

/// The three limits on one scrubber's removal this tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrubCeilings {
    pub mechanical: f64,
    pub chemical: f64,
    pub environmental: f64,
}

impl ScrubCeilings {
    pub fn limit(&self) -> f64 {
        self.mechanical
            .min(self.chemical)
            .min(self.environmental)
            .max(0.0)
    }
}

/// Compute the ceilings for one scrubber.
///
/// `reactant_per_co2` is the stoichiometric ratio (reactant rate over scrub
/// rate). The chemical ceiling is `reactant_on_hand × reactant_per_co2`; a
/// non-positive ratio means nothing can be absorbed.
pub fn scrub_ceilings(
    scrub_per_seat: f64,
    seats: u32,
    elapsed: f64,
    reactant_on_hand: f64,
    reactant_per_co2: f64,
    available_co2: f64,
) -> ScrubCeilings {
    let chemical = if reactant_per_co2 > 0.0 {
        reactant_on_hand.max(0.0) * reactant_per_co2
    } else {
        0.0
    };
    ScrubCeilings {
        mechanical: scrub_per_seat * f64::from(seats) * elapsed,
        chemical,
        environmental: available_co2.max(0.0),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HabitatScrub {
    pub status: ScrubberStatus,
    pub scrubbed: f64,
    /// CO2 removed per second this tick.
    pub rate: f64,
}

impl Default for HabitatScrub {
    fn default() -> Self {
        Self {
            status: ScrubberStatus::Off,
            scrubbed: 0.0,
            rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrubReport {
    /// Total CO2 removed from the cabin pool.
    pub removed: f64,
    /// One entry per habitat, in habitat order.
    pub habitats: Vec<HabitatScrub>,
}

impl ScrubReport {
    pub fn rates(&self) -> Vec<f64> {
        self.habitats.iter().map(|h| h.rate).collect()
    }
}

/// Run every habitat's scrubber against the shared cabin CO2 pool.
///
/// Never removes more than `available_co2`. Status readouts are written
/// only for loaded vessels.
pub fn run_scrubbers<V: VesselHost + ?Sized>(
    host: &mut V,
    config: &LifeSupportConfig,
    elapsed: f64,
    available_co2: f64,
) -> ScrubReport {
    let mut available = available_co2.max(0.0);
    let mut report = ScrubReport::default();
    let ratio = config.scrubber.reactant_per_co2();

    for i in 0..host.habitats().len() {
        let result = scrub_habitat(host, config, i, elapsed, available, ratio);
        available = (available - result.scrubbed).max(0.0);
        report.removed += result.scrubbed;
        report.habitats.push(result);

        if host.is_loaded() {
            let readout = &mut host.habitats_mut()[i].readout;
            readout.scrubber = result.status;
            readout.last_scrub_rate = result.rate;
        }
    }

    report.removed = report.removed.min(available_co2.max(0.0));
    report
}

fn scrub_habitat<V: VesselHost + ?Sized>(
    host: &mut V,
    config: &LifeSupportConfig,
    index: usize,
    elapsed: f64,
    available: f64,
    ratio: f64,
) -> HabitatScrub {
    let habitat = &host.habitats()[index];
    if !habitat.controls.scrubber_enabled {
        return HabitatScrub::default();
    }
    let seats = habitat.crew_capacity.max(1);

    let ec = config.scrubber.ec_per_seat * f64::from(seats) * elapsed;
    let power = ledger::consume(host, Substance::ElectricCharge, ec);
    if power.ratio < config.power_threshold {
        return HabitatScrub {
            status: ScrubberStatus::NoPower,
            ..Default::default()
        };
    }

    let on_hand = ledger::available_local(&*host, index, Substance::LithiumHydroxide);
    let ceilings = scrub_ceilings(
        config.scrubber.scrub_per_seat,
        seats,
        elapsed,
        on_hand,
        ratio,
        available,
    );
    let actual = ceilings.limit();
    log::trace!(
        "scrubber {}: mechanical {:.4} chemical {:.4} environmental {:.4}",
        index,
        ceilings.mechanical,
        ceilings.chemical,
        ceilings.environmental
    );
    if actual < EPSILON {
        return HabitatScrub {
            status: ScrubberStatus::Standby,
            ..Default::default()
        };
    }

    let required = actual * ratio;
    let reactant = ledger::consume_local(host, index, Substance::LithiumHydroxide, required);
    ledger::produce_local(host, index, Substance::Waste, reactant.taken);

    let (status, scrubbed) = if reactant.is_short() {
        (ScrubberStatus::NoReactant, actual * reactant.ratio)
    } else {
        (ScrubberStatus::Active, actual)
    };
    let rate = if elapsed > 0.0 { scrubbed / elapsed } else { 0.0 };
    HabitatScrub {
        status,
        scrubbed,
        rate,
    }
}
