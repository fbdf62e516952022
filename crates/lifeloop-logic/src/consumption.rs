//! Consume-A-produce-B conversions scaled by crew and satisfaction.
//!
//! Output follows input: a crew that gets 80% of its oxygen breathes out
//! 80% of its CO2. The input ratio is what the survival timers watch.

use serde::{Deserialize, Serialize};

use crate::config::{LifeSupportConfig, EPSILON};
use crate::host::VesselHost;
use crate::ledger;
use crate::substance::Substance;

/// One per-crew conversion: rates are per crew member per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub input: Substance,
    pub input_rate: f64,
    pub output: Substance,
    pub output_rate: f64,
}

/// Where the output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputSink {
    /// Into vessel storage through the ledger.
    Storage,
    /// Returned to the caller only (exhaled CO2 joins the cabin air).
    Cabin,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub produced: f64,
    /// Amount that fit in storage. Zero for [`OutputSink::Cabin`].
    pub stored: f64,
    pub input_ratio: f64,
}

impl Conversion {
    pub const NOOP: Conversion = Conversion {
        produced: 0.0,
        stored: 0.0,
        input_ratio: 1.0,
    };
}

/// Run a recipe for `crew` members over `elapsed` seconds.
pub fn convert<V: VesselHost + ?Sized>(
    host: &mut V,
    elapsed: f64,
    recipe: &Recipe,
    crew: u32,
    sink: OutputSink,
) -> Conversion {
    let crew = f64::from(crew);
    let requested = recipe.input_rate * elapsed * crew;
    if requested < EPSILON {
        return Conversion::NOOP;
    }

    let withdrawal = ledger::consume(host, recipe.input, requested);
    let produced = withdrawal.ratio * recipe.output_rate * elapsed * crew;
    let stored = match sink {
        OutputSink::Storage => ledger::produce(host, recipe.output, produced),
        OutputSink::Cabin => 0.0,
    };
    Conversion {
        produced,
        stored,
        input_ratio: withdrawal.ratio,
    }
}

/// Oxygen in, CO2 out.
pub fn respiration(config: &LifeSupportConfig) -> Recipe {
    Recipe {
        input: Substance::Oxygen,
        input_rate: config.consumption.oxygen,
        output: Substance::CarbonDioxide,
        output_rate: config.consumption.co2,
    }
}

pub fn eating(config: &LifeSupportConfig) -> Recipe {
    Recipe {
        input: Substance::Food,
        input_rate: config.consumption.food,
        output: Substance::Waste,
        output_rate: config.consumption.waste,
    }
}

pub fn drinking(config: &LifeSupportConfig) -> Recipe {
    Recipe {
        input: Substance::Water,
        input_rate: config.consumption.water,
        output: Substance::WasteWater,
        output_rate: config.consumption.wastewater,
    }
}
