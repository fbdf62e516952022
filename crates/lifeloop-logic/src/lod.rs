//! Simulation tiers for loaded and background vessels.
//!
//! Loaded vessels are simulated every tick with full physics. Background
//! vessels exist only as snapshots: they skip thermal integration, always
//! use manual container apportionment, and are batched so that sub-second
//! background work is not done every frame.
//!
//! # Tiers
//!
//! | Tier | Who | Processed | Thermal | Readouts |
//! |------|-----|-----------|---------|----------|
//! | `Loaded` | Vessels in physics range | every tick | full | yes |
//! | `Background` | Everything else | once `elapsed ≥ interval` | power gate only | no |
//!
//! # Usage
//!
//! ```
//! use lifeloop_logic::lod::{should_process, SimTier};
//!
//! assert!(should_process(SimTier::Loaded, 0.02, 1.0));
//! assert!(!should_process(SimTier::Background, 0.02, 1.0));
//! assert!(should_process(SimTier::Background, 1.0, 1.0));
//! ```

use serde::{Deserialize, Serialize};

use crate::host::VesselHost;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimTier {
    /// Fully simulated in place.
    Loaded,
    /// Snapshot-only, processed in batches.
    Background,
}

pub fn classify<V: VesselHost + ?Sized>(host: &V) -> SimTier {
    if host.is_loaded() {
        SimTier::Loaded
    } else {
        SimTier::Background
    }
}

/// Whether a vessel in `tier` should be processed after `elapsed` seconds
/// without an update. Background vessels wait for `background_interval`.
pub fn should_process(tier: SimTier, elapsed: f64, background_interval: f64) -> bool {
    match tier {
        SimTier::Loaded => true,
        SimTier::Background => elapsed >= background_interval,
    }
}

/// How many of a pass's vessels sit in each tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LodStats {
    pub loaded_count: usize,
    pub background_count: usize,
}

impl LodStats {
    pub fn total(&self) -> usize {
        self.loaded_count + self.background_count
    }
}

pub fn classify_batch<V: VesselHost>(vessels: &[V]) -> LodStats {
    let mut stats = LodStats::default();
    for vessel in vessels {
        match classify(vessel) {
            SimTier::Loaded => stats.loaded_count += 1,
            SimTier::Background => stats.background_count += 1,
        }
    }
    stats
}
