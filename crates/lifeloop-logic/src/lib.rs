//! Pure life support simulation logic for LifeLoop.
//!
//! This crate simulates closed-loop life support and cabin climate for
//! crewed vessels. It is independent of any game engine or database:
//! the host application describes its vessels through the
//! [`host::VesselHost`] trait, and the [`scheduler::LifeSupportScheduler`]
//! advances them tick by tick, whether they are fully loaded or running in
//! the background from snapshots.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Rates, grace periods, thresholds, and tolerant settings loading |
//! | [`consumption`] | Crew respiration, eating, drinking as consume-and-produce recipes |
//! | [`error`] | Error types for settings, save files, and snapshots |
//! | [`habitat`] | Crew compartments: toggles, device rates, readouts |
//! | [`host`] | Host capability trait, vessel kinds, crew, containers, radiators |
//! | [`ledger`] | Networked vs per-container resource withdrawal and storage |
//! | [`lod`] | Loaded / background simulation tiers and batching |
//! | [`persistence`] | Flat key/value survival records and JSON save files |
//! | [`scheduler`] | Per-tick driver owning the per-vessel survival state |
//! | [`scrubber`] | CO2 removal bounded by fans, reactant, and cabin CO2 |
//! | [`snapshot`] | Typed, versioned background vessel snapshots |
//! | [`substance`] | Substances and how they flow |
//! | [`survival`] | Hazard timers, status priority, crew death |
//! | [`thermal`] | Cabin air temperature, thermostat, heater, radiators |

pub mod config;
pub mod consumption;
pub mod error;
pub mod habitat;
pub mod host;
pub mod ledger;
pub mod lod;
pub mod persistence;
pub mod scheduler;
pub mod scrubber;
pub mod snapshot;
pub mod substance;
pub mod survival;
pub mod thermal;

pub use config::LifeSupportConfig;
pub use error::{LifeSupportError, LifeSupportResult};
pub use host::{EntityId, SimVessel, VesselHost, VesselKind};
pub use scheduler::{LifeSupportScheduler, PassOutcome, TickReport};
