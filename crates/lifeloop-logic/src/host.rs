//! The host capability interface and an in-memory host.
//!
//! The simulation never assumes a concrete object graph. Everything it
//! needs from the embedding application (habitats, storage containers,
//! hull temperatures, radiators, crew removal) goes through
//! [`VesselHost`]. A loaded vessel and a background snapshot implement the
//! same trait; [`SimVessel`] implements it for both, and is what the tests
//! and the headless harness drive.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::habitat::Habitat;
use crate::ledger::{drain_containers, fill_containers};
use crate::substance::Substance;

/// Hull temperature reported for a habitat with no reading (°C).
pub const DEFAULT_HULL_TEMP: f64 = 20.0;

/// Opaque vessel identity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VesselKind {
    #[default]
    Ship,
    Station,
    Base,
    Lander,
    Rover,
    Probe,
    Relay,
    Debris,
    Eva,
    /// Decorative marker planted on a surface.
    Flag,
    /// Asteroid or comet.
    SpaceObject,
    Unknown,
}

impl VesselKind {
    /// Whether survival state should ever be kept for this kind.
    pub fn is_tracked(self) -> bool {
        !matches!(
            self,
            VesselKind::Flag | VesselKind::SpaceObject | VesselKind::Unknown
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RosterStatus {
    #[default]
    Assigned,
    Dead,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewMember {
    pub name: String,
    #[serde(default)]
    pub status: RosterStatus,
}

impl CrewMember {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: RosterStatus::Assigned,
        }
    }
}

/// One storage tank, bin, or battery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub substance: Substance,
    pub amount: f64,
    pub capacity: f64,
    /// Habitat this container is built into, if any. Habitat-local
    /// substances (scrubber cartridges, their spent output) only move
    /// through containers tagged with the habitat's index.
    #[serde(default)]
    pub habitat: Option<usize>,
}

impl Container {
    pub fn new(substance: Substance, amount: f64, capacity: f64) -> Self {
        Self {
            substance,
            amount,
            capacity,
            habitat: None,
        }
    }

    /// A full container.
    pub fn full(substance: Substance, capacity: f64) -> Self {
        Self::new(substance, capacity, capacity)
    }

    pub fn in_habitat(mut self, index: usize) -> Self {
        self.habitat = Some(index);
        self
    }

    pub fn free_space(&self) -> f64 {
        (self.capacity - self.amount).max(0.0)
    }
}

/// A radiator panel that life support may command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Radiator {
    /// Panels with this off are left alone.
    pub allow_auto_deploy: bool,
    pub cooling: bool,
    /// Whether the panel has a deploy mechanism.
    pub deployable: bool,
    pub extended: bool,
}

impl Default for Radiator {
    fn default() -> Self {
        Self {
            allow_auto_deploy: true,
            cooling: false,
            deployable: true,
            extended: false,
        }
    }
}

impl Radiator {
    /// Command the panel into (or out of) its cooling-extended state.
    /// Idempotent; panels that have not opted in are untouched.
    pub fn command(&mut self, cool: bool) {
        if !self.allow_auto_deploy {
            return;
        }
        self.cooling = cool;
        if self.deployable {
            self.extended = cool;
        }
    }
}

/// Everything the simulation needs from a vessel.
pub trait VesselHost {
    fn id(&self) -> EntityId;
    fn kind(&self) -> VesselKind;

    fn is_destroyed(&self) -> bool {
        false
    }

    /// Fully simulated (`true`) or a background snapshot (`false`).
    fn is_loaded(&self) -> bool;

    fn habitats(&self) -> &[Habitat];
    fn habitats_mut(&mut self) -> &mut [Habitat];

    /// Ordered storage containers.
    fn containers(&self) -> &[Container];
    fn containers_mut(&mut self) -> &mut [Container];

    fn crew_count(&self) -> u32 {
        self.habitats().iter().map(Habitat::crew_count).sum()
    }

    fn crew_capacity(&self) -> u32 {
        self.habitats().iter().map(|h| h.crew_capacity).sum()
    }

    /// Move a networked substance through the vessel's plumbing.
    ///
    /// Positive `amount` withdraws, negative deposits. Returns the
    /// magnitude actually moved. The default treats every container of
    /// the substance as one pool.
    fn network_transfer(&mut self, substance: Substance, amount: f64) -> f64 {
        let pool = self
            .containers_mut()
            .iter_mut()
            .filter(|c| c.substance == substance);
        if amount >= 0.0 {
            drain_containers(pool, amount)
        } else {
            fill_containers(pool, -amount)
        }
    }

    /// Hull/skin temperature at a habitat (°C).
    fn hull_temperature(&self, _habitat: usize) -> f64 {
        DEFAULT_HULL_TEMP
    }

    /// Inject heat flux (kW) into a habitat's hull.
    fn add_hull_flux(&mut self, _habitat: usize, _kw: f64) {}

    /// Current time acceleration factor.
    fn warp_rate(&self) -> f64 {
        1.0
    }

    fn radiators_mut(&mut self) -> &mut [Radiator] {
        &mut []
    }

    fn sas_engaged(&self) -> bool {
        false
    }

    fn rcs_engaged(&self) -> bool {
        false
    }

    /// Called once per crew member killed, after they leave their seat.
    fn on_crew_killed(&mut self, _member: &CrewMember) {}
}

/// An in-memory vessel, usable loaded or as a background snapshot.
#[derive(Debug, Clone, Default)]
pub struct SimVessel {
    pub id: EntityId,
    pub name: String,
    pub kind: VesselKind,
    pub loaded: bool,
    pub destroyed: bool,
    pub habitats: Vec<Habitat>,
    pub containers: Vec<Container>,
    pub radiators: Vec<Radiator>,
    /// Per-habitat hull temperature (°C).
    pub hull_temps: Vec<f64>,
    /// Per-habitat hull flux received since last cleared (kW).
    pub hull_flux: Vec<f64>,
    pub warp: f64,
    pub sas: bool,
    pub rcs: bool,
    /// Crew killed on this vessel, in order.
    pub casualties: Vec<CrewMember>,
}

impl SimVessel {
    /// A loaded vessel with no habitats or storage.
    pub fn new(id: u64, name: impl Into<String>, kind: VesselKind) -> Self {
        Self {
            id: EntityId(id),
            name: name.into(),
            kind,
            loaded: true,
            warp: 1.0,
            ..Default::default()
        }
    }

    /// Switch to the background (snapshot) representation.
    pub fn unloaded(mut self) -> Self {
        self.loaded = false;
        self
    }

    pub fn with_habitat(mut self, habitat: Habitat) -> Self {
        self.habitats.push(habitat);
        self.hull_temps.push(DEFAULT_HULL_TEMP);
        self.hull_flux.push(0.0);
        self
    }

    pub fn with_container(mut self, container: Container) -> Self {
        self.containers.push(container);
        self
    }

    pub fn with_radiator(mut self, radiator: Radiator) -> Self {
        self.radiators.push(radiator);
        self
    }

    /// Total stored amount of a substance.
    pub fn stored(&self, substance: Substance) -> f64 {
        self.containers
            .iter()
            .filter(|c| c.substance == substance)
            .map(|c| c.amount)
            .sum()
    }

    /// Total cabin CO2 across habitats.
    pub fn cabin_co2(&self) -> f64 {
        self.habitats.iter().map(|h| h.cabin_co2).sum()
    }
}

impl VesselHost for SimVessel {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> VesselKind {
        self.kind
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn habitats(&self) -> &[Habitat] {
        &self.habitats
    }

    fn habitats_mut(&mut self) -> &mut [Habitat] {
        &mut self.habitats
    }

    fn containers(&self) -> &[Container] {
        &self.containers
    }

    fn containers_mut(&mut self) -> &mut [Container] {
        &mut self.containers
    }

    fn hull_temperature(&self, habitat: usize) -> f64 {
        self.hull_temps
            .get(habitat)
            .copied()
            .unwrap_or(DEFAULT_HULL_TEMP)
    }

    fn add_hull_flux(&mut self, habitat: usize, kw: f64) {
        if let Some(flux) = self.hull_flux.get_mut(habitat) {
            *flux += kw;
        }
    }

    fn warp_rate(&self) -> f64 {
        self.warp
    }

    fn radiators_mut(&mut self) -> &mut [Radiator] {
        &mut self.radiators
    }

    fn sas_engaged(&self) -> bool {
        self.sas
    }

    fn rcs_engaged(&self) -> bool {
        self.rcs
    }

    fn on_crew_killed(&mut self, member: &CrewMember) {
        self.casualties.push(member.clone());
    }
}
