//! Typed, versioned vessel snapshots — the background representation.
//!
//! A snapshot carries exactly what background processing reads: per-habitat
//! toggles, rates, crew manifest, cabin CO2 and temperature, and the
//! vessel's ordered containers. Fields missing from an older document take
//! their defaults; a document from a newer format version is rejected.

use serde::{Deserialize, Serialize};

use crate::error::{LifeSupportError, LifeSupportResult};
use crate::habitat::{habitat_constants, Habitat, HabitatRates};
use crate::host::{Container, CrewMember, EntityId, RosterStatus, SimVessel, VesselHost, VesselKind};

pub const SNAPSHOT_VERSION: u32 = 1;

fn current_version() -> u32 {
    SNAPSHOT_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HabitatSnapshot {
    pub name: String,
    pub crew_capacity: u32,
    pub crew: Vec<CrewMember>,
    pub scrubber_enabled: bool,
    pub climate_control_enabled: bool,
    pub avionics_enabled: bool,
    pub auto_deploy_radiators: bool,
    pub thermostat_setpoint: f64,
    pub rates: HabitatRates,
    pub cabin_co2: f64,
    pub cabin_temp: f64,
}

impl Default for HabitatSnapshot {
    fn default() -> Self {
        Self {
            name: String::new(),
            crew_capacity: 0,
            crew: Vec::new(),
            scrubber_enabled: true,
            climate_control_enabled: true,
            avionics_enabled: true,
            auto_deploy_radiators: true,
            thermostat_setpoint: habitat_constants::DEFAULT_SETPOINT,
            rates: HabitatRates::default(),
            cabin_co2: 0.0,
            cabin_temp: habitat_constants::INITIAL_CABIN_TEMP,
        }
    }
}

impl HabitatSnapshot {
    pub fn capture(habitat: &Habitat) -> Self {
        Self {
            name: habitat.name.clone(),
            crew_capacity: habitat.crew_capacity,
            crew: habitat.crew.clone(),
            scrubber_enabled: habitat.controls.scrubber_enabled,
            climate_control_enabled: habitat.controls.climate_control_enabled,
            avionics_enabled: habitat.controls.avionics_enabled,
            auto_deploy_radiators: habitat.controls.auto_deploy_radiators,
            thermostat_setpoint: habitat.controls.setpoint(),
            rates: habitat.rates.clone(),
            cabin_co2: habitat.cabin_co2,
            cabin_temp: habitat.thermal.cabin_temp,
        }
    }

    /// Rebuild the habitat. Crew already marked dead are not reseated.
    pub fn restore(&self) -> Habitat {
        let mut habitat = Habitat::new(self.name.clone(), self.crew_capacity);
        for member in self.crew.iter().filter(|m| m.status != RosterStatus::Dead) {
            habitat.seat(member.clone());
        }
        habitat.controls.scrubber_enabled = self.scrubber_enabled;
        habitat.controls.climate_control_enabled = self.climate_control_enabled;
        habitat.controls.avionics_enabled = self.avionics_enabled;
        habitat.controls.auto_deploy_radiators = self.auto_deploy_radiators;
        habitat.controls.set_setpoint(self.thermostat_setpoint);
        habitat.rates = self.rates.clone();
        habitat.cabin_co2 = self.cabin_co2.max(0.0);
        habitat.thermal.cabin_temp = self.cabin_temp;
        habitat
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VesselSnapshot {
    #[serde(default = "current_version")]
    pub version: u32,
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: VesselKind,
    #[serde(default)]
    pub habitats: Vec<HabitatSnapshot>,
    #[serde(default)]
    pub containers: Vec<Container>,
}

impl VesselSnapshot {
    pub fn capture<V: VesselHost + ?Sized>(host: &V, name: impl Into<String>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            id: host.id(),
            name: name.into(),
            kind: host.kind(),
            habitats: host.habitats().iter().map(HabitatSnapshot::capture).collect(),
            containers: host.containers().to_vec(),
        }
    }

    pub fn to_json(&self) -> LifeSupportResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> LifeSupportResult<Self> {
        let snapshot: VesselSnapshot = serde_json::from_str(text)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(LifeSupportError::UnsupportedSnapshotVersion {
                found: snapshot.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(snapshot)
    }
}

impl SimVessel {
    /// A background vessel built from a snapshot.
    pub fn from_snapshot(snapshot: &VesselSnapshot) -> Self {
        let mut vessel = SimVessel::new(snapshot.id.0, snapshot.name.clone(), snapshot.kind).unloaded();
        for habitat in &snapshot.habitats {
            vessel = vessel.with_habitat(habitat.restore());
        }
        vessel.containers = snapshot.containers.clone();
        vessel
    }

    pub fn to_snapshot(&self) -> VesselSnapshot {
        VesselSnapshot::capture(self, self.name.clone())
    }
}
