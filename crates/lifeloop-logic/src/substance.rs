//! Substances tracked by the life support loop and how they move.
//!
//! Whether a substance "flows freely across the network" is declared here,
//! never inferred from where it happens to be stored. Gases, liquids and
//! electric charge are piped; solids (food packets, spent scrubber
//! cartridges, waste bags) have to be carried container by container.

use serde::{Deserialize, Serialize};

/// How a substance is apportioned between an entity's containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowMode {
    /// One pool across the whole vessel; the host's plumbing moves it.
    Networked,
    /// Drawn from / stored into containers one at a time, in order.
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Substance {
    Oxygen,
    CarbonDioxide,
    Food,
    Water,
    Waste,
    WasteWater,
    LithiumHydroxide,
    ElectricCharge,
}

impl Substance {
    pub const ALL: [Substance; 8] = [
        Substance::Oxygen,
        Substance::CarbonDioxide,
        Substance::Food,
        Substance::Water,
        Substance::Waste,
        Substance::WasteWater,
        Substance::LithiumHydroxide,
        Substance::ElectricCharge,
    ];

    pub fn flow_mode(self) -> FlowMode {
        match self {
            Substance::Oxygen
            | Substance::CarbonDioxide
            | Substance::Water
            | Substance::WasteWater
            | Substance::ElectricCharge => FlowMode::Networked,
            Substance::Food | Substance::Waste | Substance::LithiumHydroxide => FlowMode::Manual,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Substance::Oxygen => "Oxygen",
            Substance::CarbonDioxide => "CarbonDioxide",
            Substance::Food => "Food",
            Substance::Water => "Water",
            Substance::Waste => "Waste",
            Substance::WasteWater => "WasteWater",
            Substance::LithiumHydroxide => "LithiumHydroxide",
            Substance::ElectricCharge => "ElectricCharge",
        }
    }

    /// Look up a substance by its resource name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.name() == name)
    }
}

impl std::fmt::Display for Substance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
