//! Save/load of survival state as flat key/value records.
//!
//! One record per tracked vessel. Loading is tolerant: a missing or
//! malformed field becomes zero (or "never processed" for the timestamp)
//! with a warning, and a record without a usable id is dropped. Only a
//! save file that is not JSON at all fails the load.

use std::collections::BTreeMap;

use crate::error::LifeSupportResult;
use crate::host::EntityId;
use crate::survival::{HazardTimers, SurvivalState};

/// A flat string-to-string record.
pub type SurvivalRecord = BTreeMap<String, String>;

/// Record field names.
pub mod record_keys {
    pub const ID: &str = "id";
    pub const CABIN_CO2: &str = "CabinCO2";
    pub const LOW_O2_TIME: &str = "LowO2Time";
    pub const LOW_WATER_TIME: &str = "LowWaterTime";
    pub const LOW_FOOD_TIME: &str = "LowFoodTime";
    pub const LOW_CLIMATE_TIME: &str = "LowClimateTime";
    pub const TEMP_RANGE_TIME: &str = "TempRangeTime";
    pub const LAST_UPDATE_TIME: &str = "LastUpdateTime";
}

/// Flatten one vessel's state.
pub fn to_record(id: EntityId, state: &SurvivalState) -> SurvivalRecord {
    use record_keys::*;
    let timers = &state.timers;
    let mut record = SurvivalRecord::new();
    record.insert(ID.into(), id.0.to_string());
    record.insert(CABIN_CO2.into(), state.cabin_co2.to_string());
    record.insert(LOW_O2_TIME.into(), timers.low_o2.to_string());
    record.insert(LOW_WATER_TIME.into(), timers.low_water.to_string());
    record.insert(LOW_FOOD_TIME.into(), timers.low_food.to_string());
    record.insert(LOW_CLIMATE_TIME.into(), timers.low_climate.to_string());
    record.insert(TEMP_RANGE_TIME.into(), timers.temp_range.to_string());
    if let Some(t) = state.last_update_time {
        record.insert(LAST_UPDATE_TIME.into(), t.to_string());
    }
    record
}

fn parse_number(record: &SurvivalRecord, key: &str) -> Option<f64> {
    let raw = record.get(key)?;
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            log::warn!("Malformed {} value '{}' in survival record (using 0)", key, raw);
            None
        }
    }
}

fn read_amount(record: &SurvivalRecord, key: &str) -> f64 {
    parse_number(record, key).unwrap_or(0.0).max(0.0)
}

/// Rebuild one vessel's state. `None` if the record has no usable id.
pub fn from_record(record: &SurvivalRecord) -> Option<(EntityId, SurvivalState)> {
    use record_keys::*;
    let id = match record.get(ID).map(|raw| raw.trim().parse::<u64>()) {
        Some(Ok(id)) => EntityId(id),
        _ => {
            log::warn!("Dropping survival record without a valid id: {:?}", record.get(ID));
            return None;
        }
    };
    let state = SurvivalState {
        cabin_co2: read_amount(record, CABIN_CO2),
        timers: HazardTimers {
            low_o2: read_amount(record, LOW_O2_TIME),
            low_water: read_amount(record, LOW_WATER_TIME),
            low_food: read_amount(record, LOW_FOOD_TIME),
            low_climate: read_amount(record, LOW_CLIMATE_TIME),
            temp_range: read_amount(record, TEMP_RANGE_TIME),
        },
        last_update_time: parse_number(record, LAST_UPDATE_TIME),
        ..Default::default()
    };
    Some((id, state))
}

pub fn to_records(states: &BTreeMap<EntityId, SurvivalState>) -> Vec<SurvivalRecord> {
    states.iter().map(|(id, s)| to_record(*id, s)).collect()
}

/// Rebuild the state store. Later records win on duplicate ids.
pub fn from_records(records: &[SurvivalRecord]) -> BTreeMap<EntityId, SurvivalState> {
    records.iter().filter_map(from_record).collect()
}

/// Serialize the state store as a JSON array of records.
pub fn save_json(states: &BTreeMap<EntityId, SurvivalState>) -> LifeSupportResult<String> {
    Ok(serde_json::to_string_pretty(&to_records(states))?)
}

pub fn load_json(text: &str) -> LifeSupportResult<BTreeMap<EntityId, SurvivalState>> {
    let records: Vec<SurvivalRecord> = serde_json::from_str(text)?;
    let states = from_records(&records);
    log::info!(
        "Loaded survival state for {} vessels ({} records)",
        states.len(),
        records.len()
    );
    Ok(states)
}
