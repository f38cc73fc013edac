//! Per-feature value updates.
//!
//! Each reading becomes a set of small string payloads, one per feature, on
//! `<topic>/<feature>`. Feature names follow the hemtjanst conventions. The
//! device itself is announced with the list of features it supports.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::types::{Message, MeterIdentity};

const DEVICE_TYPE: &str = "energyMeter";

pub const CURRENT_POWER: &str = "currentPower";
pub const CURRENT_POWER_PRODUCED: &str = "currentPowerProduced";
pub const ENERGY_USED: &str = "energyUsed";
pub const ENERGY_PRODUCED: &str = "energyProduced";

pub fn phase_current(index: usize) -> String {
    format!("phase{index}Current")
}

pub fn phase_voltage(index: usize) -> String {
    format!("phase{index}Voltage")
}

/// Formatted value of every feature present in `message`, in a stable order.
///
/// Power in whole watts, current with 3 decimals, voltage with 1 decimal,
/// energy in kWh with 3 decimals.
pub fn feature_values(message: &Message) -> Vec<(String, String)> {
    let mut values = Vec::new();

    if let Some(watts) = message.active_power_positive {
        values.push((CURRENT_POWER.to_string(), watts.to_string()));
    }
    if let Some(watts) = message.active_power_negative {
        values.push((CURRENT_POWER_PRODUCED.to_string(), watts.to_string()));
    }

    for phase in &message.phases {
        values.push((phase_current(phase.index), format!("{:.3}", phase.current)));
        values.push((phase_voltage(phase.index), format!("{:.1}", phase.voltage)));
    }

    if let Some(kwh) = message.active_energy_positive_kwh() {
        values.push((ENERGY_USED.to_string(), format!("{kwh:.3}")));
    }
    if let Some(kwh) = message.active_energy_negative_kwh() {
        values.push((ENERGY_PRODUCED.to_string(), format!("{kwh:.3}")));
    }

    values
}

/// Names of every feature the meter is known to report.
pub fn supported_features(identity: &MeterIdentity) -> Vec<String> {
    let mut features = Vec::new();
    if identity.reports_active_power_import() {
        features.push(CURRENT_POWER.to_string());
    }
    if identity.reports_active_power_export() {
        features.push(CURRENT_POWER_PRODUCED.to_string());
    }
    for index in 1..=identity.phase_count() {
        features.push(phase_current(index));
        features.push(phase_voltage(index));
    }
    if identity.reports_energy() {
        features.push(ENERGY_USED.to_string());
        features.push(ENERGY_PRODUCED.to_string());
    }
    features
}

/// Topic a device announcement is published on.
pub fn announce_topic(topic: &str) -> String {
    format!("announce/{topic}")
}

/// Per-feature settings of an announced device. Empty for read-only sensors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeatureInfo {}

/// Device announcement for feature-based consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub topic: String,
    pub name: String,
    pub manufacturer: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub model: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub serial_number: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub feature: BTreeMap<String, FeatureInfo>,
}

impl DeviceInfo {
    pub fn new(topic: &str, name: &str, identity: &MeterIdentity) -> Self {
        Self {
            topic: topic.to_string(),
            name: name.to_string(),
            manufacturer: "Kaifa".to_string(),
            model: identity.meter_type.clone().unwrap_or_default(),
            serial_number: identity.meter_id.clone().unwrap_or_default(),
            device_type: DEVICE_TYPE.to_string(),
            feature: supported_features(identity)
                .into_iter()
                .map(|name| (name, FeatureInfo::default()))
                .collect(),
        }
    }
}
