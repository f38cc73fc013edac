//! Home Assistant device discovery documents.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::types::MeterIdentity;

const MANUFACTURER: &str = "Kaifa";
const ORIGIN_NAME: &str = "Kraft";
const SUPPORT_URL: &str = "https://github.com/hemtjanst/kraft";

/// Topic the discovery document is published on.
pub fn discovery_topic(hass_name: &str) -> String {
    format!("homeassistant/device/{hass_name}/config")
}

/// Topic the retained state message is published on.
pub fn state_topic(hass_name: &str) -> String {
    format!("homeassistant/{hass_name}/state")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub identifiers: Vec<String>,
    pub manufacturer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sw_version: Option<String>,
    pub serial_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Origin {
    pub name: String,
    pub sw_version: String,
    pub support_url: String,
}

/// One sensor entity of the device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Component {
    pub name: String,
    pub platform: String,
    pub unit_of_measurement: String,
    pub value_template: String,
    pub unique_id: String,
    pub state_class: String,
    pub device_class: String,
}

/// Device-based discovery document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discovery {
    #[serde(rename = "dev")]
    pub device: Device,
    #[serde(rename = "o")]
    pub origin: Origin,
    #[serde(rename = "cmps")]
    pub components: BTreeMap<String, Component>,
    pub state_topic: String,
}

impl Discovery {
    /// Build the document for a meter, or `None` while its id is unknown.
    pub fn for_identity(identity: &MeterIdentity, hass_name: &str) -> Option<Self> {
        let meter_id = identity.meter_id.as_deref()?;
        let mut components = BTreeMap::new();
        let mut add = |key: String, name: String, sensor: Sensor, template: String| {
            let component = Component {
                name,
                platform: "sensor".to_string(),
                unit_of_measurement: sensor.unit.to_string(),
                value_template: format!("{{{{ value_json.{template} }}}}"),
                unique_id: format!("kaifa_{meter_id}_{key}"),
                state_class: sensor.state_class.to_string(),
                device_class: sensor.device_class.to_string(),
            };
            components.insert(key, component);
        };

        if identity.reports_active_power_import() {
            add("input_power".into(), "Input Power".into(), POWER, "ActivePowerPositive".into());
        }
        if identity.reports_active_power_export() {
            add("output_power".into(), "Output Power".into(), POWER, "ActivePowerNegative".into());
        }
        for n in 1..=identity.phase_count() {
            let idx = n - 1;
            add(
                format!("phase_{n}_current"),
                format!("Phase {n} Current"),
                CURRENT,
                format!("Phases[{idx}].Current"),
            );
            add(
                format!("phase_{n}_voltage"),
                format!("Phase {n} Voltage"),
                VOLTAGE,
                format!("Phases[{idx}].Voltage"),
            );
        }
        if identity.reports_energy() {
            add(
                "consumed_energy".into(),
                "Consumed Energy".into(),
                ENERGY,
                "ActiveEnergyPositive".into(),
            );
            add(
                "returned_energy".into(),
                "Returned Energy".into(),
                ENERGY,
                "ActiveEnergyNegative".into(),
            );
        }

        Some(Self {
            device: Device {
                identifiers: vec![meter_id.to_string()],
                manufacturer: MANUFACTURER.to_string(),
                model: identity.meter_type.clone(),
                name: hass_name.to_string(),
                sw_version: identity.version.clone(),
                serial_number: meter_id.to_string(),
            },
            origin: Origin {
                name: ORIGIN_NAME.to_string(),
                sw_version: env!("CARGO_PKG_VERSION").to_string(),
                support_url: SUPPORT_URL.to_string(),
            },
            components,
            state_topic: state_topic(hass_name),
        })
    }
}

#[derive(Clone, Copy)]
struct Sensor {
    unit: &'static str,
    state_class: &'static str,
    device_class: &'static str,
}

const POWER: Sensor = Sensor { unit: "W", state_class: "measurement", device_class: "power" };
const CURRENT: Sensor = Sensor { unit: "A", state_class: "measurement", device_class: "current" };
const VOLTAGE: Sensor = Sensor { unit: "V", state_class: "measurement", device_class: "voltage" };
const ENERGY: Sensor =
    Sensor { unit: "Wh", state_class: "total_increasing", device_class: "energy" };
