//! Property search output: coordinates and planning layers for an address.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Layer name carrying the Local Environmental Plan that applies to a lot.
pub const LEP_LAYER: &str = "Local Environmental Plan";
/// Attribute of [`LEP_LAYER`] holding the instrument name.
pub const EPI_NAME_ATTRIBUTE: &str = "EPI Name";

const LEP_SUFFIX: &str = " Local Environmental Plan";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A named attribute set returned by the planning GIS service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningLayer {
    pub layer: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl PlanningLayer {
    pub fn new(layer: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// String value of an attribute, if present and a string.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub epi_layers: Vec<PlanningLayer>,
    #[serde(default)]
    pub protection_layers: Vec<PlanningLayer>,
    #[serde(default)]
    pub other_layers: Vec<PlanningLayer>,
}

impl PropertyData {
    /// Name of the Local Environmental Plan, e.g.
    /// `"Cumberland Local Environmental Plan 2021"`.
    pub fn lep_name(&self) -> Option<&str> {
        self.epi_layers
            .iter()
            .find(|l| l.layer == LEP_LAYER)
            .and_then(|l| l.attribute_str(EPI_NAME_ATTRIBUTE))
    }

    /// Council name taken from the LEP name: everything before
    /// `" Local Environmental Plan"`.
    pub fn council_from_lep(&self) -> Option<String> {
        let name = self.lep_name()?;
        let idx = name.find(LEP_SUFFIX)?;
        let council = name[..idx].trim();
        if council.is_empty() {
            None
        } else {
            Some(council.to_string())
        }
    }

    /// Every layer regardless of group.
    pub fn all_layers(&self) -> impl Iterator<Item = &PlanningLayer> {
        self.epi_layers
            .iter()
            .chain(self.protection_layers.iter())
            .chain(self.other_layers.iter())
    }
}
