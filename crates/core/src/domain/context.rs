use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Clinical wound classification. Unknown codes are kept verbatim so that
/// rules and fallback lookups can still reason about them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WoundType {
    /// Diabetic foot ulcer
    Dfu,
    /// Venous leg ulcer
    Vlu,
    /// Pressure ulcer
    Pu,
    /// Traumatic wound
    Tw,
    /// Arterial ulcer
    Au,
    Other(String),
}

impl WoundType {
    pub fn parse(raw: &str) -> Self {
        let code = raw.trim().to_ascii_uppercase();
        match code.as_str() {
            "DFU" => Self::Dfu,
            "VLU" => Self::Vlu,
            "PU" => Self::Pu,
            "TW" => Self::Tw,
            "AU" => Self::Au,
            _ => Self::Other(code),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Dfu => "DFU",
            Self::Vlu => "VLU",
            Self::Pu => "PU",
            Self::Tw => "TW",
            Self::Au => "AU",
            Self::Other(code) => code,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Dfu => "diabetic foot ulcer",
            Self::Vlu => "venous leg ulcer",
            Self::Pu => "pressure ulcer",
            Self::Tw => "traumatic wound",
            Self::Au => "arterial ulcer",
            Self::Other(code) => code,
        }
    }
}

impl From<String> for WoundType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<WoundType> for String {
    fn from(value: WoundType) -> Self {
        value.code().to_string()
    }
}

impl fmt::Display for WoundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WoundCharacteristics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_cm2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_cm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_cm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_cm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exudate_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infection_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_weeks: Option<u32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl WoundCharacteristics {
    pub fn with_area(mut self, area_cm2: f64) -> Self {
        self.area_cm2 = Some(area_cm2);
        self
    }

    pub fn with_dimensions(mut self, length_cm: f64, width_cm: f64) -> Self {
        self.length_cm = Some(length_cm);
        self.width_cm = Some(width_cm);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum ContextError {
    #[error("wound_type must not be blank")]
    BlankWoundType,
    #[error("wound_characteristics.{field} must be a finite, non-negative number (got {value})")]
    InvalidMeasurement { field: &'static str, value: f64 },
    #[error("context could not be converted into a fact document: {0}")]
    Serialization(String),
}

/// Immutable snapshot of everything known about one recommendation request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_request_id: Option<String>,
    pub wound_type: WoundType,
    #[serde(default)]
    pub wound_characteristics: WoundCharacteristics,
    #[serde(default)]
    pub patient_factors: BTreeMap<String, Value>,
    #[serde(default)]
    pub payer_context: BTreeMap<String, Value>,
    #[serde(default)]
    pub facility_context: BTreeMap<String, Value>,
    #[serde(default)]
    pub provider_context: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_role: Option<String>,
    #[serde(default)]
    pub show_pricing: bool,
}

impl RecommendationContext {
    pub fn new(wound_type: WoundType) -> Self {
        Self {
            product_request_id: None,
            wound_type,
            wound_characteristics: WoundCharacteristics::default(),
            patient_factors: BTreeMap::new(),
            payer_context: BTreeMap::new(),
            facility_context: BTreeMap::new(),
            provider_context: BTreeMap::new(),
            user_role: None,
            show_pricing: false,
        }
    }

    pub fn with_product_request_id(mut self, id: impl Into<String>) -> Self {
        self.product_request_id = Some(id.into());
        self
    }

    pub fn with_characteristics(mut self, characteristics: WoundCharacteristics) -> Self {
        self.wound_characteristics = characteristics;
        self
    }

    pub fn with_patient_factor(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.patient_factors.insert(key.into(), value.into());
        self
    }

    pub fn with_payer_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payer_context.insert(key.into(), value.into());
        self
    }

    pub fn with_facility_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.facility_context.insert(key.into(), value.into());
        self
    }

    pub fn with_presentation(mut self, user_role: impl Into<String>, show_pricing: bool) -> Self {
        self.user_role = Some(user_role.into());
        self.show_pricing = show_pricing;
        self
    }

    pub fn correlation_id(&self) -> &str {
        self.product_request_id.as_deref().unwrap_or("unassigned")
    }

    pub fn validate(&self) -> Result<(), ContextError> {
        if self.wound_type.code().trim().is_empty() {
            return Err(ContextError::BlankWoundType);
        }

        let measurements = [
            ("area_cm2", self.wound_characteristics.area_cm2),
            ("length_cm", self.wound_characteristics.length_cm),
            ("width_cm", self.wound_characteristics.width_cm),
            ("depth_cm", self.wound_characteristics.depth_cm),
        ];
        for (field, value) in measurements {
            if let Some(value) = value {
                if !value.is_finite() || value < 0.0 {
                    return Err(ContextError::InvalidMeasurement { field, value });
                }
            }
        }

        Ok(())
    }

    /// JSON view of the context that rule predicates are evaluated against.
    pub fn to_fact_document(&self) -> Result<Value, ContextError> {
        serde_json::to_value(self).map_err(|error| ContextError::Serialization(error.to_string()))
    }
}
