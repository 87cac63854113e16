use serde::{Deserialize, Serialize};

use crate::domain::context::WoundCharacteristics;

/// Size used when the wound carries no usable measurement.
pub const DEFAULT_WOUND_AREA_CM2: f64 = 4.0;
pub const MARGIN_FACTOR: f64 = 1.5;
pub const LARGE_WOUND_MINIMUM_CM2: f64 = 20.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeSuggestionKey {
    #[default]
    #[serde(rename = "MATCH_WOUND_AREA")]
    MatchWoundArea,
    #[serde(rename = "WOUND_AREA_PLUS_MARGIN")]
    WoundAreaPlusMargin,
    #[serde(rename = "STANDARD_2x2")]
    Standard2x2,
    #[serde(rename = "STANDARD_4x4")]
    Standard4x4,
    #[serde(rename = "LARGE_WOUND")]
    LargeWound,
}

impl SizeSuggestionKey {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "MATCH_WOUND_AREA" => Some(Self::MatchWoundArea),
            "WOUND_AREA_PLUS_MARGIN" => Some(Self::WoundAreaPlusMargin),
            "STANDARD_2X2" => Some(Self::Standard2x2),
            "STANDARD_4X4" => Some(Self::Standard4x4),
            "LARGE_WOUND" => Some(Self::LargeWound),
            _ => None,
        }
    }

    /// Absent or unrecognized keys resolve to `MatchWoundArea`.
    pub fn resolve(raw: Option<&str>) -> Self {
        raw.and_then(Self::parse).unwrap_or_default()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MatchWoundArea => "MATCH_WOUND_AREA",
            Self::WoundAreaPlusMargin => "WOUND_AREA_PLUS_MARGIN",
            Self::Standard2x2 => "STANDARD_2x2",
            Self::Standard4x4 => "STANDARD_4x4",
            Self::LargeWound => "LARGE_WOUND",
        }
    }
}

/// Measured wound area: explicit area, else length × width, else the default.
pub fn wound_area_cm2(characteristics: &WoundCharacteristics) -> f64 {
    if let Some(area) = characteristics.area_cm2.filter(|area| *area > 0.0) {
        return area;
    }
    match (characteristics.length_cm, characteristics.width_cm) {
        (Some(length), Some(width)) if length > 0.0 && width > 0.0 => length * width,
        _ => DEFAULT_WOUND_AREA_CM2,
    }
}

pub fn calculate_suggested_size(
    key: SizeSuggestionKey,
    characteristics: &WoundCharacteristics,
) -> f64 {
    match key {
        SizeSuggestionKey::MatchWoundArea => wound_area_cm2(characteristics),
        SizeSuggestionKey::WoundAreaPlusMargin => wound_area_cm2(characteristics) * MARGIN_FACTOR,
        SizeSuggestionKey::Standard2x2 => 4.0,
        SizeSuggestionKey::Standard4x4 => 16.0,
        SizeSuggestionKey::LargeWound => {
            wound_area_cm2(characteristics).max(LARGE_WOUND_MINIMUM_CM2)
        }
    }
}
