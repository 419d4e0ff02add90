//! Registry entities shared by every pipeline stage.
//!
//! RULE: These are plain data. Stages take them by reference and return
//! new values; nothing here carries behaviour beyond derivations that are
//! a pure function of the entity's own fields.

use crate::types::{JurisdictionId, StateCode, WaterbodyId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Where a waterbody's resolved coordinate came from, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSource {
    Feed,
    Curated,
    Region,
    NameHint,
}

/// Registry severity. Declaration order is the ranking:
/// `None(0) < Low(1) < Medium(2) < High(3)`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn rank(self) -> u8 {
        match self {
            Severity::None => 0,
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
        }
    }

    /// Severity implied by an ATTAINS-style category code.
    /// "5" → high, "4x" → medium, "3" → low, anything else → none.
    pub fn from_category(code: &str) -> Self {
        let code = code.trim();
        if code.contains('5') {
            Severity::High
        } else if code.contains('4') {
            Severity::Medium
        } else if code.starts_with('3') {
            Severity::Low
        } else {
            Severity::None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// Category 4 or 5 means the water is listed as impaired.
pub fn category_is_impaired(code: &str) -> bool {
    code.contains('4') || code.contains('5')
}

/// Category 5 means impaired with no TMDL in place.
pub fn category_lacks_tmdl(code: &str) -> bool {
    code.contains('5')
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    #[default]
    NotAssessed,
    Assessed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waterbody {
    pub id: WaterbodyId,
    pub name: String,
    pub state: StateCode,
    #[serde(default)]
    pub coordinate: Option<Coordinate>,
    #[serde(default)]
    pub coordinate_source: Option<CoordinateSource>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub active_alerts: u32,
    #[serde(default)]
    pub data_sources: u32,
    #[serde(default)]
    pub status: AssessmentStatus,
    /// Regulatory category carried over from the assessment feed.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub causes: Vec<String>,
    #[serde(default)]
    pub area_acres: Option<f64>,
}

impl Waterbody {
    pub fn new(id: &str, name: &str, state: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            state: state.to_string(),
            coordinate: None,
            coordinate_source: None,
            severity: Severity::None,
            active_alerts: 0,
            data_sources: 0,
            status: AssessmentStatus::NotAssessed,
            category: None,
            causes: Vec::new(),
            area_acres: None,
        }
    }

    pub fn with_coordinate(mut self, lat: f64, lon: f64) -> Self {
        self.coordinate = Some(Coordinate::new(lat, lon));
        self.coordinate_source = Some(CoordinateSource::Feed);
        self
    }

    pub fn is_impaired(&self) -> bool {
        self.category.as_deref().is_some_and(category_is_impaired)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermitPhase {
    PhaseI,
    #[default]
    #[serde(rename = "phase_ii")]
    PhaseII,
}

/// Jurisdiction size tier. Selects the status-quo cost baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JurisdictionTier {
    Small,
    #[default]
    Medium,
    Large,
}

impl JurisdictionTier {
    pub fn as_str(self) -> &'static str {
        match self {
            JurisdictionTier::Small => "small",
            JurisdictionTier::Medium => "medium",
            JurisdictionTier::Large => "large",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jurisdiction {
    pub id: JurisdictionId,
    pub name: String,
    pub permit_id: String,
    #[serde(default)]
    pub phase: PermitPhase,
    /// Always assigned to this jurisdiction regardless of distance.
    #[serde(default)]
    pub primary_waterbodies: Vec<WaterbodyId>,
    pub center: Coordinate,
    #[serde(default)]
    pub zoom: Option<f64>,
    pub state_prefix: StateCode,
    /// Shore-neutral jurisdictions may claim waterbodies on either shore.
    #[serde(default)]
    pub shore_neutral: bool,
    #[serde(default)]
    pub tier: JurisdictionTier,
}

/// One external regulatory assessment for a waterbody.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub name: String,
    #[serde(alias = "category")]
    pub category_code: String,
    #[serde(default)]
    pub causes: Vec<String>,
    #[serde(default)]
    pub cycle: Option<String>,
    #[serde(default)]
    pub coordinate: Option<Coordinate>,
    #[serde(default)]
    pub state: Option<StateCode>,
}

impl AssessmentRecord {
    pub fn severity(&self) -> Severity {
        Severity::from_category(&self.category_code)
    }

    pub fn is_impaired(&self) -> bool {
        category_is_impaired(&self.category_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permit_phases_use_roman_numeral_names() {
        assert_eq!(serde_json::to_string(&PermitPhase::PhaseI).unwrap(), "\"phase_i\"");
        assert_eq!(serde_json::to_string(&PermitPhase::PhaseII).unwrap(), "\"phase_ii\"");
        let phase: PermitPhase = serde_json::from_str("\"phase_ii\"").unwrap();
        assert_eq!(phase, PermitPhase::PhaseII);
        let phase: PermitPhase = serde_json::from_str("\"phase_i\"").unwrap();
        assert_eq!(phase, PermitPhase::PhaseI);
    }

    #[test]
    fn category_codes() {
        assert!(category_is_impaired("4a"));
        assert!(category_lacks_tmdl(" 5 "));
        assert!(!category_is_impaired("2"));
        assert_eq!(Severity::from_category("3"), Severity::Low);
    }
}
