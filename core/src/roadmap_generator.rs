//! RoadmapGenerator: expands a sized deployment into ordered phases.
//!
//! PARTITION:
//!   Phase 1 is the sizer's first-phase subset. The remaining quads are
//!   split evenly over at most `max_phases - 1` further phases; the last
//!   phase absorbs any remainder. An unphased deployment is one phase.
//!
//! Mission and placement come from a fixed decision table keyed on the
//! phase's impairment driver and its role in the rollout. Text is rendered
//! from the codes separately, so callers can test against the codes.
//!
//! Phase k targets the k-th detected driver (precedence nutrients >
//! bacteria > sediment), or the last one when there are more phases than
//! drivers. No driver at all means a general-purpose baseline deployment.

use crate::{
    config::{RoadmapConfig, SizingConfig},
    deployment_sizer::DeploymentSize,
    parameters::ParameterKey,
    severity_scorer::{ImpairmentDriver, SeverityAssessment, SeverityLabel},
    types::WaterbodyId,
};
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Reason codes ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseRole {
    /// First phase aimed at a driver.
    Lead,
    /// Further capacity for a driver already targeted.
    Extend,
    /// Final phase of a three-phase rollout on a repeated driver.
    Verify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mission {
    InterceptNutrients,
    InterceptBacteria,
    CaptureSediment,
    EstablishBaseline,
    ExtendCoverage,
    VerifyReductions,
}

impl Mission {
    pub fn text(self) -> &'static str {
        match self {
            Mission::InterceptNutrients => "Nutrient interception",
            Mission::InterceptBacteria => "Bacteria source tracking",
            Mission::CaptureSediment => "Sediment capture",
            Mission::EstablishBaseline => "Baseline characterization",
            Mission::ExtendCoverage => "Coverage expansion",
            Mission::VerifyReductions => "Load-reduction verification",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    HighestNutrientOutfall,
    BacteriaSourceReach,
    SedimentSourceInlet,
    RepresentativeStation,
    UpstreamTributaries,
    StormOutfallNetwork,
    AdjacentStations,
    DownstreamReceivingWater,
}

impl Placement {
    pub fn text(self) -> &'static str {
        match self {
            Placement::HighestNutrientOutfall => {
                "At the outfall carrying the highest nitrogen and phosphorus load"
            }
            Placement::BacteriaSourceReach => "In the reach nearest the suspected bacteria source",
            Placement::SedimentSourceInlet => "At the inlet receiving eroding or disturbed-land runoff",
            Placement::RepresentativeStation => "At the most representative monitoring station",
            Placement::UpstreamTributaries => "On the upstream tributaries feeding the Phase 1 zone",
            Placement::StormOutfallNetwork => "Across the remaining storm outfalls in the catchment",
            Placement::AdjacentStations => "At stations adjacent to the Phase 1 zone",
            Placement::DownstreamReceivingWater => "In the downstream receiving water",
        }
    }
}

struct DecisionRow {
    driver: Option<ImpairmentDriver>,
    role: PhaseRole,
    mission: Mission,
    placement: Placement,
}

const fn row(
    driver: Option<ImpairmentDriver>,
    role: PhaseRole,
    mission: Mission,
    placement: Placement,
) -> DecisionRow {
    DecisionRow {
        driver,
        role,
        mission,
        placement,
    }
}

use ImpairmentDriver::{Bacteria, Nutrients, Sediment};
use PhaseRole::{Extend, Lead, Verify};

const DECISION_TABLE: &[DecisionRow] = &[
    row(Some(Nutrients), Lead, Mission::InterceptNutrients, Placement::HighestNutrientOutfall),
    row(Some(Bacteria), Lead, Mission::InterceptBacteria, Placement::BacteriaSourceReach),
    row(Some(Sediment), Lead, Mission::CaptureSediment, Placement::SedimentSourceInlet),
    row(None, Lead, Mission::EstablishBaseline, Placement::RepresentativeStation),
    row(Some(Nutrients), Extend, Mission::ExtendCoverage, Placement::UpstreamTributaries),
    row(Some(Bacteria), Extend, Mission::ExtendCoverage, Placement::StormOutfallNetwork),
    row(Some(Sediment), Extend, Mission::ExtendCoverage, Placement::UpstreamTributaries),
    row(None, Extend, Mission::ExtendCoverage, Placement::AdjacentStations),
    row(Some(Nutrients), Verify, Mission::VerifyReductions, Placement::DownstreamReceivingWater),
    row(Some(Bacteria), Verify, Mission::VerifyReductions, Placement::DownstreamReceivingWater),
    row(Some(Sediment), Verify, Mission::VerifyReductions, Placement::DownstreamReceivingWater),
    row(None, Verify, Mission::VerifyReductions, Placement::DownstreamReceivingWater),
];

pub fn decide(driver: Option<ImpairmentDriver>, role: PhaseRole) -> (Mission, Placement) {
    DECISION_TABLE
        .iter()
        .find(|r| r.driver == driver && r.role == role)
        .map(|r| (r.mission, r.placement))
        .unwrap_or((Mission::EstablishBaseline, Placement::RepresentativeStation))
}

// ── Triggers ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhaseTrigger {
    Immediate,
    AfterPhaseData { phase: u32, days: u32 },
    AfterDays { days: u32 },
}

impl fmt::Display for PhaseTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseTrigger::Immediate => write!(f, "immediate"),
            PhaseTrigger::AfterPhaseData { phase, days } => {
                write!(f, "after {days} days of Phase {phase} data")
            }
            PhaseTrigger::AfterDays { days } => {
                write!(f, "after {days} days of continuous monitoring")
            }
        }
    }
}

fn trigger_for(number: u32, config: &RoadmapConfig) -> PhaseTrigger {
    match number {
        1 => PhaseTrigger::Immediate,
        2 => PhaseTrigger::AfterPhaseData {
            phase: 1,
            days: config.phase_two_after_days,
        },
        _ => PhaseTrigger::AfterDays {
            days: config.phase_three_after_days,
        },
    }
}

// ── Justification ──────────────────────────────────────────────────

/// One input metric cited for a phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JustificationFact {
    Score { score: f64, label: SeverityLabel },
    Reading { parameter: ParameterKey, value: f64 },
    Exceedance { parameter: ParameterKey, value: f64, threshold: f64 },
    Category { code: String, no_tmdl: bool },
    DataAge { days: Option<i64> },
}

impl fmt::Display for JustificationFact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JustificationFact::Score { score, label } => {
                write!(f, "severity {score:.1} ({})", label.as_str())
            }
            JustificationFact::Reading { parameter, value } => {
                write!(f, "{} {value} {}", parameter.label(), parameter.unit())
            }
            JustificationFact::Exceedance {
                parameter,
                value,
                threshold,
            } => write!(
                f,
                "{} {value} {} vs screening level {threshold}",
                parameter.label(),
                parameter.unit()
            ),
            JustificationFact::Category { code, no_tmdl: true } => {
                write!(f, "Category {code}, no TMDL in place")
            }
            JustificationFact::Category { code, no_tmdl: false } => write!(f, "Category {code}"),
            JustificationFact::DataAge { days: Some(d) } => write!(f, "last sampled {d} days ago"),
            JustificationFact::DataAge { days: None } => write!(f, "never sampled"),
        }
    }
}

fn driver_parameters(driver: Option<ImpairmentDriver>) -> &'static [ParameterKey] {
    match driver {
        Some(Nutrients) => &[
            ParameterKey::TotalNitrogen,
            ParameterKey::TotalPhosphorus,
            ParameterKey::Chlorophyll,
        ],
        Some(Bacteria) => &[ParameterKey::Bacteria],
        Some(Sediment) => &[ParameterKey::Turbidity, ParameterKey::TotalSuspendedSolids],
        None => &[ParameterKey::DissolvedOxygen, ParameterKey::Turbidity],
    }
}

fn justify(
    number: u32,
    driver: Option<ImpairmentDriver>,
    assessment: &SeverityAssessment,
) -> Vec<JustificationFact> {
    let mut facts = Vec::new();
    if number == 1 {
        facts.push(JustificationFact::Score {
            score: assessment.score,
            label: assessment.label,
        });
        if let Some(code) = assessment.category.as_deref().filter(|_| assessment.impaired) {
            facts.push(JustificationFact::Category {
                code: code.trim().to_string(),
                no_tmdl: assessment.no_tmdl,
            });
        }
        if let Some(v) = assessment.readings.dissolved_oxygen {
            facts.push(JustificationFact::Reading {
                parameter: ParameterKey::DissolvedOxygen,
                value: v,
            });
        }
    }
    for key in driver_parameters(driver) {
        if number == 1 && *key == ParameterKey::DissolvedOxygen {
            continue;
        }
        let exceeded = assessment.exceedances.iter().find(|e| e.parameter == *key);
        match (exceeded, assessment.readings.get(*key)) {
            (Some(e), _) => facts.push(JustificationFact::Exceedance {
                parameter: e.parameter,
                value: e.value,
                threshold: e.threshold,
            }),
            (None, Some(v)) => facts.push(JustificationFact::Reading {
                parameter: *key,
                value: v,
            }),
            (None, None) => {}
        }
    }
    if number == 1 {
        facts.push(JustificationFact::DataAge {
            days: assessment.data_age_days,
        });
    }
    facts
}

// ── Plan ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapPhase {
    pub number: u32,
    pub driver: Option<ImpairmentDriver>,
    pub role: PhaseRole,
    pub mission: Mission,
    pub placement: Placement,
    pub trigger: PhaseTrigger,
    pub justification: Vec<JustificationFact>,
    pub quads: u32,
    pub units: u32,
    pub capacity_gpm: f64,
    pub annual_cost: f64,
}

impl RoadmapPhase {
    pub fn justification_text(&self) -> String {
        self.justification
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    pub waterbody_id: WaterbodyId,
    pub label: SeverityLabel,
    pub score: f64,
    pub total_quads: u32,
    pub total_units: u32,
    pub capacity_gpm: f64,
    pub annual_cost: f64,
    pub addressability_ratio: f64,
    pub phased: bool,
    pub phases: Vec<RoadmapPhase>,
}

impl DeploymentPlan {
    /// Zero-unit plan for a waterbody where no action is indicated.
    pub fn none(waterbody_id: &str, score: f64, label: SeverityLabel) -> Self {
        Self {
            waterbody_id: waterbody_id.to_string(),
            label,
            score,
            total_quads: 0,
            total_units: 0,
            capacity_gpm: 0.0,
            annual_cost: 0.0,
            addressability_ratio: 1.0,
            phased: false,
            phases: Vec::new(),
        }
    }

    pub fn phase_units(&self) -> u32 {
        self.phases.iter().map(|p| p.units).sum()
    }
}

/// Quads per phase. Sums to `size.total_quads`.
pub fn partition(size: &DeploymentSize, config: &RoadmapConfig) -> Vec<u32> {
    if size.total_quads == 0 {
        return Vec::new();
    }
    if !size.phased {
        return vec![size.total_quads];
    }
    let first = size.first_phase_quads.clamp(1, size.total_quads);
    let rest = size.total_quads - first;
    let slots = rest.min(config.max_phases.saturating_sub(1));
    if slots == 0 {
        return vec![size.total_quads];
    }
    let each = rest / slots;
    let mut quads = vec![first];
    quads.extend(std::iter::repeat(each).take(slots as usize - 1));
    quads.push(each + rest % slots);
    quads
}

pub fn generate(
    size: &DeploymentSize,
    assessment: &SeverityAssessment,
    roadmap: &RoadmapConfig,
    sizing: &SizingConfig,
) -> DeploymentPlan {
    let quads = partition(size, roadmap);
    let phase_count = quads.len() as u32;
    let drivers = &assessment.drivers;

    let mut targeted: Vec<Option<ImpairmentDriver>> = Vec::new();
    let phases: Vec<RoadmapPhase> = quads
        .iter()
        .enumerate()
        .map(|(idx, &q)| {
            let number = idx as u32 + 1;
            let driver = drivers.get(idx).or(drivers.last()).copied();
            let role = if !targeted.contains(&driver) {
                Lead
            } else if number == phase_count && number >= 3 {
                Verify
            } else {
                Extend
            };
            targeted.push(driver);
            let (mission, placement) = decide(driver, role);
            let units = q * sizing.units_per_quad;
            RoadmapPhase {
                number,
                driver,
                role,
                mission,
                placement,
                trigger: trigger_for(number, roadmap),
                justification: justify(number, driver, assessment),
                quads: q,
                units,
                capacity_gpm: units as f64 * sizing.gpm_per_unit,
                annual_cost: units as f64 * sizing.annual_cost_per_unit,
            }
        })
        .collect();

    log::debug!(
        "roadmap: {} {} quads in {} phase(s)",
        assessment.waterbody_id,
        size.total_quads,
        phases.len()
    );

    DeploymentPlan {
        waterbody_id: assessment.waterbody_id.clone(),
        label: size.label,
        score: assessment.score,
        total_quads: size.total_quads,
        total_units: size.total_units,
        capacity_gpm: size.capacity_gpm,
        annual_cost: size.annual_cost,
        addressability_ratio: size.addressability_ratio,
        phased: size.phased,
        phases,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_driver_and_role_has_a_row() {
        for driver in [None, Some(Nutrients), Some(Bacteria), Some(Sediment)] {
            for role in [Lead, Extend, Verify] {
                assert!(
                    DECISION_TABLE
                        .iter()
                        .any(|r| r.driver == driver && r.role == role),
                    "missing row for {driver:?}/{role:?}"
                );
            }
        }
    }

    #[test]
    fn trigger_text() {
        let config = RoadmapConfig::default();
        assert_eq!(trigger_for(1, &config).to_string(), "immediate");
        assert_eq!(trigger_for(2, &config).to_string(), "after 90 days of Phase 1 data");
        assert_eq!(
            trigger_for(3, &config).to_string(),
            "after 180 days of continuous monitoring"
        );
    }
}
