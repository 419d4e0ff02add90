//! DeploymentSizer: severity label + waterbody area → discrete deployment size.
//!
//! RULES:
//!   - Base quads by label: critical 3, degraded 2, stressed 1, healthy 0.
//!   - Area tiers add quads to a non-zero base; the largest matching tier wins.
//!   - The total never exceeds `max_quads`.
//!   - Deployments of `phased_from_quads` or more are phased. The first
//!     phase covers the single highest-priority zone.

use crate::{
    config::{ScoringConfig, SizingConfig},
    severity_scorer::SeverityLabel,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentSize {
    pub label: SeverityLabel,
    pub base_quads: u32,
    pub scale_bonus: u32,
    /// Quads the waterbody would need without the cap.
    pub required_quads: u32,
    pub total_quads: u32,
    pub total_units: u32,
    pub capacity_gpm: f64,
    pub annual_cost: f64,
    pub phased: bool,
    pub first_phase_quads: u32,
    pub first_phase_units: u32,
    /// Share of the required build that the capped deployment covers.
    pub addressability_ratio: f64,
}

impl DeploymentSize {
    pub fn is_empty(&self) -> bool {
        self.total_quads == 0
    }
}

pub fn base_quads(label: SeverityLabel, config: &SizingConfig) -> u32 {
    match label {
        SeverityLabel::Critical => config.base_quads.critical,
        SeverityLabel::Degraded => config.base_quads.degraded,
        SeverityLabel::Stressed => config.base_quads.stressed,
        SeverityLabel::Healthy => 0,
    }
}

/// Bonus quads from the largest area tier the waterbody reaches.
pub fn scale_bonus(area_acres: Option<f64>, config: &SizingConfig) -> u32 {
    let Some(area) = area_acres.filter(|a| a.is_finite()) else {
        return 0;
    };
    config
        .scale_tiers
        .iter()
        .filter(|t| area >= t.min_acres)
        .map(|t| t.bonus_quads)
        .max()
        .unwrap_or(0)
}

pub fn size(label: SeverityLabel, area_acres: Option<f64>, config: &SizingConfig) -> DeploymentSize {
    let base = base_quads(label, config);
    let bonus = if base > 0 {
        scale_bonus(area_acres, config)
    } else {
        0
    };
    let required_quads = base + bonus;
    let total_quads = required_quads.min(config.max_quads);
    let total_units = total_quads * config.units_per_quad;

    let phased = total_quads >= config.phased_from_quads.max(1);
    let first_phase_quads = if phased {
        config.first_phase_quads.min(total_quads)
    } else {
        total_quads
    };

    let addressability_ratio = if required_quads == 0 {
        1.0
    } else {
        total_quads as f64 / required_quads as f64
    };

    log::debug!(
        "size: {} base={base} bonus={bonus} total={total_quads} phased={phased}",
        label.as_str()
    );

    DeploymentSize {
        label,
        base_quads: base,
        scale_bonus: bonus,
        required_quads,
        total_quads,
        total_units,
        capacity_gpm: total_units as f64 * config.gpm_per_unit,
        annual_cost: total_units as f64 * config.annual_cost_per_unit,
        phased,
        first_phase_quads,
        first_phase_units: first_phase_quads * config.units_per_quad,
        addressability_ratio,
    }
}

/// Label the score with the scoring bands, then size it.
pub fn size_for_score(
    score: f64,
    area_acres: Option<f64>,
    scoring: &ScoringConfig,
    sizing: &SizingConfig,
) -> DeploymentSize {
    size(SeverityLabel::from_score(score, scoring), area_acres, sizing)
}
