//! PlanningEngine: runs every stage for one set of inputs.
//!
//! Stage order:
//!   reconcile (each state feed) → resolve coordinates → assign
//!   → score → size → roadmap → economics
//!
//! Reconciliation runs before assignment so synthesized waterbodies are
//! assigned too, and so feed coordinates take priority in resolution.
//!
//! RULE: No I/O. Feeds arrive already fetched; persistence belongs to
//! the caller. Nothing here returns an error for missing data.

use crate::{
    config::EngineConfig,
    deployment_sizer,
    economics_calculator::{self, AssumptionSet, CostComparison},
    feed::{AssessmentFeed, FeedStatus},
    geo_assigner::{self, Assignment, CoordinateResolver},
    model::{Jurisdiction, JurisdictionTier, Waterbody},
    parameters::{Observation, ParameterReadings},
    reconciler::{self, RegistryChange},
    roadmap_generator::{self, DeploymentPlan},
    severity_scorer::{self, ScoringInput, SeverityAssessment, SeverityLabel},
    types::{JurisdictionId, StateCode, WaterbodyId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningInput {
    pub as_of: NaiveDate,
    pub waterbodies: Vec<Waterbody>,
    pub jurisdictions: Vec<Jurisdiction>,
    #[serde(default)]
    pub feeds: Vec<AssessmentFeed>,
    /// Pre-folded readings by waterbody id.
    #[serde(default)]
    pub readings: BTreeMap<WaterbodyId, ParameterReadings>,
    /// Raw observations by waterbody id. Used when no readings are given.
    #[serde(default)]
    pub observations: BTreeMap<WaterbodyId, Vec<Observation>>,
    /// Dial overrides applied to every jurisdiction's tier defaults.
    #[serde(default)]
    pub assumptions: BTreeMap<String, f64>,
}

impl PlanningInput {
    pub fn readings_for(&self, id: &str) -> ParameterReadings {
        if let Some(r) = self.readings.get(id) {
            return r.clone();
        }
        self.observations
            .get(id)
            .map(|obs| ParameterReadings::from_observations(obs))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterbodyReport {
    pub waterbody_id: WaterbodyId,
    pub name: String,
    pub assessment: SeverityAssessment,
    pub plan: DeploymentPlan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JurisdictionReport {
    pub jurisdiction_id: JurisdictionId,
    pub name: String,
    pub tier: JurisdictionTier,
    pub waterbodies: Vec<WaterbodyReport>,
    pub priority_waterbody: Option<WaterbodyId>,
    /// Economics for the priority plan, or a zero-unit plan.
    pub cost: CostComparison,
}

impl JurisdictionReport {
    pub fn priority(&self) -> Option<&WaterbodyReport> {
        let id = self.priority_waterbody.as_deref()?;
        self.waterbodies.iter().find(|w| w.waterbody_id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSummary {
    pub state: StateCode,
    pub status: FeedStatus,
    pub records: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningReport {
    pub as_of: NaiveDate,
    pub feeds: Vec<FeedSummary>,
    pub changes: Vec<RegistryChange>,
    /// Registry after reconciliation and coordinate resolution.
    pub registry: Vec<Waterbody>,
    pub assignment: Assignment,
    pub jurisdictions: Vec<JurisdictionReport>,
    /// State-wide view of waterbodies no jurisdiction claimed.
    pub unassigned: Vec<WaterbodyReport>,
}

impl PlanningReport {
    pub fn jurisdiction(&self, id: &str) -> Option<&JurisdictionReport> {
        self.jurisdictions.iter().find(|j| j.jurisdiction_id == id)
    }

    /// Report for a waterbody wherever it landed.
    pub fn waterbody(&self, id: &str) -> Option<&WaterbodyReport> {
        self.jurisdictions
            .iter()
            .flat_map(|j| j.waterbodies.iter())
            .chain(self.unassigned.iter())
            .find(|w| w.waterbody_id == id)
    }

    pub fn any_feed_unavailable(&self) -> bool {
        self.feeds.iter().any(|f| !f.status.is_available())
    }
}

pub struct PlanningEngine {
    config: EngineConfig,
}

impl PlanningEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Score, size and phase one waterbody.
    pub fn plan_waterbody(
        &self,
        wb: &Waterbody,
        readings: ParameterReadings,
        as_of: NaiveDate,
    ) -> WaterbodyReport {
        let input = ScoringInput::for_waterbody(wb, readings, as_of);
        let assessment = severity_scorer::score(&input, &self.config.scoring);

        let plan = if assessment.no_action_indicated {
            log::debug!("plan: {} no action indicated", wb.id);
            DeploymentPlan::none(&wb.id, assessment.score, assessment.label)
        } else {
            let size = deployment_sizer::size(assessment.label, wb.area_acres, &self.config.sizing);
            roadmap_generator::generate(
                &size,
                &assessment,
                &self.config.roadmap,
                &self.config.sizing,
            )
        };

        WaterbodyReport {
            waterbody_id: wb.id.clone(),
            name: wb.name.clone(),
            assessment,
            plan,
        }
    }

    /// Tier defaults plus overrides. A rejected override is logged and skipped.
    pub fn assumptions_for(
        &self,
        tier: JurisdictionTier,
        overrides: &BTreeMap<String, f64>,
    ) -> AssumptionSet {
        let economics = &self.config.economics;
        let mut set = AssumptionSet::for_tier(tier, economics);
        for (id, value) in overrides {
            if let Err(e) = set.set(id, *value, economics) {
                log::warn!("assumption override skipped: {e}");
            }
        }
        set
    }

    pub fn run(&self, input: &PlanningInput) -> PlanningReport {
        // ── Reconcile ──────────────────────────────────────────
        let mut registry = input.waterbodies.clone();
        let mut changes = Vec::new();
        let mut feeds = Vec::new();
        for feed in &input.feeds {
            let outcome = reconciler::reconcile(&registry, feed);
            registry = outcome.waterbodies;
            changes.extend(outcome.changes);
            feeds.push(FeedSummary {
                state: feed.state.clone(),
                status: outcome.feed_status,
                records: feed.records.len(),
            });
        }

        // ── Resolve + assign ───────────────────────────────────
        let registry = CoordinateResolver::new(&self.config.regions).resolve_all(&registry);
        let assignment = geo_assigner::assign(
            &input.jurisdictions,
            &registry,
            &self.config.regions.shore_boundaries,
        );

        // ── Score, size, phase ─────────────────────────────────
        let reports: Vec<WaterbodyReport> = registry
            .iter()
            .map(|wb| self.plan_waterbody(wb, input.readings_for(&wb.id), input.as_of))
            .collect();
        let index: BTreeMap<&str, usize> = registry
            .iter()
            .enumerate()
            .map(|(i, wb)| (wb.id.as_str(), i))
            .collect();

        // ── Per jurisdiction ───────────────────────────────────
        let jurisdictions = input
            .jurisdictions
            .iter()
            .map(|j| {
                let mut positions: Vec<usize> = Vec::new();
                for id in assignment.waterbodies_for(&j.id) {
                    match index.get(id.as_str()) {
                        Some(&pos) => positions.push(pos),
                        None => log::debug!("plan: {} lists unknown waterbody {id}", j.id),
                    }
                }
                self.jurisdiction_report(j, &positions, &reports, &input.assumptions)
            })
            .collect::<Vec<_>>();

        let unassigned = assignment
            .unassigned
            .iter()
            .filter_map(|id| index.get(id.as_str()).map(|&pos| reports[pos].clone()))
            .collect::<Vec<_>>();

        log::info!(
            "plan: {} waterbodies, {} jurisdictions, {} unassigned, {} changes",
            registry.len(),
            jurisdictions.len(),
            unassigned.len(),
            changes.len()
        );

        PlanningReport {
            as_of: input.as_of,
            feeds,
            changes,
            registry,
            assignment,
            jurisdictions,
            unassigned,
        }
    }

    fn jurisdiction_report(
        &self,
        j: &Jurisdiction,
        positions: &[usize],
        reports: &[WaterbodyReport],
        overrides: &BTreeMap<String, f64>,
    ) -> JurisdictionReport {
        // Highest score; lower registry position wins a tie.
        let priority = positions
            .iter()
            .copied()
            .fold(None, |best: Option<usize>, pos| match best {
                Some(b)
                    if reports[b].assessment.score > reports[pos].assessment.score
                        || (reports[b].assessment.score == reports[pos].assessment.score
                            && b < pos) =>
                {
                    Some(b)
                }
                _ => Some(pos),
            });

        let priority_plan = match priority {
            Some(pos) => reports[pos].plan.clone(),
            None => DeploymentPlan::none("", 0.0, SeverityLabel::Healthy),
        };
        let assumptions = self.assumptions_for(j.tier, overrides);
        let cost =
            economics_calculator::compare(&priority_plan, j.tier, &assumptions, &self.config.economics);

        log::info!(
            "plan[{}]: {} waterbodies, priority={} units={}",
            j.id,
            positions.len(),
            priority.map_or("-", |p| reports[p].waterbody_id.as_str()),
            priority_plan.total_units
        );

        JurisdictionReport {
            jurisdiction_id: j.id.clone(),
            name: j.name.clone(),
            tier: j.tier,
            waterbodies: positions.iter().map(|&p| reports[p].clone()).collect(),
            priority_waterbody: priority.map(|p| reports[p].waterbody_id.clone()),
            cost,
        }
    }
}
