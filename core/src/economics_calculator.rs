//! EconomicsCalculator: status-quo manual compliance vs. continuous monitoring.
//!
//! FORMULAS (annual):
//!   status quo = pooled monitoring + samples × cost/sample + consulting
//!                + staff hours × hourly rate
//!   engine     = unit cost × units + confirmatory fraction × status-quo sampling
//!   savings    = status quo − engine            (may be negative)
//!   grant      = [min %, max %] of engine
//!   credits    = N lb × N price + P lb × P price
//!
//! During parallel validation the full manual sampling program runs
//! alongside the units, so first-year savings are lower than steady state.
//!
//! Every human assumption is a named dial with bounds and a step.

use crate::{
    config::{EconomicsConfig, TierBaseline},
    error::{EngineError, EngineResult},
    model::JurisdictionTier,
    roadmap_generator::DeploymentPlan,
};
use serde::{Deserialize, Serialize};

pub const STAFF_HOURLY_RATE: &str = "staff_hourly_rate";
pub const CONFIRMATORY_FRACTION: &str = "confirmatory_fraction";
pub const STORM_SAMPLE_COUNT: &str = "storm_sample_count";
pub const NITROGEN_CREDIT_PRICE: &str = "nitrogen_credit_price";
pub const PHOSPHORUS_CREDIT_PRICE: &str = "phosphorus_credit_price";

pub const ASSUMPTION_IDS: [&str; 5] = [
    STAFF_HOURLY_RATE,
    CONFIRMATORY_FRACTION,
    STORM_SAMPLE_COUNT,
    NITROGEN_CREDIT_PRICE,
    PHOSPHORUS_CREDIT_PRICE,
];

// ── Assumptions ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssumptionSet {
    pub staff_hourly_rate: f64,
    pub confirmatory_fraction: f64,
    pub storm_sample_count: f64,
    pub nitrogen_credit_price: f64,
    pub phosphorus_credit_price: f64,
}

impl AssumptionSet {
    /// Dial defaults. Dials missing from the config read as zero.
    pub fn from_defaults(config: &EconomicsConfig) -> Self {
        let default = |id: &str| config.dial(id).map_or(0.0, |d| d.default_value);
        Self {
            staff_hourly_rate: default(STAFF_HOURLY_RATE),
            confirmatory_fraction: default(CONFIRMATORY_FRACTION),
            storm_sample_count: default(STORM_SAMPLE_COUNT),
            nitrogen_credit_price: default(NITROGEN_CREDIT_PRICE),
            phosphorus_credit_price: default(PHOSPHORUS_CREDIT_PRICE),
        }
    }

    /// Dial defaults, with the storm-sample count taken from the tier baseline.
    pub fn for_tier(tier: JurisdictionTier, config: &EconomicsConfig) -> Self {
        let mut set = Self::from_defaults(config);
        if let Some(baseline) = config.baseline(tier) {
            set.storm_sample_count = baseline.storm_samples;
        }
        set
    }

    pub fn get(&self, id: &str) -> EngineResult<f64> {
        match id {
            STAFF_HOURLY_RATE => Ok(self.staff_hourly_rate),
            CONFIRMATORY_FRACTION => Ok(self.confirmatory_fraction),
            STORM_SAMPLE_COUNT => Ok(self.storm_sample_count),
            NITROGEN_CREDIT_PRICE => Ok(self.nitrogen_credit_price),
            PHOSPHORUS_CREDIT_PRICE => Ok(self.phosphorus_credit_price),
            _ => Err(EngineError::UnknownParameter { id: id.to_string() }),
        }
    }

    fn slot_mut(&mut self, id: &str) -> EngineResult<&mut f64> {
        match id {
            STAFF_HOURLY_RATE => Ok(&mut self.staff_hourly_rate),
            CONFIRMATORY_FRACTION => Ok(&mut self.confirmatory_fraction),
            STORM_SAMPLE_COUNT => Ok(&mut self.storm_sample_count),
            NITROGEN_CREDIT_PRICE => Ok(&mut self.nitrogen_credit_price),
            PHOSPHORUS_CREDIT_PRICE => Ok(&mut self.phosphorus_credit_price),
            _ => Err(EngineError::UnknownParameter { id: id.to_string() }),
        }
    }

    /// Set one dial. Rejects unknown ids, values outside the dial's bounds,
    /// and values off the dial's step grid. A rejected change leaves the set
    /// untouched.
    pub fn set(&mut self, id: &str, value: f64, config: &EconomicsConfig) -> EngineResult<()> {
        validate_dial_change(id, value, config)?;
        *self.slot_mut(id)? = value;
        log::debug!("assumption: {id} = {value}");
        Ok(())
    }

    pub fn with(mut self, id: &str, value: f64, config: &EconomicsConfig) -> EngineResult<Self> {
        self.set(id, value, config)?;
        Ok(self)
    }
}

fn validate_dial_change(id: &str, value: f64, config: &EconomicsConfig) -> EngineResult<()> {
    let dial = config
        .dial(id)
        .filter(|_| ASSUMPTION_IDS.contains(&id))
        .ok_or_else(|| EngineError::UnknownParameter { id: id.to_string() })?;

    if !value.is_finite() || value < dial.min_value || value > dial.max_value {
        log::warn!("assumption: rejected {id} = {value}");
        return Err(EngineError::ParameterOutOfRange {
            id: id.to_string(),
            value,
            min: dial.min_value,
            max: dial.max_value,
        });
    }

    let steps = (value - dial.min_value) / dial.step_size;
    if (steps - steps.round()).abs() > 1e-6 {
        log::warn!("assumption: rejected {id} = {value}, off step {}", dial.step_size);
        return Err(EngineError::ParameterOffStep {
            id: id.to_string(),
            value,
            step: dial.step_size,
        });
    }
    Ok(())
}

// ── Comparison ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusQuoCost {
    pub pooled_monitoring: f64,
    pub sampling: f64,
    pub consulting_reporting: f64,
    pub staff: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineCost {
    pub units: f64,
    pub confirmatory_sampling: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostComparison {
    pub tier: JurisdictionTier,
    pub total_units: u32,
    pub status_quo: StatusQuoCost,
    pub engine: EngineCost,
    pub savings: f64,
    /// Savings as a percent of status-quo cost; zero when status quo is zero.
    pub savings_pct: f64,
    pub grant_offset_low: f64,
    pub grant_offset_high: f64,
    pub nitrogen_credit_value: f64,
    pub phosphorus_credit_value: f64,
    pub credit_value_total: f64,
    /// First-year cost while units and the full manual sampling program both run.
    pub parallel_validation_cost: f64,
    pub parallel_validation_savings: f64,
    pub assumptions: AssumptionSet,
}

fn zero_baseline(tier: JurisdictionTier) -> TierBaseline {
    TierBaseline {
        tier,
        pooled_monitoring_cost: 0.0,
        storm_samples: 0.0,
        cost_per_sample: 0.0,
        consulting_reporting_cost: 0.0,
        staff_hours: 0.0,
        nitrogen_reduction_lb: 0.0,
        phosphorus_reduction_lb: 0.0,
    }
}

pub fn compare(
    plan: &DeploymentPlan,
    tier: JurisdictionTier,
    assumptions: &AssumptionSet,
    config: &EconomicsConfig,
) -> CostComparison {
    let baseline = match config.baseline(tier) {
        Some(b) => b.clone(),
        None => {
            log::warn!("economics: no baseline for tier {}, using zero", tier.as_str());
            zero_baseline(tier)
        }
    };
    let a = assumptions;

    let sampling = a.storm_sample_count * baseline.cost_per_sample;
    let staff = baseline.staff_hours * a.staff_hourly_rate;
    let status_quo = StatusQuoCost {
        pooled_monitoring: baseline.pooled_monitoring_cost,
        sampling,
        consulting_reporting: baseline.consulting_reporting_cost,
        staff,
        total: baseline.pooled_monitoring_cost + sampling + baseline.consulting_reporting_cost + staff,
    };

    let confirmatory_sampling = a.confirmatory_fraction * sampling;
    let engine = EngineCost {
        units: plan.annual_cost,
        confirmatory_sampling,
        total: plan.annual_cost + confirmatory_sampling,
    };

    let savings = status_quo.total - engine.total;
    let savings_pct = if status_quo.total > 0.0 {
        savings / status_quo.total * 100.0
    } else {
        0.0
    };

    let nitrogen_credit_value = baseline.nitrogen_reduction_lb * a.nitrogen_credit_price;
    let phosphorus_credit_value = baseline.phosphorus_reduction_lb * a.phosphorus_credit_price;

    let parallel_validation_cost = engine.units + sampling;

    log::debug!(
        "economics: {} tier={} status_quo={:.0} engine={:.0} savings={savings:.0}",
        plan.waterbody_id,
        tier.as_str(),
        status_quo.total,
        engine.total
    );

    CostComparison {
        tier,
        total_units: plan.total_units,
        grant_offset_low: engine.total * config.grant_offset_min_pct / 100.0,
        grant_offset_high: engine.total * config.grant_offset_max_pct / 100.0,
        parallel_validation_savings: status_quo.total - parallel_validation_cost,
        parallel_validation_cost,
        status_quo,
        engine,
        savings,
        savings_pct,
        nitrogen_credit_value,
        phosphorus_credit_value,
        credit_value_total: nitrogen_credit_value + phosphorus_credit_value,
        assumptions: a.clone(),
    }
}
