//! SeverityScorer: composite 0–100 severity score and label for one waterbody.
//!
//! Indicators:
//!   - dissolved oxygen   → critical / stressed / adequate / unknown
//!   - bloom / nutrients  → normal / bloom / significant / severe / unknown
//!     (chlorophyll-a and total nitrogen; the worse band wins)
//!   - turbidity          → clear / elevated / impaired / unknown
//!   - regulatory         → Category 4/5 impaired, Category 5 without TMDL
//!   - data gap           → age of the latest sample and missing indicators
//!
//! Composite = Σ sub-score × weight / 100. Floor rules then raise the score
//! for impaired waters with stale data; they never lower it.
//!
//! RULE: Missing inputs never fail the computation. An absent or
//! non-finite reading is `Unknown` and scores `sub_scores.unknown`.

use crate::{
    config::{BloomThresholds, ScoringConfig},
    model::{category_is_impaired, category_lacks_tmdl, Waterbody},
    parameters::{detect_exceedances, Exceedance, ParameterKey, ParameterReadings},
    types::WaterbodyId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ── Indicator categories ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OxygenStatus {
    Adequate,
    Stressed,
    Critical,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BloomStatus {
    Normal,
    Bloom,
    Significant,
    Severe,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurbidityStatus {
    Clear,
    Elevated,
    Impaired,
    Unknown,
}

pub fn classify_oxygen(do_mg_l: Option<f64>, config: &ScoringConfig) -> OxygenStatus {
    let t = &config.dissolved_oxygen;
    match do_mg_l.filter(|v| v.is_finite()) {
        None => OxygenStatus::Unknown,
        Some(v) if v < t.critical_below => OxygenStatus::Critical,
        Some(v) if v < t.stressed_below => OxygenStatus::Stressed,
        Some(_) => OxygenStatus::Adequate,
    }
}

fn band(value: f64, t: &BloomThresholds) -> BloomStatus {
    if value >= t.severe {
        BloomStatus::Severe
    } else if value >= t.significant {
        BloomStatus::Significant
    } else if value >= t.bloom {
        BloomStatus::Bloom
    } else {
        BloomStatus::Normal
    }
}

/// Worse of the chlorophyll-a and total-nitrogen bands.
pub fn classify_bloom(readings: &ParameterReadings, config: &ScoringConfig) -> BloomStatus {
    let chl = readings
        .chlorophyll
        .filter(|v| v.is_finite())
        .map(|v| band(v, &config.chlorophyll));
    let tn = readings
        .total_nitrogen
        .filter(|v| v.is_finite())
        .map(|v| band(v, &config.total_nitrogen));
    match (chl, tn) {
        (Some(a), Some(b)) => a.max(b),
        (Some(a), None) | (None, Some(a)) => a,
        (None, None) => BloomStatus::Unknown,
    }
}

pub fn classify_turbidity(ntu: Option<f64>, config: &ScoringConfig) -> TurbidityStatus {
    let t = &config.turbidity;
    match ntu.filter(|v| v.is_finite()) {
        None => TurbidityStatus::Unknown,
        Some(v) if v >= t.impaired => TurbidityStatus::Impaired,
        Some(v) if v >= t.elevated => TurbidityStatus::Elevated,
        Some(_) => TurbidityStatus::Clear,
    }
}

// ── Label ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityLabel {
    Healthy,
    Stressed,
    Degraded,
    Critical,
}

impl SeverityLabel {
    pub fn from_score(score: f64, config: &ScoringConfig) -> Self {
        let bands = &config.label_bands;
        if score >= bands.critical {
            SeverityLabel::Critical
        } else if score >= bands.degraded {
            SeverityLabel::Degraded
        } else if score >= bands.stressed {
            SeverityLabel::Stressed
        } else {
            SeverityLabel::Healthy
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SeverityLabel::Healthy => "healthy",
            SeverityLabel::Stressed => "stressed",
            SeverityLabel::Degraded => "degraded",
            SeverityLabel::Critical => "critical",
        }
    }
}

// ── Data age and confidence ────────────────────────────────────────

/// How far a reading can be trusted for decisions, by sample age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataAgeBracket {
    /// Under 2 years.
    DecisionGrade,
    /// Under 5 years.
    TrendAnalysis,
    /// Under 10 years.
    Supplemental,
    Historical,
    Never,
}

impl DataAgeBracket {
    pub fn from_age_days(age_days: Option<i64>) -> Self {
        match age_days {
            None => DataAgeBracket::Never,
            Some(d) if d < 730 => DataAgeBracket::DecisionGrade,
            Some(d) if d < 1_825 => DataAgeBracket::TrendAnalysis,
            Some(d) if d < 3_650 => DataAgeBracket::Supplemental,
            Some(_) => DataAgeBracket::Historical,
        }
    }
}

/// Indicator coverage: how many of DO, bloom and turbidity were measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Moderate,
    Low,
}

// ── Impairment drivers ─────────────────────────────────────────────

/// Declaration order is roadmap precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpairmentDriver {
    Nutrients,
    Bacteria,
    Sediment,
}

impl ImpairmentDriver {
    pub fn as_str(self) -> &'static str {
        match self {
            ImpairmentDriver::Nutrients => "nutrients",
            ImpairmentDriver::Bacteria => "bacteria",
            ImpairmentDriver::Sediment => "sediment",
        }
    }
}

const NUTRIENT_KEYWORDS: &[&str] = &["nitrogen", "phosphorus", "nutrient", "chlorophyll", "algae"];
const BACTERIA_KEYWORDS: &[&str] = &["e. coli", "enterococc", "fecal", "bacteria", "pathogen"];
const SEDIMENT_KEYWORDS: &[&str] = &["sediment", "turbidity", "suspended solids", "siltation"];

fn mentions(causes: &[String], keywords: &[&str]) -> bool {
    causes.iter().any(|c| {
        let c = c.to_lowercase();
        keywords.iter().any(|k| c.contains(k))
    })
}

/// Drivers present in the cause list or the screening exceedances,
/// in precedence order.
pub fn detect_drivers(causes: &[String], exceedances: &[Exceedance]) -> Vec<ImpairmentDriver> {
    let exceeded = |keys: &[ParameterKey]| exceedances.iter().any(|e| keys.contains(&e.parameter));

    let mut drivers = Vec::new();
    if mentions(causes, NUTRIENT_KEYWORDS)
        || exceeded(&[
            ParameterKey::TotalNitrogen,
            ParameterKey::TotalPhosphorus,
            ParameterKey::Chlorophyll,
        ])
    {
        drivers.push(ImpairmentDriver::Nutrients);
    }
    if mentions(causes, BACTERIA_KEYWORDS) || exceeded(&[ParameterKey::Bacteria]) {
        drivers.push(ImpairmentDriver::Bacteria);
    }
    if mentions(causes, SEDIMENT_KEYWORDS)
        || exceeded(&[ParameterKey::Turbidity, ParameterKey::TotalSuspendedSolids])
    {
        drivers.push(ImpairmentDriver::Sediment);
    }
    drivers
}

// ── Scoring ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringInput {
    pub waterbody_id: WaterbodyId,
    pub readings: ParameterReadings,
    /// Regulatory category code, e.g. "5", "4a".
    pub category: Option<String>,
    pub causes: Vec<String>,
    /// Reference date for data age.
    pub as_of: NaiveDate,
}

impl ScoringInput {
    pub fn new(waterbody_id: &str, readings: ParameterReadings, as_of: NaiveDate) -> Self {
        Self {
            waterbody_id: waterbody_id.to_string(),
            readings,
            category: None,
            causes: Vec::new(),
            as_of,
        }
    }

    pub fn for_waterbody(wb: &Waterbody, readings: ParameterReadings, as_of: NaiveDate) -> Self {
        Self {
            waterbody_id: wb.id.clone(),
            readings,
            category: wb.category.clone(),
            causes: wb.causes.clone(),
            as_of,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_causes(mut self, causes: &[&str]) -> Self {
        self.causes = causes.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Days since the latest sample. Future dates count as zero.
    pub fn data_age_days(&self) -> Option<i64> {
        self.readings
            .last_sampled
            .map(|d| (self.as_of - d).num_days().max(0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorScores {
    pub dissolved_oxygen: f64,
    pub bloom: f64,
    pub turbidity: f64,
    pub regulatory: f64,
    pub data_gap: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloorRule {
    ImpairedStaleData,
    NoTmdlStaleData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityAssessment {
    pub waterbody_id: WaterbodyId,
    pub score: f64,
    pub label: SeverityLabel,
    pub oxygen: OxygenStatus,
    pub bloom: BloomStatus,
    pub turbidity: TurbidityStatus,
    pub impaired: bool,
    pub no_tmdl: bool,
    pub category: Option<String>,
    pub sub_scores: IndicatorScores,
    /// Score before floor rules.
    pub weighted_score: f64,
    pub floor_applied: Option<FloorRule>,
    pub data_age_days: Option<i64>,
    pub data_age: DataAgeBracket,
    pub confidence: Confidence,
    pub exceedances: Vec<Exceedance>,
    pub drivers: Vec<ImpairmentDriver>,
    /// Healthy, not listed, and nothing over a screening level.
    pub no_action_indicated: bool,
    pub readings: ParameterReadings,
}

fn data_gap_score(age_days: Option<i64>, missing: usize, config: &ScoringConfig) -> f64 {
    let bands = &config.data_gap;
    let age_term = match age_days {
        Some(d) if d <= bands.fresh_days => 0.0,
        Some(d) if d <= bands.aging_days => bands.aging_score,
        Some(d) if d <= bands.stale_days => bands.stale_score,
        _ => bands.expired_score,
    };
    let missing_term = missing as f64 * 100.0 / 3.0;
    age_term.max(missing_term)
}

/// True when data is older than `days`, or there is no sample at all.
fn older_than(age_days: Option<i64>, days: i64) -> bool {
    age_days.map_or(true, |d| d > days)
}

pub fn score(input: &ScoringInput, config: &ScoringConfig) -> SeverityAssessment {
    let sub = &config.sub_scores;
    let readings = &input.readings.finite_only();

    let oxygen = classify_oxygen(readings.dissolved_oxygen, config);
    let bloom = classify_bloom(readings, config);
    let turbidity = classify_turbidity(readings.turbidity, config);

    let category = input.category.as_deref().map(str::trim);
    let impaired = category.is_some_and(category_is_impaired);
    let no_tmdl = category.is_some_and(category_lacks_tmdl);

    let missing = [
        oxygen == OxygenStatus::Unknown,
        bloom == BloomStatus::Unknown,
        turbidity == TurbidityStatus::Unknown,
    ]
    .iter()
    .filter(|m| **m)
    .count();
    let confidence = match missing {
        0 => Confidence::High,
        3 => Confidence::Low,
        _ => Confidence::Moderate,
    };

    let data_age_days = input.data_age_days();

    let sub_scores = IndicatorScores {
        dissolved_oxygen: match oxygen {
            OxygenStatus::Critical => sub.do_critical,
            OxygenStatus::Stressed => sub.do_stressed,
            OxygenStatus::Adequate => 0.0,
            OxygenStatus::Unknown => sub.unknown,
        },
        bloom: match bloom {
            BloomStatus::Severe => sub.bloom_severe,
            BloomStatus::Significant => sub.bloom_significant,
            BloomStatus::Bloom => sub.bloom_bloom,
            BloomStatus::Normal => 0.0,
            BloomStatus::Unknown => sub.unknown,
        },
        turbidity: match turbidity {
            TurbidityStatus::Impaired => sub.turbidity_impaired,
            TurbidityStatus::Elevated => sub.turbidity_elevated,
            TurbidityStatus::Clear => 0.0,
            TurbidityStatus::Unknown => sub.unknown,
        },
        regulatory: if no_tmdl {
            sub.regulatory_no_tmdl
        } else if impaired {
            sub.regulatory_impaired
        } else {
            0.0
        },
        data_gap: data_gap_score(data_age_days, missing, config),
    };

    // Weights are whole percents; divide once at the end.
    let w = &config.weights;
    let weighted_score = (sub_scores.dissolved_oxygen * w.dissolved_oxygen
        + sub_scores.bloom * w.bloom
        + sub_scores.turbidity * w.turbidity
        + sub_scores.regulatory * w.regulatory
        + sub_scores.data_gap * w.data_gap)
        / 100.0;

    let floors = &config.floors;
    let mut score = weighted_score;
    let mut floor_applied = None;
    if no_tmdl && older_than(data_age_days, floors.no_tmdl_stale_days) && score < floors.no_tmdl_floor
    {
        score = floors.no_tmdl_floor;
        floor_applied = Some(FloorRule::NoTmdlStaleData);
    }
    if impaired
        && older_than(data_age_days, floors.impaired_stale_days)
        && score < floors.impaired_floor
    {
        score = floors.impaired_floor;
        floor_applied = Some(FloorRule::ImpairedStaleData);
    }
    let score = score.clamp(0.0, 100.0);
    let label = SeverityLabel::from_score(score, config);

    let exceedances = detect_exceedances(readings);
    let drivers = detect_drivers(&input.causes, &exceedances);
    let no_action_indicated = label == SeverityLabel::Healthy && !impaired && exceedances.is_empty();

    log::debug!(
        "score: {} = {score:.1} ({}) do={:?} bloom={:?} turb={:?} age={data_age_days:?}",
        input.waterbody_id,
        label.as_str(),
        oxygen,
        bloom,
        turbidity
    );

    SeverityAssessment {
        waterbody_id: input.waterbody_id.clone(),
        score,
        label,
        oxygen,
        bloom,
        turbidity,
        impaired,
        no_tmdl,
        category: input.category.clone(),
        sub_scores,
        weighted_score,
        floor_applied,
        data_age_days,
        data_age: DataAgeBracket::from_age_days(data_age_days),
        confidence,
        exceedances,
        drivers,
        no_action_indicated,
        readings: readings.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worse_nutrient_band_wins() {
        let config = ScoringConfig::default();
        let readings = ParameterReadings {
            chlorophyll: Some(25.0),
            total_nitrogen: Some(3.4),
            ..Default::default()
        };
        assert_eq!(classify_bloom(&readings, &config), BloomStatus::Severe);
    }

    #[test]
    fn age_brackets() {
        assert_eq!(DataAgeBracket::from_age_days(None), DataAgeBracket::Never);
        assert_eq!(DataAgeBracket::from_age_days(Some(729)), DataAgeBracket::DecisionGrade);
        assert_eq!(DataAgeBracket::from_age_days(Some(730)), DataAgeBracket::TrendAnalysis);
        assert_eq!(DataAgeBracket::from_age_days(Some(4_000)), DataAgeBracket::Historical);
    }

    #[test]
    fn drivers_come_from_causes_and_exceedances() {
        let causes = vec!["Escherichia coli (E. coli)".to_string()];
        let exceedances = vec![Exceedance {
            parameter: ParameterKey::TotalSuspendedSolids,
            value: 40.0,
            threshold: 25.0,
            percent_over: 0.6,
        }];
        assert_eq!(
            detect_drivers(&causes, &exceedances),
            vec![ImpairmentDriver::Bacteria, ImpairmentDriver::Sediment]
        );
    }
}
