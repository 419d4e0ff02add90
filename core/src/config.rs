use crate::{
    error::{EngineError, EngineResult},
    model::{Coordinate, JurisdictionTier},
    types::WaterbodyId,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ── Severity scoring ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DissolvedOxygenThresholds {
    /// mg/L below which DO is critical.
    pub critical_below: f64,
    /// mg/L below which DO is stressed.
    pub stressed_below: f64,
}

/// Ascending bloom/nutrient bands. A reading at or above a band's
/// threshold falls into that band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloomThresholds {
    pub bloom: f64,
    pub significant: f64,
    pub severe: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurbidityThresholds {
    pub elevated: f64,
    pub impaired: f64,
}

/// Per-band sub-scores on the 0–100 scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubScores {
    pub do_critical: f64,
    pub do_stressed: f64,
    pub bloom_severe: f64,
    pub bloom_significant: f64,
    pub bloom_bloom: f64,
    pub turbidity_impaired: f64,
    pub turbidity_elevated: f64,
    pub regulatory_no_tmdl: f64,
    pub regulatory_impaired: f64,
    /// Score used for an indicator with no reading.
    pub unknown: f64,
}

/// Composite weights in whole percent. Must sum to 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub dissolved_oxygen: f64,
    pub bloom: f64,
    pub turbidity: f64,
    pub regulatory: f64,
    pub data_gap: f64,
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.dissolved_oxygen + self.bloom + self.turbidity + self.regulatory + self.data_gap
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataGapBands {
    pub fresh_days: i64,
    pub aging_days: i64,
    pub stale_days: i64,
    pub aging_score: f64,
    pub stale_score: f64,
    pub expired_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloorRules {
    pub impaired_stale_days: i64,
    pub impaired_floor: f64,
    pub no_tmdl_stale_days: i64,
    pub no_tmdl_floor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelBands {
    pub critical: f64,
    pub degraded: f64,
    pub stressed: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub dissolved_oxygen: DissolvedOxygenThresholds,
    pub chlorophyll: BloomThresholds,
    pub total_nitrogen: BloomThresholds,
    pub turbidity: TurbidityThresholds,
    pub sub_scores: SubScores,
    pub weights: ScoreWeights,
    pub data_gap: DataGapBands,
    pub floors: FloorRules,
    pub label_bands: LabelBands,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            dissolved_oxygen: DissolvedOxygenThresholds {
                critical_below: 4.0,
                stressed_below: 5.0,
            },
            chlorophyll: BloomThresholds {
                bloom: 20.0,
                significant: 40.0,
                severe: 60.0,
            },
            total_nitrogen: BloomThresholds {
                bloom: 1.0,
                significant: 2.0,
                severe: 3.0,
            },
            turbidity: TurbidityThresholds {
                elevated: 25.0,
                impaired: 50.0,
            },
            sub_scores: SubScores {
                do_critical: 100.0,
                do_stressed: 60.0,
                bloom_severe: 100.0,
                bloom_significant: 70.0,
                bloom_bloom: 40.0,
                turbidity_impaired: 100.0,
                turbidity_elevated: 50.0,
                regulatory_no_tmdl: 100.0,
                regulatory_impaired: 70.0,
                unknown: 50.0,
            },
            weights: ScoreWeights {
                dissolved_oxygen: 25.0,
                bloom: 25.0,
                turbidity: 15.0,
                regulatory: 20.0,
                data_gap: 15.0,
            },
            data_gap: DataGapBands {
                fresh_days: 90,
                aging_days: 180,
                stale_days: 365,
                aging_score: 30.0,
                stale_score: 60.0,
                expired_score: 100.0,
            },
            floors: FloorRules {
                impaired_stale_days: 365,
                impaired_floor: 50.0,
                no_tmdl_stale_days: 180,
                no_tmdl_floor: 70.0,
            },
            label_bands: LabelBands {
                critical: 75.0,
                degraded: 50.0,
                stressed: 25.0,
            },
        }
    }
}

// ── Deployment sizing ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseQuads {
    pub critical: u32,
    pub degraded: u32,
    pub stressed: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleTier {
    pub min_acres: f64,
    pub bonus_quads: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    pub units_per_quad: u32,
    pub gpm_per_unit: f64,
    pub annual_cost_per_unit: f64,
    pub base_quads: BaseQuads,
    /// Area tiers; the largest matching tier's bonus applies.
    pub scale_tiers: Vec<ScaleTier>,
    pub max_quads: u32,
    /// Deployments at or above this many quads are phased.
    pub phased_from_quads: u32,
    pub first_phase_quads: u32,
}

impl SizingConfig {
    pub fn max_scale_bonus(&self) -> u32 {
        self.scale_tiers
            .iter()
            .map(|t| t.bonus_quads)
            .max()
            .unwrap_or(0)
    }
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            units_per_quad: 4,
            gpm_per_unit: 50.0,
            annual_cost_per_unit: 18_000.0,
            base_quads: BaseQuads {
                critical: 3,
                degraded: 2,
                stressed: 1,
            },
            scale_tiers: vec![
                ScaleTier {
                    min_acres: 2_500.0,
                    bonus_quads: 1,
                },
                ScaleTier {
                    min_acres: 10_000.0,
                    bonus_quads: 2,
                },
            ],
            max_quads: 6,
            phased_from_quads: 2,
            first_phase_quads: 1,
        }
    }
}

// ── Roadmap ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadmapConfig {
    pub max_phases: u32,
    pub phase_two_after_days: u32,
    pub phase_three_after_days: u32,
}

impl Default for RoadmapConfig {
    fn default() -> Self {
        Self {
            max_phases: 3,
            phase_two_after_days: 90,
            phase_three_after_days: 180,
        }
    }
}

// ── Economics ──────────────────────────────────────────────────────

/// Status-quo manual-compliance baseline for one jurisdiction tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierBaseline {
    pub tier: JurisdictionTier,
    pub pooled_monitoring_cost: f64,
    pub storm_samples: f64,
    pub cost_per_sample: f64,
    pub consulting_reporting_cost: f64,
    pub staff_hours: f64,
    /// Estimated annual nitrogen reduction, lb.
    pub nitrogen_reduction_lb: f64,
    /// Estimated annual phosphorus reduction, lb.
    pub phosphorus_reduction_lb: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialConfig {
    pub dial_id: String,
    pub label: String,
    pub min_value: f64,
    pub max_value: f64,
    pub default_value: f64,
    pub step_size: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomicsConfig {
    pub tiers: Vec<TierBaseline>,
    pub grant_offset_min_pct: f64,
    pub grant_offset_max_pct: f64,
    pub dials: Vec<DialConfig>,
}

impl EconomicsConfig {
    pub fn baseline(&self, tier: JurisdictionTier) -> Option<&TierBaseline> {
        self.tiers.iter().find(|t| t.tier == tier)
    }

    pub fn dial(&self, dial_id: &str) -> Option<&DialConfig> {
        self.dials.iter().find(|d| d.dial_id == dial_id)
    }
}

fn dial(dial_id: &str, label: &str, min: f64, max: f64, default: f64, step: f64) -> DialConfig {
    DialConfig {
        dial_id: dial_id.into(),
        label: label.into(),
        min_value: min,
        max_value: max,
        default_value: default,
        step_size: step,
    }
}

impl Default for EconomicsConfig {
    fn default() -> Self {
        Self {
            tiers: vec![
                TierBaseline {
                    tier: JurisdictionTier::Small,
                    pooled_monitoring_cost: 45_000.0,
                    storm_samples: 24.0,
                    cost_per_sample: 850.0,
                    consulting_reporting_cost: 35_000.0,
                    staff_hours: 400.0,
                    nitrogen_reduction_lb: 2_500.0,
                    phosphorus_reduction_lb: 300.0,
                },
                TierBaseline {
                    tier: JurisdictionTier::Medium,
                    pooled_monitoring_cost: 110_000.0,
                    storm_samples: 48.0,
                    cost_per_sample: 850.0,
                    consulting_reporting_cost: 75_000.0,
                    staff_hours: 900.0,
                    nitrogen_reduction_lb: 8_000.0,
                    phosphorus_reduction_lb: 950.0,
                },
                TierBaseline {
                    tier: JurisdictionTier::Large,
                    pooled_monitoring_cost: 240_000.0,
                    storm_samples: 96.0,
                    cost_per_sample: 850.0,
                    consulting_reporting_cost: 150_000.0,
                    staff_hours: 2_000.0,
                    nitrogen_reduction_lb: 20_000.0,
                    phosphorus_reduction_lb: 2_400.0,
                },
            ],
            grant_offset_min_pct: 40.0,
            grant_offset_max_pct: 75.0,
            dials: vec![
                dial("staff_hourly_rate", "Staff hourly rate ($)", 30.0, 150.0, 65.0, 5.0),
                dial("confirmatory_fraction", "Confirmatory sampling retained", 0.0, 1.0, 0.25, 0.05),
                dial("storm_sample_count", "Storm samples per year", 0.0, 200.0, 48.0, 4.0),
                dial("nitrogen_credit_price", "Nitrogen credit ($/lb)", 0.0, 60.0, 15.0, 1.0),
                dial("phosphorus_credit_price", "Phosphorus credit ($/lb)", 0.0, 400.0, 100.0, 10.0),
            ],
        }
    }
}

// ── Regions: shores and coordinate tables ──────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShoreAxis {
    /// Split west/east at a longitude centerline.
    Longitude,
    /// Split south/north at a latitude centerline.
    Latitude,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    pub fn contains(&self, c: &Coordinate) -> bool {
        c.lat >= self.lat_min && c.lat <= self.lat_max && c.lon >= self.lon_min && c.lon <= self.lon_max
    }
}

/// A body of water that splits its region into two shores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoreBoundary {
    pub id: String,
    pub applies_within: BoundingBox,
    pub axis: ShoreAxis,
    pub centerline: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameHint {
    /// Lower-case fragment matched against the normalized waterbody name.
    pub pattern: String,
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub shore_boundaries: Vec<ShoreBoundary>,
    pub curated_coordinates: BTreeMap<WaterbodyId, Coordinate>,
    pub region_coordinates: BTreeMap<WaterbodyId, Coordinate>,
    pub name_hints: Vec<NameHint>,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            shore_boundaries: vec![ShoreBoundary {
                id: "chesapeake_bay".into(),
                applies_within: BoundingBox {
                    lat_min: 37.8,
                    lat_max: 39.7,
                    lon_min: -77.3,
                    lon_max: -75.0,
                },
                axis: ShoreAxis::Longitude,
                centerline: -76.38,
            }],
            curated_coordinates: BTreeMap::new(),
            region_coordinates: BTreeMap::new(),
            name_hints: Vec::new(),
        }
    }
}

// ── Assessment feed ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub url: Option<String>,
    /// Attempts including the first one.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 4_000,
            timeout_secs: 30,
        }
    }
}

// ── Top level ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub sizing: SizingConfig,
    pub roadmap: RoadmapConfig,
    pub economics: EconomicsConfig,
    pub regions: RegionConfig,
    pub feed: FeedConfig,
}

impl EngineConfig {
    /// Load from a data/ directory. Each section is optional; a missing
    /// file keeps the built-in defaults for that section.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let config = Self {
            scoring: read_section(data_dir, "scoring.json")?,
            sizing: read_section(data_dir, "sizing.json")?,
            roadmap: read_section(data_dir, "roadmap.json")?,
            economics: read_section(data_dir, "economics.json")?,
            regions: read_section(data_dir, "regions.json")?,
            feed: read_section(data_dir, "feed.json")?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject tables that would break the engine's invariants.
    pub fn validate(&self) -> EngineResult<()> {
        let s = &self.scoring;
        if s.dissolved_oxygen.critical_below > s.dissolved_oxygen.stressed_below {
            return invalid("dissolved oxygen critical threshold exceeds stressed threshold");
        }
        for (name, b) in [("chlorophyll", &s.chlorophyll), ("total_nitrogen", &s.total_nitrogen)] {
            if !(b.bloom <= b.significant && b.significant <= b.severe) {
                return invalid(&format!("{name} bands must ascend"));
            }
        }
        if s.turbidity.elevated > s.turbidity.impaired {
            return invalid("turbidity bands must ascend");
        }
        if (s.weights.total() - 100.0).abs() > 1e-9 {
            return invalid(&format!("score weights sum to {}, expected 100", s.weights.total()));
        }
        let bands = &s.label_bands;
        if !(bands.stressed <= bands.degraded && bands.degraded <= bands.critical) {
            return invalid("label bands must ascend");
        }

        let z = &self.sizing;
        let b = &z.base_quads;
        if !(0 < b.stressed && b.stressed < b.degraded && b.degraded < b.critical) {
            return invalid("base quads must be positive and strictly increase with severity");
        }
        if z.max_quads < b.critical + z.max_scale_bonus() {
            return invalid(&format!(
                "max_quads {} is below critical base {} plus largest scale bonus {}",
                z.max_quads,
                b.critical,
                z.max_scale_bonus()
            ));
        }
        if z.units_per_quad == 0 || z.first_phase_quads == 0 {
            return invalid("units_per_quad and first_phase_quads must be positive");
        }

        if self.roadmap.max_phases == 0 {
            return invalid("max_phases must be positive");
        }

        let e = &self.economics;
        for tier in [JurisdictionTier::Small, JurisdictionTier::Medium, JurisdictionTier::Large] {
            if e.baseline(tier).is_none() {
                return invalid(&format!("no economics baseline for {} tier", tier.as_str()));
            }
        }
        if e.grant_offset_min_pct > e.grant_offset_max_pct {
            return invalid("grant offset band is inverted");
        }
        for d in &e.dials {
            if d.min_value > d.max_value || d.step_size <= 0.0 {
                return invalid(&format!("dial {} has inverted bounds or non-positive step", d.dial_id));
            }
        }

        if self.feed.max_attempts == 0 {
            return invalid("feed max_attempts must be at least 1");
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> EngineResult<()> {
    Err(EngineError::InvalidConfig {
        reason: reason.to_string(),
    })
}

fn read_section<T: DeserializeOwned + Default>(data_dir: &str, file: &str) -> anyhow::Result<T> {
    let path = Path::new(data_dir).join(file);
    if !path.exists() {
        log::debug!("config: {} not found, using defaults", path.display());
        return Ok(T::default());
    }
    let content = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
    let section = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Cannot parse {}: {e}", path.display()))?;
    Ok(section)
}
