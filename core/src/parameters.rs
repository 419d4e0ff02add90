//! Water-quality parameter readings and screening exceedances.
//!
//! Raw monitoring results arrive keyed by characteristic name
//! ("Dissolved oxygen (DO)", "Escherichia coli", ...). They are folded into
//! one `ParameterReadings` per waterbody, keeping the most recent value of
//! each parameter.
//!
//! Screening levels are general, not state-specific criteria.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKey {
    DissolvedOxygen,
    Temperature,
    Ph,
    Turbidity,
    TotalSuspendedSolids,
    TotalNitrogen,
    TotalPhosphorus,
    Bacteria,
    Chlorophyll,
    Conductivity,
    Salinity,
    Secchi,
}

impl ParameterKey {
    pub const ALL: [ParameterKey; 12] = [
        ParameterKey::DissolvedOxygen,
        ParameterKey::Temperature,
        ParameterKey::Ph,
        ParameterKey::Turbidity,
        ParameterKey::TotalSuspendedSolids,
        ParameterKey::TotalNitrogen,
        ParameterKey::TotalPhosphorus,
        ParameterKey::Bacteria,
        ParameterKey::Chlorophyll,
        ParameterKey::Conductivity,
        ParameterKey::Salinity,
        ParameterKey::Secchi,
    ];

    /// Map a monitoring characteristic name to a parameter key.
    pub fn from_characteristic(name: &str) -> Option<Self> {
        let key = match name.trim() {
            "Dissolved oxygen (DO)" | "Dissolved oxygen" => ParameterKey::DissolvedOxygen,
            "Temperature, water" => ParameterKey::Temperature,
            "pH" => ParameterKey::Ph,
            "Turbidity" => ParameterKey::Turbidity,
            "Total suspended solids" => ParameterKey::TotalSuspendedSolids,
            "Nitrogen, mixed forms (NH3), (NH4), organic, (NO2) and (NO3)"
            | "Total Nitrogen, mixed forms"
            | "Nitrogen" => ParameterKey::TotalNitrogen,
            "Phosphorus" => ParameterKey::TotalPhosphorus,
            "Escherichia coli" | "Enterococcus" | "Fecal Coliform" => ParameterKey::Bacteria,
            "Chlorophyll a" => ParameterKey::Chlorophyll,
            "Specific conductance" | "Conductivity" => ParameterKey::Conductivity,
            "Salinity" => ParameterKey::Salinity,
            "Secchi depth" => ParameterKey::Secchi,
            _ => return None,
        };
        Some(key)
    }

    /// Map a USGS parameter code to a parameter key.
    pub fn from_usgs_code(code: &str) -> Option<Self> {
        let key = match code.trim() {
            "00300" => ParameterKey::DissolvedOxygen,
            "00010" => ParameterKey::Temperature,
            "00400" => ParameterKey::Ph,
            "63680" => ParameterKey::Turbidity,
            "00095" => ParameterKey::Conductivity,
            "00480" => ParameterKey::Salinity,
            _ => return None,
        };
        Some(key)
    }

    pub fn unit(self) -> &'static str {
        match self {
            ParameterKey::DissolvedOxygen
            | ParameterKey::TotalSuspendedSolids
            | ParameterKey::TotalNitrogen
            | ParameterKey::TotalPhosphorus => "mg/L",
            ParameterKey::Temperature => "°C",
            ParameterKey::Ph => "SU",
            ParameterKey::Turbidity => "NTU",
            ParameterKey::Bacteria => "MPN/100mL",
            ParameterKey::Chlorophyll => "µg/L",
            ParameterKey::Conductivity => "µS/cm",
            ParameterKey::Salinity => "ppt",
            ParameterKey::Secchi => "m",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ParameterKey::DissolvedOxygen => "DO",
            ParameterKey::Temperature => "temperature",
            ParameterKey::Ph => "pH",
            ParameterKey::Turbidity => "turbidity",
            ParameterKey::TotalSuspendedSolids => "TSS",
            ParameterKey::TotalNitrogen => "TN",
            ParameterKey::TotalPhosphorus => "TP",
            ParameterKey::Bacteria => "bacteria",
            ParameterKey::Chlorophyll => "chlorophyll-a",
            ParameterKey::Conductivity => "conductivity",
            ParameterKey::Salinity => "salinity",
            ParameterKey::Secchi => "Secchi depth",
        }
    }
}

/// Which fecal indicator a bacteria reading measures. Each has its own
/// screening level; a reading with no recorded indicator is read as E. coli.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BacteriaIndicator {
    #[default]
    EColi,
    Enterococcus,
    FecalColiform,
}

impl BacteriaIndicator {
    pub fn from_characteristic(name: &str) -> Option<Self> {
        match name.trim() {
            "Escherichia coli" => Some(BacteriaIndicator::EColi),
            "Enterococcus" => Some(BacteriaIndicator::Enterococcus),
            "Fecal Coliform" => Some(BacteriaIndicator::FecalColiform),
            _ => None,
        }
    }

    /// Single-sample screening level, MPN/100mL.
    pub fn screening_level(self) -> f64 {
        match self {
            BacteriaIndicator::EColi => 410.0,
            BacteriaIndicator::Enterococcus => 130.0,
            BacteriaIndicator::FecalColiform => 400.0,
        }
    }
}

/// One raw monitoring result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub characteristic: String,
    pub value: f64,
    pub date: NaiveDate,
}

/// Latest reading per parameter. Absent fields are unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterReadings {
    pub dissolved_oxygen: Option<f64>,
    pub temperature: Option<f64>,
    pub ph: Option<f64>,
    pub turbidity: Option<f64>,
    pub total_suspended_solids: Option<f64>,
    pub total_nitrogen: Option<f64>,
    pub total_phosphorus: Option<f64>,
    pub bacteria: Option<f64>,
    pub bacteria_indicator: Option<BacteriaIndicator>,
    pub chlorophyll: Option<f64>,
    pub conductivity: Option<f64>,
    pub salinity: Option<f64>,
    pub secchi: Option<f64>,
    pub last_sampled: Option<NaiveDate>,
}

impl ParameterReadings {
    pub fn get(&self, key: ParameterKey) -> Option<f64> {
        *self.slot(key)
    }

    pub fn set(&mut self, key: ParameterKey, value: f64) {
        *self.slot_mut(key) = Some(value);
    }

    fn slot(&self, key: ParameterKey) -> &Option<f64> {
        match key {
            ParameterKey::DissolvedOxygen => &self.dissolved_oxygen,
            ParameterKey::Temperature => &self.temperature,
            ParameterKey::Ph => &self.ph,
            ParameterKey::Turbidity => &self.turbidity,
            ParameterKey::TotalSuspendedSolids => &self.total_suspended_solids,
            ParameterKey::TotalNitrogen => &self.total_nitrogen,
            ParameterKey::TotalPhosphorus => &self.total_phosphorus,
            ParameterKey::Bacteria => &self.bacteria,
            ParameterKey::Chlorophyll => &self.chlorophyll,
            ParameterKey::Conductivity => &self.conductivity,
            ParameterKey::Salinity => &self.salinity,
            ParameterKey::Secchi => &self.secchi,
        }
    }

    fn slot_mut(&mut self, key: ParameterKey) -> &mut Option<f64> {
        match key {
            ParameterKey::DissolvedOxygen => &mut self.dissolved_oxygen,
            ParameterKey::Temperature => &mut self.temperature,
            ParameterKey::Ph => &mut self.ph,
            ParameterKey::Turbidity => &mut self.turbidity,
            ParameterKey::TotalSuspendedSolids => &mut self.total_suspended_solids,
            ParameterKey::TotalNitrogen => &mut self.total_nitrogen,
            ParameterKey::TotalPhosphorus => &mut self.total_phosphorus,
            ParameterKey::Bacteria => &mut self.bacteria,
            ParameterKey::Chlorophyll => &mut self.chlorophyll,
            ParameterKey::Conductivity => &mut self.conductivity,
            ParameterKey::Salinity => &mut self.salinity,
            ParameterKey::Secchi => &mut self.secchi,
        }
    }

    /// Copy with every non-finite reading dropped to unknown.
    pub fn finite_only(&self) -> Self {
        let mut clean = self.clone();
        for key in ParameterKey::ALL {
            let slot = clean.slot_mut(key);
            if slot.is_some_and(|v| !v.is_finite()) {
                *slot = None;
            }
        }
        clean
    }

    /// Fold raw observations, keeping the most recent value per parameter.
    /// Unknown characteristics and non-finite values are skipped.
    /// Equal dates: the later observation in the slice wins.
    pub fn from_observations(observations: &[Observation]) -> Self {
        let mut readings = Self::default();
        let mut dated: Vec<(ParameterKey, NaiveDate)> = Vec::new();

        for obs in observations {
            let Some(key) = ParameterKey::from_characteristic(&obs.characteristic) else {
                continue;
            };
            if !obs.value.is_finite() {
                continue;
            }
            match dated.iter_mut().find(|(k, _)| *k == key) {
                Some((_, date)) if *date > obs.date => continue,
                Some((_, date)) => *date = obs.date,
                None => dated.push((key, obs.date)),
            }
            readings.set(key, obs.value);
            if key == ParameterKey::Bacteria {
                readings.bacteria_indicator =
                    BacteriaIndicator::from_characteristic(&obs.characteristic);
            }
            readings.last_sampled = readings.last_sampled.max(Some(obs.date));
        }
        readings
    }
}

// ── Screening exceedances ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum ScreeningLimit {
    Above(f64),
    Below(f64),
    Range(f64, f64),
}

const SCREENING_LEVELS: &[(ParameterKey, ScreeningLimit)] = &[
    (ParameterKey::DissolvedOxygen, ScreeningLimit::Below(5.0)),
    (ParameterKey::Ph, ScreeningLimit::Range(6.5, 8.5)),
    (ParameterKey::TotalNitrogen, ScreeningLimit::Above(3.0)),
    (ParameterKey::TotalPhosphorus, ScreeningLimit::Above(0.1)),
    (ParameterKey::TotalSuspendedSolids, ScreeningLimit::Above(25.0)),
    // Default indicator; detect_exceedances swaps in the recorded one.
    (ParameterKey::Bacteria, ScreeningLimit::Above(410.0)),
    (ParameterKey::Turbidity, ScreeningLimit::Above(50.0)),
    (ParameterKey::Chlorophyll, ScreeningLimit::Above(40.0)),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exceedance {
    pub parameter: ParameterKey,
    pub value: f64,
    pub threshold: f64,
    /// Fractional distance past the threshold (0.2 = 20 % over).
    pub percent_over: f64,
}

pub fn detect_exceedances(readings: &ParameterReadings) -> Vec<Exceedance> {
    SCREENING_LEVELS
        .iter()
        .filter_map(|(key, limit)| {
            let value = readings.get(*key)?;
            let limit = match key {
                ParameterKey::Bacteria => ScreeningLimit::Above(
                    readings.bacteria_indicator.unwrap_or_default().screening_level(),
                ),
                _ => *limit,
            };
            let threshold = match limit {
                ScreeningLimit::Above(t) if value > t => t,
                ScreeningLimit::Below(t) if value < t => t,
                ScreeningLimit::Range(lo, _) if value < lo => lo,
                ScreeningLimit::Range(_, hi) if value > hi => hi,
                _ => return None,
            };
            let percent_over = if threshold != 0.0 {
                ((value - threshold).abs() / threshold * 10_000.0).round() / 10_000.0
            } else {
                0.0
            };
            Some(Exceedance {
                parameter: *key,
                value,
                threshold,
                percent_over,
            })
        })
        .collect()
}
