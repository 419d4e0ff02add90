//! GeoAssigner: decides which jurisdiction is responsible for each waterbody.
//!
//! ORDER OF PRECEDENCE:
//!   1. Primary membership. A jurisdiction's primary ids are always assigned
//!      to it, whatever their coordinate.
//!   2. Nearest center. Every other waterbody with a resolved coordinate goes
//!      to the nearest eligible jurisdiction in the same state.
//!   3. Unassigned. No coordinate, or no eligible jurisdiction: the waterbody
//!      stays visible only in the state-wide view.
//!
//! Eligibility excludes jurisdictions on the opposite shore of a configured
//! shore boundary, unless the jurisdiction is shore-neutral.
//!
//! Distance is squared degrees with the longitude delta scaled by
//! cos(latitude). Adequate at county scale; not precise near shorelines.
//! Ties go to the jurisdiction listed first.

use crate::{
    config::{RegionConfig, ShoreAxis, ShoreBoundary},
    model::{Coordinate, CoordinateSource, Jurisdiction, Waterbody},
    names::clean_name,
    types::{JurisdictionId, WaterbodyId},
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShoreSide {
    West,
    East,
    South,
    North,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoreClassification {
    pub boundary_id: String,
    pub side: ShoreSide,
}

/// Classify a point against the first boundary whose box contains it.
pub fn classify_shore(c: &Coordinate, boundaries: &[ShoreBoundary]) -> Option<ShoreClassification> {
    let boundary = boundaries.iter().find(|b| b.applies_within.contains(c))?;
    let side = match boundary.axis {
        ShoreAxis::Longitude if c.lon < boundary.centerline => ShoreSide::West,
        ShoreAxis::Longitude => ShoreSide::East,
        ShoreAxis::Latitude if c.lat < boundary.centerline => ShoreSide::South,
        ShoreAxis::Latitude => ShoreSide::North,
    };
    Some(ShoreClassification {
        boundary_id: boundary.id.clone(),
        side,
    })
}

/// True only when both points fall under the same boundary on different sides.
pub fn on_opposite_shores(
    a: Option<&ShoreClassification>,
    b: Option<&ShoreClassification>,
) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.boundary_id == b.boundary_id && a.side != b.side,
        _ => false,
    }
}

/// Squared-degree distance with cos(latitude) longitude correction,
/// taken at the waterbody's latitude.
pub fn distance_sq(waterbody: &Coordinate, center: &Coordinate) -> f64 {
    let dlat = waterbody.lat - center.lat;
    let dlon = (waterbody.lon - center.lon) * waterbody.lat.to_radians().cos();
    dlat * dlat + dlon * dlon
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JurisdictionAssignment {
    pub jurisdiction_id: JurisdictionId,
    /// Primary ids first (listed order), then nearest-matched ids (registry order).
    pub waterbody_ids: Vec<WaterbodyId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub by_jurisdiction: Vec<JurisdictionAssignment>,
    pub unassigned: Vec<WaterbodyId>,
}

impl Assignment {
    pub fn waterbodies_for(&self, jurisdiction_id: &str) -> &[WaterbodyId] {
        self.by_jurisdiction
            .iter()
            .find(|a| a.jurisdiction_id == jurisdiction_id)
            .map(|a| a.waterbody_ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_assigned_to(&self, jurisdiction_id: &str, waterbody_id: &str) -> bool {
        self.waterbodies_for(jurisdiction_id)
            .iter()
            .any(|id| id == waterbody_id)
    }
}

pub fn assign(
    jurisdictions: &[Jurisdiction],
    waterbodies: &[Waterbody],
    shores: &[ShoreBoundary],
) -> Assignment {
    let mut by_jurisdiction: Vec<JurisdictionAssignment> = jurisdictions
        .iter()
        .map(|j| {
            let mut seen = HashSet::new();
            let waterbody_ids = j
                .primary_waterbodies
                .iter()
                .filter(|id| seen.insert(id.as_str()))
                .cloned()
                .collect();
            JurisdictionAssignment {
                jurisdiction_id: j.id.clone(),
                waterbody_ids,
            }
        })
        .collect();

    let primary: HashSet<&str> = jurisdictions
        .iter()
        .flat_map(|j| j.primary_waterbodies.iter().map(String::as_str))
        .collect();

    let centers: Vec<Option<ShoreClassification>> = jurisdictions
        .iter()
        .map(|j| classify_shore(&j.center, shores))
        .collect();

    let mut unassigned = Vec::new();

    for wb in waterbodies {
        if primary.contains(wb.id.as_str()) {
            continue;
        }
        let Some(coord) = wb.coordinate else {
            log::debug!("assign: {} has no coordinate, state-wide only", wb.id);
            unassigned.push(wb.id.clone());
            continue;
        };
        let wb_shore = classify_shore(&coord, shores);

        let mut best: Option<(usize, f64)> = None;
        for (idx, j) in jurisdictions.iter().enumerate() {
            if !j.state_prefix.eq_ignore_ascii_case(&wb.state) {
                continue;
            }
            if !j.shore_neutral && on_opposite_shores(wb_shore.as_ref(), centers[idx].as_ref()) {
                continue;
            }
            let d = distance_sq(&coord, &j.center);
            // Strict less-than keeps the first-listed jurisdiction on ties.
            if best.map_or(true, |(_, best_d)| d < best_d) {
                best = Some((idx, d));
            }
        }

        match best {
            Some((idx, d)) => {
                log::debug!(
                    "assign: {} -> {} (d2={d:.5})",
                    wb.id,
                    by_jurisdiction[idx].jurisdiction_id
                );
                by_jurisdiction[idx].waterbody_ids.push(wb.id.clone());
            }
            None => {
                log::debug!("assign: {} has no eligible jurisdiction", wb.id);
                unassigned.push(wb.id.clone());
            }
        }
    }

    Assignment {
        by_jurisdiction,
        unassigned,
    }
}

// ── Coordinate resolution ──────────────────────────────────────────

/// Resolves coordinates in priority order: explicit coordinate, curated
/// table, region table, name hint.
pub struct CoordinateResolver<'a> {
    regions: &'a RegionConfig,
}

impl<'a> CoordinateResolver<'a> {
    pub fn new(regions: &'a RegionConfig) -> Self {
        Self { regions }
    }

    pub fn resolve(&self, wb: &Waterbody) -> Option<(Coordinate, CoordinateSource)> {
        if let Some(c) = wb.coordinate {
            return Some((c, wb.coordinate_source.unwrap_or(CoordinateSource::Feed)));
        }
        if let Some(c) = self.regions.curated_coordinates.get(&wb.id) {
            return Some((*c, CoordinateSource::Curated));
        }
        if let Some(c) = self.regions.region_coordinates.get(&wb.id) {
            return Some((*c, CoordinateSource::Region));
        }
        let name = clean_name(&wb.name);
        self.regions
            .name_hints
            .iter()
            .find(|h| !h.pattern.is_empty() && name.contains(&h.pattern.to_lowercase()))
            .map(|h| (h.coordinate, CoordinateSource::NameHint))
    }

    /// Return the registry with every resolvable coordinate filled in.
    pub fn resolve_all(&self, waterbodies: &[Waterbody]) -> Vec<Waterbody> {
        waterbodies
            .iter()
            .map(|wb| {
                let mut wb = wb.clone();
                match self.resolve(&wb) {
                    Some((c, source)) => {
                        wb.coordinate = Some(c);
                        wb.coordinate_source = Some(source);
                    }
                    None => log::warn!("resolve: no coordinate for {} ({})", wb.id, wb.name),
                }
                wb
            })
            .collect()
    }
}
