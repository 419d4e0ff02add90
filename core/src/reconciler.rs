//! AssessmentReconciler: merges an external assessment feed into the
//! internal waterbody registry.
//!
//! RULES:
//!   - Matching is cleaned-name substring containment, case-insensitive.
//!   - Severity is upgraded, never downgraded.
//!   - Every matched waterbody is marked assessed.
//!   - Unmatched Category 4/5 records become new registry entries.
//!   - An unavailable feed leaves the registry untouched.
//!
//! A synthesized entry takes severity, category, causes and alert count
//! from the record it was minted from. Only entries that were already in
//! the registry go through best-record matching, and a record whose cleaned
//! name equals the entry's outranks containment matches. Together these keep
//! a second reconcile with the same feed a no-op.

use crate::{
    feed::{AssessmentFeed, FeedStatus},
    model::{AssessmentRecord, AssessmentStatus, CoordinateSource, Severity, Waterbody},
    names::{clean_name, mint_waterbody_id, names_match},
    types::WaterbodyId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegistryChange {
    SeverityUpgraded {
        waterbody_id: WaterbodyId,
        from: Severity,
        to: Severity,
    },
    MarkedAssessed {
        waterbody_id: WaterbodyId,
    },
    Synthesized {
        waterbody_id: WaterbodyId,
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationOutcome {
    pub waterbodies: Vec<Waterbody>,
    pub changes: Vec<RegistryChange>,
    pub feed_status: FeedStatus,
}

impl ReconciliationOutcome {
    pub fn synthesized_count(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, RegistryChange::Synthesized { .. }))
            .count()
    }

    pub fn upgraded_count(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, RegistryChange::SeverityUpgraded { .. }))
            .count()
    }
}

fn same_state(record: &AssessmentRecord, wb: &Waterbody) -> bool {
    record
        .state
        .as_deref()
        .map_or(true, |s| s.eq_ignore_ascii_case(&wb.state))
}

fn record_matches(record: &AssessmentRecord, wb: &Waterbody) -> bool {
    same_state(record, wb) && names_match(&wb.name, &record.name)
}

/// Highest-severity matching record; the first one listed wins a tie.
/// Records whose cleaned name equals the entry's are preferred over
/// containment-only matches.
fn best_record<'a>(records: &'a [AssessmentRecord], wb: &Waterbody) -> Option<&'a AssessmentRecord> {
    let highest = |exact_only: bool| {
        let name = clean_name(&wb.name);
        records
            .iter()
            .filter(|r| record_matches(r, wb))
            .filter(|r| !exact_only || clean_name(&r.name) == name)
            .fold(None, |best: Option<&'a AssessmentRecord>, r| match best {
                Some(b) if b.severity() >= r.severity() => Some(b),
                _ => Some(r),
            })
    };
    highest(true).or_else(|| highest(false))
}

/// New registry entry carrying everything from the record it came from.
fn synthesize(id: WaterbodyId, state: &str, record: &AssessmentRecord) -> Waterbody {
    let mut wb = Waterbody::new(&id, record.name.trim(), state);
    wb.severity = record.severity();
    wb.status = AssessmentStatus::Assessed;
    wb.category = Some(record.category_code.trim().to_string());
    wb.causes = record.causes.clone();
    wb.active_alerts = record.causes.len() as u32;
    wb.data_sources = 1;
    if let Some(c) = record.coordinate {
        wb.coordinate = Some(c);
        wb.coordinate_source = Some(CoordinateSource::Feed);
    }
    wb
}

fn apply_record(wb: &mut Waterbody, record: &AssessmentRecord, changes: &mut Vec<RegistryChange>) {
    let external = record.severity();
    if external > wb.severity {
        log::debug!(
            "reconcile: upgraded {} {} -> {}",
            wb.id,
            wb.severity.as_str(),
            external.as_str()
        );
        changes.push(RegistryChange::SeverityUpgraded {
            waterbody_id: wb.id.clone(),
            from: wb.severity,
            to: external,
        });
        wb.severity = external;
    }
    if wb.status != AssessmentStatus::Assessed {
        wb.status = AssessmentStatus::Assessed;
        changes.push(RegistryChange::MarkedAssessed {
            waterbody_id: wb.id.clone(),
        });
    }
    wb.category = Some(record.category_code.trim().to_string());
    wb.causes = record.causes.clone();
    if wb.coordinate.is_none() {
        if let Some(c) = record.coordinate {
            wb.coordinate = Some(c);
            wb.coordinate_source = Some(CoordinateSource::Feed);
        }
    }
}

pub fn reconcile(registry: &[Waterbody], feed: &AssessmentFeed) -> ReconciliationOutcome {
    if !feed.status.is_available() {
        log::warn!("reconcile[{}]: feed unavailable, registry unchanged", feed.state);
        return ReconciliationOutcome {
            waterbodies: registry.to_vec(),
            changes: Vec::new(),
            feed_status: feed.status.clone(),
        };
    }

    let mut waterbodies = registry.to_vec();
    let mut changes = Vec::new();

    // ── Pass 1: mint entries for impaired records nothing matches ──
    let original_len = waterbodies.len();
    for record in &feed.records {
        if !record.is_impaired() || clean_name(&record.name).is_empty() {
            continue;
        }
        if waterbodies[..original_len]
            .iter()
            .any(|wb| record_matches(record, wb))
        {
            continue;
        }
        let state = record.state.clone().unwrap_or_else(|| feed.state.clone());
        let id = mint_waterbody_id(&state, &record.name);

        if waterbodies[..original_len].iter().any(|wb| wb.id == id) {
            log::debug!("reconcile: minted id {id} already in registry, skipped");
            continue;
        }
        // Two records minting the same id: the higher severity one wins,
        // the first listed on a tie.
        if let Some(existing) = waterbodies[original_len..].iter_mut().find(|wb| wb.id == id) {
            if record.severity() > existing.severity {
                let name = existing.name.clone();
                *existing = synthesize(id, &state, record);
                existing.name = name;
            }
            continue;
        }

        let wb = synthesize(id.clone(), &state, record);
        log::debug!("reconcile: synthesized {id} from \"{}\"", record.name);
        changes.push(RegistryChange::Synthesized {
            waterbody_id: id,
            name: wb.name.clone(),
        });
        waterbodies.push(wb);
    }

    // ── Pass 2: apply the best matching record to existing entries ─
    for wb in waterbodies[..original_len].iter_mut() {
        if let Some(record) = best_record(&feed.records, wb) {
            apply_record(wb, record, &mut changes);
        }
    }

    let outcome = ReconciliationOutcome {
        waterbodies,
        changes,
        feed_status: feed.status.clone(),
    };
    log::info!(
        "reconcile[{}]: {} records, {} upgraded, {} synthesized",
        feed.state,
        feed.records.len(),
        outcome.upgraded_count(),
        outcome.synthesized_count()
    );
    outcome
}
