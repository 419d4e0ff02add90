//! AssessmentReconciler tests: upgrade-only severity, synthesis, idempotence.

use watershed_core::{
    feed::{AssessmentFeed, FeedStatus},
    model::{AssessmentRecord, AssessmentStatus, Coordinate, Severity, Waterbody},
    reconciler::{reconcile, RegistryChange},
};

fn record(name: &str, category: &str, causes: &[&str]) -> AssessmentRecord {
    AssessmentRecord {
        name: name.to_string(),
        category_code: category.to_string(),
        causes: causes.iter().map(|c| c.to_string()).collect(),
        cycle: Some("2024".to_string()),
        coordinate: None,
        state: None,
    }
}

fn registry() -> Vec<Waterbody> {
    let mut back = Waterbody::new("md_back_river", "Back River", "MD").with_coordinate(39.28, -76.45);
    back.severity = Severity::Low;
    let mut magothy = Waterbody::new("md_magothy_river", "Magothy River", "MD");
    magothy.severity = Severity::High;
    vec![back, magothy]
}

#[test]
fn severity_is_upgraded_when_feed_outranks_registry() {
    let feed = AssessmentFeed::live("MD", vec![record("BACK RIVER, Tidal", "5", &["Nitrogen"])]);

    let outcome = reconcile(&registry(), &feed);
    let back = &outcome.waterbodies[0];

    assert_eq!(back.severity, Severity::High);
    assert_eq!(back.status, AssessmentStatus::Assessed);
    assert_eq!(back.category.as_deref(), Some("5"));
    assert!(outcome.changes.contains(&RegistryChange::SeverityUpgraded {
        waterbody_id: "md_back_river".into(),
        from: Severity::Low,
        to: Severity::High,
    }));
}

#[test]
fn severity_is_never_downgraded() {
    let feed = AssessmentFeed::live("MD", vec![record("Magothy River", "3", &[])]);

    let outcome = reconcile(&registry(), &feed);
    let magothy = &outcome.waterbodies[1];

    assert_eq!(magothy.severity, Severity::High, "Lower feed severity must not downgrade");
    assert_eq!(magothy.status, AssessmentStatus::Assessed, "Matched entry is still marked assessed");
    assert_eq!(outcome.upgraded_count(), 0);
}

#[test]
fn unmatched_impaired_record_is_synthesized() {
    let mut bird = record("Bird River, Upper", "5", &["Enterococcus", "Chlorophyll-a"]);
    bird.coordinate = Some(Coordinate::new(39.33, -76.43));
    let feed = AssessmentFeed::live("MD", vec![bird, record("Deer Creek", "2", &[])]);

    let outcome = reconcile(&registry(), &feed);

    assert_eq!(outcome.waterbodies.len(), 3, "Only the Category 5 record is synthesized");
    let new = &outcome.waterbodies[2];
    assert_eq!(new.id, "md_bird_river");
    assert_eq!(new.severity, Severity::High);
    assert_eq!(new.status, AssessmentStatus::Assessed);
    assert_eq!(new.active_alerts, 2, "Alert count equals cause-list length");
    assert_eq!(new.coordinate, Some(Coordinate::new(39.33, -76.43)));
    assert_eq!(outcome.synthesized_count(), 1);
}

#[test]
fn reconciling_twice_equals_reconciling_once() {
    let feed = AssessmentFeed::live(
        "MD",
        vec![
            record("Back River, Tidal", "5", &["Nitrogen", "Phosphorus"]),
            record("Magothy River", "4a", &["E. coli"]),
            record("Bird River", "5", &["Enterococcus"]),
            record("Bird River, Lower", "4a", &["Sediment"]),
            record("Severn River", "2", &[]),
        ],
    );

    let once = reconcile(&registry(), &feed);
    let twice = reconcile(&once.waterbodies, &feed);

    assert_eq!(once.waterbodies, twice.waterbodies);
    assert_eq!(twice.synthesized_count(), 0);
    assert_eq!(twice.upgraded_count(), 0);
}

#[test]
fn unavailable_feed_leaves_registry_untouched() {
    let feed = AssessmentFeed::unavailable("MD", "Feed returned HTTP 503", 3);

    let outcome = reconcile(&registry(), &feed);

    assert_eq!(outcome.waterbodies, registry());
    assert!(outcome.changes.is_empty());
    assert!(matches!(
        outcome.feed_status,
        FeedStatus::Unavailable { attempts: 3, .. }
    ));
}

#[test]
fn empty_feed_marks_nothing() {
    let feed = AssessmentFeed::live("MD", Vec::new());

    let outcome = reconcile(&registry(), &feed);

    assert_eq!(outcome.waterbodies, registry());
    assert_eq!(outcome.feed_status, FeedStatus::Live);
}

#[test]
fn record_from_another_state_does_not_match() {
    let mut va = record("Back River", "5", &["Nitrogen"]);
    va.state = Some("VA".to_string());
    let feed = AssessmentFeed::live("MD", vec![va]);

    let outcome = reconcile(&registry(), &feed);

    assert_eq!(outcome.waterbodies[0].severity, Severity::Low);
    assert_eq!(outcome.waterbodies.len(), 3);
    assert_eq!(outcome.waterbodies[2].id, "va_back_river");
}

#[test]
fn synthesized_entry_keeps_its_own_record() {
    let feed = AssessmentFeed::live(
        "MD",
        vec![
            record("Back River", "4a", &["Nitrogen"]),
            record("Back River Creek", "5", &["Nitrogen", "Phosphorus", "Enterococcus"]),
        ],
    );

    let once = reconcile(&[], &feed);

    assert_eq!(once.waterbodies.len(), 2);
    let back = &once.waterbodies[0];
    assert_eq!(back.id, "md_back_river");
    assert_eq!(back.severity, Severity::Medium, "Overlapping Category 5 record must not leak in");
    assert_eq!(back.category.as_deref(), Some("4a"));
    assert_eq!(back.causes, vec!["Nitrogen".to_string()]);
    assert_eq!(back.active_alerts, 1);

    let creek = &once.waterbodies[1];
    assert_eq!(creek.id, "md_back_river_creek");
    assert_eq!(creek.severity, Severity::High);
    assert_eq!(creek.active_alerts, 3);

    let twice = reconcile(&once.waterbodies, &feed);
    assert_eq!(once.waterbodies, twice.waterbodies);
    assert!(twice.changes.is_empty());
}
