//! End-to-end planning runs over the bundled demo input.

use watershed_core::{
    config::EngineConfig,
    engine::{PlanningEngine, PlanningInput},
    feed::{AssessmentFeed, FeedStatus},
    model::Severity,
    severity_scorer::SeverityLabel,
};

const DEMO_INPUT: &str = include_str!("../../demos/sample_input.json");

fn engine() -> PlanningEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    let data_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../data");
    PlanningEngine::new(EngineConfig::load(data_dir).unwrap())
}

fn demo_input() -> PlanningInput {
    serde_json::from_str(DEMO_INPUT).unwrap()
}

#[test]
fn demo_run_assigns_reconciles_and_plans() {
    let report = engine().run(&demo_input());

    assert_eq!(report.registry.len(), 8, "Bird River should be synthesized from the feed");
    let bird = report.registry.iter().find(|w| w.id == "md_bird_river").unwrap();
    assert_eq!(bird.severity, Severity::High);

    let baltimore = report.jurisdiction("baltimore_county").unwrap();
    let ids: Vec<&str> = baltimore
        .waterbodies
        .iter()
        .map(|w| w.waterbody_id.as_str())
        .collect();
    assert_eq!(
        ids,
        vec!["md_back_river", "md_gunpowder_river", "md_patapsco_river", "md_bird_river"]
    );
    assert_eq!(baltimore.priority_waterbody.as_deref(), Some("md_back_river"));

    let back = baltimore.priority().unwrap();
    assert_eq!(back.assessment.label, SeverityLabel::Critical);
    assert_eq!(back.plan.total_quads, 4, "3 critical quads plus 1 for area");
    assert_eq!(back.plan.phases.len(), 3);
    assert_eq!(back.plan.phase_units(), 16);
    assert_eq!(baltimore.cost.total_units, 16);
    assert_eq!(baltimore.cost.engine.units, 16.0 * 18_000.0);
}

#[test]
fn shore_and_state_wide_fallbacks() {
    let report = engine().run(&demo_input());

    assert!(report
        .assignment
        .is_assigned_to("talbot_county", "md_choptank_river"));
    assert!(!report
        .assignment
        .is_assigned_to("anne_arundel", "md_choptank_river"));

    let unassigned: Vec<&str> = report
        .unassigned
        .iter()
        .map(|w| w.waterbody_id.as_str())
        .collect();
    assert_eq!(unassigned, vec!["md_unnamed_tributary"]);
}

#[test]
fn healthy_unlisted_water_short_circuits() {
    let report = engine().run(&demo_input());

    let severn = report.waterbody("md_severn_river").unwrap();
    assert!(severn.assessment.no_action_indicated);
    assert_eq!(severn.plan.total_units, 0);
    assert!(severn.plan.phases.is_empty());

    let anne_arundel = report.jurisdiction("anne_arundel").unwrap();
    assert_eq!(anne_arundel.priority_waterbody.as_deref(), Some("md_magothy_river"));
}

#[test]
fn raw_observations_feed_the_scorer() {
    let report = engine().run(&demo_input());

    let choptank = report.waterbody("md_choptank_river").unwrap();
    assert_eq!(choptank.assessment.readings.turbidity, Some(41.0));
    assert_eq!(choptank.assessment.data_age_days, Some(120));
    assert!(choptank.assessment.impaired);
}

#[test]
fn identical_inputs_give_identical_reports() {
    let engine = engine();
    let input = demo_input();

    assert_eq!(engine.run(&input), engine.run(&input));
}

#[test]
fn unavailable_feed_still_produces_a_plan() {
    let mut input = demo_input();
    input.feeds = vec![AssessmentFeed::unavailable("MD", "timed out", 3)];

    let report = engine().run(&input);

    assert!(report.any_feed_unavailable());
    assert!(matches!(report.feeds[0].status, FeedStatus::Unavailable { .. }));
    assert!(report.changes.is_empty());
    assert_eq!(report.registry.len(), 7);
    assert_eq!(report.jurisdictions.len(), 3);
}

#[test]
fn empty_jurisdiction_gets_zero_unit_economics() {
    let mut input = demo_input();
    input.waterbodies.retain(|w| w.id != "md_choptank_river");
    input.feeds.clear();

    let report = engine().run(&input);
    let talbot = report.jurisdiction("talbot_county").unwrap();

    assert!(talbot.waterbodies.is_empty());
    assert_eq!(talbot.priority_waterbody, None);
    assert_eq!(talbot.cost.engine.units, 0.0);
    assert!(talbot.cost.savings > 0.0);
}
