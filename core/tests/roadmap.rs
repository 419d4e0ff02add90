//! RoadmapGenerator tests: phase partition, triggers, decision table.

use chrono::NaiveDate;
use watershed_core::{
    config::{RoadmapConfig, ScoringConfig, SizingConfig},
    deployment_sizer::{size, DeploymentSize},
    parameters::ParameterReadings,
    roadmap_generator::{
        generate, partition, JustificationFact, Mission, PhaseRole, PhaseTrigger, Placement,
    },
    severity_scorer::{score, ImpairmentDriver, ScoringInput, SeverityAssessment, SeverityLabel},
};

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
}

fn assessment(causes: &[&str]) -> SeverityAssessment {
    assessment_with_turbidity(causes, 60.0)
}

/// DO 3.2, TN 2.4, Category 5, sampled 400 days ago.
fn assessment_with_turbidity(causes: &[&str], ntu: f64) -> SeverityAssessment {
    let readings = ParameterReadings {
        dissolved_oxygen: Some(3.2),
        turbidity: Some(ntu),
        total_nitrogen: Some(2.4),
        last_sampled: NaiveDate::from_ymd_opt(2024, 5, 26),
        ..Default::default()
    };
    let input = ScoringInput::new("md_back_river", readings, as_of())
        .with_category("5")
        .with_causes(causes);
    score(&input, &ScoringConfig::default())
}

fn sized(quads: u32) -> DeploymentSize {
    let config = SizingConfig {
        max_quads: 10,
        ..SizingConfig::default()
    };
    let mut d = size(SeverityLabel::Critical, None, &config);
    d.total_quads = quads;
    d.required_quads = quads;
    d.total_units = quads * config.units_per_quad;
    d.phased = quads >= config.phased_from_quads;
    d.first_phase_quads = if d.phased { 1 } else { quads };
    d
}

#[test]
fn phase_units_sum_to_total_for_every_size() {
    let roadmap = RoadmapConfig::default();
    let sizing = SizingConfig::default();
    let a = assessment(&["Nitrogen"]);

    for n in 1..=10u32 {
        let d = sized(n);
        let plan = generate(&d, &a, &roadmap, &sizing);
        assert_eq!(plan.phase_units(), n * 4, "N={n}: phase units must sum to N x 4");
        assert!(
            plan.phases.len() as u32 <= n.min(3),
            "N={n}: {} phases exceeds min(N, 3)",
            plan.phases.len()
        );
        assert_eq!(plan.phases[0].quads, 1, "N={n}: phase 1 is the first-phase subset");
    }
}

#[test]
fn remaining_quads_split_evenly_with_last_absorbing_remainder() {
    let roadmap = RoadmapConfig::default();

    assert_eq!(partition(&sized(1), &roadmap), vec![1]);
    assert_eq!(partition(&sized(2), &roadmap), vec![1, 1]);
    assert_eq!(partition(&sized(3), &roadmap), vec![1, 1, 1]);
    assert_eq!(partition(&sized(5), &roadmap), vec![1, 2, 2]);
    assert_eq!(partition(&sized(6), &roadmap), vec![1, 2, 3]);
}

#[test]
fn example_scenario_yields_three_phases_of_twelve_units() {
    let a = assessment(&["Nitrogen (Total)"]);
    let d = size(a.label, None, &SizingConfig::default());

    let plan = generate(&d, &a, &RoadmapConfig::default(), &SizingConfig::default());

    assert_eq!(plan.total_units, 12);
    assert_eq!(plan.phases.len(), 3);
    assert_eq!(plan.phase_units(), 12);
    assert_eq!(plan.phases[0].trigger, PhaseTrigger::Immediate);
    assert_eq!(
        plan.phases[1].trigger,
        PhaseTrigger::AfterPhaseData { phase: 1, days: 90 }
    );
    assert_eq!(plan.phases[2].trigger, PhaseTrigger::AfterDays { days: 180 });
    assert_eq!(plan.phases[0].annual_cost, 72_000.0);
    assert_eq!(plan.phases[0].capacity_gpm, 200.0);
}

#[test]
fn single_driver_leads_then_extends_then_verifies() {
    let a = assessment_with_turbidity(&["Nitrogen (Total)"], 10.0);
    assert_eq!(a.drivers, vec![ImpairmentDriver::Nutrients]);
    let plan = generate(&sized(3), &a, &RoadmapConfig::default(), &SizingConfig::default());

    let codes: Vec<(PhaseRole, Mission, Placement)> = plan
        .phases
        .iter()
        .map(|p| (p.role, p.mission, p.placement))
        .collect();
    assert_eq!(
        codes,
        vec![
            (PhaseRole::Lead, Mission::InterceptNutrients, Placement::HighestNutrientOutfall),
            (PhaseRole::Extend, Mission::ExtendCoverage, Placement::UpstreamTributaries),
            (PhaseRole::Verify, Mission::VerifyReductions, Placement::DownstreamReceivingWater),
        ]
    );
}

#[test]
fn each_driver_gets_its_own_lead_phase() {
    let a = assessment(&["Enterococcus", "Nitrogen", "Sedimentation/Siltation"]);
    let plan = generate(&sized(3), &a, &RoadmapConfig::default(), &SizingConfig::default());

    let drivers: Vec<_> = plan.phases.iter().map(|p| p.driver).collect();
    assert_eq!(
        drivers,
        vec![
            Some(ImpairmentDriver::Nutrients),
            Some(ImpairmentDriver::Bacteria),
            Some(ImpairmentDriver::Sediment)
        ]
    );
    assert!(plan.phases.iter().all(|p| p.role == PhaseRole::Lead));
    assert_eq!(plan.phases[1].mission, Mission::InterceptBacteria);
    assert_eq!(plan.phases[2].mission, Mission::CaptureSediment);
}

#[test]
fn phase_one_justification_cites_actual_inputs() {
    let a = assessment(&["Nitrogen (Total)"]);
    let plan = generate(&sized(3), &a, &RoadmapConfig::default(), &SizingConfig::default());
    let facts = &plan.phases[0].justification;

    assert_eq!(
        a.drivers,
        vec![ImpairmentDriver::Nutrients, ImpairmentDriver::Sediment],
        "Turbidity over the screening level adds the sediment driver"
    );
    assert!(facts.contains(&JustificationFact::Score {
        score: 92.5,
        label: SeverityLabel::Critical
    }));
    assert!(facts.contains(&JustificationFact::Category {
        code: "5".into(),
        no_tmdl: true
    }));
    assert!(facts.contains(&JustificationFact::DataAge { days: Some(400) }));

    let text = plan.phases[0].justification_text();
    assert!(text.contains("DO 3.2 mg/L"), "Missing DO reading in: {text}");
    assert!(text.contains("TN 2.4 mg/L"), "Missing TN reading in: {text}");
    assert!(text.contains("Category 5, no TMDL in place"));
}

#[test]
fn healthy_size_produces_no_phases() {
    let a = assessment(&[]);
    let d = size(SeverityLabel::Healthy, None, &SizingConfig::default());

    let plan = generate(&d, &a, &RoadmapConfig::default(), &SizingConfig::default());

    assert!(plan.phases.is_empty());
    assert_eq!(plan.total_units, 0);
}
