//! GeoAssigner tests: primary membership, nearest center, shore constraint.

use watershed_core::{
    config::RegionConfig,
    geo_assigner::{self, classify_shore, CoordinateResolver, ShoreSide},
    model::{Coordinate, CoordinateSource, Jurisdiction, JurisdictionTier, PermitPhase, Waterbody},
};

fn jurisdiction(id: &str, lat: f64, lon: f64, primary: &[&str]) -> Jurisdiction {
    Jurisdiction {
        id: id.to_string(),
        name: id.to_string(),
        permit_id: format!("PERMIT-{id}"),
        phase: PermitPhase::PhaseII,
        primary_waterbodies: primary.iter().map(|s| s.to_string()).collect(),
        center: Coordinate::new(lat, lon),
        zoom: None,
        state_prefix: "MD".to_string(),
        shore_neutral: false,
        tier: JurisdictionTier::Medium,
    }
}

fn shores() -> Vec<watershed_core::config::ShoreBoundary> {
    RegionConfig::default().shore_boundaries
}

#[test]
fn primary_waterbodies_assigned_regardless_of_coordinate() {
    let jurisdictions = vec![
        jurisdiction("west", 39.30, -76.60, &["md_far_away", "md_no_coord"]),
        jurisdiction("east", 38.80, -76.10, &[]),
    ];
    let waterbodies = vec![
        // Much closer to "east", and on the east shore.
        Waterbody::new("md_far_away", "Far Away Creek", "MD").with_coordinate(38.79, -76.09),
        Waterbody::new("md_no_coord", "No Coord Run", "MD"),
    ];

    let assignment = geo_assigner::assign(&jurisdictions, &waterbodies, &shores());

    assert!(assignment.is_assigned_to("west", "md_far_away"));
    assert!(assignment.is_assigned_to("west", "md_no_coord"));
    assert!(
        !assignment.is_assigned_to("east", "md_far_away"),
        "Primary waterbody must never be reassigned by distance"
    );
    assert!(assignment.unassigned.is_empty());
}

#[test]
fn non_primary_goes_to_nearest_center() {
    let jurisdictions = vec![
        jurisdiction("north", 39.40, -76.60, &[]),
        jurisdiction("south", 38.98, -76.56, &[]),
    ];
    let waterbodies = vec![
        Waterbody::new("md_a", "A Creek", "MD").with_coordinate(39.35, -76.58),
        Waterbody::new("md_b", "B Creek", "MD").with_coordinate(39.00, -76.50),
    ];

    let assignment = geo_assigner::assign(&jurisdictions, &waterbodies, &shores());

    assert_eq!(assignment.waterbodies_for("north"), ["md_a".to_string()]);
    assert_eq!(assignment.waterbodies_for("south"), ["md_b".to_string()]);
}

#[test]
fn opposite_shore_is_never_nearest_assigned() {
    // West-shore jurisdiction is nearer, but the waterbody sits east of the bay.
    let jurisdictions = vec![
        jurisdiction("west_near", 38.90, -76.45, &[]),
        jurisdiction("east_far", 38.70, -75.90, &[]),
    ];
    let waterbodies =
        vec![Waterbody::new("md_east", "Eastern Creek", "MD").with_coordinate(38.90, -76.30)];

    let assignment = geo_assigner::assign(&jurisdictions, &waterbodies, &shores());

    assert!(
        assignment.is_assigned_to("east_far", "md_east"),
        "East-shore waterbody must go to the east-shore jurisdiction"
    );
    assert!(!assignment.is_assigned_to("west_near", "md_east"));
}

#[test]
fn shore_neutral_jurisdiction_can_claim_either_shore() {
    let mut neutral = jurisdiction("state_roads", 38.90, -76.45, &[]);
    neutral.shore_neutral = true;
    let jurisdictions = vec![neutral, jurisdiction("east_far", 38.70, -75.90, &[])];
    let waterbodies =
        vec![Waterbody::new("md_east", "Eastern Creek", "MD").with_coordinate(38.90, -76.30)];

    let assignment = geo_assigner::assign(&jurisdictions, &waterbodies, &shores());

    assert!(assignment.is_assigned_to("state_roads", "md_east"));
}

#[test]
fn no_coordinate_or_no_eligible_jurisdiction_stays_unassigned() {
    let jurisdictions = vec![jurisdiction("west", 39.30, -76.60, &[])];
    let other_state = Waterbody::new("va_creek", "Some Creek", "VA").with_coordinate(39.30, -76.60);
    let waterbodies = vec![
        Waterbody::new("md_lost", "Lost Run", "MD"),
        Waterbody::new("md_east", "Eastern Creek", "MD").with_coordinate(38.90, -76.30),
        other_state,
    ];

    let assignment = geo_assigner::assign(&jurisdictions, &waterbodies, &shores());

    assert_eq!(
        assignment.unassigned,
        vec!["md_lost".to_string(), "md_east".to_string(), "va_creek".to_string()]
    );
    assert!(assignment.waterbodies_for("west").is_empty());
}

#[test]
fn distance_tie_goes_to_first_listed_jurisdiction() {
    // Centers mirrored north/south of the waterbody.
    let jurisdictions = vec![
        jurisdiction("first", 39.5, -76.60, &[]),
        jurisdiction("second", 38.5, -76.60, &[]),
    ];
    let waterbodies = vec![Waterbody::new("md_mid", "Mid Creek", "MD").with_coordinate(39.00, -76.60)];

    for _ in 0..3 {
        let assignment = geo_assigner::assign(&jurisdictions, &waterbodies, &shores());
        assert!(assignment.is_assigned_to("first", "md_mid"));
    }
}

#[test]
fn shore_classification_uses_centerline() {
    let boundaries = shores();
    let west = classify_shore(&Coordinate::new(39.0, -76.50), &boundaries).unwrap();
    let east = classify_shore(&Coordinate::new(39.0, -76.20), &boundaries).unwrap();
    assert_eq!(west.side, ShoreSide::West);
    assert_eq!(east.side, ShoreSide::East);
    assert!(classify_shore(&Coordinate::new(42.0, -76.50), &boundaries).is_none());
}

#[test]
fn coordinate_resolution_follows_priority_chain() {
    let mut regions = RegionConfig::default();
    regions
        .curated_coordinates
        .insert("md_both".into(), Coordinate::new(39.1, -76.5));
    regions
        .region_coordinates
        .insert("md_both".into(), Coordinate::new(38.0, -76.0));
    regions
        .region_coordinates
        .insert("md_region".into(), Coordinate::new(38.5, -76.4));
    regions.name_hints.push(watershed_core::config::NameHint {
        pattern: "choptank".into(),
        coordinate: Coordinate::new(38.66, -76.08),
    });
    let resolver = CoordinateResolver::new(&regions);

    let explicit = Waterbody::new("md_both", "Both", "MD").with_coordinate(39.9, -76.9);
    assert_eq!(
        resolver.resolve(&explicit),
        Some((Coordinate::new(39.9, -76.9), CoordinateSource::Feed))
    );
    assert_eq!(
        resolver.resolve(&Waterbody::new("md_both", "Both", "MD")),
        Some((Coordinate::new(39.1, -76.5), CoordinateSource::Curated))
    );
    assert_eq!(
        resolver.resolve(&Waterbody::new("md_region", "Region", "MD")),
        Some((Coordinate::new(38.5, -76.4), CoordinateSource::Region))
    );
    assert_eq!(
        resolver.resolve(&Waterbody::new("md_x", "Upper CHOPTANK River, tidal", "MD")),
        Some((Coordinate::new(38.66, -76.08), CoordinateSource::NameHint))
    );
    assert_eq!(resolver.resolve(&Waterbody::new("md_y", "Nowhere Run", "MD")), None);
}
