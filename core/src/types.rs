//! Shared primitive types used across the entire engine.

/// A waterbody identifier. Unique within a state.
pub type WaterbodyId = String;

/// A permit-holding jurisdiction identifier.
pub type JurisdictionId = String;

/// Two-letter state (or territory) code, e.g. "MD".
pub type StateCode = String;

/// The canonical planning-run identifier.
pub type RunId = String;
