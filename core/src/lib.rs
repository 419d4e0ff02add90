//! Watershed severity and deployment planning engine.
//!
//! Pipeline stages are flat modules, leaves first. `engine` wires them
//! together; `feed` and `store` are the only modules that touch the network
//! or disk, and only the runner calls them.

pub mod config;
pub mod error;
pub mod model;
pub mod names;
pub mod parameters;
pub mod types;

pub mod geo_assigner;
pub mod reconciler;
pub mod severity_scorer;
pub mod deployment_sizer;
pub mod roadmap_generator;
pub mod economics_calculator;

pub mod engine;
pub mod feed;
pub mod store;
