//! Configuration module
//!
//! Immutable session configuration: target distances, serial parameters,
//! checkpoint cadence, and output location. Built once before a session and
//! never mutated afterwards.

mod settings;

pub use settings::{parse_distance_list, AcquisitionConfig, DEFAULT_DISTANCES};
