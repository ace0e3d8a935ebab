#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Dataset assembly for AIS maps.
//!
//! Joins selected reports with the static attributes of their vessels,
//! collapses rare declared types into "Other" for charts, and applies the
//! display filters (type filter, per-vessel sampling, point cap).

pub mod assemble;
pub mod filters;

use serde::{Deserialize, Serialize};

pub use assemble::{AssembleMode, Dataset, assemble, assemble_from_store, build_attributes};
pub use filters::{CappedRows, cap_points, category_labels, filter_by_type, sample_per_vessel};

/// Default share of vessels below which a declared type becomes "Other".
pub const DEFAULT_RARE_TYPE_THRESHOLD: f64 = 0.02;

/// Default maximum number of displayed rows.
pub const DEFAULT_MAX_POINTS: usize = 1000;

/// Seed of per-vessel sampling.
pub const DEFAULT_SAMPLE_SEED: u64 = 42;

/// Seed of the point cap.
pub const DEFAULT_CAP_SEED: u64 = 5;

/// Assembly and display filter settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Types held by a smaller share of vessels are charted as "Other".
    pub rare_type_threshold: f64,
    /// Maximum number of displayed rows.
    pub max_points: usize,
    /// Seed of per-vessel sampling.
    pub sample_seed: u64,
    /// Seed of the point cap.
    pub cap_seed: u64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            rare_type_threshold: DEFAULT_RARE_TYPE_THRESHOLD,
            max_points: DEFAULT_MAX_POINTS,
            sample_seed: DEFAULT_SAMPLE_SEED,
            cap_seed: DEFAULT_CAP_SEED,
        }
    }
}
