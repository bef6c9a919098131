//! Point cloud filter bounds snapshot.
//!
//! Copies the six volume-box limits from the point cloud filter namespace
//! into the filter chain namespace, then dumps the filter chain namespace to
//! a YAML file next to the rest of the run's parameters.

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod namespace;
pub mod snapshot;

pub use config::{SettingsError, SnapshotSettings};
pub use error::{NameError, RunError, SnapshotError, StoreError};
pub use snapshot::{ParamSnapshotter, SnapshotPlan, SnapshotReport};
