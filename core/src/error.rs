use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Name errors
// ---------------------------------------------------------------------------

/// A parameter name that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid parameter name '{name}': {reason}")]
pub struct NameError {
    pub name: String,
    pub reason: String,
}

impl NameError {
    pub fn new(name: &str, reason: impl Into<String>) -> Self {
        NameError {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    /// The key is absent from the store.
    #[error("parameter {key} is not set")]
    NotSet { key: String },
    /// The store could not be read or written for some other reason.
    #[error("parameter {key}: {reason}")]
    Backend { key: String, reason: String },
    /// Serializing a namespace to disk did not complete.
    #[error("dump to {} failed: {reason}", .file.display())]
    Dump { file: PathBuf, reason: String },
    #[error(transparent)]
    InvalidName(#[from] NameError),
}

// ---------------------------------------------------------------------------
// Runner errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    EmptyCommand,
    /// The program could not be started at all.
    Spawn { program: String, reason: String },
    /// The program ran and exited unsuccessfully. `code` is `None` when it
    /// was killed by a signal.
    Exit { code: Option<i32>, stderr: String },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::EmptyCommand => f.write_str("empty command"),
            RunError::Spawn { program, reason } => {
                write!(f, "failed to execute {}: {}", program, reason)
            }
            RunError::Exit { code: Some(c), stderr } => {
                write!(f, "exited with status {}: {}", c, stderr.trim())
            }
            RunError::Exit { code: None, stderr } => {
                write!(f, "exited with signal: {}", stderr.trim())
            }
        }
    }
}

impl std::error::Error for RunError {}

// ---------------------------------------------------------------------------
// Snapshot errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SnapshotError {
    /// One of the required source parameters is absent.
    #[error("missing parameter {key}")]
    MissingParameter { key: String },
    /// A read or write failed for a reason other than absence.
    #[error("cannot access parameter {key}: {reason}")]
    ParamAccess { key: String, reason: String },
    /// The destination namespace was not written to disk.
    #[error("dump to {} failed: {reason}", .file.display())]
    DumpFailed { file: PathBuf, reason: String },
    #[error(transparent)]
    InvalidName(#[from] NameError),
}

impl SnapshotError {
    /// True for failures that the command line reports as a generic
    /// get/set failure.
    pub fn is_param_error(&self) -> bool {
        matches!(
            self,
            SnapshotError::MissingParameter { .. } | SnapshotError::ParamAccess { .. }
        )
    }
}

impl From<StoreError> for SnapshotError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotSet { key } => SnapshotError::MissingParameter { key },
            StoreError::Backend { key, reason } => SnapshotError::ParamAccess { key, reason },
            StoreError::Dump { file, reason } => SnapshotError::DumpFailed { file, reason },
            StoreError::InvalidName(e) => SnapshotError::InvalidName(e),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_set_maps_to_missing_parameter() {
        let err: SnapshotError = StoreError::NotSet {
            key: "/point_cloud_filter/z_min".into(),
        }
        .into();
        assert!(matches!(
            err,
            SnapshotError::MissingParameter { ref key } if key == "/point_cloud_filter/z_min"
        ));
        assert!(err.is_param_error());
    }

    #[test]
    fn backend_maps_to_param_access() {
        let err: SnapshotError = StoreError::Backend {
            key: "/pcl_filters/psx/filter_limit_max".into(),
            reason: "master unreachable".into(),
        }
        .into();
        assert!(err.is_param_error());
        assert!(err.to_string().contains("master unreachable"));
    }

    #[test]
    fn dump_is_not_a_param_error() {
        let err: SnapshotError = StoreError::Dump {
            file: PathBuf::from("/tmp/x/params/pcl_params.yaml"),
            reason: "No such file or directory".into(),
        }
        .into();
        assert!(!err.is_param_error());
        assert_eq!(
            err.to_string(),
            "dump to /tmp/x/params/pcl_params.yaml failed: No such file or directory"
        );
    }

    #[test]
    fn run_error_display() {
        let err = RunError::Exit {
            code: Some(1),
            stderr: "ERROR: Parameter [/x] is not set\n".into(),
        };
        assert_eq!(
            err.to_string(),
            "exited with status 1: ERROR: Parameter [/x] is not set"
        );
        let killed = RunError::Exit { code: None, stderr: String::new() };
        assert!(killed.to_string().starts_with("exited with signal"));
    }

    #[test]
    fn name_error_display() {
        let err = NameError::new("pcl", "name must start with '/'");
        assert_eq!(
            err.to_string(),
            "invalid parameter name 'pcl': name must start with '/'"
        );
    }
}
