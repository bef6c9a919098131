//! Bounding-box snapshot: copy the point cloud filter limits into the
//! filter chain namespace and dump that namespace to disk.
//!
//! The sequence is strictly linear. All six bounds are read before any is
//! written, so a missing bound leaves the destination untouched. The output
//! path is read only after the writes, so a missing path leaves all six
//! writes applied and nothing dumped.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::config::SnapshotSettings;
use crate::error::SnapshotError;
use crate::namespace::{ParamPath, ParamStore, StoreValue};

/// Source bound name → destination name under the target namespace, in
/// read order.
pub const BOUND_MAPPING: [(&str, &str); 6] = [
    ("x_max", "psx/filter_limit_max"),
    ("x_min", "psx/filter_limit_min"),
    ("y_max", "psy/filter_limit_max"),
    ("y_min", "psy/filter_limit_min"),
    ("z_max", "psz/filter_limit_max"),
    ("z_min", "psz/filter_limit_min"),
];


/// One performed copy.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundCopy {
    pub source: ParamPath,
    pub destination: ParamPath,
    pub value: StoreValue,
}

/// Outcome of a full run.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotReport {
    pub copies: Vec<BoundCopy>,
    pub output_file: PathBuf,
}


/// Fully resolved names for one run.
#[derive(Debug, Clone)]
pub struct SnapshotPlan {
    pub source_ns: ParamPath,
    pub target_ns: ParamPath,
    pub path_key: ParamPath,
    pub output_file: PathBuf,
}

impl SnapshotPlan {
    pub fn from_settings(settings: &SnapshotSettings) -> Result<Self, SnapshotError> {
        Ok(SnapshotPlan {
            source_ns: ParamPath::parse(&settings.source_namespace)?,
            target_ns: ParamPath::parse(&settings.target_namespace)?,
            path_key: ParamPath::parse(&settings.source_namespace)?.join(&settings.path_param)?,
            output_file: settings.output_file.clone(),
        })
    }

    /// `(source, destination)` names for the six bounds, in read order.
    pub fn bound_pairs(&self) -> Result<Vec<(ParamPath, ParamPath)>, SnapshotError> {
        BOUND_MAPPING
            .iter()
            .map(|(src, dst)| Ok((self.source_ns.join(src)?, self.target_ns.join(dst)?)))
            .collect()
    }

    /// The dump file for a given output directory.
    pub fn dump_file(&self, params_path: &Path) -> PathBuf {
        params_path.join(&self.output_file)
    }
}

/// Runs the read-copy-dump sequence against a store.
pub struct ParamSnapshotter<S: ParamStore> {
    store: S,
    plan: SnapshotPlan,
}

impl<S: ParamStore> ParamSnapshotter<S> {
    pub fn new(store: S, plan: SnapshotPlan) -> Self {
        ParamSnapshotter { store, plan }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn plan(&self) -> &SnapshotPlan {
        &self.plan
    }

    /// Read all six bounds, then write each unchanged to its destination.
    pub fn copy_bounds(&mut self) -> Result<Vec<BoundCopy>, SnapshotError> {
        let pairs = self.plan.bound_pairs()?;

        let mut copies = Vec::with_capacity(pairs.len());
        for (source, destination) in pairs {
            let value = self.store.get(&source)?;
            copies.push(BoundCopy { source, destination, value });
        }

        for copy in &copies {
            self.store.set(&copy.destination, copy.value.clone())?;
        }
        info!(count = copies.len(), target = %self.plan.target_ns, "copied bounds");
        Ok(copies)
    }

    /// Read the output directory parameter.
    ///
    /// Numeric and boolean scalars are accepted via their text form. A
    /// leading `~` is expanded to the home directory; nothing else is, since
    /// no shell sees the path.
    pub fn read_output_path(&self) -> Result<PathBuf, SnapshotError> {
        let key = &self.plan.path_key;
        match self.store.get(key)? {
            Value::String(s) => Ok(expand_home(&s)),
            v @ (Value::Number(_) | Value::Bool(_)) => Ok(PathBuf::from(v.to_string())),
            other => Err(SnapshotError::ParamAccess {
                key: key.to_string(),
                reason: format!("expected a path, found {}", other),
            }),
        }
    }

    /// Dump the target namespace to `<params_path>/<output_file>`.
    pub fn dump_namespace(&self, params_path: &Path) -> Result<PathBuf, SnapshotError> {
        let file = self.plan.dump_file(params_path);
        self.store.dump(&self.plan.target_ns, &file)?;
        info!(namespace = %self.plan.target_ns, file = %file.display(), "stored params");
        Ok(file)
    }

    /// `copy_bounds`, then `read_output_path`, then `dump_namespace`.
    /// The first failure aborts the rest.
    pub fn run(&mut self) -> Result<SnapshotReport, SnapshotError> {
        let result = self.run_steps();
        if let Err(ref e) = result {
            warn!(error = %e, "snapshot aborted");
        }
        result
    }

    fn run_steps(&mut self) -> Result<SnapshotReport, SnapshotError> {
        let copies = self.copy_bounds()?;
        let params_path = self.read_output_path()?;
        let output_file = self.dump_namespace(&params_path)?;
        Ok(SnapshotReport { copies, output_file })
    }
}

/// Replace a leading `~` or `~/` with the home directory. `~user` forms and
/// paths without a home directory available are returned unchanged.
fn expand_home(raw: &str) -> PathBuf {
    let rest = match raw.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(raw),
    };
    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(raw),
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
