//! Snapshot settings.
//!
//! Defaults reproduce the stock volume-box layout. An optional YAML settings
//! file can override any field, and a couple of environment variables
//! override the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::namespace::ParamPath;

/// Names a YAML settings file to layer over the defaults.
pub const SETTINGS_ENV: &str = "PCL_SNAPSHOT_SETTINGS";
/// Overrides the `rosparam` program.
pub const ROSPARAM_ENV: &str = "PCL_SNAPSHOT_ROSPARAM";
/// Names a YAML parameter file to use instead of a live parameter server.
pub const OFFLINE_PARAMS_ENV: &str = "PCL_SNAPSHOT_OFFLINE_PARAMS";


#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },
    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}


/// Where to copy from, where to copy to, and how to reach the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SnapshotSettings {
    /// Namespace holding the bounds and the output path.
    pub source_namespace: String,
    /// Namespace the filter chain reads its limits from.
    pub target_namespace: String,
    /// Name, relative to the source namespace, of the output directory parameter.
    pub path_param: String,
    /// Dump file, relative to the output directory.
    pub output_file: PathBuf,
    /// Program used to reach the parameter server.
    pub rosparam: String,
    /// Seed an in-memory store from this file instead of using `rosparam`.
    pub offline_params: Option<PathBuf>,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        SnapshotSettings {
            source_namespace: "/point_cloud_filter".into(),
            target_namespace: "/pcl_filters".into(),
            path_param: "params_path".into(),
            output_file: PathBuf::from("params").join("pcl_params.yaml"),
            rosparam: "rosparam".into(),
            offline_params: None,
        }
    }
}

impl SnapshotSettings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::load(|name| std::env::var(name).ok())
    }

    /// Layer defaults, the settings file, and variable overrides, reading
    /// variables through `lookup`.
    pub fn load<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = match lookup(SETTINGS_ENV).filter(|s| !s.is_empty()) {
            Some(file) => Self::from_yaml_file(Path::new(&file))?,
            None => Self::default(),
        };
        if let Some(prog) = lookup(ROSPARAM_ENV).filter(|s| !s.is_empty()) {
            settings.rosparam = prog;
        }
        if let Some(file) = lookup(OFFLINE_PARAMS_ENV).filter(|s| !s.is_empty()) {
            settings.offline_params = Some(PathBuf::from(file));
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Read a YAML settings file. Missing fields keep their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text).map_err(|reason| SettingsError::Parse {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, String> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| e.to_string())
    }

    /// Check that every name parses and the output file is usable.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.source_ns()?;
        self.target_ns()?;
        self.path_key()?;
        if self.output_file.as_os_str().is_empty() {
            return Err(SettingsError::Invalid {
                field: "output_file",
                reason: "must not be empty".into(),
            });
        }
        if self.output_file.is_absolute() {
            return Err(SettingsError::Invalid {
                field: "output_file",
                reason: "must be relative to the params_path directory".into(),
            });
        }
        if self.rosparam.trim().is_empty() {
            return Err(SettingsError::Invalid {
                field: "rosparam",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn source_ns(&self) -> Result<ParamPath, SettingsError> {
        ParamPath::parse(&self.source_namespace).map_err(|e| SettingsError::Invalid {
            field: "source_namespace",
            reason: e.reason,
        })
    }

    pub fn target_ns(&self) -> Result<ParamPath, SettingsError> {
        ParamPath::parse(&self.target_namespace).map_err(|e| SettingsError::Invalid {
            field: "target_namespace",
            reason: e.reason,
        })
    }

    /// Full name of the output-directory parameter.
    pub fn path_key(&self) -> Result<ParamPath, SettingsError> {
        self.source_ns()?
            .join(&self.path_param)
            .map_err(|e| SettingsError::Invalid {
                field: "path_param",
                reason: e.reason,
            })
    }
}
