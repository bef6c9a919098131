//! `rosparam` command builder and the store backend that drives it.
//!
//! `RosparamCommand` builds argument vectors without executing them.
//! `RosparamStore` pairs a builder with a `CommandRunner` to implement
//! `ParamStore` against a live parameter server.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use super::runner::CommandRunner;
use crate::error::{RunError, StoreError};
use crate::namespace::store::value_from_yaml;
use crate::namespace::{ParamPath, ParamStore, StoreValue};

/// Marker `rosparam get` prints when a key is absent.
const NOT_SET_MARKER: &str = "is not set";

// ---------------------------------------------------------------------------
// Command builder
// ---------------------------------------------------------------------------

/// Builds `rosparam` argument vectors without executing them.
#[derive(Debug, Clone)]
pub struct RosparamCommand {
    program: String,
}

impl RosparamCommand {
    pub fn new(program: impl Into<String>) -> Self {
        RosparamCommand { program: program.into() }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// `rosparam get <key>`
    pub fn get(&self, key: &ParamPath) -> Vec<String> {
        vec![self.program.clone(), "get".into(), key.to_string()]
    }

    /// `rosparam set -- <key> <value>`
    ///
    /// `--` stops option parsing so negative numbers pass through intact.
    pub fn set(&self, key: &ParamPath, yaml_value: &str) -> Vec<String> {
        vec![
            self.program.clone(),
            "set".into(),
            "--".into(),
            key.to_string(),
            yaml_value.to_string(),
        ]
    }

    /// `rosparam dump <file> <namespace> -v`
    pub fn dump(&self, file: &Path, namespace: &ParamPath) -> Vec<String> {
        vec![
            self.program.clone(),
            "dump".into(),
            file.to_string_lossy().into_owned(),
            namespace.to_string(),
            "-v".into(),
        ]
    }
}

impl Default for RosparamCommand {
    fn default() -> Self {
        RosparamCommand::new("rosparam")
    }
}

// ---------------------------------------------------------------------------
// Store backend
// ---------------------------------------------------------------------------

/// `ParamStore` backed by the `rosparam` command-line tool.
pub struct RosparamStore<R: CommandRunner> {
    runner: R,
    command: RosparamCommand,
}

impl<R: CommandRunner> RosparamStore<R> {
    pub fn new(runner: R, command: RosparamCommand) -> Self {
        RosparamStore { runner, command }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }
}

impl<R: CommandRunner> ParamStore for RosparamStore<R> {
    fn get(&self, key: &ParamPath) -> Result<StoreValue, StoreError> {
        let stdout = self
            .runner
            .run(&self.command.get(key))
            .map_err(|e| classify_get_error(key, e))?;
        let value = parse_value(&stdout).map_err(|reason| StoreError::Backend {
            key: key.to_string(),
            reason,
        })?;
        debug!(key = %key, value = %value, "get");
        Ok(value)
    }

    fn set(&mut self, key: &ParamPath, value: StoreValue) -> Result<(), StoreError> {
        let rendered = render_value(&value).map_err(|reason| StoreError::Backend {
            key: key.to_string(),
            reason,
        })?;
        self.runner
            .run(&self.command.set(key, &rendered))
            .map_err(|e| StoreError::Backend {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        debug!(key = %key, value = %rendered, "set");
        Ok(())
    }

    fn dump(&self, namespace: &ParamPath, file: &Path) -> Result<(), StoreError> {
        // Clear any earlier snapshot so a clean exit that writes nothing is caught.
        match std::fs::remove_file(file) {
            Ok(()) => debug!(file = %file.display(), "removed previous dump"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StoreError::Dump {
                    file: file.to_path_buf(),
                    reason: format!("cannot replace previous dump: {}", e),
                })
            }
        }
        let verbose = self
            .runner
            .run(&self.command.dump(file, namespace))
            .map_err(|e| StoreError::Dump {
                file: file.to_path_buf(),
                reason: e.to_string(),
            })?;
        if !file.exists() {
            warn!(file = %file.display(), "dump tool exited cleanly without writing its output");
            return Err(StoreError::Dump {
                file: file.to_path_buf(),
                reason: format!(
                    "{} reported success but wrote no file",
                    self.command.program()
                ),
            });
        }
        debug!(namespace = %namespace, output = %verbose.trim(), "dumped namespace");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Internal: value encoding
// ---------------------------------------------------------------------------

fn classify_get_error(key: &ParamPath, err: RunError) -> StoreError {
    match err {
        RunError::Exit { ref stderr, .. } if stderr.contains(NOT_SET_MARKER) => {
            StoreError::NotSet { key: key.to_string() }
        }
        other => StoreError::Backend {
            key: key.to_string(),
            reason: other.to_string(),
        },
    }
}

/// `rosparam get` prints the value as a YAML document.
fn parse_value(stdout: &str) -> Result<StoreValue, String> {
    value_from_yaml(stdout)
}

/// Render a value as YAML text for `rosparam set`, so the tool parses it
/// back to the same type.
///
/// `rosparam` reads YAML 1.1, where `1e20` is a string: floats are written
/// with a decimal point and a signed exponent, and collections in flow style
/// so nested floats get the same treatment.
fn render_value(value: &StoreValue) -> Result<String, String> {
    match value {
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) => Ok(yaml11_float(f)),
            None => Err(format!("unrepresentable number {}", n)),
        },
        Value::Array(_) | Value::Object(_) => render_flow(value),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .map_err(|e| e.to_string()),
    }
}

fn render_flow(value: &StoreValue) -> Result<String, String> {
    match value {
        Value::Array(items) => {
            let parts = items.iter().map(render_flow).collect::<Result<Vec<_>, _>>()?;
            Ok(format!("[{}]", parts.join(", ")))
        }
        Value::Object(map) => {
            let mut parts = Vec::with_capacity(map.len());
            for (k, v) in map {
                let key = serde_json::to_string(k).map_err(|e| e.to_string())?;
                parts.push(format!("{}: {}", key, render_flow(v)?));
            }
            Ok(format!("{{{}}}", parts.join(", ")))
        }
        // JSON strings are valid YAML double-quoted scalars and never span lines.
        Value::String(s) => serde_json::to_string(s).map_err(|e| e.to_string()),
        other => render_value(other),
    }
}

/// Shortest round-tripping text for `f` that YAML 1.1 still reads as a float.
fn yaml11_float(f: f64) -> String {
    let text = format!("{:?}", f);
    let Some((mantissa, exponent)) = text.split_once('e') else {
        return text;
    };
    let mantissa = if mantissa.contains('.') {
        mantissa.to_string()
    } else {
        format!("{}.0", mantissa)
    };
    let exponent = if exponent.starts_with('-') {
        exponent.to_string()
    } else {
        format!("+{}", exponent)
    };
    format!("{}e{}", mantissa, exponent)
}
