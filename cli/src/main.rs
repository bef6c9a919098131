//! `store-volume` — snapshot the point cloud filter volume box.
//!
//! # Usage
//!
//! ```text
//! store-volume
//! RUST_LOG=debug store-volume
//! PCL_SNAPSHOT_OFFLINE_PARAMS=run1.yaml store-volume
//! ```
//!
//! Copies `/point_cloud_filter/{x,y,z}_{min,max}` into
//! `/pcl_filters/ps{x,y,z}/filter_limit_{min,max}` and dumps `/pcl_filters`
//! to `<params_path>/params/pcl_params.yaml`.

use std::io::{self, Write};
use std::path::Path;
use std::process;

use pcl_snapshot_core::infrastructure::{ProcessRunner, RosparamCommand, RosparamStore};
use pcl_snapshot_core::namespace::{MemoryStore, ParamPath, ParamStore};
use pcl_snapshot_core::{
    ParamSnapshotter, SnapshotError, SnapshotPlan, SnapshotReport, SnapshotSettings,
};
use tracing_subscriber::EnvFilter;

const SUCCESS_MESSAGE: &str = "Params successfully stored";
const PARAM_ERROR_MESSAGE: &str = "Error, could not get/set params";


fn main() {
    init_logging();

    let settings = match SnapshotSettings::from_env() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("store-volume: {}", e);
            process::exit(1);
        }
    };

    let plan = match SnapshotPlan::from_settings(&settings) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("store-volume: {}", e);
            process::exit(1);
        }
    };

    let result = match &settings.offline_params {
        Some(file) => match offline_store(file) {
            Ok(store) => snapshot(store, plan),
            Err(e) => {
                eprintln!("store-volume: {}", e);
                process::exit(1);
            }
        },
        None => {
            let command = RosparamCommand::new(settings.rosparam.clone());
            snapshot(RosparamStore::new(ProcessRunner, command), plan)
        }
    };

    match &result {
        Ok(report) => tracing::info!(file = %report.output_file.display(), "done"),
        Err(e) => tracing::error!(error = %e, "snapshot failed"),
    }
    if let Err(e) = report(&mut io::stdout().lock(), &result) {
        eprintln!("store-volume: cannot write status: {}", e);
        process::exit(1);
    }
    if result.is_err() {
        process::exit(1);
    }
}


/// Log to stderr so stdout carries only the status line. `RUST_LOG`
/// selects the level; default is `warn`.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}


fn snapshot<S: ParamStore>(store: S, plan: SnapshotPlan) -> Result<SnapshotReport, SnapshotError> {
    ParamSnapshotter::new(store, plan).run()
}


/// Seed an in-memory store from a YAML parameter file loaded at the root.
fn offline_store(file: &Path) -> Result<MemoryStore, String> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| format!("cannot read {}: {}", file.display(), e))?;
    let mut store = MemoryStore::new();
    store
        .load_yaml(&ParamPath::root(), &text)
        .map_err(|e| format!("cannot load {}: {}", file.display(), e))?;
    Ok(store)
}


/// Write the one-line outcome. Success and failure both go to `out`, which
/// is stdout in `main`; logging stays on stderr.
fn report<W: Write>(
    out: &mut W,
    result: &Result<SnapshotReport, SnapshotError>,
) -> io::Result<()> {
    match result {
        Ok(_) => writeln!(out, "{}", SUCCESS_MESSAGE),
        Err(e) => writeln!(out, "{}", failure_message(e)),
    }
}


/// Parameter failures all print the same line; the detail goes to the log.
fn failure_message(err: &SnapshotError) -> String {
    if err.is_param_error() {
        return PARAM_ERROR_MESSAGE.to_string();
    }
    match err {
        SnapshotError::DumpFailed { .. } => format!("Error, could not store params: {}", err),
        other => format!("Error: {}", other),
    }
}
