//! Parameter names and the parameter store model.
//!
//! Provides slash-delimited name handling (e.g. `/pcl_filters/psx/filter_limit_max`),
//! the `ParamStore` trait that the snapshotter is written against, and an
//! in-memory store backed by `serde_json::Value`.

pub mod path;
pub mod store;

pub use path::ParamPath;
pub use store::{MemoryStore, ParamStore, StoreValue};
