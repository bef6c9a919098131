//! Parameter store abstraction and the in-memory backend.
//!
//! `ParamStore` is the seam the snapshotter is written against. `MemoryStore`
//! keeps leaves keyed by canonical name with dirty tracking, assembles
//! namespaces into nested mappings on read, and renders them to YAML on dump.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use super::path::ParamPath;
use crate::error::StoreError;

/// Alias for stored values — `serde_json::Value` carries every scalar type
/// the parameter server hands out, plus nested mappings.
pub type StoreValue = Value;


/// Get/set/dump access to a hierarchical parameter store.
pub trait ParamStore {
    /// Read the value at `key`. An absent key is `StoreError::NotSet`.
    fn get(&self, key: &ParamPath) -> Result<StoreValue, StoreError>;

    /// Write `value` at `key`, creating it if absent.
    fn set(&mut self, key: &ParamPath, value: StoreValue) -> Result<(), StoreError>;

    /// Serialize every parameter under `namespace` to `file` as YAML.
    fn dump(&self, namespace: &ParamPath, file: &Path) -> Result<(), StoreError>;
}


/// In-memory parameter store keyed by canonical name.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    /// Leaf values. Mappings are flattened on write.
    data: BTreeMap<ParamPath, StoreValue>,
    /// Names written since the last `clear_dirty`.
    dirty: BTreeSet<ParamPath>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store from a YAML document, like `rosparam load <file> <ns>`.
    ///
    /// A mapping document is flattened beneath `namespace`. A scalar document
    /// is stored at `namespace` itself, which therefore cannot be the root.
    /// Loading does not mark anything dirty.
    pub fn load_yaml(&mut self, namespace: &ParamPath, text: &str) -> Result<usize, StoreError> {
        let doc = value_from_yaml(text).map_err(|reason| StoreError::Backend {
            key: namespace.to_string(),
            reason,
        })?;
        if doc.is_null() {
            return Ok(0);
        }
        if !doc.is_object() && namespace.is_root() {
            return Err(StoreError::Backend {
                key: namespace.to_string(),
                reason: "a document loaded at the root must be a mapping".into(),
            });
        }
        let mut leaves = Vec::new();
        flatten(namespace, doc, &mut leaves)?;
        let count = leaves.len();
        for (key, value) in leaves {
            self.insert_leaf(key, value);
        }
        debug!(namespace = %namespace, count, "loaded parameters");
        Ok(count)
    }

    /// All leaf names at or below `namespace`, in sorted order.
    pub fn keys_under(&self, namespace: &ParamPath) -> Vec<ParamPath> {
        self.data
            .keys()
            .filter(|k| k.starts_with(namespace))
            .cloned()
            .collect()
    }

    /// Remove a leaf. Returns the old value if one was present.
    pub fn remove(&mut self, key: &ParamPath) -> Option<StoreValue> {
        let removed = self.data.remove(key);
        if removed.is_some() {
            self.dirty.insert(key.clone());
        }
        removed
    }

    /// Names written since the last `clear_dirty`.
    pub fn dirty_paths(&self) -> &BTreeSet<ParamPath> {
        &self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    /// Number of leaf entries.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Assemble everything under `namespace` into one value.
    ///
    /// Returns `None` when nothing lives there.
    pub fn subtree(&self, namespace: &ParamPath) -> Option<StoreValue> {
        if let Some(v) = self.data.get(namespace) {
            return Some(v.clone());
        }
        let mut root = Map::new();
        let mut found = false;
        for (key, value) in self.data.range(namespace.clone()..) {
            let Some(rel) = key.relative_to(namespace) else {
                break;
            };
            insert_nested(&mut root, rel, value.clone());
            found = true;
        }
        found.then_some(Value::Object(root))
    }

    // -------------------------------------------------------------------
    // Internal
    // -------------------------------------------------------------------

    /// Store a leaf, evicting anything it shadows: leaves beneath it, and
    /// any ancestor that was itself a leaf.
    fn insert_leaf(&mut self, key: ParamPath, value: StoreValue) {
        let shadowed: Vec<ParamPath> = self
            .data
            .keys()
            .filter(|k| *k != &key && (k.starts_with(&key) || key.starts_with(k)))
            .cloned()
            .collect();
        for k in shadowed {
            self.data.remove(&k);
        }
        self.data.insert(key, value);
    }
}

impl ParamStore for MemoryStore {
    fn get(&self, key: &ParamPath) -> Result<StoreValue, StoreError> {
        let value = self.subtree(key).ok_or_else(|| StoreError::NotSet {
            key: key.to_string(),
        })?;
        debug!(key = %key, "get");
        Ok(value)
    }

    fn set(&mut self, key: &ParamPath, value: StoreValue) -> Result<(), StoreError> {
        if key.is_root() {
            return Err(StoreError::Backend {
                key: key.to_string(),
                reason: "cannot set the root namespace".into(),
            });
        }
        let mut leaves = Vec::new();
        flatten(key, value, &mut leaves)?;
        // Clear the old subtree so a mapping write replaces rather than merges.
        for old in self.keys_under(key) {
            self.data.remove(&old);
            self.dirty.insert(old);
        }
        for (leaf, v) in leaves {
            debug!(key = %leaf, value = %v, "set");
            self.dirty.insert(leaf.clone());
            self.insert_leaf(leaf, v);
        }
        Ok(())
    }

    fn dump(&self, namespace: &ParamPath, file: &Path) -> Result<(), StoreError> {
        let value = self
            .subtree(namespace)
            .unwrap_or_else(|| Value::Object(Map::new()));
        let text = serde_yaml::to_string(&value).map_err(|e| StoreError::Dump {
            file: file.to_path_buf(),
            reason: e.to_string(),
        })?;
        std::fs::write(file, text).map_err(|e| StoreError::Dump {
            file: file.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!(namespace = %namespace, file = %file.display(), "dumped namespace");
        Ok(())
    }
}


// ---------------------------------------------------------------------------
// YAML decoding
// ---------------------------------------------------------------------------

/// Parse a YAML document into a `StoreValue`.
///
/// `.inf`, `-.inf` and `.nan` have no `serde_json` form and would otherwise
/// decode to `null`, so they are rejected.
pub(crate) fn value_from_yaml(text: &str) -> Result<StoreValue, String> {
    let doc: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| format!("cannot parse YAML: {}", e))?;
    if let Some(f) = find_non_finite(&doc) {
        return Err(format!("non-finite number {} cannot be stored", f));
    }
    serde_yaml::from_value(doc).map_err(|e| format!("unsupported YAML value: {}", e))
}

fn find_non_finite(value: &serde_yaml::Value) -> Option<f64> {
    match value {
        serde_yaml::Value::Number(n) => n.as_f64().filter(|f| !f.is_finite()),
        serde_yaml::Value::Sequence(items) => items.iter().find_map(find_non_finite),
        serde_yaml::Value::Mapping(map) => map.values().find_map(find_non_finite),
        serde_yaml::Value::Tagged(tagged) => find_non_finite(&tagged.value),
        _ => None,
    }
}


// ---------------------------------------------------------------------------
// Internal: mapping <-> leaf conversion
// ---------------------------------------------------------------------------

/// Flatten `value` into `(name, leaf)` pairs rooted at `base`. Empty
/// mappings are kept as leaves so they survive a dump.
fn flatten(
    base: &ParamPath,
    value: Value,
    out: &mut Vec<(ParamPath, Value)>,
) -> Result<(), StoreError> {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (k, v) in map {
                let child = base.join(&k)?;
                flatten(&child, v, out)?;
            }
            Ok(())
        }
        other => {
            out.push((base.clone(), other));
            Ok(())
        }
    }
}

fn insert_nested(root: &mut Map<String, Value>, rel: &[String], value: Value) {
    match rel {
        [] => {}
        [last] => {
            root.insert(last.clone(), value);
        }
        [first, rest @ ..] => {
            let entry = root
                .entry(first.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                insert_nested(child, rest, value);
            }
        }
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn p(s: &str) -> ParamPath {
        ParamPath::parse(s).unwrap()
    }

    #[test]
    fn set_and_get_float() {
        let mut store = MemoryStore::new();
        store.set(&p("/point_cloud_filter/x_max"), json!(5.0)).unwrap();
        assert_eq!(store.get(&p("/point_cloud_filter/x_max")).unwrap(), json!(5.0));
    }

    #[test]
    fn set_and_get_preserves_integer() {
        let mut store = MemoryStore::new();
        store.set(&p("/point_cloud_filter/z_min"), json!(0)).unwrap();
        let v = store.get(&p("/point_cloud_filter/z_min")).unwrap();
        assert!(v.is_i64() || v.is_u64());
        assert_eq!(v, json!(0));
    }

    #[test]
    fn get_nonexistent_is_not_set() {
        let store = MemoryStore::new();
        match store.get(&p("/point_cloud_filter/x_max")) {
            Err(StoreError::NotSet { key }) => assert_eq!(key, "/point_cloud_filter/x_max"),
            other => panic!("expected NotSet, got {:?}", other),
        }
    }

    #[test]
    fn get_namespace_assembles_mapping() {
        let mut store = MemoryStore::new();
        store.set(&p("/pcl_filters/psx/filter_limit_max"), json!(5.0)).unwrap();
        store.set(&p("/pcl_filters/psx/filter_limit_min"), json!(-5.0)).unwrap();
        store.set(&p("/pcl_filters/psy/filter_limit_max"), json!(3.0)).unwrap();
        let v = store.get(&p("/pcl_filters")).unwrap();
        assert_eq!(
            v,
            json!({
                "psx": {"filter_limit_max": 5.0, "filter_limit_min": -5.0},
                "psy": {"filter_limit_max": 3.0}
            })
        );
    }

    #[test]
    fn namespace_lookup_ignores_sibling_prefix() {
        let mut store = MemoryStore::new();
        store.set(&p("/pcl_filters_old/psx"), json!(1)).unwrap();
        assert!(store.get(&p("/pcl_filters")).is_err());
    }

    #[test]
    fn set_mapping_flattens_and_replaces() {
        let mut store = MemoryStore::new();
        store.set(&p("/pcl_filters/psz/stale"), json!(true)).unwrap();
        store
            .set(&p("/pcl_filters/psz"), json!({"filter_limit_max": 2.0, "filter_limit_min": 0.0}))
            .unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.get(&p("/pcl_filters/psz/stale")).is_err());
        assert_eq!(store.get(&p("/pcl_filters/psz/filter_limit_min")).unwrap(), json!(0.0));
    }

    #[test]
    fn set_leaf_over_namespace_drops_children() {
        let mut store = MemoryStore::new();
        store.set(&p("/a/b/c"), json!(1)).unwrap();
        store.set(&p("/a/b"), json!("flat")).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&p("/a/b")).unwrap(), json!("flat"));
    }

    #[test]
    fn set_child_under_leaf_drops_leaf() {
        let mut store = MemoryStore::new();
        store.set(&p("/a/b"), json!("flat")).unwrap();
        store.set(&p("/a/b/c"), json!(1)).unwrap();
        assert_eq!(store.get(&p("/a/b")).unwrap(), json!({"c": 1}));
    }

    #[test]
    fn set_root_fails() {
        let mut store = MemoryStore::new();
        assert!(store.set(&ParamPath::root(), json!(1)).is_err());
    }

    #[test]
    fn set_marks_dirty() {
        let mut store = MemoryStore::new();
        assert!(store.dirty_paths().is_empty());
        store.set(&p("/pcl_filters/psx/filter_limit_max"), json!(5.0)).unwrap();
        assert!(store.dirty_paths().contains(&p("/pcl_filters/psx/filter_limit_max")));
        store.clear_dirty();
        assert!(store.dirty_paths().is_empty());
    }

    #[test]
    fn remove_marks_dirty_only_when_present() {
        let mut store = MemoryStore::new();
        assert!(store.remove(&p("/nope")).is_none());
        assert!(store.dirty_paths().is_empty());

        store.set(&p("/x"), json!(1)).unwrap();
        store.clear_dirty();
        assert_eq!(store.remove(&p("/x")), Some(json!(1)));
        assert!(store.dirty_paths().contains(&p("/x")));
        assert!(store.is_empty());
    }

    #[test]
    fn load_yaml_flattens_nested_mapping() {
        let mut store = MemoryStore::new();
        let yaml = "point_cloud_filter:\n  x_max: 5.0\n  x_min: -5.0\n  params_path: /tmp/run1\n";
        let n = store.load_yaml(&ParamPath::root(), yaml).unwrap();
        assert_eq!(n, 3);
        assert!(store.dirty_paths().is_empty());
        assert_eq!(store.get(&p("/point_cloud_filter/x_min")).unwrap(), json!(-5.0));
        assert_eq!(
            store.get(&p("/point_cloud_filter/params_path")).unwrap(),
            json!("/tmp/run1")
        );
    }

    #[test]
    fn load_yaml_under_namespace() {
        let mut store = MemoryStore::new();
        store
            .load_yaml(&p("/point_cloud_filter"), "y_max: 3.0\ny_min: -3.0\n")
            .unwrap();
        assert_eq!(
            store.keys_under(&p("/point_cloud_filter")),
            vec![p("/point_cloud_filter/y_max"), p("/point_cloud_filter/y_min")]
        );
    }

    #[test]
    fn load_yaml_scalar_at_root_fails() {
        let mut store = MemoryStore::new();
        assert!(store.load_yaml(&ParamPath::root(), "5.0").is_err());
        assert!(store.load_yaml(&p("/x"), "5.0").is_ok());
    }

    #[test]
    fn load_yaml_rejects_bad_key() {
        let mut store = MemoryStore::new();
        let err = store.load_yaml(&ParamPath::root(), "bad-key: 1\n").unwrap_err();
        assert!(matches!(err, StoreError::InvalidName(_)));
    }

    #[test]
    fn load_yaml_rejects_non_finite_bounds() {
        for doc in ["x_max: .inf\n", "x_min: -.inf\n", "z_max: .nan\n", "box: [1.0, .inf]\n"] {
            let mut store = MemoryStore::new();
            match store.load_yaml(&p("/point_cloud_filter"), doc) {
                Err(StoreError::Backend { reason, .. }) => {
                    assert!(reason.contains("non-finite"), "{}", reason)
                }
                other => panic!("expected Backend for {:?}, got {:?}", doc, other),
            }
            assert!(store.is_empty());
        }
    }

    #[test]
    fn load_yaml_rejects_garbage() {
        let mut store = MemoryStore::new();
        assert!(store.load_yaml(&ParamPath::root(), "a: [unclosed").is_err());
    }

    #[test]
    fn dump_writes_nested_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("out.yaml");
        let mut store = MemoryStore::new();
        store.set(&p("/pcl_filters/psx/filter_limit_max"), json!(5.0)).unwrap();
        store.set(&p("/pcl_filters/psx/filter_limit_min"), json!(-5.0)).unwrap();
        store.set(&p("/other/key"), json!(1)).unwrap();

        store.dump(&p("/pcl_filters"), &file).unwrap();

        let text = std::fs::read_to_string(&file).unwrap();
        let back: Value = serde_yaml::from_str(&text).unwrap();
        assert_eq!(
            back,
            json!({"psx": {"filter_limit_max": 5.0, "filter_limit_min": -5.0}})
        );
        assert!(!text.contains("other"));
    }

    #[test]
    fn dump_empty_namespace_writes_empty_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("out.yaml");
        MemoryStore::new().dump(&p("/pcl_filters"), &file).unwrap();
        let back: Value = serde_yaml::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(back, json!({}));
    }

    #[test]
    fn dump_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("params").join("pcl_params.yaml");
        let err = MemoryStore::new().dump(&p("/pcl_filters"), &file).unwrap_err();
        match err {
            StoreError::Dump { file: f, .. } => assert_eq!(f, file),
            other => panic!("expected Dump, got {:?}", other),
        }
        assert!(!file.exists());
    }
}
