use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::GoldenStoreError;

/// One pretty-printed JSON file per endpoint id under `dir`.
/// Last writer wins; there is no locking or versioning.
pub struct GoldenStore {
    dir: PathBuf,
}

impl GoldenStore {
    /// The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        GoldenStore { dir: dir.into() }
    }

    pub fn path_for(&self, endpoint_id: &str) -> PathBuf {
        let file_stem: String = endpoint_id
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        self.dir.join(format!("{}.json", file_stem))
    }

    pub fn save(&self, endpoint_id: &str, body: &Value) -> Result<(), GoldenStoreError> {
        let path = self.path_for(endpoint_id);
        let json = serde_json::to_string_pretty(body)?;
        fs::create_dir_all(&self.dir).map_err(|source| GoldenStoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|source| GoldenStoreError::Io { path: path.clone(), source })?;
        tracing::debug!(endpoint = endpoint_id, path = %path.display(), "golden snapshot written");
        Ok(())
    }

    /// `Ok(None)` means no baseline has been recorded yet.
    pub fn load(&self, endpoint_id: &str) -> Result<Option<Value>, GoldenStoreError> {
        let path = self.path_for(endpoint_id);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(GoldenStoreError::Io { path, source }),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| GoldenStoreError::Corrupt { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{normalize, IgnoreList};
    use serde_json::json;

    #[test]
    fn save_then_load_round_trips_normalized_body() {
        let tmp = tempfile::tempdir().unwrap();
        let store = GoldenStore::new(tmp.path().join("golden"));
        let raw = json!({ "status": "UP", "timestamp": 17, "components": [{ "name": "db", "uptime": 3 }] });
        let normalized = normalize(Some(&raw), &IgnoreList::default());

        store.save("health", &normalized).unwrap();

        assert_eq!(store.load("health").unwrap(), Some(normalized));
    }

    #[test]
    fn store_creates_dir_on_first_save_only() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("golden");
        let store = GoldenStore::new(&dir);
        assert!(!dir.exists());
        assert!(store.load("health").unwrap().is_none());
        assert!(!dir.exists());

        store.save("health", &json!({ "status": "UP" })).unwrap();
        assert!(dir.join("health.json").is_file());
    }

    #[test]
    fn save_under_a_file_is_an_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let store = GoldenStore::new(blocker.join("golden"));

        let err = store.save("health", &json!({})).unwrap_err();
        assert!(matches!(err, GoldenStoreError::Io { .. }));
    }

    #[test]
    fn missing_snapshot_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = GoldenStore::new(tmp.path());
        assert!(store.load("never-saved").unwrap().is_none());
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = GoldenStore::new(tmp.path());
        fs::write(store.path_for("broken"), "{ not json").unwrap();

        let err = store.load("broken").unwrap_err();
        assert!(matches!(err, GoldenStoreError::Corrupt { .. }));
    }

    #[test]
    fn save_overwrites_prior_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let store = GoldenStore::new(tmp.path());
        store.save("rooms", &json!({ "total": 10 })).unwrap();
        store.save("rooms", &json!({ "total": 11 })).unwrap();
        assert_eq!(store.load("rooms").unwrap(), Some(json!({ "total": 11 })));
    }

    #[test]
    fn non_ascii_is_written_verbatim() {
        let tmp = tempfile::tempdir().unwrap();
        let store = GoldenStore::new(tmp.path());
        store.save("room-name", &json!({ "name": "오션뷰" })).unwrap();

        let text = fs::read_to_string(store.path_for("room-name")).unwrap();
        assert!(text.contains("오션뷰"));
        assert!(text.contains("\n  \"name\""));
    }

    #[test]
    fn path_separators_in_ids_stay_inside_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let store = GoldenStore::new(tmp.path());
        let path = store.path_for("admin/users");
        assert_eq!(path.parent().unwrap(), tmp.path());
        assert_eq!(path.file_name().unwrap(), "admin_users.json");
    }
}
