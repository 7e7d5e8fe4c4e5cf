use factlens_core::{Error, KvStore, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub mod analyzer;
pub mod applier;
pub mod bias;
pub mod config;
pub mod content;
pub mod document;
pub mod extract;
pub mod highlight;
pub mod keywords;
pub mod session;
pub mod sources;
pub mod store;
pub mod textprep;

pub use analyzer::analyze;
pub use applier::HighlightApplier;
pub use config::Config;
pub use content::{ContentHandle, ContentScript};
pub use document::Document;
pub use session::{ScanSession, Tab};

const SCHEMA_VERSION: u64 = 1;

/// One JSON file per key under `root`.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn check_key(key: &str) -> Result<()> {
        // Keys become file names; keep them to a boring alphabet.
        let ok = !key.is_empty()
            && key.len() <= 64
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if ok {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!("bad store key: {key:?}")))
        }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl KvStore for FsStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        Self::check_key(key)?;
        let p = self.path(key);
        if !p.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&p).map_err(|e| Error::Store(e.to_string()))?;
        let mut doc: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| Error::Store(e.to_string()))?;
        // Files without an envelope are read as the bare value.
        match doc.get("schema_version").and_then(|v| v.as_u64()) {
            Some(_) => Ok(doc.get_mut("value").map(serde_json::Value::take)),
            None => Ok(Some(doc)),
        }
    }

    fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        Self::check_key(key)?;
        fs::create_dir_all(&self.root).map_err(|e| Error::Store(e.to_string()))?;
        let now_s = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_secs();
        let doc = serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "updated_at_epoch_s": now_s,
            "value": value,
        });
        let p = self.path(key);
        let tmp = self.root.join(format!(".{key}.json.tmp"));
        fs::write(
            &tmp,
            serde_json::to_vec_pretty(&doc).map_err(|e| Error::Store(e.to_string()))?,
        )
        .map_err(|e| Error::Store(e.to_string()))?;
        fs::rename(&tmp, &p).map_err(|e| Error::Store(e.to_string()))?;
        tracing::trace!(key, path = %p.display(), "store write");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        Self::check_key(key)?;
        let p = self.path(key);
        if p.exists() {
            fs::remove_file(&p).map_err(|e| Error::Store(e.to_string()))?;
        }
        Ok(())
    }
}

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    map: Mutex<BTreeMap<String, serde_json::Value>>,
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let m = self.map.lock().unwrap_or_else(|e| e.into_inner());
        Ok(m.get(key).cloned())
    }

    fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        let mut m = self.map.lock().unwrap_or_else(|e| e.into_inner());
        m.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut m = self.map.lock().unwrap_or_else(|e| e.into_inner());
        m.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fs_store_round_trips_and_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let s = FsStore::new(tmp.path().join("data"));
        assert!(s.get("history").unwrap().is_none());
        s.set("history", serde_json::json!([{"url": "u"}])).unwrap();

        let reopened = FsStore::new(tmp.path().join("data"));
        let v = reopened.get("history").unwrap().unwrap();
        assert_eq!(v[0]["url"], "u");

        reopened.remove("history").unwrap();
        assert!(s.get("history").unwrap().is_none());
        reopened.remove("history").unwrap();
    }

    #[test]
    fn fs_store_writes_envelope_and_leaves_no_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        let s = FsStore::new(tmp.path().to_path_buf());
        s.set("settings", serde_json::json!({"telemetry": false}))
            .unwrap();
        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(tmp.path().join("settings.json")).unwrap()).unwrap();
        assert_eq!(raw["schema_version"], 1);
        assert_eq!(raw["value"]["telemetry"], false);
        let names: Vec<String> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["settings.json".to_string()]);
    }

    #[test]
    fn fs_store_reads_bare_legacy_values() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("feedback.json"), br#"{"abc": {"agree_count": 1, "disagree_count": 0}}"#).unwrap();
        let s = FsStore::new(tmp.path().to_path_buf());
        let v = s.get("feedback").unwrap().unwrap();
        assert_eq!(v["abc"]["agree_count"], 1);
    }

    #[test]
    fn fs_store_rejects_path_like_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let s = FsStore::new(tmp.path().to_path_buf());
        assert!(matches!(
            s.set("../escape", serde_json::json!(1)),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(s.get(""), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn fs_store_reports_corrupt_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("history.json"), b"{not json").unwrap();
        let s = FsStore::new(tmp.path().to_path_buf());
        assert!(matches!(s.get("history"), Err(Error::Store(_))));
    }

    #[test]
    fn history_cap_holds_on_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let s = FsStore::new(tmp.path().to_path_buf());
        for i in 0..60u64 {
            store::push_history(
                &s,
                factlens_core::HistoryEntry {
                    url: format!("https://example.com/{i}"),
                    timestamp_ms: i,
                    score: 50,
                },
            )
            .unwrap();
        }
        let h = store::load_history(&FsStore::new(tmp.path().to_path_buf())).unwrap();
        assert_eq!(h.len(), store::MAX_HISTORY);
        assert_eq!(h[0].timestamp_ms, 59);
    }

    proptest! {
        #[test]
        fn memory_store_returns_what_was_set(key in "[a-z_]{1,16}", n in any::<i64>()) {
            let s = MemoryStore::default();
            s.set(&key, serde_json::json!(n)).unwrap();
            prop_assert_eq!(s.get(&key).unwrap(), Some(serde_json::json!(n)));
            s.remove(&key).unwrap();
            prop_assert!(s.get(&key).unwrap().is_none());
        }

        #[test]
        fn check_key_never_panics(key in any::<String>()) {
            let _ = FsStore::check_key(&key);
        }
    }
}
