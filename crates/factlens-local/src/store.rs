//! Typed access to the flat key-value store: settings, history, feedback.

use factlens_core::{
    Error, FeedbackTally, HistoryEntry, KvStore, Result, ScanMode, Settings,
};
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

pub const SETTINGS_KEY: &str = "settings";
pub const HISTORY_KEY: &str = "history";
pub const FEEDBACK_KEY: &str = "feedback";

/// History keeps the newest entries only.
pub const MAX_HISTORY: usize = 50;

fn read<S: KvStore + ?Sized, T: DeserializeOwned + Default>(store: &S, key: &str) -> Result<T> {
    match store.get(key)? {
        None => Ok(T::default()),
        Some(v) => serde_json::from_value(v).map_err(|e| Error::Store(format!("{key}: {e}"))),
    }
}

fn write<S: KvStore + ?Sized, T: serde::Serialize>(store: &S, key: &str, value: &T) -> Result<()> {
    let v = serde_json::to_value(value).map_err(|e| Error::Store(format!("{key}: {e}")))?;
    store.set(key, v)
}

/// First-run defaults. Leaves existing settings alone.
pub fn init_defaults<S: KvStore + ?Sized>(store: &S) -> Result<()> {
    if store.get(SETTINGS_KEY)?.is_none() {
        write(store, SETTINGS_KEY, &Settings::default())?;
    }
    Ok(())
}

pub fn load_settings<S: KvStore + ?Sized>(store: &S) -> Result<Settings> {
    read(store, SETTINGS_KEY)
}

/// Save `settings` on top of whatever is stored, keeping keys this build does not know.
pub fn save_settings<S: KvStore + ?Sized>(store: &S, settings: &Settings) -> Result<Settings> {
    let mut merged = match store.get(SETTINGS_KEY)? {
        Some(serde_json::Value::Object(m)) => m,
        _ => serde_json::Map::new(),
    };
    let new = serde_json::to_value(settings).map_err(|e| Error::Store(e.to_string()))?;
    if let serde_json::Value::Object(m) = new {
        merged.extend(m);
    }
    store.set(SETTINGS_KEY, serde_json::Value::Object(merged))?;
    load_settings(store)
}

pub fn load_history<S: KvStore + ?Sized>(store: &S) -> Result<Vec<HistoryEntry>> {
    read(store, HISTORY_KEY)
}

/// Prepend `entry`, evicting the oldest beyond [`MAX_HISTORY`].
pub fn push_history<S: KvStore + ?Sized>(
    store: &S,
    entry: HistoryEntry,
) -> Result<Vec<HistoryEntry>> {
    let mut history = load_history(store)?;
    history.insert(0, entry);
    history.truncate(MAX_HISTORY);
    write(store, HISTORY_KEY, &history)?;
    Ok(history)
}

pub fn clear_history<S: KvStore + ?Sized>(store: &S) -> Result<()> {
    store.remove(HISTORY_KEY)
}

/// Stable key for feedback on one (url, title, mode).
///
/// Fields are length-prefixed so that moving characters between them changes the key.
pub fn feedback_key(url: &str, title: &str, mode: ScanMode) -> String {
    let mut h = Sha256::new();
    h.update(b"url:");
    h.update(url.len().to_string().as_bytes());
    h.update(b":");
    h.update(url.as_bytes());
    h.update(b"\ntitle:");
    h.update(title.len().to_string().as_bytes());
    h.update(b":");
    h.update(title.as_bytes());
    h.update(b"\nmode:");
    h.update(mode.as_str().as_bytes());
    hex::encode(h.finalize())
}

pub fn load_feedback<S: KvStore + ?Sized>(store: &S) -> Result<BTreeMap<String, FeedbackTally>> {
    read(store, FEEDBACK_KEY)
}

pub fn record_feedback<S: KvStore + ?Sized>(
    store: &S,
    url: &str,
    title: &str,
    mode: ScanMode,
    agree: bool,
) -> Result<FeedbackTally> {
    let mut all = load_feedback(store)?;
    let tally = all.entry(feedback_key(url, title, mode)).or_default();
    if agree {
        tally.agree_count += 1;
    } else {
        tally.disagree_count += 1;
    }
    let out = *tally;
    write(store, FEEDBACK_KEY, &all)?;
    Ok(out)
}
