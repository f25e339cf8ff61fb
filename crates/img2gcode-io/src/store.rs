//! Persistent settings store.
//!
//! [`SettingsStore`] owns the on-disk settings document (pretty-printed
//! JSON, one entry per [`SettingKey`]) and the in-memory [`Settings`].
//! All access goes through a mutex, so reads, writes, and the file
//! writes they trigger are serialized even when the store is shared
//! between threads.
//!
//! Loading is self-healing: a missing or corrupt document, or individual
//! entries with the wrong type, fall back to defaults and the merged
//! result is written back so the document on disk is always complete.
//! Conversion jobs never hold the store; they take a [`snapshot`] by
//! value.
//!
//! [`snapshot`]: SettingsStore::snapshot

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use img2gcode_pipeline::{SettingError, SettingKey, SettingValue, Settings};
use serde_json::{Map, Value};

/// Errors from settings store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key/value pair was rejected.
    #[error(transparent)]
    Setting(#[from] SettingError),

    /// The settings document could not be written.
    #[error("failed to save settings to {}: {source}", .path.display())]
    Io {
        /// The settings document path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The settings could not be serialized.
    #[error("failed to serialize settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Thread-safe settings backed by a JSON document on disk.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Mutex<Settings>,
}

impl SettingsStore {
    /// Open the store at `path` and [`load`](Self::load) it.
    ///
    /// Never fails: unreadable documents fall back to defaults.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let store = Self {
            path: path.into(),
            settings: Mutex::new(Settings::default()),
        };
        store.load();
        store
    }

    /// Path of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the backing document, back-fill missing or invalid keys
    /// from defaults, and write the merged result back.
    ///
    /// Problems are logged at `warn` and never returned.
    pub fn load(&self) {
        let merged = read_document(&self.path)
            .map_or_else(Settings::default, |document| merge_over_defaults(&document));

        let mut guard = self.lock();
        *guard = merged;
        if let Err(err) = write_document(&self.path, &guard) {
            tracing::warn!(error = %err, "could not write back merged settings");
        }
    }

    /// Read one setting.
    #[must_use]
    pub fn get(&self, key: SettingKey) -> SettingValue {
        self.lock().get(key)
    }

    /// Set one setting and persist immediately.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Setting`] if the value does not fit the key
    /// (nothing changes), or [`StoreError::Io`] if the document could not
    /// be written (the in-memory value is updated regardless).
    pub fn set(&self, key: SettingKey, value: SettingValue) -> Result<(), StoreError> {
        let mut guard = self.lock();
        guard.set(key, value)?;
        write_document(&self.path, &guard)
    }

    /// Apply several edits and persist once.
    ///
    /// Edits are applied to a copy; if `edit` fails nothing changes and
    /// nothing is written.
    ///
    /// # Errors
    ///
    /// Returns the error from `edit`, or [`StoreError::Io`] if the
    /// document could not be written.
    pub fn update<F>(&self, edit: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Settings) -> Result<(), SettingError>,
    {
        let mut guard = self.lock();
        let mut edited = guard.clone();
        edit(&mut edited)?;
        *guard = edited;
        write_document(&self.path, &guard)
    }

    /// A by-value copy of the current settings for one conversion job.
    #[must_use]
    pub fn snapshot(&self) -> Settings {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Settings> {
        // A panic while holding the lock cannot leave `Settings` invalid:
        // every mutation replaces whole fields.
        self.settings
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Read the persisted document as a JSON object.
///
/// Returns `None` (after logging) if the file is missing, unreadable, or
/// not a JSON object.
fn read_document(path: &Path) -> Option<Map<String, Value>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no settings file, using defaults");
            return None;
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "settings file unreadable, using defaults");
            return None;
        }
    };

    if text.trim().is_empty() {
        return Some(Map::new());
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => Some(map),
        Ok(Value::Null) => Some(Map::new()),
        Ok(_) => {
            tracing::warn!(path = %path.display(), "settings file is not an object, using defaults");
            None
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "settings file corrupt, using defaults");
            None
        }
    }
}

/// Apply every valid entry of `document` over the defaults.
///
/// Unknown keys are dropped; entries of the wrong type keep the default.
fn merge_over_defaults(document: &Map<String, Value>) -> Settings {
    let mut settings = Settings::default();
    for key in SettingKey::ALL {
        let Some(raw) = document.get(key.as_str()) else {
            tracing::debug!(%key, "setting missing, using default");
            continue;
        };
        let applied = json_to_value(raw)
            .ok_or_else(|| format!("unsupported value {raw}"))
            .and_then(|value| settings.set(key, value).map_err(|e| e.to_string()));
        if let Err(reason) = applied {
            tracing::warn!(%key, %reason, "invalid persisted setting, using default");
        }
    }
    for unknown in document
        .keys()
        .filter(|name| name.parse::<SettingKey>().is_err())
    {
        tracing::debug!(key = %unknown, "dropping unknown setting");
    }
    settings
}

fn json_to_value(raw: &Value) -> Option<SettingValue> {
    match raw {
        Value::Bool(b) => Some(SettingValue::Bool(*b)),
        Value::String(s) => Some(SettingValue::Text(s.clone())),
        Value::Number(n) => n
            .as_i64()
            .map(SettingValue::Int)
            .or_else(|| n.as_f64().map(SettingValue::Float)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Write the settings document atomically: serialize to a sibling
/// temporary file, then rename it over the target.
fn write_document(path: &Path, settings: &Settings) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut text = serde_json::to_string_pretty(settings)?;
    text.push('\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    std::fs::write(&tmp, text).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)?;
    tracing::debug!(path = %path.display(), "settings saved");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use img2gcode_pipeline::SettingType;

    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> SettingsStore {
        SettingsStore::open(dir.path().join("config.json"))
    }

    #[test]
    fn missing_file_yields_defaults_and_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let defaults = Settings::default();
        for key in SettingKey::ALL {
            assert_eq!(store.get(key), defaults.get(key), "{key}");
        }
        assert!(store.path().exists());
    }

    #[test]
    fn written_document_contains_every_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let text = std::fs::read_to_string(store.path()).unwrap();
        let json: Value = serde_json::from_str(&text).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), SettingKey::ALL.len());
        assert_eq!(object["threshold"], Value::from(128));
        assert_eq!(object["max_artifact_size"], Value::from(0.02));
        assert_eq!(object["group_by_color"], Value::from(true));
        assert_eq!(object["tool_on_cmd"], Value::from("M3"));
    }

    #[test]
    fn set_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let pairs = [
            (SettingKey::ColorTolerance, SettingValue::Int(-12)),
            (SettingKey::RemoveBackground, SettingValue::Bool(true)),
            (SettingKey::BackgroundTolerance, SettingValue::Float(0.125)),
            (SettingKey::MaxArtifactSize, SettingValue::Float(1e-9)),
            (SettingKey::GroupByColor, SettingValue::Bool(false)),
            (SettingKey::ToolOnCmd, SettingValue::Text("M3 S1000".into())),
            (SettingKey::ToolOffCmd, SettingValue::Text("M5\nG4 P0".into())),
            (SettingKey::OutputFilename, SettingValue::Text("ünïcode \"name\"".into())),
            (SettingKey::SvgMode, SettingValue::Text("canny".into())),
            (SettingKey::Threshold, SettingValue::Int(i64::MAX)),
            (SettingKey::BlurKsize, SettingValue::Int(7)),
            (SettingKey::CannyLow, SettingValue::Int(i64::MIN)),
            (SettingKey::CannyHigh, SettingValue::Int(0)),
            (SettingKey::PotraceTurdsize, SettingValue::Int(9)),
            (SettingKey::PotraceAlphamax, SettingValue::Float(-1.5e300)),
        ];
        {
            let store = store_in(&dir);
            for (key, value) in &pairs {
                store.set(*key, value.clone()).unwrap();
            }
        }
        let reopened = store_in(&dir);
        for (key, value) in pairs {
            assert_eq!(reopened.get(key), value, "{key}");
        }
    }

    #[test]
    fn whole_float_survives_round_trip_as_float() {
        let dir = tempfile::tempdir().unwrap();
        store_in(&dir)
            .set(SettingKey::BackgroundTolerance, SettingValue::Float(3.0))
            .unwrap();
        assert_eq!(
            store_in(&dir).get(SettingKey::BackgroundTolerance),
            SettingValue::Float(3.0)
        );
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults_and_heals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ this is not json").unwrap();
        let store = SettingsStore::open(&path);
        assert_eq!(store.snapshot(), Settings::default());
        let healed: Settings = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(healed, Settings::default());
    }

    #[test]
    fn non_object_document_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert_eq!(SettingsStore::open(&path).snapshot(), Settings::default());
    }

    #[test]
    fn partial_document_is_back_filled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"threshold": 90, "svg_mode": "threshold", "extra": 1}"#).unwrap();
        let store = SettingsStore::open(&path);
        assert_eq!(store.get(SettingKey::Threshold), SettingValue::Int(90));
        assert_eq!(store.get(SettingKey::SvgMode), SettingValue::Text("threshold".into()));
        assert_eq!(store.get(SettingKey::CannyHigh), SettingValue::Int(150));

        let json: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), SettingKey::ALL.len());
        assert!(!object.contains_key("extra"));
    }

    #[test]
    fn wrongly_typed_entry_keeps_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"threshold": "high", "blur_ksize": 5, "canny_low": 2.5}"#).unwrap();
        let store = SettingsStore::open(&path);
        assert_eq!(store.get(SettingKey::Threshold), SettingValue::Int(128));
        assert_eq!(store.get(SettingKey::BlurKsize), SettingValue::Int(5));
        assert_eq!(store.get(SettingKey::CannyLow), SettingValue::Int(50));
    }

    #[test]
    fn empty_file_is_treated_as_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "").unwrap();
        assert_eq!(SettingsStore::open(&path).snapshot(), Settings::default());
    }

    #[test]
    fn rejected_set_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let err = store
            .set(SettingKey::GroupByColor, SettingValue::Int(1))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Setting(SettingError::TypeMismatch {
                expected: SettingType::Bool,
                ..
            })
        ));
        assert_eq!(store.get(SettingKey::GroupByColor), SettingValue::Bool(true));
    }

    #[test]
    fn update_applies_batch_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store
            .update(|s| {
                s.set(SettingKey::Threshold, SettingValue::Int(10))?;
                s.set(SettingKey::SvgMode, SettingValue::Text("canny".into()))
            })
            .unwrap();
        assert_eq!(store_in(&dir).get(SettingKey::Threshold), SettingValue::Int(10));

        let result = store.update(|s| {
            s.set(SettingKey::Threshold, SettingValue::Int(20))?;
            s.set(SettingKey::Threshold, SettingValue::Bool(true))
        });
        assert!(result.is_err());
        assert_eq!(store.get(SettingKey::Threshold), SettingValue::Int(10));
    }

    #[test]
    fn snapshot_is_independent_of_later_edits() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let snapshot = store.snapshot();
        store.set(SettingKey::Threshold, SettingValue::Int(5)).unwrap();
        assert_eq!(snapshot.threshold, 128);
        assert_eq!(store.snapshot().threshold, 5);
    }

    #[test]
    fn concurrent_sets_leave_a_valid_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(store_in(&dir));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = std::sync::Arc::clone(&store);
                std::thread::spawn(move || {
                    for j in 0..10 {
                        store
                            .set(SettingKey::Threshold, SettingValue::Int(i * 100 + j))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let final_value = store.get(SettingKey::Threshold);
        let on_disk: Settings =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(SettingValue::Int(on_disk.threshold), final_value);
    }

    #[test]
    fn missing_parent_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/config.json");
        let store = SettingsStore::open(&path);
        store.set(SettingKey::BlurKsize, SettingValue::Int(5)).unwrap();
        assert!(path.exists());
    }
}
