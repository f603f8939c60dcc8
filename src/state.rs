use crate::error::{Result, StateError};
use crate::language::LanguagePair;
use crate::{log_info, log_warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    #[serde(default)]
    pub completed: bool,
}

/// Completion record keyed by `pair/file/recipe`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessingState {
    entries: BTreeMap<String, StateEntry>,
}

impl ProcessingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_completed(&self, key: &str) -> bool {
        self.entries.get(key).map(|e| e.completed).unwrap_or(false)
    }

    pub fn mark_completed(&mut self, key: impl Into<String>) {
        self.entries
            .insert(key.into(), StateEntry { completed: true });
    }

    /// Drops the entry for `key`, e.g. when the mark could not be persisted.
    pub fn unmark(&mut self, key: &str) {
        self.entries.remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Key of one logical unit of work. The same recipe, file and pair always map
/// to the same key.
pub fn state_key(pair: &LanguagePair, filename: &str, recipe: &str) -> String {
    format!("{}/{}/{}", pair, filename, recipe)
}

/// JSON-file persistence for [`ProcessingState`]. Single writer only.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails: a missing or unreadable file is an empty state.
    pub fn load(&self) -> ProcessingState {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ProcessingState::new(),
            Err(e) => {
                log_warn!(
                    "[state] Could not read {}: {}, starting fresh",
                    self.path.display(),
                    e
                );
                return ProcessingState::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                log_warn!(
                    "[state] Ignoring corrupt state file {}: {}",
                    self.path.display(),
                    e
                );
                ProcessingState::new()
            }
        }
    }

    pub fn save(&self, state: &ProcessingState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StateError::Write {
                path: self.path.display().to_string(),
                source,
            })?;
        }
        fs::write(&self.path, json).map_err(|source| StateError::Write {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(())
    }

    pub fn reset(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(StateError::Remove {
                    path: self.path.display().to_string(),
                    source,
                }
                .into())
            }
        }
        log_info!("[state] Processing state has been reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_file(name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("nsanku_state_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir.join("processing_state.json")
    }

    #[test]
    fn builds_keys_from_pair_file_and_recipe() {
        let pair = LanguagePair::new("en", "fr");
        assert_eq!(state_key(&pair, "en-fr.csv", "recipeA"), "en-fr/en-fr.csv/recipeA");
    }

    #[test]
    fn missing_file_is_empty_state() {
        let store = StateStore::new(tmp_file("missing"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn corrupt_file_is_empty_state() {
        let path = tmp_file("corrupt");
        fs::write(&path, "{ not json").unwrap();
        assert!(StateStore::new(path).load().is_empty());
    }

    #[test]
    fn saves_in_the_documented_shape() {
        let path = tmp_file("shape");
        let store = StateStore::new(&path);
        let mut state = ProcessingState::new();
        state.mark_completed("en-fr/en-fr.csv/recipeA");
        store.save(&state).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["en-fr/en-fr.csv/recipeA"]["completed"], true);

        let loaded = store.load();
        assert!(loaded.is_completed("en-fr/en-fr.csv/recipeA"));
        assert!(!loaded.is_completed("en-fr/en-fr.csv/recipeB"));
    }

    #[test]
    fn reads_entries_marked_incomplete() {
        let path = tmp_file("incomplete");
        fs::write(&path, r#"{"en-fr/en-fr.csv/a": {"completed": false}}"#).unwrap();
        let state = StateStore::new(path).load();
        assert_eq!(state.len(), 1);
        assert!(!state.is_completed("en-fr/en-fr.csv/a"));
    }

    #[test]
    fn unmark_forgets_completion() {
        let mut state = ProcessingState::new();
        state.mark_completed("a");
        state.mark_completed("b");
        state.unmark("a");
        assert!(!state.is_completed("a"));
        assert!(state.is_completed("b"));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn save_into_a_directory_path_fails() {
        let path = tmp_file("dir_target");
        fs::create_dir_all(&path).unwrap();
        let err = StateStore::new(&path).save(&ProcessingState::new()).unwrap_err();
        assert_eq!(err.kind(), "state");
    }

    #[test]
    fn reset_removes_file_and_tolerates_absence() {
        let path = tmp_file("reset");
        let store = StateStore::new(&path);
        let mut state = ProcessingState::new();
        state.mark_completed("k");
        store.save(&state).unwrap();
        assert!(path.exists());

        store.reset().unwrap();
        assert!(!path.exists());
        assert!(store.load().is_empty());
        store.reset().unwrap();
    }
}
