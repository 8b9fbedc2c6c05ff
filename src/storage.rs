use crate::config::atomic_rename;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, warn};

pub(crate) const HIGH_SCORE_KEY: &str = "high_score";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Synchronous string key-value storage.
pub trait Store {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/* -----------------------------
   JSON file store
------------------------------ */

/// All keys live in one JSON object, rewritten atomically on every `set`.
pub struct FileStore {
    path: PathBuf,
    entries: RefCell<BTreeMap<String, String>>,
}

impl FileStore {
    /// A missing or unreadable file starts out empty.
    pub fn open(path: &Path) -> Self {
        let entries = match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str::<BTreeMap<String, String>>(&s).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "ignoring corrupt storage file");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self {
            path: path.to_path_buf(),
            entries: RefCell::new(entries),
        }
    }

    fn flush(&self) -> Result<(), StorageError> {
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(&*self.entries.borrow())?;
        fs::write(&tmp, data)?;
        atomic_rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.flush()
    }
}

/* -----------------------------
   In-memory store
------------------------------ */

#[derive(Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<String, String>>,
    writes: RefCell<Vec<(String, String)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::default();
        store
            .entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        store
    }

    /// Every `set` so far, oldest first.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.writes.borrow().clone()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.writes
            .borrow_mut()
            .push((key.to_string(), value.to_string()));
        Ok(())
    }
}

/* -----------------------------
   High score
------------------------------ */

#[derive(Clone)]
pub struct HighScoreStore {
    store: Rc<dyn Store>,
}

impl HighScoreStore {
    pub fn new(store: Rc<dyn Store>) -> Self {
        Self { store }
    }

    /// Missing, empty or non-numeric values read as no high score.
    ///
    /// Only a whole base-10 `u32`, optionally surrounded by whitespace,
    /// counts. A leading number followed by junk is not salvaged: `"12abc"`,
    /// `"7.5"` and `"-3"` all read as `None`.
    pub fn read(&self) -> Option<u32> {
        let raw = self.store.get(HIGH_SCORE_KEY)?;
        match raw.trim().parse::<u32>() {
            Ok(score) => Some(score),
            Err(_) => {
                debug!(raw = %raw, "ignoring malformed high score");
                None
            }
        }
    }

    pub fn write(&self, score: u32) -> Result<(), StorageError> {
        self.store.set(HIGH_SCORE_KEY, &score.to_string())
    }
}
