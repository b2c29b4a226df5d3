//! Baseline questions: a flat JSON file on local disk.
//!
//! `{ "questions": "…" }`, no schema versioning. Writers are serialized
//! behind a mutex so concurrent POSTs cannot interleave a partial write.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    pub questions: String,
}

pub struct BaselineStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl BaselineStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Read the baseline file; a missing file yields the empty default.
    pub fn load(&self) -> Result<Baseline> {
        if !self.path.exists() {
            return Ok(Baseline::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read baseline file: {}", self.path.display()))?;
        serde_json::from_str(&content).with_context(|| "Failed to parse baseline file")
    }

    pub fn save(&self, baseline: &Baseline) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap();
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(baseline)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write baseline file: {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_default() {
        let tmp = TempDir::new().unwrap();
        let store = BaselineStore::new(tmp.path().join("baseline.json"));
        assert_eq!(store.load().unwrap(), Baseline::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = TempDir::new().unwrap();
        let store = BaselineStore::new(tmp.path().join("nested/dir/baseline.json"));
        let baseline = Baseline {
            questions: "1. What is the deadline?\n2. Who is the contact?".to_string(),
        };
        store.save(&baseline).unwrap();
        assert_eq!(store.load().unwrap(), baseline);
    }

    #[test]
    fn save_overwrites_previous_content() {
        let tmp = TempDir::new().unwrap();
        let store = BaselineStore::new(tmp.path().join("baseline.json"));
        store
            .save(&Baseline {
                questions: "old".to_string(),
            })
            .unwrap();
        store
            .save(&Baseline {
                questions: "new".to_string(),
            })
            .unwrap();
        assert_eq!(store.load().unwrap().questions, "new");
    }
}
