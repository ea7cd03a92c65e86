//! Daily JSON snapshots of the usage ledger

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::budget::types::UsageRecord;
use crate::error::{BudgetError, BudgetResult};

/// On-disk contents of `budget_usage_<date>.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailySnapshot {
    pub date: String,
    #[serde(default)]
    pub records: Vec<UsageRecord>,
}

/// Directory of one snapshot file per calendar date
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Open (and create if needed) the snapshot directory. Creation failures
    /// are logged; they resurface as write errors at the next flush.
    pub fn open<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref().to_path_buf();
        if let Err(e) = fs::create_dir_all(&dir) {
            log::warn!("Could not create budget storage dir {:?}: {}", dir, e);
        }
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, date: &str) -> PathBuf {
        self.dir.join(format!("budget_usage_{}.json", date))
    }

    /// Read a day's snapshot. `Ok(None)` when the file does not exist.
    pub fn read_day(&self, date: &str) -> BudgetResult<Option<DailySnapshot>> {
        let path = self.path_for(date);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| BudgetError::persistence(&path, e))?;
        let snapshot: DailySnapshot = serde_json::from_str(&content)?;
        Ok(Some(snapshot))
    }

    /// Records of a day, failing soft: unreadable or corrupt files count as
    /// an empty day.
    pub fn load_day(&self, date: &str) -> Vec<UsageRecord> {
        match self.read_day(date) {
            Ok(Some(snapshot)) => snapshot.records,
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!(
                    "Failed to load budget history {:?}, starting empty: {}",
                    self.path_for(date),
                    e
                );
                Vec::new()
            }
        }
    }

    pub fn write_day(&self, date: &str, records: Vec<UsageRecord>) -> BudgetResult<()> {
        let snapshot = DailySnapshot {
            date: date.to_string(),
            records,
        };
        let content = serde_json::to_string_pretty(&snapshot)?;
        let path = self.path_for(date);
        Self::atomic_write(&path, content.as_bytes())?;
        log::debug!("Budget snapshot saved to {:?}", path);
        Ok(())
    }

    /// Write to a temp file in the same directory, then rename over `path`.
    fn atomic_write(path: &Path, data: &[u8]) -> BudgetResult<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| BudgetError::persistence(dir, e))?;
        let tmp = dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
        {
            let mut f = fs::File::create(&tmp).map_err(|e| BudgetError::persistence(&tmp, e))?;
            f.write_all(data)
                .and_then(|_| f.sync_all())
                .map_err(|e| BudgetError::persistence(&tmp, e))?;
        }
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(BudgetError::persistence(path, e));
        }
        // Flush the directory entry where supported
        if let Ok(dir_file) = fs::File::open(dir) {
            let _ = dir_file.sync_all();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use pretty_assertions::assert_eq;

    fn record(cost: f64) -> UsageRecord {
        let at = Local.with_ymd_and_hms(2025, 11, 21, 8, 0, 0).single().unwrap();
        UsageRecord::new(at, "executor", "llm_call", cost, Some("claude-3-haiku-20240307".into()), false)
    }

    #[test]
    fn test_write_then_read_day() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path());
        store.write_day("2025-11-21", vec![record(0.1), record(0.2)]).unwrap();

        assert!(dir.path().join("budget_usage_2025-11-21.json").exists());
        let snapshot = store.read_day("2025-11-21").unwrap().unwrap();
        assert_eq!(snapshot.date, "2025-11-21");
        assert_eq!(snapshot.records, vec![record(0.1), record(0.2)]);
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path());
        store.write_day("2025-11-21", vec![record(0.1)]).unwrap();
        store.write_day("2025-11-21", vec![record(0.1), record(0.3)]).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["budget_usage_2025-11-21.json".to_string()]);
    }

    #[test]
    fn test_missing_day_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path());
        assert!(store.read_day("2025-11-21").unwrap().is_none());
        assert!(store.load_day("2025-11-21").is_empty());
    }

    #[test]
    fn test_corrupt_day_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path());
        fs::write(store.path_for("2025-11-21"), "{\"date\": \"2025-11-21\", \"records\": [").unwrap();

        assert!(matches!(
            store.read_day("2025-11-21"),
            Err(BudgetError::Serialization(_))
        ));
        assert!(store.load_day("2025-11-21").is_empty());
    }

    #[test]
    fn test_reads_legacy_snapshot_format() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path());
        fs::write(
            store.path_for("2025-11-21"),
            r#"{
  "date": "2025-11-21",
  "records": [
    {"period": "2025-11-21", "agent_type": "researcher", "operation": "web_search",
     "cost_usd": 0.02, "timestamp": "2025-11-21T14:03:11.532101",
     "model": null, "fallback_applied": false}
  ]
}"#,
        )
        .unwrap();

        let records = store.load_day("2025-11-21");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].operation, "web_search");
        assert_eq!(records[0].cost, 0.02);
    }
}
