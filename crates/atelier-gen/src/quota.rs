//! Daily generation quota
//!
//! A quota service answers one question: may another run start today? The
//! caller asks before starting a run; the orchestrator itself never touches
//! the quota.

use atelier_core::{AtelierError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Consumes one unit of a per-day allowance
pub trait QuotaService: Send + Sync {
    /// If `date` still has allowance left, consume one unit and return true
    fn check_and_consume(&self, date: NaiveDate) -> Result<bool>;

    /// Units already consumed on `date`
    fn used(&self, date: NaiveDate) -> Result<u32>;

    fn daily_limit(&self) -> u32;
}

/// File-backed quota store, one TOML table of `date -> count`.
///
/// Only days that were actually used are stored; stale days are pruned on
/// every write.
pub struct FileQuotaStore {
    path: PathBuf,
    daily_limit: u32,
    lock: Mutex<()>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct QuotaFile {
    #[serde(default)]
    usage: BTreeMap<String, u32>,
}

impl FileQuotaStore {
    pub fn new<P: AsRef<Path>>(path: P, daily_limit: u32) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            daily_limit,
            lock: Mutex::new(()),
        }
    }

    fn read(&self) -> Result<QuotaFile> {
        if !self.path.exists() {
            return Ok(QuotaFile::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        toml::from_str(&content).map_err(|e| {
            AtelierError::QuotaError(format!(
                "Failed to parse quota file {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn write(&self, file: &QuotaFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(file)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl QuotaService for FileQuotaStore {
    fn check_and_consume(&self, date: NaiveDate) -> Result<bool> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| AtelierError::QuotaError("Quota lock poisoned".to_string()))?;

        let mut file = self.read()?;
        let key = date.to_string();
        let used = file.usage.get(&key).copied().unwrap_or(0);
        if used >= self.daily_limit {
            tracing::info!(%date, used, limit = self.daily_limit, "daily quota exhausted");
            return Ok(false);
        }

        file.usage.retain(|day, _| day == &key);
        file.usage.insert(key, used + 1);
        self.write(&file)?;
        Ok(true)
    }

    fn used(&self, date: NaiveDate) -> Result<u32> {
        let file = self.read()?;
        Ok(file.usage.get(&date.to_string()).copied().unwrap_or(0))
    }

    fn daily_limit(&self) -> u32 {
        self.daily_limit
    }
}

/// In-memory quota store
pub struct MemoryQuotaStore {
    daily_limit: u32,
    usage: Mutex<BTreeMap<NaiveDate, u32>>,
}

impl MemoryQuotaStore {
    pub fn new(daily_limit: u32) -> Self {
        Self {
            daily_limit,
            usage: Mutex::new(BTreeMap::new()),
        }
    }
}

impl QuotaService for MemoryQuotaStore {
    fn check_and_consume(&self, date: NaiveDate) -> Result<bool> {
        let mut usage = self
            .usage
            .lock()
            .map_err(|_| AtelierError::QuotaError("Quota lock poisoned".to_string()))?;
        let used = usage.entry(date).or_insert(0);
        if *used >= self.daily_limit {
            return Ok(false);
        }
        *used += 1;
        Ok(true)
    }

    fn used(&self, date: NaiveDate) -> Result<u32> {
        let usage = self
            .usage
            .lock()
            .map_err(|_| AtelierError::QuotaError("Quota lock poisoned".to_string()))?;
        Ok(usage.get(&date).copied().unwrap_or(0))
    }

    fn daily_limit(&self) -> u32 {
        self.daily_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("atelier_quota_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn test_memory_store_enforces_limit_per_day() {
        let store = MemoryQuotaStore::new(2);
        assert!(store.check_and_consume(day(1)).unwrap());
        assert!(store.check_and_consume(day(1)).unwrap());
        assert!(!store.check_and_consume(day(1)).unwrap());
        assert_eq!(store.used(day(1)).unwrap(), 2);

        // A new day starts fresh
        assert!(store.check_and_consume(day(2)).unwrap());
        assert_eq!(store.used(day(2)).unwrap(), 1);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = temp_dir();
        let path = dir.join("nested").join("quota.toml");

        let store = FileQuotaStore::new(&path, 2);
        assert!(store.check_and_consume(day(5)).unwrap());

        let reopened = FileQuotaStore::new(&path, 2);
        assert_eq!(reopened.used(day(5)).unwrap(), 1);
        assert!(reopened.check_and_consume(day(5)).unwrap());
        assert!(!reopened.check_and_consume(day(5)).unwrap());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_file_store_prunes_old_days() {
        let dir = temp_dir();
        let path = dir.join("quota.toml");

        let store = FileQuotaStore::new(&path, 5);
        store.check_and_consume(day(5)).unwrap();
        store.check_and_consume(day(6)).unwrap();

        assert_eq!(store.used(day(5)).unwrap(), 0);
        assert_eq!(store.used(day(6)).unwrap(), 1);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("2026-10-05"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_file_store_missing_file_is_zero() {
        let dir = temp_dir();
        let store = FileQuotaStore::new(dir.join("absent.toml"), 1);
        assert_eq!(store.used(day(1)).unwrap(), 0);
        assert_eq!(store.daily_limit(), 1);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_file_store_corrupt_file_is_quota_error() {
        let dir = temp_dir();
        let path = dir.join("quota.toml");
        std::fs::write(&path, "usage = [not valid").unwrap();
        let store = FileQuotaStore::new(&path, 1);
        assert!(matches!(
            store.check_and_consume(day(1)),
            Err(AtelierError::QuotaError(_))
        ));
        std::fs::remove_dir_all(&dir).ok();
    }
}
