//! JSON file holding a [`LifecycleManager`] between CLI invocations.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use super::LifecycleManager;

/// Default record store file name.
pub const DEFAULT_RECORDS_FILE: &str = "cert-records.json";

#[derive(Debug, Clone)]
pub struct CertRecordStore {
    path: PathBuf,
}

impl CertRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved records, or an empty manager with the default policy when the
    /// file does not exist yet.
    pub fn load(&self) -> Result<LifecycleManager> {
        if !self.path.exists() {
            return Ok(LifecycleManager::default());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read {:?}", self.path))?;
        serde_json::from_str(&raw).with_context(|| format!("parse records {:?}", self.path))
    }

    /// Replace the file atomically: write a sibling temp file, then rename.
    pub fn save(&self, manager: &LifecycleManager) -> Result<()> {
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create records dir {:?}", parent))?;
                parent.to_path_buf()
            }
            None => PathBuf::from("."),
        };

        let json = serde_json::to_string_pretty(manager).context("serialize records")?;
        let mut tmp = NamedTempFile::new_in(&dir)
            .with_context(|| format!("create temp file in {:?}", dir))?;
        tmp.write_all(json.as_bytes())
            .context("write records temp file")?;
        tmp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("persist {:?}", self.path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::CertHistoryEntry;
    use crate::levels::CertificationLevel;
    use crate::lifecycle::{RecordState, RenewalPolicy};
    use crate::result::RunResult;
    use crate::scorer::CertificationResult;
    use chrono::Utc;

    fn entry() -> CertHistoryEntry {
        CertHistoryEntry {
            recorded_at: Utc::now(),
            run: RunResult {
                run_id: "run-store".to_string(),
                implementation_name: "acme".to_string(),
                run_timestamp: Utc::now(),
                completed_at: Utc::now(),
                registry_digest: "d".to_string(),
                target_level: None,
                truncated: false,
                protocols: Vec::new(),
                cross_protocol_checks: Vec::new(),
            },
            certification: CertificationResult {
                achieved_level: CertificationLevel::Bronze,
                overall_score: 0.8,
                per_protocol_pass_rates: Default::default(),
                required_protocols_satisfied: true,
                missing_required_protocols: Vec::new(),
                target_level: None,
                level_detail: Vec::new(),
            },
        }
    }

    #[test]
    fn test_missing_store_loads_default_manager() {
        let dir = tempfile::tempdir().unwrap();
        let store = CertRecordStore::new(dir.path().join("records.json"));
        let mgr = store.load().unwrap();
        assert!(mgr.records().is_empty());
        assert_eq!(mgr.policy(), &RenewalPolicy::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = CertRecordStore::new(dir.path().join("nested/records.json"));

        let mut mgr = LifecycleManager::new(RenewalPolicy {
            validity_period_days: 365,
            ..RenewalPolicy::default()
        });
        let record = mgr.issue(&entry(), Utc::now()).unwrap();
        mgr.suspend(&record.record_id, "audit", Utc::now()).unwrap();
        store.save(&mgr).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded, mgr);
        assert_eq!(
            reloaded.record(&record.record_id).unwrap().state,
            RecordState::Suspended
        );
        assert_eq!(reloaded.policy().validity_period_days, 365);
    }

    #[test]
    fn test_corrupt_store_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = CertRecordStore::new(&path).load().unwrap_err();
        assert!(format!("{err:#}").contains("parse records"));
    }
}
