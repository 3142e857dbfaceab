//! Local certification history.
//!
//! [`CertHistory`] keeps one JSON object per line in a local file. Entries are
//! only ever appended; nothing is rewritten or deleted.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::result::RunResult;
use crate::scorer::CertificationResult;

/// Default history file name.
pub const DEFAULT_HISTORY_FILE: &str = "cert-history.jsonl";

/// One recorded certification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertHistoryEntry {
    pub recorded_at: DateTime<Utc>,
    pub run: RunResult,
    pub certification: CertificationResult,
}

/// Append-only JSONL history store.
#[derive(Debug, Clone)]
pub struct CertHistory {
    path: PathBuf,
}

impl Default for CertHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_FILE)
    }
}

impl CertHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a scored run. Parent directories are created on demand.
    pub fn append(
        &self,
        run: &RunResult,
        certification: &CertificationResult,
    ) -> Result<CertHistoryEntry> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create history dir {:?}", parent))?;
        }

        let entry = CertHistoryEntry {
            recorded_at: Utc::now(),
            run: run.clone(),
            certification: certification.clone(),
        };
        let line = serde_json::to_string(&entry).context("serialize history entry")?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {:?}", self.path))?;
        writeln!(file, "{line}").with_context(|| format!("append to {:?}", self.path))?;
        Ok(entry)
    }

    /// Every entry, oldest first. A missing file is an empty history;
    /// malformed lines are skipped with a warning.
    pub fn load_all(&self) -> Result<Vec<CertHistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read {:?}", self.path))?;

        let mut entries = Vec::new();
        for (lineno, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<CertHistoryEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(
                    event = "history.malformed_line",
                    path = %self.path.display(),
                    line = lineno + 1,
                    error = %e,
                ),
            }
        }
        Ok(entries)
    }

    pub fn latest(&self) -> Result<Option<CertHistoryEntry>> {
        Ok(self.load_all()?.pop())
    }

    /// The entry recorded for `run_id`, if any.
    pub fn find_run(&self, run_id: &str) -> Result<Option<CertHistoryEntry>> {
        Ok(self.load_all()?.into_iter().find(|e| e.run.run_id == run_id))
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.load_all()?.len())
    }

    pub fn for_implementation(&self, implementation_name: &str) -> Result<Vec<CertHistoryEntry>> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter(|e| e.run.implementation_name == implementation_name)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::CertificationScorer;

    fn run(name: &str) -> RunResult {
        RunResult {
            run_id: uuid::Uuid::new_v4().to_string(),
            implementation_name: name.to_string(),
            run_timestamp: Utc::now(),
            completed_at: Utc::now(),
            registry_digest: "abc".to_string(),
            target_level: None,
            truncated: false,
            protocols: Vec::new(),
            cross_protocol_checks: Vec::new(),
        }
    }

    #[test]
    fn test_missing_file_is_empty_history() {
        let dir = tempfile::tempdir().expect("tempdir");
        let history = CertHistory::new(dir.path().join("none.jsonl"));
        assert!(history.load_all().expect("load").is_empty());
        assert!(history.latest().expect("latest").is_none());
    }

    #[test]
    fn test_append_and_load_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let history = CertHistory::new(dir.path().join("nested/history.jsonl"));

        for name in ["alpha", "beta", "alpha"] {
            let r = run(name);
            history
                .append(&r, &CertificationScorer::score(&r))
                .expect("append");
        }

        let all = history.load_all().expect("load");
        assert_eq!(all.len(), 3);
        assert_eq!(history.count().expect("count"), 3);
        assert_eq!(all[1].run.implementation_name, "beta");
        assert_eq!(
            history.for_implementation("alpha").expect("filter").len(),
            2
        );
        let latest = history.latest().expect("latest").expect("some");
        assert_eq!(latest.run.run_id, all[2].run.run_id);

        let found = history.find_run(&all[1].run.run_id).expect("find");
        assert_eq!(found.map(|e| e.run.implementation_name), Some("beta".to_string()));
        assert!(history.find_run("missing").expect("find").is_none());
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("history.jsonl");
        let history = CertHistory::new(&path);

        let r = run("alpha");
        history
            .append(&r, &CertificationScorer::score(&r))
            .expect("append");
        let mut file = OpenOptions::new().append(true).open(&path).expect("open");
        writeln!(file, "{{not json").expect("write");

        assert_eq!(history.load_all().expect("load").len(), 1);
    }
}
