//! Read-only access to the complaint and policy collections.
//!
//! Records are loaded on every call so that edits to the backing files are
//! picked up without a restart. Complaints are handed out as the raw JSON
//! entries stored on disk; [`load_complaints`] converts them one at a time
//! so a single bad entry does not hide the rest of the collection.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::config::CorpusConfig;
use crate::types::{ComplaintRecord, PolicyRecord};

pub trait CorpusStore: Send + Sync {
    /// Complaint entries exactly as stored.
    fn complaints(&self) -> Result<Vec<Value>>;

    fn policies(&self) -> Result<Vec<PolicyRecord>>;
}

/// Complaints and policies stored as two JSON array files.
pub struct JsonFileCorpus {
    complaints_path: PathBuf,
    policies_path: PathBuf,
}

impl JsonFileCorpus {
    pub fn new(complaints_path: impl Into<PathBuf>, policies_path: impl Into<PathBuf>) -> Self {
        Self {
            complaints_path: complaints_path.into(),
            policies_path: policies_path.into(),
        }
    }

    pub fn from_config(config: &CorpusConfig) -> Self {
        Self::new(&config.complaints_path, &config.policies_path)
    }

    fn read_array<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}

impl CorpusStore for JsonFileCorpus {
    fn complaints(&self) -> Result<Vec<Value>> {
        Self::read_array(&self.complaints_path)
    }

    fn policies(&self) -> Result<Vec<PolicyRecord>> {
        Self::read_array(&self.policies_path)
    }
}

/// In-memory corpus, fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct StaticCorpus {
    complaints: Vec<Value>,
    policies: Vec<PolicyRecord>,
}

impl StaticCorpus {
    pub fn new(complaints: Vec<ComplaintRecord>, policies: Vec<PolicyRecord>) -> Self {
        let complaints = complaints
            .iter()
            .filter_map(|c| serde_json::to_value(c).ok())
            .collect();
        Self::from_raw(complaints, policies)
    }

    /// Corpus over arbitrary complaint entries, valid or not.
    pub fn from_raw(complaints: Vec<Value>, policies: Vec<PolicyRecord>) -> Self {
        Self {
            complaints,
            policies,
        }
    }
}

impl CorpusStore for StaticCorpus {
    fn complaints(&self) -> Result<Vec<Value>> {
        Ok(self.complaints.clone())
    }

    fn policies(&self) -> Result<Vec<PolicyRecord>> {
        Ok(self.policies.clone())
    }
}

/// Load the complaint entries untouched, logging and swallowing read errors.
///
/// A missing or unreadable file is reported as an empty collection, which
/// callers surface as an empty-corpus error.
pub fn load_raw_complaints(store: &dyn CorpusStore) -> Vec<Value> {
    store.complaints().unwrap_or_else(|e| {
        tracing::error!(error = %format!("{:#}", e), "Error reading complaints");
        Vec::new()
    })
}

/// Load complaints usable by the pipeline.
///
/// Entries without a string `complaintTitle` are skipped with a warning.
pub fn load_complaints(store: &dyn CorpusStore) -> Vec<ComplaintRecord> {
    load_raw_complaints(store)
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let record = ComplaintRecord::from_value(entry);
            if record.is_none() {
                tracing::warn!(index, "Skipping complaint without a string complaintTitle");
            }
            record
        })
        .collect()
}

/// Load policies; see [`load_complaints`].
pub fn load_policies(store: &dyn CorpusStore) -> Vec<PolicyRecord> {
    store.policies().unwrap_or_else(|e| {
        tracing::error!(error = %format!("{:#}", e), "Error reading policies");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_corpus_reads_both_collections() {
        let dir = tempfile::tempdir().unwrap();
        let complaints = dir.path().join("data.json");
        let policies = dir.path().join("policies.json");
        std::fs::write(
            &complaints,
            r#"[{"complaintTitle":"Pay:Low fares","name":"A","date":"2024-01-02","location":"Pune","desc":"..."}]"#,
        )
        .unwrap();
        std::fs::write(&policies, r#"[{"policy":"Fare floor"}, "free text policy"]"#).unwrap();

        let corpus = JsonFileCorpus::new(&complaints, &policies);
        let loaded = load_complaints(&corpus);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].location, "Pune");
        assert_eq!(corpus.policies().unwrap().len(), 2);
    }

    #[test]
    fn test_json_corpus_rereads_on_every_call() {
        let dir = tempfile::tempdir().unwrap();
        let complaints = dir.path().join("data.json");
        std::fs::write(&complaints, "[]").unwrap();
        let corpus = JsonFileCorpus::new(&complaints, dir.path().join("policies.json"));
        assert!(corpus.complaints().unwrap().is_empty());

        std::fs::write(&complaints, r#"[{"complaintTitle":"Safety:No cameras"}]"#).unwrap();
        assert_eq!(corpus.complaints().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = JsonFileCorpus::new(dir.path().join("nope.json"), dir.path().join("nope2.json"));
        assert!(corpus.complaints().is_err());
        assert!(load_complaints(&corpus).is_empty());
        assert!(load_policies(&corpus).is_empty());
    }

    #[test]
    fn test_bad_entries_do_not_hide_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let complaints = dir.path().join("data.json");
        std::fs::write(
            &complaints,
            r#"[
                {"complaintTitle":"Pay:Low fares","name":"A","source":"app"},
                {"complaintTitle":"Safety:No cameras"},
                {"name":"B","desc":"no title here"},
                {"complaintTitle":"Pay:Late payouts","date":20240101}
            ]"#,
        )
        .unwrap();
        let corpus = JsonFileCorpus::new(&complaints, dir.path().join("policies.json"));

        let raw = load_raw_complaints(&corpus);
        assert_eq!(raw.len(), 4);
        assert_eq!(raw[0]["source"], "app");
        assert!(raw[1].get("name").is_none());

        let usable = load_complaints(&corpus);
        let titles: Vec<&str> = usable.iter().map(|c| c.title()).collect();
        assert_eq!(titles, vec!["Low fares", "No cameras", "Late payouts"]);
        assert_eq!(usable[2].date, "20240101");
    }

    #[test]
    fn test_malformed_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let complaints = dir.path().join("data.json");
        std::fs::write(&complaints, "{not json").unwrap();
        let corpus = JsonFileCorpus::new(&complaints, dir.path().join("policies.json"));
        assert!(load_complaints(&corpus).is_empty());
    }
}
