//! Record sources: the boundary to the external metadata store.
//!
//! Failing to fetch is the only fatal outcome of a run and happens before any
//! graph work.

use crate::store::KeyRecord;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read key records from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed key records: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Supplies the full key-record snapshot for one run.
pub trait RecordSource {
    fn fetch(&self) -> Result<Vec<KeyRecord>, SourceError>;
}

/// Reads a JSON array of key records from disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    fund_id: Option<String>,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), fund_id: None }
    }

    /// Keep only the records of one fund.
    pub fn for_fund(mut self, fund_id: impl Into<String>) -> Self {
        self.fund_id = Some(fund_id.into());
        self
    }

    pub fn path(&self) -> &Path { &self.path }
}

impl RecordSource for JsonFileSource {
    fn fetch(&self) -> Result<Vec<KeyRecord>, SourceError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        let mut records = parse_records(&content)?;

        if let Some(fund) = &self.fund_id {
            records.retain(|r| &r.fund_id == fund);
            debug!(fund = %fund, kept = records.len(), "Filtered records by fund");
        }

        info!(path = ?self.path, records = records.len(), "Key records loaded");
        Ok(records)
    }
}

/// An already materialized snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<KeyRecord>,
}

impl MemorySource {
    pub fn new(records: Vec<KeyRecord>) -> Self { Self { records } }
}

impl RecordSource for MemorySource {
    fn fetch(&self) -> Result<Vec<KeyRecord>, SourceError> {
        Ok(self.records.clone())
    }
}

pub fn parse_records(json: &str) -> Result<Vec<KeyRecord>, SourceError> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const RECORDS: &str = r#"[
        {"fund_id": "F1", "datagroup_id": "DG1", "key": "K1", "full_key": "F1!DG1!K1!current",
         "calculation_level": 0, "is_current": true, "formula": null},
        {"fund_id": "F2", "datagroup_id": "DG1", "key": "K2", "full_key": "F2!DG1!K2!pf",
         "calculation_level": 1, "is_current": false, "formula": "\"DG1\"!\"K1\"!\"current\""}
    ]"#;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_json_file_source_reads_and_filters() {
        let file = write_temp(RECORDS);

        let all = JsonFileSource::new(file.path()).fetch().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].formula.as_deref(), Some(r#""DG1"!"K1"!"current""#));

        let f2 = JsonFileSource::new(file.path()).for_fund("F2").fetch().unwrap();
        assert_eq!(f2.len(), 1);
        assert_eq!(f2[0].full_key, "F2!DG1!K2!pf");
    }

    #[test]
    fn test_formula_field_may_be_omitted() {
        let records = parse_records(
            r#"[{"fund_id": "F", "datagroup_id": "D", "key": "K", "full_key": "F!D!K!pf",
                 "calculation_level": 0, "is_current": false}]"#,
        ).unwrap();
        assert_eq!(records[0].formula, None);
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonFileSource::new(dir.path().join("absent.json")).fetch().unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[test]
    fn test_negative_level_is_rejected() {
        let err = parse_records(
            r#"[{"fund_id": "F", "datagroup_id": "D", "key": "K", "full_key": "F!D!K!pf",
                 "calculation_level": -1, "is_current": false}]"#,
        ).unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }
}
