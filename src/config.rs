//! Configuration for the batch-fetch pass.
//!
//! Read from a JSON file (`dblp_config.json` by convention). A missing or
//! malformed file is fatal at startup; defaults only fill in omitted keys of
//! an otherwise valid file.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::{BibError, Result};

fn default_max_results() -> usize {
    3
}

/// Queries and filters driving a `fetch` run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FetchConfig {
    /// Free-text search queries.
    #[serde(default)]
    pub queries: Vec<String>,
    /// Author names, searched as `author:"<name>"`.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Hit cap per free-text query.
    #[serde(default = "default_max_results")]
    pub max_results_per_query: usize,
    /// Hit cap per author search.
    #[serde(default = "default_max_results")]
    pub max_results_per_author: usize,
    /// Inclusive lower bound on publication year (author strategy only).
    #[serde(default)]
    pub year_min: Option<i32>,
    /// Inclusive upper bound on publication year (author strategy only).
    #[serde(default)]
    pub year_max: Option<i32>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            queries: Vec::new(),
            authors: Vec::new(),
            max_results_per_query: default_max_results(),
            max_results_per_author: default_max_results(),
            year_min: None,
            year_max: None,
        }
    }
}

impl FetchConfig {
    /// Loads the configuration file, failing on a missing or malformed file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|err| {
            BibError::Config(format!("cannot read {}: {err}", path.display()))
        })?;
        serde_json::from_str(&text)
            .map_err(|err| BibError::Config(format!("cannot parse {}: {err}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dblp_config.json");
        fs::write(
            &path,
            r#"{
                "queries": ["shadow paging", "log-structured merge"],
                "authors": ["Jane Doe"],
                "max_results_per_query": 5,
                "max_results_per_author": 10,
                "year_min": 2018,
                "year_max": 2024
            }"#,
        )
        .unwrap();

        let config = FetchConfig::load(&path).unwrap();
        assert_eq!(config.queries.len(), 2);
        assert_eq!(config.authors, vec!["Jane Doe".to_string()]);
        assert_eq!(config.max_results_per_query, 5);
        assert_eq!(config.max_results_per_author, 10);
        assert_eq!(config.year_min, Some(2018));
        assert_eq!(config.year_max, Some(2024));
    }

    #[test]
    fn test_omitted_keys_take_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dblp_config.json");
        fs::write(&path, r#"{"queries": ["one"]}"#).unwrap();

        let config = FetchConfig::load(&path).unwrap();
        assert_eq!(config.max_results_per_query, 3);
        assert!(config.authors.is_empty());
        assert_eq!(config.year_min, None);
    }

    #[test]
    fn test_missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = FetchConfig::load(&dir.path().join("nope.json"));
        assert!(matches!(result, Err(BibError::Config(_))));
    }

    #[test]
    fn test_malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dblp_config.json");
        fs::write(&path, "queries: [not json]").unwrap();
        assert!(matches!(FetchConfig::load(&path), Err(BibError::Config(_))));
    }
}
