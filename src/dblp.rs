//! DBLP search and record-fetch client.
//!
//! Talks to the DBLP Search API (<https://dblp.org/search/publ/api>) and
//! fetches individual records as BibTeX via `Accept: application/x-bibtex`
//! content negotiation on the record URL.
//!
//! The [`PublicationSource`] trait is the seam the orchestrators program
//! against; [`DblpClient`] is the production implementation. All calls are
//! blocking and sequential. Individual record fetches run under an explicit
//! [`RetryPolicy`] rather than an ad-hoc loop.
//!
//! DBLP's JSON is shape-shifting in two places: a field that is a string for
//! one hit can be a list for another, and the author list collapses to a
//! single object for single-author publications. Both shapes are decoded
//! into explicit variants instead of being probed at runtime.

use std::fmt;
use std::thread;
use std::time::Duration;

use serde::Deserialize;

use crate::{BibError, Result};

/// The DBLP publication search endpoint.
pub const SEARCH_URL: &str = "https://dblp.org/search/publ/api";

/// Base URL record keys are appended to, forming the record-detail URL.
pub const RECORD_BASE_URL: &str = "https://dblp.org/rec/";

const BIBTEX_ACCEPT: &str = "application/x-bibtex";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounded retry for fetching one record's BibTeX text.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_secs(1),
        }
    }
}

/// The author field of a search hit, as DBLP shapes it: one author arrives
/// as a single object, several as a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitAuthors {
    Single(String),
    Multiple(Vec<String>),
}

impl fmt::Display for HitAuthors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HitAuthors::Single(name) => f.write_str(name),
            HitAuthors::Multiple(names) => f.write_str(&names.join(", ")),
        }
    }
}

/// One publication hit from a DBLP search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Stable DBLP record key, e.g. `conf/icse/0001LLW21`.
    pub key: String,
    pub title: String,
    pub authors: HitAuthors,
    /// Publication year as reported by DBLP; not guaranteed numeric.
    pub year: Option<String>,
    pub venue: Option<String>,
}

/// The search/fetch collaborator the orchestrators drive.
pub trait PublicationSource {
    /// Runs a search query, returning at most `limit` hits.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;

    /// Fetches the BibTeX text of one record, given its record-detail URL.
    fn fetch_bibtex(&self, url: &str) -> Result<String>;

    /// Builds the record-detail URL for a search hit's key.
    fn record_url(&self, key: &str) -> String {
        format!("{RECORD_BASE_URL}{key}")
    }
}

// --- DBLP API response structures ---

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: SearchResult,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    /// Absent entirely when a query has no results.
    #[serde(default)]
    hit: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    info: Option<RawInfo>,
}

#[derive(Debug, Deserialize)]
struct RawInfo {
    key: Option<String>,
    title: Option<StringOrSeq>,
    authors: Option<RawAuthors>,
    year: Option<String>,
    venue: Option<StringOrSeq>,
}

#[derive(Debug, Deserialize)]
struct RawAuthors {
    #[serde(default)]
    author: RawAuthorField,
}

/// DBLP sends one author as an object, several as an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAuthorField {
    Single(StringOrStruct),
    Multiple(Vec<StringOrStruct>),
}

impl Default for RawAuthorField {
    fn default() -> Self {
        RawAuthorField::Multiple(Vec::new())
    }
}

/// An author is sometimes a bare name, sometimes an object with a `text`
/// field next to metadata like `@pid`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringOrStruct {
    String(String),
    Struct { text: String },
}

impl StringOrStruct {
    fn into_name(self) -> String {
        match self {
            StringOrStruct::String(s) => s,
            StringOrStruct::Struct { text } => text,
        }
    }
}

/// A field that is a plain string for one hit and a list for another.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringOrSeq {
    String(String),
    Seq(Vec<String>),
}

impl StringOrSeq {
    fn join(self, sep: &str) -> String {
        match self {
            StringOrSeq::String(s) => s,
            StringOrSeq::Seq(list) => list.join(sep),
        }
    }
}

impl RawInfo {
    /// Flattens a raw hit into a [`SearchHit`]; hits without a record key
    /// are unusable (no record URL can be built) and dropped.
    fn into_hit(self) -> Option<SearchHit> {
        let key = self.key?;
        let title = self.title.map(|t| t.join(" ")).unwrap_or_default();
        let authors = match self.authors.map(|a| a.author) {
            Some(RawAuthorField::Single(author)) => HitAuthors::Single(author.into_name()),
            Some(RawAuthorField::Multiple(list)) => {
                HitAuthors::Multiple(list.into_iter().map(StringOrStruct::into_name).collect())
            }
            None => HitAuthors::Multiple(Vec::new()),
        };
        Some(SearchHit {
            key,
            title,
            authors,
            year: self.year,
            venue: self.venue.map(|v| v.join(", ")),
        })
    }
}

/// Blocking DBLP client with a fixed request timeout.
#[derive(Debug, Clone)]
pub struct DblpClient {
    http: reqwest::blocking::Client,
    search_url: String,
    record_base: String,
    retry: RetryPolicy,
}

impl DblpClient {
    /// Creates a client against the public DBLP endpoints.
    pub fn new() -> Result<Self> {
        Self::with_base_urls(SEARCH_URL, RECORD_BASE_URL)
    }

    /// Creates a client against custom endpoints. Used by tests to point at
    /// a local mock server.
    pub fn with_base_urls(
        search_url: impl Into<String>,
        record_base: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            search_url: search_url.into(),
            record_base: record_base.into(),
            retry: RetryPolicy::default(),
        })
    }

    /// Overrides the per-record retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn fetch_once(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, BIBTEX_ACCEPT)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(BibError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text()?.trim().to_string())
    }
}

impl PublicationSource for DblpClient {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        log::debug!("searching DBLP: q={query:?} h={limit}");
        let limit_param = limit.to_string();
        let response = self
            .http
            .get(&self.search_url)
            .query(&[("q", query), ("format", "json"), ("h", limit_param.as_str())])
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(BibError::Status {
                url: self.search_url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text()?;
        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|err| BibError::Parse(format!("DBLP search response: {err}")))?;

        Ok(parsed
            .result
            .hits
            .hit
            .into_iter()
            .filter_map(|hit| hit.info)
            .filter_map(RawInfo::into_hit)
            .collect())
    }

    fn fetch_bibtex(&self, url: &str) -> Result<String> {
        let mut last_err = BibError::Network("no fetch attempts were made".to_string());
        for attempt in 1..=self.retry.max_attempts {
            match self.fetch_once(url) {
                Ok(text) => return Ok(text),
                Err(err) => {
                    log::warn!(
                        "fetch attempt {attempt}/{} failed for {url}: {err}",
                        self.retry.max_attempts
                    );
                    last_err = err;
                    if attempt < self.retry.max_attempts {
                        thread::sleep(self.retry.backoff);
                    }
                }
            }
        }
        Err(last_err)
    }

    fn record_url(&self, key: &str) -> String {
        format!("{}{}", self.record_base, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use pretty_assertions::assert_eq;

    fn client_for(server: &Server) -> DblpClient {
        DblpClient::with_base_urls(
            format!("{}/search/publ/api", server.url()),
            format!("{}/rec/", server.url()),
        )
        .unwrap()
        .with_retry_policy(RetryPolicy {
            max_attempts: 2,
            backoff: Duration::ZERO,
        })
    }

    #[test]
    fn test_author_field_decodes_single_object() {
        let raw: RawInfo = serde_json::from_str(
            r#"{
                "key": "conf/x/Solo21",
                "title": "Solo Work",
                "authors": {"author": {"@pid": "1/1", "text": "Ada Lovelace"}},
                "year": "2021"
            }"#,
        )
        .unwrap();
        let hit = raw.into_hit().unwrap();
        assert_eq!(hit.authors, HitAuthors::Single("Ada Lovelace".to_string()));
        assert_eq!(hit.authors.to_string(), "Ada Lovelace");
    }

    #[test]
    fn test_author_field_decodes_list_of_objects_and_strings() {
        let raw: RawInfo = serde_json::from_str(
            r#"{
                "key": "conf/x/Pair21",
                "title": "Joint Work",
                "authors": {"author": [{"text": "Ada Lovelace"}, "Charles Babbage"]},
                "year": "2021"
            }"#,
        )
        .unwrap();
        let hit = raw.into_hit().unwrap();
        assert_eq!(
            hit.authors,
            HitAuthors::Multiple(vec![
                "Ada Lovelace".to_string(),
                "Charles Babbage".to_string()
            ])
        );
        assert_eq!(hit.authors.to_string(), "Ada Lovelace, Charles Babbage");
    }

    #[test]
    fn test_hit_without_key_is_dropped() {
        let raw: RawInfo = serde_json::from_str(r#"{"title": "No Key"}"#).unwrap();
        assert!(raw.into_hit().is_none());
    }

    #[test]
    fn test_search_parses_hits() {
        let mut server = Server::new();
        let body = r#"{
            "result": {
                "hits": {
                    "hit": [
                        {"info": {"key": "conf/icse/A21", "title": "First", "year": "2021",
                                  "authors": {"author": {"text": "A. Author"}}}},
                        {"info": {"key": "journals/x/B19", "title": "Second", "year": "2019",
                                  "venue": "J. Examples",
                                  "authors": {"author": [{"text": "B. One"}, {"text": "B. Two"}]}}},
                        {"info": {"title": "Keyless, dropped"}},
                        {}
                    ]
                }
            }
        }"#;
        let mock = server
            .mock("GET", "/search/publ/api")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body)
            .create();

        let hits = client_for(&server).search("example", 10).unwrap();
        mock.assert();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].key, "conf/icse/A21");
        assert_eq!(hits[0].year.as_deref(), Some("2021"));
        assert_eq!(hits[1].venue.as_deref(), Some("J. Examples"));
    }

    #[test]
    fn test_search_with_no_results_yields_empty_list() {
        let mut server = Server::new();
        let _mock = server
            .mock("GET", "/search/publ/api")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"result": {"hits": {}}}"#)
            .create();

        let hits = client_for(&server).search("nothing", 5).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_fetch_bibtex_trims_body() {
        let mut server = Server::new();
        let _mock = server
            .mock("GET", "/rec/conf/icse/A21")
            .with_status(200)
            .with_body("\n@article{DBLP:conf/icse/A21,\n    title = {First},\n}\n")
            .create();

        let client = client_for(&server);
        let url = client.record_url("conf/icse/A21");
        let text = client.fetch_bibtex(&url).unwrap();
        assert!(text.starts_with("@article{DBLP:conf/icse/A21,"));
        assert!(text.ends_with('}'));
    }

    #[test]
    fn test_fetch_bibtex_retries_then_reports_status() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/rec/conf/icse/Gone")
            .with_status(503)
            .expect(2)
            .create();

        let client = client_for(&server);
        let url = client.record_url("conf/icse/Gone");
        let err = client.fetch_bibtex(&url).unwrap_err();
        mock.assert();

        match err {
            BibError::Status { status, .. } => assert_eq!(status, 503),
            other => panic!("expected status error, got {other:?}"),
        }
    }

}
