//! A library and CLI for keeping a BibTeX bibliography in sync with DBLP.
//!
//! `bibsync` maintains a `references.bib` file by querying the DBLP search
//! service, fetching citation records in BibTeX format, and merging them into
//! the local file without ever introducing duplicate citation keys. Entries
//! that were not imported from DBLP are treated as locally authored: they are
//! never refreshed over the network, only normalized ("linted") into a
//! canonical field order.
//!
//! # Key Features
//!
//! - **Deduplicating store**: an ordered, key-indexed collection of entries
//!   with merge-on-upsert semantics and a dirty flag that suppresses
//!   unnecessary writes.
//! - **Reconciliation**: refresh previously-imported DBLP entries with fresh
//!   upstream data when it differs, lint everything else.
//! - **Config-driven fetching**: free-text queries and author searches with
//!   an inclusive year-range filter.
//! - **Polite networking**: bounded retries, fixed backoff, and a deliberate
//!   throttle between successive fetches.
//!
//! # Basic Usage
//!
//! ```rust
//! use bibsync::BibStore;
//! use bibsync::store::AppendOutcome;
//!
//! let mut store = BibStore::new();
//! let raw = "@article{smith20,\n    author = {J. Smith},\n    title = {An Example},\n}";
//!
//! assert!(matches!(store.append_if_new(raw).unwrap(), AppendOutcome::Added(_)));
//! assert!(store.contains("smith20"));
//!
//! // A second append with the same key is a reported no-op.
//! assert!(matches!(
//!     store.append_if_new(raw).unwrap(),
//!     AppendOutcome::Duplicate(_)
//! ));
//! ```
//!
//! # Diffing Entries
//!
//! Two entries are compared field-by-field over the union of their field
//! names, with surrounding whitespace trimmed and a missing field treated as
//! an empty string:
//!
//! ```rust
//! use bibsync::{Entry, entries_differ};
//!
//! let mut a = Entry::new("smith20", "article");
//! a.set("title", " An Example ");
//! let mut b = Entry::new("smith20", "article");
//! b.set("title", "An Example");
//!
//! assert!(!entries_differ(&a, &b));
//! ```
//!
//! # Error Handling
//!
//! The library uses a custom [`Result`] type that wraps [`BibError`] for
//! consistent error handling across all operations. Network and per-candidate
//! parse failures are recoverable and never abort a whole run; a malformed
//! store file or configuration file is fatal.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod bibtex;
pub mod config;
pub mod dblp;
pub mod diff;
pub mod fetch;
pub mod lint;
pub mod reconcile;
pub mod report;
pub mod store;

mod regex;

// Reexports
pub use config::FetchConfig;
pub use dblp::{DblpClient, PublicationSource, RetryPolicy};
pub use diff::entries_differ;
pub use lint::lint_entry;
pub use report::Reporter;
pub use store::BibStore;

/// A specialized Result type for bibliography operations.
pub type Result<T> = std::result::Result<T, BibError>;

/// Represents errors that can occur while maintaining a bibliography.
#[derive(Error, Debug)]
pub enum BibError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Entry has no citation key")]
    MissingKey,

    #[error("Duplicate citation key: {0}")]
    DuplicateKey(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Config error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for BibError {
    fn from(err: reqwest::Error) -> Self {
        BibError::Network(err.to_string())
    }
}

impl From<biblatex::ParseError> for BibError {
    fn from(err: biblatex::ParseError) -> Self {
        BibError::Parse(err.to_string())
    }
}

/// Classifies where an entry came from, which decides how it is reconciled.
///
/// DBLP-sourced entries are refreshed from upstream; local entries are only
/// ever linted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOrigin {
    /// Imported from DBLP (carries a `url` field pointing at dblp.org).
    Dblp,
    /// Authored or edited by hand.
    Local,
}

/// A single bibliography entry: a citation key, an entry type, and an
/// open-ended, insertion-ordered mapping of field names to values.
///
/// The field map deliberately has no fixed schema so that unknown BibTeX
/// fields survive a round trip. The order of the map is the order fields are
/// serialized in, which is why [`lint_entry`](crate::lint::lint_entry)
/// produces a new `Entry` rather than mutating in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// The citation key, unique within a store. Case-sensitive.
    pub key: String,
    /// The bibliographic type (`article`, `inproceedings`, ...).
    pub entry_type: String,
    /// All other fields, in serialization order.
    pub fields: IndexMap<String, String>,
}

impl Entry {
    /// Creates an empty entry with the given key and type.
    #[must_use]
    pub fn new(key: impl Into<String>, entry_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entry_type: entry_type.into(),
            fields: IndexMap::new(),
        }
    }

    /// Returns the value of a field, if present.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Sets a field value, preserving the field's position if it already
    /// exists and appending it otherwise.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Merge-updates this entry from another version of the same record.
    ///
    /// Fields present in `other` overwrite matching fields here; fields
    /// absent from `other` are left untouched. The entry type follows the
    /// incoming record.
    pub fn merge_from(&mut self, other: &Entry) {
        self.entry_type = other.entry_type.clone();
        for (name, value) in &other.fields {
            self.fields.insert(name.clone(), value.clone());
        }
    }

    /// Classifies this entry as DBLP-sourced or locally authored.
    pub fn origin(&self) -> EntryOrigin {
        match self.get("url") {
            Some(url) if url.contains("dblp.org") => EntryOrigin::Dblp,
            _ => EntryOrigin::Local,
        }
    }

    /// The publication year, when the `year` field holds a plain number.
    pub fn year(&self) -> Option<i32> {
        self.get("year")?.trim().parse().ok()
    }
}
