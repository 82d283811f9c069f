//! The deduplicating bibliography store.
//!
//! A [`BibStore`] owns the persistent collection of entries: an ordered list
//! with an index by citation key, loaded from a `.bib` file at startup and
//! written back only when something actually changed. Key uniqueness is the
//! store's invariant; the two mutation paths guard it differently:
//!
//! - [`BibStore::append_if_new`] treats an existing key as terminal and skips
//!   the candidate. This is the guard for search-driven additions.
//! - [`BibStore::upsert`] merges the candidate into the existing entry when
//!   the two versions differ. This is the batch-refresh path.
//!
//! [`BibStore::save`] rewrites the whole collection sorted by key so that
//! repeated runs produce stable diffs; [`append_raw_entry`] is the
//! lighter-weight path that appends one fetched entry to the file without
//! touching the rest.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use itertools::Itertools;

use crate::{BibError, Entry, Result, bibtex, entries_differ};

/// What [`BibStore::upsert`] did with a candidate entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The key was new; the entry was inserted.
    Inserted,
    /// The key existed and the candidate differed; fields were merged in.
    Updated,
    /// The key existed and the candidate was semantically identical.
    Unchanged,
}

/// What [`BibStore::append_if_new`] did with a raw candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The entry was added under the contained key.
    Added(String),
    /// The key already exists; the candidate was discarded.
    Duplicate(String),
    /// No `@<type>{<key>,` header could be found in the raw text.
    NoKey,
}

/// An ordered, key-indexed collection of bibliography entries with a dirty
/// flag tracking whether anything changed since load.
#[derive(Debug, Default)]
pub struct BibStore {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    dirty: bool,
}

impl BibStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a store from a `.bib` file.
    ///
    /// A missing file is a first run and yields an empty store. Malformed
    /// text is fatal ([`BibError::Parse`]), as is a file that already
    /// contains two entries with the same key ([`BibError::DuplicateKey`]):
    /// the store would be unusable either way.
    pub fn load(path: &Path) -> Result<Self> {
        let mut store = Self::new();
        if !path.exists() {
            return Ok(store);
        }

        let text = fs::read_to_string(path)?;
        for entry in bibtex::parse(&text)? {
            if store.contains(&entry.key) {
                return Err(BibError::DuplicateKey(entry.key));
            }
            store.index.insert(entry.key.clone(), store.entries.len());
            store.entries.push(entry);
        }
        Ok(store)
    }

    /// Number of entries in the store.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any mutation occurred since load.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether an entry with this key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Looks up an entry by key.
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.index.get(key).map(|&pos| &self.entries[pos])
    }

    /// Iterates entries in store order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// The keys of all entries, in store order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key.clone()).collect()
    }

    /// Inserts a new entry or merges a changed candidate into the existing
    /// one, keyed by the candidate's own key.
    ///
    /// The dirty flag is only set when an insertion happened or the candidate
    /// actually differed, so refreshing with identical upstream data never
    /// triggers a write.
    pub fn upsert(&mut self, entry: Entry) -> UpsertOutcome {
        match self.index.get(&entry.key) {
            Some(&pos) => {
                let existing = &mut self.entries[pos];
                if entries_differ(existing, &entry) {
                    existing.merge_from(&entry);
                    self.dirty = true;
                    UpsertOutcome::Updated
                } else {
                    UpsertOutcome::Unchanged
                }
            }
            None => {
                self.index.insert(entry.key.clone(), self.entries.len());
                self.entries.push(entry);
                self.dirty = true;
                UpsertOutcome::Inserted
            }
        }
    }

    /// Replaces the stored entry under `key` with a new version, but only
    /// when the new version is semantically different.
    ///
    /// Used by the lint path, where the replacement may carry a new field
    /// order: a reordering alone never counts as a change, so it neither
    /// swaps the entry nor dirties the store. Returns whether a replacement
    /// happened. A missing key is a no-op.
    pub fn replace(&mut self, key: &str, entry: Entry) -> bool {
        match self.index.get(key) {
            Some(&pos) if entries_differ(&self.entries[pos], &entry) => {
                self.entries[pos] = entry;
                self.dirty = true;
                true
            }
            _ => false,
        }
    }

    /// Parses the key out of `raw` and appends the entry when the key is not
    /// already present.
    ///
    /// The key is extracted from the leading `@<type>{<key>,` header; raw
    /// text without such a header is rejected with [`AppendOutcome::NoKey`]
    /// and an existing key with [`AppendOutcome::Duplicate`] — in both cases
    /// the store is unchanged. Unlike [`BibStore::upsert`] this never merges.
    /// Malformed entry bodies surface as a parse error for the caller to
    /// record; they are not fatal to a batch.
    pub fn append_if_new(&mut self, raw: &str) -> Result<AppendOutcome> {
        let Some(key) = bibtex::extract_key(raw) else {
            return Ok(AppendOutcome::NoKey);
        };
        if self.contains(key) {
            return Ok(AppendOutcome::Duplicate(key.to_string()));
        }

        let entry = bibtex::parse_entry(raw)?;
        let key = entry.key.clone();
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push(entry);
        self.dirty = true;
        Ok(AppendOutcome::Added(key))
    }

    /// Writes the collection back to `path`, but only if something changed.
    ///
    /// Entries are serialized sorted by key ascending, separated by blank
    /// lines, each field in the order its entry carries. Returns whether a
    /// write happened.
    pub fn save(&mut self, path: &Path) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }

        let body = self
            .entries
            .iter()
            .sorted_by(|a, b| a.key.cmp(&b.key))
            .map(bibtex::format_entry)
            .join("\n\n");

        if body.is_empty() {
            fs::write(path, "")?;
        } else {
            fs::write(path, format!("{body}\n"))?;
        }
        self.dirty = false;
        Ok(true)
    }
}

/// Appends one raw BibTeX entry to the file at `path`, separated from
/// existing content by two newlines. Creates the file when missing.
///
/// This is the durable half of the append path: the in-memory guard is
/// [`BibStore::append_if_new`], the file write is this.
pub fn append_raw_entry(path: &Path, raw: &str) -> Result<()> {
    let existing = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    if existing > 0 {
        write!(file, "\n\n{}", raw.trim())?;
    } else {
        write!(file, "{}", raw.trim())?;
    }
    Ok(())
}
