//! The reconciliation pass: refresh DBLP-sourced entries, lint the rest.
//!
//! Walks every entry in the store once. DBLP-sourced entries are re-fetched
//! from their record URL and merged back in when upstream differs; local
//! entries run through the normalizer. Nothing is persisted here — the
//! caller saves once at the end of the pass, and the store's dirty flag
//! decides whether that write happens at all.

use std::thread;
use std::time::Duration;

use crate::dblp::PublicationSource;
use crate::fetch::FETCH_THROTTLE;
use crate::report::Reporter;
use crate::store::{BibStore, UpsertOutcome};
use crate::{EntryOrigin, Result, bibtex, lint_entry};

/// Options for one reconciliation pass.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Skip all network refresh; linting still runs. Set for environments
    /// without network access such as automated pipelines.
    pub offline: bool,
    /// Pause between successive record fetches.
    pub throttle: Duration,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            offline: false,
            throttle: FETCH_THROTTLE,
        }
    }
}

/// Runs the pass over every entry currently in the store.
///
/// Per-entry fetch and parse failures are recorded and never abort the
/// pass. The store is mutated in memory only; call [`BibStore::save`]
/// afterwards.
pub fn run<S: PublicationSource>(
    store: &mut BibStore,
    source: &S,
    options: &ReconcileOptions,
    reporter: &mut Reporter,
) -> Result<()> {
    for key in store.keys() {
        let Some(entry) = store.get(&key) else {
            continue;
        };
        match entry.origin() {
            EntryOrigin::Dblp => {
                if options.offline {
                    reporter.offline_skip(&key);
                    continue;
                }
                let url = entry.get("url").unwrap_or_default().to_string();
                refresh_entry(store, source, &key, &url, reporter);
                thread::sleep(options.throttle);
            }
            EntryOrigin::Local => {
                let linted = lint_entry(entry);
                if store.replace(&key, linted) {
                    reporter.entry_linted(&key);
                }
            }
        }
    }
    Ok(())
}

/// Re-fetches one DBLP entry and merges it in when it changed upstream.
fn refresh_entry<S: PublicationSource>(
    store: &mut BibStore,
    source: &S,
    key: &str,
    url: &str,
    reporter: &mut Reporter,
) {
    let raw = match source.fetch_bibtex(url) {
        Ok(raw) => raw,
        Err(err) => {
            log::warn!("refresh failed for {key}: {err}");
            reporter.fetch_failed(key);
            return;
        }
    };
    match bibtex::parse_entry(&raw) {
        Ok(fresh) => {
            let fresh_key = fresh.key.clone();
            if store.upsert(fresh) != UpsertOutcome::Unchanged {
                reporter.entry_updated(&fresh_key);
            }
        }
        Err(err) => reporter.candidate_rejected(key, &err.to_string()),
    }
}
