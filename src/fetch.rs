//! Search-driven fetch orchestration.
//!
//! Drives a [`PublicationSource`] under the free-text-query and author
//! strategies (plus the interactive selection path), feeding each fetched
//! candidate through the store's duplicate guard and appending accepted
//! entries durably to the `.bib` file.
//!
//! Each candidate is independent: a failed fetch or a rejected body is
//! recorded against the run and processing continues with the next one. A
//! fixed throttle runs between successive record fetches to respect DBLP's
//! usage expectations.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::dblp::{PublicationSource, SearchHit};
use crate::report::Reporter;
use crate::store::{self, AppendOutcome, BibStore};
use crate::{FetchConfig, Result};

/// Pause between successive record fetches.
pub const FETCH_THROTTLE: Duration = Duration::from_millis(1200);

/// Orchestrates search-and-add runs against one store and one source.
pub struct Fetcher<'a, S: PublicationSource> {
    source: &'a S,
    store: &'a mut BibStore,
    bib_path: PathBuf,
    throttle: Duration,
}

impl<'a, S: PublicationSource> Fetcher<'a, S> {
    /// Creates a fetcher that appends accepted entries to `bib_path`.
    pub fn new(source: &'a S, store: &'a mut BibStore, bib_path: &Path) -> Self {
        Self {
            source,
            store,
            bib_path: bib_path.to_path_buf(),
            throttle: FETCH_THROTTLE,
        }
    }

    /// Overrides the inter-fetch throttle. Tests use [`Duration::ZERO`].
    #[must_use]
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    /// Runs every query and every author search from the configuration.
    pub fn run(&mut self, config: &FetchConfig, reporter: &mut Reporter) -> Result<()> {
        for query in &config.queries {
            self.run_query(query, config.max_results_per_query, reporter)?;
        }
        for author in &config.authors {
            self.run_author(
                author,
                config.max_results_per_author,
                config.year_min,
                config.year_max,
                reporter,
            )?;
        }
        Ok(())
    }

    /// Free-text query strategy: search, then fetch-and-add every hit.
    pub fn run_query(
        &mut self,
        query: &str,
        limit: usize,
        reporter: &mut Reporter,
    ) -> Result<()> {
        reporter.searching(query);
        let hits = match self.source.search(query, limit) {
            Ok(hits) => hits,
            Err(err) => {
                reporter.search_failed(query, &err);
                return Ok(());
            }
        };
        if hits.is_empty() {
            reporter.no_results(query);
            return Ok(());
        }
        let before = reporter.added_count();
        for hit in &hits {
            self.fetch_and_add(hit, reporter)?;
        }
        reporter.query_done(query, reporter.added_count() - before);
        Ok(())
    }

    /// Author strategy: qualified search plus an inclusive year-range filter.
    ///
    /// A hit whose year is absent or non-numeric always passes the filter.
    pub fn run_author(
        &mut self,
        author: &str,
        limit: usize,
        year_min: Option<i32>,
        year_max: Option<i32>,
        reporter: &mut Reporter,
    ) -> Result<()> {
        let query = format!("author:\"{author}\"");
        reporter.searching(&query);
        let hits = match self.source.search(&query, limit) {
            Ok(hits) => hits,
            Err(err) => {
                reporter.search_failed(&query, &err);
                return Ok(());
            }
        };
        if hits.is_empty() {
            reporter.no_results(&query);
            return Ok(());
        }
        let before = reporter.added_count();
        for hit in &hits {
            if !within_year_range(hit, year_min, year_max) {
                reporter.filtered_by_year(&hit.key, hit.year.as_deref().unwrap_or(""));
                continue;
            }
            self.fetch_and_add(hit, reporter)?;
        }
        reporter.query_done(&query, reporter.added_count() - before);
        Ok(())
    }

    /// Interactive path: fetch-and-add the hits picked by index.
    pub fn add_selection(
        &mut self,
        hits: &[SearchHit],
        indexes: &[usize],
        reporter: &mut Reporter,
    ) -> Result<()> {
        for &index in indexes {
            match hits.get(index) {
                Some(hit) => self.fetch_and_add(hit, reporter)?,
                None => reporter.candidate_rejected(&index.to_string(), "no such result"),
            }
        }
        Ok(())
    }

    /// Fetches one hit's BibTeX and runs it through the duplicate guard.
    ///
    /// Network and parse failures are recorded per candidate and never abort
    /// the batch; only a failed write of the `.bib` file itself propagates.
    fn fetch_and_add(&mut self, hit: &SearchHit, reporter: &mut Reporter) -> Result<()> {
        let url = self.source.record_url(&hit.key);
        match self.source.fetch_bibtex(&url) {
            Ok(raw) => match self.store.append_if_new(&raw) {
                Ok(AppendOutcome::Added(key)) => {
                    store::append_raw_entry(&self.bib_path, &raw)?;
                    reporter.entry_added(&key);
                }
                Ok(AppendOutcome::Duplicate(key)) => reporter.entry_skipped(&key),
                Ok(AppendOutcome::NoKey) => {
                    reporter.candidate_rejected(&hit.key, "no citation key in fetched BibTeX");
                }
                Err(err) => reporter.candidate_rejected(&hit.key, &err.to_string()),
            },
            Err(_) => reporter.fetch_failed(&hit.key),
        }
        thread::sleep(self.throttle);
        Ok(())
    }
}

/// Inclusive year-range filter, failing open when the year is unusable.
fn within_year_range(hit: &SearchHit, year_min: Option<i32>, year_max: Option<i32>) -> bool {
    let Some(year_raw) = hit.year.as_deref() else {
        return true;
    };
    let Ok(year) = year_raw.trim().parse::<i32>() else {
        return true;
    };
    year_min.map_or(true, |min| year >= min) && year_max.map_or(true, |max| year <= max)
}
