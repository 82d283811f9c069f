//! Per-run progress reporting and tallying.
//!
//! A [`Reporter`] is constructed for one reconciliation or fetch run and
//! passed explicitly to the orchestrators; nothing here is global. It prints
//! human-readable progress lines, mirrors them to the `log` facade, and
//! keeps the counts the end-of-run summary is built from. Failures are
//! always listed by identifier, never silently dropped.

/// Collects and prints the outcome of one run.
#[derive(Debug, Default)]
pub struct Reporter {
    added: usize,
    updated: Vec<String>,
    linted: Vec<String>,
    failed: Vec<String>,
    skipped: Vec<String>,
}

impl Reporter {
    /// Creates a reporter for a single run.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn searching(&self, query: &str) {
        println!("Searching: '{query}'");
        log::info!("searching: {query}");
    }

    pub fn no_results(&self, query: &str) {
        println!("  no results found for '{query}'");
        log::info!("no results for: {query}");
    }

    pub fn search_failed(&self, query: &str, err: &crate::BibError) {
        println!("  search failed for '{query}': {err}");
        log::warn!("search failed for {query}: {err}");
    }

    pub fn entry_added(&mut self, key: &str) {
        self.added += 1;
        println!("  added: {key}");
        log::info!("added entry: {key}");
    }

    pub fn entry_updated(&mut self, key: &str) {
        self.updated.push(key.to_string());
        log::info!("updated DBLP entry: {key}");
    }

    pub fn entry_linted(&mut self, key: &str) {
        self.linted.push(key.to_string());
        log::info!("linted non-DBLP entry: {key}");
    }

    pub fn entry_skipped(&mut self, key: &str) {
        self.skipped.push(key.to_string());
        println!("  skipped duplicate: {key}");
        log::info!("skipped duplicate: {key}");
    }

    pub fn candidate_rejected(&mut self, id: &str, reason: &str) {
        self.failed.push(id.to_string());
        println!("  rejected {id}: {reason}");
        log::warn!("rejected candidate {id}: {reason}");
    }

    pub fn fetch_failed(&mut self, id: &str) {
        self.failed.push(id.to_string());
        println!("  fetch failed: {id}");
        log::warn!("fetch failed: {id}");
    }

    pub fn query_done(&self, query: &str, added: usize) {
        println!("  {added} new entries for '{query}'");
        log::info!("{added} new entries for: {query}");
    }

    pub fn offline_skip(&self, key: &str) {
        println!("[offline] skipping DBLP fetch for entry: {key}");
        log::info!("[offline] skipping DBLP fetch for entry: {key}");
    }

    pub fn filtered_by_year(&self, key: &str, year: &str) {
        log::debug!("filtered out {key} (year {year})");
    }

    /// Entries added this run.
    pub fn added_count(&self) -> usize {
        self.added
    }

    /// Keys whose upstream fetch ultimately failed, in encounter order.
    pub fn failed_keys(&self) -> &[String] {
        &self.failed
    }

    /// Keys updated from upstream this run.
    pub fn updated_keys(&self) -> &[String] {
        &self.updated
    }

    /// Keys rewritten by the linter this run.
    pub fn linted_keys(&self) -> &[String] {
        &self.linted
    }

    /// Keys skipped as pre-existing duplicates this run.
    pub fn skipped_keys(&self) -> &[String] {
        &self.skipped
    }

    /// Prints the end-of-run summary for a fetch pass.
    pub fn fetch_summary(&self) {
        println!("\nFetch complete. {} new entries added.", self.added);
        self.list_failures();
    }

    /// Prints the end-of-run summary for a reconciliation pass. `wrote`
    /// reports whether the store was persisted.
    pub fn sync_summary(&self, wrote: bool) {
        if wrote {
            println!("Updated .bib file written.");
            log::info!(
                "total entries updated: {}",
                self.updated.len() + self.linted.len()
            );
        } else {
            println!("No updates needed.");
            log::info!("no entries updated");
        }
        self.list_failures();
    }

    fn list_failures(&self) {
        if self.failed.is_empty() {
            return;
        }
        println!("Could not fetch {} entries from DBLP:", self.failed.len());
        for id in &self.failed {
            println!("   - {id}");
        }
    }
}
