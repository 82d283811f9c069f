//! BibTeX parsing and serialization.
//!
//! Parsing is delegated to the `biblatex` crate; this module flattens its
//! chunk-based field values into the plain string mapping the rest of the
//! crate works with, and owns the deterministic serialization format written
//! back to disk.
//!
//! # Example
//!
//! ```
//! use bibsync::bibtex;
//!
//! let raw = "@article{smith20,\n    author = {J. Smith},\n    title = {An Example},\n}";
//! let entry = bibtex::parse_entry(raw).unwrap();
//! assert_eq!(entry.key, "smith20");
//! assert_eq!(entry.get("author"), Some("J. Smith"));
//! ```

use std::sync::LazyLock;

use biblatex::{Bibliography, Chunk, Spanned};

use crate::regex::Regex;
use crate::{BibError, Entry, Result};

/// Matches the leading `@<type>{<key>,` header of a BibTeX entry.
static ENTRY_HEADER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@\w+\{([^,]+),").unwrap());

/// Extracts the citation key from the leading entry header of `raw`.
///
/// Returns `None` when the text does not start with a `@<type>{<key>,`
/// header. This is the sole key-extraction mechanism for the append-path
/// duplicate guard, so the header pattern must match byte-for-byte what
/// BibTeX tooling writes.
pub fn extract_key(raw: &str) -> Option<&str> {
    ENTRY_HEADER_REGEX
        .captures(raw.trim_start())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|key| !key.is_empty())
}

/// Parses a string of concatenated BibTeX entries.
///
/// Entries are returned in file order. An entry without a citation key is a
/// [`BibError::MissingKey`]; malformed input is a [`BibError::Parse`].
pub fn parse(input: &str) -> Result<Vec<Entry>> {
    let bibliography = Bibliography::parse(input)?;

    let mut entries = Vec::new();
    for parsed in bibliography.iter() {
        if parsed.key.trim().is_empty() {
            return Err(BibError::MissingKey);
        }
        let mut entry = Entry::new(parsed.key.clone(), parsed.entry_type.to_string());
        for (name, value) in &parsed.fields {
            entry.set(name.clone(), chunks_to_string(value));
        }
        entries.push(entry);
    }
    Ok(entries)
}

/// Parses raw text expected to contain exactly one BibTeX entry, as returned
/// by a record fetch.
///
/// Additional entries after the first are ignored; an input with no entries
/// at all is a parse error.
pub fn parse_entry(input: &str) -> Result<Entry> {
    parse(input)?
        .into_iter()
        .next()
        .ok_or_else(|| BibError::Parse("input contains no BibTeX entry".to_string()))
}

/// Serializes an entry in the canonical on-disk format.
///
/// Fields are written in the order the entry carries them, one per line with
/// four-space indentation and brace-delimited values. No trailing newline.
pub fn format_entry(entry: &Entry) -> String {
    let mut out = format!("@{}{{{},\n", entry.entry_type, entry.key);
    for (name, value) in &entry.fields {
        out.push_str(&format!("    {} = {{{}}},\n", name, value));
    }
    out.push('}');
    out
}

/// Flattens biblatex chunks into a plain string.
fn chunks_to_string(chunks: &[Spanned<Chunk>]) -> String {
    chunks
        .iter()
        .map(|chunk| match &chunk.v {
            Chunk::Normal(s) => s.as_str(),
            Chunk::Verbatim(s) => s.as_str(),
            Chunk::Math(s) => s.as_str(),
        })
        .collect::<Vec<_>>()
        .join("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case("@article{smith20,\n  title = {X},\n}", Some("smith20"))]
    #[case("  \n@inproceedings{DBLP:conf/icse/0001LLW21,", Some("DBLP:conf/icse/0001LLW21"))]
    #[case("@misc{key-with-dash,", Some("key-with-dash"))]
    #[case("no header at all", None)]
    #[case("title = {X}\n@article{late,", None)]
    #[case("@article{,", None)]
    #[case("", None)]
    fn test_extract_key(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(extract_key(raw), expected);
    }

    #[test]
    fn test_parse_single_entry() {
        let raw = "@article{test, author = {John Smith}, title = {Example}, year = {2020}, journal = {Test Journal}}";
        let entry = parse_entry(raw).unwrap();
        assert_eq!(entry.key, "test");
        assert_eq!(entry.entry_type, "article");
        assert_eq!(entry.get("author"), Some("John Smith"));
        assert_eq!(entry.get("title"), Some("Example"));
        assert_eq!(entry.get("year"), Some("2020"));
        assert_eq!(entry.get("journal"), Some("Test Journal"));
    }

    #[test]
    fn test_parse_multiple_entries_in_file_order() {
        let raw = "@article{beta21,\n    title = {Second},\n}\n\n@article{alpha19,\n    title = {First},\n}";
        let entries = parse(raw).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "beta21");
        assert_eq!(entries[1].key, "alpha19");
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_entry_rejects_entryless_input() {
        let result = parse_entry("just some prose, no entries");
        assert!(matches!(result, Err(BibError::Parse(_))));
    }

    #[test]
    fn test_format_entry_writes_fields_in_carried_order() {
        let mut entry = Entry::new("smith20", "article");
        entry.set("author", "J. Smith");
        entry.set("title", "An Example");
        entry.set("year", "2020");

        let formatted = format_entry(&entry);
        assert_eq!(
            formatted,
            "@article{smith20,\n    author = {J. Smith},\n    title = {An Example},\n    year = {2020},\n}"
        );
    }

    #[test]
    fn test_format_then_parse_round_trip() {
        let mut entry = Entry::new("doe22", "inproceedings");
        entry.set("author", "Jane Doe");
        entry.set("booktitle", "Proc. of Things");
        entry.set("pages", "1-10");

        let reparsed = parse_entry(&format_entry(&entry)).unwrap();
        assert_eq!(reparsed.key, "doe22");
        assert_eq!(reparsed.entry_type, "inproceedings");
        assert_eq!(reparsed.get("author"), Some("Jane Doe"));
        assert_eq!(reparsed.get("booktitle"), Some("Proc. of Things"));
        assert_eq!(reparsed.get("pages"), Some("1-10"));
    }
}
