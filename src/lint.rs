//! Normalization ("linting") of locally-authored entries.
//!
//! Linting rewrites an entry's field order into a fixed preferred sequence so
//! that hand-edited entries serialize consistently and diffs stay stable.
//! Field values are preserved verbatim except for stray wrapping quotes left
//! behind by permissive parsers.
//!
//! Ordering has no effect on entry equality (see [`crate::diff`]); it only
//! affects serialized output.

use itertools::Itertools;

use crate::Entry;

/// The preferred leading field order for serialized entries. Any remaining
/// fields follow in lexicographic order of their names.
pub const PREFERRED_FIELD_ORDER: [&str; 10] = [
    "author",
    "title",
    "journal",
    "booktitle",
    "year",
    "volume",
    "number",
    "pages",
    "doi",
    "url",
];

/// Produces a normalized copy of an entry.
///
/// The result has the same field set with values preserved, reordered to
/// [`PREFERRED_FIELD_ORDER`] followed by all other fields sorted by name.
/// This is a pure function: same input, same output, no failure mode.
#[must_use]
pub fn lint_entry(entry: &Entry) -> Entry {
    let mut linted = Entry::new(entry.key.clone(), entry.entry_type.clone());

    for name in PREFERRED_FIELD_ORDER {
        if let Some(value) = entry.get(name) {
            linted.set(name, strip_quote_artifacts(value));
        }
    }

    for name in entry.fields.keys().sorted() {
        if !linted.fields.contains_key(name) {
            linted.set(name.clone(), strip_quote_artifacts(&entry.fields[name]));
        }
    }

    linted
}

/// Removes wrapping double-quote pairs a permissive parser may have left
/// around a field value. Interior quotes are untouched.
fn strip_quote_artifacts(value: &str) -> String {
    let mut stripped = value.trim();
    while stripped.len() >= 2 && stripped.starts_with('"') && stripped.ends_with('"') {
        stripped = stripped[1..stripped.len() - 1].trim();
    }
    stripped.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn field_names(entry: &Entry) -> Vec<&str> {
        entry.fields.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_preferred_fields_lead_in_order() {
        let mut entry = Entry::new("test", "article");
        entry.set("doi", "10.1000/x");
        entry.set("author", "Smith, John");
        entry.set("year", "2020");
        entry.set("title", "Test Title");

        let linted = lint_entry(&entry);
        assert_eq!(field_names(&linted), vec!["author", "title", "year", "doi"]);
    }

    #[test]
    fn test_unknown_fields_follow_lexicographically() {
        let mut entry = Entry::new("test", "article");
        entry.set("publisher", "ACM");
        entry.set("title", "Test Title");
        entry.set("abstract", "Some abstract");
        entry.set("month", "jan");

        let linted = lint_entry(&entry);
        assert_eq!(
            field_names(&linted),
            vec!["title", "abstract", "month", "publisher"]
        );
    }

    #[test]
    fn test_values_and_field_set_preserved() {
        let mut entry = Entry::new("test", "article");
        entry.set("title", "Spaces  inside are kept");
        entry.set("note", "a {braced} remark");

        let linted = lint_entry(&entry);
        assert_eq!(linted.key, "test");
        assert_eq!(linted.entry_type, "article");
        assert_eq!(linted.fields.len(), entry.fields.len());
        assert_eq!(linted.get("title"), Some("Spaces  inside are kept"));
        assert_eq!(linted.get("note"), Some("a {braced} remark"));
    }

    #[rstest]
    #[case("\"Smith, John\"", "Smith, John")]
    #[case("\"\"\"Doe, Jane\"\"\"", "Doe, Jane")]
    #[case("\"Title with extra quotes\"", "Title with extra quotes")]
    #[case("say \"hello\" there", "say \"hello\" there")]
    #[case("plain", "plain")]
    #[case("\"", "\"")]
    fn test_strip_quote_artifacts(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_quote_artifacts(input), expected);
    }

    #[test]
    fn test_lint_is_idempotent() {
        let mut entry = Entry::new("test", "article");
        entry.set("year", "\"2020\"");
        entry.set("author", "\"Smith, John\"");
        entry.set("zzz", "last");

        let once = lint_entry(&entry);
        let twice = lint_entry(&once);
        assert_eq!(once, twice);
    }
}
