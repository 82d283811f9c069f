//! Semantic equality between two versions of an entry.

use std::collections::BTreeSet;

use crate::Entry;

/// Decides whether two versions of a record are semantically different.
///
/// The comparison runs over the union of both field names; each value is
/// trimmed of surrounding whitespace and a missing field counts as an empty
/// string, so a field that is present but empty is equivalent to one that is
/// entirely absent. The citation key and entry type participate like any
/// other field. Symmetric by construction.
///
/// This gate decides whether an update and therefore a write is triggered,
/// so any change here changes when the store considers itself dirty.
pub fn entries_differ(a: &Entry, b: &Entry) -> bool {
    if a.key.trim() != b.key.trim() || a.entry_type.trim() != b.entry_type.trim() {
        return true;
    }

    let names: BTreeSet<&str> = a
        .fields
        .keys()
        .chain(b.fields.keys())
        .map(String::as_str)
        .collect();

    names
        .into_iter()
        .any(|name| a.get(name).unwrap_or("").trim() != b.get(name).unwrap_or("").trim())
}
