use rustc_hash::FxHashSet;

use crate::error::Error;
use crate::value::Value;

/// The changed key reported when two values have no keys to compare.
pub const VALUE_MARKER: &str = "(value)";

/// The changed key reported when two values could not be compared at all.
pub const UNAVAILABLE_MARKER: &str = "(unavailable)";

/// The outcome of a shallow comparison.
///
/// `changed_keys` and `stable_keys` partition the union of both sides' own
/// keys, and `equal` holds exactly when nothing changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    /// Whether the two values are shallowly equal.
    pub equal: bool,
    /// Top-level keys whose values are not the same.
    pub changed_keys: Vec<String>,
    /// Top-level keys whose values are the same.
    pub stable_keys: Vec<String>,
}

impl Diff {
    /// An unequal diff with a single marker in place of the changed keys.
    pub fn unequal(marker: &str) -> Self {
        Self { equal: false, changed_keys: vec![marker.into()], stable_keys: Vec::new() }
    }

    /// Whether the key was classified as changed.
    pub fn is_changed(&self, key: &str) -> bool {
        self.changed_keys.iter().any(|k| k == key)
    }

    /// Whether the key was classified as stable.
    pub fn is_stable(&self, key: &str) -> bool {
        self.stable_keys.iter().any(|k| k == key)
    }
}

/// Compare the top-level keys of two values.
///
/// Each key is classified by whether both sides hold the [same](Value::same)
/// value under it. Nested values are not looked into: a fresh object with
/// identical contents counts as changed. If either side has no keys, the
/// result is unequal with [`VALUE_MARKER`] unless both are the same value.
///
/// Fails if one of the nodes is mutably borrowed.
pub fn diff(prev: &Value, next: &Value) -> Result<Diff, Error> {
    if prev.same(next) {
        return Ok(Diff { equal: true, changed_keys: Vec::new(), stable_keys: next.own_keys()? });
    }

    if !prev.is_composite() || !next.is_composite() {
        return Ok(Diff::unequal(VALUE_MARKER));
    }

    let mut keys = prev.own_keys()?;
    let mut seen: FxHashSet<String> = keys.iter().cloned().collect();
    for key in next.own_keys()? {
        if seen.insert(key.clone()) {
            keys.push(key);
        }
    }

    let mut diff = Diff::default();
    for key in keys {
        if prev.property(&key)?.same(&next.property(&key)?) {
            diff.stable_keys.push(key);
        } else {
            diff.changed_keys.push(key);
        }
    }

    diff.equal = diff.changed_keys.is_empty();
    Ok(diff)
}
