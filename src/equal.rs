use rustc_hash::FxHashMap;

use crate::value::Value;

/// Structural equality between two values.
///
/// Arrays are equal if they have the same length and pairwise equal items,
/// objects if they have the same key set (in any order) and pairwise equal
/// values. Cycles are handled: a pair of nodes that is already being
/// compared further up counts as equal.
///
/// This walks the whole of both values, so it is meant for the small parts
/// of a value that are selected by watched paths, not for entire object
/// graphs. A node that is mutably borrowed elsewhere compares unequal.
pub fn equal(a: &Value, b: &Value) -> bool {
    equal_within(a, b, &mut FxHashMap::default())
}

/// Compare with a table of node pairings from the current walk.
fn equal_within(a: &Value, b: &Value, seen: &mut FxHashMap<usize, usize>) -> bool {
    if a.same(b) {
        return true;
    }

    let (Some(x), Some(y)) = (a.node(), b.node()) else { return false };
    if seen.get(&x) == Some(&y) {
        return true;
    }
    seen.insert(x, y);

    match (a, b) {
        (Value::Array(a), Value::Array(b)) => {
            let (Ok(a), Ok(b)) = (a.try_borrow(), b.try_borrow()) else { return false };
            a.len() == b.len()
                && a.iter().zip(b.iter()).all(|(p, q)| equal_within(p, q, seen))
        }
        (Value::Object(a), Value::Object(b)) => {
            let (Ok(a), Ok(b)) = (a.try_borrow(), b.try_borrow()) else { return false };
            a.len() == b.len()
                && a.keys().all(|key| b.contains_key(key))
                && a.iter().all(|(key, p)| {
                    b.get(key).is_some_and(|q| equal_within(p, q, seen))
                })
        }
        _ => false,
    }
}
