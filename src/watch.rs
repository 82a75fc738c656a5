use crate::equal::equal;
use crate::path::{Path, try_resolve};
use crate::value::Value;

/// The outcome of comparing watched paths.
///
/// Every path lands in exactly one of `changed` and `stable`, both in input
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Watched {
    /// Paths whose values differ.
    pub changed: Vec<Path>,
    /// Paths whose values are structurally equal.
    pub stable: Vec<Path>,
    /// Whether no path changed.
    pub equal: bool,
}

/// Compare two values at each of the given paths.
///
/// The values at a path are compared with [`equal`], so they may be fresh
/// nodes as long as their contents match. A path that leads nowhere on both
/// sides is stable. A path that cannot be resolved because a node on the way
/// is mutably borrowed counts as changed.
///
/// All paths are evaluated, even after the first change.
pub fn compare(prev: &Value, next: &Value, paths: &[Path]) -> Watched {
    let mut watched = Watched::default();
    for path in paths {
        let stable = match (try_resolve(prev, path), try_resolve(next, path)) {
            (Ok(a), Ok(b)) => equal(&a, &b),
            _ => false,
        };

        if stable {
            watched.stable.push(path.clone());
        } else {
            watched.changed.push(path.clone());
        }
    }

    watched.equal = watched.changed.is_empty();
    watched
}
