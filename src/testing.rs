use std::cell::Cell;

thread_local! {
    /// Whether the last decision shielded.
    static LAST_WAS_SHIELDED: Cell<bool> = const { Cell::new(false) };
}

/// Whether the last decision on this thread shielded.
pub fn last_was_shielded() -> bool {
    LAST_WAS_SHIELDED.with(|cell| cell.get())
}

/// Records the outcome of a decision.
pub(crate) fn register(shielded: bool) {
    LAST_WAS_SHIELDED.with(|cell| cell.set(shielded))
}
