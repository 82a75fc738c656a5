use std::cell::BorrowError;

/// A failure while inspecting a value.
///
/// Comparisons never surface this to callers of [`decide`](crate::decide);
/// it is downgraded to "changed" there.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A composite node was mutably borrowed while being inspected.
    #[error("value is mutably borrowed elsewhere")]
    Busy(#[from] BorrowError),
}
