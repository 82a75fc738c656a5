//! Render shielding: decide whether a new value is meaningfully different
//! from the previous one.
//!
//! Values are compared shallowly by default. A list of watched paths narrows
//! the comparison to the parts of a value that actually matter, and a custom
//! comparator replaces it entirely.
//!
//! ```
//! use render_shield::{Options, Value, decide};
//!
//! let prev = Value::from(serde_json::json!({ "id": 1, "metadata": { "at": "10:00" } }));
//! let next = Value::from(serde_json::json!({ "id": 1, "metadata": { "at": "10:05" } }));
//!
//! // Shallowly, `metadata` is a new object.
//! assert!(!decide(Some(&prev), &next, &Options::new()).shield);
//!
//! // But only `id` is watched.
//! assert!(decide(Some(&prev), &next, &Options::new().watch(["id"])).shield);
//! ```
//!
//! With `debug` set, decisions are reported as [`Diagnostic`]s through a
//! [`Reporter`], which batches them and emits them as `tracing` events.

extern crate self as render_shield;

mod env;
mod equal;
mod error;
mod notify;
mod path;
mod policy;
mod report;
mod shallow;
mod shield;
#[cfg(feature = "testing")]
mod testing;
mod value;
mod watch;

pub use crate::env::{ENV_VAR, is_production};
pub use crate::equal::equal;
pub use crate::error::Error;
pub use crate::notify::{Notification, Notify};
pub use crate::path::{Path, Segment, resolve, try_resolve};
pub use crate::policy::{
    Comparator, Decision, Diagnostic, Options, RenderCount, Severity, decide,
    decide_with,
};
pub use crate::report::{
    Reporter, ReporterBuilder, Sink, TracingSink, batch_key, global, report,
};
pub use crate::shallow::{Diff, UNAVAILABLE_MARKER, VALUE_MARKER, diff};
pub use crate::shield::{Memo, Shield};
pub use crate::value::{Map, ToValue, Value};
pub use crate::watch::{Watched, compare};

/// Derive [`ToValue`] for a struct.
///
/// Named fields become object keys in declaration order, tuple structs
/// become arrays and unit structs become empty objects. A field can be left
/// out with `#[shield(skip)]` or given another key with
/// `#[shield(rename = "...")]`.
///
/// ```
/// use render_shield::{ToValue, Value};
///
/// #[derive(ToValue)]
/// struct Card {
///     id: u32,
///     #[shield(rename = "label")]
///     title: String,
///     #[shield(skip)]
///     cache: Vec<u8>,
/// }
///
/// let card = Card { id: 7, title: "Hello".into(), cache: vec![] };
/// let value = card.to_value();
/// assert!(value.get("id").same(&Value::from(7)));
/// assert!(value.get("label").same(&Value::from("Hello")));
/// assert!(value.get("cache").same(&Value::Undefined));
/// ```
#[cfg(feature = "macros")]
pub use render_shield_macros::ToValue;

/// These are implementation details. Do not rely on them!
#[doc(hidden)]
pub mod internal {
    #[cfg(feature = "testing")]
    pub use crate::testing::last_was_shielded;
}
