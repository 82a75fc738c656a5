use std::fmt::{self, Debug, Display, Formatter};
use std::rc::Rc;

use crate::path::Path;
use crate::shallow::{self, Diff, UNAVAILABLE_MARKER};
use crate::value::Value;
use crate::watch;

/// A caller-owned equality oracle. Returning `true` shields.
pub type Comparator = Rc<dyn Fn(&Value, &Value) -> bool>;

/// How a value should be compared with its predecessor.
#[derive(Clone, Default)]
pub struct Options {
    /// Paths that get a deep comparison. When non-empty, only these decide
    /// whether to shield.
    pub watch: Vec<Path>,
    /// Whether to report a diagnostic for every decision.
    pub debug: bool,
    /// Whether shielded decisions should raise a visual notification.
    pub visual: bool,
    /// Overrides all other comparisons when present.
    pub custom_compare: Option<Comparator>,
    /// A label for diagnostics.
    pub component_name: Option<String>,
}

impl Options {
    /// Options that compare shallowly and report nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the watched paths.
    pub fn watch<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Path>,
    {
        self.watch = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable diagnostics.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Enable or disable the visual notification.
    pub fn visual(mut self, visual: bool) -> Self {
        self.visual = visual;
        self
    }

    /// Decide with a custom comparator instead.
    pub fn custom_compare(mut self, f: impl Fn(&Value, &Value) -> bool + 'static) -> Self {
        self.custom_compare = Some(Rc::new(f));
        self
    }

    /// Set the diagnostics label.
    pub fn component_name(mut self, name: impl Into<String>) -> Self {
        self.component_name = Some(name.into());
        self
    }
}

impl Debug for Options {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Options")
            .field("watch", &self.watch)
            .field("debug", &self.debug)
            .field("visual", &self.visual)
            .field("custom_compare", &self.custom_compare.as_ref().map(|_| ".."))
            .field("component_name", &self.component_name)
            .finish()
    }
}

/// Why a decision was made. Purely informational.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Severity {
    /// Nothing relevant changed.
    Stable,
    /// A top-level key changed, but no watched path did.
    Changed,
    /// A watched path changed.
    WatchedChanged,
    /// A custom comparator made the call.
    CustomCompare,
}

impl Severity {
    /// The human-readable name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stable => "Stable",
            Self::Changed => "Changed (non-UI key)",
            Self::WatchedChanged => "Changed (watched key)",
            Self::CustomCompare => "Custom compare triggered",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Which render a decision belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RenderCount {
    /// The n-th render of a stateful shield, starting at one.
    Known(u64),
    /// The decision did not come from a render, e.g. a props comparison.
    Unknown,
}

impl Display for RenderCount {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Known(n) => Display::fmt(n, f),
            Self::Unknown => f.pad("unknown"),
        }
    }
}

/// A record of one decision, for diagnostics.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Diagnostic {
    /// The label of the deciding component, if one was given.
    pub component_name: Option<String>,
    /// Whether the previous value was kept.
    pub shielded: bool,
    /// Which render the decision belongs to.
    pub render_count: RenderCount,
    /// Top-level keys whose values are not the same.
    pub changed_keys: Vec<String>,
    /// Top-level keys whose values are the same.
    pub stable_keys: Vec<String>,
    /// Watched paths whose values differ.
    pub watched_changed: Vec<Path>,
    /// Watched paths whose values are structurally equal.
    pub watched_stable: Vec<Path>,
    /// Why the decision was made.
    pub severity: Severity,
    /// Whether a shielded decision should raise a visual notification.
    pub visual: bool,
}

impl Diagnostic {
    /// The component label, e.g. `<Card>`, or `<Component>` if anonymous.
    pub fn label(&self) -> String {
        format!("<{}>", self.component_name.as_deref().unwrap_or("Component"))
    }
}

/// The outcome of [`decide`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Decision {
    /// Whether the previous value should be kept.
    pub shield: bool,
    /// What led to the decision.
    pub diagnostic: Diagnostic,
}

/// Decide whether to keep `prev` instead of `next`.
///
/// The first applicable rule wins:
/// 1. Without a previous value, never shield.
/// 2. A custom comparator decides on its own.
/// 3. With watched paths, shield if all of them are deeply equal, no matter
///    which other keys changed.
/// 4. Otherwise, shield if the values are shallowly equal.
///
/// The diagnostic carries an unknown render count. Never fails: values that
/// cannot be inspected count as changed. A panicking comparator is not
/// caught.
pub fn decide(prev: Option<&Value>, next: &Value, options: &Options) -> Decision {
    decide_with(prev, next, options, RenderCount::Unknown)
}

/// Like [`decide`], but attributes the diagnostic to a specific render.
pub fn decide_with(
    prev: Option<&Value>,
    next: &Value,
    options: &Options,
    render_count: RenderCount,
) -> Decision {
    let decision = evaluate(prev, next, options, render_count);

    #[cfg(feature = "testing")]
    crate::testing::register(decision.shield);

    decision
}

fn evaluate(
    prev: Option<&Value>,
    next: &Value,
    options: &Options,
    render_count: RenderCount,
) -> Decision {
    let record = |shielded, severity| Diagnostic {
        component_name: options.component_name.clone(),
        shielded,
        render_count,
        changed_keys: Vec::new(),
        stable_keys: Vec::new(),
        watched_changed: Vec::new(),
        watched_stable: Vec::new(),
        severity,
        visual: options.visual,
    };

    let Some(prev) = prev else {
        let diagnostic = Diagnostic {
            stable_keys: next.own_keys().unwrap_or_default(),
            watched_stable: options.watch.clone(),
            ..record(false, Severity::Stable)
        };
        return Decision { shield: false, diagnostic };
    };

    if let Some(compare) = &options.custom_compare {
        let shield = compare(prev, next);
        return Decision { shield, diagnostic: record(shield, Severity::CustomCompare) };
    }

    let shallow = shallow::diff(prev, next).unwrap_or_else(|err| {
        tracing::warn!(%err, "shallow comparison failed, treating values as changed");
        Diff::unequal(UNAVAILABLE_MARKER)
    });

    if !options.watch.is_empty() {
        let watched = watch::compare(prev, next, &options.watch);
        let severity = if !watched.changed.is_empty() {
            Severity::WatchedChanged
        } else if !shallow.changed_keys.is_empty() {
            Severity::Changed
        } else {
            Severity::Stable
        };

        let diagnostic = Diagnostic {
            changed_keys: shallow.changed_keys,
            stable_keys: shallow.stable_keys,
            watched_changed: watched.changed,
            watched_stable: watched.stable,
            ..record(watched.equal, severity)
        };
        return Decision { shield: watched.equal, diagnostic };
    }

    let severity = if shallow.changed_keys.is_empty() { Severity::Stable } else { Severity::Changed };
    let diagnostic = Diagnostic {
        changed_keys: shallow.changed_keys,
        stable_keys: shallow.stable_keys,
        ..record(shallow.equal, severity)
    };
    Decision { shield: shallow.equal, diagnostic }
}
