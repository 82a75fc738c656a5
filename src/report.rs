use std::collections::hash_map::Entry;
use std::fmt::{self, Debug, Formatter};
use std::hash::Hash;
use std::sync::LazyLock;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use siphasher::sip128::{Hasher128, SipHasher13};

use crate::notify::{Notification, Notify};
use crate::policy::Diagnostic;

/// The process-wide reporter behind [`report`].
static REPORTER: LazyLock<Reporter> = LazyLock::new(Reporter::new);

/// Report a diagnostic through the process-wide reporter.
///
/// See [`Reporter::report`].
pub fn report(diagnostic: Diagnostic) {
    REPORTER.report(diagnostic);
}

/// The process-wide reporter.
pub fn global() -> &'static Reporter {
    &REPORTER
}

/// Receives the diagnostics a [`Reporter`] flushes.
pub trait Sink: Send + Sync {
    /// Emit one diagnostic.
    fn emit(&self, diagnostic: &Diagnostic);
}

impl<F> Sink for F
where
    F: Fn(&Diagnostic) + Send + Sync,
{
    fn emit(&self, diagnostic: &Diagnostic) {
        self(diagnostic)
    }
}

/// Emits diagnostics as `tracing` events.
///
/// Each diagnostic gets its own `render_shield` span labelled with the
/// component and a single info event with the details.
#[derive(Debug, Default, Copy, Clone)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        let label = diagnostic.label();
        let span = tracing::info_span!("render_shield", component = %label);
        let _enter = span.enter();

        let Diagnostic { shielded, render_count, severity, .. } = diagnostic;
        let changed = &diagnostic.changed_keys;
        let stable = &diagnostic.stable_keys;
        if diagnostic.watched_changed.is_empty() && diagnostic.watched_stable.is_empty() {
            tracing::info!(
                shielded,
                %render_count,
                ?changed,
                ?stable,
                %severity,
                "[RenderShield] {label}"
            );
        } else {
            let watched_changed = &diagnostic.watched_changed;
            let watched_stable = &diagnostic.watched_stable;
            tracing::info!(
                shielded,
                %render_count,
                ?changed,
                ?stable,
                ?watched_changed,
                ?watched_stable,
                %severity,
                "[RenderShield] {label}"
            );
        }
    }
}

/// Collects diagnostics and emits them in deduplicated batches.
///
/// Reports that arrive within one _window_ are coalesced: two diagnostics
/// with the same [batch key](batch_key) are emitted once, with the later one
/// winning. The batch is flushed when the outermost [`window`](Self::window)
/// closes. A report outside of any window is a window of its own and is
/// emitted right away.
///
/// Windows and batches belong to the calling thread. A window open on one
/// thread never holds back reports made on another, and every batch is
/// flushed on the thread that filled it.
///
/// A reporter in production mode drops everything.
pub struct Reporter {
    /// Whether all reports are dropped.
    production: bool,
    /// Where flushed diagnostics go.
    sink: Box<dyn Sink>,
    /// Raises visual notices, if the host can.
    notifier: Option<Box<dyn Notify>>,
    /// The pending batch and scheduling state of each thread.
    batches: Mutex<FxHashMap<ThreadId, Batch>>,
}

impl Reporter {
    /// A reporter that logs through `tracing` and detects production mode
    /// from the environment.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Configure a reporter.
    pub fn builder() -> ReporterBuilder {
        ReporterBuilder::default()
    }

    /// Whether this reporter drops everything.
    pub fn is_production(&self) -> bool {
        self.production
    }

    /// Queue a diagnostic for emission.
    ///
    /// Replaces a pending diagnostic with the same batch key, keeping its
    /// position in the batch.
    pub fn report(&self, diagnostic: Diagnostic) {
        if self.production {
            return;
        }

        let key = batch_key(&diagnostic);
        let due = self.with_batch(|batch| {
            batch.insert(key, diagnostic);
            batch.scheduled = true;
            batch.depth == 0
        });

        if due {
            self.flush();
        }
    }

    /// Run `f` as one window. Windows nest; the batch is flushed when the
    /// outermost one closes, even if `f` panics.
    pub fn window<T>(&self, f: impl FnOnce() -> T) -> T {
        self.with_batch(|batch| batch.depth += 1);
        let _window = Window(self);
        f()
    }

    /// Emit and clear the pending batch now.
    ///
    /// The batch is taken out before anything is emitted, so sinks and
    /// notifiers may report again.
    pub fn flush(&self) {
        let pending = self.with_batch(|batch| {
            batch.index.clear();
            batch.scheduled = false;
            std::mem::take(&mut batch.pending)
        });

        for diagnostic in &pending {
            self.sink.emit(diagnostic);
            if diagnostic.shielded
                && diagnostic.visual
                && let Some(notifier) = &self.notifier
            {
                notifier.notify(&Notification::new(diagnostic.label(), diagnostic.severity));
            }
        }
    }

    /// The number of diagnostics waiting for this thread's next flush.
    pub fn pending(&self) -> usize {
        self.with_batch(|batch| batch.pending.len())
    }

    /// Whether a flush is owed on this thread.
    pub fn is_scheduled(&self) -> bool {
        self.with_batch(|batch| batch.scheduled)
    }

    /// Run `f` on the calling thread's batch. Idle batches are dropped.
    fn with_batch<T>(&self, f: impl FnOnce(&mut Batch) -> T) -> T {
        let id = thread::current().id();
        let mut batches = self.batches.lock();
        let batch = batches.entry(id).or_default();
        let output = f(batch);
        if batch.is_idle() {
            batches.remove(&id);
        }
        output
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Reporter {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let batches = self.batches.lock();
        f.debug_struct("Reporter")
            .field("production", &self.production)
            .field("threads", &batches.len())
            .field("pending", &batches.values().map(|b| b.pending.len()).sum::<usize>())
            .finish_non_exhaustive()
    }
}

/// Configures a [`Reporter`].
#[derive(Default)]
pub struct ReporterBuilder {
    production: Option<bool>,
    sink: Option<Box<dyn Sink>>,
    notifier: Option<Box<dyn Notify>>,
}

impl ReporterBuilder {
    /// Force production mode on or off instead of detecting it.
    pub fn production(mut self, production: bool) -> Self {
        self.production = Some(production);
        self
    }

    /// Emit into a custom sink instead of `tracing`.
    pub fn sink(mut self, sink: impl Sink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Raise visual notices through this notifier.
    pub fn notifier(mut self, notifier: impl Notify + 'static) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    /// Finish the reporter.
    pub fn build(self) -> Reporter {
        Reporter {
            production: self.production.unwrap_or_else(crate::env::is_production),
            sink: self.sink.unwrap_or_else(|| Box::new(TracingSink)),
            notifier: self.notifier,
            batches: Mutex::new(FxHashMap::default()),
        }
    }
}

/// Closes a window when dropped.
struct Window<'a>(&'a Reporter);

impl Drop for Window<'_> {
    fn drop(&mut self) {
        let due = self.0.with_batch(|batch| {
            batch.depth -= 1;
            batch.depth == 0 && batch.scheduled
        });

        if due {
            self.0.flush();
        }
    }
}

/// One thread's diagnostics waiting for the end of its current window.
#[derive(Default)]
struct Batch {
    /// The latest diagnostic per key, in order of first insertion.
    pending: Vec<Diagnostic>,
    /// Maps from batch key hashes to indices in `pending`.
    index: FxHashMap<u128, usize>,
    /// Whether a flush is owed.
    scheduled: bool,
    /// How many windows are open.
    depth: usize,
}

impl Batch {
    /// Whether nothing is pending and no window is open.
    fn is_idle(&self) -> bool {
        self.depth == 0 && !self.scheduled && self.pending.is_empty()
    }

    fn insert(&mut self, key: String, diagnostic: Diagnostic) {
        match self.index.entry(fingerprint(&key)) {
            Entry::Occupied(entry) => self.pending[*entry.get()] = diagnostic,
            Entry::Vacant(entry) => {
                entry.insert(self.pending.len());
                self.pending.push(diagnostic);
            }
        }
    }
}

/// The key under which reports are deduplicated.
///
/// Made of the component name, whether the decision shielded, the severity,
/// the changed keys and the changed watched paths. Two anonymous reports
/// with different outcomes thus do not overwrite each other.
pub fn batch_key(diagnostic: &Diagnostic) -> String {
    let base = diagnostic.component_name.as_deref().unwrap_or("Anonymous");
    let watched: Vec<&str> = diagnostic.watched_changed.iter().map(|p| p.as_str()).collect();
    format!(
        "{base}::{}:{}:{}:|W|:{}",
        if diagnostic.shielded { "S1" } else { "S0" },
        diagnostic.severity,
        diagnostic.changed_keys.join(","),
        watched.join(","),
    )
}

/// Produce a 128-bit hash of a batch key.
fn fingerprint(key: &str) -> u128 {
    let mut state = SipHasher13::new();
    key.hash(&mut state);
    state.finish128().as_u128()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};

    use super::*;
    use crate::path::Path;
    use crate::policy::{RenderCount, Severity};

    fn diagnostic(name: &str, shielded: bool) -> Diagnostic {
        Diagnostic {
            component_name: Some(name.into()),
            shielded,
            render_count: RenderCount::Known(1),
            changed_keys: vec!["a".into(), "b".into()],
            stable_keys: vec!["c".into()],
            watched_changed: vec![Path::from("x.y")],
            watched_stable: Vec::new(),
            severity: Severity::WatchedChanged,
            visual: false,
        }
    }

    fn collecting(production: bool) -> (Reporter, Arc<Mutex<Vec<Diagnostic>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reporter = Reporter::builder()
            .production(production)
            .sink(move |d: &Diagnostic| sink.lock().push(d.clone()))
            .build();
        (reporter, seen)
    }

    #[test]
    fn test_batch_key() {
        assert_eq!(
            batch_key(&diagnostic("Card", false)),
            "Card::S0:Changed (watched key):a,b:|W|:x.y"
        );

        let anonymous = Diagnostic { component_name: None, ..diagnostic("", true) };
        assert!(batch_key(&anonymous).starts_with("Anonymous::S1:"));
    }

    #[test]
    fn test_key_ignores_render_count() {
        let later = Diagnostic { render_count: RenderCount::Known(2), ..diagnostic("Card", true) };
        assert_eq!(batch_key(&later), batch_key(&diagnostic("Card", true)));
    }

    #[test]
    fn test_coalesce_within_window() {
        let (reporter, seen) = collecting(false);
        reporter.window(|| {
            reporter.report(diagnostic("Card", true));
            reporter.report(Diagnostic {
                render_count: RenderCount::Known(2),
                ..diagnostic("Card", true)
            });
            reporter.report(diagnostic("List", true));
            assert_eq!(reporter.pending(), 2);
            assert!(reporter.is_scheduled());
            assert!(seen.lock().is_empty());
        });

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].render_count, RenderCount::Known(2));
        assert_eq!(seen[1].component_name.as_deref(), Some("List"));
        assert!(!reporter.is_scheduled());
        assert_eq!(reporter.pending(), 0);
    }

    #[test]
    fn test_nested_windows() {
        let (reporter, seen) = collecting(false);
        reporter.window(|| {
            reporter.window(|| reporter.report(diagnostic("Card", true)));
            assert_eq!(seen.lock().len(), 0);
            reporter.report(diagnostic("Card", true));
        });
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_separate_windows() {
        let (reporter, seen) = collecting(false);
        reporter.window(|| reporter.report(diagnostic("Card", true)));
        reporter.window(|| reporter.report(diagnostic("Card", true)));
        assert_eq!(seen.lock().len(), 2);
    }

    #[test]
    fn test_outside_window() {
        let (reporter, seen) = collecting(false);
        reporter.report(diagnostic("Card", true));
        reporter.report(diagnostic("Card", true));
        assert_eq!(seen.lock().len(), 2);
        assert!(!reporter.is_scheduled());
    }

    #[test]
    fn test_windows_are_per_thread() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let reporter = Reporter::builder()
            .production(false)
            .sink(move |d: &Diagnostic| {
                let name = thread::current().name().map(String::from);
                sink.lock().push((name, d.component_name.clone()));
            })
            .build();

        let opened = Barrier::new(2);
        let reported = Barrier::new(2);
        let (reporter, opened, reported) = (&reporter, &opened, &reported);
        let (pending_a, pending_b) = thread::scope(|s| {
            let a = thread::Builder::new()
                .name("a".into())
                .spawn_scoped(s, move || {
                    reporter.window(|| {
                        reporter.report(diagnostic("A", true));
                        opened.wait();
                        reported.wait();
                        reporter.pending()
                    })
                })
                .unwrap();
            let b = thread::Builder::new()
                .name("b".into())
                .spawn_scoped(s, move || {
                    opened.wait();
                    let pending = reporter.pending();
                    reporter.report(diagnostic("B", true));
                    reported.wait();
                    pending
                })
                .unwrap();
            (a.join().unwrap(), b.join().unwrap())
        });

        assert_eq!(pending_a, 1);
        assert_eq!(pending_b, 0);
        let name = |n: &str| Some(String::from(n));
        assert_eq!(*seen.lock(), [(name("b"), name("B")), (name("a"), name("A"))]);
        assert_eq!(
            format!("{reporter:?}"),
            "Reporter { production: false, threads: 0, pending: 0, .. }",
        );
    }

    #[test]
    fn test_production_is_silent() {
        let (reporter, seen) = collecting(true);
        reporter.window(|| reporter.report(diagnostic("Card", true)));
        reporter.report(diagnostic("Card", false));
        reporter.flush();
        assert!(seen.lock().is_empty());
        assert!(!reporter.is_scheduled());
    }

    #[test]
    fn test_notify_only_shielded_visual() {
        let shown = Arc::new(Mutex::new(Vec::new()));
        let sink = shown.clone();
        let reporter = Reporter::builder()
            .production(false)
            .sink(|_: &Diagnostic| {})
            .notifier(move |n: &Notification| sink.lock().push(n.clone()))
            .build();

        reporter.window(|| {
            reporter.report(Diagnostic { visual: true, ..diagnostic("Card", true) });
            reporter.report(Diagnostic { visual: true, ..diagnostic("List", false) });
            reporter.report(diagnostic("Grid", true));
        });

        let shown = shown.lock();
        assert_eq!(*shown, [Notification::new("<Card>", Severity::WatchedChanged)]);
    }

    #[test]
    fn test_sink_may_report() {
        let reporter = Arc::new(Mutex::new(None::<Arc<Reporter>>));
        let count = Arc::new(Mutex::new(0));
        let (slot, counter) = (reporter.clone(), count.clone());
        let inner = Arc::new(
            Reporter::builder()
                .production(false)
                .sink(move |d: &Diagnostic| {
                    *counter.lock() += 1;
                    let current = slot.lock().clone();
                    if d.shielded
                        && let Some(reporter) = current
                    {
                        reporter.report(Diagnostic { shielded: false, ..d.clone() });
                    }
                })
                .build(),
        );
        *reporter.lock() = Some(inner.clone());

        inner.window(|| inner.report(diagnostic("Card", true)));
        assert_eq!(*count.lock(), 2);
        *reporter.lock() = None;
    }
}
