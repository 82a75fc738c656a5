use crate::policy::{Options, RenderCount, decide, decide_with};
use crate::report::{Reporter, global};
use crate::value::Value;

/// Keeps the previous value alive while new ones are not meaningfully
/// different.
///
/// Feed it the freshly built value on every render; it hands back the value
/// that should be used downstream. That is the previous one if it was
/// shielded and the new one otherwise.
///
/// ```
/// # use render_shield::{Options, Shield, Value};
/// let mut shield = Shield::new(Options::new().watch(["id"]));
///
/// let first = Value::from(serde_json::json!({ "id": 1, "at": "10:00" }));
/// let second = Value::from(serde_json::json!({ "id": 1, "at": "10:05" }));
///
/// shield.observe(first.clone());
/// assert!(shield.observe(second).same(&first));
/// ```
#[derive(Debug)]
pub struct Shield {
    options: Options,
    prev: Option<Value>,
    renders: u64,
}

impl Shield {
    /// Create a shield that has not seen any value yet.
    pub fn new(options: Options) -> Self {
        Self { options, prev: None, renders: 0 }
    }

    /// Observe the value of the next render, reporting through the
    /// process-wide reporter.
    pub fn observe(&mut self, next: Value) -> Value {
        self.observe_in(global(), next)
    }

    /// Observe the value of the next render, reporting through `reporter`
    /// if `debug` is set.
    pub fn observe_in(&mut self, reporter: &Reporter, next: Value) -> Value {
        self.renders += 1;
        let decision = decide_with(
            self.prev.as_ref(),
            &next,
            &self.options,
            RenderCount::Known(self.renders),
        );

        let shield = decision.shield;
        if self.options.debug {
            reporter.report(decision.diagnostic);
        }

        if shield && let Some(prev) = &self.prev {
            return prev.clone();
        }

        self.prev = Some(next.clone());
        next
    }

    /// How many values were observed.
    pub fn render_count(&self) -> u64 {
        self.renders
    }

    /// The value that currently survives.
    pub fn current(&self) -> Option<&Value> {
        self.prev.as_ref()
    }

    /// The options in use.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Replace the options. The surviving value is kept.
    pub fn set_options(&mut self, options: Options) {
        self.options = options;
    }
}

/// Skips re-running a render function while its props are shielded.
///
/// The first render always runs. After that, each new set of props is
/// compared with the props of the last render that ran; if they are
/// shielded, the cached output is returned instead.
pub struct Memo<R> {
    name: String,
    options: Options,
    last: Option<(Value, R)>,
}

impl<R: Clone> Memo<R> {
    /// Wrap a render function with the given display name.
    ///
    /// The name labels all diagnostics, overriding
    /// [`Options::component_name`].
    pub fn new(name: impl Into<String>, options: Options) -> Self {
        let name = name.into();
        let options = Options { component_name: Some(name.clone()), ..options };
        Self { name, options, last: None }
    }

    /// The wrapped component's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name of the wrapper, e.g. `Shielded(Card)`.
    pub fn display_name(&self) -> String {
        format!("Shielded({})", self.name)
    }

    /// Render with the given props, reporting through the process-wide
    /// reporter.
    pub fn render(&mut self, props: Value, f: impl FnOnce(&Value) -> R) -> R {
        self.render_in(global(), props, f)
    }

    /// Render with the given props, reporting through `reporter` if `debug`
    /// is set.
    pub fn render_in(
        &mut self,
        reporter: &Reporter,
        props: Value,
        f: impl FnOnce(&Value) -> R,
    ) -> R {
        if let Some((prev, output)) = &self.last {
            let decision = decide(Some(prev), &props, &self.options);
            let shield = decision.shield;
            if self.options.debug {
                reporter.report(decision.diagnostic);
            }
            if shield {
                return output.clone();
            }
        }

        let output = f(&props);
        self.last = Some((props, output.clone()));
        output
    }
}
