use std::time::Duration;

use crate::policy::Severity;

/// Raises a transient on-screen notice for shielded decisions.
///
/// Only hosts with something to draw on implement this. Without a notifier,
/// the visual step of a [`Reporter`](crate::Reporter) is skipped.
pub trait Notify: Send + Sync {
    /// Show the notification.
    fn notify(&self, notification: &Notification);
}

impl<F> Notify for F
where
    F: Fn(&Notification) + Send + Sync,
{
    fn notify(&self, notification: &Notification) {
        self(notification)
    }
}

/// A shielded render, to be shown briefly.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Notification {
    /// The component label, e.g. `<Card>`.
    pub label: String,
    /// Why the render was shielded.
    pub severity: Severity,
}

impl Notification {
    /// The element id and class of the toast. A single toast is shown at a
    /// time; a new one replaces the old.
    pub const ID: &str = "render-shield-toast";

    /// How long the toast stays visible.
    pub const DURATION: Duration = Duration::from_millis(2000);

    /// Create a notification.
    pub fn new(label: impl Into<String>, severity: Severity) -> Self {
        Self { label: label.into(), severity }
    }

    /// The toast as an HTML fragment. All text is escaped.
    ///
    /// The display time in milliseconds is carried in `data-duration`.
    pub fn markup(&self) -> String {
        format!(
            "<div id=\"{id}\" class=\"{id}\" role=\"status\" data-duration=\"{ms}\">\
             <span aria-hidden=\"true\">\u{1f6e1}\u{fe0f}</span>\
             <div><strong>{label}</strong> shielded</div>\
             <small>{severity}</small>\
             </div>",
            id = Self::ID,
            ms = Self::DURATION.as_millis(),
            label = escape(&self.label),
            severity = escape(self.severity.as_str()),
        )
    }
}

/// Escape text for inclusion in HTML.
fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    out
}
