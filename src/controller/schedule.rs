//! Small timing primitives for the page controller
//!
//! None of these own a timer. The host feeds them a millisecond clock and
//! asks whether something is due, which keeps them usable from both the
//! browser event loop and plain unit tests.

use crate::models::DomSnapshot;
use crate::parser::Selector;
use lazy_static::lazy_static;

/// Elements watched for header re-renders, first match wins
pub const OBSERVER_TARGETS: &[&str] = &[
    "#awsc-navigation",
    "nav[data-testid]",
    "header",
    r#"[data-testid="awsc-nav-account-menu-button"]"#,
];

lazy_static! {
    static ref OBSERVER_SELECTORS: Vec<(&'static str, Selector)> = OBSERVER_TARGETS
        .iter()
        .map(|s| (*s, Selector::parse(s).unwrap()))
        .collect();
}

/// Which observer target a page offers. `None` means the whole body is
/// observed.
pub fn observer_target(document: &DomSnapshot) -> Option<&'static str> {
    OBSERVER_SELECTORS
        .iter()
        .find(|(_, selector)| selector.query_first(&document.root).is_some())
        .map(|(source, _)| *source)
}

/// Delayed retries granted after an initial detection miss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    remaining: u8,
}

impl RetryBudget {
    pub fn new(retries: u8) -> Self {
        Self { remaining: retries }
    }

    pub fn single() -> Self {
        Self::new(1)
    }

    /// Consume one retry if any is left
    pub fn take(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }

    pub fn remaining(&self) -> u8 {
        self.remaining
    }
}

/// Trailing-edge debounce: fires once `quiet_ms` after the last trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debouncer {
    quiet_ms: u64,
    deadline: Option<u64>,
}

impl Debouncer {
    pub fn new(quiet_ms: u64) -> Self {
        Self {
            quiet_ms,
            deadline: None,
        }
    }

    pub fn trigger(&mut self, now_ms: u64) {
        self.deadline = Some(now_ms + self.quiet_ms);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    /// True exactly once per burst, when the quiet period has elapsed
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

/// Reports each distinct URL once, whether it came from a history hook,
/// `popstate` or the periodic poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlWatcher {
    last: String,
}

impl UrlWatcher {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            last: initial.into(),
        }
    }

    pub fn current(&self) -> &str {
        &self.last
    }

    pub fn observe(&mut self, url: &str) -> bool {
        if url == self.last {
            return false;
        }
        tracing::debug!(from = %self.last, to = %url, "url changed");
        self.last = url.to_string();
        true
    }
}

/// Latest-wins serialisation of renders: one in flight, at most one queued
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderGate {
    in_flight: bool,
    queued: bool,
}

impl RenderGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a render, or queue a follow-up if one is already running
    pub fn try_begin(&mut self) -> bool {
        if self.in_flight {
            self.queued = true;
            return false;
        }
        self.in_flight = true;
        true
    }

    /// Finish the current render. Returns true when a queued follow-up
    /// should run now; the gate stays held for it.
    pub fn finish(&mut self) -> bool {
        if self.queued {
            self.queued = false;
            return true;
        }
        self.in_flight = false;
        false
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DomNode;

    #[test]
    fn test_observer_target_prefers_navigation() {
        let page = DomSnapshot::new(
            DomNode::element("body")
                .with_child(DomNode::element("header"))
                .with_child(DomNode::element("div").with_attr("id", "awsc-navigation")),
        );
        assert_eq!(observer_target(&page), Some("#awsc-navigation"));

        let bare = DomSnapshot::new(DomNode::element("body").with_child(DomNode::element("main")));
        assert_eq!(observer_target(&bare), None);
    }

    #[test]
    fn test_single_retry() {
        let mut budget = RetryBudget::single();
        assert!(budget.take());
        assert!(!budget.take());
        assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn test_debounce_coalesces_burst() {
        let mut debounce = Debouncer::new(500);
        debounce.trigger(0);
        debounce.trigger(200);
        debounce.trigger(400);
        assert!(!debounce.poll(800));
        assert!(debounce.poll(900));
        assert!(!debounce.poll(1000));
        assert!(!debounce.is_pending());
    }

    #[test]
    fn test_debounce_cancel() {
        let mut debounce = Debouncer::new(100);
        debounce.trigger(0);
        debounce.cancel();
        assert!(!debounce.poll(1000));
    }

    #[test]
    fn test_url_watcher_reports_each_change_once() {
        let mut watcher = UrlWatcher::new("https://console.aws.amazon.com/ec2/home");
        assert!(!watcher.observe("https://console.aws.amazon.com/ec2/home"));
        assert!(watcher.observe("https://console.aws.amazon.com/s3/home"));
        assert!(!watcher.observe("https://console.aws.amazon.com/s3/home"));
        assert_eq!(watcher.current(), "https://console.aws.amazon.com/s3/home");
    }

    #[test]
    fn test_render_gate_queues_one_follow_up() {
        let mut gate = RenderGate::new();
        assert!(gate.try_begin());
        assert!(!gate.try_begin());
        assert!(!gate.try_begin());
        assert!(gate.finish());
        assert!(gate.is_busy());
        assert!(!gate.finish());
        assert!(!gate.is_busy());
        assert!(gate.try_begin());
    }
}
