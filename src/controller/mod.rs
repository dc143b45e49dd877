//! Per-page controller
//!
//! [`PageController`] is the single owner of a page's state: the last
//! detection, the settings it resolved against, and the watermark. Every
//! trigger (timer, DOM mutation, URL change, settings change, message) funnels
//! through it, so there is no other mutable page state to keep in sync.

pub mod schedule;

use crate::config::{IndicatorConfig, Timings};
use crate::detector::detect_capture;
use crate::models::{
    AccountInfo, Detection, PageCapture, Request, ResolvedDisplayState, Response, SettingsChange,
    StoredSettings,
};
use crate::overlay::{
    OverlayChange, OverlaySurface, Position, PositionCache, Viewport, WatermarkOverlay,
};
use crate::resolver::resolve;
use crate::store::SettingsStore;
use std::cell::RefCell;
use std::time::Duration;

pub use schedule::{observer_target, Debouncer, RenderGate, RetryBudget, UrlWatcher, OBSERVER_TARGETS};

/// Everything the page knows about itself
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageState {
    pub detection: Detection,
    pub settings: StoredSettings,
    pub last_state_key: String,
    pub resolved: Option<ResolvedDisplayState>,
}

impl PageState {
    pub fn account_name(&self) -> Option<String> {
        self.resolved.as_ref().map(|r| r.display_name.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassOutcome {
    pub found: bool,
    pub state_changed: bool,
    pub overlay: OverlayChange,
}

/// Work a message handler leaves for the host, which owns the page and the
/// settings store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    Redetect,
    ReloadSettings(SettingsChange),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageOutcome {
    pub response: Response,
    pub follow_up: Option<FollowUp>,
}

impl MessageOutcome {
    pub fn reply(response: Response) -> Self {
        Self {
            response,
            follow_up: None,
        }
    }
}

pub struct PageController<S, C> {
    state: PageState,
    overlay: WatermarkOverlay<S, C>,
    timings: Timings,
    retry: RetryBudget,
    dom_debounce: Debouncer,
    resize_debounce: Debouncer,
    url: UrlWatcher,
}

impl<S: OverlaySurface, C: PositionCache> PageController<S, C> {
    pub fn new(surface: S, cache: C, config: &IndicatorConfig, viewport: Viewport, url: &str) -> Self {
        let timings = config.timings;
        Self {
            state: PageState::default(),
            overlay: WatermarkOverlay::new(surface, cache, config.overlay.clone(), viewport),
            timings,
            retry: RetryBudget::single(),
            dom_debounce: Debouncer::new(timings.dom_debounce_ms),
            resize_debounce: Debouncer::new(timings.resize_debounce_ms),
            url: UrlWatcher::new(url),
        }
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    pub fn overlay(&self) -> &WatermarkOverlay<S, C> {
        &self.overlay
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    /// First pass after page load. On a miss, returns the delay before the
    /// one retry; later misses return `None`.
    pub fn initial_pass(&mut self, capture: &PageCapture) -> Option<Duration> {
        self.run_detection(capture);

        if self.state.detection.is_found() {
            self.render();
            return None;
        }

        if self.retry.take() {
            tracing::debug!(delay_ms = self.timings.retry_delay_ms, "no account yet, retrying once");
            Some(self.timings.retry_delay())
        } else {
            None
        }
    }

    /// Re-detect after a URL change or DOM mutation burst; the watermark is
    /// only touched when the detected state changed.
    pub fn detect_pass(&mut self, capture: &PageCapture) -> PassOutcome {
        self.pass(capture, false)
    }

    /// Re-detect and re-render regardless of whether anything changed
    pub fn refresh(&mut self, capture: &PageCapture) -> PassOutcome {
        self.pass(capture, true)
    }

    fn pass(&mut self, capture: &PageCapture, force: bool) -> PassOutcome {
        let previous = self.state.last_state_key.clone();
        self.run_detection(capture);
        let state_changed = self.state.last_state_key != previous;
        if state_changed {
            tracing::debug!(from = %previous, to = %self.state.last_state_key, "page state changed");
        }

        let overlay = if (state_changed || force) && self.state.settings.global_settings.enable_watermark {
            self.render()
        } else {
            OverlayChange::Unchanged
        };

        PassOutcome {
            found: self.state.detection.is_found(),
            state_changed,
            overlay,
        }
    }

    fn run_detection(&mut self, capture: &PageCapture) {
        self.state.detection = detect_capture(capture);
        self.state.last_state_key = self.state.detection.state_key();
        self.resolve_state();
    }

    fn resolve_state(&mut self) {
        self.state.resolved = self
            .state
            .detection
            .account
            .as_ref()
            .map(|account| resolve(account, &self.state.detection.role, &self.state.settings));
    }

    /// Draw the current state. Without an identity an existing watermark is
    /// left untouched.
    fn render(&mut self) -> OverlayChange {
        let Some(resolved) = self.state.resolved.as_ref() else {
            return OverlayChange::Unchanged;
        };
        self.overlay.render(resolved, &self.state.settings.global_settings)
    }

    /// Take in settings read after a change notification
    pub fn apply_settings(&mut self, settings: StoredSettings, change: SettingsChange) -> OverlayChange {
        self.state.settings = settings;
        self.resolve_state();

        let enabled = self.state.settings.global_settings.enable_watermark;
        if change.global && !enabled {
            return self.overlay.remove();
        }

        // One render covers any mix of changed keys
        let rerender = change.global
            || ((change.accounts || change.roles) && self.state.detection.is_found());
        if enabled && rerender {
            self.render()
        } else {
            OverlayChange::Unchanged
        }
    }

    pub fn handle_message(&self, request: &Request) -> MessageOutcome {
        match request {
            Request::Ping => MessageOutcome::reply(Response::alive()),
            Request::GetCurrentAccount | Request::GetAccountInfo => {
                MessageOutcome::reply(Response::Account(AccountInfo::from_detection(
                    &self.state.detection,
                    self.state.account_name(),
                )))
            }
            Request::Refresh => MessageOutcome {
                response: Response::success(),
                follow_up: Some(FollowUp::Redetect),
            },
            Request::SettingsChanged { changes } => MessageOutcome {
                response: Response::success(),
                follow_up: Some(FollowUp::ReloadSettings(if changes.is_empty() {
                    SettingsChange::all()
                } else {
                    *changes
                })),
            },
            other => {
                tracing::debug!(action = other.action(), "message not handled in page");
                MessageOutcome::reply(Response::unknown_action())
            }
        }
    }

    /// Clamp the watermark after it has been laid out
    pub fn adjust_overlay(&mut self) -> Option<Position> {
        self.overlay.adjust()
    }

    pub fn viewport_resized(&mut self, viewport: Viewport, now_ms: u64) {
        self.overlay.set_viewport(viewport);
        self.resize_debounce.trigger(now_ms);
    }

    pub fn dom_mutated(&mut self, now_ms: u64) {
        self.dom_debounce.trigger(now_ms);
    }

    /// Feed a URL seen by a history hook or the poll; true when it changed
    /// and a detection pass should run
    pub fn url_observed(&mut self, url: &str) -> bool {
        self.url.observe(url)
    }

    /// Advance the debouncers. Runs a due resize clamp itself and returns
    /// true when a DOM-triggered detection pass is due.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        if self.resize_debounce.poll(now_ms) {
            self.overlay.adjust();
        }
        self.dom_debounce.poll(now_ms)
    }

    pub fn pointer_down(&mut self, pointer: Position) -> bool {
        self.overlay.pointer_down(pointer)
    }

    pub fn pointer_move(&mut self, pointer: Position) -> Option<Position> {
        self.overlay.pointer_move(pointer)
    }

    pub fn pointer_up(&mut self) -> Option<Position> {
        self.overlay.pointer_up()
    }
}

/// A controller shared with async callbacks. Settings reloads go through a
/// [`RenderGate`] so overlapping notifications collapse into one follow-up.
pub struct SharedPage<S, C> {
    page: RefCell<PageController<S, C>>,
    gate: RefCell<RenderGate>,
}

impl<S: OverlaySurface, C: PositionCache> SharedPage<S, C> {
    pub fn new(page: PageController<S, C>) -> Self {
        Self {
            page: RefCell::new(page),
            gate: RefCell::new(RenderGate::new()),
        }
    }

    pub fn page(&self) -> &RefCell<PageController<S, C>> {
        &self.page
    }

    /// Reload settings and apply them. A call made while a reload is in
    /// flight only queues a single follow-up reload of everything.
    pub async fn sync_settings<St: SettingsStore>(&self, store: &St, change: SettingsChange) {
        if !self.gate.borrow_mut().try_begin() {
            return;
        }

        let mut change = change;
        loop {
            // The borrow is not held across the await
            match store.load().await {
                Ok(settings) => {
                    self.page.borrow_mut().apply_settings(settings, change);
                }
                Err(e) => tracing::warn!(error = %e, "failed to load settings, keeping last known"),
            }

            if !self.gate.borrow_mut().finish() {
                break;
            }
            change = SettingsChange::all();
        }
    }
}
