//! AWS Account Indicator
//!
//! Works out which AWS account (and assumed role) a console page belongs to
//! and draws a colored, draggable watermark naming it. Detection and
//! display resolution are pure functions over a page capture; the browser
//! side lives in the `wasm` module and the settings tooling in `cli`.

pub mod config;
pub mod controller;
pub mod coordinator;
pub mod detector;
pub mod editor;
pub mod error;
pub mod models;
pub mod overlay;
pub mod parser;
pub mod report;
pub mod resolver;
pub mod store;
pub mod utils;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use controller::{PageController, SharedPage};
pub use coordinator::{ExtensionHost, TabCoordinator};
pub use detector::detect;
pub use editor::SettingsEditor;
pub use error::{IndicatorError, Result};
pub use models::{AccountNumber, Detection, PageCapture, ResolvedDisplayState, StoredSettings};
pub use resolver::resolve;
pub use store::SettingsStore;

/// Parse a saved page capture
pub fn load_capture(json: &str) -> Result<PageCapture> {
    Ok(serde_json::from_str(json)?)
}

/// Detect the identity in a capture and resolve what the watermark would
/// show under `settings`. `None` when no account number was found.
pub fn inspect_capture(
    capture: &PageCapture,
    settings: &StoredSettings,
) -> (Detection, Option<ResolvedDisplayState>) {
    // 1. Detect role and account
    let detection = detector::detect_capture(capture);

    // 2. Resolve name and colors
    let resolved = detection
        .account
        .as_ref()
        .map(|account| resolve(account, &detection.role, settings));

    (detection, resolved)
}
