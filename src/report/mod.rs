//! Detection reports for saved page captures

pub mod generator;

use crate::controller::observer_target;
use crate::detector::account::{scan_visible_accounts, DIRECT_STRATEGIES, SWITCHED_STRATEGIES};
use crate::detector::{detect_capture, role::ROLE_STRATEGIES};
use crate::models::{AccountNumber, Detection, PageCapture, ResolvedDisplayState, StoredSettings};
use crate::resolver::resolve;
use serde::Serialize;

pub use generator::generate_markdown_report;

/// Text length cap used when listing every account number on the page
const CANDIDATE_SCAN_MAX_CHARS: usize = 200;

/// Result of one account strategy, in the order detection tries them
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyOutcome {
    pub name: &'static str,
    pub account: Option<AccountNumber>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionReport {
    pub url: String,
    pub detection: Detection,
    pub resolved: Option<ResolvedDisplayState>,
    /// Role strategy that recognised the switch, if any
    pub role_strategy: Option<&'static str>,
    pub account_strategies: Vec<StrategyOutcome>,
    pub candidates: Vec<AccountNumber>,
    pub observer_target: Option<&'static str>,
}

impl DetectionReport {
    /// Name of the strategy whose answer detection used
    pub fn winning_strategy(&self) -> Option<&'static str> {
        self.account_strategies
            .iter()
            .find(|outcome| outcome.account.is_some())
            .map(|outcome| outcome.name)
    }
}

/// Run detection on a capture and record how each strategy fared
pub fn inspect(capture: &PageCapture, settings: &StoredSettings) -> DetectionReport {
    let document = &capture.document;
    let url = capture.url.as_str();

    // 1. Same pass the page runs
    let detection = detect_capture(capture);

    // 2. Which strategies would have answered
    let role_strategy = ROLE_STRATEGIES
        .iter()
        .find(|(_, strategy)| strategy(document, url).is_some())
        .map(|(name, _)| *name);

    let strategies = if detection.role.is_switch_role {
        SWITCHED_STRATEGIES
    } else {
        DIRECT_STRATEGIES
    };
    let account_strategies = strategies
        .iter()
        .map(|(name, strategy)| StrategyOutcome {
            name: *name,
            account: strategy(document, url, &detection.role),
        })
        .collect();

    // 3. Display state under the given settings
    let resolved = detection
        .account
        .as_ref()
        .map(|account| resolve(account, &detection.role, settings));

    DetectionReport {
        url: capture.url.clone(),
        resolved,
        role_strategy,
        account_strategies,
        candidates: scan_visible_accounts(document, CANDIDATE_SCAN_MAX_CHARS),
        observer_target: observer_target(document),
        detection,
    }
}

pub fn generate_report(report: &DetectionReport) -> String {
    generator::generate_markdown_report(report)
}
