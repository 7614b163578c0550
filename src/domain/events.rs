//! Domain events for the application.
//!
//! Events are sent via the event bus to SSE subscribers and to the terminal
//! notifier so an operator learns when a CAPTCHA needs solving.

use serde::Serialize;

use super::CheckpointId;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum NotificationEvent {
    CaptchaRequired {
        id: CheckpointId,
        case_type: String,
        case_number: String,
        filing_year: String,
    },
    CaptchaResolved {
        id: CheckpointId,
        outcome: CheckpointOutcome,
    },
    FetchFinished {
        case_number: String,
        filing_year: String,
        success: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointOutcome {
    Confirmed,
    Cancelled,
    Expired,
    Abandoned,
}
