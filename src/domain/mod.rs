//! Domain types for case-status lookups.
//!
//! A [`CaseQuery`] is what the operator asked for, a [`FetchResult`] is what one
//! browser-driven lookup produced. Neither is persisted directly; the store only
//! keeps the submitted request body and the raw page content.

pub mod events;

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Placeholder for a field the result page did not yield.
pub const NOT_AVAILABLE: &str = "N/A";

/// Case types offered by the court's search form, with their option codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CaseType {
    #[default]
    CriminalAppeal,
    CivilSuit,
    WritPetition,
}

impl CaseType {
    pub const ALL: [Self; 3] = [Self::CriminalAppeal, Self::CivilSuit, Self::WritPetition];

    /// Maps the display name submitted by clients to a case type.
    ///
    /// Unrecognised names fall back to [`CaseType::CriminalAppeal`], which is
    /// what the search form itself preselects.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == name)
            .unwrap_or_default()
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CriminalAppeal => "Criminal Appeal",
            Self::CivilSuit => "Civil Suit",
            Self::WritPetition => "Writ Petition",
        }
    }

    /// Value of the `<option>` in the search form's case-type selector.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::CriminalAppeal => "19",
            Self::CivilSuit => "24",
            Self::WritPetition => "63",
        }
    }
}

impl fmt::Display for CaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated lookup request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseQuery {
    pub case_type: CaseType,
    pub case_number: String,
    pub filing_year: String,
}

impl CaseQuery {
    #[must_use]
    pub fn new(
        case_type: &str,
        case_number: impl Into<String>,
        filing_year: impl Into<String>,
    ) -> Self {
        Self {
            case_type: CaseType::from_name(case_type),
            case_number: case_number.into(),
            filing_year: filing_year.into(),
        }
    }
}

impl fmt::Display for CaseQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{}",
            self.case_type, self.case_number, self.filing_year
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLink {
    pub date: String,
    pub link: String,
}

/// The four fields read off a rendered result page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseDetails {
    pub parties: String,
    pub filing_date: String,
    pub next_hearing_date: String,
    pub orders: Vec<OrderLink>,
}

impl Default for CaseDetails {
    fn default() -> Self {
        Self {
            parties: NOT_AVAILABLE.to_string(),
            filing_date: NOT_AVAILABLE.to_string(),
            next_hearing_date: NOT_AVAILABLE.to_string(),
            orders: Vec::new(),
        }
    }
}

impl CaseDetails {
    /// Combines independently extracted fields, defaulting the absent ones.
    #[must_use]
    pub fn from_parts(
        parties: Option<String>,
        filing_date: Option<String>,
        next_hearing_date: Option<String>,
        orders: Option<Vec<OrderLink>>,
    ) -> Self {
        let na = || NOT_AVAILABLE.to_string();
        Self {
            parties: parties.unwrap_or_else(na),
            filing_date: filing_date.unwrap_or_else(na),
            next_hearing_date: next_hearing_date.unwrap_or_else(na),
            orders: orders.unwrap_or_default(),
        }
    }
}

/// Outcome of one lookup, consumed by the request handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    Success {
        details: CaseDetails,
        raw_response: String,
    },
    Failure {
        message: String,
        /// Whatever page content was captured before failing; often empty.
        raw_response: String,
    },
}

impl FetchResult {
    #[must_use]
    pub const fn success(details: CaseDetails, raw_response: String) -> Self {
        Self::Success {
            details,
            raw_response,
        }
    }

    pub fn failure(message: impl Into<String>, raw_response: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
            raw_response: raw_response.into(),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    #[must_use]
    pub fn raw_response(&self) -> &str {
        match self {
            Self::Success { raw_response, .. } | Self::Failure { raw_response, .. } => {
                raw_response
            }
        }
    }
}

/// Identifier of a pending CAPTCHA checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckpointId(Uuid);

impl CheckpointId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for CheckpointId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for CheckpointId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}
