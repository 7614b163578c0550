use axum::{Json, body::Bytes, extract::State};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::validation::{MISSING_FORM_DATA, required_field};
use super::{ApiError, AppState};
use crate::domain::events::NotificationEvent;
use crate::domain::{CaseDetails, CaseQuery, FetchResult};

#[derive(Debug, Serialize)]
pub struct CaseDataResponse {
    pub success: bool,
    #[serde(flatten)]
    pub details: CaseDetails,
}

/// Looks up one case on the court site.
///
/// # Endpoint
/// `POST /api/fetch_case_data`
///
/// Expects `caseType`, `caseNumber` and `filingYear`. Every attempt that gets
/// past validation is recorded, whatever its outcome.
pub async fn fetch_case_data(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<CaseDataResponse>, ApiError> {
    let form: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|_| ApiError::validation(MISSING_FORM_DATA))?;

    let case_type = required_field(&form, "caseType")?;
    let case_number = required_field(&form, "caseNumber")?;
    let filing_year = required_field(&form, "filingYear")?;

    let query = CaseQuery::new(&case_type, case_number, filing_year);
    info!(case = %query, "Fetching case data");

    let result = state.fetcher().fetch(&query).await;

    state.store().append(&form, result.raw_response()).await;

    let outcome = if result.is_success() { "success" } else { "failure" };
    metrics::counter!("case_fetches_total", "outcome" => outcome).increment(1);
    let _ = state.event_bus().send(NotificationEvent::FetchFinished {
        case_number: query.case_number.clone(),
        filing_year: query.filing_year.clone(),
        success: result.is_success(),
    });

    match result {
        FetchResult::Success { details, .. } => Ok(Json(CaseDataResponse {
            success: true,
            details,
        })),
        FetchResult::Failure { message, .. } => {
            warn!(case = %query, %message, "Case lookup failed");
            Err(ApiError::NotFound(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderLink;

    #[test]
    fn success_body_is_flat() {
        let response = CaseDataResponse {
            success: true,
            details: CaseDetails {
                parties: "A vs. B".to_string(),
                filing_date: "01-02-2023".to_string(),
                next_hearing_date: "N/A".to_string(),
                orders: vec![OrderLink {
                    date: "05-03-2023".to_string(),
                    link: "https://example.org/o.pdf".to_string(),
                }],
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["parties"], "A vs. B");
        assert_eq!(json["filingDate"], "01-02-2023");
        assert_eq!(json["nextHearingDate"], "N/A");
        assert_eq!(json["orders"][0]["link"], "https://example.org/o.pdf");
        assert!(json.get("details").is_none());
    }
}
