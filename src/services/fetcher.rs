//! Case-status lookup against the court's search page.
//!
//! One lookup owns one freshly launched browser from start to finish. The
//! session is closed on every path out of [`CourtFetcher::fetch`]; errors are
//! folded into [`FetchResult::Failure`] and never reach the caller as `Err`.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::clients::browser::{BrowserError, BrowserLauncher, BrowserSession, wait_for_element};
use crate::config::CourtConfig;
use crate::domain::{CaseQuery, FetchResult};
use crate::parser::extract_case_details;
use crate::services::captcha::{CaptchaGate, CheckpointError};

const CASE_TYPE_SELECT: &str = "#case_type";
const CASE_NUMBER_INPUT: &str = "#search_case_no";
const FILING_YEAR_INPUT: &str = "#rgyear";
const RESULTS_MARKER: &str = "#showList";

pub const RESULTS_TIMEOUT_MESSAGE: &str =
    "Scraping failed: Results table not found or page took too long to load.";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("timed out waiting for {0}")]
    FormTimeout(&'static str),
}

/// Performs one case lookup.
#[async_trait]
pub trait CaseFetcher: Send + Sync {
    async fn fetch(&self, query: &CaseQuery) -> FetchResult;
}

#[derive(Debug, Clone)]
pub struct FetchTimings {
    pub form_timeout: Duration,
    pub results_timeout: Duration,
    pub poll_interval: Duration,
}

impl From<&CourtConfig> for FetchTimings {
    fn from(config: &CourtConfig) -> Self {
        Self {
            form_timeout: Duration::from_secs(config.form_timeout_seconds),
            results_timeout: Duration::from_secs(config.results_timeout_seconds),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }
}

pub struct CourtFetcher {
    launcher: Arc<dyn BrowserLauncher>,
    captcha: Arc<CaptchaGate>,
    search_url: String,
    timings: FetchTimings,
}

impl CourtFetcher {
    #[must_use]
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        captcha: Arc<CaptchaGate>,
        search_url: impl Into<String>,
        timings: FetchTimings,
    ) -> Self {
        Self {
            launcher,
            captcha,
            search_url: search_url.into(),
            timings,
        }
    }

    async fn drive(
        &self,
        session: &dyn BrowserSession,
        query: &CaseQuery,
    ) -> Result<FetchResult, FetchError> {
        session.goto(&self.search_url).await?;

        if !wait_for_element(
            session,
            CASE_TYPE_SELECT,
            self.timings.form_timeout,
            self.timings.poll_interval,
        )
        .await?
        {
            return Err(FetchError::FormTimeout("case search form"));
        }

        session
            .select_option(CASE_TYPE_SELECT, query.case_type.code())
            .await?;
        session
            .type_text(CASE_NUMBER_INPUT, &query.case_number)
            .await?;
        session
            .type_text(FILING_YEAR_INPUT, &query.filing_year)
            .await?;
        debug!(case_type_code = query.case_type.code(), "Search form filled");

        self.captcha.wait_for_operator(query).await?;

        if !wait_for_element(
            session,
            RESULTS_MARKER,
            self.timings.results_timeout,
            self.timings.poll_interval,
        )
        .await?
        {
            warn!("Results marker did not appear");
            let partial = session.content().await.unwrap_or_default();
            return Ok(FetchResult::failure(RESULTS_TIMEOUT_MESSAGE, partial));
        }

        let raw_response = session.content().await?;
        let page_url = session.current_url().await.ok().flatten();
        let details = extract_case_details(&raw_response, page_url.as_deref());

        Ok(FetchResult::success(details, raw_response))
    }
}

#[async_trait]
impl CaseFetcher for CourtFetcher {
    #[instrument(skip_all, fields(case = %query))]
    async fn fetch(&self, query: &CaseQuery) -> FetchResult {
        let mut session = match self.launcher.launch().await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Could not start browser");
                return FetchResult::failure(format!("Scraping failed: {e}"), "");
            }
        };

        let outcome = self.drive(&*session, query).await;

        if let Err(e) = session.close().await {
            debug!(error = %e, "Browser close error (ignored)");
        }

        let result = outcome.unwrap_or_else(|e| {
            error!(error = %e, "Lookup failed");
            FetchResult::failure(format!("Scraping failed: {e}"), "")
        });

        info!(success = result.is_success(), "Lookup finished");
        result
    }
}
