use std::sync::Arc;

use crate::config::Config;
use crate::domain::{CaseQuery, FetchResult};
use crate::state::SharedState;

/// Runs one lookup with terminal confirmation and records it like the API does.
pub async fn cmd_fetch(
    config: Config,
    case_type: &str,
    case_number: &str,
    filing_year: &str,
) -> anyhow::Result<()> {
    let shared = SharedState::new(config).await?;
    shared.store.initialize().await;
    Arc::clone(&shared.captcha).spawn_terminal_confirmation();

    let query = CaseQuery::new(case_type, case_number, filing_year);
    println!("Looking up {query}");

    let result = shared.fetcher.fetch(&query).await;

    let form = serde_json::json!({
        "caseType": case_type,
        "caseNumber": case_number,
        "filingYear": filing_year,
    });
    shared.store.append(&form, result.raw_response()).await;

    match result {
        FetchResult::Success { details, .. } => {
            println!("Parties:           {}", details.parties);
            println!("Filing date:       {}", details.filing_date);
            println!("Next hearing date: {}", details.next_hearing_date);
            if details.orders.is_empty() {
                println!("Orders:            none");
            } else {
                println!("Orders:");
                for order in &details.orders {
                    println!("  {}  {}", order.date, order.link);
                }
            }
            Ok(())
        }
        FetchResult::Failure { message, .. } => anyhow::bail!(message),
    }
}
