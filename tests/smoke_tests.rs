//! Smoke tests against a file-backed store, the way a deployment without MySQL runs.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use courtcase::config::Config;
use courtcase::db::Store;
use courtcase::domain::{CaseDetails, CaseQuery, FetchResult};
use courtcase::services::CaseFetcher;
use std::sync::Arc;
use tower::ServiceExt;

struct EchoFetcher;

#[async_trait]
impl CaseFetcher for EchoFetcher {
    async fn fetch(&self, query: &CaseQuery) -> FetchResult {
        let details = CaseDetails {
            parties: format!("Petitioner {} vs. Respondent", query.case_number),
            ..CaseDetails::default()
        };
        FetchResult::success(details, format!("<html>{query}</html>"))
    }
}

fn file_config() -> (Config, std::path::PathBuf) {
    let db_path =
        std::env::temp_dir().join(format!("courtcase-smoke-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.database.url = Some(format!("sqlite:{}", db_path.display()));
    (config, db_path)
}

#[tokio::test]
async fn records_survive_restart() {
    let (config, db_path) = file_config();

    let state = courtcase::api::create_app_state_with_fetcher(
        config.clone(),
        |_| Arc::new(EchoFetcher),
        None,
    )
    .await
    .expect("failed to create app state");
    state.store().initialize().await;

    let router = courtcase::api::router(state.clone());
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/fetch_case_data")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"caseType":"Civil Suit","caseNumber":"314","filingYear":"2015"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A second process against the same file sees the record and re-initializes cleanly.
    let reopened = Store::new(&config.database).await.unwrap();
    reopened.try_initialize().await.unwrap();
    let records = reopened.recent_queries(5).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].query_data["caseType"], "Civil Suit");
    assert_eq!(
        records[0].raw_response.as_deref(),
        Some("<html>Civil Suit 314/2015</html>")
    );

    let _ = std::fs::remove_file(db_path);
}

#[tokio::test]
async fn unreachable_database_does_not_block_lookups() {
    let mut config = Config::default();
    config.database.port = 1;
    config.database.connect_timeout_seconds = 1;

    let state = courtcase::api::create_app_state_with_fetcher(config, |_| Arc::new(EchoFetcher), None)
        .await
        .expect("lazy pool must not connect at startup");
    state.store().initialize().await;

    let response = courtcase::api::router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/fetch_case_data")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"caseType":"Writ Petition","caseNumber":"9","filingYear":"2024"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
