use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use httpmock::MockServer;
use scm_audit_log::application::error::FetchFailure;
use scm_audit_log::application::fetcher::AuditLogFetcher;
use scm_audit_log::application::pagination::PageRequest;
use scm_audit_log::application::request_key;
use scm_audit_log::application::viewer::{AuditLogViewer, Submission, ViewOutcome};
use scm_audit_log::cache::CacheConfig;
use scm_audit_log::config::ServerSettings;
use scm_audit_log::domain::filters::FilterState;
use scm_audit_log::infra::client::ScmClient;
use serde_json::json;
use url::Url;

const AUDIT_LOG_PATH: &str = "/scm/api/v2/audit-log";

fn server_settings(server: &MockServer) -> ServerSettings {
    let url = Url::parse(&format!("{}/scm/", server.base_url())).expect("valid url");
    ServerSettings {
        index_url: url.join("api/v2/").expect("valid index url"),
        url,
        context_path: "/scm".to_string(),
        timeout: Duration::from_secs(5),
    }
}

fn page_body(page: u32, page_total: u32, entries: &[&str]) -> String {
    let entries: Vec<_> = entries
        .iter()
        .map(|text| {
            json!({
                "timestamp": "2023-01-01T12:00:00Z",
                "entity": "hitchhiker/heart-of-gold",
                "user": "trillian",
                "action": "modified",
                "entry": text,
            })
        })
        .collect();
    json!({
        "page": page.saturating_sub(1),
        "pageTotal": page_total,
        "_embedded": {
            "entries": entries,
            "labels": { "labels": ["repository", "user"] }
        }
    })
    .to_string()
}

async fn viewer_for(server: &MockServer) -> AuditLogViewer {
    server
        .mock_async(|when, then| {
            when.method("GET").path("/scm/api/v2/");
            then.status(200)
                .header("content-type", "application/json")
                .body(
                    json!({
                        "_links": {
                            "self": { "href": "/scm/api/v2/" },
                            "auditLog": { "href": AUDIT_LOG_PATH },
                            "auditLogCsvExport": { "href": "/scm/api/v2/audit-log/export/csv" }
                        }
                    })
                    .to_string(),
                );
        })
        .await;

    let client = Arc::new(ScmClient::new(&server_settings(server), None).expect("client"));
    let links = client.discover_links().await.expect("index reachable");
    let fetcher = AuditLogFetcher::new(client, &CacheConfig::default());
    AuditLogViewer::from_links(fetcher, &links).expect("audit log available")
}

fn page(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).expect("non-zero page")
}

#[tokio::test]
async fn second_page_is_served_as_returned() {
    let server = MockServer::start_async().await;
    let viewer = viewer_for(&server).await;
    let mock = server
        .mock_async(|when, then| {
            when.method("GET")
                .path(AUDIT_LOG_PATH)
                .query_param("pageNumber", "2");
            then.status(200)
                .header("content-type", "application/json")
                .body(page_body(2, 2, &["e1", "e2"]));
        })
        .await;

    let submission = viewer
        .show(PageRequest::new(page(2), FilterState::new()))
        .await;

    mock.assert_async().await;
    let Submission::Committed(view) = submission else {
        panic!("expected commit, got {submission:?}");
    };
    let served = view.page().expect("page loaded");
    assert_eq!(served.page.get(), 2);
    assert_eq!(served.page_total, 2);
    let texts: Vec<_> = served.entries.iter().map(|e| e.entry.as_str()).collect();
    assert_eq!(texts, vec!["e1", "e2"]);
    assert_eq!(view.route(), "/admin/audit-log/2");
}

#[tokio::test]
async fn filters_reach_the_host_encoded() {
    let server = MockServer::start_async().await;
    let viewer = viewer_for(&server).await;
    let mock = server
        .mock_async(|when, then| {
            when.method("GET")
                .path(AUDIT_LOG_PATH)
                .query_param("pageNumber", "1")
                .query_param("entity", "acme/repo")
                .query_param("action", "deleted")
                .query_param("from", "2023-01-01");
            then.status(200)
                .header("content-type", "application/json")
                .body(page_body(1, 1, &["deleted repository acme/repo"]));
        })
        .await;

    let filters = FilterState::from_pairs([
        ("from", "2023-01-01"),
        ("action", "deleted"),
        ("entity", "acme/repo"),
    ])
    .expect("valid filters");
    let submission = viewer.show(PageRequest::first(filters)).await;

    mock.assert_async().await;
    let Submission::Committed(view) = submission else {
        panic!("expected commit");
    };
    assert!(
        view.identity
            .as_str()
            .ends_with("?pageNumber=1&entity=acme%2Frepo&action=deleted&from=2023-01-01")
    );
    assert_eq!(
        viewer.export_link(&view.request.filters),
        Some(format!(
            "{}/scm/api/v2/audit-log/export/csv?entity=acme%2Frepo&action=deleted&from=2023-01-01",
            server.base_url()
        ))
    );
}

#[tokio::test]
async fn out_of_range_page_is_redirected_to_last_page() {
    let server = MockServer::start_async().await;
    let viewer = viewer_for(&server).await;
    let beyond = server
        .mock_async(|when, then| {
            when.method("GET")
                .path(AUDIT_LOG_PATH)
                .query_param("pageNumber", "9");
            then.status(200)
                .header("content-type", "application/json")
                .body(page_body(9, 5, &[]));
        })
        .await;
    let last = server
        .mock_async(|when, then| {
            when.method("GET")
                .path(AUDIT_LOG_PATH)
                .query_param("pageNumber", "5");
            then.status(200)
                .header("content-type", "application/json")
                .body(page_body(5, 5, &["e41"]));
        })
        .await;

    let submission = viewer
        .show(PageRequest::new(page(9), FilterState::new()))
        .await;

    beyond.assert_async().await;
    last.assert_async().await;
    let Submission::Committed(view) = submission else {
        panic!("expected commit");
    };
    assert_eq!(view.request.page.get(), 5);
    assert!(matches!(
        view.outcome,
        ViewOutcome::Loaded {
            redirected_from: Some(asked),
            ..
        } if asked.get() == 9
    ));
}

#[tokio::test]
async fn empty_log_serves_first_page() {
    let server = MockServer::start_async().await;
    let viewer = viewer_for(&server).await;
    let mock = server
        .mock_async(|when, then| {
            when.method("GET")
                .path(AUDIT_LOG_PATH)
                .query_param("pageNumber", "1");
            then.status(200)
                .header("content-type", "application/json")
                .body(page_body(1, 0, &[]));
        })
        .await;

    let submission = viewer.show(PageRequest::first(FilterState::new())).await;

    mock.assert_hits_async(1).await;
    let Submission::Committed(view) = submission else {
        panic!("expected commit");
    };
    let served = view.page().expect("page loaded");
    assert!(served.entries.is_empty());
    assert_eq!(served.page_total, 0);
}

#[tokio::test]
async fn body_without_page_total_is_malformed() {
    let server = MockServer::start_async().await;
    let viewer = viewer_for(&server).await;
    server
        .mock_async(|when, then| {
            when.method("GET").path(AUDIT_LOG_PATH);
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"_embedded": {"entries": []}}"#);
        })
        .await;

    let Submission::Committed(view) = viewer.show(PageRequest::first(FilterState::new())).await
    else {
        panic!("expected commit");
    };
    assert!(matches!(
        view.outcome,
        ViewOutcome::Failed {
            failure: FetchFailure::MalformedResponse { .. }
        }
    ));
}

#[tokio::test]
async fn concurrent_identical_fetches_issue_one_request() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method("GET")
                .path(AUDIT_LOG_PATH)
                .query_param("pageNumber", "3");
            then.status(200)
                .header("content-type", "application/json")
                .delay(Duration::from_millis(200))
                .body(page_body(3, 4, &["e31"]));
        })
        .await;

    let client = Arc::new(ScmClient::new(&server_settings(&server), None).expect("client"));
    let fetcher = AuditLogFetcher::new(client, &CacheConfig::default());
    let identity = request_key::build(
        &format!("{}{AUDIT_LOG_PATH}", server.base_url()),
        page(3),
        &FilterState::new(),
    );

    let (first, second) = tokio::join!(fetcher.fetch(&identity), fetcher.fetch(&identity));
    let first = first.expect("fetch succeeds");
    let second = second.expect("fetch succeeds");

    mock.assert_hits_async(1).await;
    assert!(Arc::ptr_eq(&first, &second));
}
