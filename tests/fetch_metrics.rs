use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use httpmock::MockServer;
use metrics_util::debugging::DebuggingRecorder;
use scm_audit_log::application::fetcher::AuditLogFetcher;
use scm_audit_log::application::pagination::PageRequest;
use scm_audit_log::application::viewer::{AuditLogViewer, Submission};
use scm_audit_log::cache::CacheConfig;
use scm_audit_log::config::ServerSettings;
use scm_audit_log::domain::filters::FilterState;
use scm_audit_log::infra::client::ScmClient;
use url::Url;

const AUDIT_LOG_PATH: &str = "/api/v2/audit-log";

fn body(page_total: u32) -> String {
    format!(r#"{{"page": 0, "pageTotal": {page_total}, "_embedded": {{"entries": []}}}}"#)
}

fn page(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).expect("non-zero page")
}

#[tokio::test]
async fn viewer_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let server = MockServer::start_async().await;
    for (number, delay_ms) in [("1", 0), ("2", 0), ("3", 0), ("4", 300)] {
        server
            .mock_async(|when, then| {
                when.method("GET")
                    .path(AUDIT_LOG_PATH)
                    .query_param("pageNumber", number);
                then.status(200)
                    .header("content-type", "application/json")
                    .delay(Duration::from_millis(delay_ms))
                    .body(body(4));
            })
            .await;
    }
    server
        .mock_async(|when, then| {
            when.method("GET")
                .path(AUDIT_LOG_PATH)
                .query_param("pageNumber", "7");
            then.status(200)
                .header("content-type", "application/json")
                .body(body(3));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method("GET")
                .path(AUDIT_LOG_PATH)
                .query_param("pageNumber", "5");
            then.status(500).body("boom");
        })
        .await;

    let url = Url::parse(&format!("{}/", server.base_url())).expect("valid url");
    let settings = ServerSettings {
        index_url: url.join("api/v2/").expect("valid index"),
        url,
        context_path: String::new(),
        timeout: Duration::from_secs(5),
    };
    let client = Arc::new(ScmClient::new(&settings, None).expect("client"));
    let cache = CacheConfig {
        page_limit: 2,
        ..Default::default()
    };
    let fetcher = AuditLogFetcher::new(client, &cache);
    let viewer = AuditLogViewer::new(
        fetcher,
        format!("{}{AUDIT_LOG_PATH}", server.base_url()),
        None,
    );
    let request = |n: u32| PageRequest::new(page(n), FilterState::new());

    // miss, hit, then two more pages to evict the first
    viewer.show(request(1)).await;
    viewer.show(request(1)).await;
    viewer.show(request(2)).await;
    viewer.show(request(3)).await;

    // out of range, corrected to the cached page 3
    viewer.show(request(7)).await;
    viewer.reload(request(1)).await;

    // server failure
    viewer.show(request(5)).await;

    // two submissions of the same slow page: the first is superseded and the
    // second joins its in-flight request
    let (first, second) = tokio::join!(viewer.show(request(4)), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        viewer.show(request(4)).await
    });
    assert!(matches!(first, Submission::Superseded { .. }));
    assert!(matches!(second, Submission::Committed(_)));

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "scm_audit_log_fetch_total",
        "scm_audit_log_fetch_ms",
        "scm_audit_log_fetch_failure_total",
        "scm_audit_log_fetch_coalesced_total",
        "scm_audit_log_cache_hit_total",
        "scm_audit_log_cache_miss_total",
        "scm_audit_log_cache_evict_total",
        "scm_audit_log_page_redirect_total",
        "scm_audit_log_stale_discard_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
