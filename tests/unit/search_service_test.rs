//! Unit tests for the search/resolution service and the HTTP backend parsers.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use gitbrowser_core::services::data_service::Executor;
use gitbrowser_core::services::search_backend::{
    parse_doh_answer, parse_suggestions, rewrite_host, SearchBackend,
};
use gitbrowser_core::services::search_service::SearchService;
use gitbrowser_core::types::command::{DomainResolution, SearchCommand, SearchData};
use gitbrowser_core::types::errors::SearchError;
use gitbrowser_core::types::settings::SearchSettings;
use tokio::sync::{oneshot, watch};
use url::Url;

const RESOLVED: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7));

/// Backend that records every call and answers once its gate opens.
struct MockBackend {
    calls: Mutex<Vec<String>>,
    gate: watch::Receiver<bool>,
    fail: bool,
}

#[async_trait]
impl SearchBackend for MockBackend {
    async fn fetch_suggestions(&self, query: &str) -> Result<Vec<String>, SearchError> {
        self.calls.lock().unwrap().push(format!("suggest:{}", query));
        let _ = self.gate.clone().wait_for(|open| *open).await;
        if self.fail {
            return Err(SearchError::Network("offline".to_string()));
        }
        Ok((1..=10).map(|n| format!("{} {}", query, n)).collect())
    }

    async fn resolve_domain(&self, url: &Url) -> Result<Url, SearchError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("resolve:{}", url.host_str().unwrap_or_default()));
        let _ = self.gate.clone().wait_for(|open| *open).await;
        if self.fail {
            return Err(SearchError::ResolutionFailed("nxdomain".to_string()));
        }
        rewrite_host(url, RESOLVED)
    }
}

struct Fixture {
    service: SearchService,
    backend: Arc<MockBackend>,
    gate: watch::Sender<bool>,
}

impl Fixture {
    fn new(settings: SearchSettings, fail: bool) -> Self {
        let (gate, gate_rx) = watch::channel(false);
        let backend = Arc::new(MockBackend {
            calls: Mutex::new(Vec::new()),
            gate: gate_rx,
            fail,
        });
        let service = SearchService::new(backend.clone(), &settings, &Executor::Current).unwrap();
        Self {
            service,
            backend,
            gate,
        }
    }

    fn calls(&self) -> Vec<String> {
        self.backend.calls.lock().unwrap().clone()
    }

    async fn wait_for_calls(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while self.calls().len() < count {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("backend not called in time");
    }

    fn open_gate(&self) {
        self.gate.send_replace(true);
    }
}

fn resolving() -> SearchSettings {
    SearchSettings {
        resolve_domains: true,
        ..SearchSettings::default()
    }
}

// === Suggestions ===

#[tokio::test]
async fn test_concurrent_same_query_hits_backend_once() {
    let f = Fixture::new(SearchSettings::default(), false);
    let queries = ["abc", "abc", " ABC ", "abc", "Abc"];
    let handles: Vec<_> = queries
        .iter()
        .map(|q| {
            let service = f.service.clone();
            let q = q.to_string();
            tokio::spawn(async move { service.suggestions(&q).await })
        })
        .collect();

    f.wait_for_calls(1).await;
    tokio::time::timeout(Duration::from_secs(1), async {
        while f.service.service().executions_joined() < 4 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    f.open_gate();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }
    assert_eq!(f.calls(), vec!["suggest:abc".to_string()]);
    assert!(results.iter().all(|r| r == &results[0]));
    assert_eq!(results[0].len(), 8, "truncated to max_suggestions");
}

#[tokio::test]
async fn test_distinct_queries_hit_backend_separately() {
    let f = Fixture::new(SearchSettings::default(), false);
    f.open_gate();

    let (abc, xyz) = tokio::join!(f.service.suggestions("abc"), f.service.suggestions("xyz"));

    assert_eq!(abc[0], "abc 1");
    assert_eq!(xyz[0], "xyz 1");
    let mut calls = f.calls();
    calls.sort();
    assert_eq!(calls, vec!["suggest:abc", "suggest:xyz"]);
}

#[tokio::test]
async fn test_blank_query_skips_backend() {
    let f = Fixture::new(SearchSettings::default(), false);
    assert!(f.service.suggestions("   ").await.is_empty());
    assert!(f.calls().is_empty());
}

#[tokio::test]
async fn test_backend_failure_yields_empty_suggestions() {
    let f = Fixture::new(SearchSettings::default(), true);
    f.open_gate();

    let (a, b) = tokio::join!(f.service.suggestions("abc"), f.service.suggestions("abc"));
    assert!(a.is_empty());
    assert!(b.is_empty());
}

#[tokio::test]
async fn test_zero_max_suggestions_means_unlimited() {
    let settings = SearchSettings {
        max_suggestions: 0,
        ..SearchSettings::default()
    };
    let f = Fixture::new(settings, false);
    f.open_gate();
    assert_eq!(f.service.suggestions("abc").await.len(), 10);
}

// === Domain resolution ===

#[tokio::test]
async fn test_resolution_disabled_returns_url_unchanged() {
    let f = Fixture::new(SearchSettings::default(), false);
    let url = Url::parse("https://example.com/a").unwrap();

    let resolution = f.service.resolve_domain(&url).await.unwrap();
    assert_eq!(resolution, DomainResolution::Unchanged(url));
    assert!(f.calls().is_empty());
}

#[tokio::test]
async fn test_ip_literal_is_not_resolved() {
    let f = Fixture::new(resolving(), false);
    let url = Url::parse("http://127.0.0.1:8080/x").unwrap();

    let resolution = f.service.resolve_domain(&url).await.unwrap();
    assert_eq!(resolution, DomainResolution::Unchanged(url));
    assert!(f.calls().is_empty());
}

#[tokio::test]
async fn test_same_host_resolves_once_and_keeps_each_path() {
    let f = Fixture::new(resolving(), false);
    let first = Url::parse("https://Example.com/one?q=1").unwrap();
    let second = Url::parse("https://example.com:8443/two").unwrap();

    let a = {
        let service = f.service.clone();
        let url = first.clone();
        tokio::spawn(async move { service.resolve_domain(&url).await })
    };
    f.wait_for_calls(1).await;
    let b = {
        let service = f.service.clone();
        let url = second.clone();
        tokio::spawn(async move { service.resolve_domain(&url).await })
    };
    tokio::time::timeout(Duration::from_secs(1), async {
        while f.service.service().executions_joined() < 1 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    f.open_gate();

    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();
    assert_eq!(f.calls(), vec!["resolve:example.com".to_string()]);

    assert!(matches!(a, DomainResolution::Resolved(_)));
    assert_eq!(a.url().as_str(), "https://10.0.0.7/one?q=1");
    assert_eq!(b.into_url().as_str(), "https://10.0.0.7:8443/two");
}

#[tokio::test]
async fn test_engine_forms_deliver_each_callers_own_url() {
    let f = Fixture::new(resolving(), false);
    let engine = f.service.service();
    let resolve = |url: &str| SearchCommand::ResolveDomain {
        url: Url::parse(url).unwrap(),
    };

    let first = engine.execute_stream(resolve("https://example.com/one"));
    let second = engine.execute_stream(resolve("https://EXAMPLE.com:8443/two?page=2"));
    let (tx, callback) = oneshot::channel();
    engine.execute_with(resolve("http://example.com/three#top"), move |outcome| {
        let _ = tx.send(outcome);
    });

    f.wait_for_calls(1).await;
    tokio::time::timeout(Duration::from_secs(1), async {
        while engine.executions_joined() < 2 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    f.open_gate();

    let resolved = |url: &str| -> Result<SearchData, SearchError> {
        Ok(SearchData::Resolution(DomainResolution::Resolved(
            Url::parse(url).unwrap(),
        )))
    };
    assert_eq!(
        first.collect::<Vec<_>>().await,
        vec![resolved("https://10.0.0.7/one")]
    );
    assert_eq!(
        second.collect::<Vec<_>>().await,
        vec![resolved("https://10.0.0.7:8443/two?page=2")]
    );
    assert_eq!(callback.await.unwrap(), resolved("http://10.0.0.7/three#top"));
    assert_eq!(f.calls(), vec!["resolve:example.com".to_string()]);
}

#[tokio::test]
async fn test_resolution_error_reaches_every_caller() {
    let f = Fixture::new(resolving(), true);
    let url = Url::parse("https://missing.example/").unwrap();

    let (a, b, _) = tokio::join!(
        f.service.resolve_domain(&url),
        f.service.resolve_domain(&url),
        async {
            f.wait_for_calls(1).await;
            while f.service.service().executions_joined() < 1 {
                tokio::task::yield_now().await;
            }
            f.open_gate();
        },
    );
    let expected = Err(SearchError::ResolutionFailed("nxdomain".to_string()));
    assert_eq!(a, expected);
    assert_eq!(b, expected);
    assert_eq!(f.calls().len(), 1);
}

#[tokio::test]
async fn test_after_shutdown() {
    let f = Fixture::new(resolving(), false);
    f.service.shutdown().await;

    assert!(f.service.suggestions("abc").await.is_empty());
    let url = Url::parse("https://example.com").unwrap();
    assert_eq!(
        f.service.resolve_domain(&url).await,
        Err(SearchError::ServiceStopped)
    );
}

// === Response parsing ===

#[test]
fn test_parse_opensearch_suggestions() {
    let body = r#"["rust", ["rust book", "rustup", 42, "rust analyzer"], [], []]"#;
    assert_eq!(
        parse_suggestions(body).unwrap(),
        vec!["rust book", "rustup", "rust analyzer"]
    );
}

#[test]
fn test_parse_suggestions_rejects_unexpected_shape() {
    assert!(matches!(
        parse_suggestions(r#"{"q": "rust"}"#),
        Err(SearchError::InvalidResponse(_))
    ));
    assert!(matches!(
        parse_suggestions("not json"),
        Err(SearchError::InvalidResponse(_))
    ));
}

#[test]
fn test_parse_doh_answer_skips_non_address_records() {
    let body = r#"{
        "Status": 0,
        "Answer": [
            {"name": "www.example.com", "type": 5, "TTL": 60, "data": "example.com."},
            {"name": "example.com", "type": 1, "TTL": 60, "data": "93.184.216.34"}
        ]
    }"#;
    assert_eq!(
        parse_doh_answer(body, "www.example.com").unwrap(),
        IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34))
    );
}

#[test]
fn test_parse_doh_answer_failures() {
    assert!(matches!(
        parse_doh_answer(r#"{"Status": 3}"#, "missing.example"),
        Err(SearchError::ResolutionFailed(_))
    ));
    assert!(matches!(
        parse_doh_answer(r#"{"Status": 0, "Answer": []}"#, "empty.example"),
        Err(SearchError::ResolutionFailed(_))
    ));
}

#[test]
fn test_rewrite_host_keeps_everything_else() {
    let url = Url::parse("https://user@example.com:444/p?q=1#frag").unwrap();
    let rewritten = rewrite_host(&url, "::1".parse().unwrap()).unwrap();
    assert_eq!(rewritten.as_str(), "https://user@[::1]:444/p?q=1#frag");
}
