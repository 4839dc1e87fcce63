//! Router fixtures shared by the handler tests
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use super::{AppState, router};
use crate::breeds::BreedCatalog;
use crate::cache::MemoryCache;
use crate::fallback::FallbackResponder;
use crate::orders::OrderStore;
use crate::predict::{Classifier, MockClassifier, Predictor};
use crate::providers::{MockProvider, ProviderEntry, ProviderError, ProviderKind, ProviderSet};
use crate::resolver::AnswerResolver;
use crate::retry::RetryPolicy;

pub(crate) struct TestApp {
    pub router: Router,
    // Holds the order file's directory for the life of the test
    _dir: tempfile::TempDir,
}

pub(crate) fn app_with(providers: ProviderSet, classifier: Option<MockClassifier>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Arc::new(BreedCatalog::new(vec![
        "n02088364-beagle".into(),
        "n02099601-golden_retriever".into(),
    ]));
    let cache = Arc::new(MemoryCache::new(Duration::from_secs(60), 64));
    let resolver = AnswerResolver::new(providers, cache, FallbackResponder::new(catalog.clone()));
    let classifier = classifier.map(|c| Arc::new(c) as Arc<dyn Classifier>);
    let state = AppState {
        resolver: Arc::new(resolver),
        predictor: Arc::new(Predictor::new(classifier, catalog, 0.35)),
        orders: Arc::new(OrderStore::new(dir.path().join("orders.json"))),
    };
    TestApp {
        router: router(state),
        _dir: dir,
    }
}

/// One provider that always answers (`Ok`) or always fails with a 5xx (`Err`)
pub(crate) fn single_provider(kind: ProviderKind, answer: Result<&'static str, ()>) -> ProviderSet {
    let mut mock = MockProvider::new();
    mock.expect_kind().return_const(kind);
    mock.expect_generate().returning(move |_| match answer {
        Ok(text) => Ok(text.to_string()),
        Err(()) => Err(ProviderError::Status {
            status: 503,
            body: "overloaded".into(),
        }),
    });
    mock.expect_verify().returning(move || match answer {
        Ok(_) => Ok(json!({"models": ["m"]})),
        Err(()) => Err(ProviderError::Status {
            status: 401,
            body: "bad key".into(),
        }),
    });
    ProviderSet::new(vec![ProviderEntry {
        provider: Arc::new(mock),
        retry: RetryPolicy::new(1, Duration::ZERO),
    }])
}

pub(crate) async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

pub(crate) fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub(crate) fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = app_with(ProviderSet::default(), None);
    let (status, body) = send(&app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));
}

#[tokio::test]
async fn test_cors_allows_browser_origin() {
    let app = app_with(ProviderSet::default(), None);
    let request = Request::get("/health")
        .header(header::ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert!(
        response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
    );
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = app_with(ProviderSet::default(), None);
    let (status, _) = send(&app.router, get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
