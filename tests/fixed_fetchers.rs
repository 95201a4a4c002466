//! Tests for the fixed-result fetchers

use std::sync::Arc;

use ownerchain::fetcher::{
    ConstantFetcher, ControllerFetcher, FetchError, IdentityFetcher, MockFetcher,
};
use ownerchain::models::ControllerKeyWithApiVersion;

fn key(kind: &str, name: &str) -> ControllerKeyWithApiVersion {
    ControllerKeyWithApiVersion::new("default", kind, name, "apps/v1")
}

#[tokio::test]
async fn test_identity_returns_its_input() {
    let fetcher = IdentityFetcher;

    let input = key("ReplicaSet", "web-1");
    assert_eq!(
        fetcher.find_top_level(Some(input.clone())).await.unwrap(),
        Some(input)
    );
    assert_eq!(fetcher.find_top_level(None).await.unwrap(), None);
}

#[tokio::test]
async fn test_constant_ignores_its_input() {
    let fixed = key("Deployment", "web");
    let fetcher = ConstantFetcher::new(Some(fixed.clone()));

    for input in [None, Some(key("ReplicaSet", "web-1")), Some(fixed.clone())] {
        assert_eq!(
            fetcher.find_top_level(input).await.unwrap(),
            Some(fixed.clone())
        );
    }

    let empty = ConstantFetcher::new(None);
    assert_eq!(
        empty.find_top_level(Some(key("Job", "j"))).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_mock_answers_expected_call() {
    let fetcher = MockFetcher::new(
        Some(key("ReplicaSet", "web-1")),
        Some(key("Deployment", "web")),
    );

    let top = fetcher
        .find_top_level(Some(key("ReplicaSet", "web-1")))
        .await
        .unwrap();
    assert_eq!(top, Some(key("Deployment", "web")));
}

#[tokio::test]
async fn test_mock_rejects_unexpected_call() {
    let fetcher = MockFetcher::new(Some(key("ReplicaSet", "web-1")), None);

    let err = fetcher
        .find_top_level(Some(key("ReplicaSet", "web-2")))
        .await
        .unwrap_err();

    insta::assert_snapshot!(
        err.to_string(),
        @"unexpected argument ReplicaSet default/web-2 (apps/v1), expected ReplicaSet default/web-1 (apps/v1)"
    );
}

#[tokio::test]
async fn test_mock_distinguishes_none_from_some() {
    let expects_none = MockFetcher::new(None, Some(key("Deployment", "web")));
    assert_eq!(
        expects_none.find_top_level(None).await.unwrap(),
        Some(key("Deployment", "web"))
    );
    assert!(matches!(
        expects_none.find_top_level(Some(key("Job", "j"))).await,
        Err(FetchError::AssertionMismatch { expected: None, .. })
    ));

    let expects_some = MockFetcher::new(Some(key("Job", "j")), None);
    let err = expects_some.find_top_level(None).await.unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"unexpected argument <none>, expected Job default/j (apps/v1)"
    );
}

#[tokio::test]
async fn test_fetchers_are_interchangeable() {
    let input = key("ReplicaSet", "web-1");
    let fetchers: Vec<Arc<dyn ControllerFetcher>> = vec![
        Arc::new(IdentityFetcher),
        Arc::new(ConstantFetcher::new(Some(input.clone()))),
        Arc::new(MockFetcher::new(Some(input.clone()), Some(input.clone()))),
    ];

    for fetcher in fetchers {
        assert_eq!(
            fetcher.find_top_level(Some(input.clone())).await.unwrap(),
            Some(input.clone())
        );
    }
}
