//! Router-level tests: requests go through the full axum stack with
//! in-memory collaborators behind the selector.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use signaldesk_api::{app, AppState};
use signaldesk_common::{Industry, OrganizationProfile, SignalStrength};
use signaldesk_select::testing::{article, profile, target, MockCorpus, MockProfiles, StubScorer};
use signaldesk_select::traits::RelevanceScorer;
use signaldesk_select::ArticleSelector;

fn router() -> (Router, OrganizationProfile) {
    let org = profile(Industry::Marketing);
    let acme = target("Acme");
    let a = article("Acme wins national retail media account", "Adweek");
    let b = article("Acme hires chief data officer from Globex", "Campaign");
    let corpus = Arc::new(
        MockCorpus::new()
            .with_match(&acme, &a, 0.81, SignalStrength::Strong)
            .with_match(&acme, &b, 0.64, SignalStrength::Moderate),
    );
    let scorer: Arc<dyn RelevanceScorer> = Arc::new(StubScorer::constant(77));
    let selector = ArticleSelector::builder()
        .embeddings(corpus.clone())
        .articles(corpus)
        .profiles(Arc::new(
            MockProfiles::new().with_organization(org.clone(), vec![acme]),
        ))
        .scorer(Some(scorer))
        .build();
    (app(Arc::new(AppState { selector })), org)
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(body: Value) -> Request<Body> {
    Request::post("/api/selections")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_check_answers_ok() {
    let (router, _) = router();
    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn post_returns_ranked_selection() {
    let (router, org) = router();
    let (status, body) = send(
        router,
        post_json(serde_json::json!({ "organization_id": org.id, "hours_back": 12 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let articles = body["articles"].as_array().unwrap();
    assert_eq!(articles.len(), 2);
    assert_eq!(articles[0]["relevance_score"], 77);
    assert_eq!(articles[0]["source_name"], "Adweek");
    assert_eq!(body["stats"]["final_count"], 2);
    assert_eq!(body["target_signals"][0]["target_name"], "Acme");
}

#[tokio::test]
async fn missing_organization_is_bad_request() {
    let (router, _) = router();
    let (status, body) = send(router, post_json(serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("organization_id"));
}

#[tokio::test]
async fn unknown_organization_is_not_found() {
    let (router, _) = router();
    let (status, body) = send(
        router,
        post_json(serde_json::json!({ "organization_id": Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn conflicting_lookbacks_are_bad_request() {
    let (router, org) = router();
    let (status, _) = send(
        router,
        post_json(serde_json::json!({
            "organization_id": org.id,
            "hours_back": 6,
            "use_today_boundary": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_form_reads_query_parameters() {
    let (router, org) = router();
    let uri = format!(
        "/api/organizations/{}/selection?skip_scoring=true&min_strength=strong",
        org.id
    );
    let (status, body) = send(router, Request::get(uri).body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    let articles = body["articles"].as_array().unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0]["relevance_score"], 81);
    assert_eq!(body["stats"]["scoring_skipped"], true);
}

#[tokio::test]
async fn get_form_rejects_malformed_id() {
    let (router, _) = router();
    let (status, _) = send(
        router,
        Request::get("/api/organizations/not-a-uuid/selection")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
