mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use chrono::Utc;
use serde_json::{Value, json};
use tower::ServiceExt;

use dasvid::app::build_router;
use dasvid::services::dasvid::DasvidServices;
use dasvid::services::keys::Jwk;
use dasvid::state::AppState;

use common::*;

fn app(mint_zkp: bool) -> Router {
    let services = DasvidServices {
        workload_key: workload_key(),
        asserter: Arc::new(asserter(mint_zkp)),
        validator: Arc::new(validator().require_proof(mint_zkp)),
    };
    build_router(
        AppState::new(services, Duration::from_secs(10)),
        Duration::from_secs(30),
    )
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .expect("request");

    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, json)
}

#[tokio::test]
async fn health_reports_ok_with_request_id() {
    let response = app(true)
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let (status, body) = send(app(true), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));

    // Health lives at the root only.
    let (status, _) = send(app(true), Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn keys_publishes_workload_jwk() {
    let (status, body) = send(app(true), Method::GET, "/api/v1/keys", None).await;
    assert_eq!(status, StatusCode::OK);

    let expected = Jwk::from_public_key(workload_key().public_key());
    assert_eq!(body["keys"][0]["kid"], json!(expected.kid));
    assert_eq!(body["keys"][0]["n"], json!(expected.n));
    assert_eq!(body["keys"][0]["alg"], "RS256");
}

#[tokio::test]
async fn mint_then_validate() {
    let oauth = oauth_token(&oauth_claims(Utc::now()));

    let (status, minted) = send(
        app(true),
        Method::POST,
        "/api/v1/mint",
        Some(json!({"access_token": oauth, "sub": SUBJECT_ID})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{minted}");
    assert_eq!(minted["zkp"], true);
    let dasvid = minted["dasvid"].as_str().expect("dasvid").to_string();

    let (status, verdict) = send(
        app(true),
        Method::POST,
        "/api/v1/validate",
        Some(json!({"dasvid": dasvid})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{verdict}");
    assert_eq!(verdict["result"], "accepted");
    assert_eq!(verdict["claims"]["dpa"], ISSUER);
    assert_eq!(verdict["claims"]["sub"], SUBJECT_ID);
    assert!(verdict["remaining_seconds"].as_i64().expect("remaining") > 0);
}

#[tokio::test]
async fn validate_names_the_failed_check() {
    let (status, body) = send(
        app(true),
        Method::POST,
        "/api/v1/validate",
        Some(json!({"dasvid": "not.a.token"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["result"], "rejected");
    assert_eq!(body["check"], "claims");
    assert!(body.get("claims").is_none());
}

#[tokio::test]
async fn mint_rejects_bad_input() {
    let (status, body) = send(
        app(true),
        Method::POST,
        "/api/v1/mint",
        Some(json!({"access_token": "a.b.c", "sub": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let forged = oauth_token_signed_by(WORKLOAD_PEM, &oauth_claims(Utc::now()));
    let (status, body) = send(
        app(true),
        Method::POST,
        "/api/v1/mint",
        Some(json!({"access_token": forged, "sub": SUBJECT_ID})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}
