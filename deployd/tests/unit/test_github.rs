//! GitHub transport tests against a local fake API

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use deployd::authn::app_jwt::{AppClaims, AppJwtSigner};
use deployd::authn::token_mngr::{GithubAppTokenProvider, InstallationTokenProvider};
use deployd::deploy::reporter::{GithubStatusReporter, StatusReporter};
use deployd::errors::AgentError;
use deployd::http::client::HttpClient;
use deployd::models::deployment::{DeploymentStatus, DeploymentTarget};

const PRIVATE_KEY: &[u8] = include_bytes!("../fixtures/app_key.pem");
const PUBLIC_KEY: &[u8] = include_bytes!("../fixtures/app_key.pub.pem");

#[derive(Debug, Clone)]
struct Recorded {
    path: String,
    authorization: String,
    accept: String,
    api_version: String,
    body: Value,
}

#[derive(Clone, Default)]
struct FakeGithub {
    requests: Arc<Mutex<Vec<Recorded>>>,
}

fn record(state: &FakeGithub, path: String, headers: &HeaderMap, body: Value) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    state.requests.lock().unwrap().push(Recorded {
        path,
        authorization: header("authorization"),
        accept: header("accept"),
        api_version: header("x-github-api-version"),
        body,
    });
}

async fn create_status(
    State(state): State<FakeGithub>,
    Path((owner, repo, id)): Path<(String, String, u64)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record(
        &state,
        format!("/repos/{owner}/{repo}/deployments/{id}/statuses"),
        &headers,
        body.clone(),
    );
    if id == 0 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "Validation Failed" })),
        );
    }
    (StatusCode::CREATED, Json(json!({ "id": 1, "state": body["state"] })))
}

async fn create_access_token(
    State(state): State<FakeGithub>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    record(
        &state,
        format!("/app/installations/{id}/access_tokens"),
        &headers,
        Value::Null,
    );

    let jwt = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();
    let key = DecodingKey::from_rsa_pem(PUBLIC_KEY).unwrap();
    match decode::<AppClaims>(jwt, &key, &Validation::new(Algorithm::RS256)) {
        Ok(data) if data.claims.iss == "123" => (
            StatusCode::CREATED,
            Json(json!({ "token": "ghs_minted", "expires_at": "2030-01-01T00:00:00Z" })),
        ),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "A JSON web token could not be decoded" })),
        ),
    }
}

async fn spawn_fake_github() -> (String, FakeGithub) {
    let state = FakeGithub::default();
    let app = Router::new()
        .route(
            "/repos/{owner}/{repo}/deployments/{id}/statuses",
            post(create_status),
        )
        .route(
            "/app/installations/{id}/access_tokens",
            post(create_access_token),
        )
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{addr}"), state)
}

fn target(deployment_id: u64) -> DeploymentTarget {
    DeploymentTarget {
        owner: "acme".to_string(),
        repo: "shop".to_string(),
        deployment_id,
    }
}

#[tokio::test]
async fn test_status_report_request() {
    let (base_url, github) = spawn_fake_github().await;
    let client = Arc::new(HttpClient::new(&base_url).unwrap());
    let reporter = GithubStatusReporter::new(
        client,
        target(42),
        SecretString::from("ghs_test".to_string()),
    );

    reporter.report(DeploymentStatus::InProgress).await.unwrap();
    reporter.report(DeploymentStatus::Failure).await.unwrap();

    let requests = github.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].path, "/repos/acme/shop/deployments/42/statuses");
    assert_eq!(requests[0].authorization, "Bearer ghs_test");
    assert_eq!(requests[0].accept, "application/vnd.github+json");
    assert_eq!(requests[0].api_version, "2022-11-28");
    assert_eq!(requests[0].body["state"], "in_progress");
    assert_eq!(requests[1].body["state"], "failure");
    assert!(requests[1].body["description"].is_string());
    assert!(requests[1].body.get("log_url").is_none());
}

#[tokio::test]
async fn test_status_report_api_error() {
    let (base_url, _github) = spawn_fake_github().await;
    let client = Arc::new(HttpClient::new(&base_url).unwrap());
    let reporter = GithubStatusReporter::new(
        client,
        target(0),
        SecretString::from("ghs_test".to_string()),
    );

    let err = reporter.report(DeploymentStatus::Error).await.unwrap_err();
    match err {
        AgentError::GithubApi { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "Validation Failed");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_status_report_unreachable() {
    let client = Arc::new(HttpClient::new("http://127.0.0.1:9").unwrap());
    let reporter = GithubStatusReporter::new(
        client,
        target(1),
        SecretString::from("ghs_test".to_string()),
    );
    assert!(matches!(
        reporter.report(DeploymentStatus::Success).await,
        Err(AgentError::HttpError(_))
    ));
}

#[tokio::test]
async fn test_installation_token_exchange() {
    let (base_url, github) = spawn_fake_github().await;
    let client = Arc::new(HttpClient::new(&base_url).unwrap());
    let signer = AppJwtSigner::from_pem(123, PRIVATE_KEY).unwrap();
    let provider = GithubAppTokenProvider::new(client, signer);

    let token = provider.installation_token(77).await.unwrap();
    assert_eq!(token.expose_secret(), "ghs_minted");

    let requests = github.requests.lock().unwrap().clone();
    assert_eq!(requests[0].path, "/app/installations/77/access_tokens");
}

#[tokio::test]
async fn test_installation_token_rejected() {
    let (base_url, _github) = spawn_fake_github().await;
    let client = Arc::new(HttpClient::new(&base_url).unwrap());
    let signer = AppJwtSigner::from_pem(999, PRIVATE_KEY).unwrap();
    let provider = GithubAppTokenProvider::new(client, signer);

    assert!(matches!(
        provider.installation_token(77).await,
        Err(AgentError::TokenError(_))
    ));
}

#[test]
fn test_app_jwt_claims() {
    let signer = AppJwtSigner::from_pem(123, PRIVATE_KEY).unwrap();
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let jwt = signer.sign_at(now).unwrap();

    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = false;
    let claims = decode::<AppClaims>(
        &jwt,
        &DecodingKey::from_rsa_pem(PUBLIC_KEY).unwrap(),
        &validation,
    )
    .unwrap()
    .claims;

    assert_eq!(claims.iss, "123");
    assert_eq!(claims.iat, now.timestamp() - 60);
    assert_eq!(claims.exp, now.timestamp() + 9 * 60);
}

#[test]
fn test_app_jwt_rejects_bad_key() {
    assert!(matches!(
        AppJwtSigner::from_pem(1, b"not a key"),
        Err(AgentError::AuthError(_))
    ));
}
