//! GitHub webhook ingestion
//!
//! Verifies the delivery signature, filters for newly created deployments of
//! a configured service and hands each one to the dispatcher.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use github_models::DeploymentEvent;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sha2::Sha256;
use tracing::{debug, error, info, warn};

use crate::models::deployment::{DeploymentRequest, LogContext};
use crate::server::state::ServerState;
use crate::storage::services::find_service;
use crate::utils::hex;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const EVENT_HEADER: &str = "x-github-event";
pub const DELIVERY_HEADER: &str = "x-github-delivery";

/// Webhook response body
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

fn respond(code: StatusCode, status: &str) -> Response {
    (
        code,
        Json(WebhookResponse {
            status: status.to_string(),
            outcome: None,
        }),
    )
        .into_response()
}

/// Check `X-Hub-Signature-256: sha256=<hex>` against the body in constant time
pub fn verify_signature(secret: &SecretString, signature: Option<&str>, body: &[u8]) -> bool {
    let Some(digest) = signature
        .and_then(|s| s.strip_prefix("sha256="))
        .and_then(hex::decode)
    else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&digest).is_ok()
}

/// Compute the `X-Hub-Signature-256` header value for `body`
pub fn sign_body(secret: &SecretString, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()).ok()?;
    mac.update(body);
    Some(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

pub async fn webhook_handler(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(secret) = &state.webhook_secret {
        if !verify_signature(secret, header(&headers, SIGNATURE_HEADER), &body) {
            warn!("Rejected webhook delivery with a missing or bad signature");
            return respond(StatusCode::UNAUTHORIZED, "invalid signature");
        }
    }

    let delivery_id = header(&headers, DELIVERY_HEADER).map(str::to_string);
    match header(&headers, EVENT_HEADER) {
        Some("ping") => respond(StatusCode::OK, "pong"),
        Some("deployment") => handle_deployment(&state, &body, delivery_id).await,
        other => {
            debug!("Ignoring webhook event {:?}", other);
            respond(StatusCode::ACCEPTED, "ignored")
        }
    }
}

async fn handle_deployment(
    state: &ServerState,
    body: &[u8],
    delivery_id: Option<String>,
) -> Response {
    let event: DeploymentEvent = match serde_json::from_slice(body) {
        Ok(event) => event,
        Err(e) => {
            warn!("Failed to parse deployment event: {}", e);
            return respond(StatusCode::BAD_REQUEST, "malformed payload");
        }
    };

    if event.action != "created" {
        debug!("Ignoring deployment action {}", event.action);
        return respond(StatusCode::ACCEPTED, "ignored");
    }

    let environment = &event.deployment.environment;
    let Some(service) = find_service(&state.services, &event.repository.full_name, environment)
    else {
        info!(
            "No service configured for {} in {}, skipping",
            event.repository.full_name, environment
        );
        return respond(StatusCode::OK, "skipped");
    };

    let Some(installation) = &event.installation else {
        warn!("Deployment event carries no installation");
        return respond(StatusCode::BAD_REQUEST, "missing installation");
    };

    // Without a token there is nobody to report to
    let token = match state.token_provider.installation_token(installation.id).await {
        Ok(token) => token,
        Err(e) => {
            error!(
                "Failed to get installation token for {}: {}",
                event.repository.full_name, e
            );
            return respond(StatusCode::BAD_GATEWAY, "token unavailable");
        }
    };

    let request = DeploymentRequest {
        dir: service.dir.clone(),
        commit: event.deployment.sha.clone(),
        steps: service.steps.clone(),
        owner: event.repository.owner.login.clone(),
        repo: event.repository.name.clone(),
        deployment_id: event.deployment.id,
        token,
        endpoints: state.endpoints.clone(),
        log_context: LogContext {
            environment: Some(environment.clone()),
            delivery_id,
        },
    };

    let reporter = state.reporters.for_deployment(request.target(), &request.token);
    let outcome = state.dispatcher.dispatch(request, reporter.as_ref()).await;

    (
        StatusCode::ACCEPTED,
        Json(WebhookResponse {
            status: "dispatched".to_string(),
            outcome: Some(outcome.to_string()),
        }),
    )
        .into_response()
}
