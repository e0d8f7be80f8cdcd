//! Webhook endpoint for Bitbucket Server pull-request events.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use hmac::{Hmac, Mac};
use prtrigger_core::LifecycleEvent;
use prtrigger_scheduler::IntakeOutcome;
use serde_json::{Value, json};
use sha2::Sha256;
use tracing::{info, warn};

use crate::AppState;
use crate::error::ApiError;

pub fn router() -> Router<AppState> {
    Router::new().route("/bitbucket", post(bitbucket_webhook))
}

/// Handle Bitbucket Server webhook events.
async fn bitbucket_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let event_key = headers
        .get("X-Event-Key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    if let Some(secret) = state.webhook_secret.as_deref() {
        let signature = headers.get("X-Hub-Signature").and_then(|v| v.to_str().ok());
        if !verify_signature(secret, &body, signature) {
            warn!(event = %event_key, "Invalid webhook signature");
            return Err(ApiError::Unauthorized("invalid signature".to_string()));
        }
    }

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {}", e)))?;

    if event_key == "diagnostics:ping" {
        info!("Ping event received - webhook is configured correctly");
        return Ok(Json(json!({ "outcome": "ignored" })));
    }

    let Some(event) = LifecycleEvent::from_bitbucket_payload(event_key, &payload) else {
        info!(event = %event_key, "Unhandled event type");
        return Ok(Json(json!({ "outcome": "ignored" })));
    };

    info!(
        event = %event_key,
        pull_request = %event.pull_request.reference(),
        slug = %event.pull_request.slug,
        actor = %event.actor,
        "Received pull request event"
    );

    let outcome = state.intake.handle(event).await;
    Ok(Json(outcome_body(&outcome)))
}

fn outcome_body(outcome: &IntakeOutcome) -> Value {
    match outcome {
        IntakeOutcome::Scheduled { fire_at } => json!({ "outcome": "scheduled", "fire_at": fire_at }),
        IntakeOutcome::AlreadyPending { fire_at } => {
            json!({ "outcome": "already_pending", "fire_at": fire_at })
        }
        IntakeOutcome::Suppressed(reason) => {
            json!({ "outcome": "suppressed", "reason": reason.to_string() })
        }
        IntakeOutcome::Cleared => json!({ "outcome": "cleared" }),
        // The event source gets no error channel; the failure is in the logs.
        IntakeOutcome::SchedulingFailed(message) => {
            json!({ "outcome": "scheduling_failed", "message": message })
        }
    }
}

/// Check a `sha256=<hex>` HMAC signature over the raw body.
pub fn verify_signature(secret: &str, body: &[u8], signature: Option<&str>) -> bool {
    let Some(sig_hex) = signature.and_then(|s| s.strip_prefix("sha256=")) else {
        return false;
    };

    let Ok(sig_bytes) = hex::decode(sig_hex) else {
        return false;
    };

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);

    mac.verify_slice(&sig_bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_verify_signature() {
        let body = br#"{"eventKey":"pr:opened"}"#;
        let signature = sign("s3cret", body);

        assert!(verify_signature("s3cret", body, Some(&signature)));
        assert!(!verify_signature("other", body, Some(&signature)));
        assert!(!verify_signature("s3cret", b"tampered", Some(&signature)));
        assert!(!verify_signature("s3cret", body, None));
        assert!(!verify_signature("s3cret", body, Some("sha1=abcd")));
        assert!(!verify_signature("s3cret", body, Some("sha256=zz")));
    }
}
