use crate::classifier;
use crate::error::ReceiverError;
use crate::logger::EventLog;
use crate::trigger::TriggerClient;
use crate::types::{Classification, CommitRef, WebhookReply, DELIVERY_HEADER, EVENT_HEADER};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, FromRequest, Request, State},
    http::{HeaderMap, Method},
    Json, Router,
};
use serde_json::Value;
use tokio_util::task::TaskTracker;
use tracing::Instrument;
use uuid::Uuid;

/// Everything a request handler needs. Cheap to clone; clones share one task tracker.
#[derive(Clone)]
pub struct ReceiverState {
    trigger: TriggerClient,
    log: EventLog,
    triggers: TaskTracker,
}

impl ReceiverState {
    pub fn new(trigger: TriggerClient, log: EventLog) -> Self {
        Self {
            trigger,
            log,
            triggers: TaskTracker::new(),
        }
    }

    pub fn in_flight_triggers(&self) -> usize {
        self.triggers.len()
    }

    /// Stop accepting new trigger tasks and wait for the running ones to log their outcome.
    pub async fn drain_triggers(&self) {
        self.triggers.close();
        self.triggers.wait().await;
    }
}

/// Every path and method lands on the webhook handler.
/// `max_body_bytes = None` lifts axum's default body cap entirely.
pub fn router(state: ReceiverState, max_body_bytes: Option<usize>) -> Router {
    let body_limit = match max_body_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .fallback(handle_webhook)
        .layer(body_limit)
        .with_state(state)
}

async fn handle_webhook(
    State(state): State<ReceiverState>,
    request: Request,
) -> Result<Json<WebhookReply>, ReceiverError> {
    if request.method() != Method::POST {
        state.log.info(format!(
            "Rejected {} request: method not allowed",
            request.method()
        ));
        return Err(ReceiverError::MethodNotAllowed);
    }

    let event_type = header_str(request.headers(), EVENT_HEADER).map(str::to_string);
    let delivery = header_str(request.headers(), DELIVERY_HEADER)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let span = tracing::info_span!(
        "webhook",
        %delivery,
        event = event_type.as_deref().unwrap_or("-")
    );

    process(&state, event_type.as_deref(), request)
        .instrument(span)
        .await
        .map(Json)
        .map_err(|err| {
            state.log.error(format!("Error processing webhook: {err}"));
            err
        })
}

async fn process(
    state: &ReceiverState,
    event_type: Option<&str>,
    request: Request,
) -> Result<WebhookReply, ReceiverError> {
    let body = Bytes::from_request(request, state).await?;
    let payload: Value = serde_json::from_slice(&body)?;

    state.log.info(format!(
        "Received {} event from Gogs",
        event_type.unwrap_or("unknown")
    ));

    let classification = classifier::classify(event_type, &payload);
    match &classification {
        Classification::MergedPullRequest {
            number,
            base_branch,
            commit,
        } => {
            state.log.info(format!(
                "PR #{} MERGED into {}. Triggering build.",
                number.map_or_else(|| "?".to_string(), |n| n.to_string()),
                base_branch.as_deref().unwrap_or("unknown"),
            ));
            dispatch(state, commit.clone());
        }
        Classification::IgnoredPullRequest { action, merged } => {
            state.log.info(format!(
                "PR event ignored. Action: {}, Merged: {}",
                action.as_deref().unwrap_or("none"),
                merged.map_or_else(|| "none".to_string(), |m| m.to_string()),
            ));
        }
        Classification::NotPullRequest { event } => {
            state.log.info(format!(
                "Event {} ignored. Only pull_request events trigger builds.",
                event.as_deref().unwrap_or("unknown")
            ));
        }
    }

    Ok(WebhookReply::from(&classification))
}

/// Fire-and-forget: the reply to Gogs never waits on the build server.
/// The task is tracked only so shutdown can let it finish.
fn dispatch(state: &ReceiverState, commit: CommitRef) {
    let trigger = state.trigger.clone();
    let log = state.log.clone();

    state.triggers.spawn(
        async move {
            match trigger.trigger(&commit).await {
                Ok(_) => log.success("Build trigger completed"),
                Err(e) => {
                    tracing::warn!(error = %e, job = trigger.job_name(), "build trigger failed");
                    log.error(format!("Build trigger failed: {e}"));
                }
            }
        }
        .in_current_span(),
    );
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
