//! Decides whether a Gogs delivery should start a build.
//!
//! Everything here is pure: the payload is an untyped JSON document and any
//! field that is missing or has an unexpected type falls back to a default.

use crate::types::{Classification, CommitRef, PULL_REQUEST_EVENT};
use serde_json::Value;

pub fn classify(event_type: Option<&str>, payload: &Value) -> Classification {
    if event_type != Some(PULL_REQUEST_EVENT) {
        return Classification::NotPullRequest {
            event: event_type.map(str::to_string),
        };
    }

    let action = payload.get("action").and_then(|v| v.as_str());
    let pull_request = payload.get("pull_request");
    let merged = pull_request
        .and_then(|pr| pr.get("merged"))
        .and_then(|v| v.as_bool());

    if action == Some("closed") && merged == Some(true) {
        Classification::MergedPullRequest {
            number: payload.get("number").and_then(|v| v.as_i64()),
            base_branch: pull_request
                .and_then(|pr| pr.get("base_branch"))
                .and_then(|v| v.as_str())
                .map(str::to_string),
            commit: commit_ref(event_type, payload),
        }
    } else {
        Classification::IgnoredPullRequest {
            action: action.map(str::to_string),
            merged,
        }
    }
}

/// Commit reference for a delivery of the given type.
///
/// Pull requests prefer `merge_commit_sha`, then `head_sha`. Push-shaped
/// payloads use `after`. Both end at `latest`.
pub fn commit_ref(event_type: Option<&str>, payload: &Value) -> CommitRef {
    let candidates: Vec<Option<&str>> = if event_type == Some(PULL_REQUEST_EVENT) {
        let pr = payload.get("pull_request");
        vec![
            pr.and_then(|p| p.get("merge_commit_sha")).and_then(|v| v.as_str()),
            pr.and_then(|p| p.get("head_sha")).and_then(|v| v.as_str()),
        ]
    } else {
        vec![payload.get("after").and_then(|v| v.as_str())]
    };

    candidates
        .into_iter()
        .flatten()
        .find_map(CommitRef::short)
        .unwrap_or_else(CommitRef::latest)
}
