use serde::Serialize;
use std::fmt;

/// Event type header sent by Gogs with every delivery.
pub const EVENT_HEADER: &str = "x-gogs-event";
/// Per-delivery identifier header sent by Gogs.
pub const DELIVERY_HEADER: &str = "x-gogs-delivery";
/// The only event type that can trigger a build.
pub const PULL_REQUEST_EVENT: &str = "pull_request";

/// Short commit reference handed to the build system as `COMMIT_SHA`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef(String);

impl CommitRef {
    pub const LATEST: &'static str = "latest";
    pub const SHORT_LEN: usize = 7;

    /// First seven characters of `sha`, or `None` when there is nothing to shorten.
    pub fn short(sha: &str) -> Option<Self> {
        if sha.is_empty() {
            return None;
        }
        Some(Self(sha.chars().take(Self::SHORT_LEN).collect()))
    }

    pub fn latest() -> Self {
        Self(Self::LATEST.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of looking at one delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// A pull request closed by merging. The only case that triggers a build.
    MergedPullRequest {
        number: Option<i64>,
        base_branch: Option<String>,
        commit: CommitRef,
    },
    /// A pull request event in any other state.
    IgnoredPullRequest {
        action: Option<String>,
        merged: Option<bool>,
    },
    /// Anything that is not a pull request event.
    NotPullRequest { event: Option<String> },
}

/// JSON body of every 200 reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookReply {
    pub status: &'static str,
    pub message: &'static str,
}

impl WebhookReply {
    pub const BUILD_TRIGGERED: Self = Self {
        status: "success",
        message: "PR Merge detected, build triggered",
    };
    pub const NOT_MERGED: Self = Self {
        status: "ignored",
        message: "Only merged PRs trigger builds",
    };
    pub const NOT_PULL_REQUEST: Self = Self {
        status: "ignored",
        message: "Not a PR event",
    };
}

impl From<&Classification> for WebhookReply {
    fn from(classification: &Classification) -> Self {
        match classification {
            Classification::MergedPullRequest { .. } => Self::BUILD_TRIGGERED,
            Classification::IgnoredPullRequest { .. } => Self::NOT_MERGED,
            Classification::NotPullRequest { .. } => Self::NOT_PULL_REQUEST,
        }
    }
}
