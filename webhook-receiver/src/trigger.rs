use crate::config::BuildServerConfig;
use crate::logger::EventLog;
use crate::types::CommitRef;
use base64::Engine as _;
use reqwest::header::{HeaderValue, InvalidHeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("build server returned {0}")]
    Status(StatusCode),

    #[error("build server unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("build server URL cannot carry a job path: {0}")]
    InvalidUrl(Url),
}

#[derive(Debug, Error)]
pub enum ClientBuildError {
    #[error("build credentials are not a valid header value")]
    Credentials(#[from] InvalidHeaderValue),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Issues `buildWithParameters` calls for a single configured job.
#[derive(Debug, Clone)]
pub struct TriggerClient {
    client: Client,
    config: BuildServerConfig,
    authorization: HeaderValue,
    log: EventLog,
}

impl TriggerClient {
    pub fn new(config: BuildServerConfig, log: EventLog) -> Result<Self, ClientBuildError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let credentials = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", config.user, config.token));
        let mut authorization = HeaderValue::from_str(&format!("Basic {credentials}"))?;
        authorization.set_sensitive(true);

        Ok(Self {
            client,
            config,
            authorization,
            log,
        })
    }

    pub fn job_name(&self) -> &str {
        &self.config.job_name
    }

    /// `<base>/job/<job>/buildWithParameters?token=<token>&COMMIT_SHA=<commit>`
    pub fn build_url(&self, commit: &CommitRef) -> Result<Url, TriggerError> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TriggerError::InvalidUrl(self.config.base_url.clone()))?
            .pop_if_empty()
            .extend(["job", self.config.job_name.as_str(), "buildWithParameters"]);
        url.query_pairs_mut()
            .append_pair("token", &self.config.token)
            .append_pair("COMMIT_SHA", commit.as_str());
        Ok(url)
    }

    /// Single attempt; the outcome is logged here and returned to the caller.
    pub async fn trigger(&self, commit: &CommitRef) -> Result<StatusCode, TriggerError> {
        self.log.info(format!(
            "Triggering build job {} for commit {commit}",
            self.config.job_name
        ));

        let url = self.build_url(commit)?;
        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, self.authorization.clone())
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                let status = resp.status();
                self.log.success(format!(
                    "Build server signaled successfully (Status: {})",
                    status.as_u16()
                ));
                Ok(status)
            }
            Ok(resp) => {
                let status = resp.status();
                self.log
                    .error(format!("Build server returned error: {}", status.as_u16()));
                Err(TriggerError::Status(status))
            }
            Err(e) => {
                self.log
                    .error(format!("Failed to connect to build server: {e}"));
                Err(TriggerError::Transport(e))
            }
        }
    }
}
