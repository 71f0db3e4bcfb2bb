use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

mod client;
pub use client::AppClient;

#[cfg(test)]
pub(crate) mod fake;

/// GitHub API version pinned in every request.
pub const API_VERSION: &str = "2022-11-28";

/// A comment to post on an issue or pull request thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundComment {
    pub owner: String,
    pub repo: String,
    pub issue_number: u64,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// GitHub answered, but with a non-success status.
    #[error("GitHub API responded with {status}: {message}")]
    Response { status: StatusCode, message: String },
    #[error("request to GitHub API failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("couldn't sign app token: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("delivery doesn't come from an app installation, can't authenticate")]
    NoInstallation,
}

impl ApiError {
    /// Status and message of the GitHub response, if the error carries one.
    pub fn response(&self) -> Option<(StatusCode, &str)> {
        match self {
            Self::Response { status, message } => Some((*status, message.as_str())),
            _ => None,
        }
    }
}

#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// `POST /repos/{owner}/{repo}/issues/{issue_number}/comments`, authenticated as the given
    /// app installation.
    async fn create_issue_comment(
        &self,
        installation_id: Option<u64>,
        comment: &OutboundComment,
    ) -> Result<(), ApiError>;
}
