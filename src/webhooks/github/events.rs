use serde::Deserialize;

mod pull_request;

pub use pull_request::*;

#[derive(Debug, Deserialize)]
pub struct GitHubUser {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: GitHubUser,
}

/// The app installation a delivery was sent for, only present for GitHub App webhooks.
#[derive(Debug, Deserialize)]
pub struct Installation {
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    // only meaningful once the PR is closed
    pub merged: Option<bool>,
}

impl PullRequest {
    pub fn is_merged(&self) -> bool {
        self.merged.unwrap_or(false)
    }
}
