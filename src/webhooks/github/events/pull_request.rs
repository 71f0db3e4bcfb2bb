use serde::Deserialize;

use crate::webhooks::github::events::{Installation, PullRequest, Repository};

#[derive(Debug, Deserialize)]
pub struct PullRequestEvent {
    pub repository: Repository,
    pub pull_request: PullRequest,
    pub installation: Option<Installation>,
}

impl PullRequestEvent {
    pub fn installation_id(&self) -> Option<u64> {
        self.installation.as_ref().map(|installation| installation.id)
    }
}
