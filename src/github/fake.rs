use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::github::{ApiError, GitHubApi, OutboundComment};

/// Records every comment it is asked to post, optionally failing each call.
#[derive(Default)]
pub(crate) struct RecordingApi {
    calls: Mutex<Vec<(Option<u64>, OutboundComment)>>,
    failure: Option<(StatusCode, String)>,
}

impl RecordingApi {
    pub(crate) fn failing(status: StatusCode, message: &str) -> Self {
        Self {
            failure: Some((status, message.to_owned())),
            ..Default::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<(Option<u64>, OutboundComment)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn comments(&self) -> Vec<OutboundComment> {
        self.calls().into_iter().map(|(_, comment)| comment).collect()
    }
}

#[async_trait]
impl GitHubApi for RecordingApi {
    async fn create_issue_comment(
        &self,
        installation_id: Option<u64>,
        comment: &OutboundComment,
    ) -> Result<(), ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push((installation_id, comment.clone()));

        match &self.failure {
            Some((status, message)) => Err(ApiError::Response {
                status: *status,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}
