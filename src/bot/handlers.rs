use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::{
    bot::messages::{close_message, deployment_message, welcome_message},
    config::BotConfig,
    github::{GitHubApi, OutboundComment},
    webhooks::{github::events::PullRequestEvent, EventHandler, WebhookEvent},
};

fn parse_pull_request(event: &WebhookEvent) -> anyhow::Result<PullRequestEvent> {
    event
        .parse()
        .with_context(|| format!("couldn't parse pull_request payload of delivery {}", event.id))
}

/// Posts `body` on the pull request the event is about.
///
/// A failed post is logged and dropped: the delivery still counts as handled.
pub(crate) async fn post_comment(api: &dyn GitHubApi, event: &PullRequestEvent, body: String) {
    let comment = OutboundComment {
        owner: event.repository.owner.login.clone(),
        repo: event.repository.name.clone(),
        issue_number: event.pull_request.number,
        body,
    };

    if let Err(e) = api
        .create_issue_comment(event.installation_id(), &comment)
        .await
    {
        if let Some((status, message)) = e.response() {
            error!("Error! Status: {}. Message: {}", status, message);
        }
        error!("{:?}", e);
    }
}

/// Welcomes newly opened pull requests.
pub struct PullRequestOpened {
    api: Arc<dyn GitHubApi>,
}

impl PullRequestOpened {
    pub fn new(api: Arc<dyn GitHubApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl EventHandler for PullRequestOpened {
    async fn handle(&self, event: &WebhookEvent) -> anyhow::Result<()> {
        let event = parse_pull_request(event)?;
        info!(
            "Received a pull request event for #{}",
            event.pull_request.number
        );

        post_comment(self.api.as_ref(), &event, welcome_message().to_owned()).await;
        Ok(())
    }
}

/// Announces the deployment of merged pull requests, and notes when one is closed without merge.
pub struct PullRequestClosed {
    api: Arc<dyn GitHubApi>,
    config: Arc<BotConfig>,
}

impl PullRequestClosed {
    pub fn new(api: Arc<dyn GitHubApi>, config: Arc<BotConfig>) -> Self {
        Self { api, config }
    }
}

#[async_trait]
impl EventHandler for PullRequestClosed {
    async fn handle(&self, event: &WebhookEvent) -> anyhow::Result<()> {
        let event = parse_pull_request(event)?;
        let number = event.pull_request.number;

        let body = if event.pull_request.is_merged() {
            info!("Received a pull request merged event for #{}", number);

            let url = self.config.deployment_url.as_deref().unwrap_or_else(|| {
                warn!(
                    "DEPLOYMENT_URL isn't set, announcing deployment of #{} without a URL",
                    number
                );
                ""
            });
            deployment_message(url)
        } else {
            info!("Received a pull request closed event for #{}", number);
            close_message().to_owned()
        };

        post_comment(self.api.as_ref(), &event, body).await;
        Ok(())
    }
}
