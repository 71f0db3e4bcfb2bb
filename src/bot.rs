use std::sync::Arc;

use crate::{
    config::BotConfig,
    github::GitHubApi,
    webhooks::{log_webhook_error, Router},
};

mod handlers;
use handlers::{PullRequestClosed, PullRequestOpened};

pub mod messages;

/// Builds the [`Router`] answering pull request events on behalf of the app.
///
/// Failures the handlers don't deal with themselves end up in [`log_webhook_error`].
pub fn router(config: Arc<BotConfig>, api: Arc<dyn GitHubApi>) -> Router {
    Router::new()
        .on(
            "pull_request.opened",
            Arc::new(PullRequestOpened::new(Arc::clone(&api))),
        )
        .on(
            "pull_request.closed",
            Arc::new(PullRequestClosed::new(api, config)),
        )
        .on_error(log_webhook_error)
}
