//! Bodies of the comments posted by the bot.

const WELCOME: &str = "Thanks for opening a new PR! \
    Please follow our contributing guidelines to make your PR easier to review.";
const CLOSED_WITHOUT_MERGE: &str = "This PR has been closed without merging.";

pub fn welcome_message() -> &'static str {
    WELCOME
}

/// Announces the deployment of a merged PR. An empty `url` still yields the message, with nothing
/// after "Access it at".
pub fn deployment_message(url: &str) -> String {
    format!("Deployment started for PR! Access it at {}", url)
}

pub fn close_message() -> &'static str {
    CLOSED_WITHOUT_MERGE
}
