use std::{fmt, path::PathBuf};

use anyhow::Context;
use clap::Args;
use url::Url;

/// Path GitHub delivers webhooks to.
pub const WEBHOOK_PATH: &str = "/api/webhook";

#[derive(Args)]
pub struct ConfigArgs {
    /// ID of the GitHub App the bot authenticates as
    #[clap(long, env = "APP_ID")]
    pub app_id: u64,
    /// Secret shared with GitHub, used to verify webhook signatures
    #[clap(long, env = "WEBHOOK_SECRET", hide_env_values = true)]
    pub webhook_secret: String,
    /// Path to the GitHub App's PEM-encoded private key
    #[clap(long, env = "PRIVATE_KEY_PATH")]
    pub private_key_path: PathBuf,
    /// URL announced in the comment posted when a pull request gets merged
    #[clap(long, env = "DEPLOYMENT_URL")]
    pub deployment_url: Option<String>,
    /// Host to listen on
    #[clap(long, env = "HOST", default_value = "localhost")]
    pub host: String,
    /// Port to listen on
    #[clap(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,
    /// Base URL of the GitHub REST API
    #[clap(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    pub github_api_url: Url,
}

/// Settings of the bot, built once at startup and never mutated afterwards.
pub struct BotConfig {
    pub app_id: u64,
    /// Contents of the GitHub App's private key, PEM encoded.
    pub private_key: String,
    pub webhook_secret: String,
    pub deployment_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub github_api_url: Url,
}

impl BotConfig {
    /// Builds the configuration from the command line, reading the private key from disk.
    pub fn from_args(args: ConfigArgs) -> anyhow::Result<Self> {
        let private_key = std::fs::read_to_string(&args.private_key_path).with_context(|| {
            format!(
                "couldn't read private key {}",
                args.private_key_path.display()
            )
        })?;

        Ok(Self {
            app_id: args.app_id,
            private_key,
            webhook_secret: args.webhook_secret,
            deployment_url: args.deployment_url,
            host: args.host,
            port: args.port,
            github_api_url: args.github_api_url,
        })
    }

    /// The URL GitHub should be configured to deliver webhooks to, as seen from this machine.
    pub fn webhook_url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, WEBHOOK_PATH)
    }
}

// keep the secrets out of the logs
impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("app_id", &self.app_id)
            .field("deployment_url", &self.deployment_url)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("github_api_url", &self.github_api_url.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) fn test_config(deployment_url: Option<&str>) -> BotConfig {
    BotConfig {
        app_id: 1234,
        private_key: String::new(),
        webhook_secret: "It's a Secret to Everybody".to_string(),
        deployment_url: deployment_url.map(str::to_owned),
        host: "localhost".to_string(),
        port: 3000,
        github_api_url: Url::parse("https://api.github.com").unwrap(),
    }
}
