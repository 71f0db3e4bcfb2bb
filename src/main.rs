use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rocket::{fairing::AdHoc, routes};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod bot;

mod config;
use config::{BotConfig, ConfigArgs, WEBHOOK_PATH};

mod github;
use github::{AppClient, GitHubApi};

mod webhooks;
use webhooks::{github_webhook, GitHubSecret};

#[derive(Parser)]
#[clap(version, about)]
struct Opts {
    #[clap(flatten)]
    config: ConfigArgs,
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("couldn't load .env file");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let opts = Opts::parse();
    let config =
        Arc::new(BotConfig::from_args(opts.config).context("couldn't load configuration")?);
    if config.deployment_url.is_none() {
        warn!("DEPLOYMENT_URL isn't set, merged PRs will be announced without a deployment URL");
    }

    let api: Arc<dyn GitHubApi> =
        Arc::new(AppClient::new(&config).context("failed to create GitHub client")?);
    let router = bot::router(Arc::clone(&config), api);

    let address = tokio::net::lookup_host((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("couldn't resolve {}", config.host))?
        .next()
        .with_context(|| format!("{} doesn't resolve to any address", config.host))?;
    let figment = rocket::Config::figment()
        .merge(("address", address.ip()))
        .merge(("port", address.port()));

    let webhook_url = config.webhook_url();
    let rocket = rocket::custom(figment)
        .mount(WEBHOOK_PATH, routes![github_webhook])
        .manage(router)
        .manage(GitHubSecret(config.webhook_secret.clone()))
        .attach(AdHoc::on_liftoff("Webhook URL", move |_| {
            Box::pin(async move {
                info!("Server is listening for events at: {}", webhook_url);
                info!("Press Ctrl + C to quit.");
            })
        }));
    rocket.launch().await.map_err(|err| anyhow::anyhow!(err))?;

    Ok(())
}
