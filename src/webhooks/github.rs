use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request, State,
};
use tracing::{info, trace};

mod signing;
pub use signing::SignedGitHubPayload;

pub mod events;

use crate::webhooks::{Router, WebhookError, WebhookEvent};

const X_GITHUB_EVENT: &str = "X-GitHub-Event";
const X_GITHUB_DELIVERY: &str = "X-GitHub-Delivery";

pub struct GitHubSecret(pub String);

#[rocket::post("/", data = "<payload>")]
pub async fn github_webhook(
    event: Result<GitHubEventName, WebhookError>,
    delivery: Result<GitHubDelivery, WebhookError>,
    payload: Result<SignedGitHubPayload, WebhookError>,
    router: &State<Router>,
) -> (Status, String) {
    let event = match into_event(event, delivery, payload) {
        Ok(event) => event,
        Err(e) => {
            router.report(&e);
            return (e.status(), e.to_string());
        }
    };

    info!(
        "received {} event, delivery {}",
        event.event_type(),
        event.id
    );

    match router.receive(&event).await {
        Ok(()) => (Status::Ok, "ok".to_string()),
        // already reported by the router
        Err(e) => (e.status(), e.to_string()),
    }
}

fn into_event(
    event: Result<GitHubEventName, WebhookError>,
    delivery: Result<GitHubDelivery, WebhookError>,
    payload: Result<SignedGitHubPayload, WebhookError>,
) -> Result<WebhookEvent, WebhookError> {
    let GitHubEventName(name) = event?;
    let GitHubDelivery(id) = delivery?;
    let SignedGitHubPayload(content) = payload?;

    Ok(WebhookEvent {
        id,
        name,
        payload: serde_json::from_slice(&content)?,
    })
}

/// Value of the `X-GitHub-Event` header.
#[derive(Debug)]
pub struct GitHubEventName(pub String);

/// Value of the `X-GitHub-Delivery` header.
#[derive(Debug)]
pub struct GitHubDelivery(pub String);

fn single_header(request: &Request<'_>, name: &'static str) -> Result<String, WebhookError> {
    let values = request.headers().get(name).collect::<Vec<_>>();
    if values.len() != 1 {
        trace!("couldn't locate a single {} header", name);
        return Err(WebhookError::MissingHeader(name));
    }

    Ok(values[0].to_owned())
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for GitHubEventName {
    type Error = WebhookError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match single_header(request, X_GITHUB_EVENT) {
            Ok(name) => Outcome::Success(GitHubEventName(name)),
            Err(e) => Outcome::Error((e.status(), e)),
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for GitHubDelivery {
    type Error = WebhookError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match single_header(request, X_GITHUB_DELIVERY) {
            Ok(id) => Outcome::Success(GitHubDelivery(id)),
            Err(e) => Outcome::Error((e.status(), e)),
        }
    }
}
