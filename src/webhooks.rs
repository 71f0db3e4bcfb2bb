use std::io;

use rocket::{data::ByteUnit, http::Status};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub mod github;
pub use github::{github_webhook, GitHubSecret};

pub mod router;
pub use router::{log_webhook_error, EventHandler, Router};

/// A single webhook delivery, as received from GitHub.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Value of the `X-GitHub-Delivery` header.
    pub id: String,
    /// Value of the `X-GitHub-Event` header, e.g. `pull_request`.
    pub name: String,
    pub payload: Value,
}

impl WebhookEvent {
    pub fn action(&self) -> Option<&str> {
        self.payload.get("action").and_then(Value::as_str)
    }

    /// The event name qualified with the payload's action when there is one, e.g.
    /// `pull_request.opened`.
    pub fn event_type(&self) -> String {
        match self.action() {
            Some(action) => format!("{}.{}", self.name, action),
            None => self.name.clone(),
        }
    }

    pub fn parse<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.payload)
    }
}

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("request needs exactly one {0} header")]
    MissingHeader(&'static str),
    #[error("content type {0} isn't JSON")]
    UnsupportedContentType(String),
    #[error("signature does not match event payload and secret")]
    InvalidSignature,
    #[error("payload exceeds the {0} limit")]
    PayloadTooLarge(ByteUnit),
    #[error("couldn't read payload: {0}")]
    Io(#[from] io::Error),
    #[error("payload isn't valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("webhook secret isn't configured")]
    MissingSecret,
    #[error("handler for {event} failed: {error:#}")]
    Handler { event: String, error: anyhow::Error },
    /// Several handlers failed on the same delivery.
    #[error("{} handlers failed for {event}", .errors.len())]
    Aggregate {
        event: String,
        errors: Vec<anyhow::Error>,
    },
}

impl WebhookError {
    /// HTTP status answered to GitHub for this error.
    pub fn status(&self) -> Status {
        match self {
            Self::MissingHeader(_) | Self::InvalidJson(_) | Self::Io(_) => Status::BadRequest,
            Self::UnsupportedContentType(_) => Status::UnsupportedMediaType,
            Self::InvalidSignature => Status::Unauthorized,
            Self::PayloadTooLarge(_) => Status::PayloadTooLarge,
            Self::MissingSecret | Self::Handler { .. } | Self::Aggregate { .. } => {
                Status::InternalServerError
            }
        }
    }
}
