use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, error};

use crate::webhooks::{WebhookError, WebhookEvent};

/// Something to do when a given kind of event is delivered.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &WebhookEvent) -> anyhow::Result<()>;
}

type ErrorCallback = Box<dyn Fn(&WebhookError) + Send + Sync>;

/// Dispatches deliveries to the handlers registered for their event type.
///
/// Handlers are registered either on a bare event name (`pull_request`), which receives every
/// action of that event, or on a qualified one (`pull_request.opened`).
pub struct Router {
    handlers: HashMap<String, Vec<Arc<dyn EventHandler>>>,
    on_error: ErrorCallback,
}

impl Default for Router {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
            on_error: Box::new(log_webhook_error),
        }
    }
}

impl Router {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn on(mut self, event_type: &str, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers
            .entry(event_type.to_owned())
            .or_default()
            .push(handler);
        self
    }

    /// Replaces the catch-all called with every error met while receiving deliveries.
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&WebhookError) + Send + Sync + 'static,
    {
        self.on_error = Box::new(callback);
        self
    }

    /// Runs every handler registered for this event, and reports their failures to the
    /// catch-all.
    ///
    /// An event nobody listens to is simply ignored.
    pub async fn receive(&self, event: &WebhookEvent) -> Result<(), WebhookError> {
        let event_type = event.event_type();
        let handlers = self.handlers_for(event);
        if handlers.is_empty() {
            debug!("no handler for {}, ignoring delivery {}", event_type, event.id);
            return Ok(());
        }

        debug!(
            "dispatching delivery {} ({}) to {} handler(s)",
            event.id,
            event_type,
            handlers.len()
        );
        let results = join_all(handlers.iter().map(|handler| handler.handle(event))).await;

        let mut errors: Vec<anyhow::Error> = results.into_iter().filter_map(Result::err).collect();
        let err = match errors.len() {
            0 => return Ok(()),
            1 => WebhookError::Handler {
                event: event_type,
                error: errors.remove(0),
            },
            _ => WebhookError::Aggregate {
                event: event_type,
                errors,
            },
        };

        self.report(&err);
        Err(err)
    }

    /// Hands an error to the catch-all.
    pub fn report(&self, error: &WebhookError) {
        (self.on_error)(error)
    }

    fn handlers_for(&self, event: &WebhookEvent) -> Vec<&Arc<dyn EventHandler>> {
        let mut keys = vec![event.name.clone()];
        if event.action().is_some() {
            keys.push(event.event_type());
        }

        keys.iter()
            .filter_map(|key| self.handlers.get(key))
            .flatten()
            .collect()
    }
}

/// Default catch-all: logs the error, nothing else.
pub fn log_webhook_error(error: &WebhookError) {
    match error {
        WebhookError::Aggregate { event, errors } => {
            error!("Error processing request: {}", event);
            for err in errors {
                debug!("{:#}", err);
            }
        }
        other => error!("{}", other),
    }
}
