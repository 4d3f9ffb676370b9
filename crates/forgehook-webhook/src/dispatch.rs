//! The seam between the delivery queue and the provider handlers.

use crate::error::{Result, WebhookError};
use crate::handler::HandlerRegistry;
use crate::hook::{HookTask, Webhook};
use bytes::Bytes;
use forgehook_events::{Event, HookEventType};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug)]
pub enum Delivery {
    /// `body` is the exact byte sequence the signature headers cover.
    Send {
        request: http::Request<Bytes>,
        body: Bytes,
    },
    /// The provider has no representation for this event.
    Skip,
}

#[derive(Error, Debug)]
pub enum DispatchError {
    /// The hook configuration cannot produce a request. Retrying will not
    /// help until the hook is edited.
    #[error("delivery cannot be prepared: {0}")]
    Permanent(#[source] WebhookError),

    #[error("delivery preparation cancelled")]
    Cancelled,
}

impl DispatchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DispatchError::Cancelled)
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: HandlerRegistry,
}

impl Dispatcher {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// One task per hook that wants `event`. All tasks share the same
    /// serialized payload.
    pub fn enqueue(
        &self,
        hooks: &[Webhook],
        event_type: HookEventType,
        event: &Event,
    ) -> Result<Vec<HookTask>> {
        let selected: Vec<&Webhook> = hooks
            .iter()
            .filter(|hook| hook.should_deliver(event_type, event))
            .collect();
        if selected.is_empty() {
            debug!("No hooks selected for {} event", event_type);
            return Ok(Vec::new());
        }

        let payload = event.to_json()?;
        let tasks: Vec<HookTask> = selected
            .into_iter()
            .map(|hook| HookTask::new(hook.id, event_type, payload.clone()))
            .collect();

        info!(
            "Created {} hook tasks for {} event on {} by {} out of {} hooks",
            tasks.len(),
            event_type,
            event.repository().map_or("<no repository>", |r| r.full_name.as_str()),
            event.sender().user_name,
            hooks.len()
        );
        Ok(tasks)
    }

    /// Builds the request for one task. Nothing is sent and nothing is
    /// stored.
    pub async fn prepare(
        &self,
        hook: &Webhook,
        task: &HookTask,
        cancel: &CancellationToken,
    ) -> std::result::Result<Delivery, DispatchError> {
        if cancel.is_cancelled() {
            return Err(DispatchError::Cancelled);
        }
        let handler = self.registry.get(hook.hook_type).map_err(DispatchError::Permanent)?;

        match handler.new_request(hook, task, cancel).await {
            Ok((request, body)) => {
                info!(
                    "Prepared delivery {} of {} event to {} hook {}",
                    task.uuid, task.event_type, hook.hook_type, hook.id
                );
                Ok(Delivery::Send { request, body })
            }
            Err(WebhookError::PayloadTypeNotSupported) => {
                info!(
                    "Skipping {} event for {} hook {}: not supported",
                    task.event_type, hook.hook_type, hook.id
                );
                Ok(Delivery::Skip)
            }
            Err(e) if e.is_cancelled() => {
                debug!("Preparation of delivery {} cancelled", task.uuid);
                Err(DispatchError::Cancelled)
            }
            Err(e) => {
                error!(
                    "Failed to prepare delivery {} to hook {}: {}",
                    task.uuid, hook.id, e
                );
                Err(DispatchError::Permanent(e))
            }
        }
    }
}
