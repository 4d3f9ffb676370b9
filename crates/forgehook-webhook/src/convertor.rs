use crate::error::{Result, WebhookError};
use crate::hook::HookTask;
use async_trait::async_trait;
use forgehook_events::*;
use serde::Serialize;

/// Turns events into one provider's wire payload.
///
/// Every method defaults to [`WebhookError::PayloadTypeNotSupported`], so a
/// provider only implements the events it can express.
#[async_trait]
pub trait PayloadConvertor: Send + Sync {
    type Payload: Serialize + Send;

    async fn create(&self, _p: &CreatePayload) -> Result<Self::Payload> {
        Err(WebhookError::PayloadTypeNotSupported)
    }

    async fn delete(&self, _p: &DeletePayload) -> Result<Self::Payload> {
        Err(WebhookError::PayloadTypeNotSupported)
    }

    async fn fork(&self, _p: &ForkPayload) -> Result<Self::Payload> {
        Err(WebhookError::PayloadTypeNotSupported)
    }

    async fn push(&self, _p: &PushPayload) -> Result<Self::Payload> {
        Err(WebhookError::PayloadTypeNotSupported)
    }

    async fn issue(&self, _p: &IssuePayload) -> Result<Self::Payload> {
        Err(WebhookError::PayloadTypeNotSupported)
    }

    /// Comments on issues and pull requests alike; `is_pull` tells them apart.
    async fn issue_comment(&self, _p: &IssueCommentPayload) -> Result<Self::Payload> {
        Err(WebhookError::PayloadTypeNotSupported)
    }

    async fn pull_request(&self, _p: &PullRequestPayload) -> Result<Self::Payload> {
        Err(WebhookError::PayloadTypeNotSupported)
    }

    async fn review(&self, _p: &PullRequestPayload, _kind: ReviewKind) -> Result<Self::Payload> {
        Err(WebhookError::PayloadTypeNotSupported)
    }

    async fn repository(&self, _p: &RepositoryPayload) -> Result<Self::Payload> {
        Err(WebhookError::PayloadTypeNotSupported)
    }

    async fn package(&self, _p: &PackagePayload) -> Result<Self::Payload> {
        Err(WebhookError::PayloadTypeNotSupported)
    }

    async fn wiki(&self, _p: &WikiPayload) -> Result<Self::Payload> {
        Err(WebhookError::PayloadTypeNotSupported)
    }

    async fn release(&self, _p: &ReleasePayload) -> Result<Self::Payload> {
        Err(WebhookError::PayloadTypeNotSupported)
    }
}

pub async fn convert<C: PayloadConvertor>(convertor: &C, event: &Event) -> Result<C::Payload> {
    match event {
        Event::Create(p) => convertor.create(p).await,
        Event::Delete(p) => convertor.delete(p).await,
        Event::Fork(p) => convertor.fork(p).await,
        Event::Push(p) => convertor.push(p).await,
        Event::Issue(p) => convertor.issue(p).await,
        Event::IssueComment(p) | Event::PullRequestComment(p) => convertor.issue_comment(p).await,
        Event::PullRequest(p) => convertor.pull_request(p).await,
        Event::Review { payload, kind } => convertor.review(payload, *kind).await,
        Event::Repository(p) => convertor.repository(p).await,
        Event::Package(p) => convertor.package(p).await,
        Event::Wiki(p) => convertor.wiki(p).await,
        Event::Release(p) => convertor.release(p).await,
    }
}

/// Decodes the task payload for its event type and converts it.
pub async fn convert_task<C: PayloadConvertor>(convertor: &C, task: &HookTask) -> Result<C::Payload> {
    let event = Event::decode(task.event_type, task.payload_content.as_bytes())?;
    convert(convertor, &event).await
}
