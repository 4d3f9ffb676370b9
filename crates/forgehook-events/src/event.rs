use crate::error::{EventError, Result};
use crate::event_type::{HookEventType, ReviewKind};
use crate::payloads::*;
use crate::refs::RefName;
use crate::structs::{Repository, User};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A repository lifecycle event, as handed over by the application layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Create(CreatePayload),
    Delete(DeletePayload),
    Fork(ForkPayload),
    Push(PushPayload),
    Issue(IssuePayload),
    IssueComment(IssueCommentPayload),
    PullRequest(PullRequestPayload),
    PullRequestComment(IssueCommentPayload),
    Review {
        payload: PullRequestPayload,
        kind: ReviewKind,
    },
    Repository(RepositoryPayload),
    Package(PackagePayload),
    Wiki(WikiPayload),
    Release(ReleasePayload),
}

fn decode_as<T: DeserializeOwned>(event_type: HookEventType, data: &[u8]) -> Result<T> {
    serde_json::from_slice(data).map_err(|source| EventError::Decode { event_type, source })
}

impl Event {
    /// Decodes a stored task payload according to the task's event type.
    pub fn decode(event_type: HookEventType, data: &[u8]) -> Result<Event> {
        use HookEventType as T;

        let event = match event_type {
            T::Create => Event::Create(decode_as(event_type, data)?),
            T::Delete => Event::Delete(decode_as(event_type, data)?),
            T::Fork => Event::Fork(decode_as(event_type, data)?),
            T::Push => Event::Push(decode_as(event_type, data)?),
            T::Issues | T::IssueAssign | T::IssueLabel | T::IssueMilestone => {
                Event::Issue(decode_as(event_type, data)?)
            }
            T::IssueComment => Event::IssueComment(decode_as(event_type, data)?),
            T::PullRequestComment => Event::PullRequestComment(decode_as(event_type, data)?),
            T::PullRequest
            | T::PullRequestAssign
            | T::PullRequestLabel
            | T::PullRequestMilestone
            | T::PullRequestSync
            | T::PullRequestReviewRequest => Event::PullRequest(decode_as(event_type, data)?),
            T::PullRequestReviewApproved
            | T::PullRequestReviewRejected
            | T::PullRequestReviewComment => Event::Review {
                payload: decode_as(event_type, data)?,
                kind: event_type
                    .review_kind()
                    .ok_or_else(|| EventError::UnknownEventType(event_type.to_string()))?,
            },
            T::Repository => Event::Repository(decode_as(event_type, data)?),
            T::Release => Event::Release(decode_as(event_type, data)?),
            T::Wiki => Event::Wiki(decode_as(event_type, data)?),
            T::Package => Event::Package(decode_as(event_type, data)?),
        };

        Ok(event)
    }

    /// Serializes the payload the way it is stored in a task: indented JSON.
    pub fn to_json(&self) -> Result<String> {
        fn pretty<T: Serialize>(payload: &T) -> Result<String> {
            Ok(serde_json::to_string_pretty(payload)?)
        }

        match self {
            Event::Create(p) => pretty(p),
            Event::Delete(p) => pretty(p),
            Event::Fork(p) => pretty(p),
            Event::Push(p) => pretty(p),
            Event::Issue(p) => pretty(p),
            Event::IssueComment(p) | Event::PullRequestComment(p) => pretty(p),
            Event::PullRequest(p) => pretty(p),
            Event::Review { payload, .. } => pretty(payload),
            Event::Repository(p) => pretty(p),
            Event::Package(p) => pretty(p),
            Event::Wiki(p) => pretty(p),
            Event::Release(p) => pretty(p),
        }
    }

    pub fn repository(&self) -> Option<&Repository> {
        match self {
            Event::Create(p) => Some(&p.repo),
            Event::Delete(p) => Some(&p.repo),
            Event::Fork(p) => Some(&p.repo),
            Event::Push(p) => Some(&p.repo),
            Event::Issue(p) => Some(&p.repository),
            Event::IssueComment(p) | Event::PullRequestComment(p) => Some(&p.repository),
            Event::PullRequest(p) => Some(&p.repository),
            Event::Review { payload, .. } => Some(&payload.repository),
            Event::Repository(p) => Some(&p.repository),
            Event::Package(p) => p.repository.as_ref(),
            Event::Wiki(p) => Some(&p.repository),
            Event::Release(p) => Some(&p.repository),
        }
    }

    pub fn sender(&self) -> &User {
        match self {
            Event::Create(p) => &p.sender,
            Event::Delete(p) => &p.sender,
            Event::Fork(p) => &p.sender,
            Event::Push(p) => &p.pusher,
            Event::Issue(p) => &p.sender,
            Event::IssueComment(p) | Event::PullRequestComment(p) => &p.sender,
            Event::PullRequest(p) => &p.sender,
            Event::Review { payload, .. } => &payload.sender,
            Event::Repository(p) => &p.sender,
            Event::Package(p) => &p.sender,
            Event::Wiki(p) => &p.sender,
            Event::Release(p) => &p.sender,
        }
    }

    /// The fully qualified ref a create, delete or push event concerns.
    pub fn git_ref(&self) -> Option<String> {
        match self {
            Event::Create(p) => Some(RefName::qualified(&p.git_ref, &p.ref_type)),
            Event::Delete(p) => Some(RefName::qualified(&p.git_ref, &p.ref_type)),
            Event::Push(p) => Some(p.git_ref.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_push() {
        let body = br#"{
            "ref": "refs/heads/main",
            "head_commit": {"id": "abc", "message": "msg"},
            "repository": {"full_name": "test/repo"},
            "pusher": {"login": "user1"}
        }"#;

        let event = Event::decode(HookEventType::Push, body).unwrap();
        match &event {
            Event::Push(p) => {
                assert_eq!(p.git_ref, "refs/heads/main");
                assert_eq!(p.head_commit.as_ref().unwrap().id, "abc");
            }
            _ => panic!("Expected Push event"),
        }
        assert_eq!(event.sender().user_name, "user1");
        assert_eq!(event.git_ref().as_deref(), Some("refs/heads/main"));
    }

    #[test]
    fn test_git_ref_is_qualified() {
        let event = Event::Create(CreatePayload {
            git_ref: "v1.0".to_string(),
            ref_type: "tag".to_string(),
            ..Default::default()
        });
        assert_eq!(event.git_ref().as_deref(), Some("refs/tags/v1.0"));
        assert_eq!(Event::Fork(ForkPayload::default()).git_ref(), None);
        assert!(Event::Fork(ForkPayload::default()).repository().is_some());
    }

    #[test]
    fn test_decode_review_carries_kind() {
        let body = br#"{"action": "reviewed", "number": 12}"#;
        let event = Event::decode(HookEventType::PullRequestReviewApproved, body).unwrap();
        match event {
            Event::Review { payload, kind } => {
                assert_eq!(payload.index, 12);
                assert_eq!(payload.action, HookIssueAction::Reviewed);
                assert_eq!(kind, ReviewKind::Approved);
            }
            _ => panic!("Expected Review event"),
        }
    }

    #[test]
    fn test_decode_issue_subtypes() {
        let body = br#"{"action": "label_updated", "number": 2}"#;
        let event = Event::decode(HookEventType::IssueLabel, body).unwrap();
        assert!(matches!(
            event,
            Event::Issue(IssuePayload {
                action: HookIssueAction::LabelUpdated,
                index: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_decode_error_names_event_type() {
        let err = Event::decode(HookEventType::Release, b"not json").unwrap_err();
        assert!(err.to_string().starts_with("release payload could not be decoded"));
    }

    #[test]
    fn test_to_json_uses_api_field_names() {
        let event = Event::Create(CreatePayload {
            sha: "abc".to_string(),
            git_ref: "refs/heads/test".to_string(),
            ref_type: "branch".to_string(),
            ..Default::default()
        });

        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["ref"], "refs/heads/test");
        assert_eq!(json["ref_type"], "branch");
        assert!(json.get("repository").is_some());
    }
}
