use crate::EventError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fine-grained event type recorded on a hook task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEventType {
    Create,
    Delete,
    Fork,
    Push,
    Issues,
    IssueAssign,
    IssueLabel,
    IssueMilestone,
    IssueComment,
    PullRequest,
    PullRequestAssign,
    PullRequestLabel,
    PullRequestMilestone,
    PullRequestComment,
    PullRequestReviewApproved,
    PullRequestReviewRejected,
    PullRequestReviewComment,
    PullRequestSync,
    PullRequestReviewRequest,
    Wiki,
    Repository,
    Release,
    Package,
}

impl HookEventType {
    pub const ALL: [HookEventType; 23] = [
        HookEventType::Create,
        HookEventType::Delete,
        HookEventType::Fork,
        HookEventType::Push,
        HookEventType::Issues,
        HookEventType::IssueAssign,
        HookEventType::IssueLabel,
        HookEventType::IssueMilestone,
        HookEventType::IssueComment,
        HookEventType::PullRequest,
        HookEventType::PullRequestAssign,
        HookEventType::PullRequestLabel,
        HookEventType::PullRequestMilestone,
        HookEventType::PullRequestComment,
        HookEventType::PullRequestReviewApproved,
        HookEventType::PullRequestReviewRejected,
        HookEventType::PullRequestReviewComment,
        HookEventType::PullRequestSync,
        HookEventType::PullRequestReviewRequest,
        HookEventType::Wiki,
        HookEventType::Repository,
        HookEventType::Release,
        HookEventType::Package,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookEventType::Create => "create",
            HookEventType::Delete => "delete",
            HookEventType::Fork => "fork",
            HookEventType::Push => "push",
            HookEventType::Issues => "issues",
            HookEventType::IssueAssign => "issue_assign",
            HookEventType::IssueLabel => "issue_label",
            HookEventType::IssueMilestone => "issue_milestone",
            HookEventType::IssueComment => "issue_comment",
            HookEventType::PullRequest => "pull_request",
            HookEventType::PullRequestAssign => "pull_request_assign",
            HookEventType::PullRequestLabel => "pull_request_label",
            HookEventType::PullRequestMilestone => "pull_request_milestone",
            HookEventType::PullRequestComment => "pull_request_comment",
            HookEventType::PullRequestReviewApproved => "pull_request_review_approved",
            HookEventType::PullRequestReviewRejected => "pull_request_review_rejected",
            HookEventType::PullRequestReviewComment => "pull_request_review_comment",
            HookEventType::PullRequestSync => "pull_request_sync",
            HookEventType::PullRequestReviewRequest => "pull_request_review_request",
            HookEventType::Wiki => "wiki",
            HookEventType::Repository => "repository",
            HookEventType::Release => "release",
            HookEventType::Package => "package",
        }
    }

    /// Coarse event name sent in the `X-*-Event` delivery headers.
    pub fn event(&self) -> &'static str {
        match self {
            HookEventType::Create => "create",
            HookEventType::Delete => "delete",
            HookEventType::Fork => "fork",
            HookEventType::Push => "push",
            HookEventType::Issues
            | HookEventType::IssueAssign
            | HookEventType::IssueLabel
            | HookEventType::IssueMilestone => "issues",
            HookEventType::PullRequest
            | HookEventType::PullRequestAssign
            | HookEventType::PullRequestLabel
            | HookEventType::PullRequestMilestone
            | HookEventType::PullRequestSync
            | HookEventType::PullRequestReviewRequest => "pull_request",
            HookEventType::IssueComment | HookEventType::PullRequestComment => "issue_comment",
            HookEventType::PullRequestReviewApproved => "pull_request_approved",
            HookEventType::PullRequestReviewRejected => "pull_request_rejected",
            HookEventType::PullRequestReviewComment => "pull_request_comment",
            HookEventType::Wiki => "wiki",
            HookEventType::Repository => "repository",
            HookEventType::Release => "release",
            HookEventType::Package => "package",
        }
    }

    pub fn review_kind(&self) -> Option<ReviewKind> {
        match self {
            HookEventType::PullRequestReviewApproved => Some(ReviewKind::Approved),
            HookEventType::PullRequestReviewRejected => Some(ReviewKind::Rejected),
            HookEventType::PullRequestReviewComment => Some(ReviewKind::Comment),
            _ => None,
        }
    }

    /// Whether the event concerns a ref, so a branch filter applies to it.
    pub fn is_ref_event(&self) -> bool {
        matches!(
            self,
            HookEventType::Create | HookEventType::Delete | HookEventType::Push
        )
    }
}

impl fmt::Display for HookEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HookEventType {
    type Err = EventError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        HookEventType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| EventError::UnknownEventType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewKind {
    Approved,
    Rejected,
    Comment,
}

impl ReviewKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewKind::Approved => "approved",
            ReviewKind::Rejected => "rejected",
            ReviewKind::Comment => "comment",
        }
    }

    pub fn event_type(&self) -> HookEventType {
        match self {
            ReviewKind::Approved => HookEventType::PullRequestReviewApproved,
            ReviewKind::Rejected => HookEventType::PullRequestReviewRejected,
            ReviewKind::Comment => HookEventType::PullRequestReviewComment,
        }
    }
}

impl fmt::Display for ReviewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for t in HookEventType::ALL {
            assert_eq!(t.as_str().parse::<HookEventType>().unwrap(), t);
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
    }

    #[test]
    fn test_unknown_event_type() {
        assert!(matches!(
            "star".parse::<HookEventType>(),
            Err(EventError::UnknownEventType(_))
        ));
    }

    #[test]
    fn test_header_event_names() {
        assert_eq!(HookEventType::IssueLabel.event(), "issues");
        assert_eq!(HookEventType::PullRequestSync.event(), "pull_request");
        assert_eq!(HookEventType::PullRequestComment.event(), "issue_comment");
        assert_eq!(
            HookEventType::PullRequestReviewApproved.event(),
            "pull_request_approved"
        );
    }

    #[test]
    fn test_review_kind() {
        assert_eq!(
            HookEventType::PullRequestReviewRejected.review_kind(),
            Some(ReviewKind::Rejected)
        );
        assert_eq!(HookEventType::PullRequest.review_kind(), None);
        assert_eq!(
            ReviewKind::Comment.event_type(),
            HookEventType::PullRequestReviewComment
        );
    }
}
