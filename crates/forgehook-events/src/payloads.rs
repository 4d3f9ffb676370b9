use crate::structs::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookIssueAction {
    #[default]
    Opened,
    Closed,
    Reopened,
    Edited,
    Assigned,
    Unassigned,
    LabelUpdated,
    LabelCleared,
    Synchronized,
    Milestoned,
    Demilestoned,
    Reviewed,
    ReviewRequested,
    ReviewRequestRemoved,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookIssueCommentAction {
    #[default]
    Created,
    Edited,
    Deleted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookRepoAction {
    #[default]
    Created,
    Deleted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookReleaseAction {
    #[default]
    Published,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookWikiAction {
    #[default]
    Created,
    Edited,
    Deleted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPackageAction {
    #[default]
    Created,
    Deleted,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatePayload {
    pub sha: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub ref_type: String,
    #[serde(rename = "repository")]
    pub repo: Repository,
    pub sender: User,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeletePayload {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub ref_type: String,
    pub pusher_type: String,
    #[serde(rename = "repository")]
    pub repo: Repository,
    pub sender: User,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForkPayload {
    /// The repository that was forked from.
    pub forkee: Repository,
    #[serde(rename = "repository")]
    pub repo: Repository,
    pub sender: User,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushPayload {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub before: String,
    pub after: String,
    pub compare_url: String,
    pub commits: Vec<PayloadCommit>,
    pub total_commits: usize,
    pub head_commit: Option<PayloadCommit>,
    #[serde(rename = "repository")]
    pub repo: Repository,
    pub pusher: User,
    pub sender: User,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuePayload {
    pub action: HookIssueAction,
    #[serde(rename = "number")]
    pub index: i64,
    pub issue: Issue,
    pub repository: Repository,
    pub sender: User,
    pub commit_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueCommentPayload {
    pub action: HookIssueCommentAction,
    pub issue: Issue,
    pub comment: Comment,
    pub repository: Repository,
    pub sender: User,
    pub is_pull: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewPayload {
    #[serde(rename = "type")]
    pub review_type: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullRequestPayload {
    pub action: HookIssueAction,
    #[serde(rename = "number")]
    pub index: i64,
    pub pull_request: PullRequest,
    pub requested_reviewer: Option<User>,
    pub repository: Repository,
    pub sender: User,
    pub commit_id: String,
    pub review: Option<ReviewPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryPayload {
    pub action: HookRepoAction,
    pub repository: Repository,
    pub organization: Option<User>,
    pub sender: User,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleasePayload {
    pub action: HookReleaseAction,
    pub release: Release,
    pub repository: Repository,
    pub sender: User,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WikiPayload {
    pub action: HookWikiAction,
    pub repository: Repository,
    pub sender: User,
    pub page: String,
    pub comment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagePayload {
    pub action: HookPackageAction,
    pub repository: Option<Repository>,
    pub package: Package,
    pub sender: User,
}
