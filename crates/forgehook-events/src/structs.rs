//! Repository, user and content objects embedded in event payloads.
//!
//! Field names follow the forge REST API so that a stored task payload can
//! be decoded without translation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: i64,
    #[serde(rename = "login", alias = "username")]
    pub user_name: String,
    pub full_name: String,
    pub email: String,
    pub avatar_url: String,
    pub html_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Repository {
    pub id: i64,
    pub owner: Option<User>,
    pub name: String,
    pub full_name: String,
    pub description: String,
    pub private: bool,
    pub fork: bool,
    pub html_url: String,
    pub ssh_url: String,
    pub clone_url: String,
    pub default_branch: String,
}

impl Repository {
    pub fn owner_name(&self) -> &str {
        match &self.owner {
            Some(owner) => &owner.user_name,
            None => self.full_name.split('/').next().unwrap_or_default(),
        }
    }
}

/// Commit author or committer as recorded in git, not necessarily a forge
/// account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadUser {
    pub name: String,
    pub email: String,
    pub username: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayloadCommit {
    pub id: String,
    pub message: String,
    pub url: String,
    pub author: Option<PayloadUser>,
    pub committer: Option<PayloadUser>,
    pub timestamp: Option<DateTime<Utc>>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<String>,
}

impl PayloadCommit {
    pub fn short_id(&self) -> &str {
        self.id.get(..7).unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Milestone {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Issue {
    pub id: i64,
    pub html_url: String,
    pub number: i64,
    pub user: Option<User>,
    pub title: String,
    pub body: String,
    pub state: String,
    pub assignees: Vec<User>,
    pub milestone: Option<Milestone>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Comment {
    pub id: i64,
    pub html_url: String,
    pub pull_request_url: String,
    pub issue_url: String,
    pub user: Option<User>,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullRequestBranch {
    pub label: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub sha: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullRequest {
    pub id: i64,
    pub html_url: String,
    pub number: i64,
    pub user: Option<User>,
    pub title: String,
    pub body: String,
    pub state: String,
    pub merged: bool,
    pub milestone: Option<Milestone>,
    pub assignees: Vec<User>,
    pub head: Option<PullRequestBranch>,
    pub base: Option<PullRequestBranch>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Release {
    pub id: i64,
    pub tag_name: String,
    pub target_commitish: String,
    #[serde(rename = "name")]
    pub title: String,
    #[serde(rename = "body")]
    pub note: String,
    pub html_url: String,
    pub draft: bool,
    pub prerelease: bool,
    #[serde(rename = "author")]
    pub publisher: Option<User>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Package {
    pub id: i64,
    pub owner: Option<User>,
    pub creator: Option<User>,
    #[serde(rename = "type")]
    pub package_type: String,
    pub name: String,
    pub version: String,
    pub html_url: String,
}
