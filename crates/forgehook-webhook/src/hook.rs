//! Stored hook configuration and delivery task records.
//!
//! Both are owned by the persistence layer; this crate only reads them.

use chrono::{DateTime, Utc};
use forgehook_events::{Event, HookEventType, RefName};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;
use uuid::Uuid;

/// Current version of the task payload format.
pub const PAYLOAD_VERSION: i32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookType {
    #[default]
    Forgejo,
    Gitea,
    Slack,
    SourcehutBuilds,
}

impl HookType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookType::Forgejo => "forgejo",
            HookType::Gitea => "gitea",
            HookType::Slack => "slack",
            HookType::SourcehutBuilds => "sourcehut_builds",
        }
    }
}

impl fmt::Display for HookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    Json,
    Form,
}

impl ContentType {
    pub fn name(&self) -> &'static str {
        match self {
            ContentType::Json => "json",
            ContentType::Form => "form",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Form => "application/x-www-form-urlencoded",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Per-event switches used with `choose_events`. The three review event
/// types share `pull_request_review`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookEvents {
    pub create: bool,
    pub delete: bool,
    pub fork: bool,
    pub issues: bool,
    pub issue_assign: bool,
    pub issue_label: bool,
    pub issue_milestone: bool,
    pub issue_comment: bool,
    pub push: bool,
    pub pull_request: bool,
    pub pull_request_assign: bool,
    pub pull_request_label: bool,
    pub pull_request_milestone: bool,
    pub pull_request_comment: bool,
    pub pull_request_review: bool,
    pub pull_request_sync: bool,
    pub pull_request_review_request: bool,
    pub wiki: bool,
    pub repository: bool,
    pub release: bool,
    pub package: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookEvent {
    pub push_only: bool,
    pub send_everything: bool,
    pub choose_events: bool,
    pub branch_filter: String,
    pub events: HookEvents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookScope {
    Repository,
    Owner,
    /// Template copied into newly created repositories.
    Default,
    /// Fires for every repository on the instance.
    System,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Webhook {
    pub id: i64,
    pub repo_id: i64,
    pub owner_id: i64,
    pub is_system_webhook: bool,
    #[serde(rename = "type")]
    pub hook_type: HookType,
    pub url: String,
    pub http_method: String,
    pub content_type: ContentType,
    pub secret: String,
    /// Provider-specific settings as a JSON document.
    pub meta: String,
    #[serde(flatten)]
    pub hook_event: HookEvent,
    pub is_active: bool,
    pub authorization_header: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Webhook {
    pub fn scope(&self) -> HookScope {
        match (self.repo_id, self.owner_id) {
            (0, 0) if self.is_system_webhook => HookScope::System,
            (0, 0) => HookScope::Default,
            (0, _) => HookScope::Owner,
            _ => HookScope::Repository,
        }
    }

    /// Whether the hook's event selection includes `event_type`.
    pub fn has_event(&self, event_type: HookEventType) -> bool {
        use HookEventType as T;

        let selection = &self.hook_event;
        if selection.send_everything {
            return true;
        }
        if selection.push_only {
            return event_type == T::Push;
        }
        if !selection.choose_events {
            return false;
        }

        let e = &selection.events;
        match event_type {
            T::Create => e.create,
            T::Delete => e.delete,
            T::Fork => e.fork,
            T::Push => e.push,
            T::Issues => e.issues,
            T::IssueAssign => e.issue_assign,
            T::IssueLabel => e.issue_label,
            T::IssueMilestone => e.issue_milestone,
            T::IssueComment => e.issue_comment,
            T::PullRequest => e.pull_request,
            T::PullRequestAssign => e.pull_request_assign,
            T::PullRequestLabel => e.pull_request_label,
            T::PullRequestMilestone => e.pull_request_milestone,
            T::PullRequestComment => e.pull_request_comment,
            T::PullRequestReviewApproved
            | T::PullRequestReviewRejected
            | T::PullRequestReviewComment => e.pull_request_review,
            T::PullRequestSync => e.pull_request_sync,
            T::PullRequestReviewRequest => e.pull_request_review_request,
            T::Wiki => e.wiki,
            T::Repository => e.repository,
            T::Release => e.release,
            T::Package => e.package,
        }
    }

    /// Names of the selected event types.
    pub fn events_array(&self) -> Vec<String> {
        HookEventType::ALL
            .into_iter()
            .filter(|t| self.has_event(*t))
            .map(|t| t.as_str().to_string())
            .collect()
    }

    pub fn matches_branch(&self, branch: &str) -> bool {
        let filter = self.hook_event.branch_filter.as_str();
        if filter.is_empty() || filter == "*" {
            return true;
        }
        match compile_glob(filter) {
            Ok(re) => re.is_match(branch),
            Err(e) => {
                warn!("Invalid branch filter {:?} on hook {}: {}", filter, self.id, e);
                false
            }
        }
    }

    /// Whether `event` should produce a task for this hook. The branch
    /// filter only constrains branch refs; tag events always pass it.
    pub fn should_deliver(&self, event_type: HookEventType, event: &Event) -> bool {
        if !self.is_active || !self.has_event(event_type) {
            return false;
        }
        if !event_type.is_ref_event() {
            return true;
        }

        let Some(qualified) = event.git_ref() else {
            return true;
        };
        let name = RefName::new(&qualified);
        name.is_tag() || self.matches_branch(name.short_name())
    }
}

/// Translates a branch filter glob into an anchored regex. `*` and `**`
/// match any run of characters, `?` one character, `{a,b}` either
/// alternative and `[...]` (or `[!...]`) a character class.
fn compile_glob(glob: &str) -> Result<Regex, regex::Error> {
    let mut pattern = String::from("^");
    let mut chars = glob.chars().peekable();
    let mut depth = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '*' => {
                while chars.peek() == Some(&'*') {
                    chars.next();
                }
                pattern.push_str(".*");
            }
            '?' => pattern.push('.'),
            '{' => {
                depth += 1;
                pattern.push_str("(?:");
            }
            '}' if depth > 0 => {
                depth -= 1;
                pattern.push(')');
            }
            ',' if depth > 0 => pattern.push('|'),
            '[' => {
                pattern.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    pattern.push('^');
                }
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                    if c == '\\' || c == '[' {
                        pattern.push('\\');
                    }
                    pattern.push(c);
                }
                pattern.push(']');
            }
            '\\' => {
                if let Some(next) = chars.next() {
                    pattern.push_str(&regex::escape(&next.to_string()));
                }
            }
            c => pattern.push_str(&regex::escape(&c.to_string())),
        }
    }
    pattern.push('$');

    Regex::new(&pattern)
}

/// One delivery of one event to one hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookTask {
    #[serde(default)]
    pub id: i64,
    pub hook_id: i64,
    pub uuid: Uuid,
    pub event_type: HookEventType,
    /// The event payload as indented JSON.
    pub payload_content: String,
    #[serde(default = "default_payload_version")]
    pub payload_version: i32,
    #[serde(default)]
    pub is_delivered: bool,
    #[serde(default)]
    pub is_succeed: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
}

fn default_payload_version() -> i32 {
    PAYLOAD_VERSION
}

impl HookTask {
    pub fn new(hook_id: i64, event_type: HookEventType, payload_content: String) -> Self {
        Self {
            id: 0,
            hook_id,
            uuid: Uuid::new_v4(),
            event_type,
            payload_content,
            payload_version: PAYLOAD_VERSION,
            is_delivered: false,
            is_succeed: false,
            created_at: Utc::now(),
            delivered_at: None,
        }
    }
}
