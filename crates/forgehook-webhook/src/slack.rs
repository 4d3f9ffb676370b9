//! Slack incoming-webhook payloads.

use crate::convertor::{PayloadConvertor, convert_task};
use crate::error::{Result, WebhookError};
use crate::handler::Handler;
use crate::hook::{HookTask, HookType, Webhook};
use crate::request::{PreparedRequest, new_json_request};
use crate::text::{
    attachment_text, escape, is_valid_slack_channel, issue_title, link, ref_link, short_text,
};
use async_trait::async_trait;
use forgehook_events::*;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::error;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackMeta {
    pub channel: String,
    pub username: String,
    pub icon_url: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlackPayload {
    pub channel: String,
    pub text: String,
    pub username: String,
    pub icon_url: String,
    pub unfurl_links: bool,
    pub link_names: i32,
    #[serde(default)]
    pub attachments: Vec<SlackAttachment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackAttachment {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fallback: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub color: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title_link: String,
    pub text: String,
}

pub struct SlackConvertor {
    meta: SlackMeta,
    /// Commits listed in a push attachment; 0 lists all of them.
    commit_limit: usize,
}

impl SlackConvertor {
    pub fn new(meta: SlackMeta, commit_limit: usize) -> Self {
        Self { meta, commit_limit }
    }

    fn payload(&self, text: String, attachments: Vec<SlackAttachment>) -> SlackPayload {
        SlackPayload {
            channel: self.meta.channel.clone(),
            text,
            username: self.meta.username.clone(),
            icon_url: self.meta.icon_url.clone(),
            unfurl_links: false,
            link_names: 0,
            attachments,
        }
    }

    fn attachment(&self, title: &str, title_link: &str, text: &str) -> SlackAttachment {
        SlackAttachment {
            fallback: String::new(),
            color: self.meta.color.clone(),
            title: title.to_string(),
            title_link: title_link.to_string(),
            text: attachment_text(text),
        }
    }

    /// Single body attachment, or none when the body is empty.
    fn body_attachment(&self, title: &str, title_link: &str, body: &str) -> Vec<SlackAttachment> {
        if body.is_empty() {
            return Vec::new();
        }
        vec![self.attachment(title, title_link, body)]
    }
}

fn names(users: &[User]) -> String {
    users
        .iter()
        .map(|u| escape(&u.user_name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn milestone_link(repo: &Repository, milestone: Option<&Milestone>) -> String {
    match milestone {
        Some(m) => link(&format!("{}/milestone/{}", repo.html_url, m.id), &m.title),
        None => String::new(),
    }
}

#[async_trait]
impl PayloadConvertor for SlackConvertor {
    type Payload = SlackPayload;

    async fn create(&self, p: &CreatePayload) -> Result<SlackPayload> {
        let git_ref = RefName::qualified(&p.git_ref, &p.ref_type);
        let text = format!(
            "[{}:{}] {} created by {}",
            escape(&p.repo.full_name),
            ref_link(&p.repo.html_url, &git_ref),
            p.ref_type,
            escape(&p.sender.user_name)
        );
        Ok(self.payload(text, Vec::new()))
    }

    async fn delete(&self, p: &DeletePayload) -> Result<SlackPayload> {
        let text = format!(
            "[{}:{}] {} deleted by {}",
            link(&p.repo.html_url, &p.repo.full_name),
            escape(RefName::new(&p.git_ref).short_name()),
            p.ref_type,
            escape(&p.sender.user_name)
        );
        Ok(self.payload(text, Vec::new()))
    }

    async fn fork(&self, p: &ForkPayload) -> Result<SlackPayload> {
        let text = format!(
            "{} is forked to {}",
            link(&p.forkee.html_url, &p.forkee.full_name),
            link(&p.repo.html_url, &p.repo.full_name)
        );
        Ok(self.payload(text, Vec::new()))
    }

    async fn push(&self, p: &PushPayload) -> Result<SlackPayload> {
        let commits = if p.total_commits == 1 {
            "1 new commit".to_string()
        } else {
            format!("{} new commits", p.total_commits)
        };
        let text = format!(
            "[{}:{}] {} pushed by {}",
            escape(&p.repo.full_name),
            ref_link(&p.repo.html_url, &p.git_ref),
            commits,
            escape(&p.pusher.user_name)
        );

        let limit = match self.commit_limit {
            0 => p.commits.len(),
            n => n,
        };
        let lines: Vec<String> = p
            .commits
            .iter()
            .take(limit)
            .map(|c| {
                let author = c.author.as_ref().map(|a| a.name.as_str()).unwrap_or_default();
                format!(
                    "{}: {} - {}",
                    link(&c.url, c.short_id()),
                    short_text(&c.message),
                    escape(author)
                )
            })
            .collect();

        let attachment = SlackAttachment {
            fallback: String::new(),
            color: self.meta.color.clone(),
            title: p.repo.html_url.clone(),
            title_link: p.repo.html_url.clone(),
            text: lines.join("\n"),
        };
        Ok(self.payload(text, vec![attachment]))
    }

    async fn issue(&self, p: &IssuePayload) -> Result<SlackPayload> {
        let repo = &p.repository;
        let title = issue_title(p.index, &p.issue.title);
        let url = format!("{}/issues/{}", repo.html_url, p.index);
        let title_link = link(&url, &title);

        let verb = match p.action {
            HookIssueAction::Opened => "opened".to_string(),
            HookIssueAction::Closed => "closed".to_string(),
            HookIssueAction::Reopened => "re-opened".to_string(),
            HookIssueAction::Edited => "edited".to_string(),
            HookIssueAction::Assigned => format!("assigned to {}", names(&p.issue.assignees)),
            HookIssueAction::Unassigned => "unassigned".to_string(),
            HookIssueAction::LabelUpdated => "labels updated".to_string(),
            HookIssueAction::LabelCleared => "labels cleared".to_string(),
            HookIssueAction::Synchronized => "synchronized".to_string(),
            HookIssueAction::Milestoned => format!(
                "milestoned to {}",
                milestone_link(repo, p.issue.milestone.as_ref())
            ),
            HookIssueAction::Demilestoned => "milestone cleared".to_string(),
            _ => return Err(WebhookError::PayloadTypeNotSupported),
        };
        let text = format!(
            "[{}] Issue {}: {} by {}",
            escape(&repo.full_name),
            verb,
            title_link,
            escape(&p.sender.user_name)
        );

        let attachments = match p.action {
            HookIssueAction::Opened | HookIssueAction::Edited => {
                self.body_attachment(&title, &url, &p.issue.body)
            }
            _ => Vec::new(),
        };
        Ok(self.payload(text, attachments))
    }

    async fn issue_comment(&self, p: &IssueCommentPayload) -> Result<SlackPayload> {
        let title = issue_title(p.issue.number, &p.issue.title);
        let (kind, url) = if p.is_pull {
            ("pull request", p.comment.pull_request_url.as_str())
        } else {
            ("issue", p.comment.issue_url.as_str())
        };
        let which = match p.action {
            HookIssueCommentAction::Created => "New comment on",
            HookIssueCommentAction::Edited => "Comment edited on",
            HookIssueCommentAction::Deleted => "Comment deleted on",
        };
        let text = format!(
            "[{}] {} {} {} by {}",
            escape(&p.repository.full_name),
            which,
            kind,
            link(url, &title),
            escape(&p.sender.user_name)
        );

        let attachments = match p.action {
            HookIssueCommentAction::Deleted => Vec::new(),
            _ => self.body_attachment(&title, &p.comment.html_url, &p.comment.body),
        };
        Ok(self.payload(text, attachments))
    }

    async fn pull_request(&self, p: &PullRequestPayload) -> Result<SlackPayload> {
        let repo = &p.repository;
        let pr = &p.pull_request;
        let title = issue_title(p.index, &pr.title);
        let url = format!("{}/pulls/{}", repo.html_url, p.index);
        let title_link = link(&url, &title);

        let verb = match p.action {
            HookIssueAction::Opened => "opened".to_string(),
            HookIssueAction::Closed if pr.merged => "merged".to_string(),
            HookIssueAction::Closed => "closed".to_string(),
            HookIssueAction::Reopened => "re-opened".to_string(),
            HookIssueAction::Edited => "edited".to_string(),
            HookIssueAction::Assigned => format!("assigned to {}", names(&pr.assignees)),
            HookIssueAction::Unassigned => "unassigned".to_string(),
            HookIssueAction::LabelUpdated => "labels updated".to_string(),
            HookIssueAction::LabelCleared => "labels cleared".to_string(),
            HookIssueAction::Synchronized => "synchronized".to_string(),
            HookIssueAction::Milestoned => {
                format!("milestoned to {}", milestone_link(repo, pr.milestone.as_ref()))
            }
            HookIssueAction::Demilestoned => "milestone cleared".to_string(),
            HookIssueAction::Reviewed => "reviewed".to_string(),
            HookIssueAction::ReviewRequested => format!(
                "review requested to {}",
                p.requested_reviewer
                    .as_ref()
                    .map(|u| escape(&u.user_name))
                    .unwrap_or_default()
            ),
            HookIssueAction::ReviewRequestRemoved => "review request removed".to_string(),
        };
        let text = format!(
            "[{}] Pull request {}: {} by {}",
            escape(&repo.full_name),
            verb,
            title_link,
            escape(&p.sender.user_name)
        );

        let body = match p.action {
            HookIssueAction::Opened | HookIssueAction::Edited => pr.body.as_str(),
            HookIssueAction::Reviewed => p.review.as_ref().map(|r| r.content.as_str()).unwrap_or_default(),
            _ => "",
        };
        Ok(self.payload(text, self.body_attachment(&title, &url, body)))
    }

    async fn review(&self, p: &PullRequestPayload, kind: ReviewKind) -> Result<SlackPayload> {
        let mut text = String::new();
        if p.action == HookIssueAction::Reviewed {
            text = format!(
                "[{}] Pull request review {}: [{}]({}/pulls/{}) by {}",
                escape(&p.repository.full_name),
                kind,
                issue_title(p.index, &p.pull_request.title),
                p.repository.html_url,
                p.index,
                escape(&p.sender.user_name)
            );
        }
        Ok(self.payload(text, Vec::new()))
    }

    async fn repository(&self, p: &RepositoryPayload) -> Result<SlackPayload> {
        let repo = &p.repository;
        let text = match p.action {
            HookRepoAction::Created => format!(
                "[{}] Repository created by {}",
                link(&repo.html_url, &repo.full_name),
                escape(&p.sender.user_name)
            ),
            HookRepoAction::Deleted => format!(
                "[{}] Repository deleted by {}",
                escape(&repo.full_name),
                escape(&p.sender.user_name)
            ),
        };
        Ok(self.payload(text, Vec::new()))
    }

    async fn package(&self, p: &PackagePayload) -> Result<SlackPayload> {
        let package = &p.package;
        let action = match p.action {
            HookPackageAction::Created => "created",
            HookPackageAction::Deleted => "deleted",
        };
        let text = format!(
            "Package {}: {} by {}",
            action,
            link(
                &package.html_url,
                &format!("{}:{}", package.name, package.version)
            ),
            escape(&p.sender.user_name)
        );
        Ok(self.payload(text, Vec::new()))
    }

    async fn wiki(&self, p: &WikiPayload) -> Result<SlackPayload> {
        let repo = &p.repository;
        let page = link(
            &format!("{}/wiki/{}", repo.html_url, path_escape(&p.page)),
            &p.page,
        );
        let comment = if p.comment.is_empty() {
            String::new()
        } else {
            format!(" ({})", escape(&p.comment))
        };
        let repo_name = escape(&repo.full_name);
        let text = match p.action {
            HookWikiAction::Created => format!("[{repo_name}] New wiki page '{page}'{comment}"),
            HookWikiAction::Edited => format!("[{repo_name}] Wiki page '{page}' edited{comment}"),
            HookWikiAction::Deleted => format!("[{repo_name}] Wiki page '{page}' deleted"),
        };
        let text = format!("{} by {}", text, escape(&p.sender.user_name));
        Ok(self.payload(text, Vec::new()))
    }

    async fn release(&self, p: &ReleasePayload) -> Result<SlackPayload> {
        let repo = &p.repository;
        let release = &p.release;
        let url = format!(
            "{}/releases/tag/{}",
            repo.html_url,
            path_escape_segments(&release.tag_name)
        );
        let action = match p.action {
            HookReleaseAction::Published => "created",
            HookReleaseAction::Updated => "updated",
            HookReleaseAction::Deleted => "deleted",
        };
        let text = format!(
            "[{}] Release {}: {} by {}",
            escape(&repo.full_name),
            action,
            link(&url, &release.tag_name),
            escape(&p.sender.user_name)
        );
        let title = if release.title.is_empty() {
            release.tag_name.as_str()
        } else {
            release.title.as_str()
        };
        Ok(self.payload(text, self.body_attachment(title, &url, &release.note)))
    }
}

pub struct SlackHandler {
    commit_limit: usize,
}

impl SlackHandler {
    pub fn new(commit_limit: usize) -> Self {
        Self { commit_limit }
    }

    pub fn meta(hook: &Webhook) -> Result<SlackMeta> {
        serde_json::from_str(&hook.meta).map_err(|source| WebhookError::InvalidMeta {
            hook_type: HookType::Slack,
            source,
        })
    }
}

#[async_trait]
impl Handler for SlackHandler {
    fn hook_type(&self) -> HookType {
        HookType::Slack
    }

    fn metadata(&self, hook: &Webhook) -> Option<serde_json::Value> {
        match Self::meta(hook) {
            Ok(meta) => serde_json::to_value(meta).ok(),
            Err(e) => {
                error!("Failed to read metadata of slack hook {}: {}", hook.id, e);
                None
            }
        }
    }

    fn config_entries(&self, hook: &Webhook) -> Vec<(&'static str, String)> {
        let meta = Self::meta(hook).unwrap_or_default();
        vec![
            ("channel", meta.channel),
            ("username", meta.username),
            ("icon_url", meta.icon_url),
            ("color", meta.color),
        ]
    }

    fn normalize_meta(&self, raw: &serde_json::Value) -> Result<String> {
        let mut meta: SlackMeta =
            serde_json::from_value(raw.clone()).map_err(|source| WebhookError::InvalidMeta {
                hook_type: HookType::Slack,
                source,
            })?;
        meta.channel = meta.channel.trim().to_string();
        if !is_valid_slack_channel(&meta.channel) {
            return Err(WebhookError::InvalidSlackChannel(meta.channel));
        }
        Ok(serde_json::to_string(&meta)?)
    }

    async fn new_request(
        &self,
        hook: &Webhook,
        task: &HookTask,
        _cancel: &CancellationToken,
    ) -> Result<PreparedRequest> {
        let convertor = SlackConvertor::new(Self::meta(hook)?, self.commit_limit);
        let payload = convert_task(&convertor, task).await?;
        new_json_request(hook, task, &payload, true)
    }
}
