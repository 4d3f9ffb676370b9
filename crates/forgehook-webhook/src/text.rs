//! Formatting helpers for link-rich chat payloads.

use forgehook_config::constants::TITLE_DISPLAY_LIMIT;
use forgehook_events::RefName;
use regex::Regex;
use std::sync::LazyLock;

static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.+?)\]\((.+?)\)").expect("markdown link pattern is valid"));

static SLACK_CHANNEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#?[a-z0-9_-]{1,80}$").expect("channel pattern is valid"));

/// Escapes the three characters Slack treats as control characters.
pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// First line of `s`, escaped.
pub fn short_text(s: &str) -> String {
    escape(s.lines().next().unwrap_or_default())
}

pub fn link(url: &str, label: &str) -> String {
    format!("<{}|{}>", url, escape(label))
}

/// Link to `git_ref` labelled with its short name.
pub fn ref_link(repo_url: &str, git_ref: &str) -> String {
    let name = RefName::new(git_ref);
    link(&name.web_url(repo_url), name.short_name())
}

/// Cuts `s` to at most `limit` characters, the last being `…`.
pub fn truncate(s: &str, limit: usize) -> String {
    if s.chars().count() <= limit {
        return s.to_string();
    }
    let mut out: String = s.chars().take(limit.saturating_sub(1)).collect();
    out.push('…');
    out
}

pub fn issue_title(index: i64, title: &str) -> String {
    truncate(&format!("#{index} {title}"), TITLE_DISPLAY_LIMIT)
}

/// Rewrites `[label](url)` markdown links into `<url|label>`.
pub fn markdown_links(s: &str) -> String {
    MARKDOWN_LINK.replace_all(s, "<$2|$1>").into_owned()
}

/// Attachment body: escaped, with markdown links converted.
pub fn attachment_text(s: &str) -> String {
    markdown_links(&escape(s))
}

pub fn is_valid_slack_channel(name: &str) -> bool {
    SLACK_CHANNEL.is_match(name)
}
