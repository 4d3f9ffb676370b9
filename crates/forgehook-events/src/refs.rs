use crate::escape::path_escape_segments;
use std::fmt;

const BRANCH_PREFIX: &str = "refs/heads/";
const TAG_PREFIX: &str = "refs/tags/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefType {
    Branch,
    Tag,
    Commit,
}

impl RefType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefType::Branch => "branch",
            RefType::Tag => "tag",
            RefType::Commit => "commit",
        }
    }
}

impl fmt::Display for RefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A git reference as it appears in event payloads, either fully qualified
/// (`refs/heads/main`) or short (`main`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefName<'a>(&'a str);

impl<'a> RefName<'a> {
    pub fn new(name: &'a str) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &'a str {
        self.0
    }

    /// Fully qualified form of a ref given with a separate `ref_type`, as in
    /// create and delete payloads.
    pub fn qualified(name: &str, ref_type: &str) -> String {
        if name.starts_with("refs/") {
            return name.to_string();
        }
        match ref_type {
            "tag" => format!("{TAG_PREFIX}{name}"),
            "branch" => format!("{BRANCH_PREFIX}{name}"),
            _ => name.to_string(),
        }
    }

    pub fn is_branch(&self) -> bool {
        self.0.starts_with(BRANCH_PREFIX)
    }

    pub fn is_tag(&self) -> bool {
        self.0.starts_with(TAG_PREFIX)
    }

    /// Short refs that are neither qualified nor a full object id are
    /// taken to name a branch.
    pub fn ref_type(&self) -> RefType {
        if self.is_tag() {
            RefType::Tag
        } else if self.is_branch() || !is_object_id(self.0) {
            RefType::Branch
        } else {
            RefType::Commit
        }
    }

    pub fn short_name(&self) -> &'a str {
        self.0
            .strip_prefix(BRANCH_PREFIX)
            .or_else(|| self.0.strip_prefix(TAG_PREFIX))
            .unwrap_or(self.0)
    }

    /// Web URL of this ref inside the repository at `repo_url`.
    pub fn web_url(&self, repo_url: &str) -> String {
        let name = path_escape_segments(self.short_name());
        match self.ref_type() {
            RefType::Branch => format!("{repo_url}/src/branch/{name}"),
            RefType::Tag => format!("{repo_url}/src/tag/{name}"),
            RefType::Commit => format!("{repo_url}/src/commit/{name}"),
        }
    }
}

impl fmt::Display for RefName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SHA-1 or SHA-256 object id in lowercase hex.
fn is_object_id(s: &str) -> bool {
    (s.len() == 40 || s.len() == 64) && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_ref() {
        let r = RefName::new("refs/heads/feature/login");
        assert_eq!(r.ref_type(), RefType::Branch);
        assert_eq!(r.short_name(), "feature/login");
        assert_eq!(
            r.web_url("http://localhost:3000/test/repo"),
            "http://localhost:3000/test/repo/src/branch/feature/login"
        );
    }

    #[test]
    fn test_tag_ref() {
        let r = RefName::new("refs/tags/v1.0.0");
        assert_eq!(r.ref_type(), RefType::Tag);
        assert_eq!(r.short_name(), "v1.0.0");
        assert_eq!(r.web_url("http://x/r"), "http://x/r/src/tag/v1.0.0");
    }

    #[test]
    fn test_short_ref_is_branch() {
        let r = RefName::new("test");
        assert_eq!(r.ref_type(), RefType::Branch);
        assert_eq!(r.web_url("http://x/r"), "http://x/r/src/branch/test");
    }

    #[test]
    fn test_commit_ref() {
        let r = RefName::new("58771003157b81abc6bf41df0c5db4147a3e3c83");
        assert_eq!(r.ref_type(), RefType::Commit);
        assert_eq!(
            r.web_url("http://x/r"),
            "http://x/r/src/commit/58771003157b81abc6bf41df0c5db4147a3e3c83"
        );
    }

    #[test]
    fn test_qualified() {
        assert_eq!(RefName::qualified("v1.0", "tag"), "refs/tags/v1.0");
        assert_eq!(RefName::qualified("test", "branch"), "refs/heads/test");
        assert_eq!(RefName::qualified("refs/tags/v1.0", "tag"), "refs/tags/v1.0");
    }

    #[test]
    fn test_escaped_ref_url() {
        let r = RefName::new("refs/heads/fix #12");
        assert_eq!(r.web_url("http://x/r"), "http://x/r/src/branch/fix%20%2312");
    }
}
