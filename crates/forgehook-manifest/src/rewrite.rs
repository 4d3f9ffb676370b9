use crate::emit::emit;
use crate::error::{ManifestError, Result};
use crate::node::{Entry, Mapping, Node, Scalar, Sequence, Value};
use crate::parse::parse;
use tracing::debug;

/// Where the build service should clone the repository from.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepoSource<'a> {
    pub clone_url: &'a str,
    pub ssh_url: &'a str,
    pub private: bool,
}

/// Pins a build manifest to the commit that triggered it and records the
/// submitter in the build environment.
#[derive(Debug, Clone)]
pub struct ManifestRewriter {
    submitter: String,
    submitter_url: String,
    prefer_ssh: bool,
}

impl ManifestRewriter {
    pub fn new(submitter: impl Into<String>, submitter_url: impl Into<String>) -> Self {
        Self {
            submitter: submitter.into(),
            submitter_url: submitter_url.into(),
            prefer_ssh: false,
        }
    }

    /// Use the SSH clone URL for new sources even on public repositories,
    /// e.g. when HTTP git access is disabled.
    pub fn with_ssh_preferred(mut self, prefer_ssh: bool) -> Self {
        self.prefer_ssh = prefer_ssh;
        self
    }

    pub fn rewrite(
        &self,
        manifest: &str,
        source: RepoSource<'_>,
        commit: &str,
        git_ref: &str,
    ) -> Result<String> {
        let mut doc = parse(manifest)?;

        let mut root = doc.root.take().unwrap_or_else(Node::null);
        if root.is_null() {
            root.value = Value::Mapping(Mapping::default());
        }
        let Value::Mapping(map) = &mut root.value else {
            return Err(ManifestError::NotAMapping);
        };
        self.rewrite_mapping(map, source, commit, git_ref)?;

        doc.root = Some(root);
        Ok(emit(&doc))
    }

    fn rewrite_mapping(
        &self,
        map: &mut Mapping,
        source: RepoSource<'_>,
        commit: &str,
        git_ref: &str,
    ) -> Result<()> {
        let mut sources = map.remove("sources").unwrap_or_else(|| Entry {
            key: Scalar::string("sources"),
            value: Node::null(),
        });
        let mut environment = map.remove("environment").unwrap_or_else(|| Entry {
            key: Scalar::string("environment"),
            value: Node::null(),
        });

        let mut items = match std::mem::replace(&mut sources.value.value, Value::Scalar(Scalar::null())) {
            Value::Sequence(seq) => seq.items,
            Value::Scalar(s) if s.is_null() => Vec::new(),
            _ => {
                return Err(ManifestError::InvalidField {
                    field: "sources",
                    expected: "a sequence",
                });
            }
        };
        pin_source(&mut items, source, commit, self.prefer_ssh)?;
        sources.value.value = Value::Sequence(Sequence {
            items,
            flow: false,
        });

        let mut env = match std::mem::replace(&mut environment.value.value, Value::Scalar(Scalar::null())) {
            Value::Mapping(env) => env,
            Value::Scalar(s) if s.is_null() => Mapping::default(),
            _ => {
                return Err(ManifestError::InvalidField {
                    field: "environment",
                    expected: "a mapping",
                });
            }
        };
        env.set("BUILD_SUBMITTER", Node::string(&self.submitter));
        env.set("BUILD_SUBMITTER_URL", Node::string(&self.submitter_url));
        env.set("GIT_REF", Node::string(git_ref));
        env.entries.sort_by(|a, b| a.key.value().cmp(&b.key.value()));
        env.flow = false;
        environment.value.value = Value::Mapping(env);

        map.entries.insert(0, environment);
        map.entries.insert(0, sources);
        map.flow = false;
        Ok(())
    }
}

/// Points the entry for this repository at `commit`, adding one when the
/// manifest does not list the repository yet.
fn pin_source(items: &mut Vec<Node>, source: RepoSource<'_>, commit: &str, prefer_ssh: bool) -> Result<()> {
    let is_repo = |url: &str| {
        (!source.clone_url.is_empty() && url == source.clone_url)
            || (!source.ssh_url.is_empty() && url == source.ssh_url)
    };

    for item in items.iter_mut() {
        let Some(url) = item.as_str() else {
            continue;
        };
        let base = url.split_once('#').map_or(url, |(base, _)| base);
        if is_repo(base) {
            let pinned = format!("{base}#{commit}");
            debug!("Pinning manifest source {} to {}", base, commit);
            item.value = Value::Scalar(Scalar::string(&pinned));
            return Ok(());
        }
    }

    let url = if (source.private || prefer_ssh) && !source.ssh_url.is_empty() {
        source.ssh_url
    } else {
        source.clone_url
    };
    if url.is_empty() {
        return Err(ManifestError::MissingSourceUrl);
    }

    debug!("Adding manifest source {}", url);
    items.push(Node::string(&format!("{url}#{commit}")));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMIT: &str = "58771003157b81abc6bf41df0c5db4147a3e3c83";

    fn rewriter() -> ManifestRewriter {
        ManifestRewriter::new("forgejo", "https://example.forgejo.org/")
    }

    fn public() -> RepoSource<'static> {
        RepoSource {
            clone_url: "http://localhost:3000/testdata/repo.git",
            ssh_url: "git@localhost:testdata/repo.git",
            private: false,
        }
    }

    #[test]
    fn test_existing_environment_is_merged_and_sorted() {
        let out = rewriter()
            .rewrite(
                "environment:\n  deploy: me@example.org\n  GIT_REF: stale\nimage: x\n",
                public(),
                COMMIT,
                "refs/heads/main",
            )
            .unwrap();
        assert_eq!(
            out,
            format!(
                "sources:\n    - http://localhost:3000/testdata/repo.git#{COMMIT}\nenvironment:\n    BUILD_SUBMITTER: forgejo\n    BUILD_SUBMITTER_URL: https://example.forgejo.org/\n    GIT_REF: refs/heads/main\n    deploy: me@example.org\nimage: x\n"
            )
        );
    }

    #[test]
    fn test_pinned_source_is_repinned() {
        let out = rewriter()
            .rewrite(
                "sources:\n- http://localhost:3000/testdata/repo.git#0000\n",
                public(),
                COMMIT,
                "refs/heads/main",
            )
            .unwrap();
        assert!(out.starts_with(&format!(
            "sources:\n    - http://localhost:3000/testdata/repo.git#{COMMIT}\nenvironment:\n"
        )));
    }

    #[test]
    fn test_ssh_preferred_for_public_repository() {
        let out = rewriter()
            .with_ssh_preferred(true)
            .rewrite("image: x\n", public(), COMMIT, "refs/heads/main")
            .unwrap();
        assert!(out.starts_with(&format!("sources:\n    - git@localhost:testdata/repo.git#{COMMIT}\n")));
    }

    #[test]
    fn test_empty_manifest_gets_sources_and_environment() {
        let out = rewriter().rewrite("", public(), COMMIT, "refs/tags/v1").unwrap();
        assert!(out.starts_with("sources:\n"));
        assert!(out.ends_with("    GIT_REF: refs/tags/v1\n"));
    }

    #[test]
    fn test_missing_url() {
        let err = rewriter()
            .rewrite("image: x\n", RepoSource::default(), COMMIT, "refs/heads/main")
            .unwrap_err();
        assert_eq!(err, ManifestError::MissingSourceUrl);
    }

    #[test]
    fn test_invalid_shapes() {
        assert_eq!(
            rewriter()
                .rewrite("- a\n- b\n", public(), COMMIT, "refs/heads/main")
                .unwrap_err(),
            ManifestError::NotAMapping
        );
        assert_eq!(
            rewriter()
                .rewrite("sources: one\n", public(), COMMIT, "refs/heads/main")
                .unwrap_err(),
            ManifestError::InvalidField {
                field: "sources",
                expected: "a sequence"
            }
        );
        assert_eq!(
            rewriter()
                .rewrite("environment: [a]\n", public(), COMMIT, "refs/heads/main")
                .unwrap_err(),
            ManifestError::InvalidField {
                field: "environment",
                expected: "a mapping"
            }
        );
    }
}
