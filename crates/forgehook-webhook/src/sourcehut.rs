//! Sourcehut builds: submits the repository's build manifest as a job.

use crate::convertor::{PayloadConvertor, convert_task};
use crate::error::{Result, WebhookError};
use crate::handler::Handler;
use crate::hook::{HookTask, HookType, Webhook};
use crate::request::{PreparedRequest, new_json_request};
use crate::storage::RepositoryReader;
use async_trait::async_trait;
use forgehook_events::{CreatePayload, PushPayload, RefName, Repository};
use forgehook_manifest::{ManifestRewriter, RepoSource};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

pub const SUBMIT_MUTATION: &str = "mutation (
\t$manifest: String!
\t$tags: [String!]
\t$note: String!
\t$secrets: Boolean!
\t$execute: Boolean!
\t$visibility: Visibility!
) {
\tsubmit(
\t\tmanifest: $manifest
\t\ttags: $tags
\t\tnote: $note
\t\tsecrets: $secrets
\t\texecute: $execute
\t\tvisibility: $visibility
\t) {
\t\tid
\t}
}";

pub const VISIBILITIES: [&str; 3] = ["PUBLIC", "UNLISTED", "PRIVATE"];
const DEFAULT_VISIBILITY: &str = "PRIVATE";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildsMeta {
    pub manifest_path: String,
    pub visibility: String,
    pub secrets: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphqlPayload<V> {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub query: String,
    /// Set instead of a query when the job could not be prepared.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<V>,
}

impl<V> GraphqlPayload<V> {
    fn failed(error: String) -> Self {
        Self {
            query: String::new(),
            error,
            variables: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildsVariables {
    pub manifest: String,
    pub tags: Vec<String>,
    pub note: String,
    pub secrets: bool,
    pub execute: bool,
    pub visibility: String,
}

pub type BuildsPayload = GraphqlPayload<BuildsVariables>;

pub struct SourcehutConvertor {
    meta: BuildsMeta,
    reader: Arc<dyn RepositoryReader>,
    rewriter: ManifestRewriter,
    cancel: CancellationToken,
}

impl SourcehutConvertor {
    pub fn new(
        meta: BuildsMeta,
        reader: Arc<dyn RepositoryReader>,
        rewriter: ManifestRewriter,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            meta,
            reader,
            rewriter,
            cancel,
        }
    }

    /// `git_ref` must be fully qualified.
    async fn build(
        &self,
        repo: &Repository,
        commit: &str,
        git_ref: &str,
        note: String,
    ) -> Result<BuildsPayload> {
        let path = self.meta.manifest_path.as_str();
        let content = self.reader.read_file(repo, commit, path, &self.cancel).await?;
        let Some(content) = content else {
            debug!("No build manifest {} in {} at {}", path, repo.full_name, commit);
            return Ok(GraphqlPayload::failed(format!(
                "{}:{} could not open manifest {:?}",
                repo.full_name, git_ref, path
            )));
        };

        let source = RepoSource {
            clone_url: &repo.clone_url,
            ssh_url: &repo.ssh_url,
            private: repo.private,
        };
        let manifest = self
            .rewriter
            .rewrite(&String::from_utf8_lossy(&content), source, commit, git_ref)?;

        let name = RefName::new(git_ref);
        let visibility = if self.meta.visibility.is_empty() {
            DEFAULT_VISIBILITY.to_string()
        } else {
            self.meta.visibility.clone()
        };

        Ok(GraphqlPayload {
            query: SUBMIT_MUTATION.to_string(),
            error: String::new(),
            variables: Some(BuildsVariables {
                manifest,
                tags: vec![
                    repo.full_name.clone(),
                    format!("{}/{}", name.ref_type(), name.short_name()),
                    path.to_string(),
                ],
                note,
                secrets: self.meta.secrets,
                execute: true,
                visibility,
            }),
        })
    }
}

#[async_trait]
impl PayloadConvertor for SourcehutConvertor {
    type Payload = BuildsPayload;

    async fn create(&self, p: &CreatePayload) -> Result<BuildsPayload> {
        let git_ref = RefName::qualified(&p.git_ref, &p.ref_type);
        let note = format!("{} {} created", p.ref_type, RefName::new(&git_ref).short_name());
        self.build(&p.repo, &p.sha, &git_ref, note).await
    }

    /// Pushes that delete a ref carry no head commit and build nothing.
    async fn push(&self, p: &PushPayload) -> Result<BuildsPayload> {
        let Some(head) = &p.head_commit else {
            return Err(WebhookError::PayloadTypeNotSupported);
        };
        self.build(&p.repo, &head.id, &p.git_ref, head.message.clone())
            .await
    }
}

/// Accepts relative slash-separated paths without `.`, `..` or empty
/// segments.
fn is_valid_manifest_path(path: &str) -> bool {
    !path.is_empty()
        && path
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

pub struct BuildsHandler {
    reader: Arc<dyn RepositoryReader>,
    rewriter: ManifestRewriter,
}

impl BuildsHandler {
    pub fn new(reader: Arc<dyn RepositoryReader>, rewriter: ManifestRewriter) -> Self {
        Self { reader, rewriter }
    }

    pub fn meta(hook: &Webhook) -> Result<BuildsMeta> {
        serde_json::from_str(&hook.meta).map_err(|source| WebhookError::InvalidMeta {
            hook_type: HookType::SourcehutBuilds,
            source,
        })
    }
}

#[async_trait]
impl Handler for BuildsHandler {
    fn hook_type(&self) -> HookType {
        HookType::SourcehutBuilds
    }

    fn metadata(&self, hook: &Webhook) -> Option<serde_json::Value> {
        match Self::meta(hook) {
            Ok(meta) => serde_json::to_value(meta).ok(),
            Err(e) => {
                error!("Failed to read metadata of builds hook {}: {}", hook.id, e);
                None
            }
        }
    }

    fn normalize_meta(&self, raw: &serde_json::Value) -> Result<String> {
        let meta: BuildsMeta =
            serde_json::from_value(raw.clone()).map_err(|source| WebhookError::InvalidMeta {
                hook_type: HookType::SourcehutBuilds,
                source,
            })?;
        if !is_valid_manifest_path(&meta.manifest_path) {
            return Err(WebhookError::MissingManifestPath(meta.manifest_path));
        }
        if !VISIBILITIES.contains(&meta.visibility.as_str()) {
            return Err(WebhookError::InvalidVisibility(meta.visibility));
        }
        Ok(serde_json::to_string(&meta)?)
    }

    async fn new_request(
        &self,
        hook: &Webhook,
        task: &HookTask,
        cancel: &CancellationToken,
    ) -> Result<PreparedRequest> {
        let convertor = SourcehutConvertor::new(
            Self::meta(hook)?,
            Arc::clone(&self.reader),
            self.rewriter.clone(),
            cancel.clone(),
        );
        let payload = convert_task(&convertor, task).await?;
        // Builds authenticates through the Authorization header only.
        new_json_request(hook, task, &payload, false)
    }
}
