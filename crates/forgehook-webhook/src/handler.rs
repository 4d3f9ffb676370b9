use crate::api::ApiHook;
use crate::error::{Result, WebhookError};
use crate::forgejo::DefaultHandler;
use crate::hook::{HookTask, HookType, Webhook};
use crate::request::PreparedRequest;
use crate::slack::SlackHandler;
use crate::sourcehut::BuildsHandler;
use crate::storage::RepositoryReader;
use async_trait::async_trait;
use forgehook_config::Settings;
use forgehook_config::constants::BUILD_SUBMITTER;
use forgehook_manifest::ManifestRewriter;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One provider's delivery logic.
#[async_trait]
pub trait Handler: Send + Sync {
    fn hook_type(&self) -> HookType;

    /// Provider settings decoded from `hook.meta`, for display.
    fn metadata(&self, hook: &Webhook) -> Option<serde_json::Value>;

    /// Extra `config` entries shown next to `url` and `content_type`.
    fn config_entries(&self, _hook: &Webhook) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Validates provider settings submitted by a settings form and returns
    /// the meta document to store.
    fn normalize_meta(&self, raw: &serde_json::Value) -> Result<String>;

    async fn new_request(
        &self,
        hook: &Webhook,
        task: &HookTask,
        cancel: &CancellationToken,
    ) -> Result<PreparedRequest>;
}

#[derive(Default)]
pub struct RegistryBuilder {
    handlers: HashMap<HookType, Arc<dyn Handler>>,
}

impl RegistryBuilder {
    /// Registers `handler` for its hook type, replacing any earlier one.
    pub fn register<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.handlers.insert(handler.hook_type(), Arc::new(handler));
        self
    }

    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            handlers: Arc::new(self.handlers),
        }
    }
}

/// Immutable map from hook type to handler.
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: Arc<HashMap<HookType, Arc<dyn Handler>>>,
}

impl HandlerRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Every built-in provider, configured from `settings`.
    pub fn with_defaults(settings: &Settings, reader: Arc<dyn RepositoryReader>) -> Self {
        let rewriter = ManifestRewriter::new(BUILD_SUBMITTER, settings.app_url.as_str())
            .with_ssh_preferred(settings.repository.disable_http_git);

        Self::builder()
            .register(DefaultHandler::new(HookType::Forgejo))
            .register(DefaultHandler::new(HookType::Gitea))
            .register(SlackHandler::new(settings.webhook.payload_commit_limit))
            .register(BuildsHandler::new(reader, rewriter))
            .build()
    }

    pub fn get(&self, hook_type: HookType) -> Result<&Arc<dyn Handler>> {
        self.handlers
            .get(&hook_type)
            .ok_or(WebhookError::UnknownHookType(hook_type))
    }

    pub fn hook_types(&self) -> Vec<HookType> {
        let mut types: Vec<HookType> = self.handlers.keys().copied().collect();
        types.sort();
        types
    }

    /// API representation of `hook`, whose settings page lives under
    /// `repo_link`.
    pub fn to_hook(&self, repo_link: &str, hook: &Webhook) -> Result<ApiHook> {
        let handler = self.get(hook.hook_type)?;

        let mut config = BTreeMap::new();
        config.insert("url".to_string(), hook.url.clone());
        config.insert("content_type".to_string(), hook.content_type.name().to_string());
        for (key, value) in handler.config_entries(hook) {
            config.insert(key.to_string(), value);
        }

        Ok(ApiHook {
            id: hook.id,
            hook_type: hook.hook_type.to_string(),
            url: hook.url.clone(),
            config,
            events: hook.events_array(),
            authorization_header: hook.authorization_header.clone().unwrap_or_default(),
            content_type: hook.content_type.name().to_string(),
            metadata: handler.metadata(hook),
            active: hook.is_active,
            branch_filter: hook.hook_event.branch_filter.clone(),
            settings_url: format!("{}/settings/hooks/{}", repo_link, hook.id),
            created_at: hook.created_at,
            updated_at: hook.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryReader;

    fn registry() -> HandlerRegistry {
        HandlerRegistry::with_defaults(&Settings::default(), Arc::new(MemoryReader::new()))
    }

    #[test]
    fn test_defaults_cover_every_hook_type() {
        assert_eq!(
            registry().hook_types(),
            vec![
                HookType::Forgejo,
                HookType::Gitea,
                HookType::Slack,
                HookType::SourcehutBuilds
            ]
        );
    }

    #[test]
    fn test_unknown_hook_type() {
        let registry = HandlerRegistry::builder()
            .register(DefaultHandler::new(HookType::Gitea))
            .build();
        assert!(registry.get(HookType::Gitea).is_ok());
        assert!(matches!(
            registry.get(HookType::Slack),
            Err(WebhookError::UnknownHookType(HookType::Slack))
        ));
    }

    #[test]
    fn test_to_hook_for_forgejo() {
        let hook = Webhook {
            id: 5,
            hook_type: HookType::Forgejo,
            url: "https://ci.example.org/".to_string(),
            authorization_header: Some("Bearer abc".to_string()),
            is_active: true,
            ..Default::default()
        };
        let api = registry().to_hook("/owner/repo", &hook).unwrap();

        assert_eq!(api.hook_type, "forgejo");
        assert_eq!(api.config.len(), 2);
        assert_eq!(api.config["content_type"], "json");
        assert_eq!(api.authorization_header, "Bearer abc");
        assert_eq!(api.metadata, None);
        assert_eq!(api.settings_url, "/owner/repo/settings/hooks/5");
        assert!(api.events.is_empty());
    }
}
