use crate::constants;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// External base URL of the forge, with a trailing slash.
    #[serde(default = "default_app_url")]
    pub app_url: String,

    #[serde(default)]
    pub repository: RepositorySettings,

    #[serde(default)]
    pub webhook: WebhookSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RepositorySettings {
    #[serde(default = "default_repo_root_path")]
    pub root_path: PathBuf,

    /// When set, CI sources always use the SSH clone URL.
    #[serde(default)]
    pub disable_http_git: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookSettings {
    #[serde(default = "default_payload_commit_limit")]
    pub payload_commit_limit: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_url: default_app_url(),
            repository: RepositorySettings::default(),
            webhook: WebhookSettings::default(),
        }
    }
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            root_path: default_repo_root_path(),
            disable_http_git: false,
        }
    }
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            payload_commit_limit: default_payload_commit_limit(),
        }
    }
}

impl Settings {
    /// Applies `APP_URL`, `REPO_ROOT_PATH`, `DISABLE_HTTP_GIT` and
    /// `PAYLOAD_COMMIT_LIMIT` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("APP_URL") {
            self.app_url = url;
        }
        if let Some(root) = lookup("REPO_ROOT_PATH") {
            self.repository.root_path = PathBuf::from(root);
        }
        if let Some(flag) = lookup("DISABLE_HTTP_GIT") {
            self.repository.disable_http_git = flag == "true" || flag == "1";
        }
        if let Some(limit) = lookup("PAYLOAD_COMMIT_LIMIT") {
            match limit.parse() {
                Ok(limit) => self.webhook.payload_commit_limit = limit,
                Err(_) => warn!("Ignoring invalid PAYLOAD_COMMIT_LIMIT: {}", limit),
            }
        }

        if !self.app_url.ends_with('/') {
            self.app_url.push('/');
        }
    }
}

fn default_app_url() -> String {
    constants::DEFAULT_APP_URL.to_string()
}

fn default_repo_root_path() -> PathBuf {
    PathBuf::from(constants::DEFAULT_REPO_ROOT_PATH)
}

fn default_payload_commit_limit() -> usize {
    constants::DEFAULT_PAYLOAD_COMMIT_LIMIT
}

pub async fn load_settings(path: &Path) -> std::io::Result<Settings> {
    if !path.exists() {
        debug!("No settings file at {}, using defaults", path.display());
        return Ok(Settings::default());
    }

    let content = tokio::fs::read_to_string(path).await?;
    let settings: Settings = toml::from_str(&content)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_empty_settings() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.app_url, "http://localhost:3000/");
        assert!(!settings.repository.disable_http_git);
        assert_eq!(settings.webhook.payload_commit_limit, 15);
    }

    #[test]
    fn test_parse_full_settings() {
        let toml_str = r#"
app_url = "https://example.forgejo.org/"

[repository]
root_path = "/srv/git"
disable_http_git = true

[webhook]
payload_commit_limit = 3
"#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.app_url, "https://example.forgejo.org/");
        assert_eq!(settings.repository.root_path, PathBuf::from("/srv/git"));
        assert!(settings.repository.disable_http_git);
        assert_eq!(settings.webhook.payload_commit_limit, 3);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("APP_URL", "https://forge.example.com"),
            ("DISABLE_HTTP_GIT", "1"),
            ("PAYLOAD_COMMIT_LIMIT", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings.apply_env_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.app_url, "https://forge.example.com/");
        assert!(settings.repository.disable_http_git);
        assert_eq!(settings.webhook.payload_commit_limit, 15);
    }

    #[tokio::test]
    async fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let settings = load_settings(&dir.path().join("missing.toml"))
            .await
            .unwrap();
        assert_eq!(settings.app_url, constants::DEFAULT_APP_URL);
    }

    #[tokio::test]
    async fn test_load_invalid_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "app_url = [").await.unwrap();

        let err = load_settings(&path).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
