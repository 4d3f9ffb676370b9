use anyhow::Context;
use clap::{Parser, Subcommand};
use forgehook_config::constants::DEFAULT_CONFIG_PATH;
use forgehook_events::{Event, HookEventType};
use forgehook_webhook::{Delivery, Dispatcher, HookTask, Webhook};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Prepares outbound webhook deliveries without sending them.
#[derive(Parser, Debug)]
#[command(name = "forgehook", long_about = None)]
pub struct Cli {
    /// Settings file
    #[arg(long, env = "FORGEHOOK_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Print the request one task would be delivered with.
    Prepare {
        /// Hook record as JSON
        hook: PathBuf,
        /// Task record as JSON
        task: PathBuf,
    },
    /// Print the tasks an event creates for a set of hooks.
    Enqueue {
        /// JSON array of hook records
        hooks: PathBuf,
        /// Event type name, e.g. `push` or `issue_label`
        event_type: HookEventType,
        /// Event payload as JSON
        payload: PathBuf,
    },
    /// Print the API form of a hook.
    ToHook {
        /// Web URL of the repository that owns the hook
        repo_link: String,
        /// Hook record as JSON
        hook: PathBuf,
    },
}

impl Command {
    pub async fn run(&self, dispatcher: &Dispatcher, cancel: &CancellationToken) -> anyhow::Result<Value> {
        match self {
            Command::Prepare { hook, task } => {
                let hook: Webhook = read_json(hook).await?;
                let task: HookTask = read_json(task).await?;
                let delivery = dispatcher.prepare(&hook, &task, cancel).await?;
                Ok(describe(&delivery))
            }
            Command::Enqueue {
                hooks,
                event_type,
                payload,
            } => {
                let hooks: Vec<Webhook> = read_json(hooks).await?;
                let data = tokio::fs::read(payload)
                    .await
                    .with_context(|| format!("failed to read {}", payload.display()))?;
                let event = Event::decode(*event_type, &data)?;
                let tasks = dispatcher.enqueue(&hooks, *event_type, &event)?;
                Ok(serde_json::to_value(tasks)?)
            }
            Command::ToHook { repo_link, hook } => {
                let hook: Webhook = read_json(hook).await?;
                let api = dispatcher.registry().to_hook(repo_link, &hook)?;
                Ok(serde_json::to_value(api)?)
            }
        }
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("failed to parse {}", path.display()))
}

fn describe(delivery: &Delivery) -> Value {
    let Delivery::Send { request, body } = delivery else {
        return json!({ "status": "skip" });
    };

    let headers: BTreeMap<&str, &str> = request
        .headers()
        .iter()
        .map(|(name, value)| {
            let value = if value.is_sensitive() {
                "<redacted>"
            } else {
                value.to_str().unwrap_or("<binary>")
            };
            (name.as_str(), value)
        })
        .collect();

    json!({
        "status": "send",
        "method": request.method().as_str(),
        "url": request.uri().to_string(),
        "headers": headers,
        "body": String::from_utf8_lossy(body),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgehook_config::Settings;
    use forgehook_webhook::{HandlerRegistry, HookType, MemoryReader};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("forgehook").chain(args.iter().copied()))
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(HandlerRegistry::with_defaults(
            &Settings::default(),
            Arc::new(MemoryReader::new()),
        ))
    }

    #[test]
    fn test_parse_commands() {
        let cli = parse(&["prepare", "h.json", "t.json"]).unwrap();
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(
            cli.command,
            Command::Prepare {
                hook: PathBuf::from("h.json"),
                task: PathBuf::from("t.json"),
            }
        );
        assert_eq!(
            parse(&["--config", "x.toml", "enqueue", "hooks.json", "issue_label", "p.json"])
                .unwrap()
                .command,
            Command::Enqueue {
                hooks: PathBuf::from("hooks.json"),
                event_type: HookEventType::IssueLabel,
                payload: PathBuf::from("p.json"),
            }
        );
        assert_eq!(
            parse(&["to-hook", "http://x/r", "h.json"]).unwrap().command,
            Command::ToHook {
                repo_link: "http://x/r".to_string(),
                hook: PathBuf::from("h.json"),
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["prepare", "only-one"]).is_err());
        assert!(parse(&["enqueue", "h.json", "star", "p.json"]).is_err());
    }

    #[tokio::test]
    async fn test_enqueue_then_prepare() {
        let dir = TempDir::new().unwrap();
        let hook = Webhook {
            id: 7,
            hook_type: HookType::Gitea,
            url: "https://ci.example.org/hook".to_string(),
            authorization_header: Some("token abc".to_string()),
            is_active: true,
            hook_event: forgehook_webhook::HookEvent {
                push_only: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let hooks_path = dir.path().join("hooks.json");
        std::fs::write(&hooks_path, serde_json::to_vec(&vec![hook.clone()]).unwrap()).unwrap();
        let payload_path = dir.path().join("push.json");
        std::fs::write(&payload_path, r#"{"ref": "refs/heads/main"}"#).unwrap();

        let enqueue = Command::Enqueue {
            hooks: hooks_path,
            event_type: HookEventType::Push,
            payload: payload_path,
        };
        let tasks = enqueue.run(&dispatcher(), &CancellationToken::new()).await.unwrap();
        let tasks: Vec<HookTask> = serde_json::from_value(tasks).unwrap();
        assert_eq!(tasks.len(), 1);

        let hook_path = dir.path().join("hook.json");
        std::fs::write(&hook_path, serde_json::to_vec(&hook).unwrap()).unwrap();
        let task_path = dir.path().join("task.json");
        std::fs::write(&task_path, serde_json::to_vec(&tasks[0]).unwrap()).unwrap();

        let prepare = Command::Prepare {
            hook: hook_path,
            task: task_path,
        };
        let out = prepare.run(&dispatcher(), &CancellationToken::new()).await.unwrap();
        assert_eq!(out["status"], "send");
        assert_eq!(out["method"], "POST");
        assert_eq!(out["url"], "https://ci.example.org/hook");
        assert_eq!(out["headers"]["authorization"], "<redacted>");
        assert_eq!(out["headers"]["x-gitea-event"], "push");
        assert_eq!(out["body"], tasks[0].payload_content.as_str());
    }
}
