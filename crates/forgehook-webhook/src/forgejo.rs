//! Forgejo and Gitea hooks receive the canonical event payload as is.

use crate::error::{Result, WebhookError};
use crate::handler::Handler;
use crate::hook::{ContentType, HookTask, HookType, Webhook};
use crate::request::{PreparedRequest, add_authorization, add_default_headers, parse_url};
use async_trait::async_trait;
use bytes::Bytes;
use forgehook_events::{encode_query, parse_query, query_escape};
use http::header::CONTENT_TYPE;
use http::{Method, Request, Uri};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct DefaultHandler {
    hook_type: HookType,
}

impl DefaultHandler {
    pub fn new(hook_type: HookType) -> Self {
        Self { hook_type }
    }
}

/// Appends `payload=<value>` to the query of `uri`, replacing an existing
/// `payload` parameter and sorting parameters by key.
fn with_payload_query(uri: &Uri, payload: &str) -> Result<Uri> {
    let mut pairs: Vec<(String, String)> = parse_query(uri.query().unwrap_or_default())
        .into_iter()
        .filter(|(k, _)| k != "payload")
        .collect();
    pairs.push(("payload".to_string(), payload.to_string()));
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    let query = encode_query(&pairs);

    let mut parts = uri.clone().into_parts();
    let path_and_query = format!("{}?{}", uri.path(), query);
    parts.path_and_query = Some(path_and_query.parse().map_err(|e: http::uri::InvalidUri| {
        WebhookError::InvalidUrl {
            url: uri.to_string(),
            reason: e.to_string(),
        }
    })?);
    Uri::from_parts(parts).map_err(|e| WebhookError::InvalidUrl {
        url: uri.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl Handler for DefaultHandler {
    fn hook_type(&self) -> HookType {
        self.hook_type
    }

    fn metadata(&self, _hook: &Webhook) -> Option<serde_json::Value> {
        None
    }

    /// These hooks carry no provider settings.
    fn normalize_meta(&self, _raw: &serde_json::Value) -> Result<String> {
        Ok(String::new())
    }

    async fn new_request(
        &self,
        hook: &Webhook,
        task: &HookTask,
        _cancel: &CancellationToken,
    ) -> Result<PreparedRequest> {
        let uri = parse_url(&hook.url)?;
        let payload = task.payload_content.as_str();

        let mut request = match hook.http_method.as_str() {
            "" | "POST" => {
                if hook.http_method.is_empty() {
                    info!(
                        "HTTP method for {} hook {} is not set, defaulting to POST",
                        self.hook_type, hook.id
                    );
                }
                let body = match hook.content_type {
                    ContentType::Json => Bytes::copy_from_slice(payload.as_bytes()),
                    ContentType::Form => Bytes::from(format!("payload={}", query_escape(payload))),
                };
                Request::builder()
                    .method(Method::POST)
                    .uri(uri)
                    .header(CONTENT_TYPE, hook.content_type.mime())
                    .body(body)?
            }
            "GET" => Request::builder()
                .method(Method::GET)
                .uri(with_payload_query(&uri, payload)?)
                .body(Bytes::new())?,
            other => return Err(WebhookError::InvalidMethod(other.to_string())),
        };

        // The signature always covers the raw payload, whatever the encoding.
        let signed = Bytes::copy_from_slice(payload.as_bytes());
        add_default_headers(request.headers_mut(), &hook.secret, task, &signed)?;
        add_authorization(request.headers_mut(), hook)?;
        Ok((request, signed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::sign;
    use forgehook_events::HookEventType;

    const PAYLOAD: &str = "{\n  \"ref\": \"refs/heads/main\"\n}";

    fn hook(method: &str, content_type: ContentType) -> Webhook {
        Webhook {
            id: 9,
            hook_type: HookType::Forgejo,
            url: "https://ci.example.org/hook?token=a%2Bb&payload=old".to_string(),
            http_method: method.to_string(),
            content_type,
            secret: "s3cret".to_string(),
            is_active: true,
            ..Default::default()
        }
    }

    fn task() -> HookTask {
        HookTask::new(9, HookEventType::Push, PAYLOAD.to_string())
    }

    async fn request(hook: &Webhook) -> Result<PreparedRequest> {
        DefaultHandler::new(HookType::Forgejo)
            .new_request(hook, &task(), &CancellationToken::new())
            .await
    }

    #[tokio::test]
    async fn test_post_json_sends_payload_untouched() {
        let (req, body) = request(&hook("", ContentType::Json)).await.unwrap();
        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(req.body(), PAYLOAD.as_bytes());
        assert_eq!(body, PAYLOAD.as_bytes());
        assert_eq!(
            req.headers()["X-Forgejo-Signature"],
            sign("s3cret", PAYLOAD.as_bytes()).as_str()
        );
        assert_eq!(req.headers()["X-GitHub-Event"], "push");
    }

    #[tokio::test]
    async fn test_post_form_wraps_payload() {
        let (req, body) = request(&hook("POST", ContentType::Form)).await.unwrap();
        assert_eq!(req.headers()[CONTENT_TYPE], "application/x-www-form-urlencoded");
        assert_eq!(
            req.body(),
            format!("payload={}", query_escape(PAYLOAD)).as_bytes()
        );
        assert_eq!(body, PAYLOAD.as_bytes());
    }

    #[tokio::test]
    async fn test_get_puts_payload_in_query() {
        let (req, _) = request(&hook("GET", ContentType::Json)).await.unwrap();
        assert_eq!(req.method(), Method::GET);
        assert!(req.body().is_empty());
        assert_eq!(
            req.uri().query().unwrap(),
            format!("payload={}&token=a%2Bb", query_escape(PAYLOAD))
        );
        let pairs = parse_query(req.uri().query().unwrap());
        assert_eq!(pairs[0], ("payload".to_string(), PAYLOAD.to_string()));
        assert_eq!(pairs[1], ("token".to_string(), "a+b".to_string()));
    }

    #[tokio::test]
    async fn test_other_methods_are_rejected() {
        let err = request(&hook("PUT", ContentType::Json)).await.unwrap_err();
        assert!(matches!(err, WebhookError::InvalidMethod(ref m) if m == "PUT"));
        assert!(err.is_config_error());
    }
}
