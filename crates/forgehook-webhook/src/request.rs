//! Outbound request construction shared by every provider.

use crate::error::{Result, WebhookError};
use crate::hook::{HookTask, Webhook};
use crate::signature::{sign, sign_sha1};
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Uri};
use serde::Serialize;

/// A ready request plus the exact bytes that were signed.
pub type PreparedRequest = (Request<Bytes>, Bytes);

const DELIVERY_HEADERS: [&str; 4] = [
    "X-Forgejo-Delivery",
    "X-Gitea-Delivery",
    "X-Gogs-Delivery",
    "X-GitHub-Delivery",
];
const EVENT_HEADERS: [&str; 4] = [
    "X-Forgejo-Event",
    "X-Gitea-Event",
    "X-Gogs-Event",
    "X-GitHub-Event",
];
const EVENT_TYPE_HEADERS: [&str; 4] = [
    "X-Forgejo-Event-Type",
    "X-Gitea-Event-Type",
    "X-Gogs-Event-Type",
    "X-GitHub-Event-Type",
];
const SIGNATURE_HEADERS: [&str; 3] = [
    "X-Forgejo-Signature",
    "X-Gitea-Signature",
    "X-Gogs-Signature",
];
const HUB_SIGNATURE_HEADER: &str = "X-Hub-Signature";
const HUB_SIGNATURE_256_HEADER: &str = "X-Hub-Signature-256";

/// Serializes `payload` as indented JSON and wraps it in a request to the
/// hook URL. Providers that authenticate with the `Authorization` header
/// alone pass `with_default_headers = false`.
pub fn new_json_request<P: Serialize>(
    hook: &Webhook,
    task: &HookTask,
    payload: &P,
    with_default_headers: bool,
) -> Result<PreparedRequest> {
    let body = Bytes::from(serde_json::to_vec_pretty(payload)?);

    let mut request = Request::builder()
        .method(method_or_post(&hook.http_method)?)
        .uri(parse_url(&hook.url)?)
        .header(CONTENT_TYPE, "application/json")
        .body(body.clone())?;

    if with_default_headers {
        add_default_headers(request.headers_mut(), &hook.secret, task, &body)?;
    }
    add_authorization(request.headers_mut(), hook)?;

    Ok((request, body))
}

/// Delivery, event and signature headers under every forge's prefix.
pub fn add_default_headers(
    headers: &mut HeaderMap,
    secret: &str,
    task: &HookTask,
    body: &[u8],
) -> Result<()> {
    let signature = sign(secret, body);
    let delivery = task.uuid.to_string();

    for name in DELIVERY_HEADERS {
        set_header(headers, name, &delivery)?;
    }
    for name in EVENT_HEADERS {
        set_header(headers, name, task.event_type.event())?;
    }
    for name in EVENT_TYPE_HEADERS {
        set_header(headers, name, task.event_type.as_str())?;
    }
    for name in SIGNATURE_HEADERS {
        set_header(headers, name, &signature)?;
    }
    set_header(
        headers,
        HUB_SIGNATURE_HEADER,
        &format!("sha1={}", sign_sha1(secret, body)),
    )?;
    set_header(headers, HUB_SIGNATURE_256_HEADER, &format!("sha256={signature}"))
}

pub fn add_authorization(headers: &mut HeaderMap, hook: &Webhook) -> Result<()> {
    let Some(authorization) = hook.authorization_header.as_deref() else {
        return Ok(());
    };
    if authorization.is_empty() {
        return Ok(());
    }
    let mut value =
        HeaderValue::from_str(authorization).map_err(|_| WebhookError::InvalidHeader("Authorization"))?;
    value.set_sensitive(true);
    headers.insert(AUTHORIZATION, value);
    Ok(())
}

fn set_header(headers: &mut HeaderMap, name: &'static str, value: &str) -> Result<()> {
    let header = HeaderName::from_bytes(name.as_bytes()).map_err(|_| WebhookError::InvalidHeader(name))?;
    let value = HeaderValue::from_str(value).map_err(|_| WebhookError::InvalidHeader(name))?;
    headers.insert(header, value);
    Ok(())
}

/// An unset method means POST.
pub(crate) fn method_or_post(method: &str) -> Result<Method> {
    if method.is_empty() {
        return Ok(Method::POST);
    }
    Method::from_bytes(method.as_bytes()).map_err(|_| WebhookError::InvalidMethod(method.to_string()))
}

/// Absolute http(s) URL of a hook.
pub(crate) fn parse_url(url: &str) -> Result<Uri> {
    let invalid = |reason: &str| WebhookError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let uri: Uri = url.parse().map_err(|e: http::uri::InvalidUri| invalid(&e.to_string()))?;
    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        Some(_) => return Err(invalid("scheme must be http or https")),
        None => return Err(invalid("url must be absolute")),
    }
    if uri.host().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(uri)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::verify_hub_signature;
    use forgehook_events::HookEventType;
    use serde_json::json;

    fn hook(url: &str) -> Webhook {
        Webhook {
            id: 1,
            url: url.to_string(),
            is_active: true,
            ..Default::default()
        }
    }

    fn task() -> HookTask {
        HookTask::new(1, HookEventType::IssueLabel, "{}".to_string())
    }

    #[test]
    fn test_defaults_to_post_json() {
        let (request, body) =
            new_json_request(&hook("https://slack.example.com/"), &task(), &json!({"a": 1}), true).unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.uri().to_string(), "https://slack.example.com/");
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(request.headers()["X-Hub-Signature-256"], "sha256=");
        assert_eq!(request.headers()["X-Forgejo-Signature"], "");
        assert_eq!(body, Bytes::from_static(b"{\n  \"a\": 1\n}"));
        assert_eq!(request.body(), &body);
    }

    #[test]
    fn test_default_headers_describe_the_task() {
        let mut hook = hook("https://example.org/hook");
        hook.secret = "s3cret".to_string();
        let task = task();

        let (request, body) = new_json_request(&hook, &task, &json!({}), true).unwrap();
        let headers = request.headers();
        let delivery = task.uuid.to_string();

        for prefix in ["X-Forgejo", "X-Gitea", "X-Gogs", "X-GitHub"] {
            assert_eq!(headers[format!("{prefix}-Delivery").as_str()], delivery.as_str());
            assert_eq!(headers[format!("{prefix}-Event").as_str()], "issues");
            assert_eq!(headers[format!("{prefix}-Event-Type").as_str()], "issue_label");
        }
        assert_eq!(headers["X-Gitea-Signature"], sign("s3cret", &body).as_str());
        let hub = headers["X-Hub-Signature-256"].to_str().unwrap();
        assert!(verify_hub_signature("s3cret", &body, hub));
        let legacy = headers["X-Hub-Signature"].to_str().unwrap();
        assert_eq!(legacy, format!("sha1={}", sign_sha1("s3cret", &body)));
        assert!(verify_hub_signature("s3cret", &body, legacy));
    }

    #[test]
    fn test_without_default_headers() {
        let mut hook = hook("https://builds.example.org/query");
        hook.authorization_header = Some("Bearer token".to_string());

        let (request, _) = new_json_request(&hook, &task(), &json!({}), false).unwrap();
        assert!(request.headers().get("X-Forgejo-Delivery").is_none());
        assert!(request.headers().get("X-Hub-Signature-256").is_none());
        assert!(request.headers().get("X-Hub-Signature").is_none());
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer token");
        assert!(request.headers()[AUTHORIZATION].is_sensitive());
    }

    #[test]
    fn test_custom_method() {
        let mut hook = hook("https://example.org/");
        hook.http_method = "PUT".to_string();
        let (request, _) = new_json_request(&hook, &task(), &json!({}), true).unwrap();
        assert_eq!(request.method(), Method::PUT);

        hook.http_method = "NOT A METHOD".to_string();
        let err = new_json_request(&hook, &task(), &json!({}), true).unwrap_err();
        assert!(matches!(err, WebhookError::InvalidMethod(_)));
    }

    #[test]
    fn test_invalid_urls() {
        for url in ["", "not a url", "/relative/path", "ftp://example.org/"] {
            let err = new_json_request(&hook(url), &task(), &json!({}), true).unwrap_err();
            assert!(matches!(err, WebhookError::InvalidUrl { .. }), "{url:?}");
            assert!(err.is_config_error());
        }
    }

    #[test]
    fn test_invalid_authorization_header() {
        let mut hook = hook("https://example.org/");
        hook.authorization_header = Some("Bearer\nsplit".to_string());
        let err = new_json_request(&hook, &task(), &json!({}), false).unwrap_err();
        assert!(matches!(err, WebhookError::InvalidHeader("Authorization")));
    }
}
