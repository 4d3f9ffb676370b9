use crate::hook::{ContentType, HookType};
use crate::storage::StorageError;
use forgehook_events::EventError;
use forgehook_manifest::ManifestError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("payload type not supported")]
    PayloadTypeNotSupported,

    #[error("invalid {hook_type} hook metadata: {source}")]
    InvalidMeta {
        hook_type: HookType,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid hook url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid http method: {0}")]
    InvalidMethod(String),

    #[error("invalid content type {content_type} for {hook_type} hooks")]
    InvalidContentType {
        hook_type: HookType,
        content_type: ContentType,
    },

    #[error("invalid value for header {0}")]
    InvalidHeader(&'static str),

    #[error("invalid slack channel name: {0:?}")]
    InvalidSlackChannel(String),

    #[error("builds manifest path is invalid: {0:?}")]
    MissingManifestPath(String),

    #[error("invalid builds visibility: {0:?}")]
    InvalidVisibility(String),

    #[error("no handler registered for {0} hooks")]
    UnknownHookType(HookType),

    #[error("request preparation cancelled")]
    Cancelled,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error("manifest could not be rewritten: {0}")]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Request(#[from] http::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl WebhookError {
    /// Whether the error comes from the hook's own settings rather than the
    /// event being delivered.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            WebhookError::InvalidMeta { .. }
                | WebhookError::InvalidUrl { .. }
                | WebhookError::InvalidMethod(_)
                | WebhookError::InvalidContentType { .. }
                | WebhookError::InvalidHeader(_)
                | WebhookError::InvalidSlackChannel(_)
                | WebhookError::MissingManifestPath(_)
                | WebhookError::InvalidVisibility(_)
                | WebhookError::UnknownHookType(_)
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            WebhookError::Cancelled | WebhookError::Storage(StorageError::Cancelled)
        )
    }
}

pub type Result<T> = std::result::Result<T, WebhookError>;
