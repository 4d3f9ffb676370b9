use crate::HookEventType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventError {
    #[error("unknown hook event type: {0}")]
    UnknownEventType(String),

    #[error("{event_type} payload could not be decoded: {source}")]
    Decode {
        event_type: HookEventType,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EventError>;
