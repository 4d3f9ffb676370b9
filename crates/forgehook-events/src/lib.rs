mod error;
mod escape;
mod event;
mod event_type;
mod payloads;
mod refs;
mod structs;

pub use error::{EventError, Result};
pub use escape::{
    encode_query, parse_query, path_escape, path_escape_segments, query_escape, query_unescape,
};
pub use event::Event;
pub use event_type::{HookEventType, ReviewKind};
pub use payloads::*;
pub use refs::{RefName, RefType};
pub use structs::*;
