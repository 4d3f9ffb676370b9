mod api;
mod convertor;
mod dispatch;
mod error;
mod forgejo;
mod handler;
mod hook;
mod request;
pub mod signature;
pub mod slack;
pub mod sourcehut;
mod storage;
pub mod text;

pub use api::ApiHook;
pub use convertor::{PayloadConvertor, convert, convert_task};
pub use dispatch::{Delivery, DispatchError, Dispatcher};
pub use error::{Result, WebhookError};
pub use forgejo::DefaultHandler;
pub use handler::{Handler, HandlerRegistry, RegistryBuilder};
pub use hook::{
    ContentType, HookEvent, HookEvents, HookScope, HookTask, HookType, PAYLOAD_VERSION, Webhook,
};
pub use request::{PreparedRequest, add_authorization, add_default_headers, new_json_request};
pub use storage::{GitCliReader, MemoryReader, RepositoryReader, StorageError};
