pub mod config;
pub mod constants;

pub use config::{RepositorySettings, Settings, WebhookSettings, load_settings};
