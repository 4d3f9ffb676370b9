mod commands;

use clap::Parser;
use commands::Cli;
use forgehook_config::load_settings;
use forgehook_webhook::{Dispatcher, GitCliReader, HandlerRegistry};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let cli = Cli::parse();

    let mut settings = load_settings(&cli.config).await?;
    settings.apply_env();

    let reader = Arc::new(GitCliReader::new(&settings.repository.root_path));
    tracing::info!("Using repositories under {}", reader.root().display());
    let dispatcher = Dispatcher::new(HandlerRegistry::with_defaults(&settings, reader));

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            signal_cancel.cancel();
        }
    });

    let output = cli.command.run(&dispatcher, &cancel).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
