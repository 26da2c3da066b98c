use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use marquee_api::MarqueeAPI;
use marquee_infra::EnvironmentService;
use marquee_main::{Cli, UI};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so that stdout carries only answers.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cwd = std::env::current_dir()?;
    let environment = cli.apply(EnvironmentService::new(cwd).get()?);
    if let Some(env_file) = &environment.env_file {
        tracing::debug!(path = %env_file.display(), "Loaded .env file");
    }

    let api = Arc::new(MarqueeAPI::init(environment).await?);
    let mut ui = UI::new(cli, api);
    ui.run().await
}
