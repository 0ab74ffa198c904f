//! # Emoji Art CLI
//!
//! Edit an Emoji Art document from the command line.

use clap::Parser;
use emoji_art_cli::{CliArgs, CliConfig, Session};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,emoji_art_core=debug"));

    // stdout carries the JSON summary
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    // Use JSON format for log collectors (RUST_LOG_FORMAT=json)
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let command = args.command.clone();
    let config = CliConfig::from(args);
    tracing::debug!("Document location: {}", config.location);

    let mut session = Session::open(config)?;
    let output = session.execute(&command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    if command.modifies_document() {
        session.save()?;
    }
    Ok(())
}
