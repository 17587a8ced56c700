mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command, ProbeArgs};
use sni_probe::{Engine, Handler};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { listen, probe } => {
            let handler = build_handler(probe)?;
            let listener = TcpListener::bind(listen)
                .await
                .with_context(|| format!("cannot listen on {listen}"))?;
            sni_probe::server::serve(listener, handler, async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Probe { target, probe } => {
            let path = cli::target_path(&target)?;
            let handler = build_handler(probe)?;
            let reply = handler.handle(&path).await;
            println!("{}", reply.body.trim_end());
            Ok(if reply.status == 200 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn build_handler(probe: ProbeArgs) -> anyhow::Result<Handler> {
    let cfg = probe.into_config()?;
    let engine = Arc::new(Engine::new(cfg).context("failed to initialise TLS backend")?);
    let max_body_chars = engine.config().max_body_chars;
    Ok(Handler::new(engine, max_body_chars))
}
