//! SharePoint Bridge
//!
//! Entry point for the bridge binary.
//! Serves count / retrieve / search over stdio using JSON-RPC 2.0.

use anyhow::Context;
use futures::StreamExt;
use sharepoint_bridge::config::Config;
use sharepoint_bridge::rpc::{BridgeServer, RpcResponse};
use sharepoint_bridge::{BridgeAdapter, SharepointAdapter};
use tokio::io::{AsyncWriteExt, Stdout};
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr, stdout carries the protocol
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting SharePoint Bridge...");

    let config = Config::load_default().context("failed to load configuration")?;
    let runtime_config = config.to_runtime().context("invalid configuration")?;

    tracing::info!(
        "Configured for {} as {} (timeout {:?}, {:?} field lookup)",
        runtime_config.server_url,
        runtime_config.credentials.username(),
        runtime_config.timeout,
        runtime_config.field_lookup
    );

    let adapter = SharepointAdapter::new(runtime_config).context("failed to create adapter")?;
    let server = BridgeServer::new(adapter);

    tracing::info!("{} ready, listening on stdio...", server.adapter().name());

    run_stdio_loop(server).await
}

async fn run_stdio_loop<A: BridgeAdapter>(server: BridgeServer<A>) -> anyhow::Result<()> {
    let mut lines = FramedRead::new(tokio::io::stdin(), LinesCodec::new());
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next().await {
        let line = line.context("failed to read from stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        tracing::debug!("Received: {}", line);

        let response = server.handle_line(&line).await;
        send_response(&mut stdout, &response).await?;
    }

    Ok(())
}

async fn send_response(stdout: &mut Stdout, response: &RpcResponse) -> anyhow::Result<()> {
    let mut json = serde_json::to_string(response)?;
    tracing::debug!("Sending: {}", json);
    json.push('\n');
    stdout.write_all(json.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}
