//! Bastion Defense - Segment Verification Server
//!
//! Usage: `sim_server [config.ron]`. Requests are JSON lines on stdin,
//! replies are JSON lines on stdout.

use sim_server::{Dispatcher, Response, ServerConfig, VerificationService};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> sim_server::Result<()> {
    // Logs to stderr; stdout carries the protocol
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::load(&path)?,
        None => ServerConfig::default(),
    };
    tracing::info!(
        workers = config.workers,
        audit_ticks = config.audit_ticks_per_segment,
        "Starting Bastion Defense verification server"
    );
    let service = VerificationService::new(&config)?;

    let (tx, mut rx) = mpsc::unbounded_channel::<Response>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(response) = rx.recv().await {
            let mut line = response.to_line();
            line.push('\n');
            stdout.write_all(line.as_bytes()).await?;
            stdout.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    if let Err(e) = tx.send(VerificationService::ready()) {
        tracing::warn!(reply = ?e.0, "Greeting dropped, output closed");
    }

    let mut dispatcher = Dispatcher::new(service.clone(), tx.clone());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        dispatcher.dispatch_line(&line);
    }
    dispatcher.shutdown().await;

    drop(tx);
    writer
        .await
        .map_err(|e| sim_server::ServerError::WorkerFailed(e.to_string()))??;

    tracing::info!(sessions = service.store().len(), "Input closed, shutting down");
    Ok(())
}
