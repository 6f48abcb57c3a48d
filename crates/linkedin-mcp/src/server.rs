//! MCP server loops
//!
//! Both transports share one [`ServerState`]. Requests are handled
//! concurrently; on shutdown the session manager is closed so the LinkedIn
//! session is released.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::handlers::{dispatch_raw, Outcome, ServerState};
use crate::transport::{build_router, LineReader, LineWriter};

/// Serve newline-delimited JSON-RPC until EOF or `shutdown` resolves.
///
/// On EOF in-flight requests are allowed to finish; on `shutdown` they are
/// aborted.
pub async fn serve_lines<R, W, S>(
    state: ServerState,
    reader: R,
    writer: W,
    shutdown: S,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    S: Future<Output = ()>,
{
    let mut reader = LineReader::new(reader);
    let (tx, mut rx) = mpsc::unbounded_channel::<Value>();

    let writer_task = tokio::spawn(async move {
        let mut writer = LineWriter::new(writer);
        while let Some(reply) = rx.recv().await {
            writer.write_value(&reply).await?;
        }
        Ok::<(), io::Error>(())
    });

    let mut in_flight = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            line = reader.read_message() => line,
            _ = &mut shutdown => {
                info!(pending = in_flight.len(), "Shutdown requested, aborting in-flight requests");
                in_flight.abort_all();
                break;
            }
        };

        let message = match line {
            Ok(Some(message)) => message,
            Ok(None) => {
                info!("EOF received, shutting down");
                break;
            }
            Err(e) => {
                error!(error = %e, "Error reading message");
                break;
            }
        };

        let state = state.clone();
        let tx = tx.clone();
        in_flight.spawn(async move {
            match dispatch_raw(&state, message.as_bytes()).await {
                Outcome::Reply(reply) | Outcome::ParseError(reply) => {
                    // Receiver only closes after a write failure, already logged
                    let _ = tx.send(reply);
                }
                Outcome::NoReply => {}
            }
        });

        // Reap finished requests so the set does not grow unbounded
        while in_flight.try_join_next().is_some() {}
    }

    while in_flight.join_next().await.is_some() {}
    drop(tx);

    match writer_task.await {
        Ok(result) => result,
        Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
    }
}

/// Run the stdio transport and close the session manager afterwards
pub async fn run_stdio(state: ServerState) -> io::Result<()> {
    info!("Starting LinkedIn MCP server (stdio transport)");

    let result = serve_lines(
        state.clone(),
        tokio::io::stdin(),
        tokio::io::stdout(),
        shutdown_signal(),
    )
    .await;

    state.sessions.shutdown().await;
    info!("Server shutdown complete");
    result
}

/// Run the HTTP transport and close the session manager afterwards
pub async fn run_http(state: ServerState, bind: SocketAddr, mcp_path: &str) -> io::Result<()> {
    let app = build_router(state.clone(), mcp_path);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %bind, path = mcp_path, "HTTP transport listening");

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    state.sessions.shutdown().await;
    info!("Server shutdown complete");
    result
}

/// Resolves on Ctrl-C or, on unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
