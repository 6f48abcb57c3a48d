//! LinkedIn MCP Server
//!
//! A Model Context Protocol server that gives AI agents access to LinkedIn
//! profile, company and job data.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use linkedin_core::refresh::DEFAULT_OAUTH_BASE;
use linkedin_core::{
    CredentialResolver, CredentialStore, FileStore, OAuthRefresher, SessionManager, TtyPrompt,
    VoyagerBackend,
};
use linkedin_mcp::config::LogFormat;
use linkedin_mcp::{run_http, run_stdio, Args, ServerConfig, ServerState, Transport};

fn init_logging(config: &ServerConfig) -> anyhow::Result<()> {
    // Logs go to stderr; stdout is reserved for the stdio transport
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str().to_ascii_lowercase()));

    let text = (config.log_format == LogFormat::Text)
        .then(|| fmt::layer().with_writer(std::io::stderr).with_ansi(false));
    let json = (config.log_format == LogFormat::Json)
        .then(|| fmt::layer().json().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .try_init()
        .context("failed to install log subscriber")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = ServerConfig::from_args(args).context("invalid configuration")?;
    init_logging(&config)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = config.transport.as_str(),
        non_interactive = config.non_interactive,
        policy = ?config.init_policy,
        "LinkedIn MCP Server starting"
    );

    let store: Arc<dyn CredentialStore> = Arc::new(FileStore::new(config.credential_file.clone()));
    let mut resolver = CredentialResolver::new(config.sources.clone(), store)
        .non_interactive(config.non_interactive);
    if !config.non_interactive {
        resolver = resolver.with_interactive(Arc::new(TtyPrompt));
    }
    if let Some(client) = &config.oauth_client {
        info!(client_id = %client.client_id, "OAuth refresh enabled");
        let refresher = OAuthRefresher::new(
            DEFAULT_OAUTH_BASE,
            client.client_id.clone(),
            client.client_secret.clone(),
        )?;
        resolver = resolver.with_refresher(Arc::new(refresher));
    }

    let backend = VoyagerBackend::new(&config.api_base, config.request_timeout)
        .context("invalid LinkedIn base URL")?;
    let sessions = Arc::new(
        SessionManager::new(Arc::new(backend), Arc::new(resolver))
            .with_init_timeout(config.request_timeout),
    );

    sessions
        .start(config.init_policy)
        .await
        .context("LinkedIn credential is not configured")?;

    let state = ServerState::new(sessions, config.transport.as_str())
        .with_request_timeout(config.request_timeout);

    match config.transport {
        Transport::Stdio => run_stdio(state).await?,
        Transport::StreamableHttp => run_http(state, config.bind, &config.mcp_path).await?,
    }

    Ok(())
}
