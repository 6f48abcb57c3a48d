//! Command line and environment configuration
//!
//! Every option can be given as a flag or through the environment, so hosted
//! deployments are configured without a command line.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, ValueEnum};
use linkedin_core::{CredentialSources, FileStore, InitPolicy, RawCredential};
use thiserror::Error;
use tracing::Level;

use crate::transport::http::HEALTH_PATH;

/// Environment variables consulted for the environment credential source
pub const ENV_COOKIE: &str = "LINKEDIN_COOKIE";
pub const ENV_ACCESS_TOKEN: &str = "LINKEDIN_ACCESS_TOKEN";
pub const ENV_REFRESH_TOKEN: &str = "LINKEDIN_REFRESH_TOKEN";
pub const ENV_TOKEN_EXPIRES_IN: &str = "LINKEDIN_TOKEN_EXPIRES_IN";
pub const ENV_CLIENT_ID: &str = "LINKEDIN_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "LINKEDIN_CLIENT_SECRET";

/// LinkedIn MCP Server - profile, company and job data for AI agents
#[derive(Parser, Clone)]
#[command(name = "linkedin-mcp")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// LinkedIn `li_at` session cookie (highest priority credential)
    #[arg(long)]
    pub cookie: Option<String>,

    /// LinkedIn OAuth access token, used when no cookie is given
    #[arg(long)]
    pub access_token: Option<String>,

    /// Never prompt for a credential; a missing one is a configuration error
    #[arg(
        long,
        env = "LINKEDIN_MCP_NON_INTERACTIVE",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub non_interactive: bool,

    /// Transport mechanism to use
    #[arg(long, env = "LINKEDIN_MCP_TRANSPORT", value_enum, default_value = "stdio")]
    pub transport: Transport,

    /// Defer the LinkedIn session until the first tool call needs it
    #[arg(
        long,
        env = "LINKEDIN_MCP_LAZY_INIT",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_value = "true",
        default_missing_value = "true"
    )]
    pub lazy_init: bool,

    /// Bind address for the HTTP transport
    #[arg(long, env = "LINKEDIN_MCP_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Port for the HTTP transport
    #[arg(long, env = "LINKEDIN_MCP_PORT", default_value = "8000")]
    pub port: u16,

    /// Route serving MCP over HTTP
    #[arg(long, env = "LINKEDIN_MCP_PATH", default_value = "/api/mcp")]
    pub path: String,

    /// Wall-clock budget per tool call and per session initialization
    #[arg(long, env = "LINKEDIN_MCP_REQUEST_TIMEOUT_SECS", default_value = "300")]
    pub request_timeout_secs: u64,

    /// File-backed credential store
    #[arg(long, env = "LINKEDIN_MCP_CREDENTIAL_FILE")]
    pub credential_file: Option<PathBuf>,

    /// LinkedIn base URL
    #[arg(long, env = "LINKEDIN_MCP_API_BASE", default_value = linkedin_core::voyager::DEFAULT_API_BASE)]
    pub api_base: String,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, env = "LINKEDIN_MCP_LOG_LEVEL", value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log output format; defaults to json when non-interactive
    #[arg(long, env = "LINKEDIN_MCP_LOG_FORMAT", value_enum)]
    pub log_format: Option<LogFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    /// Standard input/output (for Claude Desktop, VS Code, etc.)
    Stdio,
    /// JSON-RPC over HTTP POST (for hosted deployments)
    StreamableHttp,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Stdio => "stdio",
            Transport::StreamableHttp => "streamable-http",
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Rejected configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("port must be non-zero")]
    ZeroPort,

    #[error("path must start with '/': {0}")]
    RelativePath(String),

    #[error("path {0} is reserved for the health probe")]
    ReservedPath(String),

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("{variable} is not a valid number of seconds: {value}")]
    InvalidExpiry { variable: &'static str, value: String },
}

/// OAuth client registration enabling the refresh path
#[derive(Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClient")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Validated server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub sources: CredentialSources,
    pub non_interactive: bool,
    pub transport: Transport,
    pub init_policy: InitPolicy,
    pub bind: SocketAddr,
    pub mcp_path: String,
    pub request_timeout: Duration,
    pub credential_file: PathBuf,
    pub api_base: String,
    pub oauth_client: Option<OAuthClient>,
    pub log_level: Level,
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Validate parsed arguments, reading environment credentials from the process
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        Self::from_args_with_env(args, |name| std::env::var(name).ok())
    }

    /// Validate parsed arguments against an arbitrary variable lookup
    pub fn from_args_with_env<F>(args: Args, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Invariant: HTTP settings are usable even when stdio is selected
        if args.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if !args.path.starts_with('/') {
            return Err(ConfigError::RelativePath(args.path));
        }
        if args.path == HEALTH_PATH {
            return Err(ConfigError::ReservedPath(args.path));
        }
        if args.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let explicit = match (&args.cookie, &args.access_token) {
            (Some(cookie), _) => Some(RawCredential::Cookie(cookie.clone())),
            (None, Some(token)) => Some(RawCredential::OAuth {
                access_token: token.clone(),
                refresh_token: None,
                expires_in: None,
            }),
            (None, None) => None,
        };

        let environment = match (lookup(ENV_COOKIE), lookup(ENV_ACCESS_TOKEN)) {
            (Some(cookie), _) => Some(RawCredential::Cookie(cookie)),
            (None, Some(access_token)) => {
                let expires_in = match lookup(ENV_TOKEN_EXPIRES_IN) {
                    Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                        ConfigError::InvalidExpiry {
                            variable: ENV_TOKEN_EXPIRES_IN,
                            value: raw.clone(),
                        }
                    })?),
                    None => None,
                };
                Some(RawCredential::OAuth {
                    access_token,
                    refresh_token: lookup(ENV_REFRESH_TOKEN),
                    expires_in,
                })
            }
            (None, None) => None,
        };

        let oauth_client = match (lookup(ENV_CLIENT_ID), lookup(ENV_CLIENT_SECRET)) {
            (Some(client_id), Some(client_secret)) => Some(OAuthClient {
                client_id,
                client_secret,
            }),
            _ => None,
        };

        let log_format = args.log_format.unwrap_or(if args.non_interactive {
            LogFormat::Json
        } else {
            LogFormat::Text
        });

        Ok(Self {
            sources: CredentialSources {
                explicit,
                environment,
            },
            non_interactive: args.non_interactive,
            transport: args.transport,
            init_policy: if args.lazy_init {
                InitPolicy::Lazy
            } else {
                InitPolicy::Eager
            },
            bind: SocketAddr::new(args.host, args.port),
            mcp_path: args.path,
            request_timeout: Duration::from_secs(args.request_timeout_secs),
            credential_file: args.credential_file.unwrap_or_else(FileStore::default_path),
            api_base: args.api_base,
            oauth_client,
            log_level: args.log_level.into(),
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(argv: &[&str]) -> Args {
        let mut full = vec!["linkedin-mcp"];
        full.extend_from_slice(argv);
        Args::try_parse_from(full).unwrap()
    }

    fn config(argv: &[&str], env: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_args_with_env(parse(argv), move |name| env.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[], &[]).unwrap();
        assert_eq!(cfg.transport, Transport::Stdio);
        assert_eq!(cfg.init_policy, InitPolicy::Lazy);
        assert_eq!(cfg.bind.to_string(), "127.0.0.1:8000");
        assert_eq!(cfg.mcp_path, "/api/mcp");
        assert_eq!(cfg.request_timeout, Duration::from_secs(300));
        assert!(!cfg.non_interactive);
        assert_eq!(cfg.log_format, LogFormat::Text);
        assert!(cfg.sources.explicit.is_none());
        assert!(cfg.sources.environment.is_none());
        assert!(cfg.oauth_client.is_none());
    }

    #[test]
    fn test_boolish_flags() {
        let cfg = config(&["--non-interactive", "--lazy-init", "0"], &[]).unwrap();
        assert!(cfg.non_interactive);
        assert_eq!(cfg.init_policy, InitPolicy::Eager);
        assert_eq!(cfg.log_format, LogFormat::Json);

        let cfg = config(&["--non-interactive=false"], &[]).unwrap();
        assert!(!cfg.non_interactive);
    }

    #[test]
    fn test_http_transport() {
        let cfg = config(
            &["--transport", "streamable-http", "--host", "0.0.0.0", "--port", "9000"],
            &[],
        )
        .unwrap();
        assert_eq!(cfg.transport.as_str(), "streamable-http");
        assert_eq!(cfg.bind.port(), 9000);
    }

    #[test]
    fn test_explicit_cookie_beats_access_token() {
        let cfg = config(&["--cookie", "AQEDabc", "--access-token", "tok"], &[]).unwrap();
        assert!(matches!(cfg.sources.explicit, Some(RawCredential::Cookie(_))));
    }

    #[test]
    fn test_environment_oauth_credential() {
        let cfg = config(
            &[],
            &[
                (ENV_ACCESS_TOKEN, "token"),
                (ENV_REFRESH_TOKEN, "refresh"),
                (ENV_TOKEN_EXPIRES_IN, "3600"),
            ],
        )
        .unwrap();
        match &cfg.sources.environment {
            Some(RawCredential::OAuth {
                refresh_token,
                expires_in,
                ..
            }) => {
                assert_eq!(refresh_token.as_deref(), Some("refresh"));
                assert_eq!(*expires_in, Some(3600));
            }
            other => panic!("expected OAuth credential, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_environment_values_are_absent() {
        let cfg = config(&[], &[(ENV_COOKIE, "  ")]).unwrap();
        assert!(cfg.sources.environment.is_none());
    }

    #[test]
    fn test_oauth_client_needs_both_halves() {
        let cfg = config(&[], &[(ENV_CLIENT_ID, "id")]).unwrap();
        assert!(cfg.oauth_client.is_none());

        let cfg = config(&[], &[(ENV_CLIENT_ID, "id"), (ENV_CLIENT_SECRET, "secret")]).unwrap();
        let client = cfg.oauth_client.unwrap();
        assert!(!format!("{:?}", client).contains("\"secret\""));
    }

    #[test]
    fn test_validation_failures() {
        assert!(matches!(config(&["--port", "0"], &[]), Err(ConfigError::ZeroPort)));
        assert!(matches!(
            config(&["--path", "api/mcp"], &[]),
            Err(ConfigError::RelativePath(_))
        ));
        assert!(matches!(
            config(&["--path", "/api/health"], &[]),
            Err(ConfigError::ReservedPath(_))
        ));
        assert!(matches!(
            config(&["--request-timeout-secs", "0"], &[]),
            Err(ConfigError::ZeroTimeout)
        ));
        assert!(matches!(
            config(&[], &[(ENV_ACCESS_TOKEN, "t"), (ENV_TOKEN_EXPIRES_IN, "soon")]),
            Err(ConfigError::InvalidExpiry { .. })
        ));
    }
}
