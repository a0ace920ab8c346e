use clap::{Args, Parser, Subcommand, ValueEnum};
use spool_core::emoji::MAX_EMOJI_SYMBOLS;
use std::fmt::{Display, Formatter};

pub const STORAGE_BACKEND_ENV: &str = "SPOOL_STORAGE_BACKEND";
pub const REDIS_URL_ENV: &str = "SPOOL_REDIS_URL";
pub const KEY_PREFIX_ENV: &str = "SPOOL_KEY_PREFIX";
pub const RECENT_IPS_CAP_ENV: &str = "SPOOL_RECENT_IPS_CAP";
pub const MAX_ATTEMPTS_ENV: &str = "SPOOL_MAX_ATTEMPTS";
pub const EMOJI_LENGTH_ENV: &str = "SPOOL_EMOJI_LENGTH";
pub const BASE_URL_ENV: &str = "SPOOL_BASE_URL";
pub const BLOCKED_PREFIXES_ENV: &str = "SPOOL_BLOCKED_PREFIXES";
pub const LOG_FORMAT_ENV: &str = "SPOOL_LOG_FORMAT";

pub const DEFAULT_KEY_PREFIX: &str = "spool";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_CLIENT_IP: &str = "127.0.0.1";
pub const DEFAULT_USER_AGENT: &str = "spool-cli";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "redis")]
    Redis,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "spool", version, about = "Create and resolve short links")]
pub struct Cli {
    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq("storage", "redis"))]
    pub redis_url: Option<String>,

    #[arg(long, env = KEY_PREFIX_ENV, default_value = DEFAULT_KEY_PREFIX)]
    pub key_prefix: String,

    /// Client IPs kept per link; 0 keeps all of them.
    #[arg(long, env = RECENT_IPS_CAP_ENV, default_value_t = 1000)]
    pub recent_ips_cap: usize,

    /// Generated candidates tried before giving up.
    #[arg(long, env = MAX_ATTEMPTS_ENV, default_value_t = 64)]
    pub max_attempts: usize,

    /// Emoji per generated emoji code.
    #[arg(long, env = EMOJI_LENGTH_ENV, default_value_t = 3, value_parser = parse_emoji_length)]
    pub emoji_length: usize,

    /// Base URL short links are rendered under.
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Target URL prefixes links may not point to.
    #[arg(long = "blocked-prefix", env = BLOCKED_PREFIXES_ENV, value_delimiter = ',')]
    pub blocked_prefixes: Vec<String>,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,

    #[command(subcommand)]
    pub command: Command,
}

fn parse_emoji_length(raw: &str) -> Result<usize, String> {
    let length: usize = raw.parse().map_err(|e| format!("{e}"))?;
    if (1..=MAX_EMOJI_SYMBOLS).contains(&length) {
        Ok(length)
    } else {
        Err(format!("must be between 1 and {MAX_EMOJI_SYMBOLS}"))
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a link in the alphanumeric namespace.
    Shorten(CreateArgs),
    /// Create a link in the emoji namespace.
    Emoji(CreateArgs),
    /// Resolve a code and count the click.
    Resolve(ResolveArgs),
    /// Read JSON requests from stdin, one per line, and answer each on stdout.
    Run,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    pub url: String,
    #[arg(long)]
    pub alias: Option<String>,
    #[arg(long)]
    pub password: Option<String>,
    #[arg(long)]
    pub max_clicks: Option<u64>,
    #[arg(long)]
    pub block_bots: bool,
    #[arg(long, default_value = DEFAULT_CLIENT_IP)]
    pub creator_ip: String,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    pub code: String,
    #[arg(long)]
    pub password: Option<String>,
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
    #[arg(long, default_value = DEFAULT_CLIENT_IP)]
    pub client_ip: String,
}
