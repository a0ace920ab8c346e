mod app;
mod cli;
mod logging;

use crate::app::{App, CreateParams, Request, ResolveParams, Response};
use crate::cli::{Cli, Command, CreateArgs, StorageBackendArg};
use anyhow::Context;
use clap::Parser;
use spool_core::RecordStore;
use spool_redirector::RedirectorService;
use spool_shortener::{AllocatorSettings, DefaultValidator, ShortenerService, ShortenerSettings};
use spool_storage::{InMemoryStore, RedisStore, RedisStoreSettings};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let config = Cli::parse();
    logging::init(config.log_format);

    info!(
        storage_backend = %config.storage,
        key_prefix = %config.key_prefix,
        max_attempts = config.max_attempts,
        "starting spool"
    );

    match config.storage {
        StorageBackendArg::InMemory => {
            let store = InMemoryStore::with_recent_ips_cap(config.recent_ips_cap);
            run(store, config).await
        }
        StorageBackendArg::Redis => {
            let redis_url = config
                .redis_url
                .clone()
                .context("redis url is required when storage backend is redis")?;
            let settings = RedisStoreSettings::builder()
                .key_prefix(config.key_prefix.clone())
                .recent_ips_cap(config.recent_ips_cap)
                .build();
            let store = RedisStore::connect(&redis_url, settings)
                .await
                .with_context(|| format!("failed to connect to {redis_url}"))?;
            run(store, config).await
        }
    }
}

async fn run<S: RecordStore>(store: S, config: Cli) -> anyhow::Result<ExitCode> {
    let store = Arc::new(store);
    let settings = ShortenerSettings::builder()
        .emoji_length(config.emoji_length)
        .allocator(
            AllocatorSettings::builder()
                .max_attempts(config.max_attempts)
                .build(),
        )
        .build();
    let shortener = ShortenerService::with_parts(
        Arc::clone(&store),
        DefaultValidator::with_blocked_prefixes(config.blocked_prefixes),
        spool_core::SystemClock,
        settings,
    );
    let app = App::new(shortener, RedirectorService::new(store), config.base_url);

    let request = match config.command {
        Command::Shorten(args) => Request::Shorten(create_params(args)),
        Command::Emoji(args) => Request::Emoji(create_params(args)),
        Command::Resolve(args) => Request::Resolve(ResolveParams {
            code: args.code,
            password: args.password,
            user_agent: Some(args.user_agent),
            client_ip: args.client_ip,
        }),
        Command::Run => return serve_lines(&app).await,
    };

    let response = app.handle(request).await;
    print_response(&response)?;
    Ok(if response.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Answers one JSON request per stdin line until EOF.
async fn serve_lines<S: RecordStore>(app: &App<S>) -> anyhow::Result<ExitCode> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => app.handle(request).await,
            Err(err) => Response::Error {
                error: "bad_request",
                message: err.to_string(),
            },
        };
        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }

    Ok(ExitCode::SUCCESS)
}

fn print_response(response: &Response) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}

fn create_params(args: CreateArgs) -> CreateParams {
    CreateParams {
        url: args.url,
        alias: args.alias,
        password: args.password,
        max_clicks: args.max_clicks,
        block_bots: args.block_bots,
        creator_ip: args.creator_ip,
    }
}
