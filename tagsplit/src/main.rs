// Copyright 2026 The Tagsplit Project
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use tagsplit::chunk::{ChunkRole, ClassifiedChunk};
use tagsplit::config;
use tagsplit::extract::TagConfig;
use tagsplit::stream::ChannelPipeline;

use bytes::BytesMut;
use std::io::Write as _;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "tagsplit", about = "Streaming reasoning-tag channel splitter")]
struct Cli {
    /// Path to the tagsplit.yaml profile config
    #[arg(long, env = "TAGSPLIT_CONFIG")]
    config: Option<String>,

    /// Profile name to resolve from the config (typically the model family)
    #[arg(long)]
    profile: Option<String>,

    /// Literal open tag, bypassing the config
    #[arg(long, requires = "close_tag")]
    open_tag: Option<String>,

    /// Literal close tag, bypassing the config
    #[arg(long, requires = "open_tag")]
    close_tag: Option<String>,

    /// Emit chunks as JSON lines instead of annotated text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let tags = resolve_tags(&cli);
    match &tags {
        Some(t) => tracing::info!(
            open_tag = %t.open_tag,
            close_tag = %t.close_tag,
            "extraction enabled"
        ),
        None => tracing::info!("no tag pair configured, passing through"),
    }

    // Ctrl-C stops pulling at the next fragment boundary.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let input = stdin_fragments();
    let (mut chunks, handle) = ChannelPipeline::new(tags).spawn(input, cancel);

    while let Some(chunk) = chunks.next().await {
        print_chunk(&chunk, cli.json);
    }

    match handle.await {
        Ok(record) => tracing::info!(
            session_id = %record.session_id,
            answer_chunks = record.answer_chunks,
            thinking_chunks = record.thinking_chunks,
            completion_bytes = record.completion.len(),
            cancelled = record.cancelled,
            "stream complete"
        ),
        Err(e) => tracing::error!("pipeline task failed: {e}"),
    }
}

/// Resolve the session's tag pair: explicit flags win, then the config
/// profile lookup; with neither, extraction is disabled.
fn resolve_tags(cli: &Cli) -> Option<TagConfig> {
    if let (Some(open), Some(close)) = (&cli.open_tag, &cli.close_tag) {
        if open.is_empty() || close.is_empty() {
            tracing::error!("--open-tag and --close-tag must be non-empty");
            std::process::exit(1);
        }
        return Some(TagConfig::new(open.clone(), close.clone()));
    }

    let path = cli.config.as_ref()?;
    let source = config::FileSource {
        path: std::path::PathBuf::from(path),
    };
    let config = match config::load_config(&source) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("failed to load config: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        version = %config.version,
        environment = %config.environment,
        profiles = config.profiles.len(),
        contract_hash = %config.contract_hash,
        "config loaded"
    );

    config.tag_config_for(cli.profile.as_deref())
}

/// Adapt stdin into a fragment stream: each read becomes one fragment,
/// boundaries carry no meaning.
fn stdin_fragments() -> ReceiverStream<String> {
    let (tx, rx) = mpsc::channel(16);

    tokio::spawn(async move {
        let mut stdin = tokio::io::stdin();
        let mut buf = BytesMut::with_capacity(8 * 1024);
        loop {
            buf.clear();
            match stdin.read_buf(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let fragment = String::from_utf8_lossy(&buf).into_owned();
                    if tx.send(fragment).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    ReceiverStream::new(rx)
}

/// Write one chunk to stdout: JSON lines in `--json` mode, otherwise the
/// raw text with thinking content dimmed.
fn print_chunk(chunk: &ClassifiedChunk, json: bool) {
    let mut stdout = std::io::stdout();
    if json {
        match serde_json::to_string(chunk) {
            Ok(line) => {
                let _ = writeln!(stdout, "{line}");
            }
            Err(e) => tracing::error!("failed to serialize chunk: {e}"),
        }
    } else {
        let _ = match chunk.role {
            ChunkRole::Thinking => write!(stdout, "\x1b[2m{}\x1b[0m", chunk.content),
            ChunkRole::Answer => write!(stdout, "{}", chunk.content),
        };
    }
    let _ = stdout.flush();
}
