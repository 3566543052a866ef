// Copyright 2026 The Tagsplit Project
// SPDX-License-Identifier: Apache-2.0

// Tests for the channel pipeline.
//
// Covers:
//  1. Chunks forwarded downstream in order, fragment by fragment
//  2. Flush runs exactly once, on natural exhaustion only
//  3. Record aggregation: completion carries the answer channel only
//  4. Cancellation stops pulls at the boundary and skips the flush
//  5. Dropped receiver stops the pipeline like a client disconnect
//  6. Passthrough sessions and empty streams

use super::*;
use crate::chunk::{ChunkRole, ClassifiedChunk};
use crate::extract::TagConfig;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn think_tags() -> Option<TagConfig> {
    Some(TagConfig::new("<think>", "</think>"))
}

/// Build a finite in-memory fragment stream.
fn fragment_stream(fragments: Vec<&str>) -> impl Stream<Item = String> + Unpin + Send + 'static {
    tokio_stream::iter(
        fragments
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>(),
    )
}

/// Build a channel-backed fragment stream for hand-driven tests.
fn fragment_channel() -> (mpsc::Sender<String>, ReceiverStream<String>) {
    let (tx, rx) = mpsc::channel(16);
    (tx, ReceiverStream::new(rx))
}

/// Run a whole session over a finite stream, collecting every chunk and the
/// finalized record.
async fn run_collect(
    config: Option<TagConfig>,
    fragments: Vec<&str>,
) -> (Vec<ClassifiedChunk>, CompletionRecord) {
    let (mut chunks, handle) =
        ChannelPipeline::new(config).spawn(fragment_stream(fragments), CancellationToken::new());

    let mut out = Vec::new();
    while let Some(chunk) = chunks.next().await {
        out.push(chunk);
    }
    let record = handle.await.expect("pipeline task should not panic");
    (out, record)
}

// ---------------------------------------------------------------------------
// Test 1: chunks forwarded in order
// ---------------------------------------------------------------------------

#[tokio::test]
async fn chunks_forwarded_in_order() {
    let (chunks, record) = run_collect(
        think_tags(),
        vec!["a<think>b</think>c", "<think>d</think>", "e"],
    )
    .await;

    assert_eq!(
        chunks,
        vec![
            ClassifiedChunk::answer("a"),
            ClassifiedChunk::thinking("b"),
            ClassifiedChunk::answer("c"),
            ClassifiedChunk::thinking("d"),
            ClassifiedChunk::answer("e"),
        ]
    );
    assert!(!record.cancelled);
}

// ---------------------------------------------------------------------------
// Test 2: flush on natural exhaustion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn flush_runs_on_natural_exhaustion() {
    let (chunks, record) = run_collect(think_tags(), vec!["<think>incomplete thinking"]).await;

    assert_eq!(chunks, vec![ClassifiedChunk::thinking("incomplete thinking")]);
    assert_eq!(record.thinking_chunks, 1);
    assert_eq!(record.completion, "");
    assert!(!record.cancelled);
}

#[tokio::test]
async fn partial_tag_flushed_as_answer_content() {
    let (chunks, record) = run_collect(think_tags(), vec!["Some content <th"]).await;

    let answer: String = chunks
        .iter()
        .filter(|c| c.role == ChunkRole::Answer)
        .map(|c| c.content.as_str())
        .collect();
    assert_eq!(answer, "Some content <th");
    assert_eq!(record.completion, "Some content <th");
}

// ---------------------------------------------------------------------------
// Test 3: record aggregation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn completion_aggregates_answer_channel_only() {
    let (chunks, record) = run_collect(
        think_tags(),
        vec![
            "<think>my reasoning process</think>",
            "The final ",
            "answer.",
        ],
    )
    .await;

    assert_eq!(record.completion, "The final answer.");
    assert!(!record.completion.contains("my reasoning process"));
    assert_eq!(record.answer_chunks, 2);
    assert_eq!(record.thinking_chunks, 1);

    // Counts match the chunks actually forwarded.
    let forwarded_answers = chunks.iter().filter(|c| c.role == ChunkRole::Answer).count();
    let forwarded_thinking = chunks
        .iter()
        .filter(|c| c.role == ChunkRole::Thinking)
        .count();
    assert_eq!(record.answer_chunks, forwarded_answers);
    assert_eq!(record.thinking_chunks, forwarded_thinking);
}

// ---------------------------------------------------------------------------
// Test 4: cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancellation_stops_pulls_and_skips_flush() {
    let (tx, input) = fragment_channel();
    let cancel = CancellationToken::new();
    let (mut chunks, handle) = ChannelPipeline::new(think_tags()).spawn(input, cancel.clone());

    tx.send("<think>begun".to_string()).await.unwrap();
    let first = chunks.next().await.expect("chunk before cancellation");
    assert_eq!(first, ClassifiedChunk::thinking("begun"));

    cancel.cancel();
    // Fragments queued after cancellation must never be pulled.
    let _ = tx.send("never seen</think>tail".to_string()).await;

    assert!(chunks.next().await.is_none(), "no chunks after cancellation");

    let record = handle.await.unwrap();
    assert!(record.cancelled);
    assert_eq!(record.thinking_chunks, 1);
    assert_eq!(record.completion, "");
}

#[tokio::test]
async fn cancellation_before_first_pull_produces_nothing() {
    let (_tx, input) = fragment_channel();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let (mut chunks, handle) = ChannelPipeline::new(think_tags()).spawn(input, cancel);

    assert!(chunks.next().await.is_none());
    let record = handle.await.unwrap();
    assert!(record.cancelled);
    assert_eq!(record.answer_chunks, 0);
    assert_eq!(record.thinking_chunks, 0);
}

// ---------------------------------------------------------------------------
// Test 5: dropped receiver
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dropped_receiver_stops_pipeline() {
    let (tx, rx) = mpsc::channel(1);
    drop(rx);

    let record = ChannelPipeline::new(None)
        .run(
            fragment_stream(vec!["first ", "second"]),
            tx,
            CancellationToken::new(),
        )
        .await;

    // The first chunk was produced (and tallied) but not delivered; the
    // pipeline stops there instead of draining the source.
    assert!(record.cancelled);
    assert_eq!(record.answer_chunks, 1);
}

// ---------------------------------------------------------------------------
// Test 6: passthrough sessions and empty streams
// ---------------------------------------------------------------------------

#[tokio::test]
async fn passthrough_session_forwards_fragments_verbatim() {
    let (chunks, record) = run_collect(None, vec!["<think>x</think>", "y"]).await;

    assert_eq!(
        chunks,
        vec![
            ClassifiedChunk::answer("<think>x</think>"),
            ClassifiedChunk::answer("y"),
        ]
    );
    assert_eq!(record.completion, "<think>x</think>y");
    assert_eq!(record.thinking_chunks, 0);
}

#[tokio::test]
async fn empty_stream_finishes_with_empty_record() {
    let (chunks, record) = run_collect(think_tags(), vec![]).await;

    assert!(chunks.is_empty());
    assert_eq!(record.completion, "");
    assert_eq!(record.answer_chunks, 0);
    assert_eq!(record.thinking_chunks, 0);
    assert!(!record.cancelled);
}

#[tokio::test]
async fn empty_fragments_are_accepted_and_ignored() {
    let (chunks, record) = run_collect(think_tags(), vec!["", "a", "", "b", ""]).await;

    assert_eq!(
        chunks,
        vec![ClassifiedChunk::answer("a"), ClassifiedChunk::answer("b")]
    );
    assert_eq!(record.completion, "ab");
}
