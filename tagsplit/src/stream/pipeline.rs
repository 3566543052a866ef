// Copyright 2026 The Tagsplit Project
// SPDX-License-Identifier: Apache-2.0

// Channel pipeline
//
// Pulls raw fragments from an upstream stream, runs each through the tag
// extractor, and forwards the resulting chunks to a downstream sink before
// the next pull. The pipeline suspends only at the pull and at the send;
// extraction itself is synchronous. Cancellation is cooperative and checked
// once per pull boundary -- it cannot interrupt an in-progress extraction
// call, and it does not trigger a flush. The flush runs exactly once, on
// natural exhaustion of the source.

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::types::{CompletionRecord, CHUNK_CHANNEL_CAPACITY};
use crate::chunk::{ChunkRole, ClassifiedChunk};
use crate::extract::{TagConfig, TagExtractor};

/// Drives one generation session through tag extraction.
///
/// The pipeline owns the session's extractor lifecycle: it creates the
/// extractor from the configured tag pair, feeds it each pulled fragment,
/// forwards every chunk in order, and flushes once when the source is
/// exhausted. On completion it finalizes a [`CompletionRecord`] whose
/// `completion` field aggregates the answer channel only.
pub struct ChannelPipeline {
    config: Option<TagConfig>,
}

impl ChannelPipeline {
    /// Create a pipeline for one session. `None` disables extraction and
    /// the session runs in passthrough mode.
    pub fn new(config: Option<TagConfig>) -> Self {
        Self { config }
    }

    /// Run the session to completion, cancellation, or sink closure.
    ///
    /// For each fragment pulled from `input`, every resulting chunk is sent
    /// through `sink` before the next pull. When `input` is exhausted the
    /// extractor is flushed and its chunks forwarded, then the record is
    /// finalized. If `cancel` fires, or the sink's receiver is dropped, the
    /// pipeline stops pulling immediately: chunks already forwarded remain
    /// delivered, no flush runs, and the record is marked `cancelled`.
    pub async fn run(
        &self,
        mut input: impl Stream<Item = String> + Unpin,
        sink: mpsc::Sender<ClassifiedChunk>,
        cancel: CancellationToken,
    ) -> CompletionRecord {
        let session_id = Uuid::new_v4().to_string();
        let mut extractor = TagExtractor::new(self.config.clone());

        tracing::debug!(
            %session_id,
            extraction = extractor.enabled(),
            "channel pipeline started"
        );

        let mut completion = String::new();
        let mut answer_chunks = 0usize;
        let mut thinking_chunks = 0usize;
        let mut cancelled = false;

        'pull: loop {
            let fragment = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break 'pull;
                }
                fragment = input.next() => fragment,
            };

            match fragment {
                Some(fragment) => {
                    for chunk in extractor.process(&fragment) {
                        tally(
                            &chunk,
                            &mut completion,
                            &mut answer_chunks,
                            &mut thinking_chunks,
                        );
                        if sink.send(chunk).await.is_err() {
                            // Downstream went away; stop pulling, no flush.
                            cancelled = true;
                            break 'pull;
                        }
                    }
                }
                None => {
                    for chunk in extractor.flush() {
                        tally(
                            &chunk,
                            &mut completion,
                            &mut answer_chunks,
                            &mut thinking_chunks,
                        );
                        if sink.send(chunk).await.is_err() {
                            cancelled = true;
                            break;
                        }
                    }
                    break 'pull;
                }
            }
        }

        let record = CompletionRecord {
            session_id,
            completion,
            answer_chunks,
            thinking_chunks,
            cancelled,
            completed_at: Utc::now(),
        };

        tracing::debug!(
            session_id = %record.session_id,
            answer_chunks = record.answer_chunks,
            thinking_chunks = record.thinking_chunks,
            cancelled = record.cancelled,
            "channel pipeline finished"
        );

        record
    }

    /// Spawn the session on a task, returning the chunk stream and a handle
    /// resolving to the finalized record.
    ///
    /// Dropping the returned stream closes the sink, which stops the
    /// pipeline the same way cancellation does.
    pub fn spawn(
        self,
        input: impl Stream<Item = String> + Unpin + Send + 'static,
        cancel: CancellationToken,
    ) -> (
        ReceiverStream<ClassifiedChunk>,
        JoinHandle<CompletionRecord>,
    ) {
        let (tx, rx) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);
        let handle = tokio::spawn(async move { self.run(input, tx, cancel).await });
        (ReceiverStream::new(rx), handle)
    }
}

/// Fold one produced chunk into the session aggregates.
fn tally(
    chunk: &ClassifiedChunk,
    completion: &mut String,
    answer_chunks: &mut usize,
    thinking_chunks: &mut usize,
) {
    match chunk.role {
        ChunkRole::Answer => {
            completion.push_str(&chunk.content);
            *answer_chunks += 1;
        }
        ChunkRole::Thinking => {
            *thinking_chunks += 1;
        }
    }
}
