// Copyright 2026 The Tagsplit Project
// SPDX-License-Identifier: Apache-2.0

// Stream types: the session record finalized when the pipeline stops, and
// the channel sizing shared by the pipeline and its callers.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Capacity of the classified-chunk channel created by
/// [`ChannelPipeline::spawn`](super::ChannelPipeline::spawn).
pub const CHUNK_CHANNEL_CAPACITY: usize = 64;

/// Aggregated session record produced when the pipeline finishes.
///
/// `completion` is the audit field: the in-order concatenation of every
/// answer chunk's content. Thinking content never appears in it -- the
/// record keeps only a count for that channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRecord {
    /// Unique id for this generation session.
    pub session_id: String,
    /// Concatenated answer-channel content, in emission order.
    pub completion: String,
    /// Number of answer chunks produced.
    pub answer_chunks: usize,
    /// Number of thinking chunks produced.
    pub thinking_chunks: usize,
    /// True when the pipeline stopped before natural exhaustion, either via
    /// the cancellation token or a closed sink. No flush ran in that case.
    pub cancelled: bool,
    /// When the record was finalized.
    pub completed_at: DateTime<Utc>,
}
