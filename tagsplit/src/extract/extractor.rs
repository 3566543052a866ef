// Copyright 2026 The Tagsplit Project
// SPDX-License-Identifier: Apache-2.0

// Tag extractor -- the state machine and buffer manager behind channel
// splitting.
//
// Each incoming fragment is appended to a pending buffer, then the buffer
// is scanned for the tag relevant to the current state: the open tag while
// outside a reasoning block, the close tag while inside one. Content before
// a match is emitted in the current channel, the tag literal is consumed,
// and the state flips. On a miss, everything except the longest buffer
// suffix that could still grow into the sought tag is emitted; the suffix
// stays buffered. That retention rule is what reassembles tags split across
// fragment boundaries, and it bounds the buffer to one partial tag between
// calls.

use super::types::{ExtractorState, TagConfig};
use crate::chunk::{ChunkRole, ClassifiedChunk};

/// Splits an incremental raw text stream into thinking and answer chunks.
///
/// One extractor instance exists per generation session: created with an
/// optional tag pair at session start, fed fragments in arrival order via
/// [`process`], and drained exactly once at end of stream via [`flush`].
/// Without a tag pair the extractor is inert -- fragments pass through
/// verbatim as answer content and tag-like substrings are never interpreted.
///
/// There is no internal error condition: malformed, truncated, and tag-free
/// input are all handled by the state machine, and unterminated tags are
/// simply flushed as content.
///
/// [`process`]: TagExtractor::process
/// [`flush`]: TagExtractor::flush
#[derive(Debug)]
pub struct TagExtractor {
    config: Option<TagConfig>,
    state: ExtractorState,
    pending: String,
}

impl TagExtractor {
    pub fn new(config: Option<TagConfig>) -> Self {
        Self {
            config,
            state: ExtractorState::Outside,
            pending: String::new(),
        }
    }

    /// Whether tag extraction is configured (`false` means passthrough).
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Current cursor state.
    pub fn state(&self) -> ExtractorState {
        self.state
    }

    /// Bytes of not-yet-classified text currently buffered.
    ///
    /// Between calls this never exceeds one partial tag:
    /// `max(open_tag.len(), close_tag.len()) - 1`.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Classify one incoming fragment, returning the chunks it completes.
    ///
    /// Chunks come back in left-to-right input order. A fragment containing
    /// several tag transitions produces several chunks in one call; a
    /// fragment ending mid-tag produces nothing for the held-back suffix
    /// until later input resolves it. Empty content is never returned.
    pub fn process(&mut self, fragment: &str) -> Vec<ClassifiedChunk> {
        let Some(config) = &self.config else {
            if fragment.is_empty() {
                return Vec::new();
            }
            return vec![ClassifiedChunk::answer(fragment)];
        };

        self.pending.push_str(fragment);

        let mut chunks = Vec::new();
        loop {
            let (tag, role) = match self.state {
                ExtractorState::Outside => (config.open_tag.as_str(), ChunkRole::Answer),
                ExtractorState::Inside => (config.close_tag.as_str(), ChunkRole::Thinking),
            };

            match self.pending.find(tag) {
                Some(pos) => {
                    // Content before the tag belongs to the current channel;
                    // the tag literal itself is consumed, not emitted.
                    if pos > 0 {
                        chunks.push(ClassifiedChunk::new(role, &self.pending[..pos]));
                    }
                    self.pending.drain(..pos + tag.len());
                    self.state = match self.state {
                        ExtractorState::Outside => ExtractorState::Inside,
                        ExtractorState::Inside => ExtractorState::Outside,
                    };
                }
                None => {
                    // No complete tag. Hold back the longest suffix that is
                    // still a proper prefix of the sought tag; emit the rest.
                    let retained = partial_tag_suffix(&self.pending, tag);
                    let emit = self.pending.len() - retained;
                    if emit > 0 {
                        chunks.push(ClassifiedChunk::new(role, &self.pending[..emit]));
                        self.pending.drain(..emit);
                    }
                    break;
                }
            }
        }

        chunks
    }

    /// Drain any remaining buffered text at end of stream.
    ///
    /// Called exactly once when the source is naturally exhausted. Pending
    /// text comes out in the channel of the current state -- a partial tag
    /// that never completed is emitted as ordinary content, not discarded.
    pub fn flush(&mut self) -> Vec<ClassifiedChunk> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        let role = match self.state {
            ExtractorState::Outside => ChunkRole::Answer,
            ExtractorState::Inside => ChunkRole::Thinking,
        };
        let content = std::mem::take(&mut self.pending);
        vec![ClassifiedChunk::new(role, content)]
    }
}

/// Length in bytes of the longest suffix of `pending` that is a proper
/// prefix of `tag`, or 0 when no suffix qualifies.
///
/// Candidate lengths are taken on `tag`'s char boundaries, and a matching
/// suffix ends the buffer on the same boundary, so the caller's split point
/// never lands inside a multi-byte code point.
fn partial_tag_suffix(pending: &str, tag: &str) -> usize {
    let mut longest = 0;
    for (idx, _) in tag.char_indices().skip(1) {
        if pending.ends_with(&tag[..idx]) {
            longest = idx;
        }
    }
    longest
}
