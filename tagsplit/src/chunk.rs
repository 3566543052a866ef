// Classified output chunks -- the canonical types at the extraction boundary.
//
// The extractor produces `ClassifiedChunk` values, the channel pipeline
// forwards them in order, and sinks render or log them per role. Downstream
// consumers must treat the two roles as mutually exclusive content
// categories and must not assume a fixed count or size of chunks per
// incoming fragment.

use serde::{Deserialize, Serialize};

/// Which logical channel a piece of model output belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkRole {
    /// Reasoning content, delimited by the configured tag pair.
    Thinking,
    /// Ordinary assistant output: everything outside a reasoning block.
    Answer,
}

/// One increment of classified model output.
///
/// Chunks are never empty: neither `process` nor the end-of-stream flush
/// constructs a zero-length chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedChunk {
    pub role: ChunkRole,
    pub content: String,
}

impl ClassifiedChunk {
    pub fn new(role: ChunkRole, content: impl Into<String>) -> Self {
        let content = content.into();
        debug_assert!(!content.is_empty(), "classified chunks are never empty");
        Self { role, content }
    }

    /// Shorthand for a reasoning chunk.
    pub fn thinking(content: impl Into<String>) -> Self {
        Self::new(ChunkRole::Thinking, content)
    }

    /// Shorthand for an answer chunk.
    pub fn answer(content: impl Into<String>) -> Self {
        Self::new(ChunkRole::Answer, content)
    }
}
