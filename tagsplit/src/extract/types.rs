// Copyright 2026 The Tagsplit Project
// SPDX-License-Identifier: Apache-2.0

// Core extraction types: the configured tag pair and the two-state cursor.

/// The open/close tag pair delimiting reasoning content.
///
/// Tags are opaque runtime data: arbitrary literal text of arbitrary length,
/// with no assumed relationship between the two strings. The same extractor
/// must support differing tag vocabularies per model provider, so tags are
/// carried as configuration, never compiled constants. Matching is exact
/// literal substring match -- no case folding, no patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagConfig {
    /// Literal substring marking the start of a reasoning block.
    pub open_tag: String,
    /// Literal substring marking the end of a reasoning block.
    pub close_tag: String,
}

impl TagConfig {
    /// Create a tag pair. Both strings must be non-empty; config loading
    /// validates this before construction.
    pub fn new(open_tag: impl Into<String>, close_tag: impl Into<String>) -> Self {
        let open_tag = open_tag.into();
        let close_tag = close_tag.into();
        debug_assert!(!open_tag.is_empty() && !close_tag.is_empty());
        Self { open_tag, close_tag }
    }
}

/// Where the extraction cursor sits relative to the tag pair.
///
/// `Outside` is the initial state. `Inside` means the cursor is logically
/// positioned between an open tag and its matching close tag. The state is
/// the single source of truth for which tag is being sought and which
/// channel unclassified content falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorState {
    Outside,
    Inside,
}
