use serde::{Deserialize, Serialize};

/// Longest run of narration text that may be turned into an alias, and the
/// longest alias that may be attached to it.
pub const MAX_ALIAS_TEXT_LEN: usize = 30;

/// Longest alias label rendered before the display is ellipsis-capped.
pub const MAX_RENDER_ALIAS_LEN: usize = 7;

/// One unit of narration content.
///
/// A script is an ordered sequence of blocks. `Text` is ordinary editable
/// prose. `Alias` and `Break` are **atomic tokens**: their interior cannot be
/// partially selected or edited from the surface, and they contribute exactly
/// one unit to logical coordinates no matter how wide they render.
///
/// The serde representation is the script wire format: a tagged object per
/// block (`{"type":"text","text":…}`, `{"type":"alias","text":…,"alias":…}`,
/// `{"type":"break","durationMS":…}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    /// Plain narration text.
    Text { text: String },
    /// Literal text spoken/shown as something else.
    Alias { text: String, alias: String },
    /// A timed pause in the narration.
    Break {
        #[serde(rename = "durationMS")]
        duration_ms: u64,
    },
}

impl Block {
    pub fn text(text: impl Into<String>) -> Self {
        Block::Text { text: text.into() }
    }

    pub fn alias(text: impl Into<String>, alias: impl Into<String>) -> Self {
        Block::Alias {
            text: text.into(),
            alias: alias.into(),
        }
    }

    pub fn pause(duration_ms: u64) -> Self {
        Block::Break { duration_ms }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Block::Text { .. })
    }

    /// Atomic blocks are the non-text-editable tokens.
    pub fn is_atomic(&self) -> bool {
        !self.is_text()
    }

    /// Length of this block in logical document coordinates.
    ///
    /// Atomic blocks count as 1 regardless of their rendered width; this is
    /// the same rule [`offset_in_root`](crate::surface::selection::offset_in_root)
    /// applies on the surface side, and the two must never diverge.
    pub fn logical_len(&self) -> usize {
        match self {
            Block::Text { text } => text.len(),
            Block::Alias { .. } | Block::Break { .. } => 1,
        }
    }
}

/// Coalesce every run of consecutive `Text` blocks into a single block.
///
/// Range-based operations resolve a selection to a single block index, so
/// fragmentation left behind by free typing must be closed first.
pub fn merge_plain_text(blocks: Vec<Block>) -> Vec<Block> {
    let mut merged: Vec<Block> = Vec::with_capacity(blocks.len());
    for block in blocks {
        match (merged.last_mut(), &block) {
            (Some(Block::Text { text: prev }), Block::Text { text }) => prev.push_str(text),
            _ => merged.push(block),
        }
    }
    merged
}

/// Cap `text` at `max` characters, appending `...` when truncated.
pub fn ellipsis(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
