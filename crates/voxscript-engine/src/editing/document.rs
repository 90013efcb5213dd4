use crate::editing::block::{Block, merge_plain_text};

/// A logical position inside the document.
///
/// `offset` is measured within the block at `index`, in the same units as
/// [`Block::logical_len`]: bytes of text for a `Text` block, 0 or 1 for an
/// atomic block (a caret may sit at either boundary of a token but never
/// inside it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Block index into the document.
    pub index: usize,
    /// Offset within that block's content.
    pub offset: usize,
    /// The position sits at the block's start boundary.
    pub is_start: bool,
    /// The position sits at the block's end boundary.
    pub is_end: bool,
}

/// A selection expressed in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectRange {
    pub start: Position,
    pub end: Position,
}

/// The narration script: an ordered sequence of [`Block`]s.
///
/// The document is the single source of truth. The rendered surface is a
/// derived view rebuilt from it after every committed mutation; it only
/// leads the document during the window between an unmanaged keystroke and
/// the next read-back. All mutations go through
/// [`Document::apply`](crate::editing::commands) and replace the block list
/// wholesale; nothing edits blocks in place from outside.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    blocks: Vec<Block>,
    /// Bumped on every committed mutation (change detection for hosts).
    version: u64,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks, version: 0 }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total length of the document in logical coordinates.
    pub fn total_len(&self) -> usize {
        self.blocks.iter().map(Block::logical_len).sum()
    }

    /// Install a replacement block list and bump the version.
    pub(crate) fn replace_blocks(&mut self, blocks: Vec<Block>) -> u64 {
        self.blocks = blocks;
        self.version += 1;
        self.version
    }

    /// Coalesce adjacent `Text` blocks left behind by free typing.
    pub fn merge_plain_text(&mut self) {
        let merged = merge_plain_text(std::mem::take(&mut self.blocks));
        self.blocks = merged;
    }

    /// Resolve a document-relative offset to a logical [`Position`].
    ///
    /// Scans the blocks accumulating logical lengths until the running total
    /// reaches `offset`. Returns `None` when `offset` lies beyond the
    /// document's total length; callers must treat that as "no position".
    pub fn find_position_by_offset(&self, offset: usize) -> Option<Position> {
        let mut consumed = 0;
        for (index, block) in self.blocks.iter().enumerate() {
            let len = block.logical_len();
            if consumed + len >= offset {
                let local = offset.saturating_sub(consumed);
                return Some(Position {
                    index,
                    offset: local,
                    is_start: local == 0,
                    is_end: local == len,
                });
            }
            consumed += len;
        }
        None
    }

    /// Resolve a pair of offsets to a [`SelectRange`], rolling a start that
    /// lands on a block's end boundary forward to the start of the next
    /// block. Without the roll a selection beginning right after a token
    /// would claim to start "inside" it and the caller's single-block check
    /// would reject selections that are perfectly valid.
    pub fn select_range_by_offsets(&self, start: usize, end: usize) -> Option<SelectRange> {
        let mut start = self.find_position_by_offset(start)?;
        let end = self.find_position_by_offset(end)?;

        if start.is_end {
            start = Position {
                index: start.index + 1,
                offset: 0,
                is_start: true,
                is_end: false,
            };
        }

        Some(SelectRange { start, end })
    }

    /// Offset one caret step forward of `offset`, crossing whole tokens and
    /// whole characters. Clamps at the document end.
    pub fn next_offset(&self, offset: usize) -> usize {
        let mut consumed = 0;
        for block in &self.blocks {
            let len = block.logical_len();
            if offset < consumed + len {
                let local = offset - consumed;
                let step = match block {
                    Block::Text { text } => text[local..]
                        .chars()
                        .next()
                        .map(char::len_utf8)
                        .unwrap_or(1),
                    _ => 1,
                };
                return offset + step;
            }
            consumed += len;
        }
        offset.min(self.total_len())
    }

    /// Offset one caret step back of `offset`. Clamps at zero.
    pub fn prev_offset(&self, offset: usize) -> usize {
        let mut consumed = 0;
        for block in &self.blocks {
            let len = block.logical_len();
            if offset <= consumed + len && offset > consumed {
                let local = offset - consumed;
                let step = match block {
                    Block::Text { text } => text[..local]
                        .chars()
                        .next_back()
                        .map(char::len_utf8)
                        .unwrap_or(1),
                    _ => 1,
                };
                return offset - step;
            }
            consumed += len;
        }
        offset.saturating_sub(1)
    }
}
