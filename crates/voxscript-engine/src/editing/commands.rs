use thiserror::Error;

use crate::editing::block::{Block, MAX_ALIAS_TEXT_LEN, merge_plain_text};
use crate::editing::document::{Document, Position};
use crate::editing::patch::Patch;
use crate::units::clamp_pause_ms;

/// Commands that can be applied to the document.
///
/// Offsets are logical document offsets (see
/// [`Document::find_position_by_offset`]); indices address a block directly,
/// as remembered when the floating editor was opened on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    /// Insert a pause token at a collapsed caret.
    InsertBreak { at: usize, duration_ms: u64 },
    /// Turn the selected run of plain text into an alias token.
    CreateAlias {
        start: usize,
        end: usize,
        alias: String,
    },
    /// Replace the alias payload of an existing alias token.
    EditAlias { index: usize, alias: String },
    /// Replace the duration of an existing pause token (clamped).
    SetBreakDuration { index: usize, duration_ms: u64 },
    /// Convert an alias token back to plain text.
    RemoveAlias { index: usize },
    /// Delete a pause token.
    RemoveBreak { index: usize },
    /// Keyboard deletion of an atomic token: aliases revert to text,
    /// pauses are removed.
    DeleteToken { index: usize },
}

/// Why a command was rejected.
///
/// User errors describe input the user can correct and are surfaced as
/// transient warnings. The remaining variants signal internal bugs (stale
/// indices, impossible offsets); they are logged and the operation aborts
/// without touching the document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("click into the narration to pick an insert position first")]
    NoCaret,
    #[error("clear the text selection before inserting a pause")]
    SelectionNotCollapsed,
    #[error("select the narration text to alias first")]
    NoSelection,
    #[error("a pause cannot be inserted inside a token")]
    CaretInsideToken,
    #[error("alias text cannot be empty")]
    EmptyAlias,
    #[error("an alias cannot exceed {max} characters")]
    AliasTooLong { max: usize },
    #[error("aliased text cannot exceed {max} characters")]
    SelectionTooLong { max: usize },
    #[error("a selection containing a line break cannot be aliased")]
    SelectionCrossesLineBreak,
    #[error("keep the selection clear of pauses and aliases")]
    SelectionSpansBlocks,
    #[error("pauses and aliases cannot be aliased again")]
    SelectionOnToken,

    #[error("offset {offset} lies outside the document")]
    OffsetOutOfBounds { offset: usize },
    #[error("block index {index} is out of bounds (document has {len} blocks)")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("block at index {index} is not an alias")]
    NotAnAlias { index: usize },
    #[error("block at index {index} is not a pause")]
    NotABreak { index: usize },
    #[error("block at index {index} is not a token")]
    NotAToken { index: usize },
}

impl EditError {
    /// True for input the user can correct; false for internal-bug signals.
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            EditError::OffsetOutOfBounds { .. }
                | EditError::IndexOutOfBounds { .. }
                | EditError::NotAnAlias { .. }
                | EditError::NotABreak { .. }
                | EditError::NotAToken { .. }
        )
    }
}

/// A compiled edit: the full replacement block list plus the caret target.
struct Edit {
    blocks: Vec<Block>,
    cursor: Option<usize>,
}

impl Document {
    /// Apply a command, replacing the block list wholesale.
    ///
    /// All-or-nothing: on error the document is untouched. On success the
    /// no-adjacent-text invariant holds on the result and the version is
    /// bumped.
    pub fn apply(&mut self, cmd: Cmd) -> Result<Patch, EditError> {
        let edit = compile_command(self, &cmd)?;
        let version = self.replace_blocks(edit.blocks);
        Ok(Patch {
            cursor: edit.cursor,
            version,
        })
    }
}

fn compile_command(doc: &Document, cmd: &Cmd) -> Result<Edit, EditError> {
    match cmd {
        Cmd::InsertBreak { at, duration_ms } => insert_break(doc, *at, *duration_ms),
        Cmd::CreateAlias { start, end, alias } => create_alias(doc, *start, *end, alias),
        Cmd::EditAlias { index, alias } => edit_alias(doc, *index, alias),
        Cmd::SetBreakDuration { index, duration_ms } => {
            set_break_duration(doc, *index, *duration_ms)
        }
        Cmd::RemoveAlias { index } => remove_alias(doc, *index),
        Cmd::RemoveBreak { index } => remove_break(doc, *index),
        Cmd::DeleteToken { index } => delete_token(doc, *index),
    }
}

fn insert_break(doc: &Document, at: usize, duration_ms: u64) -> Result<Edit, EditError> {
    let merged = Document::from_blocks(merge_plain_text(doc.blocks().to_vec()));
    let pos = merged
        .find_position_by_offset(at)
        .ok_or(EditError::OffsetOutOfBounds { offset: at })?;
    let current = &merged.blocks()[pos.index];

    let mut blocks = merged.blocks()[..pos.index].to_vec();
    match current {
        Block::Text { text } => {
            let (before, after) = text
                .split_at_checked(pos.offset)
                .ok_or(EditError::OffsetOutOfBounds { offset: at })?;
            if !before.is_empty() {
                blocks.push(Block::text(before));
            }
            blocks.push(Block::pause(duration_ms));
            if !after.is_empty() {
                blocks.push(Block::text(after));
            }
        }
        // The caret may sit at either boundary of a token but the token
        // itself cannot be split.
        _ if pos.is_start => {
            blocks.push(Block::pause(duration_ms));
            blocks.push(current.clone());
        }
        _ if pos.is_end => {
            blocks.push(current.clone());
            blocks.push(Block::pause(duration_ms));
        }
        _ => return Err(EditError::CaretInsideToken),
    }
    blocks.extend_from_slice(&merged.blocks()[pos.index + 1..]);

    // The token is one logical unit long, so "immediately after the
    // inserted token" is the caret offset plus one.
    Ok(Edit {
        blocks,
        cursor: Some(at + 1),
    })
}

fn create_alias(doc: &Document, start: usize, end: usize, alias: &str) -> Result<Edit, EditError> {
    if alias.is_empty() {
        return Err(EditError::EmptyAlias);
    }
    if alias.chars().count() > MAX_ALIAS_TEXT_LEN {
        return Err(EditError::AliasTooLong {
            max: MAX_ALIAS_TEXT_LEN,
        });
    }
    if end <= start {
        return Err(EditError::NoSelection);
    }

    let merged = Document::from_blocks(merge_plain_text(doc.blocks().to_vec()));
    let range = merged
        .select_range_by_offsets(start, end)
        .ok_or(EditError::OffsetOutOfBounds { offset: end })?;
    if range.start.index != range.end.index {
        return Err(EditError::SelectionSpansBlocks);
    }

    let current = merged
        .blocks()
        .get(range.start.index)
        .ok_or(EditError::SelectionSpansBlocks)?;
    let text = match current {
        Block::Text { text } => text,
        _ => return Err(EditError::SelectionOnToken),
    };

    let (before, rest) = text
        .split_at_checked(range.start.offset)
        .ok_or(EditError::OffsetOutOfBounds { offset: start })?;
    let (selected, after) = rest
        .split_at_checked(range.end.offset - range.start.offset)
        .ok_or(EditError::OffsetOutOfBounds { offset: end })?;

    if selected.is_empty() {
        return Err(EditError::NoSelection);
    }
    if selected.contains('\n') {
        return Err(EditError::SelectionCrossesLineBreak);
    }
    if selected.chars().count() > MAX_ALIAS_TEXT_LEN {
        return Err(EditError::SelectionTooLong {
            max: MAX_ALIAS_TEXT_LEN,
        });
    }

    let mut blocks = merged.blocks()[..range.start.index].to_vec();
    if !before.is_empty() {
        blocks.push(Block::text(before));
    }
    blocks.push(Block::alias(selected, alias));
    if !after.is_empty() {
        blocks.push(Block::text(after));
    }
    blocks.extend_from_slice(&merged.blocks()[range.start.index + 1..]);

    Ok(Edit {
        blocks,
        cursor: Some(start + 1),
    })
}

fn edit_alias(doc: &Document, index: usize, alias: &str) -> Result<Edit, EditError> {
    if alias.is_empty() {
        return Err(EditError::EmptyAlias);
    }
    if alias.chars().count() > MAX_ALIAS_TEXT_LEN {
        return Err(EditError::AliasTooLong {
            max: MAX_ALIAS_TEXT_LEN,
        });
    }

    let mut blocks = doc.blocks().to_vec();
    match blocks.get_mut(index) {
        Some(Block::Alias { alias: payload, .. }) => *payload = alias.to_string(),
        Some(_) => return Err(EditError::NotAnAlias { index }),
        None => {
            return Err(EditError::IndexOutOfBounds {
                index,
                len: doc.blocks().len(),
            });
        }
    }

    Ok(Edit {
        blocks,
        cursor: None,
    })
}

fn set_break_duration(doc: &Document, index: usize, duration_ms: u64) -> Result<Edit, EditError> {
    let mut blocks = doc.blocks().to_vec();
    match blocks.get_mut(index) {
        Some(Block::Break { duration_ms: d }) => *d = clamp_pause_ms(duration_ms),
        Some(_) => return Err(EditError::NotABreak { index }),
        None => {
            return Err(EditError::IndexOutOfBounds {
                index,
                len: doc.blocks().len(),
            });
        }
    }

    Ok(Edit {
        blocks,
        cursor: None,
    })
}

fn remove_alias(doc: &Document, index: usize) -> Result<Edit, EditError> {
    let mut blocks = doc.blocks().to_vec();
    let text = match blocks.get(index) {
        Some(Block::Alias { text, .. }) => text.clone(),
        Some(_) => return Err(EditError::NotAnAlias { index }),
        None => {
            return Err(EditError::IndexOutOfBounds {
                index,
                len: doc.blocks().len(),
            });
        }
    };
    blocks[index] = Block::text(text);

    Ok(Edit {
        blocks: merge_plain_text(blocks),
        cursor: None,
    })
}

fn remove_break(doc: &Document, index: usize) -> Result<Edit, EditError> {
    let mut blocks = doc.blocks().to_vec();
    match blocks.get(index) {
        Some(Block::Break { .. }) => {
            blocks.remove(index);
        }
        Some(_) => return Err(EditError::NotABreak { index }),
        None => {
            return Err(EditError::IndexOutOfBounds {
                index,
                len: doc.blocks().len(),
            });
        }
    }

    Ok(Edit {
        blocks: merge_plain_text(blocks),
        cursor: None,
    })
}

fn delete_token(doc: &Document, index: usize) -> Result<Edit, EditError> {
    let mut blocks = doc.blocks().to_vec();
    // Caret target: the vacated boundary, i.e. the logical offset where the
    // token started. Stable under the text merge below because merging
    // never changes logical lengths.
    let cursor = blocks[..index.min(blocks.len())]
        .iter()
        .map(Block::logical_len)
        .sum::<usize>();

    match blocks.get(index) {
        Some(Block::Alias { text, .. }) => {
            let text = text.clone();
            blocks[index] = Block::text(text);
        }
        Some(Block::Break { .. }) => {
            blocks.remove(index);
        }
        Some(_) => return Err(EditError::NotAToken { index }),
        None => {
            return Err(EditError::IndexOutOfBounds {
                index,
                len: doc.blocks().len(),
            });
        }
    }

    Ok(Edit {
        blocks: merge_plain_text(blocks),
        cursor: Some(cursor),
    })
}

/// Which neighboring block a Backspace/Delete press targets.
///
/// `None` means the caret sits strictly inside a text block and the native
/// single-character deletion should proceed. A returned index still has to
/// be checked for atomicity by the caller; deleting into an adjacent text
/// block is also native behavior.
pub fn delete_target(doc: &Document, pos: &Position, backward: bool) -> Option<usize> {
    let current = doc.blocks().get(pos.index)?;
    let len = current.logical_len();
    let at_start = pos.offset == 0;
    let at_end = pos.offset == len;

    if !at_start && !at_end && current.is_text() {
        return None;
    }

    if backward {
        if at_start {
            pos.index.checked_sub(1)
        } else {
            Some(pos.index)
        }
    } else if at_end {
        let next = pos.index + 1;
        (next < doc.blocks().len()).then_some(next)
    } else {
        Some(pos.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::DEFAULT_PAUSE_MS;
    use pretty_assertions::assert_eq;

    fn doc(blocks: Vec<Block>) -> Document {
        Document::from_blocks(blocks)
    }

    fn assert_no_adjacent_text(doc: &Document) {
        for pair in doc.blocks().windows(2) {
            assert!(
                !(pair[0].is_text() && pair[1].is_text()),
                "adjacent text blocks: {pair:?}"
            );
        }
    }

    // ============ InsertBreak ============

    #[test]
    fn test_insert_break_splits_text() {
        let mut d = doc(vec![Block::text("hello world")]);
        let patch = d
            .apply(Cmd::InsertBreak {
                at: 5,
                duration_ms: DEFAULT_PAUSE_MS,
            })
            .unwrap();

        assert_eq!(
            d.blocks(),
            &[
                Block::text("hello"),
                Block::pause(500),
                Block::text(" world")
            ]
        );
        assert_eq!(patch.cursor, Some(6));
        assert_eq!(patch.version, 1);
        assert_no_adjacent_text(&d);
    }

    #[test]
    fn test_insert_break_at_text_start_drops_empty_piece() {
        let mut d = doc(vec![Block::text("abc")]);
        d.apply(Cmd::InsertBreak {
            at: 0,
            duration_ms: 500,
        })
        .unwrap();
        assert_eq!(d.blocks(), &[Block::pause(500), Block::text("abc")]);
    }

    #[test]
    fn test_insert_break_at_text_end_drops_empty_piece() {
        let mut d = doc(vec![Block::text("abc")]);
        let patch = d
            .apply(Cmd::InsertBreak {
                at: 3,
                duration_ms: 500,
            })
            .unwrap();
        assert_eq!(d.blocks(), &[Block::text("abc"), Block::pause(500)]);
        assert_eq!(patch.cursor, Some(4));
    }

    #[test]
    fn test_insert_break_at_token_boundaries() {
        let mut d = doc(vec![Block::text("ab"), Block::alias("x", "y")]);
        // Offset 2 resolves to the end of "ab"; the pause lands between.
        d.apply(Cmd::InsertBreak {
            at: 2,
            duration_ms: 500,
        })
        .unwrap();
        assert_eq!(
            d.blocks(),
            &[
                Block::text("ab"),
                Block::pause(500),
                Block::alias("x", "y")
            ]
        );

        // Offset 4 is now the end boundary of the alias token.
        let patch = d
            .apply(Cmd::InsertBreak {
                at: 4,
                duration_ms: 500,
            })
            .unwrap();
        assert_eq!(patch.cursor, Some(5));
        assert_eq!(
            d.blocks(),
            &[
                Block::text("ab"),
                Block::pause(500),
                Block::alias("x", "y"),
                Block::pause(500),
            ]
        );
    }

    #[test]
    fn test_insert_break_merges_fragmented_text_first() {
        // Free typing can leave adjacent text blocks behind; the split must
        // operate on the coalesced run.
        let mut d = doc(vec![Block::text("he"), Block::text("llo")]);
        d.apply(Cmd::InsertBreak {
            at: 3,
            duration_ms: 500,
        })
        .unwrap();
        assert_eq!(
            d.blocks(),
            &[Block::text("hel"), Block::pause(500), Block::text("lo")]
        );
        assert_no_adjacent_text(&d);
    }

    #[test]
    fn test_insert_break_beyond_document_fails_without_change() {
        let mut d = doc(vec![Block::text("ab")]);
        let before = d.clone();
        let err = d
            .apply(Cmd::InsertBreak {
                at: 9,
                duration_ms: 500,
            })
            .unwrap_err();
        assert_eq!(err, EditError::OffsetOutOfBounds { offset: 9 });
        assert!(!err.is_user_error());
        assert_eq!(d, before);
    }

    // ============ CreateAlias ============

    #[test]
    fn test_create_alias_in_middle_of_text() {
        let mut d = doc(vec![Block::text("hello world")]);
        let patch = d
            .apply(Cmd::CreateAlias {
                start: 6,
                end: 11,
                alias: "planet".into(),
            })
            .unwrap();

        assert_eq!(
            d.blocks(),
            &[Block::text("hello "), Block::alias("world", "planet")]
        );
        assert_eq!(patch.cursor, Some(7));
        assert_no_adjacent_text(&d);
    }

    #[test]
    fn test_create_alias_keeps_both_sides() {
        let mut d = doc(vec![Block::text("hello world")]);
        d.apply(Cmd::CreateAlias {
            start: 0,
            end: 5,
            alias: "hey".into(),
        })
        .unwrap();
        assert_eq!(
            d.blocks(),
            &[Block::alias("hello", "hey"), Block::text(" world")]
        );
    }

    #[test]
    fn test_create_alias_start_rolls_past_token_boundary() {
        let mut d = doc(vec![Block::text("ab"), Block::pause(500), Block::text("cd")]);
        // Offset 3 is the pause's end boundary; the selection really starts
        // at the front of "cd".
        d.apply(Cmd::CreateAlias {
            start: 3,
            end: 5,
            alias: "seedy".into(),
        })
        .unwrap();
        assert_eq!(
            d.blocks(),
            &[
                Block::text("ab"),
                Block::pause(500),
                Block::alias("cd", "seedy")
            ]
        );
    }

    #[test]
    fn test_create_alias_rejects_selection_spanning_blocks() {
        let mut d = doc(vec![Block::text("ab"), Block::pause(500), Block::text("cd")]);
        let err = d
            .apply(Cmd::CreateAlias {
                start: 1,
                end: 4,
                alias: "nope".into(),
            })
            .unwrap_err();
        assert_eq!(err, EditError::SelectionSpansBlocks);
        assert!(err.is_user_error());
    }

    #[test]
    fn test_create_alias_rejects_token_selection() {
        let mut d = doc(vec![Block::pause(500)]);
        let err = d
            .apply(Cmd::CreateAlias {
                start: 0,
                end: 1,
                alias: "pause".into(),
            })
            .unwrap_err();
        assert_eq!(err, EditError::SelectionOnToken);
    }

    #[test]
    fn test_create_alias_rejects_empty_alias() {
        let mut d = doc(vec![Block::text("abc")]);
        assert_eq!(
            d.apply(Cmd::CreateAlias {
                start: 0,
                end: 2,
                alias: String::new(),
            }),
            Err(EditError::EmptyAlias)
        );
    }

    #[test]
    fn test_create_alias_rejects_line_breaks() {
        let mut d = doc(vec![Block::text("ab\ncd")]);
        assert_eq!(
            d.apply(Cmd::CreateAlias {
                start: 1,
                end: 4,
                alias: "x".into(),
            }),
            Err(EditError::SelectionCrossesLineBreak)
        );
    }

    #[test]
    fn test_create_alias_rejects_long_selection() {
        let mut d = doc(vec![Block::text("a".repeat(40))]);
        assert_eq!(
            d.apply(Cmd::CreateAlias {
                start: 0,
                end: 31,
                alias: "x".into(),
            }),
            Err(EditError::SelectionTooLong {
                max: MAX_ALIAS_TEXT_LEN
            })
        );
    }

    // ============ Token editing ============

    #[test]
    fn test_edit_alias_replaces_payload() {
        let mut d = doc(vec![Block::alias("lit", "old")]);
        d.apply(Cmd::EditAlias {
            index: 0,
            alias: "new".into(),
        })
        .unwrap();
        assert_eq!(d.blocks(), &[Block::alias("lit", "new")]);
    }

    #[test]
    fn test_edit_alias_rejects_empty() {
        let mut d = doc(vec![Block::alias("lit", "old")]);
        assert_eq!(
            d.apply(Cmd::EditAlias {
                index: 0,
                alias: String::new(),
            }),
            Err(EditError::EmptyAlias)
        );
        assert_eq!(d.blocks(), &[Block::alias("lit", "old")]);
    }

    #[test]
    fn test_edit_alias_on_wrong_block_is_internal_error() {
        let mut d = doc(vec![Block::text("ab")]);
        let err = d
            .apply(Cmd::EditAlias {
                index: 0,
                alias: "x".into(),
            })
            .unwrap_err();
        assert_eq!(err, EditError::NotAnAlias { index: 0 });
        assert!(!err.is_user_error());
    }

    #[test]
    fn test_set_break_duration_clamps() {
        let mut d = doc(vec![Block::pause(500)]);
        d.apply(Cmd::SetBreakDuration {
            index: 0,
            duration_ms: 99_999,
        })
        .unwrap();
        assert_eq!(d.blocks(), &[Block::pause(3000)]);

        d.apply(Cmd::SetBreakDuration {
            index: 0,
            duration_ms: 0,
        })
        .unwrap();
        assert_eq!(d.blocks(), &[Block::pause(100)]);
    }

    // ============ Token removal ============

    #[test]
    fn test_remove_alias_reverts_to_text_and_merges() {
        let mut d = doc(vec![
            Block::text("a "),
            Block::alias("b", "bee"),
            Block::text(" c"),
        ]);
        d.apply(Cmd::RemoveAlias { index: 1 }).unwrap();
        assert_eq!(d.blocks(), &[Block::text("a b c")]);
        assert_no_adjacent_text(&d);
    }

    #[test]
    fn test_remove_break_deletes_block_and_merges() {
        let mut d = doc(vec![Block::text("a"), Block::pause(500), Block::text("b")]);
        d.apply(Cmd::RemoveBreak { index: 1 }).unwrap();
        assert_eq!(d.blocks(), &[Block::text("ab")]);
    }

    #[test]
    fn test_delete_token_alias_reverts_with_cursor_at_block_start() {
        let mut d = doc(vec![
            Block::text("ab"),
            Block::alias("x", "y"),
            Block::text("cd"),
        ]);
        let patch = d.apply(Cmd::DeleteToken { index: 1 }).unwrap();
        assert_eq!(d.blocks(), &[Block::text("abxcd")]);
        // Start of the converted block, in logical offsets.
        assert_eq!(patch.cursor, Some(2));
    }

    #[test]
    fn test_delete_token_break_removes_with_cursor_at_boundary() {
        let mut d = doc(vec![
            Block::text("ab"),
            Block::pause(500),
            Block::text("cd"),
        ]);
        let patch = d.apply(Cmd::DeleteToken { index: 1 }).unwrap();
        assert_eq!(d.blocks(), &[Block::text("abcd")]);
        assert_eq!(patch.cursor, Some(2));
    }

    #[test]
    fn test_delete_token_on_text_is_internal_error() {
        let mut d = doc(vec![Block::text("ab")]);
        let err = d.apply(Cmd::DeleteToken { index: 0 }).unwrap_err();
        assert_eq!(err, EditError::NotAToken { index: 0 });
    }

    // ============ delete_target ============

    #[test]
    fn test_delete_target_inside_text_is_native() {
        let d = doc(vec![Block::text("abc")]);
        let pos = d.find_position_by_offset(1).unwrap();
        assert_eq!(delete_target(&d, &pos, true), None);
        assert_eq!(delete_target(&d, &pos, false), None);
    }

    #[test]
    fn test_delete_target_backspace_at_text_start_targets_previous() {
        let d = doc(vec![Block::pause(500), Block::text("abc")]);
        // Offset 1 resolves to the pause's end boundary (earlier block).
        let pos = d.find_position_by_offset(1).unwrap();
        assert_eq!(pos.index, 0);
        assert!(pos.is_end);
        assert_eq!(delete_target(&d, &pos, true), Some(0));
    }

    #[test]
    fn test_delete_target_forward_at_text_end_targets_next() {
        let d = doc(vec![Block::text("abc"), Block::pause(500)]);
        let pos = d.find_position_by_offset(3).unwrap();
        assert_eq!(pos.index, 0);
        assert_eq!(delete_target(&d, &pos, false), Some(1));
    }

    #[test]
    fn test_delete_target_at_document_edges() {
        let d = doc(vec![Block::text("abc")]);
        let start = d.find_position_by_offset(0).unwrap();
        assert_eq!(delete_target(&d, &start, true), None);
        let end = d.find_position_by_offset(3).unwrap();
        assert_eq!(delete_target(&d, &end, false), None);
    }
}
