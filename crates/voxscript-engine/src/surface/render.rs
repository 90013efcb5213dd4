//! Rebuilds the surface from the document and reads it back.
//!
//! The surface is a derived view: after any committed mutation it is
//! rebuilt wholesale from the block list and the caret is restored from the
//! patch. In the other direction, [`read_back`] reconstructs a block list
//! from whatever the unmanaged edits left in the root.

use crate::editing::block::{Block, MAX_RENDER_ALIAS_LEN, ellipsis};
use crate::editing::document::Document;
use crate::surface::selection::resolve_offset;
use crate::surface::{BlockTag, ElementData, NodeId, NodeKind, Surface};
use crate::units::{DEFAULT_PAUSE_MS, ms_to_s, s_to_ms};

/// Rebuild the root's children from the document.
///
/// Rendering the same document twice produces structurally identical
/// surfaces.
pub fn render(surface: &mut Surface, doc: &Document) {
    surface.reset();
    let root = surface.root();
    for block in doc.blocks() {
        let node = render_block(surface, block);
        surface.append_child(root, node);
    }
    if !doc.is_empty() {
        ensure_line_break_at_end(surface);
    }
}

fn render_block(surface: &mut Surface, block: &Block) -> NodeId {
    match block {
        Block::Text { text } => {
            let span = surface.create_element(ElementData {
                tag: Some(BlockTag::Text),
                content: None,
            });
            let content = surface.create_text(text.clone());
            surface.append_child(span, content);
            span
        }
        Block::Break { duration_ms } => {
            let span = surface.create_element(ElementData {
                tag: Some(BlockTag::Break),
                content: None,
            });
            // Decorative icon slot ahead of the duration label.
            let icon = surface.create_element(ElementData::default());
            let label = surface.create_text(format_pause_label(*duration_ms));
            surface.append_child(span, icon);
            surface.append_child(span, label);
            span
        }
        Block::Alias { text, alias } => {
            let span = surface.create_element(ElementData {
                tag: Some(BlockTag::Alias),
                content: None,
            });
            let literal = surface.create_element(ElementData::default());
            let literal_text = surface.create_text(text.clone());
            surface.append_child(literal, literal_text);
            // The display child shows a capped label but carries the full
            // alias so the read-back never loses the tail.
            let display = surface.create_element(ElementData {
                tag: None,
                content: Some(alias.clone()),
            });
            let display_text = surface.create_text(ellipsis(alias, MAX_RENDER_ALIAS_LEN));
            surface.append_child(display, display_text);
            surface.append_child(span, literal);
            surface.append_child(span, display);
            span
        }
    }
}

/// Keep a line-break marker as the root's last child so the caret has a
/// stable resting place at the very end of the narration.
pub fn ensure_line_break_at_end(surface: &mut Surface) {
    let root = surface.root();
    let last = surface.children(root).last().copied();
    if last.is_none_or(|id| !surface.is_line_break(id)) {
        let br = surface.create_line_break();
        surface.append_child(root, br);
    }
}

/// Duration label rendered inside a pause span.
pub fn format_pause_label(duration_ms: u64) -> String {
    format!("{:.1}s", ms_to_s(duration_ms))
}

fn parse_pause_label(label: &str) -> Option<u64> {
    let label = label.trim();
    let label = label.strip_suffix('s').unwrap_or(label);
    label.parse::<f64>().ok().map(s_to_ms)
}

/// Collapse the caret to a logical document offset, resolving it through
/// the mapper run in reverse.
pub fn set_cursor_by_offset(surface: &mut Surface, offset: usize) {
    match resolve_offset(surface, offset) {
        Some(point) => surface.set_caret(point),
        None => log::error!("cursor target {offset} does not resolve on the surface"),
    }
}

/// A root child that counts as one block during read-back and click
/// hit-testing: a non-empty text node (typing and pasting leave those
/// behind) or a span carrying a block tag. Line-break markers and untagged
/// spans do not count.
pub fn is_valid_block_node(surface: &Surface, id: NodeId) -> bool {
    match surface.kind(id) {
        NodeKind::Text(text) => !text.is_empty(),
        NodeKind::Element(data) => data.tag.is_some(),
        NodeKind::LineBreak => false,
    }
}

/// Scan the root's children back into a block list, one block per valid
/// block node. The indices of the produced blocks line up with the valid
/// nodes, which is what lets a click on a span find its block.
pub fn read_back(surface: &Surface) -> Vec<Block> {
    let root = surface.root();
    let mut blocks = Vec::new();
    for &child in surface.children(root) {
        if !is_valid_block_node(surface, child) {
            continue;
        }
        match surface.kind(child) {
            NodeKind::Text(text) => blocks.push(Block::text(text.clone())),
            NodeKind::Element(data) => match data.tag {
                Some(BlockTag::Break) => {
                    let label = surface.text_content(child);
                    let duration_ms = parse_pause_label(&label).unwrap_or_else(|| {
                        log::warn!("unreadable pause label {label:?}, using the default pause");
                        DEFAULT_PAUSE_MS
                    });
                    blocks.push(Block::pause(duration_ms));
                }
                Some(BlockTag::Alias) if surface.children(child).len() == 2 => {
                    let literal = surface.children(child)[0];
                    let display = surface.children(child)[1];
                    let alias = surface
                        .element_data(display)
                        .and_then(|data| data.content.clone())
                        .unwrap_or_else(|| surface.text_content(display));
                    blocks.push(Block::alias(surface.text_content(literal), alias));
                }
                // A mangled alias span degrades to its visible text.
                Some(_) => blocks.push(Block::text(surface.text_content(child))),
                None => {}
            },
            NodeKind::LineBreak => {}
        }
    }
    blocks
}
