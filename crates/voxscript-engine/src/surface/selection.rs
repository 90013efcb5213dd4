//! Selection normalization and the surface ↔ document coordinate mapping.
//!
//! Logical offsets count text bytes, plus exactly 1 per atomic token and
//! per line-break marker, matching [`Block::logical_len`] on the document
//! side. The two rules must never diverge or every caret restoration would
//! drift.
//!
//! [`Block::logical_len`]: crate::editing::block::Block::logical_len

use crate::surface::{NodeId, NodeKind, Surface, SurfacePoint};

/// A selection resolved down to concrete leaf node/offset endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedRange {
    pub start: SurfacePoint,
    pub end: SurfacePoint,
    /// Whether the raw selection was collapsed when captured.
    pub collapsed: bool,
}

/// Read the surface's live selection and normalize it.
///
/// Returns `None` when there is no selection, when its start falls outside
/// the root, or when it is non-collapsed and its end falls outside the root.
pub fn selection_range_in_root(surface: &Surface) -> Option<NormalizedRange> {
    let root = surface.root();
    let raw = surface.selection()?;
    let collapsed = raw.is_collapsed();

    if !surface.contains(root, raw.start.node)
        || (!collapsed && !surface.contains(root, raw.end.node))
    {
        return None;
    }

    Some(NormalizedRange {
        start: optimize_position(surface, raw.start),
        end: optimize_position(surface, raw.end),
        collapsed,
    })
}

/// Descend a container/offset endpoint into the deepest concrete child.
///
/// An offset indexing a child descends into it at 0. An offset equal to the
/// child count descends into the last child, resolving to its text length,
/// its child count, or child count + 1 for a content-less embedded node.
pub fn optimize_position(surface: &Surface, mut point: SurfacePoint) -> SurfacePoint {
    loop {
        if surface.is_text(point.node) {
            break;
        }
        let children = surface.children(point.node);
        let Some(&last) = children.last() else {
            break;
        };
        if point.offset < children.len() {
            point = SurfacePoint::new(children[point.offset], 0);
        } else if point.offset == children.len() {
            let offset = if surface.is_text(last) {
                surface.text_len(last)
            } else {
                let count = surface.children(last).len();
                if count > 0 { count } else { count + 1 }
            };
            point = SurfacePoint::new(last, offset);
        } else {
            break;
        }
    }
    point
}

/// Map a surface point to its document-relative offset.
///
/// Walks the root's subtree in document order, skipping the interior of
/// atomic spans: text nodes contribute their length, atomic spans and
/// line-break markers contribute 1. Reaching the target adds the local
/// offset and stops. A target inside an atomic span resolves to the span's
/// own position. Monotonic in document order.
pub fn offset_in_root(surface: &Surface, node: NodeId, offset: usize) -> usize {
    let root = surface.root();
    if node == root {
        return offset;
    }
    let mut total = 0;
    offset_walk(surface, root, node, offset, &mut total);
    total
}

fn offset_walk(
    surface: &Surface,
    current: NodeId,
    target: NodeId,
    target_offset: usize,
    total: &mut usize,
) -> bool {
    for &child in surface.children(current) {
        if child == target {
            *total += target_offset;
            return true;
        }
        match surface.kind(child) {
            NodeKind::Text(text) => *total += text.len(),
            NodeKind::LineBreak => *total += 1,
            NodeKind::Element(_) => {
                if surface.is_atomic(child) {
                    if surface.contains(child, target) {
                        *total += target_offset;
                        return true;
                    }
                    *total += 1;
                } else if offset_walk(surface, child, target, target_offset, total) {
                    return true;
                }
            }
        }
    }
    false
}

/// Map a document-relative offset back to a concrete surface point: the
/// mapper run in reverse, used to restore the caret after a mutation.
///
/// Lands inside the text node holding the offset when there is one,
/// otherwise on the boundary leaf that follows it. `None` when the offset
/// lies beyond the rendered content.
pub fn resolve_offset(surface: &Surface, offset: usize) -> Option<SurfacePoint> {
    let root = surface.root();
    let mut remaining = offset;
    if let Some(point) = resolve_walk(surface, root, &mut remaining) {
        return Some(point);
    }
    (remaining == 0).then(|| SurfacePoint::new(root, surface.children(root).len()))
}

fn resolve_walk(surface: &Surface, current: NodeId, remaining: &mut usize) -> Option<SurfacePoint> {
    for &child in surface.children(current) {
        match surface.kind(child) {
            NodeKind::Text(text) => {
                if *remaining <= text.len() {
                    return Some(SurfacePoint::new(child, *remaining));
                }
                *remaining -= text.len();
            }
            NodeKind::LineBreak => {
                if *remaining == 0 {
                    return Some(SurfacePoint::new(child, 0));
                }
                *remaining -= 1;
            }
            NodeKind::Element(_) if surface.is_atomic(child) => {
                if *remaining == 0 {
                    return Some(optimize_position(surface, SurfacePoint::new(child, 0)));
                }
                *remaining -= 1;
            }
            NodeKind::Element(_) => {
                if let Some(point) = resolve_walk(surface, child, remaining) {
                    return Some(point);
                }
            }
        }
    }
    None
}

/// Locate the text leaf whose document span contains the byte range
/// `[from, to)`, returning the node and the range translated into its local
/// coordinates. Used for native character deletion, where the affected
/// character always lives inside a single text node.
pub(crate) fn locate_text_span(
    surface: &Surface,
    from: usize,
    to: usize,
) -> Option<(NodeId, usize, usize)> {
    let mut base = 0;
    locate_walk(surface, surface.root(), from, to, &mut base)
}

fn locate_walk(
    surface: &Surface,
    current: NodeId,
    from: usize,
    to: usize,
    base: &mut usize,
) -> Option<(NodeId, usize, usize)> {
    for &child in surface.children(current) {
        match surface.kind(child) {
            NodeKind::Text(text) => {
                let end = *base + text.len();
                if from >= *base && from < end && to <= end {
                    return Some((child, from - *base, to - *base));
                }
                *base = end;
            }
            NodeKind::LineBreak => *base += 1,
            NodeKind::Element(_) if surface.is_atomic(child) => *base += 1,
            NodeKind::Element(_) => {
                if let Some(found) = locate_walk(surface, child, from, to, base) {
                    return Some(found);
                }
            }
        }
    }
    None
}

/// Text covered by a normalized range, with line-break markers read as
/// `\n`, which is what the user visually has selected. Atomic spans contribute
/// their rendered text, like the platform's range stringification.
pub fn range_text(surface: &Surface, range: &NormalizedRange) -> String {
    let mut capture = Capture {
        out: String::new(),
        started: false,
        done: false,
    };
    collect_range_text(surface, surface.root(), range, &mut capture);
    capture.out
}

struct Capture {
    out: String,
    started: bool,
    done: bool,
}

fn collect_range_text(
    surface: &Surface,
    current: NodeId,
    range: &NormalizedRange,
    capture: &mut Capture,
) {
    for &child in surface.children(current) {
        if capture.done {
            return;
        }
        let is_start = child == range.start.node;
        let is_end = child == range.end.node;
        match surface.kind(child) {
            NodeKind::Text(text) => {
                let mut from = 0;
                let mut to = text.len();
                if is_start {
                    capture.started = true;
                    from = range.start.offset.min(text.len());
                }
                if is_end {
                    to = range.end.offset.min(text.len());
                    capture.done = true;
                }
                if capture.started && from <= to {
                    capture.out.push_str(&text[from..to]);
                }
            }
            NodeKind::LineBreak => {
                if is_start {
                    capture.started = true;
                }
                if is_end {
                    if capture.started && range.end.offset > 0 {
                        capture.out.push('\n');
                    }
                    capture.done = true;
                } else if capture.started {
                    capture.out.push('\n');
                }
            }
            NodeKind::Element(_) => {
                if is_start {
                    capture.started = true;
                }
                if is_end {
                    capture.done = true;
                } else {
                    collect_range_text(surface, child, range, capture);
                }
            }
        }
    }
}
