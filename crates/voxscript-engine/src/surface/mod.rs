//! The in-memory editable surface.
//!
//! Plays the role the platform's editable area plays for the editor core: a
//! tree of element / text / line-break nodes addressed by ids, carrying a
//! raw selection. The reconciler rebuilds it from the document, the mapper
//! translates its node/offset coordinates into logical offsets, and hosts
//! mutate its text directly for unmanaged keystrokes (which the read-back
//! later folds into the document).
//!
//! Node ids are only valid until the next [`Surface::reset`] (every
//! re-render). Holding one across a render is the same bug as holding a
//! detached platform node.

pub mod render;
pub mod selection;

/// Which block kind a rendered span stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Text,
    Alias,
    Break,
}

impl BlockTag {
    /// Alias and break spans are atomic: not text-editable from outside.
    pub fn is_editable(self) -> bool {
        matches!(self, BlockTag::Text)
    }
}

/// Index into the surface's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Attributes carried by an element node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ElementData {
    /// Block kind this span renders, if any.
    pub tag: Option<BlockTag>,
    /// Full alias payload, carried on the alias display child so the
    /// read-back can recover it from the ellipsized label.
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
    LineBreak,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A concrete point on the surface: for text nodes the offset is a byte
/// offset into the content, for elements it is a child index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfacePoint {
    pub node: NodeId,
    pub offset: usize,
}

impl SurfacePoint {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// The surface's raw selection, start ordered before end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSelection {
    pub start: SurfacePoint,
    pub end: SurfacePoint,
}

impl RawSelection {
    pub fn caret(point: SurfacePoint) -> Self {
        Self {
            start: point,
            end: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    nodes: Vec<Node>,
    selection: Option<RawSelection>,
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Element(ElementData::default()),
                parent: None,
                children: Vec::new(),
            }],
            selection: None,
        }
    }

    /// The editable root.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Drop every node except the root and clear the selection. All
    /// previously handed out ids are invalidated.
    pub fn reset(&mut self) {
        self.nodes.truncate(1);
        self.nodes[0].children.clear();
        self.selection = None;
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn create_element(&mut self, data: ElementData) -> NodeId {
        self.push_node(NodeKind::Element(data))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push_node(NodeKind::Text(text.into()))
    }

    pub fn create_line_break(&mut self) -> NodeId {
        self.push_node(NodeKind::LineBreak)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        let at = index.min(self.node(parent).children.len());
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.insert(at, child);
    }

    // ---- accessors ----

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Text(_))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Element(_))
    }

    pub fn is_line_break(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::LineBreak)
    }

    pub fn element_data(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id).kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<BlockTag> {
        self.element_data(id).and_then(|data| data.tag)
    }

    /// A span rendering an atomic token.
    pub fn is_atomic(&self, id: NodeId) -> bool {
        self.tag(id).is_some_and(|tag| !tag.is_editable())
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn text_len(&self, id: NodeId) -> usize {
        self.text(id).map_or(0, str::len)
    }

    /// Concatenated text of the node's subtree, in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::LineBreak => {}
            NodeKind::Element(_) => {
                for &child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
        }
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// True when `node` is `ancestor` or lies in its subtree.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.parent(id);
        }
        false
    }

    /// The closest atomic span at or above `node`, if any.
    pub fn atomic_ancestor(&self, node: NodeId) -> Option<NodeId> {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if self.is_atomic(id) {
                return Some(id);
            }
            cursor = self.parent(id);
        }
        None
    }

    /// The root child whose subtree holds `node` (or `node` itself when it
    /// is a root child).
    fn top_child_of(&self, node: NodeId) -> Option<NodeId> {
        let root = self.root();
        let mut cursor = node;
        while let Some(parent) = self.parent(cursor) {
            if parent == root {
                return Some(cursor);
            }
            cursor = parent;
        }
        None
    }

    // ---- selection ----

    pub fn selection(&self) -> Option<&RawSelection> {
        self.selection.as_ref()
    }

    pub fn set_selection(&mut self, selection: RawSelection) {
        self.selection = Some(selection);
    }

    pub fn set_caret(&mut self, point: SurfacePoint) {
        self.selection = Some(RawSelection::caret(point));
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    // ---- unmanaged text mutation (the platform-edit analog) ----

    /// Insert `text` at a surface point, splicing into an existing text
    /// node or creating a new one. Returns the caret position after the
    /// inserted text, or `None` when the point cannot host text (inside an
    /// atomic token, or a stale offset).
    pub fn insert_text_at(&mut self, point: SurfacePoint, text: &str) -> Option<SurfacePoint> {
        if self.atomic_ancestor(point.node).is_some() {
            return None;
        }
        if self.is_text(point.node) {
            let NodeKind::Text(content) = &mut self.node_mut(point.node).kind else {
                return None;
            };
            let at = point.offset.min(content.len());
            if !content.is_char_boundary(at) {
                return None;
            }
            content.insert_str(at, text);
            Some(SurfacePoint::new(point.node, at + text.len()))
        } else if self.is_line_break(point.node) {
            // Text cannot live inside a line break; it lands right before
            // the marker.
            let parent = self.parent(point.node)?;
            let index = self.index_in_parent(point.node)?;
            let node = self.create_text(text);
            self.insert_child(parent, index, node);
            Some(SurfacePoint::new(node, text.len()))
        } else {
            let node = self.create_text(text);
            self.insert_child(point.node, point.offset, node);
            Some(SurfacePoint::new(node, text.len()))
        }
    }

    /// Delete one character next to a caret inside a text node. Returns the
    /// new caret, or `None` when there is nothing to delete there (node
    /// edge, non-text node).
    pub fn delete_char(&mut self, point: SurfacePoint, backward: bool) -> Option<SurfacePoint> {
        let content = self.text(point.node)?;
        let offset = point.offset.min(content.len());
        if backward {
            let (start, _) = content[..offset].char_indices().next_back()?;
            let text = match &mut self.node_mut(point.node).kind {
                NodeKind::Text(text) => text,
                _ => return None,
            };
            text.replace_range(start..offset, "");
            Some(SurfacePoint::new(point.node, start))
        } else {
            let ch = content[offset..].chars().next()?;
            let end = offset + ch.len_utf8();
            let text = match &mut self.node_mut(point.node).kind {
                NodeKind::Text(text) => text,
                _ => return None,
            };
            text.replace_range(offset..end, "");
            Some(SurfacePoint::new(point.node, offset))
        }
    }

    /// Remove a byte range from a text node. Returns false when the node is
    /// not text or the range is not on character boundaries.
    pub fn delete_text_range(&mut self, node: NodeId, range: std::ops::Range<usize>) -> bool {
        match &mut self.node_mut(node).kind {
            NodeKind::Text(text) => {
                if range.end > text.len()
                    || range.start > range.end
                    || !text.is_char_boundary(range.start)
                    || !text.is_char_boundary(range.end)
                {
                    return false;
                }
                text.replace_range(range, "");
                true
            }
            _ => false,
        }
    }

    /// Remove everything between two points, the platform
    /// `deleteContents` analog: partially covered text nodes are trimmed,
    /// wholly covered root children (tokens included) are removed. Returns
    /// the collapsed caret position.
    pub fn delete_range_contents(
        &mut self,
        start: SurfacePoint,
        end: SurfacePoint,
    ) -> SurfacePoint {
        if start == end {
            return start;
        }

        // Fast path: both endpoints in one text node.
        if start.node == end.node && self.is_text(start.node) {
            if let NodeKind::Text(text) = &mut self.node_mut(start.node).kind {
                let from = floor_char_boundary(text, start.offset);
                let to = floor_char_boundary(text, end.offset.min(text.len()));
                if from < to {
                    text.replace_range(from..to, "");
                }
                let caret = SurfacePoint::new(start.node, from);
                self.selection = Some(RawSelection::caret(caret));
                return caret;
            }
        }

        let root = self.root();

        // Start side: keep a trimmed head when the endpoint is ordinary
        // text, otherwise the whole child falls inside the range.
        let (remove_from, caret) = if start.node == root {
            (start.offset, None)
        } else if self.is_text(start.node) && self.atomic_ancestor(start.node).is_none() {
            let index = self
                .top_child_of(start.node)
                .and_then(|top| self.index_in_parent(top))
                .unwrap_or(0);
            let at = match &mut self.node_mut(start.node).kind {
                NodeKind::Text(text) => {
                    let at = floor_char_boundary(text, start.offset);
                    text.truncate(at);
                    at
                }
                _ => 0,
            };
            (index + 1, Some(SurfacePoint::new(start.node, at)))
        } else {
            let index = self
                .top_child_of(start.node)
                .and_then(|top| self.index_in_parent(top))
                .unwrap_or(0);
            (index, None)
        };

        // End side: trim the tail of an ordinary text endpoint, otherwise
        // remove through the covering child.
        let remove_to = if end.node == root {
            end.offset
        } else if self.is_text(end.node) && self.atomic_ancestor(end.node).is_none() {
            let index = self
                .top_child_of(end.node)
                .and_then(|top| self.index_in_parent(top))
                .unwrap_or(0);
            if let NodeKind::Text(text) = &mut self.node_mut(end.node).kind {
                let at = floor_char_boundary(text, end.offset.min(text.len()));
                text.replace_range(..at, "");
            }
            index
        } else {
            self.top_child_of(end.node)
                .and_then(|top| self.index_in_parent(top))
                .map_or(0, |i| i + 1)
        };

        let remove_to = remove_to.min(self.node(root).children.len());
        if remove_from < remove_to {
            let removed: Vec<NodeId> = self
                .node_mut(root)
                .children
                .drain(remove_from..remove_to)
                .collect();
            for id in removed {
                self.node_mut(id).parent = None;
            }
        }

        let caret = caret.unwrap_or_else(|| SurfacePoint::new(root, remove_from));
        self.selection = Some(RawSelection::caret(caret));
        caret
    }
}

fn floor_char_boundary(text: &str, mut offset: usize) -> usize {
    offset = offset.min(text.len());
    while offset > 0 && !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}
