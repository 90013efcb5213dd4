use std::time::Instant;

use crate::editing::block::{Block, MAX_ALIAS_TEXT_LEN, merge_plain_text};
use crate::editing::commands::{Cmd, EditError, delete_target};
use crate::editing::document::Document;
use crate::editing::resync::ResyncQueue;
use crate::surface::render::{is_valid_block_node, read_back, render, set_cursor_by_offset};
use crate::surface::selection::{
    NormalizedRange, locate_text_span, offset_in_root, range_text, resolve_offset,
    selection_range_in_root,
};
use crate::surface::{NodeId, RawSelection, Surface};
use crate::units::{DEFAULT_PAUSE_MS, ms_to_s};

/// Where user-facing warnings go. The hosting shell renders them however it
/// renders transient messages.
pub trait Notify {
    fn warn(&mut self, message: &str);
}

/// Routes warnings to the log facade; for headless hosts and tests that do
/// not care.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notify for LogNotifier {
    fn warn(&mut self, message: &str) {
        log::warn!("{message}");
    }
}

/// What the floating editor is working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    Idle,
    /// `index` is `None` while a fresh alias is being created over a
    /// selection, `Some` when an existing token is being edited.
    EditingAlias { index: Option<usize> },
    EditingBreak { index: usize },
}

/// Wires user gestures to the document mutator and the surface reconciler.
///
/// The controller is the sole writer of the document: every committing
/// transition goes through [`Document::apply`] and ends with a full
/// re-render plus caret restoration; every cancelling transition clears the
/// transient state without touching the document. Unmanaged edits (typing,
/// pasting, native character deletion) mutate the surface directly and are
/// folded back into the document by the debounced read-back.
pub struct EditController<N: Notify> {
    doc: Document,
    surface: Surface,
    notifier: N,
    resync: ResyncQueue,
    state: EditState,
    /// Selection captured on gesture-down, before a toolbar click moves
    /// focus and the platform drops it.
    pending_range: Option<NormalizedRange>,
    /// Root offsets of the selection a fresh alias is being created over.
    pending_alias: Option<(usize, usize)>,
    /// Floating-editor field values.
    alias_text: String,
    break_seconds: f64,
    default_pause_ms: u64,
}

impl<N: Notify> EditController<N> {
    pub fn new(doc: Document, notifier: N) -> Self {
        let mut controller = Self {
            doc,
            surface: Surface::new(),
            notifier,
            resync: ResyncQueue::default(),
            state: EditState::Idle,
            pending_range: None,
            pending_alias: None,
            alias_text: String::new(),
            break_seconds: 0.0,
            default_pause_ms: DEFAULT_PAUSE_MS,
        };
        render(&mut controller.surface, &controller.doc);
        controller
    }

    /// Override the pause duration used for fresh break tokens.
    pub fn set_default_pause_ms(&mut self, duration_ms: u64) {
        self.default_pause_ms = crate::units::clamp_pause_ms(duration_ms);
    }

    // ---- read access for the hosting shell ----

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    /// The floating editor is open.
    pub fn is_editor_open(&self) -> bool {
        self.state != EditState::Idle
    }

    /// The floating editor addresses an existing token rather than a fresh
    /// creation.
    pub fn is_update(&self) -> bool {
        matches!(
            self.state,
            EditState::EditingAlias { index: Some(_) } | EditState::EditingBreak { .. }
        )
    }

    pub fn alias_text(&self) -> &str {
        &self.alias_text
    }

    pub fn set_alias_text(&mut self, text: impl Into<String>) {
        self.alias_text = text.into();
    }

    pub fn break_seconds(&self) -> f64 {
        self.break_seconds
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    // ---- caret and selection plumbing for the host ----

    /// The collapsed caret's logical offset, if any.
    pub fn caret_offset(&self) -> Option<usize> {
        let range = selection_range_in_root(&self.surface)?;
        range
            .collapsed
            .then(|| offset_in_root(&self.surface, range.start.node, range.start.offset))
    }

    /// Both selection endpoints as logical offsets.
    pub fn selection_offsets(&self) -> Option<(usize, usize)> {
        let range = selection_range_in_root(&self.surface)?;
        Some((
            offset_in_root(&self.surface, range.start.node, range.start.offset),
            offset_in_root(&self.surface, range.end.node, range.end.offset),
        ))
    }

    pub fn set_caret_by_offset(&mut self, offset: usize) {
        set_cursor_by_offset(&mut self.surface, offset);
    }

    /// Select between two logical offsets (any order).
    pub fn select_offsets(&mut self, anchor: usize, head: usize) {
        let (from, to) = if anchor <= head {
            (anchor, head)
        } else {
            (head, anchor)
        };
        if let (Some(start), Some(end)) = (
            resolve_offset(&self.surface, from),
            resolve_offset(&self.surface, to),
        ) {
            self.surface.set_selection(RawSelection { start, end });
        }
    }

    /// Capture the live selection before a toolbar gesture steals it.
    pub fn capture_selection(&mut self) {
        self.pending_range = selection_range_in_root(&self.surface);
    }

    // ---- token operations ----

    /// Insert a pause token at the captured caret.
    pub fn add_break(&mut self) {
        let Some(range) = self.pending_range else {
            self.warn(&EditError::NoCaret);
            return;
        };
        if !range.collapsed {
            self.warn(&EditError::SelectionNotCollapsed);
            return;
        }

        let at = offset_in_root(&self.surface, range.start.node, range.start.offset);
        self.sync_now();
        self.commit(Cmd::InsertBreak {
            at,
            duration_ms: self.default_pause_ms,
        });
    }

    /// Validate the captured selection and open the alias editor over it.
    pub fn open_add_alias_popover(&mut self) {
        let Some(range) = self.pending_range else {
            self.warn(&EditError::NoSelection);
            return;
        };
        if range.collapsed {
            self.warn(&EditError::NoSelection);
            return;
        }

        let selected = range_text(&self.surface, &range);
        if selected.contains('\n') {
            self.warn(&EditError::SelectionCrossesLineBreak);
            return;
        }
        if selected.chars().count() > MAX_ALIAS_TEXT_LEN {
            self.warn(&EditError::SelectionTooLong {
                max: MAX_ALIAS_TEXT_LEN,
            });
            return;
        }

        let start = offset_in_root(&self.surface, range.start.node, range.start.offset);
        let end = offset_in_root(&self.surface, range.end.node, range.end.offset);
        self.sync_now();

        // Refuse here rather than at confirm time when the selection mixes
        // tokens in; the merged view is what the alias will be cut from.
        let merged = Document::from_blocks(merge_plain_text(self.doc.blocks().to_vec()));
        match merged.select_range_by_offsets(start, end) {
            Some(resolved) if resolved.start.index == resolved.end.index => {}
            Some(_) => {
                self.warn(&EditError::SelectionSpansBlocks);
                return;
            }
            None => {
                log::error!("selection offsets {start}..{end} do not resolve in the document");
                return;
            }
        }

        self.pending_alias = Some((start, end));
        self.alias_text.clear();
        self.state = EditState::EditingAlias { index: None };
    }

    /// Open the floating editor on an existing token span.
    pub fn open_edit(&mut self, target: NodeId) {
        self.sync_now();
        let root = self.surface.root();
        let Some(index) = self
            .surface
            .children(root)
            .iter()
            .filter(|&&child| is_valid_block_node(&self.surface, child))
            .position(|&child| child == target)
        else {
            return;
        };

        match self.doc.blocks().get(index) {
            Some(Block::Alias { alias, .. }) => {
                self.alias_text = alias.clone();
                self.state = EditState::EditingAlias { index: Some(index) };
            }
            Some(Block::Break { duration_ms }) => {
                self.break_seconds = ms_to_s(*duration_ms);
                self.state = EditState::EditingBreak { index };
            }
            _ => {}
        }
    }

    /// Confirm the alias editor: create over the pending selection, or
    /// rewrite the token being edited.
    pub fn confirm_alias(&mut self) {
        match self.state {
            EditState::EditingAlias { index: Some(index) } => {
                let alias = self.alias_text.clone();
                if self.commit(Cmd::EditAlias { index, alias }) {
                    self.close_editor();
                }
            }
            EditState::EditingAlias { index: None } => {
                let Some((start, end)) = self.pending_alias else {
                    log::error!("alias confirmation without a pending selection");
                    return;
                };
                let alias = self.alias_text.clone();
                if self.commit(Cmd::CreateAlias { start, end, alias }) {
                    self.close_editor();
                }
            }
            _ => {}
        }
    }

    /// Convert the alias being edited back to plain text.
    pub fn remove_alias(&mut self) {
        if let EditState::EditingAlias { index: Some(index) } = self.state {
            self.commit(Cmd::RemoveAlias { index });
            self.close_editor();
        }
    }

    /// Delete the pause being edited.
    pub fn remove_break(&mut self) {
        if let EditState::EditingBreak { index } = self.state {
            self.commit(Cmd::RemoveBreak { index });
            self.close_editor();
        }
    }

    /// Change the duration of the pause being edited. The editor stays
    /// open; the field value reflects the clamped duration.
    pub fn change_break(&mut self, seconds: f64) {
        if let EditState::EditingBreak { index } = self.state {
            let duration_ms = crate::units::s_to_ms(seconds);
            if self.commit(Cmd::SetBreakDuration { index, duration_ms })
                && let Some(Block::Break { duration_ms }) = self.doc.blocks().get(index)
            {
                self.break_seconds = ms_to_s(*duration_ms);
            }
        }
    }

    /// Close the floating editor, discarding any pending creation.
    pub fn close_editor(&mut self) {
        self.state = EditState::Idle;
        self.pending_alias = None;
        self.alias_text.clear();
        self.break_seconds = 0.0;
    }

    // ---- unmanaged edits ----

    /// Type text at the caret (replacing a selection if one is active). The
    /// surface leads; the document catches up on the next read-back.
    pub fn handle_text_input(&mut self, text: &str, now: Instant) {
        let Some(range) = selection_range_in_root(&self.surface) else {
            return;
        };
        let caret = if range.collapsed {
            range.start
        } else {
            self.surface.delete_range_contents(range.start, range.end)
        };
        if let Some(after) = self.surface.insert_text_at(caret, text) {
            self.surface.set_caret(after);
            self.resync.schedule(now);
        }
    }

    /// Backspace/Delete with a collapsed caret. Deletions targeting an
    /// atomic token are intercepted (the platform would otherwise eat one
    /// visual character out of it); plain text deletion stays native.
    pub fn handle_delete_key(&mut self, backward: bool, now: Instant) {
        let Some(range) = selection_range_in_root(&self.surface) else {
            return;
        };
        if !range.collapsed {
            return;
        }

        let offset = offset_in_root(&self.surface, range.start.node, range.start.offset);
        // The document may lag behind recent keystrokes; fold them in
        // before resolving what the deletion targets.
        self.sync_now();

        let Some(position) = self.doc.find_position_by_offset(offset) else {
            log::error!("caret offset {offset} does not resolve in the document");
            return;
        };

        match delete_target(&self.doc, &position, backward) {
            Some(index)
                if self
                    .doc
                    .blocks()
                    .get(index)
                    .is_some_and(Block::is_atomic) =>
            {
                self.commit(Cmd::DeleteToken { index });
            }
            _ => self.native_delete(offset, backward, now),
        }
    }

    /// Native single-character deletion on the surface.
    fn native_delete(&mut self, offset: usize, backward: bool, now: Instant) {
        // The sync above put the document in step with the surface, so the
        // affected character can be found through document coordinates.
        let (from, to) = if backward {
            (self.doc.prev_offset(offset), offset)
        } else {
            (offset, self.doc.next_offset(offset))
        };
        if from == to {
            return;
        }
        if let Some((node, local_from, local_to)) = locate_text_span(&self.surface, from, to)
            && self.surface.delete_text_range(node, local_from..local_to)
        {
            self.surface
                .set_caret(crate::surface::SurfacePoint::new(node, local_from));
            self.resync.schedule(now);
        }
    }

    /// Plain-text paste: carriage returns are stripped, the selection is
    /// replaced, and the document catches up on the next read-back.
    pub fn handle_paste(&mut self, text: &str, now: Instant) {
        let Some(range) = selection_range_in_root(&self.surface) else {
            log::error!("paste without an active selection");
            return;
        };
        let pasted = text.replace('\r', "");
        let caret = if range.collapsed {
            range.start
        } else {
            self.surface.delete_range_contents(range.start, range.end)
        };
        if let Some(after) = self.surface.insert_text_at(caret, &pasted) {
            self.surface.set_caret(after);
            self.resync.schedule(now);
        }
    }

    // ---- read-back ----

    /// Fire the read-back if its window has elapsed.
    pub fn tick(&mut self, now: Instant) {
        if self.resync.take_due(now) {
            self.sync_doc();
        }
    }

    /// When the host should next call [`tick`](Self::tick), if a read-back
    /// is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.resync.deadline()
    }

    /// Cancel any pending read-back and synchronize immediately.
    pub fn force_sync(&mut self) {
        self.sync_now();
    }

    fn sync_now(&mut self) {
        self.resync.cancel();
        self.sync_doc();
    }

    fn sync_doc(&mut self) {
        let blocks = read_back(&self.surface);
        if blocks != self.doc.blocks() {
            self.doc.replace_blocks(blocks);
        }
    }

    // ---- internals ----

    /// Apply a command; on success re-render and restore the caret. Returns
    /// whether the command was applied.
    fn commit(&mut self, cmd: Cmd) -> bool {
        match self.doc.apply(cmd) {
            Ok(patch) => {
                render(&mut self.surface, &self.doc);
                if let Some(offset) = patch.cursor {
                    set_cursor_by_offset(&mut self.surface, offset);
                }
                // Node ids from before the render are dead now.
                self.pending_range = None;
                self.resync.cancel();
                true
            }
            Err(error) => {
                self.warn(&error);
                false
            }
        }
    }

    fn warn(&mut self, error: &EditError) {
        if error.is_user_error() {
            self.notifier.warn(&error.to_string());
        } else {
            log::error!("edit rejected: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Collects warnings so tests can assert on them.
    #[derive(Debug, Default)]
    struct TestNotifier {
        warnings: Vec<String>,
    }

    impl Notify for TestNotifier {
        fn warn(&mut self, message: &str) {
            self.warnings.push(message.to_string());
        }
    }

    fn controller(blocks: Vec<Block>) -> EditController<TestNotifier> {
        EditController::new(Document::from_blocks(blocks), TestNotifier::default())
    }

    // ============ Pause insertion ============

    #[test]
    fn test_add_break_without_captured_caret_warns() {
        let mut ctl = controller(vec![Block::text("hello")]);
        ctl.add_break();
        assert_eq!(ctl.notifier().warnings.len(), 1);
        assert_eq!(ctl.document().blocks(), &[Block::text("hello")]);
    }

    #[test]
    fn test_add_break_splits_at_caret_and_restores_cursor() {
        let mut ctl = controller(vec![Block::text("hello world")]);
        ctl.set_caret_by_offset(5);
        ctl.capture_selection();
        ctl.add_break();

        assert_eq!(
            ctl.document().blocks(),
            &[
                Block::text("hello"),
                Block::pause(500),
                Block::text(" world")
            ]
        );
        assert_eq!(ctl.caret_offset(), Some(6));
        assert!(ctl.notifier().warnings.is_empty());
    }

    #[test]
    fn test_add_break_rejects_non_collapsed_selection() {
        let mut ctl = controller(vec![Block::text("hello")]);
        ctl.select_offsets(1, 3);
        ctl.capture_selection();
        ctl.add_break();
        assert_eq!(ctl.notifier().warnings.len(), 1);
        assert_eq!(ctl.document().blocks(), &[Block::text("hello")]);
    }

    #[test]
    fn test_add_break_uses_configured_default_pause() {
        let mut ctl = controller(vec![Block::text("ab")]);
        ctl.set_default_pause_ms(1200);
        ctl.set_caret_by_offset(1);
        ctl.capture_selection();
        ctl.add_break();
        assert_eq!(
            ctl.document().blocks(),
            &[Block::text("a"), Block::pause(1200), Block::text("b")]
        );
    }

    // ============ Alias creation ============

    #[test]
    fn test_alias_creation_flow() {
        let mut ctl = controller(vec![Block::text("hello world")]);
        ctl.select_offsets(6, 11);
        ctl.capture_selection();
        ctl.open_add_alias_popover();
        assert_eq!(ctl.state(), EditState::EditingAlias { index: None });
        assert!(!ctl.is_update());

        ctl.set_alias_text("planet");
        ctl.confirm_alias();

        assert_eq!(
            ctl.document().blocks(),
            &[Block::text("hello "), Block::alias("world", "planet")]
        );
        assert_eq!(ctl.state(), EditState::Idle);
        assert_eq!(ctl.caret_offset(), Some(7));
    }

    #[test]
    fn test_alias_confirm_with_empty_text_keeps_editor_open() {
        let mut ctl = controller(vec![Block::text("hello world")]);
        ctl.select_offsets(0, 5);
        ctl.capture_selection();
        ctl.open_add_alias_popover();
        ctl.confirm_alias();

        assert_eq!(ctl.notifier().warnings.len(), 1);
        assert_eq!(ctl.state(), EditState::EditingAlias { index: None });
        assert_eq!(ctl.document().blocks(), &[Block::text("hello world")]);
    }

    #[test]
    fn test_alias_over_token_selection_is_refused_at_open() {
        let mut ctl = controller(vec![
            Block::text("ab"),
            Block::pause(500),
            Block::text("cd"),
        ]);
        ctl.select_offsets(1, 4);
        ctl.capture_selection();
        ctl.open_add_alias_popover();

        assert_eq!(ctl.notifier().warnings.len(), 1);
        assert_eq!(ctl.state(), EditState::Idle);
    }

    #[test]
    fn test_alias_selection_with_no_capture_warns() {
        let mut ctl = controller(vec![Block::text("hello")]);
        ctl.open_add_alias_popover();
        assert_eq!(ctl.notifier().warnings.len(), 1);
    }

    // ============ Editing existing tokens ============

    #[test]
    fn test_open_edit_on_alias_span_loads_fields() {
        let mut ctl = controller(vec![Block::text("a"), Block::alias("b", "bee")]);
        let root = ctl.surface().root();
        let alias_span = ctl.surface().children(root)[1];
        ctl.open_edit(alias_span);

        assert_eq!(ctl.state(), EditState::EditingAlias { index: Some(1) });
        assert!(ctl.is_update());
        assert_eq!(ctl.alias_text(), "bee");

        ctl.set_alias_text("buzz");
        ctl.confirm_alias();
        assert_eq!(
            ctl.document().blocks(),
            &[Block::text("a"), Block::alias("b", "buzz")]
        );
    }

    #[test]
    fn test_open_edit_on_break_span_and_change_duration() {
        let mut ctl = controller(vec![Block::pause(500), Block::text("x")]);
        let root = ctl.surface().root();
        let break_span = ctl.surface().children(root)[0];
        ctl.open_edit(break_span);

        assert_eq!(ctl.state(), EditState::EditingBreak { index: 0 });
        assert_eq!(ctl.break_seconds(), 0.5);

        ctl.change_break(9.9);
        assert_eq!(ctl.document().blocks()[0], Block::pause(3000));
        assert_eq!(ctl.break_seconds(), 3.0);
        // The editor stays open for further adjustment.
        assert!(ctl.is_editor_open());
    }

    #[test]
    fn test_open_edit_on_text_span_is_ignored() {
        let mut ctl = controller(vec![Block::text("plain")]);
        let root = ctl.surface().root();
        let text_span = ctl.surface().children(root)[0];
        ctl.open_edit(text_span);
        assert_eq!(ctl.state(), EditState::Idle);
    }

    #[test]
    fn test_remove_alias_via_editor() {
        let mut ctl = controller(vec![
            Block::text("a "),
            Block::alias("b", "bee"),
            Block::text(" c"),
        ]);
        let root = ctl.surface().root();
        let alias_span = ctl.surface().children(root)[1];
        ctl.open_edit(alias_span);
        ctl.remove_alias();

        assert_eq!(ctl.document().blocks(), &[Block::text("a b c")]);
        assert_eq!(ctl.state(), EditState::Idle);
    }

    #[test]
    fn test_remove_break_via_editor() {
        let mut ctl = controller(vec![
            Block::text("a"),
            Block::pause(500),
            Block::text("b"),
        ]);
        let root = ctl.surface().root();
        let break_span = ctl.surface().children(root)[1];
        ctl.open_edit(break_span);
        ctl.remove_break();

        assert_eq!(ctl.document().blocks(), &[Block::text("ab")]);
    }

    #[test]
    fn test_close_editor_discards_pending_creation() {
        let mut ctl = controller(vec![Block::text("hello world")]);
        ctl.select_offsets(0, 5);
        ctl.capture_selection();
        ctl.open_add_alias_popover();
        ctl.set_alias_text("hey");
        ctl.close_editor();

        assert_eq!(ctl.state(), EditState::Idle);
        assert_eq!(ctl.alias_text(), "");
        // Nothing was committed.
        assert_eq!(ctl.document().blocks(), &[Block::text("hello world")]);
    }

    // ============ Keyboard deletion ============

    #[test]
    fn test_backspace_after_alias_reverts_it_to_text() {
        let mut ctl = controller(vec![
            Block::text("ab"),
            Block::alias("x", "why"),
            Block::text("cd"),
        ]);
        // Caret immediately after the alias token.
        ctl.set_caret_by_offset(3);
        ctl.handle_delete_key(true, Instant::now());

        assert_eq!(ctl.document().blocks(), &[Block::text("abxcd")]);
        // Caret at the start of the converted text.
        assert_eq!(ctl.caret_offset(), Some(2));
    }

    #[test]
    fn test_forward_delete_before_break_removes_it() {
        let mut ctl = controller(vec![
            Block::text("ab"),
            Block::pause(500),
            Block::text("cd"),
        ]);
        // Caret at the end of "ab", right before the pause.
        ctl.set_caret_by_offset(2);
        ctl.handle_delete_key(false, Instant::now());

        assert_eq!(ctl.document().blocks(), &[Block::text("abcd")]);
        assert_eq!(ctl.caret_offset(), Some(2));
    }

    #[test]
    fn test_delete_inside_text_stays_native() {
        let now = Instant::now();
        let mut ctl = controller(vec![Block::text("abc"), Block::pause(500)]);
        ctl.set_caret_by_offset(2);
        ctl.handle_delete_key(true, now);

        // The surface took the edit; the document follows on the tick.
        assert_eq!(ctl.document().blocks()[0], Block::text("abc"));
        ctl.tick(now + Duration::from_millis(250));
        assert_eq!(
            ctl.document().blocks(),
            &[Block::text("ac"), Block::pause(500)]
        );
        assert_eq!(ctl.caret_offset(), Some(1));
    }

    #[test]
    fn test_backspace_at_document_start_is_noop() {
        let mut ctl = controller(vec![Block::text("abc")]);
        ctl.set_caret_by_offset(0);
        ctl.handle_delete_key(true, Instant::now());
        assert_eq!(ctl.document().blocks(), &[Block::text("abc")]);
    }

    // ============ Typing and read-back ============

    #[test]
    fn test_typing_debounces_into_one_read_back() {
        let t0 = Instant::now();
        let mut ctl = controller(vec![Block::text("ab")]);
        ctl.set_caret_by_offset(2);
        ctl.handle_text_input("c", t0);
        ctl.handle_text_input("d", t0 + Duration::from_millis(50));

        // Still coalescing: the document lags.
        ctl.tick(t0 + Duration::from_millis(100));
        assert_eq!(ctl.document().blocks(), &[Block::text("ab")]);
        assert_eq!(ctl.document().version(), 0);

        ctl.tick(t0 + Duration::from_millis(300));
        assert_eq!(ctl.document().blocks(), &[Block::text("abcd")]);
        assert_eq!(ctl.document().version(), 1);
    }

    #[test]
    fn test_typing_into_token_interior_is_refused() {
        let mut ctl = controller(vec![Block::pause(500)]);
        // Land the caret on the token boundary; the insert goes nowhere
        // because the resolved leaf sits inside the non-editable span.
        ctl.set_caret_by_offset(0);
        ctl.handle_text_input("x", Instant::now());
        ctl.force_sync();
        assert_eq!(ctl.document().blocks(), &[Block::pause(500)]);
    }

    #[test]
    fn test_mutation_before_debounce_fires_sees_fresh_text() {
        let t0 = Instant::now();
        let mut ctl = controller(vec![Block::text("ab")]);
        ctl.set_caret_by_offset(2);
        ctl.handle_text_input("cd", t0);

        // Insert a pause before the read-back window elapses: the split
        // must happen in "abcd", not the stale "ab".
        ctl.capture_selection();
        ctl.add_break();

        assert_eq!(
            ctl.document().blocks(),
            &[Block::text("abcd"), Block::pause(500)]
        );
    }

    // ============ Paste ============

    #[test]
    fn test_paste_strips_carriage_returns() {
        let t0 = Instant::now();
        let mut ctl = controller(vec![Block::text("xy")]);
        ctl.set_caret_by_offset(1);
        ctl.handle_paste("a\r\nb", t0);
        ctl.tick(t0 + Duration::from_millis(250));

        assert_eq!(ctl.document().blocks(), &[Block::text("xa\nby")]);
    }

    #[test]
    fn test_paste_replaces_selection() {
        let t0 = Instant::now();
        let mut ctl = controller(vec![Block::text("hello world")]);
        ctl.select_offsets(5, 11);
        ctl.handle_paste(" there", t0);
        ctl.tick(t0 + Duration::from_millis(250));

        assert_eq!(ctl.document().blocks(), &[Block::text("hello there")]);
    }
}
