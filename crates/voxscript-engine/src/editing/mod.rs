/*!
 * # Editing Core
 *
 * The narration script is a list of typed [`Block`]s (plain text plus
 * atomic pause/alias tokens) owned by a [`Document`] that is the single
 * source of truth. The architecture follows a few rules:
 *
 * ### 1. Command-Based Editing
 * Every structural change is a [`Cmd`] compiled and applied by
 * [`Document::apply`], which either installs a complete replacement block
 * list (bumping the version and returning a [`Patch`] with the caret
 * target) or rejects with an [`EditError`] leaving the document untouched.
 *
 * ### 2. The Surface Is a Derived View
 * After any committed mutation the editable surface is rebuilt from the
 * document and the caret restored through the coordinate mapper run in
 * reverse. The surface only leads during unmanaged edits (typing, pasting,
 * native character deletion), and the debounced read-back folds those into
 * the document.
 *
 * ### 3. One Writer
 * The [`EditController`] owns the document, the surface, and the transient
 * floating-editor state; it is the only place the two are reconciled, so
 * the event loop serializes all writes.
 *
 * ## Module Structure
 *
 * - **`block`**: the `Block` tagged union, logical lengths, text merging
 * - **`document`**: the `Document`, logical positions, offset resolution
 * - **`commands`**: the `Cmd` enum and all mutation operations
 * - **`patch`**: edit result metadata
 * - **`resync`**: the coalescing read-back queue
 * - **`controller`**: the gesture-level state machine
 */

pub mod block;
pub mod commands;
pub mod controller;
pub mod document;
pub mod patch;
pub mod resync;

pub use block::Block;
pub use commands::{Cmd, EditError};
pub use controller::{EditController, EditState, LogNotifier, Notify};
pub use document::{Document, Position, SelectRange};
pub use patch::Patch;
pub use resync::ResyncQueue;
