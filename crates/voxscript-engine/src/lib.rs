pub mod editing;
pub mod io;
pub mod surface;
pub mod units;

// Re-export key types for easier usage
pub use editing::{
    Block, Cmd, Document, EditController, EditError, EditState, LogNotifier, Notify, Patch,
    Position, ResyncQueue, SelectRange,
};
pub use surface::{NodeId, Surface, SurfacePoint};
