/// Result of applying a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    /// Logical offset the caret should be restored to, when the operation
    /// has an opinion about it (inserts land immediately after the new
    /// token; token deletions land on the vacated boundary).
    pub cursor: Option<usize>,
    /// Document version after the edit.
    pub version: u64,
}
