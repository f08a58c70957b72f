use thiserror::Error;

/// Outcome of a tree operation that did not succeed.
///
/// None of these leave the tree in a modified state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TreeError {
    /// Insert with a key that is already present.
    #[error("key already present")]
    DuplicateKey,
    /// Search or remove with a key that is not present.
    #[error("key not found")]
    NotFound,
    /// Search or remove against a tree without any nodes.
    #[error("tree is empty")]
    EmptyTree,
}

impl TreeError {
    /// Returns true for `NotFound` and `EmptyTree`, which callers may treat alike.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TreeError::NotFound | TreeError::EmptyTree)
    }
}
