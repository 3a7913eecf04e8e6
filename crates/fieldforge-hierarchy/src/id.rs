//! Stable node handles.

use std::fmt;

/// Handle to a node in a [`Hierarchy`](crate::Hierarchy).
///
/// The generation guards against a removed slot being reused: a stale id
/// never resolves to the node that replaced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index inside the arena.
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when this id was issued.
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}
