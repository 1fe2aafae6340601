//! Block attributes attached during analysis.
//!
//! Passes communicate structural facts through a closed attribute set
//! instead of ad-hoc side tables: the loop pass tags headers and back-edge
//! sources; the exception overlay tags handler entries. The block
//! processor tags the synthetic blocks it inserts.

use crate::ir::BlockId;

/// Identifies one natural loop within a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoopId(u32);

impl LoopId {
    /// Creates a loop id from its position in the method's loop list.
    #[must_use]
    pub fn new(index: usize) -> Self {
        LoopId(index as u32)
    }

    /// Position in the method's loop list.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for LoopId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "loop{}", self.0)
    }
}

/// Identifies one exception handler within a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u32);

impl HandlerId {
    /// Creates a handler id from its position in the method's handler list.
    #[must_use]
    pub fn new(index: usize) -> Self {
        HandlerId(index as u32)
    }

    /// Position in the method's handler list.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "handler{}", self.0)
    }
}

/// A structural fact attached to a basic block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockAttr {
    /// The block is the header of the given loop.
    LoopHeader(LoopId),
    /// The block is the source of a back edge into the given loop.
    LoopEnd(LoopId),
    /// The block is the entry of the given exception handler.
    Handler(HandlerId),
    /// The block was inserted in front of the given handler entry to give
    /// its phis a single landing point.
    SplitterOf(BlockId),
}
