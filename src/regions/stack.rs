//! Exit walls for the structuring traversal.

use crate::ir::BlockId;
use crate::utils::BitSet;

/// Stack of exit-block sets.
///
/// Each branch or loop body pushes the blocks where its traversal must stop,
/// typically the merge point computed from post-dominators. Frames inherit
/// their parent's exits, so a nested branch also stops at every outer merge.
pub(crate) struct RegionStack {
    frames: Vec<BitSet>,
}

impl RegionStack {
    /// An empty stack sized for a method with `block_count` blocks.
    pub(crate) fn new(block_count: usize) -> Self {
        RegionStack {
            frames: vec![BitSet::with_capacity(block_count)],
        }
    }

    /// Pushes a frame containing the parent's exits plus `exits`.
    pub(crate) fn push(&mut self, exits: &[BlockId]) {
        let mut frame = self
            .frames
            .last()
            .cloned()
            .unwrap_or_else(|| BitSet::with_capacity(0));
        for exit in exits {
            frame.insert(exit.index());
        }
        self.frames.push(frame);
    }

    /// Drops the innermost frame. The base frame stays.
    pub(crate) fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Returns `true` when traversal must stop before `block`.
    pub(crate) fn is_exit(&self, block: BlockId) -> bool {
        self.frames
            .last()
            .is_some_and(|frame| frame.contains(block.index()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_inherit_outer_exits() {
        let mut stack = RegionStack::new(8);
        assert!(!stack.is_exit(BlockId::new(3)));

        stack.push(&[BlockId::new(3)]);
        assert!(stack.is_exit(BlockId::new(3)));

        stack.push(&[BlockId::new(5)]);
        assert!(stack.is_exit(BlockId::new(3)));
        assert!(stack.is_exit(BlockId::new(5)));

        stack.pop();
        assert!(stack.is_exit(BlockId::new(3)));
        assert!(!stack.is_exit(BlockId::new(5)));

        stack.pop();
        assert!(!stack.is_exit(BlockId::new(3)));
    }

    #[test]
    fn test_base_frame_survives_extra_pops() {
        let mut stack = RegionStack::new(4);
        stack.pop();
        stack.push(&[BlockId::new(1)]);
        assert!(stack.is_exit(BlockId::new(1)));
        stack.pop();
        stack.pop();
        assert!(!stack.is_exit(BlockId::new(1)));
    }
}
