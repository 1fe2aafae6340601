//! Basic blocks and their edge lists.

use bitflags::bitflags;

use crate::ir::{BlockAttr, HandlerId, Instruction, LoopId};

/// Identifies a basic block within one method.
///
/// Ids index the method's block list and stay stable once the block graph
/// is finalized; passes that remove blocks renumber before handing the
/// graph on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u32);

impl BlockId {
    /// Creates a block id from its position in the method's block list.
    #[must_use]
    pub fn new(index: usize) -> Self {
        BlockId(index as u32)
    }

    /// Position in the method's block list.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "B{}", self.0)
    }
}

bitflags! {
    /// Structural markers on a basic block.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BlockFlags: u16 {
        /// Header of a natural loop.
        const LOOP_START = 1 << 0;
        /// Source of a back edge.
        const LOOP_END = 1 << 1;
        /// Entry block of an exception handler.
        const HANDLER = 1 << 2;
        /// Inserted by a pass, not decoded from the input.
        const SYNTHETIC = 1 << 3;
        /// Synthetic landing block in front of a handler entry.
        const SPLITTER = 1 << 4;
        /// Ends with a return instruction.
        const RETURN = 1 << 5;
    }
}

/// A maximal straight-line run of instructions.
///
/// Normal and exceptional edges are kept in separate lists: dominance and
/// liveness walk both, while structuring walks the normal lists and folds
/// the exceptional ones in as a try/catch overlay.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    /// This block's id.
    pub id: BlockId,
    /// Offset of the first decoded instruction, or the offset of the
    /// nearest following real instruction for synthetic blocks.
    pub start_offset: u32,
    /// Instructions in execution order; phis, once placed, lead the list.
    pub insns: Vec<Instruction>,
    /// Normal-edge predecessors.
    pub preds: Vec<BlockId>,
    /// Normal-edge successors; for a conditional branch the taken edge
    /// comes first, for a switch the cases precede the default.
    pub succs: Vec<BlockId>,
    /// Exceptional-edge predecessors (throwing blocks this handler covers).
    pub exc_preds: Vec<BlockId>,
    /// Exceptional-edge successors (handler entries covering this block).
    pub exc_succs: Vec<BlockId>,
    /// Structural markers.
    pub flags: BlockFlags,
    /// Attached structural facts.
    pub attrs: Vec<BlockAttr>,
}

impl BasicBlock {
    /// An empty block at the given offset.
    #[must_use]
    pub fn new(id: BlockId, start_offset: u32) -> Self {
        BasicBlock {
            id,
            start_offset,
            insns: Vec::new(),
            preds: Vec::new(),
            succs: Vec::new(),
            exc_preds: Vec::new(),
            exc_succs: Vec::new(),
            flags: BlockFlags::empty(),
            attrs: Vec::new(),
        }
    }

    /// The block-ending branch or terminal instruction, if present.
    #[must_use]
    pub fn terminator(&self) -> Option<&Instruction> {
        self.insns.last().filter(|insn| insn.kind.ends_block())
    }

    /// Number of instructions, phis excluded.
    #[must_use]
    pub fn real_insn_count(&self) -> usize {
        self.insns.iter().filter(|insn| !insn.is_phi()).count()
    }

    /// Iterates the leading phi instructions.
    pub fn phis(&self) -> impl Iterator<Item = &Instruction> {
        self.insns.iter().take_while(|insn| insn.is_phi())
    }

    /// Index of the first non-phi instruction.
    #[must_use]
    pub fn first_real_insn(&self) -> usize {
        self.insns.iter().take_while(|insn| insn.is_phi()).count()
    }

    /// Returns `true` when the given flag is set.
    #[must_use]
    pub fn has_flag(&self, flag: BlockFlags) -> bool {
        self.flags.contains(flag)
    }

    /// The loop this block heads, if any.
    #[must_use]
    pub fn loop_header(&self) -> Option<LoopId> {
        self.attrs.iter().find_map(|attr| match attr {
            BlockAttr::LoopHeader(id) => Some(*id),
            _ => None,
        })
    }

    /// Loops this block ends with a back edge, in attachment order.
    pub fn loop_ends(&self) -> impl Iterator<Item = LoopId> + '_ {
        self.attrs.iter().filter_map(|attr| match attr {
            BlockAttr::LoopEnd(id) => Some(*id),
            _ => None,
        })
    }

    /// The handler this block enters, if it is a handler entry.
    #[must_use]
    pub fn handler(&self) -> Option<HandlerId> {
        self.attrs.iter().find_map(|attr| match attr {
            BlockAttr::Handler(id) => Some(*id),
            _ => None,
        })
    }

    /// All successors, normal then exceptional.
    pub fn all_succs(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.succs.iter().chain(self.exc_succs.iter()).copied()
    }

    /// All predecessors, normal then exceptional.
    pub fn all_preds(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.preds.iter().chain(self.exc_preds.iter()).copied()
    }
}

impl std::fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @{:#x}", self.id, self.start_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{InsnKind, RegisterArg};

    fn block_with(insns: Vec<Instruction>) -> BasicBlock {
        let mut block = BasicBlock::new(BlockId::new(0), 0);
        block.insns = insns;
        block
    }

    #[test]
    fn test_terminator_detection() {
        let block = block_with(vec![
            Instruction::new(InsnKind::Nop).at(0),
            Instruction::new(InsnKind::Return).at(1),
        ]);
        assert!(matches!(
            block.terminator().map(|insn| &insn.kind),
            Some(InsnKind::Return)
        ));

        let no_term = block_with(vec![Instruction::new(InsnKind::Nop).at(0)]);
        assert!(no_term.terminator().is_none());
    }

    #[test]
    fn test_phi_prefix() {
        let block = block_with(vec![
            Instruction::new(InsnKind::Phi).with_result(RegisterArg::new(0)),
            Instruction::new(InsnKind::Phi).with_result(RegisterArg::new(1)),
            Instruction::new(InsnKind::Return).at(4),
        ]);
        assert_eq!(block.phis().count(), 2);
        assert_eq!(block.first_real_insn(), 2);
        assert_eq!(block.real_insn_count(), 1);
    }

    #[test]
    fn test_attr_lookup() {
        let mut block = BasicBlock::new(BlockId::new(2), 8);
        block.attrs.push(BlockAttr::LoopHeader(LoopId::new(0)));
        block.attrs.push(BlockAttr::LoopEnd(LoopId::new(0)));
        block.attrs.push(BlockAttr::LoopEnd(LoopId::new(1)));

        assert_eq!(block.loop_header(), Some(LoopId::new(0)));
        assert_eq!(block.loop_ends().count(), 2);
        assert_eq!(block.handler(), None);
    }

}
