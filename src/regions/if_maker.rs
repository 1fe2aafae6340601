//! Conditional structuring.

use crate::ir::{BlockId, InsnKind};
use crate::regions::maker::RegionMaker;
use crate::regions::Region;
use crate::Result;

impl RegionMaker<'_> {
    /// Structures a two-way conditional rooted at `block_id`.
    ///
    /// The merge point is the condition block's immediate post-dominator.
    /// Both arms are structured up to it; when the taken arm is empty the
    /// compare is inverted so the node always carries a non-empty `then`.
    /// Sequential flow resumes at the merge.
    pub(crate) fn make_if(&mut self, block_id: BlockId) -> Result<(Region, Option<BlockId>)> {
        let block = self.unit.block(block_id);
        let op = match block.terminator().map(|insn| &insn.kind) {
            Some(InsnKind::If { op, .. }) => *op,
            _ => {
                // Callers only dispatch compare terminators here; anything
                // else degrades to a plain leaf.
                self.processed.insert(block_id.index());
                return Ok((Region::Block(block_id), block.succs.first().copied()));
            }
        };
        let (taken, fall) = (block.succs[0], block.succs[1]);
        self.processed.insert(block_id.index());
        let merge = self.dom.post_idom(block_id);

        // An empty taken arm flips the compare so `then` holds the real code.
        let (op, then_start, else_start) = if Some(taken) == merge {
            (op.invert(), fall, taken)
        } else {
            (op, taken, fall)
        };

        let then = self
            .branch_region(block_id, then_start, merge)?
            .unwrap_or(Region::Sequence(Vec::new()));
        let otherwise = if Some(else_start) == merge {
            None
        } else {
            self.branch_region(block_id, else_start, merge)?
        };

        let region = Region::If {
            cond: block_id,
            op,
            then: Box::new(then),
            otherwise: otherwise.map(Box::new),
        };
        Ok((region, merge))
    }
}
