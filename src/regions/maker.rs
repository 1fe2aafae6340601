//! Region tree construction.
//!
//! [`make_regions`] turns a processed block graph into a [`Region`] tree by
//! walking blocks from the entry in control-flow order. Each block is claimed
//! exactly once: conditionals become [`Region::If`] nodes with their merge
//! point taken from post-dominators, loop headers become [`Region::Loop`]
//! nodes around their body, and switch terminators become [`Region::Switch`]
//! nodes with one arm per distinct target. A branch that reaches code owned
//! elsewhere emits a [`Region::Edge`] marker instead of re-claiming it.
//!
//! When structuring cannot run at all, [`fallback_region`] produces a flat
//! sequence of the method's blocks with explicit jump markers, so callers
//! always get renderable output.

use crate::diag::Diagnostic;
use crate::ir::{BasicBlock, BlockFlags, BlockId, InsnKind, MethodUnit};
use crate::pipeline::DecompilerOptions;
use crate::regions::stack::RegionStack;
use crate::regions::try_catch;
use crate::regions::{EdgeKind, Region};
use crate::utils::BitSet;
use crate::{cfg::DominatorInfo, Error, Result};

/// Builds the structured region tree for `unit` and stores it in
/// `unit.region`.
///
/// Requires dominator and post-dominator data from
/// [`process_blocks`](crate::cfg::process_blocks).
///
/// # Errors
///
/// Returns [`Error::GraphError`] when dominator data is missing and
/// [`Error::RegionLimit`] when the tree exceeds the configured node budget.
pub fn make_regions(unit: &mut MethodUnit, options: &DecompilerOptions) -> Result<()> {
    let Some(dom) = unit.dominators.take() else {
        return Err(Error::GraphError(
            "region structuring requires dominator data".to_owned(),
        ));
    };
    let outcome = build_tree(unit, &dom, options);
    unit.dominators = Some(dom);
    let (region, notes) = outcome?;
    unit.diagnostics.extend(notes);
    unit.region = Some(region);
    Ok(())
}

fn build_tree(
    unit: &MethodUnit,
    dom: &DominatorInfo,
    options: &DecompilerOptions,
) -> Result<(Region, Vec<Diagnostic>)> {
    let block_count = unit.blocks.len();
    let mut maker = RegionMaker {
        unit,
        dom,
        processed: BitSet::with_capacity(block_count),
        stack: RegionStack::new(block_count),
        loops: Vec::new(),
        count: 0,
        limit: options.regions_limit,
        notes: Vec::new(),
    };

    let mut children = match maker.traverse_from(unit.entry, None)? {
        Region::Sequence(children) => children,
        other => vec![other],
    };

    let handler_bodies = maker.structure_handlers()?;

    // Blocks no traversal claimed are appended flat so the tree still
    // covers the whole graph.
    let leftovers: Vec<BlockId> = unit
        .blocks
        .iter()
        .map(|block| block.id)
        .filter(|id| !maker.processed.contains(id.index()))
        .collect();
    if !leftovers.is_empty() {
        maker.notes.push(Diagnostic::info(format!(
            "`{}`: {} block(s) fell outside the structured tree, emitted linearly",
            unit.name,
            leftovers.len()
        )));
        for id in leftovers {
            children.push(Region::Block(id));
            for succ in &unit.block(id).succs {
                children.push(Region::Edge {
                    from: id,
                    to: *succ,
                    kind: EdgeKind::Goto,
                });
            }
        }
    }

    let mut notes = maker.notes;
    let root = try_catch::overlay(unit, Region::Sequence(children), handler_bodies, &mut notes);
    Ok((root, notes))
}

/// Replaces structured output with a flat rendition of the block list,
/// marking the unit as degraded.
///
/// Used when structuring fails part-way; when even the block graph is
/// missing, a single synthetic block is materialized from the raw
/// instruction stream.
pub fn fallback_region(unit: &mut MethodUnit) -> Region {
    unit.fallback = true;
    if unit.blocks.is_empty() {
        let start = unit.raw_insns.first().map_or(0, |insn| insn.offset);
        let mut block = BasicBlock::new(BlockId::new(0), start);
        block.flags |= BlockFlags::SYNTHETIC;
        block.insns = unit.raw_insns.clone();
        unit.blocks.push(block);
        unit.entry = BlockId::new(0);
        return Region::Sequence(vec![Region::Block(BlockId::new(0))]);
    }
    let mut children = Vec::new();
    for block in &unit.blocks {
        children.push(Region::Block(block.id));
        for succ in &block.succs {
            // The jump to the next block in list order reads as plain
            // fall-through; everything else gets an explicit marker.
            if succ.index() != block.id.index() + 1 {
                children.push(Region::Edge {
                    from: block.id,
                    to: *succ,
                    kind: EdgeKind::Goto,
                });
            }
        }
    }
    Region::Sequence(children)
}

/// An active loop during traversal, for classifying branch targets.
pub(crate) struct LoopCtx {
    /// Header of the loop.
    pub(crate) header: BlockId,
    /// Block control reaches on normal loop exit, when known.
    pub(crate) exit: Option<BlockId>,
    /// Trailing condition block of an `at_end` loop; kept a plain leaf so
    /// its compare is not restructured as an `if`.
    pub(crate) cond_end: Option<BlockId>,
}

/// Traversal state shared by the shape makers.
pub(crate) struct RegionMaker<'a> {
    pub(crate) unit: &'a MethodUnit,
    pub(crate) dom: &'a DominatorInfo,
    /// Blocks already owned by some region.
    pub(crate) processed: BitSet,
    /// Exit walls of the enclosing branches and loops.
    pub(crate) stack: RegionStack,
    /// Innermost-last stack of loops being structured.
    pub(crate) loops: Vec<LoopCtx>,
    /// Region nodes created so far.
    pub(crate) count: usize,
    /// Node budget from [`DecompilerOptions::regions_limit`].
    pub(crate) limit: usize,
    pub(crate) notes: Vec<Diagnostic>,
}

impl RegionMaker<'_> {
    /// Claims blocks starting at `start` until flow ends, re-enters owned
    /// code, or hits an exit wall.
    ///
    /// `natural` is the block where the enclosing construct expects flow to
    /// land; stopping anywhere else on owned or walled code appends an
    /// [`Region::Edge`] marker so the jump survives in the output.
    pub(crate) fn traverse_from(
        &mut self,
        start: BlockId,
        natural: Option<BlockId>,
    ) -> Result<Region> {
        let mut children = Vec::new();
        let mut next = Some(start);
        let mut last = None;
        while let Some(current) = next {
            if self.processed.contains(current.index()) || self.stack.is_exit(current) {
                if Some(current) != natural {
                    children.push(Region::Edge {
                        from: last.unwrap_or(current),
                        to: current,
                        kind: self.edge_kind(current),
                    });
                }
                break;
            }
            let (region, follow) = self.make_one(current)?;
            children.push(region);
            last = Some(current);
            next = follow;
        }
        Ok(Region::seq(children))
    }

    /// Structures one block, returning its region and the block where
    /// sequential flow continues.
    fn make_one(&mut self, block_id: BlockId) -> Result<(Region, Option<BlockId>)> {
        self.bump()?;
        let block = self.unit.block(block_id);

        let already_open = self.loops.iter().any(|ctx| ctx.header == block_id);
        if block.has_flag(BlockFlags::LOOP_START) && !already_open {
            return self.make_loop(block_id);
        }
        let is_cond_end = self
            .loops
            .last()
            .is_some_and(|ctx| ctx.cond_end == Some(block_id));
        match block.terminator().map(|insn| &insn.kind) {
            // The trailing test of an at-end loop stays a leaf; the loop
            // node already carries its compare.
            Some(InsnKind::If { .. }) if is_cond_end => {
                self.processed.insert(block_id.index());
                Ok((Region::Block(block_id), None))
            }
            Some(InsnKind::If { .. }) if block.succs.len() == 2 => self.make_if(block_id),
            Some(InsnKind::Switch { .. }) => self.make_switch(block_id),
            _ => {
                self.processed.insert(block_id.index());
                let follow = match block.succs.as_slice() {
                    [next] => Some(*next),
                    _ => None,
                };
                Ok((Region::Block(block_id), follow))
            }
        }
    }

    /// Structures one branch arm from `start`, stopping at `stop`.
    ///
    /// Returns `None` when the arm is empty (`start == stop`) and an
    /// [`Region::Edge`] marker when `start` is already owned or walled off.
    pub(crate) fn branch_region(
        &mut self,
        from: BlockId,
        start: BlockId,
        stop: Option<BlockId>,
    ) -> Result<Option<Region>> {
        if Some(start) == stop {
            return Ok(None);
        }
        if self.processed.contains(start.index()) || self.stack.is_exit(start) {
            return Ok(Some(Region::Edge {
                from,
                to: start,
                kind: self.edge_kind(start),
            }));
        }
        let exits: Vec<BlockId> = stop.into_iter().collect();
        self.stack.push(&exits);
        let region = self.traverse_from(start, stop);
        self.stack.pop();
        Ok(Some(region?))
    }

    /// Classifies a jump to `target` against the innermost enclosing loop.
    pub(crate) fn edge_kind(&self, target: BlockId) -> EdgeKind {
        if let Some(ctx) = self.loops.last() {
            if ctx.exit == Some(target) {
                return EdgeKind::Break;
            }
            if ctx.header == target {
                return EdgeKind::Continue;
            }
        }
        EdgeKind::Goto
    }

    /// Counts a new region node against the budget.
    pub(crate) fn bump(&mut self) -> Result<()> {
        self.count += 1;
        if self.count > self.limit {
            return Err(Error::RegionLimit(self.limit));
        }
        Ok(())
    }
}
