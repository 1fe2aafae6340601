//! Block graph normalization and structural analysis.
//!
//! After construction the graph gets cleaned into the shape later passes
//! assume: unreachable blocks are removed and identical return blocks
//! merge into one exit. A synthetic splitter lands in front of any
//! handler entry that is also reached by normal edges, so exceptional and
//! normal flow never mix at one block. Dominators are computed on the
//! normalized graph, then natural loops are found from back edges and
//! marked on their header and back-edge blocks.

use std::collections::BTreeMap;

use crate::cfg::DominatorInfo;
use crate::ir::{
    BlockAttr, BlockFlags, BlockId, InsnKind, Instruction, LoopId, LoopInfo, MethodUnit,
};
use crate::pipeline::DecompilerOptions;
use crate::utils::BitSet;
use crate::{Error, Result};

/// Normalizes the block graph and computes dominators and loops.
///
/// # Errors
///
/// Returns [`Error::GraphError`] when the method exceeds the configured
/// block limit.
pub fn process_blocks(unit: &mut MethodUnit, options: &DecompilerOptions) -> Result<()> {
    if unit.blocks.len() > options.block_limit {
        return Err(Error::GraphError(format!(
            "method `{}` has {} blocks, limit is {}",
            unit.name,
            unit.blocks.len(),
            options.block_limit
        )));
    }

    remove_unreachable(unit);
    if options.split_return {
        split_return_blocks(unit);
    } else if options.dedup_exits {
        dedup_exit_blocks(unit);
    }
    insert_handler_splitters(unit);

    let dominators = DominatorInfo::compute(unit);
    mark_loops(unit, &dominators);
    unit.dominators = Some(dominators);
    Ok(())
}

/// Drops blocks with no path from the entry.
fn remove_unreachable(unit: &mut MethodUnit) {
    let n = unit.blocks.len();
    let mut reachable = BitSet::with_capacity(n);
    let mut worklist = vec![unit.entry];
    reachable.insert(unit.entry.index());
    while let Some(b) = worklist.pop() {
        for s in unit.block(b).all_succs() {
            if !reachable.contains(s.index()) {
                reachable.insert(s.index());
                worklist.push(s);
            }
        }
    }
    let removed = n - reachable.count();
    if removed > 0 {
        unit.warn(format!("removed {removed} unreachable blocks"));
        unit.retain_blocks(&reachable);
    }
}

/// Instruction equality that ignores the decode offset.
fn insns_equivalent(a: &[Instruction], b: &[Instruction]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| x.kind == y.kind && x.result == y.result && x.args == y.args)
}

/// Merges return blocks with identical instructions into a single exit.
///
/// Only plain return blocks qualify: no attributes, no exceptional edges,
/// not the entry. Registers compare by number here; once SSA runs, a phi
/// at the merged block reconciles the incoming versions.
fn dedup_exit_blocks(unit: &mut MethodUnit) {
    let mut groups: Vec<Vec<BlockId>> = Vec::new();
    for block in &unit.blocks {
        if !block.has_flag(BlockFlags::RETURN)
            || block.id == unit.entry
            || !block.attrs.is_empty()
            || !block.exc_succs.is_empty()
            || !block.exc_preds.is_empty()
        {
            continue;
        }
        // Switch case targets are attributed by offset; merging one away
        // would orphan its case values.
        let switch_target = block.preds.iter().any(|&p| {
            matches!(
                unit.block(p).terminator().map(|insn| &insn.kind),
                Some(InsnKind::Switch { .. })
            )
        });
        if switch_target {
            continue;
        }
        let group = groups.iter_mut().find(|group| {
            insns_equivalent(&unit.blocks[group[0].index()].insns, &block.insns)
        });
        match group {
            Some(group) => group.push(block.id),
            None => groups.push(vec![block.id]),
        }
    }

    let mut keep = BitSet::all(unit.blocks.len());
    let mut merged = false;
    for group in groups {
        let (&target, dups) = match group.split_first() {
            Some(split) if !split.1.is_empty() => split,
            _ => continue,
        };
        for &dup in dups {
            let preds = unit.block(dup).preds.clone();
            for p in preds {
                unit.redirect_edge(p, dup, target);
            }
            keep.remove(dup.index());
            merged = true;
        }
    }
    if merged {
        unit.retain_blocks(&keep);
    }
}

/// Clones shared return blocks so each predecessor exits through its own
/// copy. The inverse of [`dedup_exit_blocks`], for consumers that prefer
/// one return per path.
fn split_return_blocks(unit: &mut MethodUnit) {
    let candidates: Vec<BlockId> = unit
        .blocks
        .iter()
        .filter(|block| {
            block.has_flag(BlockFlags::RETURN)
                && block.preds.len() > 1
                && block.attrs.is_empty()
                && block.exc_succs.is_empty()
                && block.exc_preds.is_empty()
        })
        .map(|block| block.id)
        .collect();
    for ret in candidates {
        let preds = unit.block(ret).preds.clone();
        for &p in preds.iter().skip(1) {
            let offset = unit.block(ret).start_offset;
            let insns = unit.block(ret).insns.clone();
            let copy = unit.add_block(offset);
            let block = unit.block_mut(copy);
            block.insns = insns;
            block.flags |= BlockFlags::RETURN | BlockFlags::SYNTHETIC;
            unit.redirect_edge(p, ret, copy);
        }
    }
}

/// Puts a synthetic forwarding block in front of every handler entry that
/// normal edges also reach, so the handler entry keeps exceptional
/// predecessors only and phi placement has one normal landing point.
fn insert_handler_splitters(unit: &mut MethodUnit) {
    let mut handler_blocks: Vec<BlockId> = unit.handlers.iter().map(|h| h.block).collect();
    handler_blocks.sort_unstable();
    handler_blocks.dedup();

    for handler in handler_blocks {
        let normal_preds = unit.block(handler).preds.clone();
        if normal_preds.is_empty() {
            continue;
        }
        let offset = unit.block(handler).start_offset;
        let splitter = unit.add_block(offset);
        {
            let block = unit.block_mut(splitter);
            block.flags |= BlockFlags::SYNTHETIC | BlockFlags::SPLITTER;
            block.attrs.push(BlockAttr::SplitterOf(handler));
        }
        for p in normal_preds {
            unit.redirect_edge(p, handler, splitter);
        }
        unit.connect(splitter, handler);
    }
}

/// Finds natural loops from back edges and marks headers and back-edge
/// sources. Back edges sharing a header merge into one loop.
fn mark_loops(unit: &mut MethodUnit, dom: &DominatorInfo) {
    let mut by_header: BTreeMap<BlockId, Vec<BlockId>> = BTreeMap::new();
    for b in unit.block_ids() {
        for &s in &unit.block(b).succs {
            if dom.dominates(s, b) {
                by_header.entry(s).or_default().push(b);
            }
        }
    }

    let n = unit.blocks.len();
    let mut loops: Vec<LoopInfo> = Vec::new();
    for (header, sources) in by_header {
        let mut body = BitSet::with_capacity(n);
        body.insert(header.index());
        let mut stack: Vec<BlockId> = Vec::new();
        for &src in &sources {
            if !body.contains(src.index()) {
                body.insert(src.index());
                stack.push(src);
            }
        }
        while let Some(w) = stack.pop() {
            for &p in &unit.block(w).preds {
                // The dominance guard keeps side entries of irreducible
                // flow from dragging in blocks above the header.
                if !body.contains(p.index()) && dom.dominates(header, p) {
                    body.insert(p.index());
                    stack.push(p);
                }
            }
        }
        loops.push(LoopInfo {
            id: LoopId::new(0),
            header,
            back_edges: sources,
            body,
            depth: 0,
        });
    }

    let depths: Vec<u32> = loops
        .iter()
        .map(|l| {
            1 + loops
                .iter()
                .filter(|m| m.header != l.header && m.body.contains(l.header.index()))
                .count() as u32
        })
        .collect();
    for (l, depth) in loops.iter_mut().zip(depths) {
        l.depth = depth;
    }

    // Outermost first; ids follow the final order.
    loops.sort_by_key(|l| (l.depth, l.header));
    for (index, l) in loops.iter_mut().enumerate() {
        l.id = LoopId::new(index);
    }

    for l in &loops {
        let header = unit.block_mut(l.header);
        header.flags |= BlockFlags::LOOP_START;
        header.attrs.push(BlockAttr::LoopHeader(l.id));
        for &src in &l.back_edges {
            let block = unit.block_mut(src);
            block.flags |= BlockFlags::LOOP_END;
            block.attrs.push(BlockAttr::LoopEnd(l.id));
        }
    }
    unit.loops = loops;
}
