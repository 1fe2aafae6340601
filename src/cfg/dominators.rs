//! Dominator, post-dominator and dominance-frontier computation.
//!
//! Dominators are solved as bit sets with the classic iterative dataflow
//! scheme: every block starts with the full set and intersects its
//! predecessors' sets until nothing changes, walking blocks in reverse
//! postorder so most methods converge in two sweeps. Immediate dominators
//! fall out as the strict dominator with the largest dominator set.
//!
//! Dominators and frontiers run over normal and exceptional edges
//! together, since a definition reaches a handler the same way it reaches
//! any other merge. Post-dominators run over normal edges only, against a
//! virtual exit that gathers every return and throw: they serve the
//! structuring passes, which see exceptional flow through the handler
//! overlay rather than as edges.

use crate::ir::{BlockId, MethodUnit};
use crate::utils::BitSet;

/// Dominance data for one method's block graph.
pub struct DominatorInfo {
    doms: Vec<BitSet>,
    idom: Vec<Option<BlockId>>,
    children: Vec<Vec<BlockId>>,
    frontier: Vec<BitSet>,
    post_idom: Vec<Option<BlockId>>,
    rpo: Vec<BlockId>,
    reachable: BitSet,
}

impl DominatorInfo {
    /// Computes dominators, frontiers and post-dominators for the unit.
    ///
    /// Unreachable blocks keep empty results; the block processor removes
    /// them before this runs, so encountering one here means the caller
    /// skipped that pass.
    #[must_use]
    pub fn compute(unit: &MethodUnit) -> Self {
        let n = unit.blocks.len();
        let rpo = reverse_postorder(unit);
        let entry = unit.entry.index();

        let mut reachable = BitSet::with_capacity(n);
        for b in &rpo {
            reachable.insert(b.index());
        }

        let mut doms: Vec<BitSet> = (0..n).map(|_| BitSet::all(n)).collect();
        doms[entry].clear();
        doms[entry].insert(entry);
        loop {
            let mut changed = false;
            for &b in &rpo {
                let bi = b.index();
                if bi == entry {
                    continue;
                }
                let mut next = doms[bi].clone();
                for p in unit.block(b).all_preds() {
                    next.intersect_with(&doms[p.index()]);
                }
                next.insert(bi);
                if next != doms[bi] {
                    doms[bi] = next;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let idom = extract_idoms(&doms, &rpo, entry);

        let mut children: Vec<Vec<BlockId>> = vec![Vec::new(); n];
        for &b in &rpo {
            if let Some(parent) = idom[b.index()] {
                children[parent.index()].push(b);
            }
        }

        let mut frontier: Vec<BitSet> = (0..n).map(|_| BitSet::with_capacity(n)).collect();
        for &b in &rpo {
            let bi = b.index();
            let preds: Vec<BlockId> = unit.block(b).all_preds().collect();
            if preds.len() < 2 {
                continue;
            }
            let Some(merge_idom) = idom[bi] else {
                continue;
            };
            for p in preds {
                if !reachable.contains(p.index()) {
                    continue;
                }
                let mut runner = p;
                while runner != merge_idom {
                    frontier[runner.index()].insert(bi);
                    match idom[runner.index()] {
                        Some(up) => runner = up,
                        None => break,
                    }
                }
            }
        }

        let post_idom = compute_post_idoms(unit, &rpo);

        DominatorInfo {
            doms,
            idom,
            children,
            frontier,
            post_idom,
            rpo,
            reachable,
        }
    }

    /// Returns `true` when `a` dominates `b`. Reflexive.
    #[must_use]
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        self.doms[b.index()].contains(a.index())
    }

    /// Returns `true` when `a` dominates `b` and `a != b`.
    #[must_use]
    pub fn strictly_dominates(&self, a: BlockId, b: BlockId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Immediate dominator; `None` for the entry block.
    #[must_use]
    pub fn idom(&self, b: BlockId) -> Option<BlockId> {
        self.idom[b.index()]
    }

    /// Dominator-tree children of `b`, in reverse postorder.
    #[must_use]
    pub fn children(&self, b: BlockId) -> &[BlockId] {
        &self.children[b.index()]
    }

    /// Dominance frontier of `b`.
    #[must_use]
    pub fn frontier(&self, b: BlockId) -> &BitSet {
        &self.frontier[b.index()]
    }

    /// Immediate post-dominator over normal edges; `None` when every path
    /// from `b` ends at a return or throw without a common later block, or
    /// when `b` cannot reach an exit at all.
    #[must_use]
    pub fn post_idom(&self, b: BlockId) -> Option<BlockId> {
        self.post_idom[b.index()]
    }

    /// Blocks in reverse postorder over all edges, entry first.
    #[must_use]
    pub fn rpo(&self) -> &[BlockId] {
        &self.rpo
    }

    /// Returns `true` when the block is reachable from the entry.
    #[must_use]
    pub fn is_reachable(&self, b: BlockId) -> bool {
        self.reachable.contains(b.index())
    }
}

/// Immediate dominators from full dominator sets: for each block the
/// strict dominator with the largest set is the closest one.
fn extract_idoms(doms: &[BitSet], order: &[BlockId], entry: usize) -> Vec<Option<BlockId>> {
    let mut idom: Vec<Option<BlockId>> = vec![None; doms.len()];
    for &b in order {
        let bi = b.index();
        if bi == entry {
            continue;
        }
        let mut best: Option<usize> = None;
        for d in doms[bi].ones() {
            if d == bi {
                continue;
            }
            match best {
                Some(cur) if doms[d].count() <= doms[cur].count() => {}
                _ => best = Some(d),
            }
        }
        idom[bi] = best.map(BlockId::new);
    }
    idom
}

/// Post-dominators against a virtual exit appended past the real blocks.
fn compute_post_idoms(unit: &MethodUnit, rpo: &[BlockId]) -> Vec<Option<BlockId>> {
    let n = unit.blocks.len();
    let exit = n;
    let cap = n + 1;

    // Blocks with a normal path to some return or throw; the rest sit in
    // infinite loops and get no post-dominator.
    let mut reaches_exit = BitSet::with_capacity(n);
    let mut worklist: Vec<BlockId> = Vec::new();
    for &b in rpo {
        if unit.block(b).succs.is_empty() {
            reaches_exit.insert(b.index());
            worklist.push(b);
        }
    }
    while let Some(b) = worklist.pop() {
        for &p in &unit.block(b).preds {
            if !reaches_exit.contains(p.index()) {
                reaches_exit.insert(p.index());
                worklist.push(p);
            }
        }
    }

    let mut pdoms: Vec<BitSet> = (0..cap).map(|_| BitSet::all(cap)).collect();
    pdoms[exit].clear();
    pdoms[exit].insert(exit);

    let order: Vec<usize> = rpo.iter().rev().map(|b| b.index()).collect();
    loop {
        let mut changed = false;
        for &bi in &order {
            let block = &unit.blocks[bi];
            let mut next = pdoms[bi].clone();
            if block.succs.is_empty() {
                next.intersect_with(&pdoms[exit]);
            } else {
                for s in &block.succs {
                    next.intersect_with(&pdoms[s.index()]);
                }
            }
            next.insert(bi);
            if next != pdoms[bi] {
                pdoms[bi] = next;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let mut post_idom: Vec<Option<BlockId>> = vec![None; n];
    for &b in rpo {
        let bi = b.index();
        if !reaches_exit.contains(bi) {
            continue;
        }
        let mut best: Option<usize> = None;
        for d in pdoms[bi].ones() {
            if d == bi {
                continue;
            }
            match best {
                Some(cur) if pdoms[d].count() <= pdoms[cur].count() => {}
                _ => best = Some(d),
            }
        }
        post_idom[bi] = match best {
            Some(d) if d != exit => Some(BlockId::new(d)),
            _ => None,
        };
    }
    post_idom
}

/// Reverse postorder over normal and exceptional edges from the entry.
fn reverse_postorder(unit: &MethodUnit) -> Vec<BlockId> {
    enum Frame {
        Enter(BlockId),
        Leave(BlockId),
    }

    let n = unit.blocks.len();
    let mut visited = BitSet::with_capacity(n);
    let mut order = Vec::with_capacity(n);
    let mut stack = vec![Frame::Enter(unit.entry)];
    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter(b) => {
                if visited.contains(b.index()) {
                    continue;
                }
                visited.insert(b.index());
                stack.push(Frame::Leave(b));
                let succs: Vec<BlockId> = unit.block(b).all_succs().collect();
                for s in succs.into_iter().rev() {
                    if !visited.contains(s.index()) {
                        stack.push(Frame::Enter(s));
                    }
                }
            }
            Frame::Leave(b) => order.push(b),
        }
    }
    order.reverse();
    order
}
