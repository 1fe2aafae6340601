//! Register liveness over the block graph.
//!
//! A straightforward backward dataflow over per-block use/def sets. Its
//! one subtlety is exceptional flow: control can leave for a handler from
//! anywhere inside a covered block, so a register the handler needs is
//! treated as live into the covered block even when that block redefines
//! it later. Without this, a definition sitting after a potential throw
//! would kill liveness the handler still depends on.
//!
//! SSA construction gates phi placement on these sets, so over-approximating
//! costs at most a dead phi (cleaned afterwards) while under-approximating
//! would lose a merge.

use crate::ir::{BlockId, MethodUnit};
use crate::utils::BitSet;

/// Per-block liveness sets, indexed by register.
pub struct LivenessInfo {
    live_in: Vec<BitSet>,
    live_out: Vec<BitSet>,
}

impl LivenessInfo {
    /// Solves liveness for the unit's current block graph.
    #[must_use]
    pub fn compute(unit: &MethodUnit) -> Self {
        let n = unit.blocks.len();
        let regs = unit.regs_count as usize;

        let mut use_sets: Vec<BitSet> = (0..n).map(|_| BitSet::with_capacity(regs)).collect();
        let mut def_sets: Vec<BitSet> = (0..n).map(|_| BitSet::with_capacity(regs)).collect();
        for (bi, block) in unit.blocks.iter().enumerate() {
            let uses = &mut use_sets[bi];
            let defs = &mut def_sets[bi];
            for insn in &block.insns {
                insn.visit_uses(&mut |reg| {
                    if !defs.contains(reg.reg as usize) {
                        uses.insert(reg.reg as usize);
                    }
                });
                if let Some(result) = &insn.result {
                    defs.insert(result.reg as usize);
                }
            }
        }

        let mut live_in: Vec<BitSet> = (0..n).map(|_| BitSet::with_capacity(regs)).collect();
        let mut live_out: Vec<BitSet> = (0..n).map(|_| BitSet::with_capacity(regs)).collect();
        loop {
            let mut changed = false;
            for bi in (0..n).rev() {
                let block = &unit.blocks[bi];
                let mut out = BitSet::with_capacity(regs);
                for &s in &block.succs {
                    out.union_with(&live_in[s.index()]);
                }
                let mut inn = out.clone();
                inn.subtract(&def_sets[bi]);
                inn.union_with(&use_sets[bi]);
                // Handler needs survive the whole covered block.
                for &h in &block.exc_succs {
                    inn.union_with(&live_in[h.index()]);
                }
                if out != live_out[bi] {
                    live_out[bi] = out;
                    changed = true;
                }
                if inn != live_in[bi] {
                    live_in[bi] = inn;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        LivenessInfo { live_in, live_out }
    }

    /// Registers live when the block is entered.
    #[must_use]
    pub fn live_in(&self, b: BlockId) -> &BitSet {
        &self.live_in[b.index()]
    }

    /// Registers live when the block exits along normal edges.
    #[must_use]
    pub fn live_out(&self, b: BlockId) -> &BitSet {
        &self.live_out[b.index()]
    }
}
