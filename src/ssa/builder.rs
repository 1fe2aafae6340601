//! SSA construction over the block graph.
//!
//! The transform runs in four steps. Phi placement walks each register's
//! iterated dominance frontier, inserting a phi only where the register is
//! live on entry so no dead merges appear. Renaming walks the dominator
//! tree with an explicit frame stack, binding every register argument to
//! one version and keeping per-register version stacks. Cleanup removes
//! phis that ended up unused or trivial (all arguments one value), then
//! definition and use sites are rebuilt and versions connected by phis are
//! grouped into source-level variables.
//!
//! Phi arguments pair with predecessors in combined order: normal
//! predecessors first, exceptional ones after, matching
//! [`crate::ir::BasicBlock::all_preds`].

use std::collections::BTreeMap;

use crate::cfg::DominatorInfo;
use crate::diag::Diagnostic;
use crate::ir::{BlockId, InsnArg, InsnKind, Instruction, MethodUnit, RegisterArg};
use crate::ssa::{DefSite, InsnSite, LivenessInfo, SsaVarId};
use crate::utils::BitSet;
use crate::{Error, Result};

/// Converts the unit's instructions to SSA form.
///
/// # Errors
///
/// Returns [`Error::GraphError`] when dominators have not been computed
/// yet; the block processor must run first.
pub fn transform(unit: &mut MethodUnit) -> Result<()> {
    let Some(dom) = unit.dominators.take() else {
        return Err(Error::GraphError(
            "SSA conversion requires dominator data".to_owned(),
        ));
    };

    let live = LivenessInfo::compute(unit);
    place_phis(unit, &dom, &live);
    rename(unit, &dom);
    cleanup_phis(unit);
    rebuild_sites(unit);
    group_code_vars(unit);

    unit.dominators = Some(dom);
    Ok(())
}

/// Inserts phi pseudo-instructions on each register's iterated dominance
/// frontier, gated on liveness.
fn place_phis(unit: &mut MethodUnit, dom: &DominatorInfo, live: &LivenessInfo) {
    let n = unit.blocks.len();
    let regs = unit.regs_count as usize;

    let mut def_blocks: Vec<BitSet> = (0..regs).map(|_| BitSet::with_capacity(n)).collect();
    for (bi, block) in unit.blocks.iter().enumerate() {
        for insn in &block.insns {
            if let Some(result) = &insn.result {
                def_blocks[result.reg as usize].insert(bi);
            }
        }
    }
    // Arguments are defined on entry.
    for index in 0..unit.arg_types.len() {
        def_blocks[unit.arg_reg(index) as usize].insert(unit.entry.index());
    }

    let mut phi_regs: Vec<Vec<u16>> = vec![Vec::new(); n];
    for reg in 0..regs {
        let mut placed = BitSet::with_capacity(n);
        let mut worklist: Vec<usize> = def_blocks[reg].ones().collect();
        while let Some(b) = worklist.pop() {
            let frontier: Vec<usize> = dom.frontier(BlockId::new(b)).ones().collect();
            for f in frontier {
                if placed.contains(f) || !live.live_in(BlockId::new(f)).contains(reg) {
                    continue;
                }
                placed.insert(f);
                phi_regs[f].push(reg as u16);
                // The phi is itself a definition.
                if !def_blocks[reg].contains(f) {
                    worklist.push(f);
                }
            }
        }
    }

    for (bi, regs_here) in phi_regs.iter().enumerate() {
        if regs_here.is_empty() {
            continue;
        }
        let block = unit.block_mut(BlockId::new(bi));
        let pred_count = block.preds.len() + block.exc_preds.len();
        let phis: Vec<Instruction> = regs_here
            .iter()
            .map(|&reg| {
                let mut insn =
                    Instruction::new(InsnKind::Phi).with_result(RegisterArg::new(reg));
                for _ in 0..pred_count {
                    insn.args.push(InsnArg::Reg(RegisterArg::new(reg)));
                }
                insn
            })
            .collect();
        block.insns.splice(0..0, phis);
    }
}

/// Binds every register argument to an SSA version by walking the
/// dominator tree with an explicit frame stack.
fn rename(unit: &mut MethodUnit, dom: &DominatorInfo) {
    enum Frame {
        Enter(BlockId),
        Leave(Vec<u16>),
    }

    let regs = unit.regs_count as usize;
    let entry = unit.entry;
    let arg_count = unit.arg_types.len();
    let arg_regs: Vec<u16> = (0..arg_count).map(|i| unit.arg_reg(i)).collect();

    let MethodUnit {
        blocks,
        arena,
        diagnostics,
        ..
    } = unit;

    let mut stacks: Vec<Vec<SsaVarId>> = vec![Vec::new(); regs];
    for (index, &reg) in arg_regs.iter().enumerate() {
        let id = arena.alloc(reg, DefSite::Param(index));
        stacks[reg as usize].push(id);
    }

    let mut undefined_warned = BitSet::with_capacity(regs);
    let mut frames = vec![Frame::Enter(entry)];
    while let Some(frame) = frames.pop() {
        match frame {
            Frame::Enter(b) => {
                let bi = b.index();
                let mut pushed: Vec<u16> = Vec::new();

                for idx in 0..blocks[bi].insns.len() {
                    let site = InsnSite { block: b, idx };
                    let insn = &mut blocks[bi].insns[idx];
                    if !insn.is_phi() {
                        // Phi arguments are bound from their predecessors.
                        insn.visit_uses_mut(&mut |arg| {
                            let r = arg.reg as usize;
                            let id = match stacks[r].last() {
                                Some(&id) => id,
                                None => {
                                    let id = arena.alloc(arg.reg, DefSite::Undefined);
                                    stacks[r].push(id);
                                    pushed.push(arg.reg);
                                    if !undefined_warned.contains(r) {
                                        undefined_warned.insert(r);
                                        diagnostics.push(Diagnostic::warning(format!(
                                            "register v{} read before any definition",
                                            arg.reg
                                        )));
                                    }
                                    id
                                }
                            };
                            arg.ssa = Some(id);
                            arena.add_use(id, site);
                        });
                    }
                    if let Some(result) = &mut insn.result {
                        let id = arena.alloc(result.reg, DefSite::Insn(site));
                        result.ssa = Some(id);
                        stacks[result.reg as usize].push(id);
                        pushed.push(result.reg);
                    }
                }

                // Bind this block's value into successor phis.
                let succs: Vec<BlockId> = blocks[bi].all_succs().collect();
                for succ in succs {
                    let si = succ.index();
                    let pred_pos = {
                        let sblock = &blocks[si];
                        sblock
                            .preds
                            .iter()
                            .chain(sblock.exc_preds.iter())
                            .position(|&p| p == b)
                    };
                    let Some(pos) = pred_pos else {
                        continue;
                    };
                    for idx in 0..blocks[si].insns.len() {
                        if !blocks[si].insns[idx].is_phi() {
                            break;
                        }
                        let reg = match &blocks[si].insns[idx].result {
                            Some(result) => result.reg,
                            None => continue,
                        };
                        let top = stacks[reg as usize].last().copied();
                        if let InsnArg::Reg(arg) = &mut blocks[si].insns[idx].args[pos] {
                            // A path without a definition leaves the
                            // argument unbound; cleanup treats it as a
                            // wildcard.
                            arg.ssa = top;
                        }
                        if let Some(id) = top {
                            arena.add_use(id, InsnSite { block: succ, idx });
                        }
                    }
                }

                frames.push(Frame::Leave(pushed));
                for &child in dom.children(b).iter().rev() {
                    frames.push(Frame::Enter(child));
                }
            }
            Frame::Leave(pushed) => {
                for reg in pushed {
                    stacks[reg as usize].pop();
                }
            }
        }
    }
}

/// Removes phis that are dead (result unused) or trivial (every bound
/// argument is one value, unbound arguments acting as wildcards),
/// rewriting uses of a trivial phi's result to the surviving value.
/// Repeats until stable since one removal can expose another.
fn cleanup_phis(unit: &mut MethodUnit) {
    loop {
        // Fresh use counts; arena bookkeeping is rebuilt after cleanup.
        let mut use_counts = vec![0usize; unit.arena.ssa_count()];
        for block in &unit.blocks {
            for insn in &block.insns {
                insn.visit_uses(&mut |arg| {
                    if let Some(id) = arg.ssa {
                        use_counts[id.index()] += 1;
                    }
                });
            }
        }

        enum Action {
            Remove { block: BlockId, idx: usize },
            Replace { block: BlockId, idx: usize, from: SsaVarId, to: SsaVarId },
        }
        let mut action: Option<Action> = None;

        'scan: for block in &unit.blocks {
            for (idx, insn) in block.insns.iter().enumerate() {
                if !insn.is_phi() {
                    break;
                }
                let Some(result) = insn.result.as_ref().and_then(|r| r.ssa) else {
                    continue;
                };
                if use_counts[result.index()] == 0 {
                    action = Some(Action::Remove {
                        block: block.id,
                        idx,
                    });
                    break 'scan;
                }
                let mut sources: Vec<SsaVarId> = Vec::new();
                for arg in &insn.args {
                    if let InsnArg::Reg(reg) = arg {
                        if let Some(id) = reg.ssa {
                            if id != result && !sources.contains(&id) {
                                sources.push(id);
                            }
                        }
                    }
                }
                if sources.len() == 1 {
                    action = Some(Action::Replace {
                        block: block.id,
                        idx,
                        from: result,
                        to: sources[0],
                    });
                    break 'scan;
                }
            }
        }

        match action {
            Some(Action::Remove { block, idx }) => {
                unit.block_mut(block).insns.remove(idx);
            }
            Some(Action::Replace {
                block,
                idx,
                from,
                to,
            }) => {
                unit.block_mut(block).insns.remove(idx);
                for b in 0..unit.blocks.len() {
                    for insn in &mut unit.blocks[b].insns {
                        insn.visit_uses_mut(&mut |arg| {
                            if arg.ssa == Some(from) {
                                arg.ssa = Some(to);
                            }
                        });
                    }
                }
            }
            None => break,
        }
    }
}

/// Recomputes definition and use sites from the instructions, replacing
/// any bookkeeping the cleanup pass invalidated.
fn rebuild_sites(unit: &mut MethodUnit) {
    let MethodUnit { blocks, arena, .. } = unit;
    arena.clear_uses();
    for block in blocks.iter() {
        for (idx, insn) in block.insns.iter().enumerate() {
            let site = InsnSite {
                block: block.id,
                idx,
            };
            insn.visit_uses(&mut |arg| {
                if let Some(id) = arg.ssa {
                    arena.add_use(id, site);
                }
            });
            if let Some(id) = insn.result.as_ref().and_then(|r| r.ssa) {
                arena.var_mut(id).def = DefSite::Insn(site);
            }
        }
    }
}

/// Groups SSA versions united by phis into source-level variables and
/// attaches validated-later debug names.
fn group_code_vars(unit: &mut MethodUnit) {
    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }

    let count = unit.arena.ssa_count();
    let mut parent: Vec<usize> = (0..count).collect();
    let mut referenced = BitSet::with_capacity(count);

    for block in &unit.blocks {
        for insn in &block.insns {
            if let Some(id) = insn.result.as_ref().and_then(|r| r.ssa) {
                referenced.insert(id.index());
            }
            insn.visit_uses(&mut |arg| {
                if let Some(id) = arg.ssa {
                    referenced.insert(id.index());
                }
            });
            if insn.is_phi() {
                let Some(result) = insn.result.as_ref().and_then(|r| r.ssa) else {
                    continue;
                };
                for arg in &insn.args {
                    if let InsnArg::Reg(reg) = arg {
                        if let Some(id) = reg.ssa {
                            let a = find(&mut parent, result.index());
                            let b = find(&mut parent, id.index());
                            parent[a] = b;
                        }
                    }
                }
            }
        }
    }
    // Arguments surface even when unused.
    for var in unit.arena.ssa_vars() {
        if matches!(var.def, DefSite::Param(_)) {
            referenced.insert(var.id.index());
        }
    }

    let mut groups: BTreeMap<usize, Vec<SsaVarId>> = BTreeMap::new();
    for id in 0..count {
        if referenced.contains(id) {
            let root = find(&mut parent, id);
            groups.entry(root).or_default().push(SsaVarId::new(id));
        }
    }
    let groups: Vec<Vec<SsaVarId>> = groups.into_values().collect();
    for members in groups {
        let code_var = unit.arena.new_code_var(members);
        attach_debug_name(unit, code_var);
    }
}

/// Binds a debug-info name to the variable when one of its use sites falls
/// inside a matching named range.
fn attach_debug_name(unit: &mut MethodUnit, code_var: crate::ssa::CodeVarId) {
    let Some(debug) = &unit.debug else {
        return;
    };
    let members = unit.arena.code_var(code_var).ssa_vars.clone();
    let Some(&first) = members.first() else {
        return;
    };
    let reg = unit.arena.var(first).reg;

    // Ranges in real debug tables open right after the defining store, so
    // both the definition and any use count as coverage.
    let mut offsets: Vec<u32> = Vec::new();
    let mut is_param = false;
    for &member in &members {
        let var = unit.arena.var(member);
        match var.def {
            DefSite::Param(_) => is_param = true,
            DefSite::Insn(site) => {
                let offset = unit.block(site.block).insns[site.idx].offset;
                if offset != crate::ir::SYNTHETIC_OFFSET {
                    offsets.push(offset);
                }
            }
            DefSite::Undefined => {}
        }
        for site in &var.uses {
            let offset = unit.block(site.block).insns[site.idx].offset;
            if offset != crate::ir::SYNTHETIC_OFFSET {
                offsets.push(offset);
            }
        }
    }

    let name = debug.locals.iter().find_map(|local| {
        if local.reg != reg {
            return None;
        }
        let covers = offsets
            .iter()
            .any(|&o| o >= local.start_offset && o < local.end_offset);
        let covers_param = is_param && local.start_offset == 0;
        (covers || covers_param).then(|| local.name.clone())
    });
    if name.is_some() {
        unit.arena.code_var_mut(code_var).debug_name = name;
    }
}
