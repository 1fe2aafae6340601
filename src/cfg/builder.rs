//! Basic-block graph construction from a flat instruction stream.
//!
//! Construction splits the stream at every leader offset (the entry, each
//! branch target, each offset following a block-ending instruction, and
//! every exception range and handler boundary), then wires normal edges
//! from the branch shapes and exceptional edges from the table. All input
//! validation happens up front: once an offset or target is known bad the
//! whole method is rejected, and the driver downgrades it to fallback
//! output while sibling methods proceed untouched.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use crate::ir::{BlockAttr, BlockFlags, BlockId, ExcHandlerInfo, HandlerId, InsnKind, MethodUnit};
use crate::{Error, Result};

/// Successor shape of a block's last instruction.
enum EdgeKind {
    If(u32),
    Goto(u32),
    Switch(Vec<u32>),
    Return,
    Throw,
    Fall,
}

/// Splits the unit's instruction stream into basic blocks and wires all
/// normal and exceptional edges.
///
/// On success `unit.blocks` holds the graph with `unit.entry` pointing at a
/// block without predecessors, and `unit.handlers` lists one resolved
/// handler per usable exception table row. The raw instruction stream is
/// left in place for fallback output.
///
/// # Errors
///
/// Returns [`Error::Empty`] for a method without instructions,
/// [`Error::InvalidOffset`] when a branch target, switch case or exception
/// boundary does not land on an instruction, and [`Error::Malformed`] when
/// offsets do not ascend or control can fall off the end of the stream.
pub fn build_blocks(unit: &mut MethodUnit) -> Result<()> {
    if unit.raw_insns.is_empty() {
        return Err(Error::Empty);
    }

    // Offset map for target resolution; offsets must strictly ascend.
    let mut offsets: BTreeMap<u32, usize> = BTreeMap::new();
    let mut prev: Option<u32> = None;
    for (idx, insn) in unit.raw_insns.iter().enumerate() {
        if let Some(p) = prev {
            if insn.offset <= p {
                return Err(malformed_error!(
                    "instruction offsets not strictly increasing at {:#x}",
                    insn.offset
                ));
            }
        }
        prev = Some(insn.offset);
        offsets.insert(insn.offset, idx);
    }
    let first_offset = unit.raw_insns[0].offset;
    let last_offset = prev.unwrap_or(first_offset);

    let last_kind = &unit.raw_insns[unit.raw_insns.len() - 1].kind;
    if !last_kind.is_terminal() {
        return Err(malformed_error!(
            "control falls off the end of `{}` at {:#x}",
            unit.name,
            last_offset
        ));
    }

    // Register operands must fit the declared register count; every later
    // pass sizes its bit sets from it. Arguments live in the highest
    // slots, so there must be at least one slot per argument.
    let regs = unit.regs_count;
    if unit.arg_types.len() > regs as usize {
        return Err(Error::OutOfBounds(format!(
            "`{}` declares {} registers for {} arguments",
            unit.name,
            regs,
            unit.arg_types.len()
        )));
    }
    for insn in &unit.raw_insns {
        let mut bad: Option<u16> = None;
        insn.visit_uses(&mut |reg| {
            if reg.reg >= regs {
                bad = Some(reg.reg);
            }
        });
        if let Some(result) = &insn.result {
            if result.reg >= regs {
                bad = Some(result.reg);
            }
        }
        if let Some(reg) = bad {
            return Err(Error::OutOfBounds(format!(
                "register v{} at {:#x} exceeds declared count {}",
                reg, insn.offset, regs
            )));
        }
    }

    // Leader offsets start blocks.
    let mut leaders: BTreeSet<u32> = BTreeSet::new();
    leaders.insert(first_offset);
    for insn in &unit.raw_insns {
        for target in insn.target_offsets() {
            if !offsets.contains_key(&target) {
                return Err(Error::InvalidOffset(target));
            }
            leaders.insert(target);
        }
        if insn.kind.ends_block() {
            let after = (Bound::Excluded(insn.offset), Bound::Unbounded);
            if let Some((&next, _)) = offsets.range(after).next() {
                leaders.insert(next);
            }
        }
    }
    for exc in &unit.exceptions {
        if !offsets.contains_key(&exc.start_offset) {
            return Err(Error::InvalidOffset(exc.start_offset));
        }
        leaders.insert(exc.start_offset);
        // A range end past the last instruction covers through the stream
        // end; anywhere else it must be a boundary so no block straddles it.
        if offsets.contains_key(&exc.end_offset) {
            leaders.insert(exc.end_offset);
        } else if exc.end_offset <= last_offset {
            return Err(Error::InvalidOffset(exc.end_offset));
        }
        if !offsets.contains_key(&exc.handler_offset) {
            return Err(Error::InvalidOffset(exc.handler_offset));
        }
        leaders.insert(exc.handler_offset);
    }

    // Construction is infallible from here on.
    let mut block_at: BTreeMap<u32, BlockId> = BTreeMap::new();
    for &leader in &leaders {
        let id = unit.add_block(leader);
        block_at.insert(leader, id);
    }

    let insns = std::mem::take(&mut unit.raw_insns);
    let mut current = BlockId::new(0);
    for insn in &insns {
        if let Some(&id) = block_at.get(&insn.offset) {
            current = id;
        }
        unit.block_mut(current).insns.push(insn.clone());
    }
    unit.raw_insns = insns;

    // Normal edges. Block ids follow leader order, so the fall-through of
    // block `i` is block `i + 1`; the terminal-last-instruction check above
    // guarantees it exists wherever it is needed.
    for bi in 0..unit.blocks.len() {
        let id = BlockId::new(bi);
        let edge = match unit.block(id).insns.last().map(|insn| &insn.kind) {
            Some(InsnKind::If { target, .. }) => EdgeKind::If(*target),
            Some(InsnKind::Goto { target }) => EdgeKind::Goto(*target),
            Some(InsnKind::Switch { cases, default }) => {
                let mut targets: Vec<u32> = cases.iter().map(|(_, target)| *target).collect();
                targets.push(*default);
                EdgeKind::Switch(targets)
            }
            Some(InsnKind::Return) => EdgeKind::Return,
            Some(InsnKind::Throw) => EdgeKind::Throw,
            _ => EdgeKind::Fall,
        };
        match edge {
            EdgeKind::If(target) => {
                // Taken edge first, then the fall-through.
                unit.connect(id, block_at[&target]);
                unit.connect(id, BlockId::new(bi + 1));
            }
            EdgeKind::Goto(target) => unit.connect(id, block_at[&target]),
            EdgeKind::Switch(targets) => {
                // Case targets in table order, the default last.
                for target in targets {
                    unit.connect(id, block_at[&target]);
                }
            }
            EdgeKind::Return => unit.block_mut(id).flags |= BlockFlags::RETURN,
            EdgeKind::Throw => {}
            EdgeKind::Fall => unit.connect(id, BlockId::new(bi + 1)),
        }
    }

    // Exception overlay: every covered block gets an exceptional edge to
    // the handler entry.
    let exceptions = unit.exceptions.clone();
    for (index, exc) in exceptions.iter().enumerate() {
        if exc.start_offset >= exc.end_offset {
            unit.warn(format!(
                "exception entry {index} covers an empty range, ignored"
            ));
            continue;
        }
        let handler_block = block_at[&exc.handler_offset];
        let covered: Vec<BlockId> = unit
            .blocks
            .iter()
            .filter(|block| {
                block.start_offset >= exc.start_offset && block.start_offset < exc.end_offset
            })
            .map(|block| block.id)
            .collect();

        let handler_id = HandlerId::new(unit.handlers.len());
        let hb = unit.block_mut(handler_block);
        hb.flags |= BlockFlags::HANDLER;
        hb.attrs.push(BlockAttr::Handler(handler_id));

        for &covered_block in &covered {
            if covered_block != handler_block {
                unit.connect_exc(covered_block, handler_block);
            }
        }
        unit.handlers.push(ExcHandlerInfo {
            id: handler_id,
            block: handler_block,
            catch_type: exc.catch_type.clone(),
            start_offset: exc.start_offset,
            end_offset: exc.end_offset,
            range: covered,
        });
    }

    // The entry must have no predecessors; give it a synthetic stand-in
    // when the first block is itself a branch target.
    let first_block = BlockId::new(0);
    let needs_entry = !unit.block(first_block).preds.is_empty()
        || !unit.block(first_block).exc_preds.is_empty();
    if needs_entry {
        let offset = unit.block(first_block).start_offset;
        let entry = unit.add_block(offset);
        unit.block_mut(entry).flags |= BlockFlags::SYNTHETIC;
        unit.connect(entry, first_block);
        unit.entry = entry;
    } else {
        unit.entry = first_block;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Instruction, MethodBody, RegisterArg};
    use crate::types::ArgType;

    fn ret(reg: u16) -> Instruction {
        Instruction::new(InsnKind::Return).with_reg(RegisterArg::new(reg))
    }

    fn const_int(reg: u16, value: i64) -> Instruction {
        Instruction::new(InsnKind::Const { value, wide: false })
            .with_result(RegisterArg::new(reg))
    }

    fn if_eqz(reg: u16, target: u32) -> Instruction {
        Instruction::new(InsnKind::If {
            op: crate::ir::CmpOp::Eq,
            target,
        })
        .with_reg(RegisterArg::new(reg))
    }

    fn goto(target: u32) -> Instruction {
        Instruction::new(InsnKind::Goto { target })
    }

    fn unit_of(body: MethodBody) -> MethodUnit {
        MethodUnit::new(body)
    }

    #[test]
    fn test_straight_line_is_one_block() {
        let mut unit = unit_of(
            MethodBody::builder("test")
                .regs(1)
                .insn(const_int(0, 7))
                .insn(ret(0))
                .build(),
        );
        build_blocks(&mut unit).unwrap();

        assert_eq!(unit.blocks.len(), 1);
        assert_eq!(unit.entry, BlockId::new(0));
        assert_eq!(unit.block(unit.entry).insns.len(), 2);
        assert!(unit.block(unit.entry).has_flag(BlockFlags::RETURN));
    }

    #[test]
    fn test_diamond_edges() {
        // 0: if v0 == 0 goto 3 / 1: const / 2: goto 4 / 3: const / 4: ret
        let mut unit = unit_of(
            MethodBody::builder("test")
                .regs(2)
                .args(&[ArgType::INT])
                .insn(if_eqz(1, 3))
                .insn(const_int(0, 1))
                .insn(goto(4))
                .insn(const_int(0, 2))
                .insn(ret(0))
                .build(),
        );
        build_blocks(&mut unit).unwrap();

        assert_eq!(unit.blocks.len(), 4);
        let cond = unit.block(BlockId::new(0));
        // Taken edge (offset 3 = block 2) before the fall-through (block 1).
        assert_eq!(cond.succs, vec![BlockId::new(2), BlockId::new(1)]);
        let merge = unit.block(BlockId::new(3));
        assert_eq!(merge.preds.len(), 2);
    }

    #[test]
    fn test_switch_successor_order() {
        // 0: switch v0 {1 -> 2, 2 -> 3, default 1} / 1..3: goto 4 / 4: ret
        let mut unit = unit_of(
            MethodBody::builder("test")
                .regs(1)
                .insn(
                    Instruction::new(InsnKind::Switch {
                        cases: vec![(1, 2), (2, 3)],
                        default: 1,
                    })
                    .with_reg(RegisterArg::new(0)),
                )
                .insn(goto(4))
                .insn(goto(4))
                .insn(goto(4))
                .insn(ret(0))
                .build(),
        );
        build_blocks(&mut unit).unwrap();

        let switch = unit.block(BlockId::new(0));
        // Case blocks in table order, then the default.
        assert_eq!(
            switch.succs,
            vec![BlockId::new(2), BlockId::new(3), BlockId::new(1)]
        );
    }

    #[test]
    fn test_handler_wiring() {
        // 0: const / 1: goto 3 / 2: goto 3 (handler) / 3: ret
        let mut unit = unit_of(
            MethodBody::builder("test")
                .regs(1)
                .insn(const_int(0, 1))
                .insn(goto(3))
                .insn(goto(3))
                .insn(ret(0))
                .catch(0, 2, 2, Some("java.lang.Exception"))
                .build(),
        );
        build_blocks(&mut unit).unwrap();

        let handler = unit.block(BlockId::new(1));
        assert!(handler.has_flag(BlockFlags::HANDLER));
        assert_eq!(handler.exc_preds, vec![BlockId::new(0)]);
        assert_eq!(unit.handlers.len(), 1);
        assert_eq!(unit.handlers[0].block, BlockId::new(1));
        assert_eq!(unit.handlers[0].range, vec![BlockId::new(0)]);
        assert_eq!(
            unit.handlers[0].catch_type.as_deref(),
            Some("java.lang.Exception")
        );
    }

    #[test]
    fn test_synthetic_entry_when_first_block_is_target() {
        // 0: const / 1: if v0 == 0 goto 0 / 2: ret
        let mut unit = unit_of(
            MethodBody::builder("test")
                .regs(1)
                .insn(const_int(0, 1))
                .insn(if_eqz(0, 0))
                .insn(ret(0))
                .build(),
        );
        build_blocks(&mut unit).unwrap();

        let entry = unit.block(unit.entry);
        assert!(entry.has_flag(BlockFlags::SYNTHETIC));
        assert!(entry.insns.is_empty());
        assert!(entry.preds.is_empty());
        assert_eq!(entry.succs, vec![BlockId::new(0)]);
    }

    #[test]
    fn test_empty_stream_rejected() {
        let mut unit = unit_of(MethodBody::builder("test").regs(0).build());
        assert!(matches!(build_blocks(&mut unit), Err(Error::Empty)));
    }

    #[test]
    fn test_misaligned_branch_target_rejected() {
        let mut unit = unit_of(
            MethodBody::builder("test")
                .regs(1)
                .insn(if_eqz(0, 6).at(0))
                .insn(const_int(0, 1).at(4))
                .insn(ret(0).at(8))
                .build(),
        );
        assert!(matches!(
            build_blocks(&mut unit),
            Err(Error::InvalidOffset(6))
        ));
    }

    #[test]
    fn test_misaligned_handler_offset_rejected() {
        let mut unit = unit_of(
            MethodBody::builder("test")
                .regs(1)
                .insn(const_int(0, 1).at(0))
                .insn(ret(0).at(4))
                .catch(0, 4, 2, None)
                .build(),
        );
        assert!(matches!(
            build_blocks(&mut unit),
            Err(Error::InvalidOffset(2))
        ));
    }

    #[test]
    fn test_register_out_of_declared_range_rejected() {
        let mut unit = unit_of(
            MethodBody::builder("test")
                .regs(1)
                .insn(const_int(4, 1))
                .insn(ret(4))
                .build(),
        );
        assert!(matches!(
            build_blocks(&mut unit),
            Err(Error::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_more_args_than_registers_rejected() {
        let mut unit = unit_of(
            MethodBody::builder("test")
                .regs(1)
                .args(&[ArgType::INT, ArgType::INT])
                .insn(ret(0))
                .build(),
        );
        assert!(matches!(
            build_blocks(&mut unit),
            Err(Error::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_fall_off_the_end_rejected() {
        let mut unit = unit_of(
            MethodBody::builder("test")
                .regs(1)
                .insn(const_int(0, 1))
                .build(),
        );
        assert!(matches!(build_blocks(&mut unit), Err(Error::Malformed { .. })));
    }
}
