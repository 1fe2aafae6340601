//! Loop structuring.

use crate::ir::{BasicBlock, BlockId, CmpOp, InsnKind, LoopInfo, MethodUnit};
use crate::regions::maker::{LoopCtx, RegionMaker};
use crate::regions::{LoopKind, Region};
use crate::Result;

impl RegionMaker<'_> {
    /// Structures the natural loop headed at `header`.
    ///
    /// Condition placement is decided in order: a self-loop tests after its
    /// single block, a header whose compare exits the loop tests on entry,
    /// a lone back-edge block whose compare exits tests after the body, and
    /// anything else is endless. The compare is normalized so it holding
    /// means another iteration. Sequential flow resumes at the loop exit.
    pub(crate) fn make_loop(&mut self, header: BlockId) -> Result<(Region, Option<BlockId>)> {
        let Some(info) = self.unit.loops.iter().find(|l| l.header == header) else {
            // Flag without a recorded loop; treat as a plain leaf.
            self.processed.insert(header.index());
            let follow = self.unit.block(header).succs.first().copied();
            return Ok((Region::Block(header), follow));
        };
        let hblock = self.unit.block(header);

        let mut kind = LoopKind::Endless;
        let mut cond = None;
        let mut exit = None;
        let mut cond_end = None;
        let mut header_claimed = false;

        if let Some(shape) = self_loop_shape(hblock, info) {
            kind = LoopKind::Conditional { at_end: true };
            cond = Some((header, shape.op));
            exit = Some(shape.exit);
            header_claimed = true;
        } else if let Some(shape) = exit_if_shape(hblock, info) {
            kind = LoopKind::Conditional { at_end: false };
            cond = Some((header, shape.op));
            exit = Some(shape.exit);
            header_claimed = true;
        } else if let Some((back, shape)) = trailing_test(self.unit, info, header) {
            kind = LoopKind::Conditional { at_end: true };
            cond = Some((back, shape.op));
            exit = Some(shape.exit);
            cond_end = Some(back);
        }

        if exit.is_none() {
            exit = first_outside_target(self.unit, info);
        }

        // A header compare the loop did not claim as its exit test is body
        // code; the header then enters the body unprocessed and structures
        // as an ordinary conditional.
        let header_in_body =
            !header_claimed && compare_op(hblock).is_some() && hblock.succs.len() == 2;

        let body_start = if header_in_body {
            Some(header)
        } else {
            self.processed.insert(header.index());
            match kind {
                // A self-loop's only block is the header.
                LoopKind::Conditional { at_end: true } if cond_end.is_none() => None,
                _ => hblock
                    .succs
                    .iter()
                    .copied()
                    .find(|succ| *succ != header && info.contains(*succ)),
            }
        };

        self.loops.push(LoopCtx {
            header,
            exit,
            cond_end,
        });
        let exits: Vec<BlockId> = exit.into_iter().collect();
        self.stack.push(&exits);
        let body = match body_start {
            Some(start) if !self.processed.contains(start.index()) => {
                self.traverse_from(start, Some(header))
            }
            _ => Ok(Region::Sequence(Vec::new())),
        };
        self.stack.pop();
        self.loops.pop();

        let region = Region::Loop {
            id: info.id,
            kind,
            header,
            cond,
            body: Box::new(body?),
        };
        Ok((region, exit))
    }
}

/// A loop-exiting compare, normalized so `op` holding stays in the loop.
struct ExitIf {
    op: CmpOp,
    exit: BlockId,
}

/// Matches a single-block loop ending in a compare: one successor is the
/// header itself, the other leaves the loop.
fn self_loop_shape(hblock: &BasicBlock, info: &LoopInfo) -> Option<ExitIf> {
    if info.back_edges.as_slice() != [hblock.id] {
        return None;
    }
    let op = compare_op(hblock)?;
    match hblock.succs.as_slice() {
        [taken, fall] if *taken == hblock.id && !info.contains(*fall) => {
            Some(ExitIf { op, exit: *fall })
        }
        [taken, fall] if *fall == hblock.id && !info.contains(*taken) => Some(ExitIf {
            op: op.invert(),
            exit: *taken,
        }),
        _ => None,
    }
}

/// Matches a header compare with exactly one successor outside the loop.
fn exit_if_shape(hblock: &BasicBlock, info: &LoopInfo) -> Option<ExitIf> {
    let op = compare_op(hblock)?;
    match hblock.succs.as_slice() {
        [taken, fall] if info.contains(*taken) && !info.contains(*fall) => {
            Some(ExitIf { op, exit: *fall })
        }
        [taken, fall] if !info.contains(*taken) && info.contains(*fall) => Some(ExitIf {
            op: op.invert(),
            exit: *taken,
        }),
        _ => None,
    }
}

/// Matches a lone back-edge block ending in a compare that either re-enters
/// the header or leaves the loop.
fn trailing_test(
    unit: &MethodUnit,
    info: &LoopInfo,
    header: BlockId,
) -> Option<(BlockId, ExitIf)> {
    let [back] = info.back_edges.as_slice() else {
        return None;
    };
    let bblock = unit.block(*back);
    let op = compare_op(bblock)?;
    let shape = match bblock.succs.as_slice() {
        [taken, fall] if *taken == header && !info.contains(*fall) => {
            ExitIf { op, exit: *fall }
        }
        [taken, fall] if *fall == header && !info.contains(*taken) => ExitIf {
            op: op.invert(),
            exit: *taken,
        },
        _ => return None,
    };
    Some((*back, shape))
}

fn compare_op(block: &BasicBlock) -> Option<CmpOp> {
    match block.terminator().map(|insn| &insn.kind) {
        Some(InsnKind::If { op, .. }) => Some(*op),
        _ => None,
    }
}

/// First successor outside the loop, scanning body blocks in id order.
fn first_outside_target(unit: &MethodUnit, info: &LoopInfo) -> Option<BlockId> {
    for index in info.body.ones() {
        for succ in &unit.block(BlockId::new(index)).succs {
            if !info.contains(*succ) {
                return Some(*succ);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::DominatorInfo;
    use crate::ir::{BlockFlags, Instruction, LoopId, MethodBody, RegisterArg};
    use crate::pipeline::DecompilerOptions;
    use crate::regions::{make_regions, EdgeKind};
    use crate::utils::BitSet;

    fn unit_with_edges(block_count: usize, edges: &[(usize, usize)]) -> MethodUnit {
        let mut unit = MethodUnit::new(MethodBody::builder("test").regs(2).build());
        for i in 0..block_count {
            unit.add_block(i as u32 * 0x10);
        }
        for &(from, to) in edges {
            unit.connect(BlockId::new(from), BlockId::new(to));
        }
        unit
    }

    fn put_if(unit: &mut MethodUnit, id: usize, op: CmpOp) {
        let block = unit.block_mut(BlockId::new(id));
        let offset = block.start_offset;
        block.insns.push(
            Instruction::new(InsnKind::If { op, target: 0 })
                .at(offset)
                .with_reg(RegisterArg::new(0)),
        );
    }

    fn put_return(unit: &mut MethodUnit, id: usize) {
        let block = unit.block_mut(BlockId::new(id));
        block.insns.push(Instruction::new(InsnKind::Return));
        block.flags |= BlockFlags::RETURN;
    }

    fn mark_loop(unit: &mut MethodUnit, header: usize, back: &[usize], body: &[usize]) {
        let mut set = BitSet::with_capacity(unit.blocks.len());
        for id in body {
            set.insert(*id);
        }
        unit.loops.push(LoopInfo {
            id: LoopId::new(unit.loops.len()),
            header: BlockId::new(header),
            back_edges: back.iter().map(|id| BlockId::new(*id)).collect(),
            body: set,
            depth: 1,
        });
        unit.block_mut(BlockId::new(header)).flags |= BlockFlags::LOOP_START;
    }

    fn structured(unit: &mut MethodUnit) -> Region {
        unit.dominators = Some(DominatorInfo::compute(unit));
        make_regions(unit, &DecompilerOptions::default()).unwrap();
        unit.region.clone().unwrap()
    }

    fn b(index: usize) -> BlockId {
        BlockId::new(index)
    }

    #[test]
    fn test_header_test_becomes_while_shape() {
        let mut unit = unit_with_edges(4, &[(0, 1), (1, 2), (1, 3), (2, 1)]);
        put_if(&mut unit, 1, CmpOp::Lt);
        put_return(&mut unit, 3);
        mark_loop(&mut unit, 1, &[2], &[1, 2]);

        let region = structured(&mut unit);
        assert_eq!(
            region,
            Region::Sequence(vec![
                Region::Block(b(0)),
                Region::Loop {
                    id: LoopId::new(0),
                    kind: LoopKind::Conditional { at_end: false },
                    header: b(1),
                    cond: Some((b(1), CmpOp::Lt)),
                    body: Box::new(Region::Block(b(2))),
                },
                Region::Block(b(3)),
            ])
        );
    }

    #[test]
    fn test_exit_on_taken_edge_inverts_compare() {
        // Taken edge leaves the loop, so staying means the compare fails.
        let mut unit = unit_with_edges(4, &[(0, 1), (1, 3), (1, 2), (2, 1)]);
        put_if(&mut unit, 1, CmpOp::Ge);
        put_return(&mut unit, 3);
        mark_loop(&mut unit, 1, &[2], &[1, 2]);

        let region = structured(&mut unit);
        let Region::Sequence(children) = &region else {
            panic!("expected sequence, got {region:?}");
        };
        assert_eq!(
            children[1],
            Region::Loop {
                id: LoopId::new(0),
                kind: LoopKind::Conditional { at_end: false },
                header: b(1),
                cond: Some((b(1), CmpOp::Lt)),
                body: Box::new(Region::Block(b(2))),
            }
        );
    }

    #[test]
    fn test_trailing_test_becomes_do_while_shape() {
        let mut unit = unit_with_edges(4, &[(0, 1), (1, 2), (2, 1), (2, 3)]);
        put_if(&mut unit, 2, CmpOp::Ge);
        put_return(&mut unit, 3);
        mark_loop(&mut unit, 1, &[2], &[1, 2]);

        let region = structured(&mut unit);
        assert_eq!(
            region,
            Region::Sequence(vec![
                Region::Block(b(0)),
                Region::Loop {
                    id: LoopId::new(0),
                    kind: LoopKind::Conditional { at_end: true },
                    header: b(1),
                    cond: Some((b(2), CmpOp::Ge)),
                    body: Box::new(Region::Block(b(2))),
                },
                Region::Block(b(3)),
            ])
        );
    }

    #[test]
    fn test_single_block_loop_tests_after_body() {
        let mut unit = unit_with_edges(3, &[(0, 1), (1, 1), (1, 2)]);
        put_if(&mut unit, 1, CmpOp::Lt);
        put_return(&mut unit, 2);
        mark_loop(&mut unit, 1, &[1], &[1]);

        let region = structured(&mut unit);
        assert_eq!(
            region,
            Region::Sequence(vec![
                Region::Block(b(0)),
                Region::Loop {
                    id: LoopId::new(0),
                    kind: LoopKind::Conditional { at_end: true },
                    header: b(1),
                    cond: Some((b(1), CmpOp::Lt)),
                    body: Box::new(Region::Sequence(Vec::new())),
                },
                Region::Block(b(2)),
            ])
        );
    }

    #[test]
    fn test_header_branch_inside_loop_structures_as_if() {
        // do { if (x) {2} else {3} merge; } while (cond at 4)
        let mut unit = unit_with_edges(
            6,
            &[(0, 1), (1, 2), (1, 3), (2, 4), (3, 4), (4, 1), (4, 5)],
        );
        put_if(&mut unit, 1, CmpOp::Eq);
        put_if(&mut unit, 4, CmpOp::Lt);
        put_return(&mut unit, 5);
        mark_loop(&mut unit, 1, &[4], &[1, 2, 3, 4]);

        let region = structured(&mut unit);
        assert_eq!(
            region,
            Region::Sequence(vec![
                Region::Block(b(0)),
                Region::Loop {
                    id: LoopId::new(0),
                    kind: LoopKind::Conditional { at_end: true },
                    header: b(1),
                    cond: Some((b(4), CmpOp::Lt)),
                    body: Box::new(Region::Sequence(vec![
                        Region::If {
                            cond: b(1),
                            op: CmpOp::Eq,
                            then: Box::new(Region::Block(b(2))),
                            otherwise: Some(Box::new(Region::Block(b(3)))),
                        },
                        Region::Block(b(4)),
                    ])),
                },
                Region::Block(b(5)),
            ])
        );
        let mut owned: Vec<usize> = region.block_ids().iter().map(|id| id.index()).collect();
        owned.sort_unstable();
        assert_eq!(owned, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_endless_loop_marks_break_and_continue() {
        // loop { if (cond) { continue-ish tail } else break }
        let mut unit = unit_with_edges(5, &[(0, 1), (1, 2), (2, 4), (2, 3), (3, 1)]);
        put_if(&mut unit, 2, CmpOp::Eq);
        put_return(&mut unit, 4);
        mark_loop(&mut unit, 1, &[3], &[1, 2, 3]);

        let region = structured(&mut unit);
        let Region::Sequence(children) = &region else {
            panic!("expected sequence, got {region:?}");
        };
        let Region::Loop { kind, body, .. } = &children[1] else {
            panic!("expected loop, got {:?}", children[1]);
        };
        assert_eq!(*kind, LoopKind::Endless);

        let Region::Sequence(body_children) = body.as_ref() else {
            panic!("expected sequence body, got {body:?}");
        };
        assert_eq!(
            body_children.last(),
            Some(&Region::Edge {
                from: b(2),
                to: b(4),
                kind: EdgeKind::Break,
            })
        );
        let Region::If { then, .. } = &body_children[0] else {
            panic!("expected if, got {:?}", body_children[0]);
        };
        let Region::Sequence(arm) = then.as_ref() else {
            panic!("expected sequence arm, got {then:?}");
        };
        assert_eq!(
            arm.last(),
            Some(&Region::Edge {
                from: b(3),
                to: b(1),
                kind: EdgeKind::Continue,
            })
        );
    }
}
