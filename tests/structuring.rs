//! Control-flow structuring integration tests.
//!
//! These tests drive the analysis pipeline through the public API:
//! 1. Assemble a method body with `MethodBodyBuilder`
//! 2. Build and normalize the basic block graph
//! 3. Run region construction
//! 4. Verify the shape of the resulting region tree
//!
//! Every test also relies on the partition property: a block owned by one
//! region node must not appear under any other node.

use std::collections::BTreeSet;

use codelift::{
    cfg,
    ir::{
        BlockId, CmpOp, InsnKind, Instruction, MethodBody, MethodUnit, RegisterArg,
    },
    pipeline::DecompilerOptions,
    regions::{self, EdgeKind, LoopKind, Region},
    Result,
};

/// Runs block construction, normalization and region construction on one
/// method body, with default options.
fn structure(body: MethodBody) -> Result<MethodUnit> {
    let options = DecompilerOptions::default();
    let mut unit = MethodUnit::new(body);
    cfg::build_blocks(&mut unit)?;
    cfg::process_blocks(&mut unit, &options)?;
    regions::make_regions(&mut unit, &options)?;
    Ok(unit)
}

/// Shorthand for a conditional branch on register `reg` against zero.
fn branch(op: CmpOp, target: u32, reg: u16) -> Instruction {
    Instruction::new(InsnKind::If { op, target }).with_reg(RegisterArg::new(reg))
}

/// Shorthand for a small constant load into `reg`.
fn load(reg: u16, value: i64) -> Instruction {
    Instruction::new(InsnKind::Const { value, wide: false }).with_result(RegisterArg::new(reg))
}

/// Shorthand for returning register `reg`.
fn ret(reg: u16) -> Instruction {
    Instruction::new(InsnKind::Return).with_reg(RegisterArg::new(reg))
}

/// True when any node of the tree is a `Region::If`.
fn contains_if(region: &Region) -> bool {
    match region {
        Region::If { .. } => true,
        Region::Sequence(children) => children.iter().any(contains_if),
        Region::Loop { body, .. } => contains_if(body),
        Region::Switch { cases, default, .. } => {
            cases.iter().any(|case| contains_if(&case.body))
                || default.as_deref().is_some_and(contains_if)
        }
        Region::TryCatch { body, handlers } => {
            contains_if(body) || handlers.iter().any(|handler| contains_if(&handler.body))
        }
        Region::Block(_) | Region::Edge { .. } => false,
    }
}

#[test]
fn test_diamond_becomes_if_with_merge() -> Result<()> {
    // if (v1 == 0) { v0 = 2 } else { v0 = 1 }; return v0
    let body = MethodBody::builder("diamond")
        .regs(2)
        .insn(branch(CmpOp::Eq, 3, 1))
        .insn(load(0, 1))
        .insn(Instruction::new(InsnKind::Goto { target: 4 }))
        .insn(load(0, 2))
        .insn(ret(0))
        .build();
    let unit = structure(body)?;

    // Blocks: b0 = branch, b1 = fall-through arm, b2 = taken arm,
    // b3 = merge. The taken arm is not the merge, so the operator
    // survives unchanged and both arms are present.
    let expected = Region::Sequence(vec![
        Region::If {
            cond: BlockId::new(0),
            op: CmpOp::Eq,
            then: Box::new(Region::Block(BlockId::new(2))),
            otherwise: Some(Box::new(Region::Block(BlockId::new(1)))),
        },
        Region::Block(BlockId::new(3)),
    ]);
    assert_eq!(unit.region, Some(expected));
    Ok(())
}

#[test]
fn test_region_tree_partitions_reachable_blocks() -> Result<()> {
    // A loop wrapping a diamond: enough shapes that every ownership rule
    // (loop header, condition block, plain leaves) is exercised at once.
    let body = MethodBody::builder("partition")
        .regs(2)
        .insn(load(0, 0))
        .insn(branch(CmpOp::Ge, 8, 0)) // loop header, exit to return
        .insn(branch(CmpOp::Eq, 5, 1)) // diamond inside the body
        .insn(load(1, 1))
        .insn(Instruction::new(InsnKind::Goto { target: 6 }))
        .insn(load(1, 2))
        .insn(load(0, 3)) // merge, then back edge
        .insn(Instruction::new(InsnKind::Goto { target: 1 }))
        .insn(ret(0))
        .build();
    let unit = structure(body)?;
    let region = unit.region.as_ref().expect("region tree");

    let owned = region.block_ids();
    let distinct: BTreeSet<BlockId> = owned.iter().copied().collect();
    assert_eq!(owned.len(), distinct.len(), "a block is owned twice");

    let all: BTreeSet<BlockId> = unit.block_ids().collect();
    assert_eq!(distinct, all, "region tree misses or invents blocks");
    Ok(())
}

#[test]
fn test_single_back_edge_loop_has_no_residual_if() -> Result<()> {
    // v0 = 0; while (v0 < ...) { v0 = v0 + 1 }; return v0
    let body = MethodBody::builder("count")
        .regs(1)
        .insn(load(0, 0))
        .insn(branch(CmpOp::Ge, 4, 0))
        .insn(
            Instruction::new(InsnKind::Arith {
                op: codelift::ir::ArithOp::Add,
                wide: false,
            })
            .with_result(RegisterArg::new(0))
            .with_reg(RegisterArg::new(0))
            .with_lit(1),
        )
        .insn(Instruction::new(InsnKind::Goto { target: 1 }))
        .insn(ret(0))
        .build();
    let unit = structure(body)?;
    let region = unit.region.as_ref().expect("region tree");

    // The exit test belongs to the loop node. Leaving it behind as an If
    // around the back edge is exactly the degenerate shape this guards
    // against.
    assert!(!contains_if(region), "exit test structured as an If: {region:?}");

    let Region::Sequence(children) = region else {
        panic!("expected a sequence at the root, got {region:?}");
    };
    let Region::Loop { kind, header, cond, body, .. } = &children[1] else {
        panic!("expected a loop after the init block, got {:?}", children[1]);
    };
    assert_eq!(*kind, LoopKind::Conditional { at_end: false });
    assert_eq!(*header, BlockId::new(1));
    // Taken edge leaves the loop, so the operator is inverted to read as
    // the stay condition.
    assert_eq!(*cond, Some((BlockId::new(1), CmpOp::Lt)));
    assert_eq!(**body, Region::Block(BlockId::new(2)));
    Ok(())
}

#[test]
fn test_switch_cases_sharing_a_target_share_one_arm() -> Result<()> {
    let body = MethodBody::builder("dispatch")
        .regs(2)
        .insn(
            Instruction::new(InsnKind::Switch {
                cases: vec![(0, 1), (1, 1), (5, 3)],
                default: 5,
            })
            .with_reg(RegisterArg::new(1)),
        )
        .insn(load(0, 10))
        .insn(Instruction::new(InsnKind::Goto { target: 6 }))
        .insn(load(0, 20))
        .insn(Instruction::new(InsnKind::Goto { target: 6 }))
        .insn(load(0, 0))
        .insn(ret(0))
        .build();
    let unit = structure(body)?;
    let region = unit.region.as_ref().expect("region tree");

    let Region::Sequence(children) = region else {
        panic!("expected a sequence at the root, got {region:?}");
    };
    let Region::Switch { header, cases, default } = &children[0] else {
        panic!("expected a switch first, got {:?}", children[0]);
    };
    assert_eq!(*header, BlockId::new(0));

    // Case values 0 and 1 dispatch to the same offset and must share one
    // arm rather than duplicate it.
    assert_eq!(cases.len(), 2);
    assert_eq!(cases[0].keys, vec![0, 1]);
    assert_eq!(cases[0].body, Region::Block(BlockId::new(1)));
    assert_eq!(cases[1].keys, vec![5]);
    assert_eq!(cases[1].body, Region::Block(BlockId::new(2)));
    assert_eq!(
        default.as_deref(),
        Some(&Region::Block(BlockId::new(3))),
        "default arm holds its own code"
    );
    assert_eq!(children[1], Region::Block(BlockId::new(4)));
    Ok(())
}

#[test]
fn test_handler_overlay_wraps_protected_diamond() -> Result<()> {
    // try { if (v0 == 0) { v1 = 2 } else { v1 = 1 } } catch (any) { v1 = 0 }
    let body = MethodBody::builder("guarded")
        .regs(2)
        .insn(branch(CmpOp::Eq, 3, 0))
        .insn(load(1, 1))
        .insn(Instruction::new(InsnKind::Goto { target: 4 }))
        .insn(load(1, 2))
        .insn(ret(1))
        .insn(load(1, 0))
        .insn(ret(1))
        .catch(0, 4, 5, None)
        .build();
    let unit = structure(body)?;
    let region = unit.region.as_ref().expect("region tree");

    // The protected range covers the branch block and both arms but not
    // the merge, so the try wraps the whole If and nothing else.
    let Region::Sequence(children) = region else {
        panic!("expected a sequence at the root, got {region:?}");
    };
    let Region::TryCatch { body, handlers } = &children[0] else {
        panic!("expected a try/catch first, got {:?}", children[0]);
    };
    let Region::If { cond, then, otherwise, .. } = body.as_ref() else {
        panic!("expected the protected diamond, got {body:?}");
    };
    assert_eq!(*cond, BlockId::new(0));
    assert_eq!(**then, Region::Block(BlockId::new(2)));
    assert_eq!(otherwise.as_deref(), Some(&Region::Block(BlockId::new(1))));

    assert_eq!(handlers.len(), 1);
    assert_eq!(handlers[0].catch_type, None);
    assert_eq!(handlers[0].body, Region::Block(BlockId::new(4)));

    assert_eq!(children[1], Region::Block(BlockId::new(3)));
    Ok(())
}

#[test]
fn test_do_while_condition_stays_in_body() -> Result<()> {
    // v0 = 0; do { v0 = v0 + 1 } while (v0 < ...); return v0
    let body = MethodBody::builder("repeat")
        .regs(1)
        .insn(load(0, 0))
        .insn(
            Instruction::new(InsnKind::Arith {
                op: codelift::ir::ArithOp::Add,
                wide: false,
            })
            .with_result(RegisterArg::new(0))
            .with_reg(RegisterArg::new(0))
            .with_lit(1),
        )
        .insn(Instruction::new(InsnKind::Goto { target: 3 }))
        .insn(branch(CmpOp::Lt, 1, 0))
        .insn(ret(0))
        .build();
    let unit = structure(body)?;
    let region = unit.region.as_ref().expect("region tree");

    let Region::Sequence(children) = region else {
        panic!("expected a sequence at the root, got {region:?}");
    };
    let Region::Loop { kind, header, cond, .. } = &children[1] else {
        panic!("expected a loop after the init block, got {:?}", children[1]);
    };
    assert_eq!(*kind, LoopKind::Conditional { at_end: true });
    assert_eq!(*header, BlockId::new(1));
    // A trailing test names a body block; the Lt already reads as the
    // stay condition because the taken edge is the back edge.
    let Some((cond_block, op)) = cond else {
        panic!("trailing test lost");
    };
    assert_eq!(*op, CmpOp::Lt);
    assert_ne!(cond_block, header, "at-end condition must be body code");
    Ok(())
}

#[test]
fn test_break_and_continue_surface_as_edges() -> Result<()> {
    // A loop with a second exit besides the header test. The inner jump
    // out must surface as a break edge and the arm that re-enters the
    // header as a continue edge; neither may silently disappear.
    let body = MethodBody::builder("spin")
        .regs(2)
        .insn(load(0, 0))
        .insn(branch(CmpOp::Ge, 7, 0)) // header test
        .insn(branch(CmpOp::Eq, 5, 1)) // inner break test
        .insn(load(0, 1))
        .insn(Instruction::new(InsnKind::Goto { target: 1 }))
        .insn(load(0, 2)) // break arm, outside the natural loop
        .insn(Instruction::new(InsnKind::Goto { target: 7 }))
        .insn(ret(0))
        .build();
    let unit = structure(body)?;
    let region = unit.region.as_ref().expect("region tree");

    fn edges(region: &Region, out: &mut Vec<(BlockId, BlockId, EdgeKind)>) {
        match region {
            Region::Edge { from, to, kind } => out.push((*from, *to, *kind)),
            Region::Sequence(children) => {
                for child in children {
                    edges(child, out);
                }
            }
            Region::If { then, otherwise, .. } => {
                edges(then, out);
                if let Some(otherwise) = otherwise {
                    edges(otherwise, out);
                }
            }
            Region::Loop { body, .. } => edges(body, out),
            Region::Switch { cases, default, .. } => {
                for case in cases {
                    edges(&case.body, out);
                }
                if let Some(default) = default {
                    edges(default, out);
                }
            }
            Region::TryCatch { body, handlers } => {
                edges(body, out);
                for handler in handlers {
                    edges(&handler.body, out);
                }
            }
            Region::Block(_) => {}
        }
    }

    let mut found = Vec::new();
    edges(region, &mut found);
    // Block 5 holds the return, block 1 the loop header.
    assert!(
        found
            .iter()
            .any(|(_, to, kind)| *to == BlockId::new(5) && *kind == EdgeKind::Break),
        "break out of the loop not marked: {found:?}"
    );
    assert!(
        found
            .iter()
            .any(|(_, to, kind)| *to == BlockId::new(1) && *kind == EdgeKind::Continue),
        "jump back to the header not marked: {found:?}"
    );
    Ok(())
}
