//! Batch driver integration tests.
//!
//! These tests exercise `Decompiler` end to end:
//! 1. Submit method bodies, well formed and broken, as one batch
//! 2. Verify per-unit isolation: one bad unit degrades to fallback
//!    output with an error diagnostic while its siblings are untouched
//! 3. Verify the caching and ordering contracts of the driver

use std::sync::Arc;

use codelift::{
    diag::Severity,
    ir::{CmpOp, InsnKind, Instruction, MethodBody, RegisterArg},
    pipeline::{Decompiler, DecompilerOptions, UnitId},
    regions::Region,
    types::{ArgType, ClasspathIndex},
};

/// A well-formed diamond returning one of two constants.
fn good_body(name: &str) -> MethodBody {
    MethodBody::builder(name)
        .regs(2)
        .args(&[ArgType::INT])
        .ret(ArgType::INT)
        .insn(
            Instruction::new(InsnKind::If {
                op: CmpOp::Eq,
                target: 3,
            })
            .with_reg(RegisterArg::new(1)),
        )
        .insn(Instruction::new(InsnKind::Const { value: 1, wide: false }).with_result(RegisterArg::new(0)))
        .insn(Instruction::new(InsnKind::Goto { target: 4 }))
        .insn(Instruction::new(InsnKind::Const { value: 2, wide: false }).with_result(RegisterArg::new(0)))
        .insn(Instruction::new(InsnKind::Return).with_reg(RegisterArg::new(0)))
        .build()
}

/// A body whose exception table points its handler between instruction
/// boundaries.
fn misaligned_handler_body() -> MethodBody {
    MethodBody::builder("broken")
        .regs(1)
        .insn(Instruction::new(InsnKind::Const { value: 0, wide: false }).with_result(RegisterArg::new(0)).at(0))
        .insn(Instruction::new(InsnKind::Return).at(4))
        .insn(Instruction::new(InsnKind::Return).at(8))
        .catch(0, 4, 6, None)
        .build()
}

#[test]
fn test_bad_handler_degrades_only_its_own_unit() {
    let clsp = ClasspathIndex::empty();
    let driver = Decompiler::new(&clsp, DecompilerOptions::default());

    let outputs = driver.decompile_batch(vec![
        (UnitId::new(1), good_body("first")),
        (UnitId::new(2), misaligned_handler_body()),
        (UnitId::new(3), good_body("third")),
    ]);
    assert_eq!(outputs.len(), 3);

    let broken = &outputs[1].1;
    assert!(broken.fallback, "bad handler offset must force fallback");
    assert!(
        broken
            .diags
            .iter()
            .any(|diag| diag.severity == Severity::Error),
        "missing the error diagnostic: {:?}",
        broken.diags
    );
    // Fallback output still carries the instruction stream, not nothing.
    assert!(
        broken.regions.node_count() > 1,
        "fallback region is empty: {:?}",
        broken.regions
    );

    for index in [0, 2] {
        let healthy = &outputs[index].1;
        assert!(!healthy.fallback, "sibling unit degraded");
        assert!(
            healthy
                .diags
                .iter()
                .all(|diag| diag.severity != Severity::Error),
            "sibling unit picked up an error: {:?}",
            healthy.diags
        );
        // The diamond structures, so an If node must be present.
        let Region::Sequence(children) = &healthy.regions else {
            panic!("expected a sequence, got {:?}", healthy.regions);
        };
        assert!(matches!(children[0], Region::If { .. }));
    }
}

#[test]
fn test_driver_diagnostics_are_tagged_by_unit() {
    let clsp = ClasspathIndex::empty();
    let driver = Decompiler::new(&clsp, DecompilerOptions::default());

    driver.decompile(UnitId::new(7), good_body("fine"));
    driver.decompile(UnitId::new(8), misaligned_handler_body());

    let errors: Vec<UnitId> = driver
        .diagnostics()
        .filter(|(_, diag)| diag.severity == Severity::Error)
        .map(|(id, _)| id)
        .collect();
    assert_eq!(errors, vec![UnitId::new(8)]);
}

#[test]
fn test_repeated_units_reuse_the_first_result() {
    let clsp = ClasspathIndex::empty();
    let driver = Decompiler::new(&clsp, DecompilerOptions::default());

    let id = UnitId::new(42);
    let first = driver.decompile(id, good_body("same"));
    let second = driver.decompile(id, good_body("same"));
    assert!(
        Arc::ptr_eq(&first, &second),
        "second request ran the pipeline again"
    );
}

#[test]
fn test_batch_output_keeps_submission_order() {
    let clsp = ClasspathIndex::empty();
    let driver = Decompiler::new(&clsp, DecompilerOptions::default());

    let outputs = driver.decompile_batch(vec![
        (UnitId::new(3), good_body("c")),
        (UnitId::new(1), good_body("a")),
        (UnitId::new(2), good_body("b")),
    ]);
    let ids: Vec<u64> = outputs.iter().map(|(id, _)| id.raw()).collect();
    assert_eq!(ids, vec![3, 1, 2], "batch output reordered");

    // The result map, by contrast, iterates in id order.
    let ordered: Vec<u64> = driver.results().map(|(id, _)| id.raw()).collect();
    assert_eq!(ordered, vec![1, 2, 3]);
}

#[test]
fn test_sequential_batch_matches_parallel() {
    let clsp = ClasspathIndex::empty();
    let parallel = Decompiler::new(&clsp, DecompilerOptions::default());
    let serial = Decompiler::new(&clsp, DecompilerOptions::default().parallel(false));

    let batch = || {
        vec![
            (UnitId::new(1), good_body("one")),
            (UnitId::new(2), misaligned_handler_body()),
            (UnitId::new(3), good_body("two")),
        ]
    };
    let a = parallel.decompile_batch(batch());
    let b = serial.decompile_batch(batch());

    assert_eq!(a.len(), b.len());
    for ((id_a, out_a), (id_b, out_b)) in a.iter().zip(&b) {
        assert_eq!(id_a, id_b);
        assert_eq!(out_a.regions, out_b.regions);
        assert_eq!(out_a.fallback, out_b.fallback);
    }
}

#[test]
fn test_block_limit_forces_fallback_with_blocks_intact() {
    let clsp = ClasspathIndex::empty();
    // Two blocks are fewer than the diamond needs, so normalization
    // refuses the method and the driver degrades it.
    let driver = Decompiler::new(&clsp, DecompilerOptions::default().block_limit(2));

    let result = driver.decompile(UnitId::new(1), good_body("too_big"));
    assert!(result.fallback);
    assert!(
        result
            .diags
            .iter()
            .any(|diag| diag.severity == Severity::Error && diag.message.contains("normalize")),
        "limit failure not attributed to the normalize stage: {:?}",
        result.diags
    );
    // The graph was already built when the limit tripped; the flat
    // rendition walks those blocks rather than the raw stream.
    assert!(result.regions.block_ids().len() >= 4);
}

#[test]
fn test_named_variables_reach_the_result() {
    let clsp = ClasspathIndex::empty();
    let driver = Decompiler::new(&clsp, DecompilerOptions::default());

    let result = driver.decompile(UnitId::new(1), good_body("vars"));
    assert!(!result.vars.is_empty(), "no variables resolved");
    for var in &result.vars {
        assert!(!var.name.is_empty());
        assert_eq!(var.ty, ArgType::INT);
    }
    // Register 0 carries the merged constant, register 1 the argument.
    let regs: Vec<u16> = result.vars.iter().map(|var| var.reg).collect();
    assert!(regs.contains(&0) && regs.contains(&1), "registers lost: {regs:?}");
}
