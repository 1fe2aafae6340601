//! Benchmarks for the decompilation pipeline.
//!
//! Measures the analysis passes on synthetic method bodies:
//! - Block graph construction and normalization
//! - SSA transform on branch-heavy code
//! - Type inference fixed-point
//! - Region structuring on nested shapes
//! - The full driver, sequential and batched

extern crate codelift;

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use codelift::cfg;
use codelift::ir::{ArithOp, CmpOp, InsnKind, Instruction, MethodBody, MethodUnit, RegisterArg};
use codelift::pipeline::{Decompiler, DecompilerOptions, UnitId};
use codelift::types::{ArgType, ClasspathIndex};
use codelift::{regions, ssa, typeinf};

/// A chain of `count` diamonds feeding one accumulator register.
///
/// Every diamond adds a branch, two arm blocks and a merge, so the body
/// scales all passes linearly while staying realistic in shape.
fn diamond_chain(count: u32) -> MethodBody {
    let mut builder = MethodBody::builder("chain")
        .regs(3)
        .args(&[ArgType::INT])
        .ret(ArgType::INT)
        .insn(Instruction::new(InsnKind::Const { value: 0, wide: false }).with_result(RegisterArg::new(0)));
    let mut offset = 1;
    for _ in 0..count {
        builder = builder
            .insn(Instruction::new(InsnKind::If {
                op: CmpOp::Eq,
                target: offset + 3,
            })
            .with_reg(RegisterArg::new(2)))
            .insn(
                Instruction::new(InsnKind::Const { value: 1, wide: false })
                    .with_result(RegisterArg::new(1)),
            )
            .insn(Instruction::new(InsnKind::Goto { target: offset + 4 }))
            .insn(
                Instruction::new(InsnKind::Const { value: 2, wide: false })
                    .with_result(RegisterArg::new(1)),
            )
            .insn(
                Instruction::new(InsnKind::Arith {
                    op: ArithOp::Add,
                    wide: false,
                })
                .with_result(RegisterArg::new(0))
                .with_reg(RegisterArg::new(0))
                .with_reg(RegisterArg::new(1)),
            );
        offset += 5;
    }
    builder
        .insn(Instruction::new(InsnKind::Return).with_reg(RegisterArg::new(0)))
        .build()
}

/// A counting loop with a diamond in its body.
fn loop_body() -> MethodBody {
    MethodBody::builder("hot_loop")
        .regs(2)
        .args(&[ArgType::INT])
        .ret(ArgType::INT)
        .insn(Instruction::new(InsnKind::Const { value: 0, wide: false }).with_result(RegisterArg::new(0)))
        .insn(
            Instruction::new(InsnKind::If {
                op: CmpOp::Ge,
                target: 8,
            })
            .with_reg(RegisterArg::new(0)),
        )
        .insn(
            Instruction::new(InsnKind::If {
                op: CmpOp::Eq,
                target: 5,
            })
            .with_reg(RegisterArg::new(1)),
        )
        .insn(Instruction::new(InsnKind::Const { value: 1, wide: false }).with_result(RegisterArg::new(1)))
        .insn(Instruction::new(InsnKind::Goto { target: 6 }))
        .insn(Instruction::new(InsnKind::Const { value: 2, wide: false }).with_result(RegisterArg::new(1)))
        .insn(
            Instruction::new(InsnKind::Arith {
                op: ArithOp::Add,
                wide: false,
            })
            .with_result(RegisterArg::new(0))
            .with_reg(RegisterArg::new(0))
            .with_reg(RegisterArg::new(1)),
        )
        .insn(Instruction::new(InsnKind::Goto { target: 1 }))
        .insn(Instruction::new(InsnKind::Return).with_reg(RegisterArg::new(0)))
        .build()
}

/// Benchmark block graph construction and normalization alone.
fn bench_block_graph(c: &mut Criterion) {
    let body = diamond_chain(64);
    let options = DecompilerOptions::default();

    c.bench_function("cfg_build_64_diamonds", |b| {
        b.iter(|| {
            let mut unit = MethodUnit::new(black_box(body.clone()));
            cfg::build_blocks(&mut unit).unwrap();
            cfg::process_blocks(&mut unit, &options).unwrap();
            black_box(unit.blocks.len())
        });
    });
}

/// Benchmark the SSA transform over a normalized graph.
fn bench_ssa_transform(c: &mut Criterion) {
    let body = diamond_chain(64);
    let options = DecompilerOptions::default();

    c.bench_function("ssa_64_diamonds", |b| {
        b.iter(|| {
            let mut unit = MethodUnit::new(black_box(body.clone()));
            cfg::build_blocks(&mut unit).unwrap();
            cfg::process_blocks(&mut unit, &options).unwrap();
            ssa::transform(&mut unit).unwrap();
            black_box(unit.arena.ssa_count())
        });
    });
}

/// Benchmark the inference fixed-point on phi-heavy input.
fn bench_type_inference(c: &mut Criterion) {
    let body = diamond_chain(64);
    let options = DecompilerOptions::default();
    let clsp = ClasspathIndex::empty();

    c.bench_function("typeinf_64_diamonds", |b| {
        b.iter(|| {
            let mut unit = MethodUnit::new(black_box(body.clone()));
            cfg::build_blocks(&mut unit).unwrap();
            cfg::process_blocks(&mut unit, &options).unwrap();
            ssa::transform(&mut unit).unwrap();
            typeinf::infer_types(&mut unit, &clsp);
            black_box(unit.arena.ssa_count())
        });
    });
}

/// Benchmark region structuring on a loop with inner branches.
fn bench_region_structuring(c: &mut Criterion) {
    let body = loop_body();
    let options = DecompilerOptions::default();

    c.bench_function("regions_loop_with_diamond", |b| {
        b.iter(|| {
            let mut unit = MethodUnit::new(black_box(body.clone()));
            cfg::build_blocks(&mut unit).unwrap();
            cfg::process_blocks(&mut unit, &options).unwrap();
            regions::make_regions(&mut unit, &options).unwrap();
            black_box(unit.region.take())
        });
    });
}

/// Benchmark one unit through the whole driver.
fn bench_driver_single(c: &mut Criterion) {
    let clsp = ClasspathIndex::empty();
    let body = loop_body();

    c.bench_function("driver_single_unit", |b| {
        let driver = Decompiler::new(&clsp, DecompilerOptions::default());
        let mut next = 0u64;
        b.iter(|| {
            // A fresh id each round, or the cache would absorb the work.
            next += 1;
            black_box(driver.decompile(UnitId::new(next), black_box(body.clone())))
        });
    });
}

/// Benchmark a parallel batch of mixed units.
fn bench_driver_batch(c: &mut Criterion) {
    let clsp = ClasspathIndex::empty();

    c.bench_function("driver_batch_32", |b| {
        b.iter(|| {
            let driver = Decompiler::new(&clsp, DecompilerOptions::default());
            let batch: Vec<_> = (0..32)
                .map(|index| {
                    let body = if index % 2 == 0 {
                        diamond_chain(8)
                    } else {
                        loop_body()
                    };
                    (UnitId::new(index), body)
                })
                .collect();
            black_box(driver.decompile_batch(batch))
        });
    });
}

criterion_group!(
    benches,
    bench_block_graph,
    bench_ssa_transform,
    bench_type_inference,
    bench_region_structuring,
    bench_driver_single,
    bench_driver_batch,
);
criterion_main!(benches);
