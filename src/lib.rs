// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]

//! # codelift
//!
//! [![Crates.io](https://img.shields.io/crates/v/codelift.svg)](https://crates.io/crates/codelift)
//! [![Documentation](https://docs.rs/codelift/badge.svg)](https://docs.rs/codelift)
//! [![License](https://img.shields.io/badge/license-Apache--2.0-blue.svg)](LICENSE-APACHE)
//!
//! A decompilation core for register-based bytecode. Built in pure Rust, `codelift`
//! lifts flat instruction streams into structured, renderable code: basic blocks and
//! dominance, SSA form with recovered variables, type inference over partially typed
//! registers, and a region tree of `if`/`loop`/`switch`/`try` shapes.
//!
//! ## Features
//!
//! - **🧱 Block graph construction** - Leader splitting, edge wiring and exception
//!   overlay with strict offset validation
//! - **🌳 Structured output** - Region trees a renderer can print without ever
//!   consulting an edge
//! - **🔁 SSA conversion** - Pruned phi placement on dominance frontiers with
//!   debug-name recovery
//! - **🔍 Type inference** - Fixpoint propagation over an ambiguous
//!   primitive/reference lattice
//! - **⚡ Batch processing** - Parallel driver with per-unit result caching and
//!   deterministic iteration order
//! - **🛡️ Failure isolation** - A malformed method degrades to fallback output;
//!   the rest of the batch is untouched
//!
//! ## Quick Start
//!
//! Add `codelift` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! codelift = "0.2"
//! ```
//!
//! ### Using the Prelude
//!
//! For convenient access to the most commonly used types, import the prelude:
//!
//! ```rust,no_run
//! use codelift::prelude::*;
//!
//! # fn body() -> MethodBody { MethodBody::builder("m").build() }
//! let classpath = ClasspathBuilder::new().build();
//! let driver = Decompiler::new(&classpath, DecompilerOptions::default());
//! let result = driver.decompile(UnitId::new(0), body());
//! println!("{} variables recovered", result.vars.len());
//! ```
//!
//! ### Basic Usage
//!
//! ```rust,no_run
//! use codelift::ir::{Instruction, InsnKind, MethodBody, RegisterArg};
//! use codelift::pipeline::{Decompiler, DecompilerOptions, UnitId};
//! use codelift::types::ClasspathBuilder;
//!
//! // Describe a decoded method body: instructions with offsets, register
//! // count, and (optionally) an exception table and debug names.
//! let body = MethodBody::builder("answer")
//!     .regs(1)
//!     .insn(Instruction::new(InsnKind::Const { value: 42, wide: false })
//!         .with_result(RegisterArg::new(0)))
//!     .insn(Instruction::new(InsnKind::Return).with_reg(RegisterArg::new(0)))
//!     .build();
//!
//! // Run the pipeline.
//! let classpath = ClasspathBuilder::new().build();
//! let driver = Decompiler::new(&classpath, DecompilerOptions::default());
//! let result = driver.decompile(UnitId::new(0), body);
//!
//! println!("fallback: {}", result.fallback);
//! println!("{} diagnostics", result.diags.len());
//! ```
//!
//! ## Architecture
//!
//! `codelift` is organized as a fixed pipeline over one mutable
//! [`ir::MethodUnit`] per method:
//!
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`ir`] - Instructions, blocks and the per-method unit every pass mutates
//! - [`cfg`] - Block graph construction, dominators and natural loops
//! - [`ssa`] - SSA conversion, variable recovery and naming
//! - [`typeinf`] - Type inference over the kind lattice
//! - [`regions`] - Control-flow structuring into a region tree
//! - [`pipeline`] - Stage list, options and the batch driver
//! - [`types`] - Argument types and the classpath hierarchy index
//! - [`diag`] - Per-unit diagnostics
//! - [`Error`] and [`Result`] - Comprehensive error handling
//!
//! ### Pipeline
//!
//! The [`pipeline::Decompiler`] driver runs six stages in a fixed order:
//! block splitting, graph normalization, SSA conversion, type inference,
//! name assignment and region structuring. Stages communicate only through
//! the unit, so a failing stage leaves enough state behind for the driver
//! to emit degraded-but-renderable fallback output.
//!
//! ### Concurrency
//!
//! One [`pipeline::Decompiler`] is shared by reference across threads. Each
//! unit id is processed at most once: concurrent requests for the same id
//! block on the winner and share its result. Batch submission distributes
//! over a thread pool and still returns results in input order.
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, Error>`](Result). Within the
//! driver, errors never cross unit boundaries:
//!
//! ```rust,no_run
//! use codelift::{cfg, Error};
//! use codelift::ir::{MethodBody, MethodUnit};
//!
//! let mut unit = MethodUnit::new(MethodBody::builder("m").build());
//! match cfg::build_blocks(&mut unit) {
//!     Ok(()) => println!("{} blocks", unit.blocks.len()),
//!     Err(Error::InvalidOffset(offset)) => println!("bad branch target {offset:#x}"),
//!     Err(Error::Malformed { message, .. }) => println!("malformed: {message}"),
//!     Err(e) => println!("error: {e}"),
//! }
//! ```
//!
//! ## Testing
//!
//! The test suite builds method bodies by hand and checks structural
//! invariants end to end:
//!
//! ```bash
//! cargo test
//! cargo bench  # pipeline benchmarks
//! ```

#[macro_use]
pub(crate) mod error;

/// Small shared utilities.
///
/// [`utils::BitSet`] is the dense block-index set used throughout graph
/// analysis: dominance frontiers, liveness, loop bodies and protected
/// ranges.
pub mod utils;

/// Convenient re-exports of the most commonly used types and traits.
///
/// This module provides a curated selection of the most frequently used
/// types from across the library, allowing for convenient glob imports.
///
/// # Example
///
/// ```rust,no_run
/// use codelift::prelude::*;
///
/// # fn body() -> MethodBody { MethodBody::builder("m").build() }
/// let classpath = ClasspathBuilder::new().build();
/// let driver = Decompiler::new(&classpath, DecompilerOptions::default());
/// let result = driver.decompile(UnitId::new(0), body());
/// # let _ = result;
/// ```
pub mod prelude;

/// Per-unit diagnostics.
///
/// Analyses report problems instead of failing wherever output can still be
/// produced: [`diag::Diagnostic`] carries a severity and message, collected
/// on the unit and aggregated per batch by the driver.
pub mod diag;

/// Instructions, blocks and the per-method unit.
///
/// The [`ir::MethodUnit`] is the single mutable value every pipeline stage
/// works on. It starts as a flat instruction stream
/// ([`ir::MethodBody`]) and accumulates blocks, edges, loops, handler
/// metadata, SSA variables and finally the region tree.
///
/// # Key Types
///
/// - [`ir::MethodUnit`] - Mutable per-method state
/// - [`ir::MethodBody`] / [`ir::MethodBodyBuilder`] - Decoded input
/// - [`ir::Instruction`] / [`ir::InsnKind`] - One operation and its shape
/// - [`ir::BasicBlock`] / [`ir::BlockId`] - Graph nodes
pub mod ir;

/// Argument types and the classpath hierarchy.
///
/// [`types::ArgType`] models the inference lattice: concrete primitives and
/// objects plus the ambiguous unknowns type inference narrows.
/// [`types::ClasspathIndex`] answers subtype and common-ancestor queries;
/// build one with [`types::ClasspathBuilder`], then share it by reference.
pub mod types;

/// Control-flow graph construction and structural analysis.
///
/// [`cfg::build_blocks`] splits the instruction stream into basic blocks
/// and wires normal plus exceptional edges; [`cfg::process_blocks`]
/// normalizes the graph, computes [`cfg::DominatorInfo`] and marks natural
/// loops.
///
/// # Examples
///
/// ```rust,no_run
/// use codelift::cfg;
/// use codelift::ir::{MethodBody, MethodUnit};
/// use codelift::pipeline::DecompilerOptions;
///
/// let mut unit = MethodUnit::new(MethodBody::builder("m").build());
/// cfg::build_blocks(&mut unit)?;
/// cfg::process_blocks(&mut unit, &DecompilerOptions::default())?;
/// println!("{} blocks, {} loops", unit.blocks.len(), unit.loops.len());
/// # Ok::<(), codelift::Error>(())
/// ```
pub mod cfg;

/// SSA conversion, variable recovery and naming.
///
/// [`ssa::transform`] renames registers into versioned variables with
/// pruned phi placement, groups phi-connected versions into source-level
/// variables, and [`ssa::assign_names`] picks their names once types are
/// known.
pub mod ssa;

/// Type inference over the kind lattice.
///
/// [`typeinf::infer_types`] runs fixpoint propagation from instruction
/// bounds across `move`/`phi` edges, narrowing each variable's
/// [`types::ArgType`] monotonically, then resolves the per-variable types.
pub mod typeinf;

/// Control-flow structuring.
///
/// [`regions::make_regions`] turns the processed graph into a
/// [`regions::Region`] tree of sequences, conditionals, loops, switches
/// and try/catch spans; [`regions::fallback_region`] produces the linear
/// degraded form used when structuring fails.
pub mod regions;

/// Pipeline orchestration.
///
/// The [`pipeline::Decompiler`] batch driver runs the fixed
/// [`pipeline::STAGES`] list over method units, in parallel when
/// configured, caching one [`pipeline::UnitResult`] per unit id.
///
/// # Examples
///
/// ```rust,no_run
/// use codelift::pipeline::{Decompiler, DecompilerOptions, UnitId};
/// use codelift::types::ClasspathBuilder;
///
/// # fn bodies() -> Vec<(UnitId, codelift::ir::MethodBody)> { Vec::new() }
/// let classpath = ClasspathBuilder::new().build();
/// let driver = Decompiler::new(&classpath, DecompilerOptions::default());
/// for (id, result) in driver.decompile_batch(bodies()) {
///     println!("{id}: fallback {}", result.fallback);
/// }
/// ```
pub mod pipeline;

/// `codelift` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type
/// is always [`Error`]. This is used consistently throughout the crate for
/// all fallible operations.
///
/// # Examples
///
/// ```rust,no_run
/// use codelift::ir::MethodUnit;
/// use codelift::Result;
///
/// fn build(unit: &mut MethodUnit) -> Result<()> {
///     codelift::cfg::build_blocks(unit)
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `codelift` Error type
///
/// The main error type for all operations in this crate. Provides detailed
/// error information for input validation, graph analysis and structuring
/// limits.
///
/// # Examples
///
/// ```rust,no_run
/// use codelift::{cfg, Error};
/// use codelift::ir::{MethodBody, MethodUnit};
///
/// let mut unit = MethodUnit::new(MethodBody::builder("m").build());
/// match cfg::build_blocks(&mut unit) {
///     Ok(()) => println!("ok"),
///     Err(Error::Empty) => println!("no instructions"),
///     Err(e) => println!("error: {e}"),
/// }
/// ```
pub use error::Error;

/// Batch driver and per-unit results.
///
/// See [`pipeline::Decompiler`] for the entry point most callers want.
///
/// # Example
///
/// ```rust,no_run
/// use codelift::{Decompiler, DecompilerOptions, UnitId};
/// use codelift::types::ClasspathBuilder;
///
/// # fn body() -> codelift::ir::MethodBody { codelift::ir::MethodBody::builder("m").build() }
/// let classpath = ClasspathBuilder::new().build();
/// let driver = Decompiler::new(&classpath, DecompilerOptions::default());
/// let result = driver.decompile(UnitId::new(7), body());
/// println!("{}", result.regions.node_count());
/// ```
pub use pipeline::{Decompiler, DecompilerOptions, UnitId, UnitResult};
