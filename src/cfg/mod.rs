//! Control-flow graph construction and structural analysis.
//!
//! This module turns a method's flat instruction stream into the block
//! graph every later pass works on, then derives the structural facts that
//! SSA construction and region structuring consume: dominators, dominance
//! frontiers, post-dominators and natural loops.
//!
//! # Architecture
//!
//! Processing is two passes over one [`crate::ir::MethodUnit`]:
//!
//! - [`build_blocks`] splits the stream at leader offsets, wires normal
//!   edges from the branch shapes and exceptional edges from the
//!   exception table, and guarantees a predecessor-free entry block.
//! - [`process_blocks`] normalizes the graph (unreachable removal, exit
//!   deduplication, handler splitters), computes [`DominatorInfo`] and
//!   marks natural loops on the blocks they involve.
//!
//! Input validation is strict and front-loaded: a branch or handler
//! offset that is not an instruction boundary rejects the whole method
//! before any block exists. The pipeline driver turns that rejection into
//! a per-method diagnostic with fallback output, leaving other methods in
//! the batch untouched.
//!
//! # Key Components
//!
//! - [`build_blocks`] - Stream splitting and edge wiring
//! - [`process_blocks`] - Normalization, dominators and loop marking
//! - [`DominatorInfo`] - Dominance, frontier and post-dominance queries
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use codelift::cfg;
//! use codelift::ir::MethodUnit;
//! use codelift::pipeline::DecompilerOptions;
//!
//! let mut unit = MethodUnit::new(body);
//! cfg::build_blocks(&mut unit)?;
//! cfg::process_blocks(&mut unit, &DecompilerOptions::default())?;
//! println!("{} blocks, {} loops", unit.blocks.len(), unit.loops.len());
//! # Ok::<(), codelift::Error>(())
//! ```

mod builder;
mod dominators;
mod processor;

pub use builder::build_blocks;
pub use dominators::DominatorInfo;
pub use processor::process_blocks;
