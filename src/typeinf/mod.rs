//! Type inference over the ambiguous primitive/object lattice.
//!
//! Registers in the input carry no types: a slot holding `0` might be an
//! `int`, a `boolean`, a `float` or a null reference, and only the way
//! the surrounding instructions produce and consume it decides. This
//! module resolves every SSA variable to a concrete [`crate::types::ArgType`]
//! by folding instruction-derived bounds to a fixed point.
//!
//! # Architecture
//!
//! Two internal steps behind one entry point:
//!
//! - Bound seeding walks the instructions once, recording definition
//!   bounds (what a producer guarantees), use bounds (what a consumer
//!   requires) and identity edges through moves and phis.
//! - [`infer_types`] runs the worklist: fold a variable's bounds and its
//!   neighbors' current types via [`crate::types::ArgType::merge`],
//!   requeue neighbors on change, until nothing moves.
//!
//! Merge rejections never abort the method: the variable keeps its last
//! valid bound and a warning lands in the unit's diagnostics. Whatever
//! is still ambiguous after the fixed point collapses to its canonical
//! pick so later passes always see a concrete type.
//!
//! # Key Components
//!
//! - [`infer_types`] - Seeding, propagation and final resolution
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use codelift::typeinf;
//! use codelift::types::ClasspathIndex;
//!
//! let clsp = ClasspathIndex::empty();
//! typeinf::infer_types(&mut unit, &clsp);
//! for var in unit.arena.ssa_vars() {
//!     assert!(var.ty.is_resolved());
//! }
//! ```

mod bounds;
mod engine;

pub use engine::infer_types;
