//! Static single assignment form and variable bookkeeping.
//!
//! After this module runs, every register argument in the block graph is
//! bound to exactly one version with a single definition, merges carry
//! explicit phi pseudo-instructions, and versions that denote the same
//! source-level variable are grouped for display.
//!
//! # Architecture
//!
//! [`transform`] drives four steps over one [`crate::ir::MethodUnit`]:
//!
//! - Liveness ([`LivenessInfo`]): backward bitset dataflow; a phi is only
//!   worth placing where its register is live on entry.
//! - Phi placement: iterated dominance frontiers of each register's
//!   defining blocks, one phi argument per predecessor in combined
//!   normal-then-exceptional order.
//! - Renaming: dominator-tree walk with per-register version stacks.
//!   Version 0 is reserved for method arguments and registers read
//!   before any definition; instruction definitions count from 1.
//! - Cleanup and grouping: dead and trivial phis are removed, definition
//!   and use sites rebuilt, and phi-connected versions united into
//!   [`CodeVar`]s inside the [`VarArena`].
//!
//! Naming ([`assign_names`]) runs later, once type inference has
//! resolved each variable, so type-derived stems see final types.
//!
//! # Key Components
//!
//! - [`transform`] - The SSA conversion pass
//! - [`VarArena`] - Owns every [`SsaVar`] and [`CodeVar`] of a method
//! - [`LivenessInfo`] - Per-block live-in/live-out register sets
//! - [`assign_names`] - Debug-info and type-stem display names
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use codelift::ssa;
//!
//! ssa::transform(&mut unit)?;
//! for var in unit.arena.ssa_vars() {
//!     println!("v{}_{} defined at {:?}", var.reg, var.version, var.def);
//! }
//! # Ok::<(), codelift::Error>(())
//! ```

mod builder;
mod liveness;
mod naming;
mod vars;

pub use builder::transform;
pub use liveness::LivenessInfo;
pub use naming::{assign_names, is_valid_identifier};
pub use vars::{CodeVar, CodeVarId, DefSite, InsnSite, SsaVar, SsaVarId, VarArena};
