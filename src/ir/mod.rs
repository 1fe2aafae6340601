//! Intermediate representation shared by every pipeline stage.
//!
//! The IR models a register machine: instructions read and write numbered
//! register slots, and basic blocks chain instructions between branches.
//! A method is a flat block list with explicit normal and exceptional
//! edges.
//! Front-ends produce a [`MethodBody`] through [`MethodBodyBuilder`]; the
//! pipeline wraps it in a [`MethodUnit`] and attaches everything analysis
//! derives: the block graph, dominators, loops, handlers, SSA variables
//! and diagnostics.
//!
//! # Examples
//!
//! ```rust,ignore
//! use codelift::ir::{Instruction, InsnKind, MethodBody, RegisterArg};
//!
//! let body = MethodBody::builder("answer")
//!     .regs(1)
//!     .insn(
//!         Instruction::new(InsnKind::Const { value: 42, wide: false })
//!             .with_result(RegisterArg::new(0)),
//!     )
//!     .insn(Instruction::new(InsnKind::Return).with_reg(RegisterArg::new(0)))
//!     .build();
//! assert_eq!(body.insns.len(), 2);
//! ```

mod attrs;
mod block;
mod insn;
mod method;

pub use attrs::{BlockAttr, HandlerId, LoopId};
pub use block::{BasicBlock, BlockFlags, BlockId};
pub use insn::{
    ArithOp, CmpOp, FieldRef, InsnArg, InsnKind, Instruction, InvokeKind, MethodRef, RegisterArg,
    SYNTHETIC_OFFSET,
};
pub use method::{
    DebugInfo, ExcHandlerInfo, ExceptionEntry, LocalVarInfo, LoopInfo, MethodBody,
    MethodBodyBuilder, MethodUnit,
};
