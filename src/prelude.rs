//! # codelift Prelude
//!
//! This module provides a convenient prelude for the most commonly used
//! types and traits from the codelift library. Import this module to get
//! quick access to the essential types for lifting bytecode into
//! structured code.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all codelift operations
pub use crate::Error;

/// The result type used throughout codelift
pub use crate::Result;

/// Per-unit problem reports
pub use crate::diag::{Diagnostic, Severity};

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Batch driver, its options and per-unit results
pub use crate::pipeline::{Decompiler, DecompilerOptions, ResolvedVar, UnitId, UnitResult};

/// The pass abstraction the driver iterates
pub use crate::pipeline::{PipelineCtx, Stage};

// ================================================================================================
// Method Input and Intermediate Representation
// ================================================================================================

/// Decoded method input
pub use crate::ir::{DebugInfo, ExceptionEntry, MethodBody, MethodBodyBuilder};

/// Instructions and their shapes
pub use crate::ir::{ArithOp, CmpOp, InsnKind, Instruction, InvokeKind, RegisterArg};

/// Blocks and the per-method unit
pub use crate::ir::{BasicBlock, BlockFlags, BlockId, MethodUnit};

/// Loop and handler metadata
pub use crate::ir::{ExcHandlerInfo, HandlerId, LoopId, LoopInfo};

// ================================================================================================
// Type System
// ================================================================================================

/// Argument types and the primitive kind lattice
pub use crate::types::{ArgType, Kind, KindSet};

/// Classpath hierarchy for inference queries
pub use crate::types::{ClasspathBuilder, ClasspathIndex, TypeHierarchy};

// ================================================================================================
// Analysis Results
// ================================================================================================

/// Dominance and post-dominance queries
pub use crate::cfg::DominatorInfo;

/// SSA variables and the per-method arena
pub use crate::ssa::{CodeVar, CodeVarId, SsaVar, SsaVarId, VarArena};

/// The structured control-flow tree
pub use crate::regions::{EdgeKind, HandlerRegion, LoopKind, Region, SwitchCase};
