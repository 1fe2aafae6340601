//! Pipeline stages.
//!
//! Each analysis pass sits behind the [`Stage`] trait so the driver can run
//! them uniformly and report failures by stage name. The list in [`STAGES`]
//! is fixed and ordered; every stage requires the state its predecessors
//! left on the [`MethodUnit`].

use crate::ir::MethodUnit;
use crate::pipeline::DecompilerOptions;
use crate::types::TypeHierarchy;
use crate::Result;

/// Shared, read-only context for one pipeline run.
pub struct PipelineCtx<'a> {
    /// Type hierarchy for inference queries.
    pub classpath: &'a dyn TypeHierarchy,
    /// Tuning knobs.
    pub options: &'a DecompilerOptions,
}

/// One pass over a method unit.
pub trait Stage: Sync {
    /// Short stage name, used in diagnostics.
    fn name(&self) -> &'static str;

    /// Runs the pass, mutating the unit in place.
    ///
    /// # Errors
    ///
    /// A stage error fails the whole unit; the driver converts it into an
    /// error diagnostic plus fallback output.
    fn process(&self, unit: &mut MethodUnit, ctx: &PipelineCtx<'_>) -> Result<()>;
}

/// Splits the instruction stream into basic blocks.
struct BlockSplit;

impl Stage for BlockSplit {
    fn name(&self) -> &'static str {
        "blocks"
    }

    fn process(&self, unit: &mut MethodUnit, _ctx: &PipelineCtx<'_>) -> Result<()> {
        crate::cfg::build_blocks(unit)
    }
}

/// Normalizes the graph and computes dominators and loops.
struct BlockProcess;

impl Stage for BlockProcess {
    fn name(&self) -> &'static str {
        "normalize"
    }

    fn process(&self, unit: &mut MethodUnit, ctx: &PipelineCtx<'_>) -> Result<()> {
        crate::cfg::process_blocks(unit, ctx.options)
    }
}

/// Converts registers to SSA form.
struct SsaTransform;

impl Stage for SsaTransform {
    fn name(&self) -> &'static str {
        "ssa"
    }

    fn process(&self, unit: &mut MethodUnit, _ctx: &PipelineCtx<'_>) -> Result<()> {
        crate::ssa::transform(unit)
    }
}

/// Infers variable types over the kind lattice.
struct TypeInference;

impl Stage for TypeInference {
    fn name(&self) -> &'static str {
        "types"
    }

    fn process(&self, unit: &mut MethodUnit, ctx: &PipelineCtx<'_>) -> Result<()> {
        crate::typeinf::infer_types(unit, ctx.classpath);
        Ok(())
    }
}

/// Picks source-level names, debug info first.
struct NameAssign;

impl Stage for NameAssign {
    fn name(&self) -> &'static str {
        "names"
    }

    fn process(&self, unit: &mut MethodUnit, ctx: &PipelineCtx<'_>) -> Result<()> {
        crate::ssa::assign_names(unit, ctx.options.use_debug_names);
        Ok(())
    }
}

/// Structures the graph into the region tree.
struct RegionMake;

impl Stage for RegionMake {
    fn name(&self) -> &'static str {
        "regions"
    }

    fn process(&self, unit: &mut MethodUnit, ctx: &PipelineCtx<'_>) -> Result<()> {
        crate::regions::make_regions(unit, ctx.options)
    }
}

/// The pipeline, in execution order.
pub const STAGES: &[&dyn Stage] = &[
    &BlockSplit,
    &BlockProcess,
    &SsaTransform,
    &TypeInference,
    &NameAssign,
    &RegionMake,
];
