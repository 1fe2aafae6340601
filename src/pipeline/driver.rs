//! Batch decompilation driver.
//!
//! [`Decompiler`] owns everything shared across method units: the classpath,
//! the options, and the concurrent result caches. Each unit runs the fixed
//! [`STAGES`] list exactly once behind a per-unit lock; a second request
//! for the same unit blocks until the first finishes, then returns the same
//! [`UnitResult`]. A failing or panicking stage degrades only its own unit
//! to fallback output with an error diagnostic.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use rayon::prelude::*;

use crate::diag::Diagnostic;
use crate::ir::{MethodBody, MethodUnit};
use crate::pipeline::stage::{PipelineCtx, STAGES};
use crate::pipeline::DecompilerOptions;
use crate::regions::{fallback_region, Region};
use crate::types::{ArgType, TypeHierarchy};

/// Identifies one method unit within a batch. Assigned by the caller;
/// results iterate in its order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(u64);

impl UnitId {
    /// Wraps a caller-chosen unit number.
    #[must_use]
    pub fn new(raw: u64) -> Self {
        UnitId(raw)
    }

    /// The wrapped number.
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unit{}", self.0)
    }
}

/// One source-level variable in the finished output.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVar {
    /// Assigned name, unique within the method.
    pub name: String,
    /// Inferred type.
    pub ty: ArgType,
    /// Register the variable originated from.
    pub reg: u16,
}

/// Finished output for one method unit.
#[derive(Debug, Clone)]
pub struct UnitResult {
    /// Structured control flow.
    pub regions: Region,
    /// Named variables, in allocation order.
    pub vars: Vec<ResolvedVar>,
    /// Everything reported while processing this unit.
    pub diags: Vec<Diagnostic>,
    /// `true` when structuring degraded to linear output.
    pub fallback: bool,
}

/// Ordered map of finished results.
pub type ResultMap = SkipMap<UnitId, Arc<UnitResult>>;

/// Shared driver for a batch of method units.
pub struct Decompiler<'a> {
    classpath: &'a dyn TypeHierarchy,
    options: DecompilerOptions,
    slots: DashMap<UnitId, Arc<OnceLock<Arc<UnitResult>>>>,
    results: ResultMap,
    diagnostics: boxcar::Vec<(UnitId, Diagnostic)>,
}

impl<'a> Decompiler<'a> {
    /// A driver over the given classpath and options.
    #[must_use]
    pub fn new(classpath: &'a dyn TypeHierarchy, options: DecompilerOptions) -> Self {
        Decompiler {
            classpath,
            options,
            slots: DashMap::new(),
            results: SkipMap::new(),
            diagnostics: boxcar::Vec::new(),
        }
    }

    /// Decompiles one unit, or returns the cached result.
    ///
    /// Concurrent calls with the same id run the pipeline once; the losers
    /// block until the winner finishes.
    pub fn decompile(&self, id: UnitId, body: MethodBody) -> Arc<UnitResult> {
        let slot = self
            .slots
            .entry(id)
            .or_insert_with(|| Arc::new(OnceLock::new()))
            .clone();
        let result = slot
            .get_or_init(|| Arc::new(self.run_unit(id, body)))
            .clone();
        self.results.insert(id, result.clone());
        result
    }

    /// Decompiles a batch, in parallel when
    /// [`DecompilerOptions::parallel`] is set.
    ///
    /// Output order matches input order regardless of scheduling.
    pub fn decompile_batch(
        &self,
        batch: Vec<(UnitId, MethodBody)>,
    ) -> Vec<(UnitId, Arc<UnitResult>)> {
        if self.options.parallel {
            batch
                .into_par_iter()
                .map(|(id, body)| (id, self.decompile(id, body)))
                .collect()
        } else {
            batch
                .into_iter()
                .map(|(id, body)| (id, self.decompile(id, body)))
                .collect()
        }
    }

    /// Finished results, ordered by unit id.
    pub fn results(&self) -> impl Iterator<Item = (UnitId, Arc<UnitResult>)> + '_ {
        self.results
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
    }

    /// Every diagnostic reported so far, tagged with its unit.
    pub fn diagnostics(&self) -> impl Iterator<Item = (UnitId, Diagnostic)> + '_ {
        self.diagnostics
            .iter()
            .map(|(_, (id, diag))| (*id, diag.clone()))
    }

    /// Runs the stage list over one unit. Never propagates failure: a
    /// stage error or panic leaves an error diagnostic and fallback output.
    fn run_unit(&self, id: UnitId, body: MethodBody) -> UnitResult {
        let mut unit = MethodUnit::new(body);
        let ctx = PipelineCtx {
            classpath: self.classpath,
            options: &self.options,
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            for stage in STAGES {
                if let Err(err) = stage.process(&mut unit, &ctx) {
                    return Some((stage.name(), err));
                }
            }
            None
        }));
        match outcome {
            Ok(None) => {}
            Ok(Some((stage, err))) => {
                unit.error(format!("`{}`: {stage} stage failed: {err}", unit.name));
                let region = fallback_region(&mut unit);
                unit.region = Some(region);
            }
            Err(_) => {
                unit.error(format!("`{}`: stage panicked, output degraded", unit.name));
                let region = fallback_region(&mut unit);
                unit.region = Some(region);
            }
        }

        let regions = match unit.region.take() {
            Some(region) => region,
            None => fallback_region(&mut unit),
        };
        let vars = resolved_vars(&unit);
        for diag in &unit.diagnostics {
            self.diagnostics.push((id, diag.clone()));
        }
        UnitResult {
            regions,
            vars,
            diags: unit.diagnostics,
            fallback: unit.fallback,
        }
    }
}

/// Named variables of a finished unit, in allocation order.
fn resolved_vars(unit: &MethodUnit) -> Vec<ResolvedVar> {
    unit.arena
        .code_vars()
        .filter_map(|code_var| {
            let name = code_var.name.clone()?;
            let reg = code_var
                .ssa_vars
                .first()
                .map(|id| unit.arena.var(*id).reg)
                .unwrap_or(0);
            Some(ResolvedVar {
                name,
                ty: code_var.ty.clone(),
                reg,
            })
        })
        .collect()
}
