//! Pipeline orchestration.
//!
//! Everything above the individual analyses lives here: the tuning knobs,
//! the [`Stage`] abstraction the driver iterates, and the [`Decompiler`]
//! batch driver with its concurrent result caches.
//!
//! # Architecture
//!
//! A [`Decompiler`] is built once per batch from a
//! [`TypeHierarchy`](crate::types::TypeHierarchy) and
//! [`DecompilerOptions`], then shared by reference. Units are submitted as
//! [`MethodBody`](crate::ir::MethodBody) values under caller-chosen
//! [`UnitId`]s; each runs the fixed stage list once, no matter how many
//! times or from how many threads it is requested. Failures stay local: a
//! unit that cannot be structured yields fallback output and an error
//! diagnostic while the rest of the batch proceeds.
//!
//! # Key Components
//!
//! - [`Decompiler`] - Batch driver and result cache
//! - [`Stage`] / [`PipelineCtx`] - The pass abstraction
//! - [`DecompilerOptions`] - Tuning knobs
//! - [`UnitResult`] - Per-unit output: regions, variables, diagnostics
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use codelift::pipeline::{Decompiler, DecompilerOptions, UnitId};
//! use codelift::types::ClasspathBuilder;
//!
//! let classpath = ClasspathBuilder::new().build();
//! let driver = Decompiler::new(&classpath, DecompilerOptions::default());
//! let result = driver.decompile(UnitId::new(0), body);
//! println!("{} vars, fallback: {}", result.vars.len(), result.fallback);
//! ```

mod driver;
mod options;
mod stage;

pub use driver::{Decompiler, ResolvedVar, ResultMap, UnitId, UnitResult};
pub use options::DecompilerOptions;
pub use stage::{PipelineCtx, Stage, STAGES};
