//! Control-flow structuring.
//!
//! This module rebuilds source-level shape from the block graph: the flat
//! set of blocks and edges becomes a [`Region`] tree of sequences,
//! conditionals, loops, switches and try/catch spans that a renderer can
//! print without ever consulting an edge again.
//!
//! # Architecture
//!
//! Structuring is a single traversal from the entry block in control-flow
//! order, claiming each block for exactly one tree leaf:
//!
//! - A compare terminator opens an [`Region::If`]; its merge point is the
//!   immediate post-dominator, and each arm is structured up to it.
//! - A block marked as a loop header opens a [`Region::Loop`] around the
//!   loop body, with the exit test normalized so the compare holding means
//!   another iteration.
//! - A switch terminator opens a [`Region::Switch`] with one arm per
//!   distinct target block, case values grouped in table order.
//! - Everything else joins the current [`Region::Sequence`].
//!
//! Jumps the tree cannot express (`break`, `continue`, and the leftovers
//! of genuinely unstructured flow) become [`Region::Edge`] markers.
//! Exception handlers are structured afterwards and grafted on as
//! [`Region::TryCatch`] nodes wrapping the smallest span that contains
//! their protected blocks.
//!
//! When structuring fails (malformed input, node budget exhausted), the
//! pipeline substitutes [`fallback_region`] output: every block in list
//! order with explicit jump markers, so callers always have something to
//! render.
//!
//! # Key Components
//!
//! - [`make_regions`] - Entry point, stores the tree on the unit
//! - [`Region`] - The structured tree itself
//! - [`fallback_region`] - Flat degraded output for failed units
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use codelift::regions;
//!
//! regions::make_regions(&mut unit, &options)?;
//! if let Some(region) = &unit.region {
//!     println!("{} nodes", region.node_count());
//! }
//! # Ok::<(), codelift::Error>(())
//! ```

mod if_maker;
mod loop_maker;
mod maker;
mod stack;
mod switch_maker;
mod tree;
mod try_catch;

pub use maker::{fallback_region, make_regions};
pub use tree::{EdgeKind, HandlerRegion, LoopKind, Region, SwitchCase};
