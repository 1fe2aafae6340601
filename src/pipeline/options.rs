//! Pipeline configuration.

/// Tuning knobs for the decompilation pipeline.
///
/// The defaults suit ordinary application code; the limits exist so that
/// pathological or obfuscated methods degrade to fallback output instead
/// of consuming unbounded time. Options are set through chaining:
///
/// ```rust,ignore
/// use codelift::pipeline::DecompilerOptions;
///
/// let options = DecompilerOptions::default()
///     .regions_limit(10_000)
///     .parallel(false);
/// ```
#[derive(Debug, Clone)]
pub struct DecompilerOptions {
    /// Maximum basic blocks per method before it degrades to fallback.
    pub block_limit: usize,
    /// Maximum regions the structurer may create per method.
    pub regions_limit: usize,
    /// Merge identical single-instruction return blocks into one exit.
    pub dedup_exits: bool,
    /// Clone shared return blocks per predecessor instead of merging
    /// them. Mutually exclusive with `dedup_exits`; when both are set the
    /// split wins.
    pub split_return: bool,
    /// Use source-level names from debug info when they validate.
    pub use_debug_names: bool,
    /// Process batch units on the rayon thread pool.
    pub parallel: bool,
}

impl Default for DecompilerOptions {
    fn default() -> Self {
        DecompilerOptions {
            block_limit: 10_000,
            regions_limit: 50_000,
            dedup_exits: true,
            split_return: false,
            use_debug_names: true,
            parallel: true,
        }
    }
}

impl DecompilerOptions {
    /// Sets the per-method basic block limit.
    #[must_use]
    pub fn block_limit(mut self, limit: usize) -> Self {
        self.block_limit = limit;
        self
    }

    /// Sets the per-method regions limit.
    #[must_use]
    pub fn regions_limit(mut self, limit: usize) -> Self {
        self.regions_limit = limit;
        self
    }

    /// Enables or disables merging of identical return blocks.
    #[must_use]
    pub fn dedup_exits(mut self, enabled: bool) -> Self {
        self.dedup_exits = enabled;
        self
    }

    /// Enables or disables cloning of shared return blocks.
    #[must_use]
    pub fn split_return(mut self, enabled: bool) -> Self {
        self.split_return = enabled;
        self
    }

    /// Enables or disables debug-info variable names.
    #[must_use]
    pub fn use_debug_names(mut self, enabled: bool) -> Self {
        self.use_debug_names = enabled;
        self
    }

    /// Enables or disables parallel batch processing.
    #[must_use]
    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }
}
