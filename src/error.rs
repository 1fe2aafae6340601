use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers all failure modes of the decompilation pipeline: rejecting malformed
/// bytecode input, graph construction and analysis inconsistencies, and structuring
/// limits. Each variant provides specific context about the failure mode to enable
/// appropriate error handling.
///
/// Most errors are scoped to a single method unit. The pipeline driver converts them into
/// per-method diagnostics and degrades that method to fallback output; they never abort a
/// batch (see [`crate::pipeline`]).
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::Malformed`] - Corrupted or obfuscated bytecode structure
/// - [`Error::InvalidOffset`] - A byte offset that is not an instruction boundary
/// - [`Error::OutOfBounds`] - Register or block index outside the declared range
/// - [`Error::Empty`] - Empty instruction stream where code was expected
///
/// ## Analysis Errors
/// - [`Error::GraphError`] - Control-flow graph inconsistency
/// - [`Error::RegionLimit`] - Structuring aborted after creating too many regions
///
/// # Examples
///
/// ```rust,ignore
/// use codelift::Error;
///
/// match codelift::cfg::build_blocks(&mut unit) {
///     Ok(()) => println!("built {} blocks", unit.blocks.len()),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("malformed bytecode: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// Encountered an invalid offset while resolving branch or handler targets.
    ///
    /// The associated value is the offending byte offset. Branch targets, switch case
    /// targets and exception-handler entries must all land on an instruction boundary;
    /// anything else signals malformed or obfuscated input.
    #[error("Offset {0:#x} is not an instruction boundary")]
    InvalidOffset(u32),

    /// The bytecode is damaged or obfuscated beyond what the pipeline accepts.
    ///
    /// The error includes the source location where the malformation was detected
    /// for debugging purposes. The affected method degrades to fallback output;
    /// sibling methods are unaffected.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A register or block index outside the declared range was referenced.
    ///
    /// Register arguments must stay below the method's declared register count and
    /// block ids below the block list length. This is a safety check against
    /// inconsistent front-end input.
    #[error("Out of bounds access: {0}")]
    OutOfBounds(String),

    /// Provided instruction stream was empty.
    ///
    /// This error occurs when a method body with no instructions is handed to the
    /// block graph builder.
    #[error("Provided instruction stream was empty")]
    Empty,

    /// Generic error for miscellaneous failures.
    ///
    /// Used for errors that don't fit into other categories or for wrapping
    /// external failures with additional context.
    #[error("{0}")]
    Error(String),

    /// Region structuring exceeded the configured regions limit.
    ///
    /// Pathological or obfuscated control flow can make the structurer produce an
    /// unbounded number of regions. The limit converts that into a per-method
    /// fallback instead of unbounded work. The associated value is the limit
    /// that was hit.
    #[error("Regions limit reached while structuring - {0}")]
    RegionLimit(usize),

    /// Control-flow graph inconsistency.
    ///
    /// Raised when the graph violates an expected shape: a disconnected exception
    /// handler, an edge to a removed block, or a dominator query on an unreachable
    /// node. The affected method degrades to fallback output.
    #[error("{0}")]
    GraphError(String),
}
