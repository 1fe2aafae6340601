//! Per-method diagnostics.
//!
//! The pipeline never aborts a whole input over one bad method: problems
//! are recorded as [`Diagnostic`] values on the unit that produced them and
//! surface in its result. Warnings mark recoverable oddities (a type the
//! solver had to abandon, an unreachable region), errors mark conditions
//! that forced the unit into fallback output.

use strum::{EnumCount, EnumIter};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, EnumCount)]
pub enum Severity {
    /// Informational note, output unaffected.
    Info,
    /// Recovered problem; output is complete but may be less precise.
    Warning,
    /// Unrecovered problem; the unit fell back to linear output.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One recorded problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// How serious the problem is.
    pub severity: Severity,
    /// Human-readable description, including the offset or block involved
    /// where one applies.
    pub message: String,
}

impl Diagnostic {
    /// An informational note.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    /// A recovered problem.
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    /// An unrecovered problem.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        // Declaration order is the ranking order.
        let ranked: Vec<Severity> = Severity::iter().collect();
        assert_eq!(ranked, vec![Severity::Info, Severity::Warning, Severity::Error]);
        assert_eq!(Severity::COUNT, 3);
    }

    #[test]
    fn test_display() {
        let diag = Diagnostic::warning("type rejected for v2_1, keeping int");
        assert_eq!(diag.to_string(), "warning: type rejected for v2_1, keeping int");
    }
}
