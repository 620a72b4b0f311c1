//! Warning accumulator threaded through the conversion stages.
//!
//! Each stage returns its own [`Report`]; the orchestrator merges them in
//! pipeline order so the final warning list reads in the order the
//! decisions were made.

/// Non-fatal policy fallbacks recorded during a conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    warnings: Vec<String>,
}

impl Report {
    /// Creates an empty report.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    /// Records a warning and logs it.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%message, "conversion fallback");
        self.warnings.push(message);
    }

    /// Appends another stage's warnings after this one's.
    pub fn merge(&mut self, other: Self) {
        self.warnings.extend(other.warnings);
    }

    /// Recorded warnings in order.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Number of recorded warnings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Whether no warning was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Consumes the report, returning the warnings.
    #[must_use]
    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }
}
