use std::fmt;

/// End-of-stage summary: what was found, what was skipped as already done or
/// unusable, and what failed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: &'static str,
    pub discovered: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl StageReport {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            ..Self::default()
        }
    }

    pub fn log(&self) {
        tracing::info!(
            stage = self.stage,
            discovered = self.discovered,
            skipped = self.skipped,
            failed = self.failed,
            "Stage complete"
        );
    }
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n=== {} complete ===", self.stage)?;
        writeln!(f, "Discovered: {}", self.discovered)?;
        writeln!(f, "Skipped:    {}", self.skipped)?;
        write!(f, "Failed:     {}", self.failed)
    }
}
