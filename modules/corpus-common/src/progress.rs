/// Completed/total progress sink for long-running stages.
/// Frontends implement this; library code only ever calls it.
pub trait Progress: Send + Sync {
    /// Called once with the number of units the stage will process.
    fn begin(&self, _total: usize) {}

    /// One unit finished, successfully or not.
    fn advance(&self) {}

    fn finish(&self) {}
}

/// A no-op progress sink.
pub struct NullProgress;
impl Progress for NullProgress {}
