//! Engine configuration

/// Default bound on nested signature analyses
pub const DEFAULT_MAX_CALL_DEPTH: usize = 512;

/// Tunables for one inference run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Maximum number of signature analyses that may be in flight at once.
    /// Exceeding it surfaces `CallDepthExceeded` rather than exhausting the stack.
    pub max_call_depth: usize,
}

impl EngineOptions {
    pub fn new() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::new()
    }
}
