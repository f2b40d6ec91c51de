/// Knobs for the annotation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Report `A001` for annotation arguments that are not compile-time constants.
    /// Resolution results are the same either way.
    pub report_non_constant_arguments: bool,
    /// Deepest expression nesting the scanner descends into before reporting `A002`.
    pub max_depth: usize,
}

impl ResolverConfig {
    pub const DEFAULT_MAX_DEPTH: usize = 48;

    pub fn with_non_constant_reporting(mut self, enabled: bool) -> Self {
        self.report_non_constant_arguments = enabled;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            report_non_constant_arguments: true,
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}
