//! Options which influence how the explanation algorithms behave.

/// The order in which [`ConflictExtractor::shrink`](crate::explanations::ConflictExtractor::shrink)
/// attempts to remove constraints, and in which
/// [`ConflictExtractor::grow`](crate::explanations::ConflictExtractor::grow) attempts to add them.
///
/// Different orders can lead to different (but equally minimal) conflicts; any fixed order makes
/// the result deterministic for a deterministic oracle.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ShrinkOrder {
    /// Visits the constraints sorted by their text.
    #[default]
    ConstraintText,
    /// Visits the constraints in the order in which they were given.
    InputOrder,
    /// Visits the constraints in a random order, determined by
    /// [`ExtractorOptions::random_seed`].
    Shuffled,
}

/// How [`HittingSetOptimizer::optimal_mus`](crate::explanations::HittingSetOptimizer::optimal_mus)
/// derives new correction subsets from a satisfiable hitting set.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum CorrectionStrategy {
    /// Reads the constraints falsified by the solution of the oracle and repeatedly adds them,
    /// producing several disjoint correction subsets per iteration.
    #[default]
    Greedy,
    /// Grows the hitting set into a maximal satisfiable subset and uses its complement; one
    /// minimal correction subset per iteration.
    Grow,
}

/// The options of a [`ConflictExtractor`](crate::explanations::ConflictExtractor).
#[derive(Debug, Clone, Copy)]
pub struct ExtractorOptions {
    pub shrink_order: ShrinkOrder,
    /// The seed for [`ShrinkOrder::Shuffled`].
    pub random_seed: u64,
    /// Whether the outcomes of oracle calls are remembered and reused for identical subsets.
    pub use_cache: bool,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        ExtractorOptions {
            shrink_order: ShrinkOrder::default(),
            random_seed: 42,
            use_cache: true,
        }
    }
}

/// The options of a [`HittingSetOptimizer`](crate::explanations::HittingSetOptimizer).
#[derive(Debug, Clone, Copy, Default)]
pub struct HittingSetOptions {
    pub correction_strategy: CorrectionStrategy,
}
