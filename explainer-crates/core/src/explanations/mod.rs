//! The explanation algorithms.
//!
//! - [`ConflictExtractor`] shrinks unsatisfiable subsets of the soft constraints into minimal
//!   unsatisfiable subsets (MUSes) and grows satisfiable subsets into maximal satisfiable subsets
//!   (MSSes).
//! - [`SubsetMapper`] enumerates every MUS and MSS of a model.
//! - [`HittingSetOptimizer`] finds unsatisfiable subsets of minimum weight, and
//!   [`CorrectionSetOptimizer`] finds correction subsets of minimum weight.
//! - [`DiagnosisSession`] removes constraints chosen by a [`ChoiceProvider`] until the model is
//!   satisfiable.
mod choice;
mod conflict_extractor;
mod correction_set;
mod diagnosis;
mod hitting_set;
mod subset_cache;
mod subset_mapper;

pub use choice::Choice;
pub use choice::ChoiceProvider;
pub use choice::ConsoleChoice;
pub use choice::ScriptedChoice;
pub use conflict_extractor::ConflictExtractor;
pub use conflict_extractor::ExtractorStatistics;
pub use correction_set::CorrectionSetOptimizer;
pub use correction_set::CorrectionSetStatistics;
pub use diagnosis::ConflictSource;
pub use diagnosis::DiagnosisResult;
pub use diagnosis::DiagnosisSession;
pub use diagnosis::DiagnosisStatistics;
pub use diagnosis::MinimalConflicts;
pub use hitting_set::HittingSetOptimizer;
pub use hitting_set::HittingSetStatistics;
pub use subset_mapper::LatticeSubset;
pub use subset_mapper::MapperStatistics;
pub use subset_mapper::SubsetMapper;
