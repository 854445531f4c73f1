//! # Explainer
//! Reference oracles and a command line front end for the explanation algorithms of
//! [`explainer_core`].
//!
//! The algorithms in the core only talk to oracles through traits. This crate provides two small
//! oracles implementing them:
//! - [`FiniteDomainOracle`](oracles::FiniteDomainOracle), a backtracking search over integer
//!   variables with finite domains, which holds the hard and soft [`IntConstraint`]s
//!   (`constraints::IntConstraint`),
//! - [`ClauseOracle`](oracles::ClauseOracle), a propositional search over indicators which serves
//!   as the map oracle of the [`SubsetMapper`](core::explanations::SubsetMapper) and as the
//!   hitting-set oracle of the optimizers.
//!
//! Both are exhaustive and meant for small models; they are what the `explainer` binary and the
//! integration tests run on.
//!
//! Two explanations are built on top of the finite domain oracle:
//! - [`StepwiseExplainer`](stepwise::StepwiseExplainer) explains a solution or a conflict as a
//!   sequence of small inference steps,
//! - [`InverseOptimisation`](counterfactual::InverseOptimisation) finds the smallest change to the
//!   weights of an objective which makes a solution chosen by a user optimal.
//!
//! # Example
//! ```
//! use explainer::constraints;
//! use explainer::core::explanations::ConflictExtractor;
//! use explainer::core::options::ExtractorOptions;
//! use explainer::core::termination::Indefinite;
//! use explainer::oracles::FiniteDomainOracle;
//!
//! let mut oracle = FiniteDomainOracle::default();
//! let x = oracle.new_variable(0, 10, "x");
//!
//! let soft = vec![
//!     constraints::greater_than_or_equals(vec![(1, x.clone())], 5),
//!     constraints::less_than_or_equals(vec![(1, x.clone())], 3),
//!     constraints::not_equals(vec![(1, x.clone())], 7),
//! ];
//!
//! let mut extractor =
//!     ConflictExtractor::new(oracle, vec![], soft, ExtractorOptions::default()).unwrap();
//! let all = extractor.model().indicators().collect::<Vec<_>>();
//! let conflict = extractor.shrink(&all, &mut Indefinite).unwrap();
//!
//! let text = extractor
//!     .model()
//!     .constraints(&conflict)
//!     .map(|constraint| constraint.to_string())
//!     .collect::<Vec<_>>();
//! assert_eq!(text, vec!["-x <= -5", "x <= 3"]);
//! ```
pub mod constraints;
pub mod counterfactual;
pub mod oracles;
pub mod stepwise;

pub use explainer_core as core;
